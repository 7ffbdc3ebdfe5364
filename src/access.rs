//! Access gating for hidden content.
//!
//! The index never stores or compares secrets itself; it consumes an opaque
//! [`SecretVerifier`] capability. A successful verification mints an
//! [`AccessToken`], which hidden-view queries require as proof that the gate
//! was passed. The bundled [`Sha256Verifier`] compares against a stored
//! digest, but any implementation can be plugged in.

use sha2::{Digest, Sha256};

/// Opaque secret-verification capability.
pub trait SecretVerifier: Send + Sync {
    /// Check a candidate secret. Must not panic on arbitrary input.
    fn verify(&self, secret: &str) -> bool;
}

/// Proof that a [`SecretVerifier`] accepted a secret.
///
/// Can only be minted through [`unlock`], so holding one means the gate was
/// actually passed.
#[derive(Debug, Clone, Copy)]
pub struct AccessToken(());

/// Verify a secret and mint an access token on success.
///
/// A rejected secret is a normal outcome, not an error.
pub fn unlock(verifier: &dyn SecretVerifier, secret: &str) -> Option<AccessToken> {
    if verifier.verify(secret) {
        Some(AccessToken(()))
    } else {
        None
    }
}

/// Digest-comparison verifier: SHA-256 over the secret, hex-encoded.
#[derive(Debug, Clone)]
pub struct Sha256Verifier {
    digest_hex: String,
}

impl Sha256Verifier {
    /// Create from an already-computed lowercase hex digest.
    pub fn new(digest_hex: impl Into<String>) -> Self {
        Self {
            digest_hex: digest_hex.into(),
        }
    }

    /// Create by hashing a plaintext secret (setup/CLI path).
    pub fn from_secret(secret: &str) -> Self {
        Self {
            digest_hex: digest_hex(secret),
        }
    }
}

impl SecretVerifier for Sha256Verifier {
    fn verify(&self, secret: &str) -> bool {
        digest_hex(secret) == self.digest_hex
    }
}

/// SHA-256 digest of a string as a lowercase hex string (64 characters).
pub fn digest_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_hex() {
        let d = digest_hex("melody");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verifier_accepts_matching_secret() {
        let verifier = Sha256Verifier::from_secret("open sesame");
        assert!(verifier.verify("open sesame"));
        assert!(!verifier.verify("open seseme"));
    }

    #[test]
    fn test_unlock_mints_token_only_on_success() {
        let verifier = Sha256Verifier::from_secret("s3cret");
        assert!(unlock(&verifier, "s3cret").is_some());
        assert!(unlock(&verifier, "guess").is_none());
    }

    #[test]
    fn test_verifier_from_stored_digest() {
        let stored = digest_hex("s3cret");
        let verifier = Sha256Verifier::new(stored);
        assert!(verifier.verify("s3cret"));
    }
}
