//! The hidden-content view: favourite-style marks behind an access gate.
//!
//! Hiding and unhiding need no proof, but reading the hidden set requires an
//! [`AccessToken`], which only [`crate::access::unlock`] can mint. The
//! repository itself never sees a secret.

use super::marks::MarkRepo;
use crate::access::AccessToken;
use crate::error::Result;
use crate::model::MarkTarget;
use sqlx::SqlitePool;

/// Access-gated mark repository over the `hidden` table.
#[derive(Clone)]
pub struct HiddenRepo {
    marks: MarkRepo,
}

impl HiddenRepo {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self {
            marks: MarkRepo::new(pool, "hidden"),
        }
    }

    /// Hide a playlist or artist. Idempotent.
    pub async fn hide(&self, target: &MarkTarget) -> Result<()> {
        self.marks.mark(target).await
    }

    /// Unhide a target. Returns whether a row was removed; unhiding a
    /// never-hidden target is a no-op success.
    pub async fn unhide(&self, target: &MarkTarget) -> Result<bool> {
        self.marks.unmark(target).await
    }

    /// All hidden marks. Requires proof the secret gate was passed.
    pub async fn all(&self, _token: AccessToken) -> Result<Vec<MarkTarget>> {
        self.marks.all().await
    }

    /// Whether a target is hidden. Ungated: ordinary views need this to
    /// filter hidden content out without knowing the secret.
    pub async fn contains(&self, target: &MarkTarget) -> Result<bool> {
        self.marks.contains(target).await
    }

    /// Ungated access for the consistency coordinator's pruning path.
    pub(crate) fn store(&self) -> &MarkRepo {
        &self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Sha256Verifier, unlock};
    use crate::test_utils::temp_db;

    #[tokio::test]
    async fn test_hidden_reads_require_token() {
        let (pool, _dir) = temp_db().await;
        let repo = HiddenRepo::new(pool);

        let target = MarkTarget::artist("Secret Artist");
        repo.hide(&target).await.unwrap();

        // Membership check is ungated
        assert!(repo.contains(&target).await.unwrap());

        // Listing needs a minted token
        let verifier = Sha256Verifier::from_secret("hunter2");
        let token = unlock(&verifier, "hunter2").expect("correct secret");
        let all = repo.all(token).await.unwrap();
        assert_eq!(all, vec![target]);
    }

    #[tokio::test]
    async fn test_hide_unhide_idempotent() {
        let (pool, _dir) = temp_db().await;
        let repo = HiddenRepo::new(pool);

        let target = MarkTarget::artist("Ghost");
        repo.hide(&target).await.unwrap();
        repo.hide(&target).await.unwrap();

        assert!(repo.unhide(&target).await.unwrap());
        assert!(!repo.unhide(&target).await.unwrap());
    }
}
