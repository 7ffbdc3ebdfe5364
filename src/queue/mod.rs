//! Deterministic playback queue construction.

use crate::error::{Error, Result};
use crate::model::Track;

/// Build a playback queue from a scope of tracks, starting at the selected
/// track.
///
/// The scope is ordered by title (byte-wise, ties broken by path so the
/// order is total), then rotated so the selected track comes first and the
/// titles that sort before it wrap to the back. The same scope and
/// selection always produce the same queue.
pub fn build_queue(scope: &[Track], selected_path: &str) -> Result<Vec<Track>> {
    let mut queue: Vec<Track> = scope.to_vec();
    queue.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.path.cmp(&b.path)));

    let start = queue
        .iter()
        .position(|t| t.path == selected_path)
        .ok_or_else(|| {
            Error::invariant(format!(
                "selected track '{selected_path}' is not in the queue scope"
            ))
        })?;

    queue.rotate_left(start);
    Ok(queue)
}
