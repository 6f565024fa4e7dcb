//! The cursor-at-end pagination hook (spec Section 4.2): when the engine
//! advances past the last visible song, it asks the currently playing menu
//! (out of scope) to load more via this trait before the advance completes.

use async_trait::async_trait;

#[async_trait]
pub trait QueuePager: Send + Sync {
    /// Called when `Next` is invoked with the cursor at the last song.
    /// Returning `true` signals more songs were appended to the queue the
    /// Playlist Manager is backed by (out of scope: the menu performs the
    /// actual append through its own API before returning).
    async fn load_more(&self) -> bool;
}

/// The default hook: endless feeds are out of scope for this crate, so
/// pagination never reports new songs.
#[derive(Default)]
pub struct NoopQueuePager;

#[async_trait]
impl QueuePager for NoopQueuePager {
    async fn load_more(&self) -> bool {
        false
    }
}
