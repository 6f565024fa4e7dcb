//! The recommender consumed by `Intelligence(appendMode)` (spec Section 4.2):
//! an external collaborator that produces a song list to extend the queue
//! with. Out of scope for this crate beyond the trait seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Song;

#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, seed: &Song) -> Result<Vec<Song>>;
}

/// Always returns an empty recommendation list. Used where no real
/// recommender has been configured; `Intelligence` against this collaborator
/// is a documented no-op rather than a hard failure.
#[derive(Default)]
pub struct EmptyRecommender;

#[async_trait]
impl Recommender for EmptyRecommender {
    async fn recommend(&self, _seed: &Song) -> Result<Vec<Song>> {
        Ok(Vec::new())
    }
}
