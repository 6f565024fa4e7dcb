//! The track-source resolver (spec Section 6): given a song and a quality
//! preference, yields a playable URL and media type. The real HTTP-backed
//! resolver belongs to the out-of-scope streaming API client; this module
//! only defines the seam and a test double.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EngineError, Result};
use crate::models::Song;

/// A caller-supplied quality preference, opaque to the resolver's callers
/// beyond ordering (higher usually means larger/better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QualityPreference(pub u8);

impl Default for QualityPreference {
    fn default() -> Self {
        QualityPreference(0)
    }
}

/// A resolved, playable track source: an opaque URL (or local path) plus a
/// media-type hint for the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub media_type: String,
}

#[async_trait]
pub trait TrackSourceResolver: Send + Sync {
    async fn resolve(&self, song: &Song, quality: QualityPreference) -> Result<ResolvedSource>;
}

/// Returns pre-seeded sources keyed by song id; used by tests and the CLI
/// harness in place of the real streaming API client.
#[derive(Default)]
pub struct StaticTrackSourceResolver {
    sources: Mutex<HashMap<i64, ResolvedSource>>,
}

impl StaticTrackSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, song_id: i64, source: ResolvedSource) {
        self.sources.lock().expect("resolver mutex poisoned").insert(song_id, source);
    }
}

#[async_trait]
impl TrackSourceResolver for StaticTrackSourceResolver {
    async fn resolve(&self, song: &Song, _quality: QualityPreference) -> Result<ResolvedSource> {
        self.sources
            .lock()
            .expect("resolver mutex poisoned")
            .get(&song.id)
            .cloned()
            .ok_or_else(|| EngineError::ResolveFailed(format!("no source seeded for song {}", song.id)))
    }
}
