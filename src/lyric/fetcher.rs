//! The network-access seam for lyric content. Actual HTTP access to the
//! streaming service is an out-of-scope collaborator; this module defines
//! the trait the Lyric Service fetches through plus the two test/stub
//! implementations that ship with the crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Song;

/// The raw, unparsed lyric content for one song, as it would arrive from the
/// streaming service: a standard LRC line document, an optional parallel
/// translation LRC document, and an optional word-timed YRC document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLyricDocument {
    pub lrc: Option<String>,
    pub translation_lrc: Option<String>,
    pub yrc: Option<String>,
}

#[async_trait]
pub trait LyricFetcher: Send + Sync {
    async fn fetch(&self, song: &Song) -> Result<RawLyricDocument>;
}

/// Returns pre-seeded documents keyed by song id; songs with no seeded entry
/// get an empty document. Used in tests.
#[derive(Default)]
pub struct StaticLyricFetcher {
    documents: Mutex<HashMap<i64, RawLyricDocument>>,
}

impl StaticLyricFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, song_id: i64, document: RawLyricDocument) {
        self.documents.lock().expect("static lyric fetcher mutex poisoned").insert(song_id, document);
    }
}

#[async_trait]
impl LyricFetcher for StaticLyricFetcher {
    async fn fetch(&self, song: &Song) -> Result<RawLyricDocument> {
        Ok(self
            .documents
            .lock()
            .expect("static lyric fetcher mutex poisoned")
            .get(&song.id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Always returns an empty document. The default when no real lyric backend
/// is configured.
#[derive(Default)]
pub struct NullLyricFetcher;

#[async_trait]
impl LyricFetcher for NullLyricFetcher {
    async fn fetch(&self, _song: &Song) -> Result<RawLyricDocument> {
        Ok(RawLyricDocument::default())
    }
}
