use serde::{Deserialize, Serialize};

/// A single artist credit on a song or album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

/// Album metadata as carried alongside a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub artist_id: i64,
    pub artist_name: String,
}

/// Immutable identity record for a track in the streaming service's catalog.
///
/// A `Song` never mutates after construction; re-fetching metadata produces a
/// new value rather than updating one in place. `source` is the opaque,
/// lazily-resolved playable-source locator: it starts `None` and is filled in
/// by a [`crate::engine::resolver::TrackSourceResolver`] only once playback is
/// about to begin, never eagerly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    pub cover_url: String,
    pub artists: Vec<Artist>,
    pub album: Album,
    #[serde(default)]
    pub source: Option<String>,
}

impl Song {
    pub fn new(
        id: i64,
        title: impl Into<String>,
        duration_ms: u64,
        cover_url: impl Into<String>,
        artists: Vec<Artist>,
        album: Album,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            duration_ms,
            cover_url: cover_url.into(),
            artists,
            album,
            source: None,
        }
    }

    /// The sentinel empty song returned by `CurrentSong()` when the cursor is
    /// out of range (e.g. an empty playlist).
    pub fn empty() -> Self {
        Self {
            id: 0,
            title: String::new(),
            duration_ms: 0,
            cover_url: String::new(),
            artists: Vec::new(),
            album: Album {
                id: 0,
                name: String::new(),
                artist_id: 0,
                artist_name: String::new(),
            },
            source: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0 && self.title.is_empty()
    }

    /// Comma-joined artist names, for display and lyric-export headers.
    pub fn artist_display(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
