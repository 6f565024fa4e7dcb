use serde::{Deserialize, Serialize};

use crate::models::{PlayerState, Song};

/// Snapshot consumed by the Remote Control Bridge and rebuilt whenever state,
/// time, or track changes. This is the one type that crosses from the engine
/// into the out-of-scope OS media-control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayingInfo {
    pub song_id: i64,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub cover_url: String,
    pub total_duration_ms: u64,
    pub passed_duration_ms: u64,
    pub volume: u8,
    pub state: PlayerState,
    pub lyric_text: String,
}

impl PlayingInfo {
    pub fn from_song(song: &Song, state: PlayerState, passed_duration_ms: u64, volume: u8, lyric_text: String) -> Self {
        Self {
            song_id: song.id,
            title: song.title.clone(),
            album: song.album.name.clone(),
            artist: song.artist_display(),
            cover_url: song.cover_url.clone(),
            total_duration_ms: song.duration_ms,
            passed_duration_ms,
            volume,
            state,
            lyric_text,
        }
    }

    pub fn idle(volume: u8) -> Self {
        Self {
            song_id: 0,
            title: String::new(),
            album: String::new(),
            artist: String::new(),
            cover_url: String::new(),
            total_duration_ms: 0,
            passed_duration_ms: 0,
            volume,
            state: PlayerState::Stopped,
            lyric_text: String::new(),
        }
    }
}
