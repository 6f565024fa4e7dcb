use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Playlist, Song};

/// The persisted form of a `Playlist`: current index, full song list, and the
/// wall-clock time of the write. Written on every playlist mutation and on
/// every track change; loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub current_index: i64,
    pub playlist: Vec<Song>,
    pub playlist_updated_at: DateTime<Utc>,
}

impl PlaylistSnapshot {
    pub fn capture(playlist: &Playlist) -> Self {
        Self {
            current_index: playlist.current_index,
            playlist: playlist.songs.clone(),
            playlist_updated_at: Utc::now(),
        }
    }

    pub fn into_playlist(self) -> Playlist {
        Playlist::new(self.playlist, self.current_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::song::{Album, Artist};

    #[test]
    fn round_trips_through_json() {
        let playlist = Playlist::new(
            vec![Song::new(
                1,
                "t",
                1000,
                "",
                vec![Artist {
                    id: 1,
                    name: "a".into(),
                }],
                Album {
                    id: 1,
                    name: "al".into(),
                    artist_id: 1,
                    artist_name: "a".into(),
                },
            )],
            0,
        );
        let snapshot = PlaylistSnapshot::capture(&playlist);
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: PlaylistSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.current_index, snapshot.current_index);
        assert_eq!(restored.playlist, snapshot.playlist);
        assert_eq!(restored.playlist_updated_at, snapshot.playlist_updated_at);
    }
}
