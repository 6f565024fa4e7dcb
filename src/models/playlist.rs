use serde::{Deserialize, Serialize};

use crate::models::Song;

/// The ordered queue of songs the engine is playing from, plus a single
/// cursor. `current_index` is `-1` when the playlist is empty; otherwise
/// `0 <= current_index < songs.len()`.
///
/// Equality between two playlists is positional: the same songs in a
/// different order, or duplicate entries, are distinct playlists. A `Song`
/// may legitimately appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub songs: Vec<Song>,
    pub current_index: i64,
}

impl Playlist {
    pub fn new(songs: Vec<Song>, current_index: i64) -> Self {
        Self {
            songs,
            current_index,
        }
    }

    pub fn empty() -> Self {
        Self {
            songs: Vec::new(),
            current_index: -1,
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// The song at `current_index`, or the empty sentinel song when the
    /// cursor is out of range.
    pub fn current_song(&self) -> Song {
        self.song_at(self.current_index)
    }

    pub fn song_at(&self, index: i64) -> Song {
        if index < 0 {
            return Song::empty();
        }
        self.songs
            .get(index as usize)
            .cloned()
            .unwrap_or_else(Song::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::song::{Album, Artist};

    fn song(id: i64) -> Song {
        Song::new(
            id,
            format!("s{id}"),
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
        )
    }

    #[test]
    fn empty_playlist_has_sentinel_index_and_current_song() {
        let playlist = Playlist::empty();
        assert_eq!(playlist.current_index, -1);
        assert!(playlist.current_song().is_empty());
    }

    #[test]
    fn current_song_reflects_index() {
        let playlist = Playlist::new(vec![song(1), song(2), song(3)], 1);
        assert_eq!(playlist.current_song(), song(2));
    }
}
