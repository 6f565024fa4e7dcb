//! The Playlist Manager: queue, mode policies, persistence, and the
//! manual/auto navigation rules from spec Section 4.1.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{EngineError, Result};
use crate::models::{PlayMode, Playlist, PlaylistSnapshot, Song};
use crate::playlist::store::{keys, KeyValueStore};

/// Internal cursor over a pre-shuffled permutation for `ListRandom`.
/// `order[0]` is always the song that was current at shuffle time.
#[derive(Debug, Clone, Default)]
struct ListRandomState {
    order: Vec<usize>,
    cursor: usize,
}

/// A doubly-linked chain of visited positions for `InfiniteRandom`, threaded
/// through the playlist by song index rather than by value (so duplicate
/// songs at different positions are walked independently).
#[derive(Debug, Clone, Default)]
struct InfiniteRandomState {
    forward: HashMap<usize, usize>,
    backward: HashMap<usize, usize>,
}

struct Inner {
    playlist: Playlist,
    mode: PlayMode,
    list_random: ListRandomState,
    infinite_random: InfiniteRandomState,
    recommender_present: bool,
}

/// Owns the queue of songs and the active `PlayMode`'s navigation state.
/// Guarded by a single mutex so its public methods are safe for concurrent
/// callers, per the spec's shared-resource policy.
pub struct PlaylistManager {
    store: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl PlaylistManager {
    pub fn new(store: Arc<dyn KeyValueStore>, default_mode: PlayMode) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner {
                playlist: Playlist::empty(),
                mode: default_mode,
                list_random: ListRandomState::default(),
                infinite_random: InfiniteRandomState::default(),
                recommender_present: false,
            }),
        }
    }

    /// Loads a persisted `PlaylistSnapshot` and `PlayMode`, if any. On
    /// decode failure the queue starts empty (spec Section 6).
    pub fn load_state(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");

        match self.store.get(keys::PLAYER_SNAPSHOT) {
            Ok(Some(bytes)) => match serde_json::from_slice::<PlaylistSnapshot>(&bytes) {
                Ok(snapshot) => {
                    inner.playlist = snapshot.into_playlist();
                }
                Err(err) => {
                    warn!("PlaylistManager: failed to decode playlist snapshot: {err}");
                    inner.playlist = Playlist::empty();
                }
            },
            Ok(None) => {}
            Err(err) => warn!("PlaylistManager: failed to read playlist snapshot: {err}"),
        }

        match self.store.get(keys::PLAY_MODE) {
            Ok(Some(bytes)) => match serde_json::from_slice::<PlayMode>(&bytes) {
                Ok(mode) => inner.mode = mode,
                Err(err) => warn!("PlaylistManager: failed to decode play mode: {err}"),
            },
            Ok(None) => {}
            Err(err) => warn!("PlaylistManager: failed to read play mode: {err}"),
        }

        if inner.mode.is_shuffled() {
            Self::reinit_shuffle_state(&mut inner);
        }

        Ok(())
    }

    /// Replaces the queue atomically. Fails with `InvalidIndex` if `index`
    /// is out of range for a non-empty `songs`.
    pub fn initialize(&self, index: i64, songs: Vec<Song>) -> Result<()> {
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");

        if !songs.is_empty() && (index < 0 || index as usize >= songs.len()) {
            return Err(EngineError::InvalidIndex {
                index,
                len: songs.len(),
            });
        }
        let index = if songs.is_empty() { -1 } else { index };

        inner.playlist = Playlist::new(songs, index);
        if inner.mode.is_shuffled() {
            Self::reinit_shuffle_state(&mut inner);
        } else {
            inner.list_random = ListRandomState::default();
            inner.infinite_random = InfiniteRandomState::default();
        }

        self.persist_locked(&inner);
        Ok(())
    }

    pub fn current_index(&self) -> i64 {
        self.inner.lock().expect("playlist manager mutex poisoned").playlist.current_index
    }

    pub fn playlist(&self) -> Playlist {
        self.inner.lock().expect("playlist manager mutex poisoned").playlist.clone()
    }

    pub fn current_song(&self) -> Song {
        self.inner.lock().expect("playlist manager mutex poisoned").playlist.current_song()
    }

    pub fn get_play_mode(&self) -> PlayMode {
        self.inner.lock().expect("playlist manager mutex poisoned").mode
    }

    /// All modes the caller may switch to via `SetPlayMode`/`SwitchMode`.
    /// `Intelligent` is included only once a recommender has been injected.
    pub fn supported_play_modes(&self) -> Vec<PlayMode> {
        let inner = self.inner.lock().expect("playlist manager mutex poisoned");
        let mut modes = PlayMode::CYCLE.to_vec();
        if inner.recommender_present {
            modes.push(PlayMode::Intelligent);
        }
        modes
    }

    pub fn set_recommender_present(&self, present: bool) {
        self.inner.lock().expect("playlist manager mutex poisoned").recommender_present = present;
    }

    /// Switches the active mode, preserving the current index and song
    /// identity. Shuffle-based modes reinitialize their internal order with
    /// the current index as position 0.
    pub fn set_play_mode(&self, mode: PlayMode) {
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");
        inner.mode = mode;
        if mode.is_shuffled() {
            Self::reinit_shuffle_state(&mut inner);
        }
        if let Ok(bytes) = serde_json::to_vec(&mode) {
            if let Err(err) = self.store.set(keys::PLAY_MODE, &bytes) {
                warn!("PlaylistManager: failed to persist play mode: {err}");
            }
        }
    }

    /// Appends songs to the end of the queue without disturbing the cursor.
    /// Shuffled modes extend their order with the new positions, shuffled
    /// into the unplayed tail.
    pub fn append_songs(&self, songs: Vec<Song>) -> Result<()> {
        if songs.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");
        let base = inner.playlist.len();
        inner.playlist.songs.extend(songs.into_iter());
        let added = inner.playlist.len() - base;

        if inner.mode == PlayMode::ListRandom {
            let mut new_positions: Vec<usize> = (base..base + added).collect();
            new_positions.shuffle(&mut rand::rng());
            inner.list_random.order.extend(new_positions);
        }

        self.persist_locked(&inner);
        Ok(())
    }

    /// Splices songs in immediately after the current index, preserving the
    /// current song's identity. Fails with `IndexOutOfRange` on an empty
    /// queue (there is no "current" to insert after).
    pub fn insert_after_current(&self, songs: Vec<Song>) -> Result<()> {
        if songs.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");
        let len = inner.playlist.len();
        if len == 0 {
            return Err(EngineError::IndexOutOfRange { index: 0, len: 0 });
        }
        let current = inner.playlist.current_index.max(0) as usize;
        let insert_at = current + 1;
        let inserted = songs.len();
        for (offset, song) in songs.into_iter().enumerate() {
            inner.playlist.songs.insert(insert_at + offset, song);
        }

        let shift = |i: usize| if i >= insert_at { i + inserted } else { i };
        if inner.mode == PlayMode::ListRandom {
            inner.list_random.order = inner.list_random.order.iter().map(|&i| shift(i)).collect();
            let mut new_positions: Vec<usize> = (insert_at..insert_at + inserted).collect();
            new_positions.shuffle(&mut rand::rng());
            let tail_start = inner.list_random.cursor + 1;
            let insert_pos = tail_start.min(inner.list_random.order.len());
            for (offset, pos) in new_positions.into_iter().enumerate() {
                inner.list_random.order.insert(insert_pos + offset, pos);
            }
        }
        inner.infinite_random.forward = inner.infinite_random.forward.iter().map(|(&k, &v)| (shift(k), shift(v))).collect();
        inner.infinite_random.backward = inner.infinite_random.backward.iter().map(|(&k, &v)| (shift(k), shift(v))).collect();

        self.persist_locked(&inner);
        Ok(())
    }

    fn reinit_shuffle_state(inner: &mut Inner) {
        let len = inner.playlist.len();
        inner.list_random = ListRandomState::default();
        inner.infinite_random = InfiniteRandomState::default();
        if len == 0 {
            return;
        }
        match inner.mode {
            PlayMode::ListRandom => {
                let current = inner.playlist.current_index.max(0) as usize;
                let mut order: Vec<usize> = (0..len).filter(|&i| i != current).collect();
                order.shuffle(&mut rand::rng());
                order.insert(0, current);
                inner.list_random = ListRandomState { order, cursor: 0 };
            }
            PlayMode::InfiniteRandom => {
                // The chain starts empty; links are created lazily as
                // Next/Previous are called.
            }
            _ => {}
        }
    }

    /// Advances according to the active mode. `manual` only affects
    /// `SingleLoop`.
    pub fn next_song(&self, manual: bool) -> Result<Song> {
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");
        let len = inner.playlist.len();
        if len == 0 {
            return Err(EngineError::NoMoreSongs);
        }
        let current = inner.playlist.current_index;

        let next_index = match inner.mode {
            PlayMode::Ordered => {
                let next = current + 1;
                if next as usize >= len {
                    return Err(EngineError::NoMoreSongs);
                }
                next
            }
            PlayMode::ListLoop => (current + 1).rem_euclid(len as i64),
            PlayMode::SingleLoop => {
                if manual {
                    (current + 1).rem_euclid(len as i64)
                } else {
                    debug!("PlaylistManager: single-loop replay, index unchanged");
                    inner.playlist.current_index = current;
                    self.persist_locked(&inner);
                    return Ok(inner.playlist.current_song());
                }
            }
            PlayMode::ListRandom => {
                let next_cursor = inner.list_random.cursor + 1;
                if next_cursor >= inner.list_random.order.len() {
                    return Err(EngineError::NoMoreSongs);
                }
                inner.list_random.cursor = next_cursor;
                inner.list_random.order[next_cursor] as i64
            }
            PlayMode::InfiniteRandom => {
                Self::infinite_random_step(&mut inner.infinite_random, current, len, true)?
            }
            PlayMode::Intelligent => (current + 1).rem_euclid(len as i64),
        };

        inner.playlist.current_index = next_index;
        self.persist_locked(&inner);
        Ok(inner.playlist.current_song())
    }

    pub fn previous_song(&self, manual: bool) -> Result<Song> {
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");
        let len = inner.playlist.len();
        if len == 0 {
            return Err(EngineError::NoMoreSongs);
        }
        let current = inner.playlist.current_index;

        let prev_index = match inner.mode {
            PlayMode::Ordered => {
                let prev = current - 1;
                if prev < 0 {
                    return Err(EngineError::NoMoreSongs);
                }
                prev
            }
            PlayMode::ListLoop => (current - 1).rem_euclid(len as i64),
            PlayMode::SingleLoop => {
                if manual {
                    (current - 1).rem_euclid(len as i64)
                } else {
                    inner.playlist.current_index = current;
                    self.persist_locked(&inner);
                    return Ok(inner.playlist.current_song());
                }
            }
            PlayMode::ListRandom => {
                if inner.list_random.cursor == 0 {
                    return Err(EngineError::NoMoreSongs);
                }
                inner.list_random.cursor -= 1;
                inner.list_random.order[inner.list_random.cursor] as i64
            }
            PlayMode::InfiniteRandom => {
                Self::infinite_random_step(&mut inner.infinite_random, current, len, false)?
            }
            PlayMode::Intelligent => (current - 1).rem_euclid(len as i64),
        };

        inner.playlist.current_index = prev_index;
        self.persist_locked(&inner);
        Ok(inner.playlist.current_song())
    }

    /// Follows an existing link in the chain if one exists, else samples a
    /// fresh position distinct from `current` and splices it in.
    fn infinite_random_step(
        state: &mut InfiniteRandomState,
        current: i64,
        len: usize,
        forward: bool,
    ) -> Result<i64> {
        let current = current.max(0) as usize;
        let links = if forward { &state.forward } else { &state.backward };
        if let Some(&next) = links.get(&current) {
            return Ok(next as i64);
        }
        if len < 2 {
            // Nowhere else to go; an infinite walk over one song just
            // repeats it rather than stalling playback.
            return Ok(current as i64);
        }
        let mut rng = rand::rng();
        let next = loop {
            let candidate = rng.random_range(0..len);
            if candidate != current {
                break candidate;
            }
        };
        if forward {
            state.forward.insert(current, next);
            state.backward.insert(next, current);
        } else {
            state.backward.insert(current, next);
            state.forward.insert(next, current);
        }
        Ok(next as i64)
    }

    /// Removes one song. Returns the displaced current song when the
    /// removal moved the cursor (the engine's "next to play" notification),
    /// or `None` when the cursor's identity was preserved.
    pub fn remove_song(&self, index: i64) -> Result<Option<Song>> {
        let mut inner = self.inner.lock().expect("playlist manager mutex poisoned");
        let len = inner.playlist.len();
        if index < 0 || index as usize >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        let index = index as usize;
        let current = inner.playlist.current_index;

        inner.playlist.songs.remove(index);
        let displaced = index as i64 == current;

        let new_current = if inner.playlist.is_empty() {
            -1
        } else if displaced {
            if index == len - 1 {
                (index as i64 - 1).max(0)
            } else {
                index as i64
            }
        } else if (index as i64) < current {
            current - 1
        } else {
            current
        };
        inner.playlist.current_index = new_current;

        Self::reindex_after_removal(&mut inner.infinite_random, index);
        if inner.mode == PlayMode::ListRandom {
            Self::reshuffle_list_random_after_removal(&mut inner.list_random, index, new_current);
        }

        self.persist_locked(&inner);

        Ok(if displaced && !inner.playlist.is_empty() {
            Some(inner.playlist.current_song())
        } else {
            None
        })
    }

    fn reindex_after_removal(state: &mut InfiniteRandomState, removed: usize) {
        let forward_link = state.forward.remove(&removed);
        let backward_link = state.backward.remove(&removed);
        // Splice the chain back together across the removed node.
        if let Some(f) = forward_link {
            if let Some(b) = backward_link {
                state.backward.insert(f, b);
            } else {
                state.backward.remove(&f);
            }
        }
        if let Some(b) = backward_link {
            if let Some(f) = forward_link {
                state.forward.insert(b, f);
            } else {
                state.forward.remove(&b);
            }
        }

        let shift = |i: usize| if i > removed { i - 1 } else { i };
        state.forward = state
            .forward
            .iter()
            .filter(|(&k, _)| k != removed)
            .map(|(&k, &v)| (shift(k), shift(v)))
            .collect();
        state.backward = state
            .backward
            .iter()
            .filter(|(&k, _)| k != removed)
            .map(|(&k, &v)| (shift(k), shift(v)))
            .collect();
    }

    /// Rebuilds the permutation after a removal: the already-played prefix
    /// (positions `0..=cursor`) keeps its relative order, indices above the
    /// removed one shift down by one, and the still-unplayed tail is
    /// reshuffled, per "Removal reshuffles the tail."
    fn reshuffle_list_random_after_removal(state: &mut ListRandomState, removed: usize, new_current: i64) {
        let shift = |i: usize| -> Option<usize> {
            use std::cmp::Ordering;
            match i.cmp(&removed) {
                Ordering::Equal => None,
                Ordering::Greater => Some(i - 1),
                Ordering::Less => Some(i),
            }
        };

        let cursor = state.cursor.min(state.order.len().saturating_sub(1));
        let played: Vec<usize> = state.order[..=cursor].iter().filter_map(|&i| shift(i)).collect();
        let played_set: std::collections::HashSet<usize> = played.iter().copied().collect();

        let mut tail: Vec<usize> = state.order[cursor + 1..]
            .iter()
            .filter_map(|&i| shift(i))
            .filter(|s| !played_set.contains(s))
            .collect();
        tail.shuffle(&mut rand::rng());

        let new_current = new_current.max(0) as usize;
        let mut new_order = played;
        if !new_order.contains(&new_current) {
            // The displaced cursor landed on a song not yet in the played
            // prefix (the removed song was the current one); anchor it.
            new_order.push(new_current);
            tail.retain(|&s| s != new_current);
        }
        new_order.extend(tail);

        let cursor = new_order.iter().position(|&s| s == new_current).unwrap_or(0);
        state.order = new_order;
        state.cursor = cursor;
    }

    /// Forces a persistence write of the current snapshot, independent of
    /// any mutation. Used by the engine on `Close` to guarantee a final
    /// snapshot is on disk even if the last command was a no-op.
    pub fn persist(&self) {
        let inner = self.inner.lock().expect("playlist manager mutex poisoned");
        self.persist_locked(&inner);
    }

    fn persist_locked(&self, inner: &Inner) {
        let snapshot = PlaylistSnapshot::capture(&inner.playlist);
        match serde_json::to_vec(&snapshot) {
            Ok(bytes) => {
                if let Err(err) = self.store.set(keys::PLAYER_SNAPSHOT, &bytes) {
                    warn!("PlaylistManager: failed to persist playlist snapshot: {err}");
                }
            }
            Err(err) => warn!("PlaylistManager: failed to serialize playlist snapshot: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::song::{Album, Artist};
    use crate::playlist::store::InMemoryKeyValueStore;

    fn song(id: i64) -> Song {
        Song::new(
            id,
            format!("s{id}"),
            180_000,
            "",
            vec![Artist { id: 1, name: "a".into() }],
            Album { id: 1, name: "al".into(), artist_id: 1, artist_name: "a".into() },
        )
    }

    fn manager(mode: PlayMode) -> PlaylistManager {
        PlaylistManager::new(Arc::new(InMemoryKeyValueStore::new()), mode)
    }

    #[test]
    fn scenario_1_list_loop_next_next_previous() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(0, vec![song(0), song(1), song(2)]).unwrap();
        mgr.next_song(true).unwrap();
        mgr.next_song(true).unwrap();
        mgr.previous_song(true).unwrap();
        assert_eq!(mgr.current_index(), 1);
        assert_eq!(mgr.current_song(), song(1));
    }

    #[test]
    fn scenario_2_single_loop_replays_without_advance() {
        let mgr = manager(PlayMode::SingleLoop);
        mgr.initialize(0, vec![song(0), song(1)]).unwrap();
        for _ in 0..3 {
            let s = mgr.next_song(false).unwrap();
            assert_eq!(s, song(0));
        }
        assert_eq!(mgr.current_index(), 0);
    }

    #[test]
    fn scenario_3_ordered_stops_at_end() {
        let mgr = manager(PlayMode::Ordered);
        mgr.initialize(2, vec![song(0), song(1), song(2)]).unwrap();
        let err = mgr.next_song(false).unwrap_err();
        assert!(matches!(err, EngineError::NoMoreSongs));
        assert_eq!(mgr.current_index(), 2);
    }

    #[test]
    fn scenario_4_remove_displaces_cursor() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(1, vec![song(0), song(1), song(2)]).unwrap();
        let next = mgr.remove_song(1).unwrap();
        assert_eq!(mgr.playlist().songs, vec![song(0), song(2)]);
        assert_eq!(mgr.current_index(), 1);
        assert_eq!(mgr.current_song(), song(2));
        assert_eq!(next, Some(song(2)));
    }

    #[test]
    fn ordered_never_exceeds_bounds() {
        let mgr = manager(PlayMode::Ordered);
        mgr.initialize(0, vec![song(0), song(1)]).unwrap();
        assert!(mgr.previous_song(false).is_err());
        assert_eq!(mgr.current_index(), 0);
        mgr.next_song(false).unwrap();
        assert!(mgr.next_song(false).is_err());
        assert_eq!(mgr.current_index(), 1);
    }

    #[test]
    fn list_loop_n_next_calls_visit_every_song_once_and_wrap() {
        let mgr = manager(PlayMode::ListLoop);
        let songs: Vec<Song> = (0..5).map(song).collect();
        mgr.initialize(0, songs.clone()).unwrap();
        let mut seen = vec![mgr.current_song()];
        for _ in 0..songs.len() {
            seen.push(mgr.next_song(true).unwrap());
        }
        assert_eq!(&seen[0..songs.len()], songs.as_slice());
        assert_eq!(mgr.current_index(), 0);
    }

    #[test]
    fn list_random_visits_a_permutation_of_the_rest() {
        let mgr = manager(PlayMode::ListRandom);
        let songs: Vec<Song> = (0..6).map(song).collect();
        mgr.initialize(2, songs.clone()).unwrap();
        let start = mgr.current_song();
        assert_eq!(start, song(2));

        let mut visited = Vec::new();
        for _ in 0..songs.len() - 1 {
            visited.push(mgr.next_song(true).unwrap());
        }
        assert!(mgr.next_song(true).is_err());

        let mut expected: Vec<Song> = songs.into_iter().filter(|s| *s != start).collect();
        let mut got = visited.clone();
        expected.sort_by_key(|s| s.id);
        got.sort_by_key(|s| s.id);
        assert_eq!(expected, got);
    }

    #[test]
    fn infinite_random_never_repeats_immediately() {
        let mgr = manager(PlayMode::InfiniteRandom);
        let songs: Vec<Song> = (0..4).map(song).collect();
        mgr.initialize(0, songs).unwrap();
        let mut previous = mgr.current_song();
        for _ in 0..50 {
            let next = mgr.next_song(false).unwrap();
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn remove_before_current_shifts_index_down() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(2, vec![song(0), song(1), song(2), song(3)]).unwrap();
        let next = mgr.remove_song(0).unwrap();
        assert_eq!(next, None);
        assert_eq!(mgr.current_index(), 1);
        assert_eq!(mgr.current_song(), song(2));
    }

    #[test]
    fn removing_only_song_empties_playlist() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(0, vec![song(0)]).unwrap();
        mgr.remove_song(0).unwrap();
        assert_eq!(mgr.current_index(), -1);
        assert!(mgr.playlist().is_empty());
    }

    #[test]
    fn initialize_rejects_out_of_range_index() {
        let mgr = manager(PlayMode::ListLoop);
        let err = mgr.initialize(5, vec![song(0), song(1)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidIndex { .. }));
    }

    #[test]
    fn set_play_mode_preserves_current_song() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(1, vec![song(0), song(1), song(2)]).unwrap();
        mgr.set_play_mode(PlayMode::ListRandom);
        assert_eq!(mgr.current_song(), song(1));
        assert_eq!(mgr.current_index(), 1);
    }

    #[test]
    fn append_songs_preserves_cursor() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(1, vec![song(0), song(1)]).unwrap();
        mgr.append_songs(vec![song(2), song(3)]).unwrap();
        assert_eq!(mgr.current_index(), 1);
        assert_eq!(mgr.current_song(), song(1));
        assert_eq!(mgr.playlist().songs, vec![song(0), song(1), song(2), song(3)]);
    }

    #[test]
    fn insert_after_current_splices_and_preserves_cursor_song() {
        let mgr = manager(PlayMode::ListLoop);
        mgr.initialize(0, vec![song(0), song(1)]).unwrap();
        mgr.insert_after_current(vec![song(9)]).unwrap();
        assert_eq!(mgr.current_song(), song(0));
        assert_eq!(mgr.playlist().songs, vec![song(0), song(9), song(1)]);
    }

    #[test]
    fn supported_modes_omit_intelligent_without_recommender() {
        let mgr = manager(PlayMode::ListLoop);
        assert!(!mgr.supported_play_modes().contains(&PlayMode::Intelligent));
        mgr.set_recommender_present(true);
        assert!(mgr.supported_play_modes().contains(&PlayMode::Intelligent));
    }
}
