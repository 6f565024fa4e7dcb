//! The Lyric Service (spec Section 4.4): fetches, parses, and time-aligns
//! line and word lyrics, and tracks the current line as the playhead
//! advances.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::lyric::fetcher::{LyricFetcher, RawLyricDocument};
use crate::lyric::parser;
use crate::models::{LyricState, Song};

const FETCH_TIMEOUT: Duration = Duration::from_secs(12);

pub struct LyricService {
    fetcher: Arc<dyn LyricFetcher>,
    state: Mutex<LyricState>,
    lyric_offset_ms: i64,
    strict: bool,
    /// Monotonically increasing fetch generation. `SetSong` bumps it and a
    /// background fetch discards its result if the live generation has
    /// moved on by the time it completes — "last write wins, no stale
    /// mutation" without a cancellation-token dependency.
    generation: AtomicU64,
}

impl LyricService {
    pub fn new(fetcher: Arc<dyn LyricFetcher>, lyric_offset_ms: i64, strict: bool) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            state: Mutex::new(LyricState::default()),
            lyric_offset_ms,
            strict,
            generation: AtomicU64::new(0),
        })
    }

    /// Cancels any in-flight fetch for a prior song and begins fetching the
    /// new song's lyrics. Non-blocking: returns immediately, the fetch runs
    /// on a background task.
    pub fn set_song(self: &Arc<Self>, song: Song) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().expect("lyric service mutex poisoned");
            *state = LyricState {
                show_translation: state.show_translation,
                word_mode_enabled: state.word_mode_enabled,
                is_running: true,
                ..LyricState::default()
            };
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.load_song(song, generation).await;
        });
    }

    async fn load_song(&self, song: Song, generation: u64) {
        let result = tokio::time::timeout(FETCH_TIMEOUT, self.fetcher.fetch(&song)).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("LyricService: fetch for song {} superseded, discarding", song.id);
            return;
        }

        match result {
            Ok(Ok(doc)) => self.apply_document(doc),
            Ok(Err(err)) => {
                warn!("LyricService: fetch failed for song {}: {}", song.id, err);
                self.mark_idle();
            }
            Err(_) => {
                warn!("LyricService: fetch timed out for song {}", song.id);
                self.mark_idle();
            }
        }
    }

    fn apply_document(&self, doc: RawLyricDocument) {
        let lines = doc
            .lrc
            .as_deref()
            .map(|text| parser::parse_lrc(text, self.strict))
            .transpose()
            .unwrap_or_else(|err| {
                warn!("LyricService: abandoning malformed LRC document: {err}");
                None
            })
            .unwrap_or_default();

        let translation = doc.translation_lrc.as_deref().and_then(|text| {
            parser::parse_lrc(text, self.strict)
                .map_err(|err| warn!("LyricService: abandoning malformed translation document: {err}"))
                .ok()
        });

        let word_lines = doc.yrc.as_deref().and_then(|text| {
            parser::parse_yrc(text, self.strict)
                .map_err(|err| warn!("LyricService: abandoning malformed YRC document: {err}"))
                .ok()
        });

        let mut state = self.state.lock().expect("lyric service mutex poisoned");
        state.lines = lines;
        state.translation = translation;
        state.word_lines = word_lines;
        state.is_running = true;
        self.recompute_locked(&mut state);
    }

    fn mark_idle(&self) {
        let mut state = self.state.lock().expect("lyric service mutex poisoned");
        *state = LyricState {
            show_translation: state.show_translation,
            word_mode_enabled: state.word_mode_enabled,
            ..LyricState::default()
        };
    }

    /// Idempotent: recomputes the current line index by binary search over
    /// the ordered line timestamps plus the configured offset.
    pub fn update_position(&self, position_ms: u64) {
        let mut state = self.state.lock().expect("lyric service mutex poisoned");
        state.position_ms = position_ms;
        self.recompute_locked(&mut state);
    }

    fn recompute_locked(&self, state: &mut LyricState) {
        let adjusted = state.position_ms as i64 + self.lyric_offset_ms;
        let idx = state.lines.partition_point(|l| l.timestamp_ms as i64 <= adjusted);
        state.current_line = if idx == 0 { -1 } else { idx as i64 - 1 };
    }

    pub fn state(&self) -> LyricState {
        self.state.lock().expect("lyric service mutex poisoned").clone()
    }

    pub fn enable_yrc(&self, enabled: bool) {
        self.state.lock().expect("lyric service mutex poisoned").word_mode_enabled = enabled;
    }

    pub fn set_show_translation(&self, show: bool) {
        self.state.lock().expect("lyric service mutex poisoned").show_translation = show;
    }

    /// Serializes the current line stream into the standard timestamped
    /// line-lyric format for export to external consumers.
    pub fn format_as_lrc(&self) -> String {
        let state = self.state.lock().expect("lyric service mutex poisoned");
        parser::format_as_lrc(&state.lines)
    }

    /// The word whose span contains the current playhead, if word mode is
    /// enabled and a word-timed line is available at the current index.
    pub fn current_word(&self) -> Option<(usize, f32)> {
        let state = self.state.lock().expect("lyric service mutex poisoned");
        if !state.word_mode_enabled || state.current_line < 0 {
            return None;
        }
        let adjusted = (state.position_ms as i64 + self.lyric_offset_ms).max(0) as u64;
        state
            .word_lines
            .as_ref()
            .and_then(|lines| lines.get(state.current_line as usize))
            .and_then(|line| line.word_at(adjusted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyric::fetcher::StaticLyricFetcher;
    use crate::models::song::{Album, Artist};

    fn song(id: i64) -> Song {
        Song::new(
            id,
            "t",
            180_000,
            "",
            vec![Artist { id: 1, name: "a".into() }],
            Album { id: 1, name: "al".into(), artist_id: 1, artist_name: "a".into() },
        )
    }

    #[tokio::test]
    async fn scenario_6_word_highlight_mid_word() {
        let fetcher = Arc::new(StaticLyricFetcher::new());
        fetcher.seed(
            1,
            RawLyricDocument {
                lrc: Some("[00:05.00]hello\n".into()),
                translation_lrc: None,
                yrc: Some("[5000,500](5000,500,0)hello".into()),
            },
        );
        let service = LyricService::new(fetcher, 0, false);
        service.enable_yrc(true);
        service.set_song(song(1));
        // Let the spawned fetch task run.
        tokio::time::sleep(Duration::from_millis(20)).await;

        service.update_position(5_100);
        let state = service.state();
        assert_eq!(state.current_line, 0);
        let (word_idx, progress) = service.current_word().unwrap();
        assert_eq!(word_idx, 0);
        assert!((progress - 0.2).abs() < 0.01);
    }

    #[tokio::test]
    async fn monotonic_positions_yield_non_decreasing_line_index() {
        let fetcher = Arc::new(StaticLyricFetcher::new());
        fetcher.seed(
            1,
            RawLyricDocument {
                lrc: Some("[00:01.00]a\n[00:02.00]b\n[00:03.00]c\n".into()),
                translation_lrc: None,
                yrc: None,
            },
        );
        let service = LyricService::new(fetcher, 0, false);
        service.set_song(song(1));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut last = -1;
        for ms in [0, 500, 1000, 1500, 2500, 3500, 10_000] {
            service.update_position(ms);
            let idx = service.state().current_line;
            assert!(idx >= last);
            last = idx;
        }
    }

    #[tokio::test]
    async fn cancelled_set_song_does_not_mutate_state() {
        let fetcher = Arc::new(StaticLyricFetcher::new());
        fetcher.seed(
            1,
            RawLyricDocument {
                lrc: Some("[00:01.00]first\n".into()),
                translation_lrc: None,
                yrc: None,
            },
        );
        fetcher.seed(
            2,
            RawLyricDocument {
                lrc: Some("[00:02.00]second\n".into()),
                translation_lrc: None,
                yrc: None,
            },
        );
        let service = LyricService::new(fetcher, 0, false);
        service.set_song(song(1));
        service.set_song(song(2));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let state = service.state();
        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].text, "second");
    }

    #[tokio::test]
    async fn strict_mode_abandons_document_on_malformed_line() {
        let fetcher = Arc::new(StaticLyricFetcher::new());
        fetcher.seed(
            1,
            RawLyricDocument {
                lrc: Some("[00:01.00]ok\nnot a lyric line\n".into()),
                translation_lrc: None,
                yrc: None,
            },
        );
        let service = LyricService::new(fetcher, 0, true);
        service.set_song(song(1));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(service.state().lines.is_empty());
    }
}
