use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::Song;
use crate::playlist::KeyValueStore;
use crate::reporter::{is_eligible_play, log_reporter_failure, Reporter};

const PLAY_COUNTS_KEY: &str = "play_counts";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlayCounts(HashMap<String, u64>);

/// Stands in for "the origin service's own play-count endpoint" without
/// speaking its real wire protocol: tallies locally eligible plays through
/// the shared `KeyValueStore`.
pub struct PlayCountReporter {
    store: Arc<dyn KeyValueStore>,
}

impl PlayCountReporter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn count_for(&self, song_id: i64) -> u64 {
        self.load().0.get(&song_id.to_string()).copied().unwrap_or(0)
    }

    fn load(&self) -> PlayCounts {
        self.store
            .get(PLAY_COUNTS_KEY)
            .ok()
            .flatten()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn increment(&self, song_id: i64) {
        let mut counts = self.load();
        *counts.0.entry(song_id.to_string()).or_insert(0) += 1;
        match serde_json::to_vec(&counts) {
            Ok(bytes) => {
                if let Err(err) = self.store.set(PLAY_COUNTS_KEY, &bytes) {
                    log_reporter_failure(self.name(), "persist play count", err);
                }
            }
            Err(err) => log_reporter_failure(self.name(), "serialize play counts", err),
        }
    }
}

impl Reporter for PlayCountReporter {
    fn report_start(&self, song: &Song) {
        debug!("play_count: started song {}", song.id);
    }

    fn report_end(&self, song: &Song, played: Duration) {
        if !is_eligible_play(song, played) {
            debug!("play_count: song {} not eligible ({:?} played)", song.id, played);
            return;
        }
        self.increment(song.id);
    }

    fn name(&self) -> &str {
        "play_count"
    }
}
