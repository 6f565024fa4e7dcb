//! The Reporter Pipeline (spec Section 4.5): fans play-start/play-end events
//! out to zero or more external reporters, each with its own eligibility
//! policy.

mod http_reporter;
mod play_count_reporter;

pub use http_reporter::HttpReporter;
pub use play_count_reporter::PlayCountReporter;

use std::time::Duration;

use log::warn;

use crate::models::Song;

/// A sink for play-start and play-end events. Each reporter decides for
/// itself whether a given play is eligible (e.g. "played >= 50% or >= 4
/// minutes"); the pipeline does not second-guess that decision.
pub trait Reporter: Send + Sync {
    fn report_start(&self, song: &Song);
    /// `played` is the accumulated time actually spent playing `song`.
    fn report_end(&self, song: &Song, played: Duration);

    fn name(&self) -> &str;
}

/// Applies every registered reporter in registration order. A failing
/// reporter logs and is skipped; it never prevents the others from running.
#[derive(Default)]
pub struct ReporterPipeline {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn report_start(&self, song: &Song) {
        for reporter in &self.reporters {
            reporter.report_start(song);
        }
    }

    pub fn report_end(&self, song: &Song, played: Duration) {
        for reporter in &self.reporters {
            reporter.report_end(song, played);
        }
    }
}

/// Whether a play is eligible for reporting under the "played >= 50% of the
/// track or >= 4 minutes" rule used throughout the pack. Fixed per the spec's
/// open-question resolution rather than made configurable.
pub(crate) fn is_eligible_play(song: &Song, played: Duration) -> bool {
    const MIN_PLAYED_MS: u64 = 4 * 60 * 1000;
    let played_ms = played.as_millis() as u64;
    if played_ms >= MIN_PLAYED_MS {
        return true;
    }
    song.duration_ms > 0 && played_ms * 2 >= song.duration_ms
}

pub(crate) fn log_reporter_failure(name: &str, op: &str, err: impl std::fmt::Display) {
    warn!("reporter '{name}' failed during {op}: {err}");
}
