use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::models::PlayMode;

/// Play-mode argument for the CLI, mirroring the five user-selectable
/// `PlayMode` cases (`Intelligent` is entered only via the recommender and is
/// not a startup default a user would pick).
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlayModeArg {
    Ordered,
    ListLoop,
    SingleLoop,
    ListRandom,
    InfiniteRandom,
}

impl From<PlayModeArg> for PlayMode {
    fn from(arg: PlayModeArg) -> Self {
        match arg {
            PlayModeArg::Ordered => PlayMode::Ordered,
            PlayModeArg::ListLoop => PlayMode::ListLoop,
            PlayModeArg::SingleLoop => PlayMode::SingleLoop,
            PlayModeArg::ListRandom => PlayMode::ListRandom,
            PlayModeArg::InfiniteRandom => PlayMode::InfiniteRandom,
        }
    }
}

/// auracore - the playback engine core of a terminal music client.
///
/// This binary is a thin harness: it wires the engine's collaborators (a
/// SQLite-backed key/value store, a stub track-source resolver, a stub lyric
/// fetcher, and a `souvlaki`-backed remote control) and drives the engine's
/// long-lived tasks until interrupted. It does not render a TUI — the menu
/// tree and rendering pipeline are out of scope for this core.
#[derive(Parser, Debug)]
#[command(name = "auracore")]
#[command(about = "Playback engine core for a terminal music client")]
#[command(version)]
pub struct Cli {
    /// Directory for the SQLite-backed key/value store. Omit to run with an
    /// in-memory store (state does not survive restarts).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Starting volume, 0-100.
    #[arg(long, default_value_t = 70)]
    pub volume: u8,

    /// Default play mode.
    #[arg(long, value_enum, default_value = "list-loop")]
    pub mode: PlayModeArg,

    /// Consecutive track-resolution failures before the transport stops.
    #[arg(long, default_value_t = 3)]
    pub max_play_error_threshold: u32,

    /// Lyric offset in milliseconds, applied before line lookup. May be
    /// negative.
    #[arg(long, default_value_t = 0)]
    pub lyric_offset_ms: i64,

    /// Cadence of the decoder's time channel, in milliseconds.
    #[arg(long, default_value_t = 200)]
    pub time_channel_cadence_ms: u64,

    /// Enable the HTTP scrobble-alike reporter (requires --http-reporter-endpoint).
    #[arg(long)]
    pub enable_http_reporter: bool,

    /// Endpoint the HTTP reporter POSTs play events to.
    #[arg(long, value_name = "URL")]
    pub http_reporter_endpoint: Option<String>,

    /// Disable the local play-count reporter.
    #[arg(long)]
    pub disable_play_count_reporter: bool,

    /// Abort parsing a lyric document on the first malformed line instead of
    /// skipping it.
    #[arg(long)]
    pub strict_lyric_parsing: bool,
}
