mod audio;
mod cli;
mod config;
mod engine;
mod error;
mod lyric;
mod models;
mod playlist;
mod remote;
mod reporter;

use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use cli::Cli;
use config::Config;
use engine::notifier::LoggingNotifier;
use engine::pager::NoopQueuePager;
use engine::recommender::EmptyRecommender;
use engine::resolver::StaticTrackSourceResolver;
use engine::{EngineDeps, PlaybackEngine};
use error::Result;
use lyric::{LyricService, NullLyricFetcher};
use playlist::store::keys;
use playlist::{InMemoryKeyValueStore, KeyValueStore, PlaylistManager, SqliteKeyValueStore};
use remote::{RemoteControlBridge, SouvlakiMediaControlSink};
use reporter::{HttpReporter, PlayCountReporter, ReporterPipeline};

/// auracore — the playback engine core of a terminal music client. This
/// binary is a thin harness: it wires the engine's collaborators and drives
/// the engine's long-lived tasks until interrupted. It does not render a
/// TUI — the menu tree and rendering pipeline are out of scope for this
/// core.
#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("auracore exited with an error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(&cli)?;

    let store: Arc<dyn KeyValueStore> = match config.database_path() {
        Some(path) => Arc::new(SqliteKeyValueStore::open(path)?),
        None => Arc::new(InMemoryKeyValueStore::new()),
    };

    let initial_volume = match store.get(keys::VOLUME)? {
        Some(bytes) => serde_json::from_slice(&bytes).unwrap_or(config.default_volume),
        None => config.default_volume,
    };

    let playlist = Arc::new(PlaylistManager::new(Arc::clone(&store), config.default_play_mode));
    playlist.load_state()?;

    let (audio, audio_events) = audio::RodioAudioPlayer::spawn(initial_volume, config.time_channel_cadence_ms)?;

    let lyric = LyricService::new(Arc::new(NullLyricFetcher), config.lyric_offset_ms, config.strict_lyric_parsing);

    let mut reporters = ReporterPipeline::new();
    if config.play_count_reporter_enabled {
        reporters.register(Box::new(PlayCountReporter::new(Arc::clone(&store))));
    }
    if config.http_reporter_enabled {
        if let Some(endpoint) = config.http_reporter_endpoint.clone() {
            reporters.register(Box::new(HttpReporter::new(endpoint)));
        }
    }

    let remote = Arc::new(RemoteControlBridge::new(Box::new(SouvlakiMediaControlSink::new())));

    let resolver = Arc::new(StaticTrackSourceResolver::new());

    let engine = PlaybackEngine::spawn(EngineDeps {
        playlist,
        audio,
        audio_events,
        lyric,
        reporters: Arc::new(reporters),
        remote,
        resolver,
        recommender: Arc::new(EmptyRecommender),
        pager: Arc::new(NoopQueuePager),
        notifier: Arc::new(LoggingNotifier),
        store,
        max_play_error_threshold: config.max_play_error_threshold,
    });

    tokio::signal::ctrl_c().await.ok();
    info!("auracore: shutting down");
    engine.close().await;
    Ok(())
}
