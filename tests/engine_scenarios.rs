//! End-to-end scenarios exercising the Playback Engine against real
//! `PlaylistManager`/`LyricService` components and lightweight test doubles
//! for the collaborators the core treats as external (decoder, resolver,
//! reporters, remote control).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use auracore::audio::{AudioEvents, AudioPlayerAdapter};
use auracore::engine::notifier::LoggingNotifier;
use auracore::engine::pager::NoopQueuePager;
use auracore::engine::recommender::EmptyRecommender;
use auracore::engine::resolver::{QualityPreference, ResolvedSource, StaticTrackSourceResolver};
use auracore::engine::{EngineDeps, PlaybackEngine};
use auracore::error::Result;
use auracore::lyric::fetcher::{RawLyricDocument, StaticLyricFetcher};
use auracore::lyric::LyricService;
use auracore::models::song::{Album, Artist};
use auracore::models::{PlayMode, PlayerState, Song};
use auracore::playlist::{InMemoryKeyValueStore, PlaylistManager};
use auracore::remote::{InProcessSink, MediaControlSink, RemoteControlBridge};
use auracore::reporter::{Reporter, ReporterPipeline};

fn song(id: i64) -> Song {
    Song::new(
        id,
        format!("song {id}"),
        180_000,
        "",
        vec![Artist { id: 1, name: "artist".into() }],
        Album { id: 1, name: "album".into(), artist_id: 1, artist_name: "artist".into() },
    )
}

/// An in-memory decoder stand-in: records every transport call and lets the
/// test drive state/time events directly through the channels it was built
/// with, rather than actually decoding audio.
struct FakeAudioPlayer {
    calls: Mutex<Vec<String>>,
    volume: AtomicU8,
}

impl FakeAudioPlayer {
    fn spawn(initial_volume: u8) -> (Arc<Self>, AudioEvents, tokio::sync::mpsc::UnboundedSender<PlayerState>, tokio::sync::mpsc::UnboundedSender<Duration>) {
        let (state_tx, state_rx) = tokio::sync::mpsc::unbounded_channel();
        let (time_tx, time_rx) = tokio::sync::mpsc::unbounded_channel();
        let player = Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            volume: AtomicU8::new(initial_volume),
        });
        (player, AudioEvents { state_rx, time_rx }, state_tx, time_tx)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }
}

impl AudioPlayerAdapter for FakeAudioPlayer {
    fn play(&self, source: String) -> Result<()> {
        self.log(format!("play:{source}"));
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.log("pause");
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        self.log("resume");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.log("stop");
        Ok(())
    }

    fn toggle(&self) -> Result<()> {
        self.log("toggle");
        Ok(())
    }

    fn seek(&self, position: Duration) -> Result<()> {
        self.log(format!("seek:{}", position.as_millis()));
        Ok(())
    }

    fn set_volume(&self, volume: u8) -> Result<()> {
        self.volume.store(volume, Ordering::Release);
        self.log(format!("set_volume:{volume}"));
        Ok(())
    }

    fn volume(&self) -> u8 {
        self.volume.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.log("close");
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<(&'static str, i64)>>,
}

impl RecordingReporter {
    fn events(&self) -> Vec<(&'static str, i64)> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report_start(&self, song: &Song) {
        self.events.lock().unwrap().push(("start", song.id));
    }

    fn report_end(&self, song: &Song, _played: Duration) {
        self.events.lock().unwrap().push(("end", song.id));
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn seeded_resolver(ids: &[i64]) -> Arc<StaticTrackSourceResolver> {
    let resolver = Arc::new(StaticTrackSourceResolver::new());
    for &id in ids {
        resolver.seed(id, ResolvedSource { url: format!("file:///{id}.mp3"), media_type: "audio/mpeg".into() });
    }
    resolver
}

/// Scenario 5 (spec Section 8): playing s0 then advancing to s1 reports end
/// for s0 before start for s1, and the remote control snapshot reflects s1.
#[tokio::test]
async fn scenario_5_report_ordering_and_remote_refresh_on_advance() {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let playlist = Arc::new(PlaylistManager::new(store.clone(), PlayMode::ListLoop));
    playlist.initialize(0, vec![song(0), song(1)]).unwrap();

    let (audio, audio_events, _state_tx, _time_tx) = FakeAudioPlayer::spawn(70);
    let reporter = Arc::new(RecordingReporter::default());
    let mut pipeline = ReporterPipeline::new();
    pipeline.register(Box::new(RecordingReporterHandle(Arc::clone(&reporter))));

    let remote_sink = Arc::new(InProcessSink::new());
    let remote = Arc::new(RemoteControlBridge::new(Box::new(InProcessSinkHandle(Arc::clone(&remote_sink)))));

    let engine = PlaybackEngine::spawn(EngineDeps {
        playlist,
        audio: audio.clone(),
        audio_events,
        lyric: LyricService::new(Arc::new(StaticLyricFetcher::new()), 0, false),
        reporters: Arc::new(pipeline),
        remote,
        resolver: seeded_resolver(&[0, 1]),
        recommender: Arc::new(EmptyRecommender),
        pager: Arc::new(NoopQueuePager),
        notifier: Arc::new(LoggingNotifier),
        store,
        max_play_error_threshold: 3,
    });

    engine.start_play();
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.next(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(reporter.events(), vec![("start", 0), ("end", 0), ("start", 1)]);
    assert!(audio.calls().iter().any(|c| c == "play:file:///1.mp3"));

    let info = remote_sink.last_published().expect("remote control should have published a snapshot");
    assert_eq!(info.song_id, 1);

    engine.close().await;
}

/// Scenario 3: ordered mode at the last song stops the transport instead of
/// advancing.
#[tokio::test]
async fn scenario_3_ordered_mode_stops_at_end() {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let playlist = Arc::new(PlaylistManager::new(store.clone(), PlayMode::Ordered));
    playlist.initialize(2, vec![song(0), song(1), song(2)]).unwrap();

    let (audio, audio_events, _state_tx, _time_tx) = FakeAudioPlayer::spawn(70);
    let remote_sink = Arc::new(InProcessSink::new());
    let remote = Arc::new(RemoteControlBridge::new(Box::new(InProcessSinkHandle(Arc::clone(&remote_sink)))));

    let engine = PlaybackEngine::spawn(EngineDeps {
        playlist: Arc::clone(&playlist),
        audio: audio.clone(),
        audio_events,
        lyric: LyricService::new(Arc::new(StaticLyricFetcher::new()), 0, false),
        reporters: Arc::new(ReporterPipeline::new()),
        remote,
        resolver: seeded_resolver(&[0, 1, 2]),
        recommender: Arc::new(EmptyRecommender),
        pager: Arc::new(NoopQueuePager),
        notifier: Arc::new(LoggingNotifier),
        store,
        max_play_error_threshold: 3,
    });

    engine.next(false);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(playlist.current_index(), 2);
    assert!(audio.calls().iter().any(|c| c == "stop"));

    engine.close().await;
}

/// Scenario 6: word-timed lyrics highlight mid-word once the time-event
/// loop forwards the playhead through the engine.
#[tokio::test]
async fn scenario_6_time_events_drive_word_highlighting() {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let playlist = Arc::new(PlaylistManager::new(store.clone(), PlayMode::ListLoop));
    playlist.initialize(0, vec![song(1)]).unwrap();

    let fetcher = Arc::new(StaticLyricFetcher::new());
    fetcher.seed(
        1,
        RawLyricDocument {
            lrc: Some("[00:05.00]hello\n".into()),
            translation_lrc: None,
            yrc: Some("[5000,500](5000,500,0)hello".into()),
        },
    );
    let lyric = LyricService::new(fetcher, 0, false);
    lyric.enable_yrc(true);

    let (audio, audio_events, _state_tx, time_tx) = FakeAudioPlayer::spawn(70);
    let remote_sink = Arc::new(InProcessSink::new());
    let remote = Arc::new(RemoteControlBridge::new(Box::new(InProcessSinkHandle(Arc::clone(&remote_sink)))));

    let engine = PlaybackEngine::spawn(EngineDeps {
        playlist,
        audio: audio.clone(),
        audio_events,
        lyric: Arc::clone(&lyric),
        reporters: Arc::new(ReporterPipeline::new()),
        remote,
        resolver: seeded_resolver(&[1]),
        recommender: Arc::new(EmptyRecommender),
        pager: Arc::new(NoopQueuePager),
        notifier: Arc::new(LoggingNotifier),
        store,
        max_play_error_threshold: 3,
    });

    engine.start_play();
    tokio::time::sleep(Duration::from_millis(50)).await;

    time_tx.send(Duration::from_millis(5_100)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (word_idx, progress) = lyric.current_word().expect("a word should be highlighted");
    assert_eq!(word_idx, 0);
    assert!((progress - 0.2).abs() < 0.05);

    engine.close().await;
}

/// An empty resolved URL is treated the same as a resolve failure (spec
/// Section 7): the engine counts it toward the error tally and advances
/// instead of handing an empty source to the decoder.
#[tokio::test]
async fn empty_resolved_url_advances_instead_of_playing() {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let playlist = Arc::new(PlaylistManager::new(store.clone(), PlayMode::ListLoop));
    playlist.initialize(0, vec![song(0), song(1)]).unwrap();

    let (audio, audio_events, _state_tx, _time_tx) = FakeAudioPlayer::spawn(70);

    let resolver = Arc::new(StaticTrackSourceResolver::new());
    resolver.seed(0, ResolvedSource { url: String::new(), media_type: "audio/mpeg".into() });
    resolver.seed(1, ResolvedSource { url: "file:///1.mp3".into(), media_type: "audio/mpeg".into() });

    let remote_sink = Arc::new(InProcessSink::new());
    let remote = Arc::new(RemoteControlBridge::new(Box::new(InProcessSinkHandle(Arc::clone(&remote_sink)))));

    let engine = PlaybackEngine::spawn(EngineDeps {
        playlist,
        audio: audio.clone(),
        audio_events,
        lyric: LyricService::new(Arc::new(StaticLyricFetcher::new()), 0, false),
        reporters: Arc::new(ReporterPipeline::new()),
        remote,
        resolver,
        recommender: Arc::new(EmptyRecommender),
        pager: Arc::new(NoopQueuePager),
        notifier: Arc::new(LoggingNotifier),
        store,
        max_play_error_threshold: 3,
    });

    engine.start_play();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let calls = audio.calls();
    assert!(!calls.iter().any(|c| c == "play:"));
    assert!(calls.iter().any(|c| c == "play:file:///1.mp3"));

    engine.close().await;
}

// `Reporter`/`MediaControlSink` are object-safe traits taking `&self`; these
// thin wrappers let the test hold its own `Arc` to the recorder/sink for
// assertions while handing the engine a boxed trait object over the same
// underlying state.
struct RecordingReporterHandle(Arc<RecordingReporter>);

impl Reporter for RecordingReporterHandle {
    fn report_start(&self, song: &Song) {
        self.0.report_start(song);
    }
    fn report_end(&self, song: &Song, played: Duration) {
        self.0.report_end(song, played);
    }
    fn name(&self) -> &str {
        self.0.name()
    }
}

struct InProcessSinkHandle(Arc<InProcessSink>);

impl MediaControlSink for InProcessSinkHandle {
    fn update(&self, info: &auracore::models::PlayingInfo) {
        self.0.update(info);
    }
    fn poll_command(&self) -> Option<auracore::remote::CtrlSignal> {
        self.0.poll_command()
    }
}
