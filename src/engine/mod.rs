//! The Playback Engine (spec Section 4.2): orchestrates the Playlist
//! Manager, Audio Player Adapter, Lyric Service, Reporter Pipeline, and
//! Remote Control Bridge behind three long-lived tasks sharing one
//! cancellation scope (spec Section 5).

pub mod notifier;
pub mod pager;
pub mod recommender;
pub mod resolver;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::audio::{AudioEvents, AudioPlayerAdapter};
use crate::engine::notifier::Notifier;
use crate::engine::pager::QueuePager;
use crate::engine::recommender::Recommender;
use crate::engine::resolver::{QualityPreference, TrackSourceResolver};
use crate::error::EngineError;
use crate::lyric::LyricService;
use crate::models::{PlayMode, PlayerState, PlayingInfo, Song};
use crate::playlist::store::keys;
use crate::playlist::{KeyValueStore, PlaylistManager};
use crate::remote::{CtrlSignal, RemoteControlBridge};
use crate::reporter::ReporterPipeline;

/// The "stuck decoder" window from spec Section 4.2: if the playhead drifts
/// this far past the song's reported duration, the engine treats the track
/// as stalled and advances. Hardcoded per the spec's Open Questions
/// resolution (DESIGN.md) rather than surfaced as a `Config` knob.
const STUCK_DECODER_WINDOW_MS: i64 = 10_000;

/// How often the control-signal task polls the Remote Control Bridge for an
/// inbound OS/IPC command, and re-checks the cancellation flag.
const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(100);

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which direction a failed resolve/play should retry in — the same
/// direction that led to the `Play` call in the first place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// All transport and queue mutations funnel through this enum so they're
/// serialized by the single control-signal task (spec Section 5 ordering
/// guarantees).
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Play(Song, Direction),
    StartPlay,
    RemoveSong(i64),
    Pause,
    Resume,
    Toggle,
    Stop,
    Next(bool),
    Previous(bool),
    Seek(Duration),
    SetVolume(u8),
    UpVolume,
    DownVolume,
    SetMode(PlayMode),
    SwitchMode,
    Intelligence(bool),
    Close,
}

struct RuntimeState {
    current_song: Option<Song>,
    player_state: PlayerState,
    error_count: u32,
    last_direction: Direction,
    song_started_at: Option<Instant>,
    accumulated_played: Duration,
    last_elapsed: Duration,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            current_song: None,
            player_state: PlayerState::Stopped,
            error_count: 0,
            last_direction: Direction::Forward,
            song_started_at: None,
            accumulated_played: Duration::ZERO,
            last_elapsed: Duration::ZERO,
        }
    }
}

/// The collaborators the engine orchestrates. Every field is swappable for
/// testing — `StaticTrackSourceResolver`, `InMemoryKeyValueStore`,
/// `InProcessSink`, and so on.
pub struct EngineDeps {
    pub playlist: Arc<PlaylistManager>,
    pub audio: Arc<dyn AudioPlayerAdapter>,
    pub audio_events: AudioEvents,
    pub lyric: Arc<LyricService>,
    pub reporters: Arc<ReporterPipeline>,
    pub remote: Arc<RemoteControlBridge>,
    pub resolver: Arc<dyn TrackSourceResolver>,
    pub recommender: Arc<dyn Recommender>,
    pub pager: Arc<dyn QueuePager>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn KeyValueStore>,
    pub max_play_error_threshold: u32,
}

pub struct PlaybackEngine {
    playlist: Arc<PlaylistManager>,
    audio: Arc<dyn AudioPlayerAdapter>,
    lyric: Arc<LyricService>,
    reporters: Arc<ReporterPipeline>,
    remote: Arc<RemoteControlBridge>,
    resolver: Arc<dyn TrackSourceResolver>,
    recommender: Arc<dyn Recommender>,
    pager: Arc<dyn QueuePager>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn KeyValueStore>,
    max_play_error_threshold: u32,
    command_tx: UnboundedSender<EngineCommand>,
    closed: Arc<AtomicBool>,
    state: Mutex<RuntimeState>,
    tasks: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl PlaybackEngine {
    /// Spawns the three long-lived tasks (control-signal, state-event,
    /// time-event) and returns the orchestrator. Matches the crate's
    /// existing async-runtime convention: `tokio::task::spawn` from a
    /// `tokio::main` runtime.
    pub fn spawn(deps: EngineDeps) -> Arc<Self> {
        let EngineDeps {
            playlist,
            audio,
            audio_events,
            lyric,
            reporters,
            remote,
            resolver,
            recommender,
            pager,
            notifier,
            store,
            max_play_error_threshold,
        } = deps;
        let AudioEvents { state_rx, time_rx } = audio_events;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            playlist,
            audio,
            lyric,
            reporters,
            remote,
            resolver,
            recommender,
            pager,
            notifier,
            store,
            max_play_error_threshold: max_play_error_threshold.max(1),
            command_tx,
            closed: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(RuntimeState::default()),
            tasks: Mutex::new(None),
        });

        let control_engine = Arc::clone(&engine);
        let control_handle = tokio::spawn(async move { control_engine.run_control_loop(command_rx).await });

        let state_engine = Arc::clone(&engine);
        let state_handle = tokio::spawn(async move { state_engine.run_state_loop(state_rx).await });

        let time_engine = Arc::clone(&engine);
        let time_handle = tokio::spawn(async move { time_engine.run_time_loop(time_rx).await });

        *engine.tasks.lock().expect("engine mutex poisoned") = Some(vec![control_handle, state_handle, time_handle]);
        engine
    }

    // -- Public command surface: every method is non-blocking and enqueues
    // onto the control channel for serialized handling. --

    pub fn play(&self, song: Song, direction: Direction) {
        self.send(EngineCommand::Play(song, direction));
    }

    pub fn start_play(&self) {
        self.send(EngineCommand::StartPlay);
    }

    /// Removes a song from the queue. If the removal displaced the playing
    /// cursor, the engine plays the displaced song immediately (spec's Open
    /// Question resolution, DESIGN.md) rather than leaving that decision to
    /// the Playlist Manager.
    pub fn remove_song(&self, index: i64) {
        self.send(EngineCommand::RemoveSong(index));
    }

    pub fn pause(&self) {
        self.send(EngineCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(EngineCommand::Resume);
    }

    pub fn toggle(&self) {
        self.send(EngineCommand::Toggle);
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn next(&self, manual: bool) {
        self.send(EngineCommand::Next(manual));
    }

    pub fn previous(&self, manual: bool) {
        self.send(EngineCommand::Previous(manual));
    }

    pub fn seek(&self, position: Duration) {
        self.send(EngineCommand::Seek(position));
    }

    pub fn set_volume(&self, volume: u8) {
        self.send(EngineCommand::SetVolume(volume));
    }

    pub fn up_volume(&self) {
        self.send(EngineCommand::UpVolume);
    }

    pub fn down_volume(&self) {
        self.send(EngineCommand::DownVolume);
    }

    pub fn set_mode(&self, mode: PlayMode) {
        self.send(EngineCommand::SetMode(mode));
    }

    pub fn switch_mode(&self) {
        self.send(EngineCommand::SwitchMode);
    }

    pub fn intelligence(&self, append_mode: bool) {
        self.send(EngineCommand::Intelligence(append_mode));
    }

    /// Cancels the engine's three tasks, releases the decoder, persists the
    /// final snapshot, and returns once everything has wound down.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.send(EngineCommand::Close);
        let handles = self.tasks.lock().expect("engine mutex poisoned").take();
        if let Some(handles) = handles {
            for handle in handles {
                if let Err(err) = handle.await {
                    warn!("PlaybackEngine: task join failed during close: {err}");
                }
            }
        }
    }

    fn send(&self, command: EngineCommand) {
        if self.command_tx.send(command).is_err() {
            warn!("PlaybackEngine: command channel closed, dropping command");
        }
    }

    // -- Task bodies --

    async fn run_control_loop(self: Arc<Self>, mut rx: UnboundedReceiver<EngineCommand>) {
        let mut poll_interval = tokio::time::interval(CONTROL_POLL_INTERVAL);
        loop {
            tokio::select! {
                biased;
                maybe_command = rx.recv() => {
                    match maybe_command {
                        Some(command) => {
                            let is_close = matches!(command, EngineCommand::Close);
                            self.handle_command(command).await;
                            if is_close {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = poll_interval.tick() => {
                    while let Some(signal) = self.remote.poll_command() {
                        self.handle_ctrl_signal(signal).await;
                    }
                    if self.closed.load(Ordering::Acquire) {
                        break;
                    }
                }
            }
        }
        debug!("PlaybackEngine: control-signal task exiting");
    }

    async fn run_state_loop(self: Arc<Self>, mut rx: UnboundedReceiver<PlayerState>) {
        loop {
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
                Ok(Some(new_state)) => self.handle_state_event(new_state),
                Ok(None) => break,
                Err(_) => continue,
            }
        }
        debug!("PlaybackEngine: state-event task exiting");
    }

    async fn run_time_loop(self: Arc<Self>, mut rx: UnboundedReceiver<Duration>) {
        loop {
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
                Ok(Some(elapsed)) => self.handle_time_event(elapsed),
                Ok(None) => break,
                Err(_) => continue,
            }
        }
        debug!("PlaybackEngine: time-event task exiting");
    }

    /// Item 1 of spec Section 5: on `Stopped` after a `Playing` state, the
    /// state-event task triggers `Next(manual=false)` by handing it back to
    /// the control channel, keeping all mutation serialized in one place.
    fn handle_state_event(&self, new_state: PlayerState) {
        let mut state = self.state.lock().expect("engine mutex poisoned");
        let previous = state.player_state;
        if previous == PlayerState::Playing && new_state != PlayerState::Playing {
            if let Some(started_at) = state.song_started_at.take() {
                state.accumulated_played += started_at.elapsed();
            }
        }
        if new_state == PlayerState::Playing && previous != PlayerState::Playing {
            state.song_started_at = Some(Instant::now());
        }
        state.player_state = new_state;
        drop(state);

        if previous == PlayerState::Playing && new_state == PlayerState::Stopped {
            self.send(EngineCommand::Next(false));
        }
    }

    /// Item 2 of spec Section 5: forwards the playhead to the Lyric
    /// Service, refreshes the Remote Control snapshot, and detects a stuck
    /// decoder.
    fn handle_time_event(&self, elapsed: Duration) {
        self.lyric.update_position(elapsed.as_millis() as u64);

        let (song, player_state) = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            state.last_elapsed = elapsed;
            (state.current_song.clone(), state.player_state)
        };

        let info = self.build_playing_info(&song, player_state, elapsed);
        self.remote.publish(&info);

        if let Some(song) = song {
            let drift_ms = elapsed.as_millis() as i64 - song.duration_ms as i64;
            if drift_ms > STUCK_DECODER_WINDOW_MS {
                warn!("PlaybackEngine: decoder appears stuck ({drift_ms}ms past duration), advancing");
                self.send(EngineCommand::Next(false));
            }
        }
    }

    async fn handle_command(self: &Arc<Self>, command: EngineCommand) {
        match command {
            EngineCommand::Play(song, direction) => self.play_song(song, direction).await,
            EngineCommand::StartPlay => {
                let song = self.playlist.current_song();
                if !song.is_empty() {
                    self.play_song(song, Direction::Forward).await;
                }
            }
            EngineCommand::Pause => {
                if let Err(err) = self.audio.pause() {
                    warn!("PlaybackEngine: pause failed: {err}");
                }
            }
            EngineCommand::Resume => {
                if let Err(err) = self.audio.resume() {
                    warn!("PlaybackEngine: resume failed: {err}");
                }
            }
            EngineCommand::Toggle => {
                if let Err(err) = self.audio.toggle() {
                    warn!("PlaybackEngine: toggle failed: {err}");
                }
            }
            EngineCommand::Stop => {
                self.finish_previous_song_report();
                if let Err(err) = self.audio.stop() {
                    warn!("PlaybackEngine: stop failed: {err}");
                }
            }
            EngineCommand::RemoveSong(index) => match self.playlist.remove_song(index) {
                Ok(Some(displaced)) => self.play_song(displaced, Direction::Forward).await,
                Ok(None) => {}
                Err(err) => warn!("PlaybackEngine: RemoveSong({index}) failed: {err}"),
            },
            EngineCommand::Next(manual) => self.do_next(manual).await,
            EngineCommand::Previous(manual) => self.do_previous(manual).await,
            EngineCommand::Seek(position) => {
                if let Err(err) = self.audio.seek(position) {
                    warn!("PlaybackEngine: seek failed: {err}");
                }
            }
            EngineCommand::SetVolume(volume) => self.apply_volume(volume),
            EngineCommand::UpVolume => self.apply_volume(self.audio.volume().saturating_add(5).min(100)),
            EngineCommand::DownVolume => self.apply_volume(self.audio.volume().saturating_sub(5)),
            EngineCommand::SetMode(mode) => self.playlist.set_play_mode(mode),
            EngineCommand::SwitchMode => {
                let next = self.playlist.get_play_mode().next_in_cycle();
                self.playlist.set_play_mode(next);
            }
            EngineCommand::Intelligence(append_mode) => self.do_intelligence(append_mode).await,
            EngineCommand::Close => {
                self.closed.store(true, Ordering::SeqCst);
                self.finish_previous_song_report();
                self.persist_volume();
                self.playlist.persist();
                self.audio.close();
            }
        }
    }

    async fn handle_ctrl_signal(self: &Arc<Self>, signal: CtrlSignal) {
        match signal {
            CtrlSignal::Pause => self.handle_command(EngineCommand::Pause).await,
            CtrlSignal::Resume => self.handle_command(EngineCommand::Resume).await,
            CtrlSignal::Stop => self.handle_command(EngineCommand::Stop).await,
            CtrlSignal::Toggle => self.handle_command(EngineCommand::Toggle).await,
            CtrlSignal::Previous => self.handle_command(EngineCommand::Previous(true)).await,
            CtrlSignal::Next => self.handle_command(EngineCommand::Next(true)).await,
            CtrlSignal::Seek(position) => self.handle_command(EngineCommand::Seek(position)).await,
            CtrlSignal::Rerender => {
                let (song, player_state, elapsed) = {
                    let state = self.state.lock().expect("engine mutex poisoned");
                    (state.current_song.clone(), state.player_state, state.last_elapsed)
                };
                let info = self.build_playing_info(&song, player_state, elapsed);
                self.remote.publish(&info);
            }
        }
    }

    /// Cursor-at-end policy (spec Section 4.2): when `Next` is called at
    /// the last song, the pager's bottom-out hook runs before the advance so
    /// auto-pagination keeps endless feeds growing.
    async fn do_next(self: &Arc<Self>, manual: bool) {
        let at_last = {
            let playlist = self.playlist.playlist();
            playlist.current_index >= 0 && playlist.current_index as usize + 1 >= playlist.len()
        };
        if at_last {
            let _ = self.pager.load_more().await;
        }
        match self.playlist.next_song(manual) {
            Ok(song) => self.play_song(song, Direction::Forward).await,
            Err(EngineError::NoMoreSongs) => {
                debug!("PlaybackEngine: no more songs, stopping");
                self.finish_previous_song_report();
                let _ = self.audio.stop();
            }
            Err(err) => warn!("PlaybackEngine: Next failed: {err}"),
        }
    }

    async fn do_previous(self: &Arc<Self>, manual: bool) {
        match self.playlist.previous_song(manual) {
            Ok(song) => self.play_song(song, Direction::Backward).await,
            Err(EngineError::NoMoreSongs) => {
                debug!("PlaybackEngine: no earlier songs, stopping");
                self.finish_previous_song_report();
                let _ = self.audio.stop();
            }
            Err(err) => warn!("PlaybackEngine: Previous failed: {err}"),
        }
    }

    /// `Intelligence(appendMode)` (spec Section 4.2): populates the queue
    /// from the injected recommender, either appending and advancing or
    /// replacing the queue with `[current, ...recommended]` at index 0.
    async fn do_intelligence(self: &Arc<Self>, append_mode: bool) {
        let seed = self.playlist.current_song();
        let recommended = match self.recommender.recommend(&seed).await {
            Ok(songs) => songs,
            Err(err) => {
                warn!("PlaybackEngine: recommender failed: {err}");
                return;
            }
        };
        if recommended.is_empty() {
            debug!("PlaybackEngine: recommender returned no songs, Intelligence is a no-op");
            return;
        }

        self.playlist.set_recommender_present(true);
        if append_mode {
            if let Err(err) = self.playlist.append_songs(recommended) {
                warn!("PlaybackEngine: failed to append recommended songs: {err}");
                return;
            }
            self.do_next(true).await;
        } else {
            let mut queue = Vec::with_capacity(recommended.len() + 1);
            queue.push(seed);
            queue.extend(recommended);
            if let Err(err) = self.playlist.initialize(0, queue) {
                warn!("PlaybackEngine: failed to replace queue for Intelligence: {err}");
                return;
            }
            self.playlist.set_play_mode(PlayMode::Intelligent);
            let song = self.playlist.current_song();
            self.play_song(song, Direction::Forward).await;
        }
    }

    /// The Play-song algorithm (spec Section 4.2, steps 1-9). Boxed because
    /// it recurses into itself (steps 5's "advance in the same direction")
    /// through an `async fn`, which Rust cannot otherwise size.
    fn play_song<'a>(self: &'a Arc<Self>, song: Song, direction: Direction) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            // Step 1: report end for the previous song.
            self.finish_previous_song_report();

            // Step 3/4: the menu-scroll hook is out of scope (pure UI hint);
            // pause the decoder to drain any pending buffers before resolve.
            if let Err(err) = self.audio.pause() {
                warn!("PlaybackEngine: pre-resolve pause failed: {err}");
            }

            // Step 5: resolve a playable URL + format. An empty URL is
            // treated identically to a resolve failure (spec Section 7:
            // "network failures... treated as URL-empty").
            let resolution = match self.resolver.resolve(&song, QualityPreference::default()).await {
                Ok(resolved) if resolved.url.is_empty() => {
                    warn!("PlaybackEngine: resolver returned an empty URL for song {}", song.id);
                    None
                }
                Ok(resolved) => Some(resolved),
                Err(err) => {
                    warn!("PlaybackEngine: resolve failed for song {}: {err}", song.id);
                    None
                }
            };

            match resolution {
                Some(resolved) => {
                    {
                        let mut state = self.state.lock().expect("engine mutex poisoned");
                        state.error_count = 0;
                        state.current_song = Some(song.clone());
                        state.song_started_at = Some(Instant::now());
                        state.accumulated_played = Duration::ZERO;
                        state.last_direction = direction;
                        state.last_elapsed = Duration::ZERO;
                    }

                    // Step 6: kick off the (non-blocking) lyric fetch.
                    self.lyric.set_song(song.clone());

                    // Step 7: hand the resolved source to the decoder.
                    if let Err(err) = self.audio.play(resolved.url) {
                        warn!("PlaybackEngine: play failed for song {}: {err}", song.id);
                        self.notifier.notify("Playback error", &err.to_string());
                    }

                    // Step 8: refresh Remote Control and emit Reporter start.
                    let info = self.build_playing_info(&Some(song.clone()), PlayerState::Playing, Duration::ZERO);
                    self.remote.publish(&info);
                    self.reporters.report_start(&song);
                }
                None => {
                    let exceeded = {
                        let mut state = self.state.lock().expect("engine mutex poisoned");
                        state.error_count += 1;
                        state.error_count >= self.max_play_error_threshold
                    };
                    if exceeded {
                        self.notifier.notify(
                            "Playback stopped",
                            &format!("giving up after {} consecutive resolve failures", self.max_play_error_threshold),
                        );
                        let _ = self.audio.stop();
                    } else {
                        self.advance_after_failure(direction).await;
                    }
                }
            }
        })
    }

    fn advance_after_failure<'a>(self: &'a Arc<Self>, direction: Direction) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let result = match direction {
                Direction::Forward => self.playlist.next_song(false),
                Direction::Backward => self.playlist.previous_song(false),
            };
            match result {
                Ok(next_song) => self.play_song(next_song, direction).await,
                Err(EngineError::NoMoreSongs) => {
                    let _ = self.audio.stop();
                }
                Err(err) => warn!("PlaybackEngine: advance after failure errored: {err}"),
            }
        })
    }

    fn finish_previous_song_report(&self) {
        let (previous, played) = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            let Some(previous) = state.current_song.take() else {
                return;
            };
            let extra = match state.song_started_at.take() {
                Some(started_at) if state.player_state == PlayerState::Playing => started_at.elapsed(),
                _ => Duration::ZERO,
            };
            let played = state.accumulated_played + extra;
            state.accumulated_played = Duration::ZERO;
            (previous, played)
        };
        self.reporters.report_end(&previous, played);
    }

    fn apply_volume(&self, volume: u8) {
        let clamped = volume.min(100);
        if let Err(err) = self.audio.set_volume(clamped) {
            warn!("PlaybackEngine: set_volume failed: {err}");
        }
        self.persist_volume();
    }

    fn persist_volume(&self) {
        match serde_json::to_vec(&self.audio.volume()) {
            Ok(bytes) => {
                if let Err(err) = self.store.set(keys::VOLUME, &bytes) {
                    warn!("PlaybackEngine: failed to persist volume: {err}");
                }
            }
            Err(err) => warn!("PlaybackEngine: failed to serialize volume: {err}"),
        }
    }

    fn build_playing_info(&self, song: &Option<Song>, player_state: PlayerState, elapsed: Duration) -> PlayingInfo {
        let volume = self.audio.volume();
        match song {
            Some(song) => {
                let lyric_text = self.lyric.state().current_line_text().map(str::to_string).unwrap_or_default();
                PlayingInfo::from_song(song, player_state, elapsed.as_millis() as u64, volume, lyric_text)
            }
            None => PlayingInfo::idle(volume),
        }
    }
}
