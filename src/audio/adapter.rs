//! The Audio Player Adapter: a thin contract over the decoder (spec Section
//! 4.3), not the decoder itself. Commands flow in over a `std::sync::mpsc`
//! channel to a dedicated OS thread running a `rodio` sink; state and time
//! events flow out over `tokio::sync::mpsc` unbounded channels so the
//! engine's async tasks can `.recv().await` them instead of polling,
//! mirroring the existing audio-thread convention.

use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use crate::error::{EngineError, Result};
use crate::models::PlayerState;

#[derive(Debug, Clone)]
enum PlayerCommand {
    Play(String),
    Pause,
    Resume,
    Stop,
    Toggle,
    Seek(Duration),
    SetVolume(u8),
    Close,
}

/// A thin contract over a decoder, not the decoder itself. Implementations
/// need not be `rodio`-backed; tests use an in-memory fake.
pub trait AudioPlayerAdapter: Send + Sync {
    /// Starts decoding and output at the current volume/mute state,
    /// cancelling any prior track atomically.
    fn play(&self, source: String) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn resume(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn toggle(&self) -> Result<()>;
    /// Jumps the playhead; invalid seeks are clamped by the implementation.
    fn seek(&self, position: Duration) -> Result<()>;
    fn set_volume(&self, volume: u8) -> Result<()>;
    fn volume(&self) -> u8;
    /// Releases resources; further ops become no-ops.
    fn close(&self);
}

/// The two lazy, single-consumer event streams the adapter emits. Ordering
/// within each stream is monotonic; there is no guaranteed ordering between
/// the two.
pub struct AudioEvents {
    pub state_rx: tokio::sync::mpsc::UnboundedReceiver<PlayerState>,
    pub time_rx: tokio::sync::mpsc::UnboundedReceiver<Duration>,
}

/// `rodio`-backed implementation. At most one active source at a time;
/// after `stop()` the state channel emits `Stopped` exactly once.
pub struct RodioAudioPlayer {
    command_tx: Sender<PlayerCommand>,
    volume: Arc<AtomicU8>,
    closed: std::sync::atomic::AtomicBool,
}

impl RodioAudioPlayer {
    /// Spawns the audio thread and returns the adapter plus its event
    /// streams. `time_channel_cadence_ms` matches the Playback Engine's
    /// configured tick rate (Section 4.2).
    pub fn spawn(initial_volume: u8, time_channel_cadence_ms: u64) -> Result<(Arc<Self>, AudioEvents)> {
        let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>();
        let (state_tx, state_rx) = tokio::sync::mpsc::unbounded_channel();
        let (time_tx, time_rx) = tokio::sync::mpsc::unbounded_channel();
        let volume = Arc::new(AtomicU8::new(initial_volume.min(100)));
        let thread_volume = Arc::clone(&volume);

        thread::Builder::new()
            .name("auracore-audio".to_string())
            .spawn(move || {
                if let Err(err) = audio_thread(
                    command_rx,
                    state_tx,
                    time_tx,
                    thread_volume,
                    Duration::from_millis(time_channel_cadence_ms),
                ) {
                    warn!("audio thread exited with error: {err}");
                }
            })
            .map_err(|e| EngineError::AudioPlayback(format!("failed to spawn audio thread: {e}")))?;

        Ok((
            Arc::new(Self {
                command_tx,
                volume,
                closed: std::sync::atomic::AtomicBool::new(false),
            }),
            AudioEvents { state_rx, time_rx },
        ))
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        self.command_tx
            .send(command)
            .map_err(|e| EngineError::ChannelError(format!("audio command channel closed: {e}")))
    }
}

impl AudioPlayerAdapter for RodioAudioPlayer {
    fn play(&self, source: String) -> Result<()> {
        self.send(PlayerCommand::Play(source))
    }

    fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    fn resume(&self) -> Result<()> {
        self.send(PlayerCommand::Resume)
    }

    fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop)
    }

    fn toggle(&self) -> Result<()> {
        self.send(PlayerCommand::Toggle)
    }

    fn seek(&self, position: Duration) -> Result<()> {
        self.send(PlayerCommand::Seek(position))
    }

    fn set_volume(&self, volume: u8) -> Result<()> {
        let clamped = volume.min(100);
        self.volume.store(clamped, Ordering::Release);
        self.send(PlayerCommand::SetVolume(clamped))
    }

    fn volume(&self) -> u8 {
        self.volume.load(Ordering::Acquire)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.command_tx.send(PlayerCommand::Close);
        }
    }
}

fn audio_thread(
    command_rx: mpsc::Receiver<PlayerCommand>,
    state_tx: tokio::sync::mpsc::UnboundedSender<PlayerState>,
    time_tx: tokio::sync::mpsc::UnboundedSender<Duration>,
    volume: Arc<AtomicU8>,
    tick: Duration,
) -> Result<()> {
    let stream_handle = OutputStreamBuilder::open_default_stream()
        .map_err(|e| EngineError::AudioPlayback(format!("failed to open audio output stream: {e}")))?;

    let mut sink: Option<Sink> = None;
    let mut last_state = PlayerState::Stopped;
    let mut playback_started_at: Option<Instant> = None;
    let mut paused_elapsed = Duration::ZERO;
    let mut last_tick = Instant::now();

    let mut emit_state = |state: PlayerState, last_state: &mut PlayerState| {
        if *last_state != state {
            *last_state = state;
            let _ = state_tx.send(state);
        }
    };

    loop {
        let timeout = tick.saturating_sub(last_tick.elapsed()).max(Duration::from_millis(1));
        match command_rx.recv_timeout(timeout) {
            Ok(command) => match command {
                PlayerCommand::Play(source) => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                    match load(&source, &stream_handle, volume.load(Ordering::Acquire)) {
                        Ok(new_sink) => {
                            sink = Some(new_sink);
                            playback_started_at = Some(Instant::now());
                            paused_elapsed = Duration::ZERO;
                            emit_state(PlayerState::Playing, &mut last_state);
                        }
                        Err(err) => {
                            warn!("RodioAudioPlayer: failed to load '{source}': {err}");
                            emit_state(PlayerState::Stopped, &mut last_state);
                        }
                    }
                }
                PlayerCommand::Pause => {
                    if let Some(ref s) = sink {
                        s.pause();
                        if let Some(start) = playback_started_at.take() {
                            paused_elapsed += start.elapsed();
                        }
                        emit_state(PlayerState::Paused, &mut last_state);
                    }
                }
                PlayerCommand::Resume => {
                    if let Some(ref s) = sink {
                        s.play();
                        playback_started_at = Some(Instant::now());
                        emit_state(PlayerState::Playing, &mut last_state);
                    }
                }
                PlayerCommand::Toggle => match last_state {
                    PlayerState::Playing => {
                        if let Some(ref s) = sink {
                            s.pause();
                            if let Some(start) = playback_started_at.take() {
                                paused_elapsed += start.elapsed();
                            }
                            emit_state(PlayerState::Paused, &mut last_state);
                        }
                    }
                    PlayerState::Paused => {
                        if let Some(ref s) = sink {
                            s.play();
                            playback_started_at = Some(Instant::now());
                            emit_state(PlayerState::Playing, &mut last_state);
                        }
                    }
                    PlayerState::Stopped => {}
                },
                PlayerCommand::Stop => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                    playback_started_at = None;
                    paused_elapsed = Duration::ZERO;
                    emit_state(PlayerState::Stopped, &mut last_state);
                }
                PlayerCommand::Seek(position) => {
                    if let Some(ref s) = sink {
                        match s.try_seek(position) {
                            Ok(()) => {
                                paused_elapsed = position;
                                if last_state == PlayerState::Playing {
                                    playback_started_at = Some(Instant::now());
                                }
                            }
                            Err(err) => warn!("RodioAudioPlayer: seek failed: {err}"),
                        }
                    }
                }
                PlayerCommand::SetVolume(v) => {
                    if let Some(ref s) = sink {
                        s.set_volume(v as f32 / 100.0);
                    }
                }
                PlayerCommand::Close => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                    debug!("RodioAudioPlayer: closing audio thread");
                    return Ok(());
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
        }

        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
            if let Some(ref s) = sink {
                if s.empty() {
                    sink = None;
                    playback_started_at = None;
                    paused_elapsed = Duration::ZERO;
                    emit_state(PlayerState::Stopped, &mut last_state);
                } else if last_state == PlayerState::Playing {
                    let elapsed = paused_elapsed
                        + playback_started_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
                    let _ = time_tx.send(elapsed);
                }
            }
        }
    }
}

fn load(source: &str, stream_handle: &OutputStream, volume: u8) -> Result<Sink> {
    let file = File::open(source)?;
    let buf_reader = BufReader::new(file);
    let decoder = Decoder::new(buf_reader)
        .map_err(|e| EngineError::UnsupportedFormat(format!("failed to decode '{source}': {e}")))?;

    let sink = Sink::connect_new(stream_handle.mixer());
    sink.append(decoder);
    sink.set_volume(volume as f32 / 100.0);
    Ok(sink)
}
