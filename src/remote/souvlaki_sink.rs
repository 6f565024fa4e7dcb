use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use log::warn;
use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig, SeekDirection};

use crate::models::PlayerState;
use crate::models::PlayingInfo;
use crate::remote::{CtrlSignal, MediaControlSink};

const DISPLAY_NAME: &str = "Auracore";
const DBUS_NAME: &str = "auracore";
const SEEK_STEP_MS: u64 = 10_000;

/// `souvlaki`-backed cross-platform OS media-control surface (MPRIS, SMTC,
/// Now Playing). The OS-level translation inside `souvlaki` is a black box;
/// this type is only the mapping between its event type and `CtrlSignal`.
pub struct SouvlakiMediaControlSink {
    controls: Mutex<Option<MediaControls>>,
    command_rx: Mutex<Receiver<CtrlSignal>>,
}

impl SouvlakiMediaControlSink {
    /// Attempts to initialize the platform backend; returns a sink with no
    /// backend attached (all operations become no-ops) if that fails, since
    /// remote control is a convenience, not a playback requirement.
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let controls = Self::create_controls(command_tx);
        Self {
            controls: Mutex::new(controls),
            command_rx: Mutex::new(command_rx),
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn create_controls(command_tx: Sender<CtrlSignal>) -> Option<MediaControls> {
        let mut controls = match MediaControls::new(PlatformConfig {
            display_name: DISPLAY_NAME,
            dbus_name: DBUS_NAME,
            hwnd: None,
        }) {
            Ok(controls) => controls,
            Err(err) => {
                warn!("SouvlakiMediaControlSink: failed to create media controls backend: {err}");
                return None;
            }
        };

        if let Err(err) = controls.attach(move |event| {
            if let Some(signal) = map_event(event) {
                let _ = command_tx.send(signal);
            }
        }) {
            warn!("SouvlakiMediaControlSink: failed to attach media controls handler: {err}");
            return None;
        }

        Some(controls)
    }

    #[cfg(target_os = "windows")]
    fn create_controls(_command_tx: Sender<CtrlSignal>) -> Option<MediaControls> {
        warn!("SouvlakiMediaControlSink: Windows media controls require an HWND, which this headless crate does not provide");
        None
    }
}

impl Default for SouvlakiMediaControlSink {
    fn default() -> Self {
        Self::new()
    }
}

fn map_event(event: MediaControlEvent) -> Option<CtrlSignal> {
    match event {
        MediaControlEvent::Play => Some(CtrlSignal::Resume),
        MediaControlEvent::Pause => Some(CtrlSignal::Pause),
        MediaControlEvent::Toggle => Some(CtrlSignal::Toggle),
        MediaControlEvent::Next => Some(CtrlSignal::Next),
        MediaControlEvent::Previous => Some(CtrlSignal::Previous),
        MediaControlEvent::Stop => Some(CtrlSignal::Stop),
        MediaControlEvent::SetPosition(position) => Some(CtrlSignal::Seek(position.0)),
        MediaControlEvent::SeekBy(direction, delta) => {
            let delta = delta;
            match direction {
                SeekDirection::Forward => Some(CtrlSignal::Seek(delta)),
                SeekDirection::Backward => Some(CtrlSignal::Seek(Duration::ZERO.saturating_sub(delta))),
            }
        }
        MediaControlEvent::Seek(direction) => {
            let step = Duration::from_millis(SEEK_STEP_MS);
            match direction {
                SeekDirection::Forward => Some(CtrlSignal::Seek(step)),
                SeekDirection::Backward => Some(CtrlSignal::Seek(Duration::ZERO)),
            }
        }
        MediaControlEvent::SetVolume(_) | MediaControlEvent::OpenUri(_) | MediaControlEvent::Raise | MediaControlEvent::Quit => None,
    }
}

impl MediaControlSink for SouvlakiMediaControlSink {
    fn update(&self, info: &PlayingInfo) {
        let Ok(mut guard) = self.controls.lock() else { return };
        let Some(controls) = guard.as_mut() else { return };

        let playback = match info.state {
            PlayerState::Stopped => MediaPlayback::Stopped,
            PlayerState::Paused => MediaPlayback::Paused { progress: None },
            PlayerState::Playing => MediaPlayback::Playing { progress: None },
        };
        if let Err(err) = controls.set_playback(playback) {
            warn!("SouvlakiMediaControlSink: failed to publish playback state: {err}");
        }

        let duration = (info.total_duration_ms > 0).then(|| Duration::from_millis(info.total_duration_ms));
        let publish_result = if info.song_id != 0 {
            controls.set_metadata(MediaMetadata {
                title: Some(info.title.as_str()),
                artist: Some(info.artist.as_str()),
                album: Some(info.album.as_str()),
                cover_url: (!info.cover_url.is_empty()).then_some(info.cover_url.as_str()),
                duration,
            })
        } else {
            controls.set_metadata(MediaMetadata::default())
        };
        if let Err(err) = publish_result {
            warn!("SouvlakiMediaControlSink: failed to publish metadata: {err}");
        }
    }

    fn poll_command(&self) -> Option<CtrlSignal> {
        self.command_rx.lock().expect("souvlaki sink mutex poisoned").try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_toggle_and_transport_events() {
        assert_eq!(map_event(MediaControlEvent::Toggle), Some(CtrlSignal::Toggle));
        assert_eq!(map_event(MediaControlEvent::Next), Some(CtrlSignal::Next));
        assert_eq!(map_event(MediaControlEvent::Previous), Some(CtrlSignal::Previous));
        assert_eq!(map_event(MediaControlEvent::Stop), Some(CtrlSignal::Stop));
    }

    #[test]
    fn ignores_volume_and_uri_events() {
        assert_eq!(map_event(MediaControlEvent::SetVolume(0.5)), None);
        assert_eq!(map_event(MediaControlEvent::Raise), None);
    }
}
