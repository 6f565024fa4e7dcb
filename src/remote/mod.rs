//! The Remote Control Bridge (spec Section 4.6): a pure translator between
//! an OS media-control surface and the Playback Engine's control channel.
//! Holds no playback state of its own.

mod in_process_sink;
mod souvlaki_sink;

pub use in_process_sink::InProcessSink;
pub use souvlaki_sink::SouvlakiMediaControlSink;

use std::time::Duration;

use crate::models::PlayingInfo;

/// A tagged transport signal the bridge forwards onto the engine's control
/// channel. Identical in shape to a user-issued command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CtrlSignal {
    Pause,
    Resume,
    Stop,
    Toggle,
    Previous,
    Next,
    Seek(Duration),
    Rerender,
}

/// The surface the bridge talks to: publishes now-playing metadata, and is
/// polled for inbound commands. A `souvlaki`-backed implementation is the
/// default concrete sink; `InProcessSink` is a channel-only stand-in for
/// tests and headless operation.
pub trait MediaControlSink: Send + Sync {
    fn update(&self, info: &PlayingInfo);
    fn poll_command(&self) -> Option<CtrlSignal>;
}

/// Translates between a `MediaControlSink` and the engine's `CtrlSignal`
/// stream. The bridge itself carries no state beyond the sink it wraps.
pub struct RemoteControlBridge {
    sink: Box<dyn MediaControlSink>,
}

impl RemoteControlBridge {
    pub fn new(sink: Box<dyn MediaControlSink>) -> Self {
        Self { sink }
    }

    /// Publishes a refreshed now-playing snapshot to the OS/IPC surface.
    pub fn publish(&self, info: &PlayingInfo) {
        self.sink.update(info);
    }

    /// Drains at most one inbound command. Called by the engine's
    /// control-signal task in a loop.
    pub fn poll_command(&self) -> Option<CtrlSignal> {
        self.sink.poll_command()
    }
}
