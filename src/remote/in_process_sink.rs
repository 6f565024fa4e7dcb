use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::models::PlayingInfo;
use crate::remote::{CtrlSignal, MediaControlSink};

/// Channel-only sink used by tests and headless operation: `update` records
/// the latest published snapshot, and commands enqueued with `push_command`
/// are drained by `poll_command` in order.
pub struct InProcessSink {
    last_published: Mutex<Option<PlayingInfo>>,
    command_tx: Sender<CtrlSignal>,
    command_rx: Mutex<Receiver<CtrlSignal>>,
}

impl InProcessSink {
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        Self {
            last_published: Mutex::new(None),
            command_tx,
            command_rx: Mutex::new(command_rx),
        }
    }

    /// Queues a command as though it arrived from the OS surface.
    pub fn push_command(&self, signal: CtrlSignal) {
        let _ = self.command_tx.send(signal);
    }

    pub fn last_published(&self) -> Option<PlayingInfo> {
        self.last_published.lock().expect("in-process sink mutex poisoned").clone()
    }
}

impl Default for InProcessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaControlSink for InProcessSink {
    fn update(&self, info: &PlayingInfo) {
        *self.last_published.lock().expect("in-process sink mutex poisoned") = Some(info.clone());
    }

    fn poll_command(&self) -> Option<CtrlSignal> {
        self.command_rx.lock().expect("in-process sink mutex poisoned").try_recv().ok()
    }
}
