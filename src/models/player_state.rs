use serde::{Deserialize, Serialize};

/// Player state machine. Transitions are driven only by explicit transport
/// commands and by end-of-stream from the decoder — never set speculatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState::Stopped
    }
}
