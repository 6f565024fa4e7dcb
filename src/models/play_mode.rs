use serde::{Deserialize, Serialize};

/// The queue-progression policy in effect. Persisted verbatim.
///
/// `Intelligent` is reachable only once the engine has been given a
/// recommender (see [`crate::engine::recommender::Recommender`]); until then
/// [`crate::playlist::PlaylistManager::supported_play_modes`] omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    /// No wrap: stops at either end.
    Ordered,
    /// Wraps at both ends.
    ListLoop,
    /// Replays the current song unless the advance is user-initiated.
    SingleLoop,
    /// A pre-shuffled permutation consumed front to back.
    ListRandom,
    /// An endless bidirectional random walk with memoized history.
    InfiniteRandom,
    /// An engine-supplied extension queue from an external recommender,
    /// behaving like `ListLoop` once populated.
    Intelligent,
}

impl PlayMode {
    /// The cycle order used by `SwitchMode`, which always skips `Intelligent`
    /// — that mode is only entered explicitly via `Intelligence(..)`.
    pub const CYCLE: [PlayMode; 5] = [
        PlayMode::Ordered,
        PlayMode::ListLoop,
        PlayMode::SingleLoop,
        PlayMode::ListRandom,
        PlayMode::InfiniteRandom,
    ];

    pub fn next_in_cycle(self) -> PlayMode {
        let position = Self::CYCLE.iter().position(|&m| m == self);
        match position {
            Some(i) => Self::CYCLE[(i + 1) % Self::CYCLE.len()],
            // Intelligent (or anything outside the cycle) resumes at the start.
            None => Self::CYCLE[0],
        }
    }

    /// Whether this mode maintains its own internal shuffle/walk state that
    /// must be reinitialized on `Initialize` and `SetPlayMode`.
    pub fn is_shuffled(self) -> bool {
        matches!(self, PlayMode::ListRandom | PlayMode::InfiniteRandom)
    }
}

impl Default for PlayMode {
    fn default() -> Self {
        PlayMode::ListLoop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_skips_intelligent_and_wraps() {
        let mut mode = PlayMode::Ordered;
        for _ in 0..PlayMode::CYCLE.len() {
            mode = mode.next_in_cycle();
            assert_ne!(mode, PlayMode::Intelligent);
        }
        assert_eq!(mode, PlayMode::Ordered);
    }

    #[test]
    fn intelligent_reenters_cycle_at_ordered() {
        assert_eq!(PlayMode::Intelligent.next_in_cycle(), PlayMode::Ordered);
    }
}
