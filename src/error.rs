use thiserror::Error;

/// Error taxonomy for the playback engine core.
///
/// Variants map to the error kinds named by the engine's component contracts
/// rather than to any one collaborator's implementation details.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Audio playback error: {0}")]
    AudioPlayback(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Audio file format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Channel communication error: {0}")]
    ChannelError(String),

    #[error("Track source resolution failed: {0}")]
    ResolveFailed(String),

    #[error("Lyric document could not be parsed: {0}")]
    ParseError(String),

    #[error("Index {index} is out of range for a playlist of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Initial index {index} is invalid for {len} songs")]
    InvalidIndex { index: i64, len: usize },

    #[error("No more songs available in the current play mode")]
    NoMoreSongs,

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<Box<dyn std::error::Error + Send + Sync>> for EngineError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        EngineError::AudioPlayback(err.to_string())
    }
}
