//! auracore — the playback engine core of a terminal music streaming client.

pub mod audio;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod lyric;
pub mod models;
pub mod playlist;
pub mod remote;
pub mod reporter;

pub use error::{EngineError, Result};
