//! Configuration management module
//!
//! This module handles the engine-level knobs named by the spec's CLI/
//! environment section: persistence paths, volume and mode defaults, the
//! consecutive-play-error threshold, lyric offset, time-channel cadence, and
//! reporter-enable flags.

pub mod app_config;

pub use app_config::{Config, ConfigBuilder};
