//! Engine-level configuration.
//!
//! Surfaces the knobs named by the spec's Section 6 CLI/environment
//! collaborator as typed fields: persistence location, default play mode and
//! volume, the consecutive-play-error threshold, the lyric offset, the
//! time-channel cadence, and reporter-enable flags. The out-of-scope
//! collaborators themselves (the menu tree, the cookie jar, the settings UI)
//! are not modeled here — only the values the core engine reads from them.

use std::path::PathBuf;

use crate::error::{EngineError, Result};
use crate::models::PlayMode;

/// Environment variable carrying the streaming service session cookie. The
/// core never reads it itself (credential handling is out of scope); it is
/// named here only because Section 6 lists it among the CLI/environment
/// knobs a complete binary must surface.
pub const COOKIE_ENV_VAR: &str = "AURACORE_COOKIE";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the SQLite key/value store and any other
    /// process-local state. `None` selects the in-memory store.
    pub data_dir: Option<PathBuf>,
    pub database_filename: String,
    pub default_volume: u8,
    pub default_play_mode: PlayMode,
    /// Consecutive `ResolveFailed` count before the engine stops the
    /// transport and surfaces the error to the UI (spec calls this "N,
    /// typically 3-5").
    pub max_play_error_threshold: u32,
    /// Offset, in milliseconds, applied to the playhead before looking up
    /// the current lyric line. May be negative (lyrics arrive "early").
    pub lyric_offset_ms: i64,
    /// When set, a malformed line aborts the whole lyric document instead of
    /// being skipped (spec Section 4.4).
    pub strict_lyric_parsing: bool,
    /// Cadence of the decoder's time channel, in milliseconds.
    pub time_channel_cadence_ms: u64,
    pub http_reporter_enabled: bool,
    pub http_reporter_endpoint: Option<String>,
    pub play_count_reporter_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_filename: "auracore.db".to_string(),
            default_volume: 70,
            default_play_mode: PlayMode::ListLoop,
            max_play_error_threshold: 3,
            lyric_offset_ms: 0,
            strict_lyric_parsing: false,
            time_channel_cadence_ms: 200,
            http_reporter_enabled: false,
            http_reporter_endpoint: None,
            play_count_reporter_enabled: true,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(&self.database_filename))
    }

    /// Build a `Config` from parsed CLI arguments, following the existing
    /// `from_cli` convention.
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let mut builder = Self::builder()
            .max_play_error_threshold(cli.max_play_error_threshold)
            .lyric_offset_ms(cli.lyric_offset_ms)
            .strict_lyric_parsing(cli.strict_lyric_parsing)
            .time_channel_cadence_ms(cli.time_channel_cadence_ms)
            .default_volume(cli.volume)
            .default_play_mode(cli.mode.into())
            .http_reporter_enabled(cli.enable_http_reporter)
            .play_count_reporter_enabled(!cli.disable_play_count_reporter);

        if let Some(dir) = cli.data_dir.clone() {
            builder = builder.data_dir(dir);
        }
        if let Some(endpoint) = cli.http_reporter_endpoint.clone() {
            builder = builder.http_reporter_endpoint(endpoint);
        }

        builder.build()
    }
}

/// Builder pattern implementation for `Config`, matching the existing
/// configuration convention.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    data_dir: Option<PathBuf>,
    database_filename: Option<String>,
    default_volume: Option<u8>,
    default_play_mode: Option<PlayMode>,
    max_play_error_threshold: Option<u32>,
    lyric_offset_ms: Option<i64>,
    strict_lyric_parsing: Option<bool>,
    time_channel_cadence_ms: Option<u64>,
    http_reporter_enabled: Option<bool>,
    http_reporter_endpoint: Option<String>,
    play_count_reporter_enabled: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn database_filename(mut self, name: impl Into<String>) -> Self {
        self.database_filename = Some(name.into());
        self
    }

    pub fn default_volume(mut self, volume: u8) -> Self {
        self.default_volume = Some(volume.min(100));
        self
    }

    pub fn default_play_mode(mut self, mode: PlayMode) -> Self {
        self.default_play_mode = Some(mode);
        self
    }

    pub fn max_play_error_threshold(mut self, threshold: u32) -> Self {
        self.max_play_error_threshold = Some(threshold);
        self
    }

    pub fn lyric_offset_ms(mut self, offset: i64) -> Self {
        self.lyric_offset_ms = Some(offset);
        self
    }

    pub fn strict_lyric_parsing(mut self, strict: bool) -> Self {
        self.strict_lyric_parsing = Some(strict);
        self
    }

    pub fn time_channel_cadence_ms(mut self, cadence: u64) -> Self {
        self.time_channel_cadence_ms = Some(cadence);
        self
    }

    pub fn http_reporter_enabled(mut self, enabled: bool) -> Self {
        self.http_reporter_enabled = Some(enabled);
        self
    }

    pub fn http_reporter_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.http_reporter_endpoint = Some(endpoint.into());
        self
    }

    pub fn play_count_reporter_enabled(mut self, enabled: bool) -> Self {
        self.play_count_reporter_enabled = Some(enabled);
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let max_play_error_threshold = self
            .max_play_error_threshold
            .unwrap_or(defaults.max_play_error_threshold);
        if max_play_error_threshold == 0 {
            return Err(EngineError::Configuration(
                "max_play_error_threshold must be greater than 0".to_string(),
            ));
        }

        let time_channel_cadence_ms = self
            .time_channel_cadence_ms
            .unwrap_or(defaults.time_channel_cadence_ms);
        if time_channel_cadence_ms == 0 {
            return Err(EngineError::Configuration(
                "time_channel_cadence_ms must be greater than 0".to_string(),
            ));
        }

        let http_reporter_enabled = self.http_reporter_enabled.unwrap_or(defaults.http_reporter_enabled);
        let http_reporter_endpoint = self.http_reporter_endpoint.or(defaults.http_reporter_endpoint);
        if http_reporter_enabled && http_reporter_endpoint.is_none() {
            return Err(EngineError::Configuration(
                "http_reporter_enabled requires http_reporter_endpoint".to_string(),
            ));
        }

        Ok(Config {
            data_dir: self.data_dir.or(defaults.data_dir),
            database_filename: self.database_filename.unwrap_or(defaults.database_filename),
            default_volume: self.default_volume.unwrap_or(defaults.default_volume),
            default_play_mode: self.default_play_mode.unwrap_or(defaults.default_play_mode),
            max_play_error_threshold,
            lyric_offset_ms: self.lyric_offset_ms.unwrap_or(defaults.lyric_offset_ms),
            strict_lyric_parsing: self.strict_lyric_parsing.unwrap_or(defaults.strict_lyric_parsing),
            time_channel_cadence_ms,
            http_reporter_enabled,
            http_reporter_endpoint,
            play_count_reporter_enabled: self
                .play_count_reporter_enabled
                .unwrap_or(defaults.play_count_reporter_enabled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_cleanly() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.max_play_error_threshold, 3);
        assert_eq!(config.time_channel_cadence_ms, 200);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = Config::builder().max_play_error_threshold(0).build();
        assert!(err.is_err());
    }

    #[test]
    fn http_reporter_without_endpoint_is_rejected() {
        let err = Config::builder().http_reporter_enabled(true).build();
        assert!(err.is_err());
    }
}
