//! Engine Configuration
//!
//! # Examples
//!
//! ```rust
//! use tilewall_screen::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .media_root("/srv/tilewall")
//!     .lut_path("/srv/tilewall/colormap.lut")
//!     .resume_path("/srv/tilewall/resume.json")
//!     .tick_rate(20)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tilewall_source::DecoderConfig;

/// Configuration for a [`ScreenManager`](crate::ScreenManager)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Scheduler ticks per second (default: 20)
    pub tick_rate: u32,

    /// Media root; frame folders live under `<root>/frames` (default: `.`)
    pub media_root: PathBuf,

    /// Color lookup table file (default: None)
    ///
    /// Without a table only raw palette sources can be played.
    pub lut_path: Option<PathBuf>,

    /// JSON file for resume intents (default: None, kept in memory)
    pub resume_path: Option<PathBuf>,

    /// Decoder and producer queue settings
    pub decoder: DecoderConfig,

    /// How long `stop` waits for a producer thread (default: 250ms)
    pub join_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            media_root: PathBuf::from("."),
            lut_path: None,
            resume_path: None,
            decoder: DecoderConfig::default(),
            join_grace_ms: 250,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate configuration and return any issues
    ///
    /// Decoder settings are validated too.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        if self.tick_rate == 0 {
            issues.push("tick_rate must be at least 1".to_string());
        }

        if self.tick_rate > 1000 {
            issues.push("tick_rate should not exceed 1000".to_string());
        }

        if self.media_root.as_os_str().is_empty() {
            issues.push("media_root cannot be empty".to_string());
        }

        if let Err(decoder_issues) = self.decoder.validate() {
            issues.extend(decoder_issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Interval between scheduler ticks
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }

    /// Producer join grace as a [`Duration`]
    #[must_use]
    pub fn join_grace(&self) -> Duration {
        Duration::from_millis(self.join_grace_ms)
    }
}

/// Builder for [`EngineConfig`]
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    tick_rate: Option<u32>,
    media_root: Option<PathBuf>,
    lut_path: Option<PathBuf>,
    resume_path: Option<PathBuf>,
    decoder: Option<DecoderConfig>,
    join_grace_ms: Option<u64>,
}

impl EngineConfigBuilder {
    /// Set scheduler ticks per second
    #[must_use]
    pub fn tick_rate(mut self, rate: u32) -> Self {
        self.tick_rate = Some(rate);
        self
    }

    /// Set the media root
    #[must_use]
    pub fn media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media_root = Some(root.into());
        self
    }

    /// Set the color lookup table file
    #[must_use]
    pub fn lut_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lut_path = Some(path.into());
        self
    }

    /// Persist resume intents to this JSON file
    #[must_use]
    pub fn resume_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_path = Some(path.into());
        self
    }

    /// Set decoder settings
    #[must_use]
    pub fn decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Set the producer join grace in milliseconds
    #[must_use]
    pub fn join_grace_ms(mut self, ms: u64) -> Self {
        self.join_grace_ms = Some(ms);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();

        EngineConfig {
            tick_rate: self.tick_rate.unwrap_or(defaults.tick_rate),
            media_root: self.media_root.unwrap_or(defaults.media_root),
            lut_path: self.lut_path.or(defaults.lut_path),
            resume_path: self.resume_path.or(defaults.resume_path),
            decoder: self.decoder.unwrap_or(defaults.decoder),
            join_grace_ms: self.join_grace_ms.unwrap_or(defaults.join_grace_ms),
        }
    }
}
