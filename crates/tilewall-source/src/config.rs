//! Decoder Configuration
//!
//! Settings shared by every producer: which decoder binary to run, how big
//! queues may grow, and how live streams are probed.
//!
//! # Examples
//!
//! ```rust
//! use tilewall_source::DecoderConfig;
//!
//! // Using builder pattern
//! let config = DecoderConfig::builder()
//!     .decoder_binary("/usr/local/bin/ffmpeg")
//!     .live_queue_limit(15)
//!     .build();
//!
//! // Using struct literal with defaults
//! let config = DecoderConfig {
//!     default_queue_capacity: 120,
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;
use std::time::Duration;

const RECONNECT_DELAY_MS: u64 = 1000;

/// Default delay between live reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_millis(RECONNECT_DELAY_MS);

/// How much input a decoder may inspect before it starts emitting frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeBudget {
    /// Microseconds of input analyzed for stream info
    pub analyze_duration_us: u64,
    /// Bytes read while probing the container
    pub probe_size: u64,
}

impl ProbeBudget {
    /// Small budget used for the first attempts on a live stream
    pub const SHORT: Self = Self {
        analyze_duration_us: 200_000,
        probe_size: 65_536,
    };

    /// Larger budget for streams that failed to start with [`Self::SHORT`]
    pub const ESCALATED: Self = Self {
        analyze_duration_us: 1_000_000,
        probe_size: 1_000_000,
    };
}

/// Configuration for decoder subprocesses and producer queues
///
/// Use [`DecoderConfig::builder()`] for ergonomic construction or struct
/// literal syntax with [`Default::default()`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Decoder executable (default: `ffmpeg`, resolved through `PATH`)
    pub decoder_binary: String,

    /// Frames kept queued for a live stream before the oldest are dropped
    /// (default: 30)
    pub live_queue_limit: usize,

    /// Queue capacity for sequence and video producers when no buffer
    /// target was requested (default: 60)
    pub default_queue_capacity: usize,

    /// Sleep while a producer waits for queue room (default: 5ms)
    pub backpressure_sleep_ms: u64,

    /// Probe budget for the first live attempts
    pub short_probe: ProbeBudget,

    /// Probe budget once a live stream has failed to start
    pub escalated_probe: ProbeBudget,

    /// Attempt count (already made) at which the escalated budget kicks in
    /// (default: 2, so the third attempt onwards)
    pub escalate_after_attempts: u32,

    /// Pause before a live stream reconnects (default: 1000ms)
    pub reconnect_delay_ms: u64,

    /// Tick rate the live frame-rate filter is derived from (default: 20)
    ///
    /// A live stream at `n` ticks per frame is decoded at `rate / n` fps.
    pub reference_tick_rate: u32,

    /// Directory for first-frame RGB dumps (default: None, no dumps)
    pub dump_dir: Option<PathBuf>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            decoder_binary: "ffmpeg".to_string(),
            live_queue_limit: 30,
            default_queue_capacity: 60,
            backpressure_sleep_ms: 5,
            short_probe: ProbeBudget::SHORT,
            escalated_probe: ProbeBudget::ESCALATED,
            escalate_after_attempts: 2,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            reference_tick_rate: 20,
            dump_dir: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }

    /// Validate configuration and return any issues
    ///
    /// Returns `Ok(())` if configuration is valid, or a list of issues.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        if self.decoder_binary.trim().is_empty() {
            issues.push("decoder_binary cannot be empty".to_string());
        }

        if self.live_queue_limit == 0 {
            issues.push("live_queue_limit must be at least 1".to_string());
        }

        if self.default_queue_capacity == 0 {
            issues.push("default_queue_capacity must be at least 1".to_string());
        }

        if self.reference_tick_rate == 0 {
            issues.push("reference_tick_rate must be at least 1".to_string());
        }

        if self.short_probe.probe_size == 0 || self.escalated_probe.probe_size == 0 {
            issues.push("probe_size must be at least 1".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Probe budget for a live attempt, given how many attempts came before
    #[must_use]
    pub fn probe_for_attempt(&self, previous_attempts: u32) -> ProbeBudget {
        if previous_attempts >= self.escalate_after_attempts {
            self.escalated_probe
        } else {
            self.short_probe
        }
    }

    /// Reconnect pause as a [`Duration`]
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Backpressure sleep as a [`Duration`]
    #[must_use]
    pub fn backpressure_sleep(&self) -> Duration {
        Duration::from_millis(self.backpressure_sleep_ms)
    }

    /// Queue capacity for a bounded producer
    ///
    /// A positive buffer target doubles as the capacity; otherwise the
    /// configured default applies.
    #[must_use]
    pub fn capacity_for(&self, buffer_target: usize) -> usize {
        if buffer_target > 0 {
            buffer_target
        } else {
            self.default_queue_capacity
        }
    }
}

/// Builder for [`DecoderConfig`]
#[derive(Debug, Clone, Default)]
pub struct DecoderConfigBuilder {
    decoder_binary: Option<String>,
    live_queue_limit: Option<usize>,
    default_queue_capacity: Option<usize>,
    backpressure_sleep_ms: Option<u64>,
    short_probe: Option<ProbeBudget>,
    escalated_probe: Option<ProbeBudget>,
    escalate_after_attempts: Option<u32>,
    reconnect_delay_ms: Option<u64>,
    reference_tick_rate: Option<u32>,
    dump_dir: Option<PathBuf>,
}

impl DecoderConfigBuilder {
    /// Set the decoder executable
    #[must_use]
    pub fn decoder_binary(mut self, binary: impl Into<String>) -> Self {
        self.decoder_binary = Some(binary.into());
        self
    }

    /// Set the live queue ceiling
    #[must_use]
    pub fn live_queue_limit(mut self, limit: usize) -> Self {
        self.live_queue_limit = Some(limit);
        self
    }

    /// Set the default bounded queue capacity
    #[must_use]
    pub fn default_queue_capacity(mut self, capacity: usize) -> Self {
        self.default_queue_capacity = Some(capacity);
        self
    }

    /// Set the backpressure sleep in milliseconds
    #[must_use]
    pub fn backpressure_sleep_ms(mut self, ms: u64) -> Self {
        self.backpressure_sleep_ms = Some(ms);
        self
    }

    /// Set the initial live probe budget
    #[must_use]
    pub fn short_probe(mut self, budget: ProbeBudget) -> Self {
        self.short_probe = Some(budget);
        self
    }

    /// Set the escalated live probe budget
    #[must_use]
    pub fn escalated_probe(mut self, budget: ProbeBudget) -> Self {
        self.escalated_probe = Some(budget);
        self
    }

    /// Set after how many attempts the escalated budget is used
    #[must_use]
    pub fn escalate_after_attempts(mut self, attempts: u32) -> Self {
        self.escalate_after_attempts = Some(attempts);
        self
    }

    /// Set the live reconnect pause in milliseconds
    #[must_use]
    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = Some(ms);
        self
    }

    /// Set the tick rate used for the live fps filter
    #[must_use]
    pub fn reference_tick_rate(mut self, rate: u32) -> Self {
        self.reference_tick_rate = Some(rate);
        self
    }

    /// Enable first-frame dumps into `dir`
    #[must_use]
    pub fn dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> DecoderConfig {
        let defaults = DecoderConfig::default();

        DecoderConfig {
            decoder_binary: self.decoder_binary.unwrap_or(defaults.decoder_binary),
            live_queue_limit: self.live_queue_limit.unwrap_or(defaults.live_queue_limit),
            default_queue_capacity: self
                .default_queue_capacity
                .unwrap_or(defaults.default_queue_capacity),
            backpressure_sleep_ms: self
                .backpressure_sleep_ms
                .unwrap_or(defaults.backpressure_sleep_ms),
            short_probe: self.short_probe.unwrap_or(defaults.short_probe),
            escalated_probe: self.escalated_probe.unwrap_or(defaults.escalated_probe),
            escalate_after_attempts: self
                .escalate_after_attempts
                .unwrap_or(defaults.escalate_after_attempts),
            reconnect_delay_ms: self.reconnect_delay_ms.unwrap_or(defaults.reconnect_delay_ms),
            reference_tick_rate: self
                .reference_tick_rate
                .unwrap_or(defaults.reference_tick_rate),
            dump_dir: self.dump_dir.or(defaults.dump_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();

        assert_eq!(config.decoder_binary, "ffmpeg");
        assert_eq!(config.live_queue_limit, 30);
        assert_eq!(config.backpressure_sleep(), Duration::from_millis(5));
        assert_eq!(config.reference_tick_rate, 20);
        assert_eq!(config.reconnect_delay(), RECONNECT_DELAY);
        assert!(config.dump_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = DecoderConfig::builder()
            .decoder_binary("/opt/ffmpeg/bin/ffmpeg")
            .live_queue_limit(10)
            .dump_dir("/tmp/dumps")
            .build();

        assert_eq!(config.decoder_binary, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.live_queue_limit, 10);
        assert_eq!(config.default_queue_capacity, 60);
        assert_eq!(config.dump_dir, Some(PathBuf::from("/tmp/dumps")));
    }

    #[test]
    fn test_config_validation() {
        let invalid = DecoderConfig {
            decoder_binary: " ".to_string(),
            live_queue_limit: 0,
            ..Default::default()
        };
        let issues = invalid.validate().expect_err("two issues");
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_probe_escalation() {
        let config = DecoderConfig::default();
        assert_eq!(config.probe_for_attempt(0), ProbeBudget::SHORT);
        assert_eq!(config.probe_for_attempt(1), ProbeBudget::SHORT);
        assert_eq!(config.probe_for_attempt(2), ProbeBudget::ESCALATED);
        assert_eq!(config.probe_for_attempt(7), ProbeBudget::ESCALATED);
    }

    #[test]
    fn test_capacity_for() {
        let config = DecoderConfig::default();
        assert_eq!(config.capacity_for(0), 60);
        assert_eq!(config.capacity_for(12), 12);
    }
}
