use serde::Deserialize;
use std::time::Duration;

/// Admission control configuration
///
/// Two independent gates protect the collector:
/// - a hard ceiling of accepted issue submissions per interval (all clients)
/// - a per-client budget that is refilled once the client stays quiet for a full window
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AdmissionConfig {
    /// Interval length in seconds
    /// Counters reset and the per-client limit is recomputed every interval.
    /// It is also the sliding window after which an idle client budget expires.
    /// Default: 60
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Maximum accepted issue submissions per interval, across all clients
    /// Default: 240
    #[serde(default = "default_ceiling")]
    pub ceiling: u64,
    /// Issue submissions a new client may send within one window
    /// The effective value shrinks for the interval following an early bust.
    /// Default: 8
    #[serde(default = "default_base_limit")]
    pub base_limit: u64,
    /// Maximum number of tracked clients (sum of entry weights)
    /// Default: 8192
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Seconds a rate-limited request is held open before its empty response
    /// Slows down clients that resend immediately.
    /// Default: 32
    #[serde(default = "default_hold_delay_secs")]
    pub hold_delay_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            ceiling: default_ceiling(),
            base_limit: default_base_limit(),
            cache_capacity: default_cache_capacity(),
            hold_delay_secs: default_hold_delay_secs(),
        }
    }
}

impl AdmissionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn hold_delay(&self) -> Duration {
        Duration::from_secs(self.hold_delay_secs)
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_ceiling() -> u64 {
    240
}

fn default_base_limit() -> u64 {
    8
}

fn default_cache_capacity() -> usize {
    8 * 1024
}

fn default_hold_delay_secs() -> u64 {
    32
}
