//! Loader timing and buffering configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs for one loader instance.
///
/// The retry window and the entry TTL are deliberately two separate
/// durations: an entry may sit past the window (no more resends) and still
/// wait for late replies until the hard TTL evicts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Sweep timer period in milliseconds
    #[serde(rename = "tick-interval-ms", default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How long a sub-request may go unanswered before it is resent
    #[serde(rename = "max-response-time-ms", default = "default_max_response_time_ms")]
    pub max_response_time_ms: u64,

    /// Resends stop once an entry is older than this
    #[serde(rename = "retry-window-ms", default = "default_retry_window_ms")]
    pub retry_window_ms: u64,

    /// Entries older than this are evicted by the sweep
    #[serde(rename = "entry-ttl-ms", default = "default_entry_ttl_ms")]
    pub entry_ttl_ms: u64,

    /// Loader inbox capacity
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Per-feed delivery buffer
    #[serde(rename = "feed-buffer", default = "default_feed_buffer")]
    pub feed_buffer: usize,
}

fn default_tick_interval_ms() -> u64 {
    300
}

fn default_max_response_time_ms() -> u64 {
    100
}

fn default_retry_window_ms() -> u64 {
    100
}

fn default_entry_ttl_ms() -> u64 {
    1000
}

fn default_channel_buffer() -> usize {
    64
}

fn default_feed_buffer() -> usize {
    16
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_response_time_ms: default_max_response_time_ms(),
            retry_window_ms: default_retry_window_ms(),
            entry_ttl_ms: default_entry_ttl_ms(),
            channel_buffer: default_channel_buffer(),
            feed_buffer: default_feed_buffer(),
        }
    }
}

impl LoaderConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn max_response_time(&self) -> Duration {
        Duration::from_millis(self.max_response_time_ms)
    }

    pub fn retry_window(&self) -> Duration {
        Duration::from_millis(self.retry_window_ms)
    }

    pub fn entry_ttl(&self) -> Duration {
        Duration::from_millis(self.entry_ttl_ms)
    }
}
