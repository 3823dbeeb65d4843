//! Real-time connection manager configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// How long a connection attempt may take before it is abandoned, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Keep-alive ping interval in seconds, active only while the connection is open.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_seconds: u64,
    /// Maximum automatic reconnection attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnection attempt, in milliseconds.
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,
    /// Multiplier applied to the delay after each failed reconnection attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub reconnect_backoff_multiplier: f64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            keepalive_interval_seconds: default_keepalive_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            reconnect_backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_keepalive_interval() -> u64 {
    30
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay() -> u64 {
    2000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}
