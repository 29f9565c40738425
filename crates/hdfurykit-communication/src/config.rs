//! Configuration surface
//!
//! Hosting integrations supply a `DeviceConfig`; the timing knobs below
//! default to the values the HDFury line protocol was tuned for and exist
//! mainly so tests can shrink them.

use serde::Deserialize;

/// Host-supplied device configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device hostname or IP address
    pub host: String,
    /// TCP port; defaults to the model's factory port when absent
    #[serde(default)]
    pub port: Option<u16>,
    /// Model identifier; unknown ids fall back to the VRRoom table
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "vrroom".to_string()
}

impl DeviceConfig {
    /// Create a configuration for a host and model
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            model: model.into(),
        }
    }

    /// Override the TCP port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Timing configuration for the TCP session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Budget for opening the socket
    pub connect_timeout_ms: u64,
    /// Budget for draining the unsolicited welcome banner
    pub banner_timeout_ms: u64,
    /// Response budget for write ("set") commands
    pub set_command_timeout_ms: u64,
    /// Response budget for query ("get") commands
    pub get_command_timeout_ms: u64,
    /// Idle time after which the session is proactively replaced
    pub idle_reconnect_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            banner_timeout_ms: 1_000,
            set_command_timeout_ms: 8_000,
            get_command_timeout_ms: 5_000,
            idle_reconnect_ms: 600_000,
        }
    }
}

/// Timing configuration for the command pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum spacing between consecutive dispatches
    pub min_command_interval_ms: u64,
    /// Ceiling on the caller-side wait for a queued command
    pub enqueue_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_command_interval_ms: 500,
            enqueue_timeout_ms: 10_000,
        }
    }
}

/// Timing configuration for the keep-alive loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Interval between health checks
    pub interval_ms: u64,
    /// Idle time after which the link is considered possibly stale
    pub idle_threshold_ms: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval_ms: 600_000,
            idle_threshold_ms: 1_200_000,
        }
    }
}
