//! # Output Configuration
//!
//! Configuration passed to [`OutputHandle`](crate::OutputHandle) at creation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::params::OutputParams;

/// Smallest ring a buffer worker accepts.
pub const MIN_BUFFER_BYTES: usize = 1024;

/// Output handle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Comma separated driver names tried when `open` gets none.
    ///
    /// Default: none, so `open` needs an explicit name.
    #[serde(default)]
    pub default_driver: Option<String>,

    /// Size of the buffer worker's ring in bytes, 0 for direct output.
    ///
    /// Default: 0.
    #[serde(default)]
    pub buffer_bytes: usize,

    /// Initial tunables.
    #[serde(default)]
    pub params: OutputParams,

    /// How long the buffer worker sleeps between command checks while idle.
    ///
    /// Default: 20 ms.
    #[serde(default = "default_worker_poll_interval")]
    pub worker_poll_interval: Duration,

    /// Largest chunk the worker hands to the driver at once, in bytes.
    ///
    /// Default: 16 KiB.
    #[serde(default = "default_worker_chunk_bytes")]
    pub worker_chunk_bytes: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_driver: None,
            buffer_bytes: 0,
            params: OutputParams::default(),
            worker_poll_interval: default_worker_poll_interval(),
            worker_chunk_bytes: default_worker_chunk_bytes(),
        }
    }
}

impl OutputConfig {
    /// Direct output through the built-in `test` driver.
    pub fn testing() -> Self {
        Self {
            default_driver: Some("test".to_string()),
            worker_poll_interval: Duration::from_millis(2),
            ..Default::default()
        }
    }

    /// Buffered output with a ring of `bytes`.
    pub fn buffered(bytes: usize) -> Self {
        Self {
            buffer_bytes: bytes,
            ..Default::default()
        }
    }

    pub fn with_default_driver(mut self, names: impl Into<String>) -> Self {
        self.default_driver = Some(names.into());
        self
    }

    pub fn with_buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = bytes;
        self
    }

    pub fn with_params(mut self, params: OutputParams) -> Self {
        self.params = params;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(names) = &self.default_driver {
            if names.split(',').all(|name| name.trim().is_empty()) {
                return Err("default_driver must name at least one driver".to_string());
            }
        }

        if self.buffer_bytes != 0 && self.buffer_bytes < MIN_BUFFER_BYTES {
            return Err(format!(
                "buffer_bytes must be 0 or at least {} bytes",
                MIN_BUFFER_BYTES
            ));
        }

        if self.worker_poll_interval.is_zero() {
            return Err("worker_poll_interval must be > 0".to_string());
        }

        if self.worker_chunk_bytes == 0 {
            return Err("worker_chunk_bytes must be > 0".to_string());
        }

        self.params.validate()
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_worker_poll_interval() -> Duration {
    Duration::from_millis(20)
}

fn default_worker_chunk_bytes() -> usize {
    16 * 1024
}
