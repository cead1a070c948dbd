//! # Output Error Types
//!
//! Every failing output operation yields an [`OutputError`] and records its
//! [`ErrorCode`] on the handle, so callers may either match the returned error
//! or inspect `errcode()` afterwards. Buffered and direct mode share the same
//! taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error classes reported by an output handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    #[default]
    Ok,
    OutOfMemory,
    BadDriverName,
    BadDriver,
    NoDriver,
    NotLive,
    DevicePlay,
    DeviceOpen,
    BufferError,
    ModuleError,
    BadParam,
}

impl ErrorCode {
    /// Fixed human readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Ok => "no problem",
            ErrorCode::OutOfMemory => "out of memory",
            ErrorCode::BadDriverName => "bad driver name",
            ErrorCode::BadDriver => "failure loading driver module",
            ErrorCode::NoDriver => "no driver loaded",
            ErrorCode::NotLive => "no active audio device",
            ErrorCode::DevicePlay => "some device playback error",
            ErrorCode::DeviceOpen => "failed to open device",
            ErrorCode::BufferError => "buffer (communication) error",
            ErrorCode::ModuleError => "basic module system error",
            ErrorCode::BadParam => "bad parameter",
        }
    }

    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }
}

/// Errors that can occur during output operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Allocation failure.
    #[error("out of memory")]
    OutOfMemory,

    /// No usable driver name was given and no default is configured.
    #[error("bad driver name: {0}")]
    BadDriverName(String),

    /// A driver could not be instantiated.
    #[error("failure loading driver module: {0}")]
    BadDriver(String),

    /// No driver is bound, or none of the candidates could be opened.
    #[error("no driver loaded: {0}")]
    NoDriver(String),

    /// Driver registry failure.
    #[error("basic module system error: {0}")]
    Module(String),

    /// Rejected parameter or configuration value.
    #[error("bad parameter: {0}")]
    BadParam(String),

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// Operation needs a started device.
    #[error("no active audio device")]
    NotLive,

    /// The driver failed to open the device.
    #[error("failed to open device: {0}")]
    DeviceOpen(String),

    /// The driver failed while writing audio.
    #[error("some device playback error: {0}")]
    DevicePlay(String),

    // ========================================================================
    // Buffer Errors
    // ========================================================================
    /// The buffer worker is gone or answered out of protocol.
    #[error("buffer (communication) error: {0}")]
    Buffer(String),
}

impl OutputError {
    /// Code recorded on the handle for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            OutputError::OutOfMemory => ErrorCode::OutOfMemory,
            OutputError::BadDriverName(_) => ErrorCode::BadDriverName,
            OutputError::BadDriver(_) => ErrorCode::BadDriver,
            OutputError::NoDriver(_) => ErrorCode::NoDriver,
            OutputError::Module(_) => ErrorCode::ModuleError,
            OutputError::BadParam(_) => ErrorCode::BadParam,
            OutputError::NotLive => ErrorCode::NotLive,
            OutputError::DeviceOpen(_) => ErrorCode::DeviceOpen,
            OutputError::DevicePlay(_) => ErrorCode::DevicePlay,
            OutputError::Buffer(_) => ErrorCode::BufferError,
        }
    }

    /// Returns `true` for errors raised by the device itself.
    pub fn is_device_error(&self) -> bool {
        matches!(self, OutputError::DeviceOpen(_) | OutputError::DevicePlay(_))
    }
}

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;
