//! # Audio Output Module
//!
//! Feeds decoded PCM bytes to an output driver.
//!
//! ## Overview
//!
//! This module handles:
//! - The output state machine (`open`, `start`, `play`, `pause`, `stop`, `close`)
//! - Driver resolution by name, with a built-in `test` sink
//! - Optional buffered output through a worker thread and a shared ring
//! - Encoding queries and tunable parameters
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{Encoding, OutputConfig, OutputHandle};
//!
//! let mut out = OutputHandle::new(OutputConfig::buffered(64 * 1024))?;
//! out.open(Some("test"), None)?;
//! out.start(Encoding::S16, 2, 44100)?;
//! out.play(&pcm);
//! out.drain();
//! out.close();
//! ```

mod buffer;
pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod output;
pub mod params;
pub mod ring_buffer;

pub use buffer::ExitMode;
pub use config::OutputConfig;
pub use driver::{Driver, DriverFactory, DriverRegistry, OpenRequest, TestDriver};
pub use error::{ErrorCode, OutputError, Result};
pub use format::{Encoding, EncodingMask, OutputFormat};
pub use output::{DriverInfo, OutputHandle, OutputState};
pub use params::{OutputFlags, OutputParams, Param, ParamKind};
