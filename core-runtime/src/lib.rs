//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure shared by the decoder-side crates:
//! - Logging and tracing infrastructure
//! - The runtime error type
//!
//! ## Overview
//!
//! `core-metadata` and `core-playback` only emit `tracing` events. Hosts call
//! [`logging::init_logging`] once to decide where those events go and which
//! verbosity survives filtering.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
