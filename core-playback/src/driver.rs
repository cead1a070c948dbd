//! # Output Drivers
//!
//! A driver is the backend that actually moves PCM bytes somewhere: a sound
//! card, a file writer or a null sink. Drivers are resolved by name, either
//! from the built-in set or from factories registered in a [`DriverRegistry`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{DriverRegistry, TestDriver};
//!
//! let mut registry = DriverRegistry::new();
//! registry.register("null", || Ok(Box::new(TestDriver::new())));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::format::{Encoding, EncodingMask};
use crate::params::OutputParams;

/// Everything a driver gets to see when asked to open the device.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub device: Option<String>,
    pub rate: Option<u32>,
    pub channels: Option<u16>,
    /// `None` when probing or querying formats.
    pub encoding: Option<Encoding>,
    pub params: OutputParams,
}

impl OpenRequest {
    /// Probe request: no format at all.
    pub fn probe(device: Option<String>, params: OutputParams) -> Self {
        Self {
            device,
            rate: None,
            channels: None,
            encoding: None,
            params,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.encoding.is_none()
    }
}

/// Driver contract.
///
/// `open`, `formats`, `write` and `close` are mandatory; `flush`, `drain` and
/// `deinit` default to doing nothing.
pub trait Driver: Send {
    /// Open the device. A request without encoding only checks availability
    /// or prepares a format query.
    fn open(&mut self, request: &OpenRequest) -> Result<()>;

    /// Encodings supported for the rate and channel count of `request`.
    fn formats(&mut self, request: &OpenRequest) -> EncodingMask;

    /// Write some bytes, returning how many were taken.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    fn close(&mut self) -> Result<()>;

    /// Discard audio queued in the device.
    fn flush(&mut self) {}

    /// Wait for queued audio to be played.
    fn drain(&mut self) {}

    /// Release everything before the driver is dropped.
    fn deinit(&mut self) {}
}

/// Builds a fresh driver instance.
pub type DriverFactory = Arc<dyn Fn() -> Result<Box<dyn Driver>> + Send + Sync>;

/// Names of drivers that need no registration.
pub const BUILTIN_DRIVERS: [&str; 1] = ["test"];

/// A driver looked up by name.
pub(crate) enum Resolved {
    /// Built-in, accepted without probing.
    Builtin(Box<dyn Driver>),
    /// Registered factory output, must pass a probe open.
    External(Box<dyn Driver>),
}

/// Registered driver factories.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing an earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn Driver>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        BUILTIN_DRIVERS.contains(&name) || self.factories.contains_key(name)
    }

    /// Built-in names first, then registered ones in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut external: Vec<String> = self
            .factories
            .keys()
            .filter(|name| !BUILTIN_DRIVERS.contains(&name.as_str()))
            .cloned()
            .collect();
        external.sort();
        BUILTIN_DRIVERS
            .iter()
            .map(|name| name.to_string())
            .chain(external)
            .collect()
    }

    /// Instantiate `name`. `None` when nothing answers to it.
    pub(crate) fn resolve(&self, name: &str) -> Option<Result<Resolved>> {
        if name == "test" {
            return Some(Ok(Resolved::Builtin(Box::new(TestDriver::new()))));
        }
        let factory = self.factories.get(name)?;
        Some(factory().map(Resolved::External))
    }
}

/// Null sink: accepts every encoding and swallows all writes.
#[derive(Debug, Default)]
pub struct TestDriver {
    written: Option<Arc<AtomicUsize>>,
}

impl TestDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count swallowed bytes in `counter`.
    pub fn with_counter(counter: Arc<AtomicUsize>) -> Self {
        Self {
            written: Some(counter),
        }
    }
}

impl Driver for TestDriver {
    fn open(&mut self, _request: &OpenRequest) -> Result<()> {
        Ok(())
    }

    fn formats(&mut self, _request: &OpenRequest) -> EncodingMask {
        EncodingMask::ANY
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(counter) = &self.written {
            counter.fetch_add(data.len(), Ordering::Relaxed);
        }
        Ok(data.len())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
