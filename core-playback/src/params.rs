//! # Output Parameters
//!
//! Tunables that travel with an output handle and are mirrored to the buffer
//! worker whenever they change.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::{OutputError, Result};

/// Output flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputFlags(u32);

impl OutputFlags {
    pub const HEADPHONES: OutputFlags = OutputFlags(0x01);
    pub const INTERNAL_SPEAKER: OutputFlags = OutputFlags(0x02);
    pub const LINE_OUT: OutputFlags = OutputFlags(0x04);
    /// Suppress non-fatal diagnostics.
    pub const QUIET: OutputFlags = OutputFlags(0x08);
    /// Keep writing after a partial device write until everything is out.
    pub const KEEP_PLAYING: OutputFlags = OutputFlags(0x10);

    pub const fn empty() -> Self {
        OutputFlags(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        OutputFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: OutputFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: OutputFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: OutputFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for OutputFlags {
    type Output = OutputFlags;

    fn bitor(self, rhs: OutputFlags) -> OutputFlags {
        OutputFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutputFlags {
    fn bitor_assign(&mut self, rhs: OutputFlags) {
        self.0 |= rhs.0;
    }
}

/// Tunable output parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputParams {
    #[serde(default)]
    pub flags: OutputFlags,

    /// Fraction of the buffer to fill before the worker starts playing.
    ///
    /// Default: 0.0.
    #[serde(default)]
    pub preload: f64,

    /// Driver specific gain, negative for "leave alone".
    ///
    /// Default: -1.
    #[serde(default = "default_gain")]
    pub gain: i64,

    #[serde(default)]
    pub verbose: i32,

    /// Device buffer size hint in seconds, 0 for the driver's choice.
    #[serde(default)]
    pub device_buffer: f64,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            flags: OutputFlags::empty(),
            preload: 0.0,
            gain: default_gain(),
            verbose: 0,
            device_buffer: 0.0,
        }
    }
}

fn default_gain() -> i64 {
    -1
}

impl OutputParams {
    pub fn quiet(&self) -> bool {
        self.flags.contains(OutputFlags::QUIET)
    }

    pub fn keep_playing(&self) -> bool {
        self.flags.contains(OutputFlags::KEEP_PLAYING)
    }

    pub fn verbose_at(&self, level: i32) -> bool {
        self.verbose >= level
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.preload) {
            return Err(format!("preload must be between 0.0 and 1.0, got {}", self.preload));
        }
        if !self.device_buffer.is_finite() || self.device_buffer < 0.0 {
            return Err(format!(
                "device_buffer must be a non-negative duration, got {}",
                self.device_buffer
            ));
        }
        if self.verbose < 0 {
            return Err("verbose must not be negative".to_string());
        }
        Ok(())
    }

    /// Apply one parameter; on rejection nothing changes.
    pub fn set(&mut self, param: Param) -> Result<()> {
        let mut next = *self;
        match param {
            Param::Flags(flags) => next.flags = flags,
            Param::Preload(preload) => next.preload = preload,
            Param::Gain(gain) => next.gain = gain,
            Param::Verbose(verbose) => next.verbose = verbose,
            Param::DeviceBuffer(seconds) => next.device_buffer = seconds,
        }
        next.validate().map_err(OutputError::BadParam)?;
        *self = next;
        Ok(())
    }

    pub fn get(&self, kind: ParamKind) -> Param {
        match kind {
            ParamKind::Flags => Param::Flags(self.flags),
            ParamKind::Preload => Param::Preload(self.preload),
            ParamKind::Gain => Param::Gain(self.gain),
            ParamKind::Verbose => Param::Verbose(self.verbose),
            ParamKind::DeviceBuffer => Param::DeviceBuffer(self.device_buffer),
        }
    }
}

/// Which parameter to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Flags,
    Preload,
    Gain,
    Verbose,
    DeviceBuffer,
}

/// A parameter together with its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Flags(OutputFlags),
    Preload(f64),
    Gain(i64),
    Verbose(i32),
    DeviceBuffer(f64),
}

impl Param {
    pub fn kind(&self) -> ParamKind {
        match self {
            Param::Flags(_) => ParamKind::Flags,
            Param::Preload(_) => ParamKind::Preload,
            Param::Gain(_) => ParamKind::Gain,
            Param::Verbose(_) => ParamKind::Verbose,
            Param::DeviceBuffer(_) => ParamKind::DeviceBuffer,
        }
    }
}
