//! Workspace facade crate.
//!
//! Re-exports the workspace crates behind feature flags so that a host can
//! depend on `mpgcore-workspace` alone:
//!
//! - `metadata` (default): [`metadata`], the ID3v2 tag parser
//! - `playback` (default): [`playback`], the audio output layer
//!
//! [`runtime`] (logging setup) is always available.

pub use core_runtime as runtime;

#[cfg(feature = "metadata")]
pub use core_metadata as metadata;

#[cfg(feature = "playback")]
pub use core_playback as playback;
