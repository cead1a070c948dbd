//! # ID3v2 Metadata Module
//!
//! Parses ID3v2 tags embedded in MPEG audio streams.
//!
//! ## Overview
//!
//! This module handles:
//! - Tag header validation, synchsafe sizes and footers (ID3v2.2, 2.3, 2.4)
//! - Frame iteration with de-unsynchronisation and version 2 id promotion
//! - Text decoding from Latin-1, UTF-16 and UTF-8 into UTF-8 strings
//! - Text, comment, TXXX, USLT and picture storage in a [`FrameStore`]
//! - Replay-gain extraction from comments, TXXX and RVA2 frames
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{Id3v2Parser, ParserConfig, SliceReader, TagStatus};
//!
//! let mut parser = Id3v2Parser::new(ParserConfig::default());
//! let mut reader = SliceReader::new(&stream[4..]);
//! let first4 = [stream[0], stream[1], stream[2], stream[3]];
//!
//! if let TagStatus::Parsed { .. } = parser.parse(first4, &mut reader)? {
//!     println!("Title: {}", parser.store().title().unwrap_or_default());
//! }
//! ```

pub mod config;
pub mod error;
pub mod id3v2;
pub mod reader;
pub mod rva;
pub mod store;
pub mod text;

pub use config::ParserConfig;
pub use error::{MetadataError, Result};
pub use id3v2::{Id3v2Parser, TagStatus};
pub use reader::{ReadError, SliceReader, StreamReader, TagReader};
pub use rva::{GainMode, GainSlot, GainSource, ReplayGain};
pub use store::{FrameId, FrameStore, Picture, RawText, TextEntry, TextList};
pub use text::TextEncoding;
