//! # ID3v2 Tag Parser
//!
//! Walks one ID3v2 tag (versions 2.2, 2.3 and 2.4) and fills the
//! [`FrameStore`] and [`ReplayGain`] state.
//!
//! ## Layout
//!
//! ```text
//! "ID3" major revision flags size(4, synchsafe)    10 byte header
//! [extended header]
//! frame: id(3|4) size(3|4) [flags(2)] payload       repeated
//! [padding]
//! [footer, 10 bytes]
//! ```
//!
//! The decoder has already consumed `"ID3"` and the major version byte while
//! searching for sync, so [`Id3v2Parser::parse`] receives those four bytes and
//! reads the rest from a [`TagReader`].
//!
//! Content problems never lose stream framing: once the tag size is known the
//! whole tag is consumed, even when its frames are unusable.

use std::borrow::Cow;

use bytes::Bytes;
use tracing::{debug, error, instrument, trace, warn};

use crate::config::ParserConfig;
use crate::error::{MetadataError, Result};
use crate::reader::TagReader;
use crate::rva::{parse_float, GainMode, GainSource, ReplayGain};
use crate::store::{FrameId, FrameStore, RawText, TextList};
use crate::text::{self, next_text, TextEncoding};

// ============================================================================
// Flags
// ============================================================================

const TAG_UNSYNC: u8 = 0x80;
const TAG_EXTENDED_HEADER: u8 = 0x40;
const TAG_FOOTER: u8 = 0x10;
const TAG_UNKNOWN_FLAGS: u8 = 0x0F;

const HEADER_LEN: usize = 10;
const FOOTER_LEN: usize = 10;

/// Frame flags (v2.4 layout) that mark a frame we will not interpret.
const FRAME_BAD_FLAGS: u16 = 0x8FB0;
const FRAME_COMPRESSED: u16 = 0x0008;
const FRAME_ENCRYPTED: u16 = 0x0004;
const FRAME_UNSYNC: u16 = 0x0002;

/// ID3v2.2 three-character ids and their ID3v2.3 equivalents.
const V2_FRAME_IDS: [(&[u8; 3], &[u8; 4]); 37] = [
    (b"COM", b"COMM"),
    (b"TAL", b"TALB"),
    (b"TBP", b"TBPM"),
    (b"TCM", b"TCOM"),
    (b"TCO", b"TCON"),
    (b"TCR", b"TCOP"),
    (b"TDA", b"TDAT"),
    (b"TDY", b"TDLY"),
    (b"TEN", b"TENC"),
    (b"TFT", b"TFLT"),
    (b"TIM", b"TIME"),
    (b"TKE", b"TKEY"),
    (b"TLA", b"TLAN"),
    (b"TLE", b"TLEN"),
    (b"TMT", b"TMED"),
    (b"TOA", b"TOPE"),
    (b"TOF", b"TOFN"),
    (b"TOL", b"TOLY"),
    (b"TOR", b"TORY"),
    (b"TOT", b"TOAL"),
    (b"TP1", b"TPE1"),
    (b"TP2", b"TPE2"),
    (b"TP3", b"TPE3"),
    (b"TP4", b"TPE4"),
    (b"TPA", b"TPOS"),
    (b"TPB", b"TPUB"),
    (b"TRC", b"TSRC"),
    (b"TRD", b"TRDA"),
    (b"TRK", b"TRCK"),
    (b"TSI", b"TSIZ"),
    (b"TSS", b"TSSE"),
    (b"TT1", b"TIT1"),
    (b"TT2", b"TIT2"),
    (b"TT3", b"TIT3"),
    (b"TXT", b"TEXT"),
    (b"TXX", b"TXXX"),
    (b"TYE", b"TYER"),
];

// ============================================================================
// Integer helpers
// ============================================================================

/// Decode a 28-bit synchsafe integer; `None` if any byte has its high bit set.
pub fn decode_synchsafe(bytes: [u8; 4]) -> Option<u32> {
    if (bytes[0] | bytes[1] | bytes[2] | bytes[3]) & 0x80 != 0 {
        return None;
    }
    Some(
        (u32::from(bytes[0]) << 21)
            | (u32::from(bytes[1]) << 14)
            | (u32::from(bytes[2]) << 7)
            | u32::from(bytes[3]),
    )
}

/// Encode a value below 2^28 as a synchsafe integer.
pub fn encode_synchsafe(value: u32) -> Option<[u8; 4]> {
    if value >= 1 << 28 {
        return None;
    }
    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// Four-byte size field: plain big endian in v2.3, synchsafe otherwise.
fn decode_size(major: u8, bytes: [u8; 4]) -> Option<u32> {
    if major == 3 {
        Some(u32::from_be_bytes(bytes))
    } else {
        decode_synchsafe(bytes)
    }
}

fn four(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn is_frame_id_byte(b: u8) -> bool {
    b.is_ascii_digit() || b.is_ascii_uppercase()
}

/// Translate an ID3v2.2 id; `None` for ids without an equivalent.
pub fn promote_frame_id(old: &[u8; 3]) -> Option<FrameId> {
    V2_FRAME_IDS
        .iter()
        .find(|(v2, _)| *v2 == old)
        .map(|(_, v3)| FrameId(**v3))
}

/// Reverse unsynchronisation: every `FF 00` pair loses its zero.
pub(crate) fn deunsync(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.try_reserve_exact(data.len())?;

    if let Some(&first) = data.first() {
        out.push(first);
    }
    for window in data.windows(2) {
        if !(window[1] == 0 && window[0] == 0xFF) {
            out.push(window[1]);
        }
    }
    Ok(out)
}

// ============================================================================
// Parser
// ============================================================================

/// Outcome of [`Id3v2Parser::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStatus {
    /// Not a usable tag header. Nothing beyond the header bytes was consumed.
    Rejected,
    /// Valid header, but the tag was not interpreted. The whole tag was consumed.
    Skipped,
    /// Tag interpreted; `frames` frames were handed to a frame handler.
    Parsed { frames: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Text,
    Comment,
    Extra,
    Rva2,
    Lyrics,
    Picture,
}

impl FrameKind {
    fn classify(id: FrameId) -> Option<Self> {
        match id {
            FrameId::COMMENT => Some(FrameKind::Comment),
            FrameId::EXTRA => Some(FrameKind::Extra),
            FrameId::RVA2 => Some(FrameKind::Rva2),
            FrameId::LYRICS => Some(FrameKind::Lyrics),
            FrameId::PICTURE => Some(FrameKind::Picture),
            FrameId([b'T', ..]) => Some(FrameKind::Text),
            _ => None,
        }
    }
}

/// ID3v2 parser state for one decoder.
///
/// Holds the most recent tag's frames, replay gain and (optionally) raw bytes.
/// Each structurally parsed tag replaces what the previous one left.
#[derive(Debug, Clone, Default)]
pub struct Id3v2Parser {
    config: ParserConfig,
    version: u8,
    raw: Option<Bytes>,
    store: FrameStore,
    replay_gain: ReplayGain,
}

impl Id3v2Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Major version of the last parsed tag, 0 when none.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Verbatim copy of the last stored tag.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn replay_gain(&self) -> &ReplayGain {
        &self.replay_gain
    }

    /// Mutable access for gain sources outside the tag, such as an Info header.
    pub fn replay_gain_mut(&mut self) -> &mut ReplayGain {
        &mut self.replay_gain
    }

    /// Forget everything, including the raw copy.
    pub fn reset(&mut self) {
        self.version = 0;
        self.raw = None;
        self.store.clear();
        self.replay_gain.reset();
    }

    /// Parse one tag whose first four bytes (`"ID3"` + major version) have
    /// already been read.
    ///
    /// # Errors
    ///
    /// - [`MetadataError::NeedMoreData`] / [`MetadataError::Io`] when the reader
    ///   fails; the caller may retry once more input is available.
    /// - [`MetadataError::OutOfMemory`] when the tag could not be buffered; the
    ///   tag bytes have been skipped.
    #[instrument(skip(self, reader), fields(major = first4[3]))]
    pub fn parse<R: TagReader + ?Sized>(
        &mut self,
        first4: [u8; 4],
        reader: &mut R,
    ) -> Result<TagStatus> {
        let major = first4[3];
        if major == 0xFF {
            return Ok(TagStatus::Rejected);
        }

        let mut header = [0u8; 6];
        reader.read_exact(&mut header)?;

        let revision = header[0];
        if revision == 0xFF {
            return Ok(TagStatus::Rejected);
        }
        let flags = header[1];

        let Some(length) = decode_synchsafe(four(&header[2..6])) else {
            if self.config.noquiet() {
                error!(
                    size = format_args!(
                        "{:02x}{:02x}{:02x}{:02x}",
                        header[2], header[3], header[4], header[5]
                    ),
                    "Bad tag length (not synchsafe)"
                );
            }
            return Ok(TagStatus::Rejected);
        };
        let length = length as usize;
        let footer = if flags & TAG_FOOTER != 0 { FOOTER_LEN } else { 0 };

        if self.config.verbose_at(2) {
            debug!(major, revision, length, "ID3v2 tag");
        }

        let mut skip = false;
        if self.config.skip_id3v2 {
            if self.config.verbose_at(3) {
                debug!("Skipping ID3v2 tag per user request");
            }
            skip = true;
        }
        if flags & TAG_UNKNOWN_FLAGS != 0 || !(2..=4).contains(&major) {
            if self.config.noquiet() {
                warn!(
                    major,
                    flags = format_args!("{:#04x}", flags),
                    "Won't parse the ID3v2 tag with this version and flags"
                );
            }
            skip = true;
        }
        if length < 10 {
            if self.config.noquiet() {
                warn!(length, "Unrealistic small ID3v2 tag length, skipping");
            }
            skip = true;
        }

        if !skip || self.config.store_raw_id3 {
            let tag = self.read_tag(first4, header, length + footer, reader)?;
            if skip {
                self.raw = Some(Bytes::from(tag));
                return Ok(TagStatus::Skipped);
            }

            self.store.clear();
            self.replay_gain.reset();
            self.version = major;

            let frames = self.parse_body(&tag[HEADER_LEN..HEADER_LEN + length], major, flags);
            self.store.link();

            self.raw = self.config.store_raw_id3.then(|| Bytes::from(tag));
            return Ok(TagStatus::Parsed { frames });
        }

        reader.skip((length + footer) as u64)?;
        Ok(TagStatus::Skipped)
    }

    /// Buffer the whole tag, header included.
    fn read_tag<R: TagReader + ?Sized>(
        &mut self,
        first4: [u8; 4],
        header: [u8; 6],
        body_len: usize,
        reader: &mut R,
    ) -> Result<Vec<u8>> {
        self.raw = None;
        let full_len = HEADER_LEN + body_len;

        let mut tag = Vec::new();
        if tag.try_reserve_exact(full_len).is_err() {
            if self.config.noquiet() {
                error!(
                    bytes = full_len,
                    "Unable to allocate ID3v2 buffer, trying to skip instead"
                );
            }
            reader.skip(body_len as u64)?;
            return Err(MetadataError::OutOfMemory);
        }

        tag.extend_from_slice(&first4);
        tag.extend_from_slice(&header);
        tag.resize(full_len, 0);
        reader.read_exact(&mut tag[HEADER_LEN..])?;
        Ok(tag)
    }

    /// Iterate over the frames of a tag body.
    fn parse_body(&mut self, body: &[u8], major: u8, flags: u8) -> usize {
        let length = body.len();
        let mut tagpos = 0usize;

        if flags & TAG_EXTENDED_HEADER != 0 {
            trace!("skipping extended header");
            match decode_size(major, four(body)) {
                Some(size) if (size as usize) < length => tagpos = size as usize,
                _ => {
                    if self.config.noquiet() {
                        error!(
                            offset = format_args!(
                                "{:02x}{:02x}{:02x}{:02x}",
                                body[0], body[1], body[2], body[3]
                            ),
                            "Bad (non-synchsafe/too large) tag offset"
                        );
                    }
                    return 0;
                }
            }
        }

        let head_part = if major > 2 { 4 } else { 3 };
        let flag_part = if major > 2 { 2 } else { 0 };
        let frame_begin = head_part + head_part + flag_part;
        let mut frames = 0;

        while tagpos + frame_begin <= length {
            let id_bytes = &body[tagpos..tagpos + head_part];
            if !id_bytes.iter().copied().all(is_frame_id_byte) {
                trace!(tagpos, "tag data ended, padding follows");
                break;
            }

            let mut pos = tagpos + head_part;
            let size_bytes = &body[pos..pos + head_part];
            let frame_size = if major == 2 {
                Some(
                    (u32::from(size_bytes[0]) << 16)
                        | (u32::from(size_bytes[1]) << 8)
                        | u32::from(size_bytes[2]),
                )
            } else {
                decode_size(major, four(size_bytes))
            };
            let Some(frame_size) = frame_size.map(|s| s as usize) else {
                if self.config.noquiet() {
                    error!(
                        frame = %String::from_utf8_lossy(id_bytes),
                        "Non-synchsafe frame size, skipping the remainder of tag"
                    );
                }
                break;
            };
            pos += head_part;

            let frame_flags = if major > 2 {
                let f = u16::from_be_bytes([body[pos], body[pos + 1]]);
                pos += flag_part;
                f
            } else {
                0
            };

            if length - pos < frame_size {
                if self.config.noquiet() {
                    error!(
                        frame = %String::from_utf8_lossy(id_bytes),
                        frame_size,
                        remaining = length - pos,
                        "Frame claims to be larger than the whole rest of the tag"
                    );
                }
                break;
            }
            // Next frame starts here whatever happens to this one.
            tagpos = pos + frame_size;

            let id = if head_part == 3 {
                let old = [id_bytes[0], id_bytes[1], id_bytes[2]];
                match promote_frame_id(&old) {
                    Some(id) => {
                        if self.config.verbose_at(3) {
                            trace!(from = %String::from_utf8_lossy(&old), to = %id, "Translated ID3v2.2 frame");
                        }
                        id
                    }
                    None => {
                        if self.config.verbose_at(3) {
                            trace!(frame = %String::from_utf8_lossy(&old), "Ignoring untranslated ID3v2.2 frame");
                        }
                        continue;
                    }
                }
            } else {
                FrameId(four(id_bytes))
            };

            if self.config.verbose_at(3) {
                trace!(frame = %id, frame_size, "ID3v2 frame");
            }

            if frame_flags & (FRAME_BAD_FLAGS | FRAME_COMPRESSED | FRAME_ENCRYPTED) != 0 {
                if self.config.noquiet() {
                    warn!(frame = %id, flags = format_args!("{:#06x}", frame_flags), "Skipping invalid/unsupported frame");
                }
                continue;
            }

            let Some(kind) = FrameKind::classify(id) else {
                continue;
            };

            let payload = &body[pos..tagpos];
            let data: Cow<'_, [u8]> =
                if flags & TAG_UNSYNC != 0 || frame_flags & FRAME_UNSYNC != 0 {
                    match deunsync(payload) {
                        Ok(data) => {
                            trace!(from = payload.len(), to = data.len(), "de-unsynchronised frame");
                            Cow::Owned(data)
                        }
                        Err(_) => {
                            if self.config.noquiet() {
                                error!(frame = %id, "Unable to allocate working buffer for de-unsync");
                            }
                            continue;
                        }
                    }
                } else {
                    Cow::Borrowed(payload)
                };

            if data.is_empty() {
                continue;
            }

            frames += 1;
            let outcome = match kind {
                FrameKind::Text => self.process_text(id, &data),
                FrameKind::Comment | FrameKind::Lyrics => self.process_comment(kind, id, &data),
                FrameKind::Extra => self.process_extra(id, &data),
                FrameKind::Rva2 => self.process_rva2(&data),
                FrameKind::Picture if self.config.pictures => self.process_picture(&data),
                FrameKind::Picture => Ok(()),
            };

            if let Err(err) = outcome {
                if self.config.noquiet() {
                    match err {
                        MetadataError::OutOfMemory => error!(frame = %id, "Unable to store frame, out of memory"),
                        other => warn!(frame = %id, error = %other, "Dropping frame"),
                    }
                }
            }
        }

        frames
    }

    fn noquiet(&self) -> bool {
        self.config.noquiet()
    }

    fn decode(&self, encoding: TextEncoding, bytes: &[u8]) -> String {
        text::decode(encoding, bytes, self.noquiet())
    }

    /// Undecoded copy of one field, prefixed by its encoding byte.
    fn raw_field(&self, encoding: TextEncoding, bytes: &[u8]) -> Result<Bytes> {
        let mut raw = Vec::new();
        raw.try_reserve_exact(bytes.len() + 1)?;
        raw.push(encoding.code());
        raw.extend_from_slice(bytes);
        Ok(Bytes::from(raw))
    }

    fn process_text(&mut self, id: FrameId, data: &[u8]) -> Result<()> {
        let encoding = TextEncoding::try_from(data[0])?;
        if self.config.verbose_at(4) {
            trace!(frame = %id, encoding = %encoding, "Storing text");
        }

        let text = self.decode(encoding, &data[1..]);
        let raw = if self.config.plain_id3_text {
            Some(RawText {
                description: Bytes::new(),
                text: self.raw_field(encoding, &data[1..])?,
            })
        } else {
            None
        };

        let entry = self.store.add(TextList::Text)?;
        entry.id = id;
        entry.text = text;
        entry.raw = raw;
        Ok(())
    }

    /// COMM and USLT: encoding, language, terminated description, text.
    fn process_comment(&mut self, kind: FrameKind, id: FrameId, data: &[u8]) -> Result<()> {
        if data.len() < 4 {
            return Err(MetadataError::MalformedFrame(format!(
                "invalid frame size of {} (too small for anything)",
                data.len()
            )));
        }
        let encoding = TextEncoding::try_from(data[0])?;
        let list = if kind == FrameKind::Lyrics {
            TextList::Text
        } else {
            TextList::Comment
        };

        let entry = self.store.add(list)?;
        entry.id = id;
        entry.lang = [data[1], data[2], data[3]];

        let result = self.fill_comment(kind, list, encoding, &data[4..]);
        if result.is_err() {
            self.store.pop(list);
        }
        result
    }

    fn fill_comment(
        &mut self,
        kind: FrameKind,
        list: TextList,
        encoding: TextEncoding,
        descr: &[u8],
    ) -> Result<()> {
        let split = next_text(descr, encoding).ok_or_else(|| {
            MetadataError::MalformedFrame("no comment text / valid description".to_string())
        })?;
        let (description_bytes, text_bytes) = descr.split_at(split);

        let description = self.decode(encoding, description_bytes);
        let text = self.decode(encoding, text_bytes);
        let raw = if self.config.plain_id3_text {
            Some(RawText {
                description: self.raw_field(encoding, description_bytes)?,
                text: self.raw_field(encoding, text_bytes)?,
            })
        } else {
            None
        };

        // Only real comments carry RVA information, lyrics never do.
        if kind == FrameKind::Comment {
            if let Some(mode) = GainMode::from_comment_description(&description) {
                let gain = parse_float(&text);
                if self
                    .replay_gain
                    .update(mode, GainSource::Comment, Some(gain), Some(0.0))
                    && self.config.verbose_at(3)
                {
                    debug!(?mode, gain, "RVA value from comment");
                }
            }
        }

        if self.config.verbose_at(4) {
            trace!(
                description_len = description.len(),
                text_len = text.len(),
                "Stored comment/lyrics"
            );
        }

        if let Some(entry) = self.store.last_mut(list) {
            entry.description = description;
            entry.text = text;
            entry.raw = raw;
        }
        Ok(())
    }

    /// TXXX: encoding, terminated description, text.
    fn process_extra(&mut self, id: FrameId, data: &[u8]) -> Result<()> {
        let encoding = TextEncoding::try_from(data[0])?;
        let descr = &data[1..];
        let Some(split) = next_text(descr, encoding) else {
            return Err(MetadataError::MalformedFrame(
                "no extra frame text / valid description".to_string(),
            ));
        };
        let (description_bytes, text_bytes) = descr.split_at(split);

        let description = self.decode(encoding, description_bytes);
        let text = self.decode(encoding, text_bytes);
        let raw = if self.config.plain_id3_text {
            Some(RawText {
                description: self.raw_field(encoding, description_bytes)?,
                text: self.raw_field(encoding, text_bytes)?,
            })
        } else {
            None
        };

        self.apply_replaygain_extra(&description, &text);

        let entry = self.store.add(TextList::Extra)?;
        entry.id = id;
        entry.description = description;
        entry.text = text;
        entry.raw = raw;
        Ok(())
    }

    /// `replaygain_{track,album}_{gain,peak}` TXXX frames.
    fn apply_replaygain_extra(&mut self, description: &str, text: &str) {
        const TRACK: &str = "replaygain_track_";
        const ALBUM: &str = "replaygain_album_";

        let lower = description.to_ascii_lowercase();
        let (mode, suffix) = if let Some(suffix) = lower.strip_prefix(TRACK) {
            (GainMode::Mix, suffix)
        } else if let Some(suffix) = lower.strip_prefix(ALBUM) {
            (GainMode::Album, suffix)
        } else {
            return;
        };

        let value = parse_float(text);
        let applied = match suffix {
            "gain" => self
                .replay_gain
                .update(mode, GainSource::Extra, Some(value), None),
            "peak" => self
                .replay_gain
                .update(mode, GainSource::Extra, None, Some(value)),
            _ => return,
        };

        if applied && self.config.verbose_at(3) {
            debug!(?mode, kind = suffix, value, "RVA ReplayGain value");
        }
    }

    /// RVA2: terminated identification, then channel entries of
    /// type, 16-bit adjustment (dB * 512), peak bit count and peak bytes.
    fn process_rva2(&mut self, data: &[u8]) -> Result<()> {
        let Some(id_end) = data.iter().position(|&b| b == 0) else {
            return Err(MetadataError::MalformedFrame(
                "bad RVA2 tag (non-terminated identification)".to_string(),
            ));
        };
        let identification = &data[..id_end];
        let mut pos = id_end + 1;
        if pos >= data.len() {
            return Err(MetadataError::MalformedFrame(
                "bad RVA2 tag (non-terminated identification)".to_string(),
            ));
        }

        let mode = GainMode::from_rva2_identification(identification);
        if self.config.verbose_at(3) {
            debug!(identification = %String::from_utf8_lossy(identification), "RVA2 identification");
        }
        if !self.replay_gain.accepts(mode, GainSource::Rva2) {
            return Ok(());
        }

        while pos + 3 <= data.len() {
            let channel = data[pos];
            let adjustment = i16::from_be_bytes([data[pos + 1], data[pos + 2]]);
            if channel == 1 {
                let gain = f32::from(adjustment) / 512.0;
                // Peak bits are not decoded.
                self.replay_gain
                    .update(mode, GainSource::Rva2, Some(gain), Some(0.0));
                if self.config.verbose_at(3) {
                    debug!(?mode, gain, "RVA value from RVA2 master channel");
                }
                return Ok(());
            }

            let Some(&peak_bits) = data.get(pos + 3) else {
                break;
            };
            pos += 4 + (usize::from(peak_bits) + 7) / 8;
        }

        trace!("RVA2 frame without master channel");
        Ok(())
    }

    /// APIC: encoding, Latin-1 MIME type, picture type, description, payload.
    fn process_picture(&mut self, data: &[u8]) -> Result<()> {
        let encoding = TextEncoding::try_from(data[0])?;
        if self.config.verbose_at(4) {
            trace!("Storing picture from APIC frame");
        }

        self.store.add_picture()?;
        let result = self.fill_picture(encoding, &data[1..]);
        if result.is_err() {
            self.store.pop_picture();
        }
        result
    }

    fn fill_picture(&mut self, encoding: TextEncoding, data: &[u8]) -> Result<()> {
        let skipping = |reason: &str| MetadataError::MalformedFrame(format!("{}; skipping picture", reason));

        let mime_end = next_text(data, TextEncoding::Latin1)
            .ok_or_else(|| skipping("Unable to get mime type for picture"))?;
        let mime_type = self.decode(TextEncoding::Latin1, &data[..mime_end]);

        let picture_type = data[mime_end];
        let rest = &data[mime_end + 1..];

        let descr_end = next_text(rest, encoding)
            .ok_or_else(|| skipping("Unable to get description for picture"))?;
        let description = self.decode(encoding, &rest[..descr_end]);

        let payload = &rest[descr_end..];
        if payload.is_empty() {
            return Err(skipping("No picture data defined"));
        }
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(payload.len())?;
        bytes.extend_from_slice(payload);

        if self.config.verbose_at(4) {
            trace!(picture_type, size = payload.len(), "Stored APIC picture");
        }

        if let Some(picture) = self.store.last_picture_mut() {
            picture.mime_type = mime_type;
            picture.picture_type = picture_type;
            picture.description = description;
            picture.data = Bytes::from(bytes);
        }
        Ok(())
    }
}
