//! # Text Codec
//!
//! Converts ID3v2 text payloads into UTF-8 `String`s.
//!
//! Every ID3v2 text field is preceded by an encoding byte:
//!
//! | byte | encoding                         | unit |
//! |------|----------------------------------|------|
//! | 0    | ISO-8859-1                       | 1    |
//! | 1    | UTF-16 with byte order mark      | 2    |
//! | 2    | UTF-16 big endian                | 2    |
//! | 3    | UTF-8                            | 1    |
//!
//! Both UTF-16 variants honour byte order marks; several marks in a row are
//! tolerated and the last one decides. Without a mark, big endian is assumed.

use std::fmt;

use tracing::{trace, warn};

use crate::error::MetadataError;

/// Encoding byte of an ID3v2 text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Latin1,
    Utf16Bom,
    Utf16Be,
    Utf8,
}

impl TextEncoding {
    /// Width in bytes of one code unit (and of a string terminator).
    pub fn unit_width(self) -> usize {
        match self {
            TextEncoding::Latin1 | TextEncoding::Utf8 => 1,
            TextEncoding::Utf16Bom | TextEncoding::Utf16Be => 2,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TextEncoding::Latin1 => 0,
            TextEncoding::Utf16Bom => 1,
            TextEncoding::Utf16Be => 2,
            TextEncoding::Utf8 => 3,
        }
    }
}

impl TryFrom<u8> for TextEncoding {
    type Error = MetadataError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TextEncoding::Latin1),
            1 => Ok(TextEncoding::Utf16Bom),
            2 => Ok(TextEncoding::Utf16Be),
            3 => Ok(TextEncoding::Utf8),
            other => Err(MetadataError::UnknownEncoding(other)),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Latin1 => "Latin 1",
            TextEncoding::Utf16Bom => "UTF-16 BOM",
            TextEncoding::Utf16Be => "UTF-16 BE",
            TextEncoding::Utf8 => "UTF-8",
        };
        f.write_str(name)
    }
}

/// Decode `source` into UTF-8.
///
/// Stray zero bytes in front of the text are dropped (except for UTF-16 BE,
/// where a leading zero is a legal high byte), an incomplete trailing code unit
/// is cut off and trailing terminators are removed. Zero separators between
/// several strings in one field are kept.
pub fn decode(encoding: TextEncoding, source: &[u8], noquiet: bool) -> String {
    let width = encoding.unit_width();
    let mut source = source;

    if encoding != TextEncoding::Utf16Be {
        while source.len() > width && source[0] == 0 {
            source = &source[1..];
            trace!("skipped leading zero");
        }
    }

    let excess = source.len() % width;
    if excess != 0 {
        if noquiet {
            warn!(
                size = source.len(),
                encoding = %encoding,
                "Weird tag size for encoding, trimming to whole characters"
            );
        }
        source = &source[..source.len() - excess];
    }

    let mut text = match encoding {
        TextEncoding::Latin1 => decode_latin1(source),
        TextEncoding::Utf16Bom | TextEncoding::Utf16Be => decode_utf16(source, noquiet),
        TextEncoding::Utf8 => String::from_utf8_lossy(source).into_owned(),
    };

    let end = text.trim_end_matches('\0').len();
    text.truncate(end);
    text
}

/// Offset just past the first terminator in `data`.
///
/// Terminators are only looked for at unit-aligned positions. `None` when there
/// is no terminator, when only part of a unit remains, or when nothing follows
/// the terminator.
pub fn next_text(data: &[u8], encoding: TextEncoding) -> Option<usize> {
    let width = encoding.unit_width();
    let limit = data.len();
    let mut pos = 0;

    while pos < limit {
        if data[pos] == 0 {
            if limit - pos < width {
                return None;
            }
            if data[pos..pos + width].iter().all(|&b| b == 0) {
                let end = pos + width;
                return (end < limit).then_some(end);
            }
        }
        pos += width;
    }

    None
}

fn decode_latin1(source: &[u8]) -> String {
    source.iter().map(|&b| char::from(b)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

/// Strip any run of byte order marks; the last one wins.
fn strip_boms(mut source: &[u8]) -> (Option<ByteOrder>, &[u8]) {
    let mut order = None;
    while source.len() >= 2 {
        match (source[0], source[1]) {
            (0xFF, 0xFE) => order = Some(ByteOrder::Little),
            (0xFE, 0xFF) => order = Some(ByteOrder::Big),
            _ => break,
        }
        source = &source[2..];
    }
    (order, source)
}

fn decode_utf16(source: &[u8], noquiet: bool) -> String {
    let (order, body) = strip_boms(source);
    let order = order.unwrap_or(ByteOrder::Big);

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| match order {
            ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
            ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .collect();

    let mut out = String::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        if unit & 0xFC00 == 0xD800 {
            match units.get(i + 1) {
                Some(&trail) if trail & 0xFC00 == 0xDC00 => {
                    let point =
                        (((unit as u32) & 0x3FF) << 10) + ((trail as u32) & 0x3FF) + 0x10000;
                    out.push(char::from_u32(point).unwrap_or(char::REPLACEMENT_CHARACTER));
                    i += 2;
                    continue;
                }
                _ => {
                    if noquiet {
                        warn!(
                            offset = i * 2,
                            unit = format_args!("{:#06x}", unit),
                            "Invalid UTF16 surrogate pair, truncating"
                        );
                    }
                    break;
                }
            }
        }
        // A lone trail surrogate has no scalar value.
        out.push(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_byte() {
        assert_eq!(TextEncoding::try_from(0).unwrap(), TextEncoding::Latin1);
        assert_eq!(TextEncoding::try_from(3).unwrap(), TextEncoding::Utf8);
        assert!(matches!(
            TextEncoding::try_from(4),
            Err(MetadataError::UnknownEncoding(4))
        ));
    }

    #[test]
    fn test_latin1_expands_high_bytes() {
        let text = decode(TextEncoding::Latin1, &[b'c', b'a', b'f', 0xE9], true);
        assert_eq!(text, "café");
        assert_eq!(&text.as_bytes()[3..], &[0xC3, 0xA9]);
    }

    #[test]
    fn test_utf16_byte_orders() {
        let le = decode(TextEncoding::Utf16Bom, &[0xFF, 0xFE, b'h', 0, b'i', 0], true);
        assert_eq!(le, "hi");

        let be = decode(TextEncoding::Utf16Bom, &[0xFE, 0xFF, 0, b'h', 0, b'i'], true);
        assert_eq!(be, "hi");

        let no_bom = decode(TextEncoding::Utf16Be, &[0, b'h', 0, b'i'], true);
        assert_eq!(no_bom, "hi");
    }

    #[test]
    fn test_utf16_last_bom_wins() {
        let bytes = [0xFE, 0xFF, 0xFF, 0xFE, b'o', 0, b'k', 0];
        assert_eq!(decode(TextEncoding::Utf16Bom, &bytes, true), "ok");
    }

    #[test]
    fn test_utf16_surrogate_pair() {
        let text = decode(TextEncoding::Utf16Be, &[0xD8, 0x00, 0xDC, 0x00], true);
        assert_eq!(text.as_bytes(), &[0xF0, 0x90, 0x80, 0x80]);
    }

    #[test]
    fn test_utf16_unpaired_lead_truncates() {
        let text = decode(TextEncoding::Utf16Be, &[0, b'a', 0, b'b', 0xD8, 0x00], true);
        assert_eq!(text, "ab");

        let text = decode(TextEncoding::Utf16Be, &[0, b'a', 0xD8, 0x00, 0, b'c'], false);
        assert_eq!(text, "a");
    }

    #[test]
    fn test_odd_length_is_trimmed() {
        let text = decode(TextEncoding::Utf16Be, &[0, b'x', 0], true);
        assert_eq!(text, "x");
    }

    #[test]
    fn test_leading_zero_skipped_except_utf16be() {
        assert_eq!(decode(TextEncoding::Utf8, &[0, 0, b'a'], true), "a");
        // A leading zero is the high byte of 'a' in big-endian UTF-16.
        assert_eq!(decode(TextEncoding::Utf16Be, &[0, b'a'], true), "a");
    }

    #[test]
    fn test_trailing_terminator_removed_and_separators_kept() {
        assert_eq!(decode(TextEncoding::Latin1, b"one\0two\0", true), "one\0two");
    }

    #[test]
    fn test_next_text_aligned_search() {
        assert_eq!(next_text(b"desc\0text", TextEncoding::Latin1), Some(5));
        // Terminator at the very end: nothing follows.
        assert_eq!(next_text(b"desc\0", TextEncoding::Latin1), None);
        assert_eq!(next_text(b"desc", TextEncoding::Latin1), None);

        // 0x61 0x00 0x00 0x62: the zero pair straddles units and is not a terminator.
        let misaligned = [0x61, 0x00, 0x00, 0x62, 0x00, 0x00, 0x00, 0x63];
        assert_eq!(next_text(&misaligned, TextEncoding::Utf16Be), Some(6));

        // Single zero byte left over in a wide encoding.
        assert_eq!(next_text(&[0x00, 0x61, 0x00], TextEncoding::Utf16Be), None);
    }
}
