//! # PCM Formats
//!
//! Sample encodings with their historical bit values, a bitset of encodings a
//! driver supports, and the format negotiated by `start`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// PCM sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    S16,
    U16,
    U8,
    S8,
    Ulaw8,
    Alaw8,
    S32,
    U32,
    S24,
    U24,
    F32,
    F64,
}

impl Encoding {
    pub const ALL: [Encoding; 12] = [
        Encoding::S16,
        Encoding::U16,
        Encoding::U8,
        Encoding::S8,
        Encoding::Ulaw8,
        Encoding::Alaw8,
        Encoding::S32,
        Encoding::U32,
        Encoding::S24,
        Encoding::U24,
        Encoding::F32,
        Encoding::F64,
    ];

    pub fn bits(self) -> u32 {
        match self {
            Encoding::S16 => 0xD0,
            Encoding::U16 => 0x60,
            Encoding::U8 => 0x01,
            Encoding::S8 => 0x82,
            Encoding::Ulaw8 => 0x04,
            Encoding::Alaw8 => 0x08,
            Encoding::S32 => 0x1180,
            Encoding::U32 => 0x2100,
            Encoding::S24 => 0x5080,
            Encoding::U24 => 0x6000,
            Encoding::F32 => 0x200,
            Encoding::F64 => 0x400,
        }
    }

    /// Bytes per sample of one channel.
    pub fn sample_size(self) -> usize {
        match self {
            Encoding::U8 | Encoding::S8 | Encoding::Ulaw8 | Encoding::Alaw8 => 1,
            Encoding::S16 | Encoding::U16 => 2,
            Encoding::S24 | Encoding::U24 => 3,
            Encoding::S32 | Encoding::U32 | Encoding::F32 => 4,
            Encoding::F64 => 8,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|enc| enc.bits() == bits)
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::S16 => "s16",
            Encoding::U16 => "u16",
            Encoding::U8 => "u8",
            Encoding::S8 => "s8",
            Encoding::Ulaw8 => "ulaw",
            Encoding::Alaw8 => "alaw",
            Encoding::S32 => "s32",
            Encoding::U32 => "u32",
            Encoding::S24 => "s24",
            Encoding::U24 => "u24",
            Encoding::F32 => "f32",
            Encoding::F64 => "f64",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of encodings, as reported by a driver.
///
/// Encoding bit patterns overlap (S16 shares bits with S32), so membership
/// means every bit of the encoding is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EncodingMask(pub u32);

impl EncodingMask {
    pub const NONE: EncodingMask = EncodingMask(0);
    pub const ANY: EncodingMask = EncodingMask(
        0xD0 | 0x60 | 0x01 | 0x82 | 0x04 | 0x08 | 0x1180 | 0x2100 | 0x5080 | 0x6000 | 0x200 | 0x400,
    );

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, encoding: Encoding) -> bool {
        self.0 & encoding.bits() == encoding.bits()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Encodings fully covered by this mask.
    pub fn encodings(self) -> impl Iterator<Item = Encoding> {
        Encoding::ALL.into_iter().filter(move |enc| self.contains(*enc))
    }
}

impl From<Encoding> for EncodingMask {
    fn from(encoding: Encoding) -> Self {
        EncodingMask(encoding.bits())
    }
}

impl BitOr<Encoding> for EncodingMask {
    type Output = EncodingMask;

    fn bitor(self, rhs: Encoding) -> EncodingMask {
        EncodingMask(self.0 | rhs.bits())
    }
}

impl BitOr for EncodingMask {
    type Output = EncodingMask;

    fn bitor(self, rhs: EncodingMask) -> EncodingMask {
        EncodingMask(self.0 | rhs.0)
    }
}

impl BitOrAssign<Encoding> for EncodingMask {
    fn bitor_assign(&mut self, rhs: Encoding) {
        self.0 |= rhs.bits();
    }
}

/// Format negotiated by `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub rate: u32,
    pub channels: u16,
    pub encoding: Encoding,
    /// Bytes per frame: sample size times channels.
    pub framesize: usize,
}

impl OutputFormat {
    pub fn new(encoding: Encoding, channels: u16, rate: u32) -> Self {
        Self {
            rate,
            channels,
            encoding,
            framesize: encoding.sample_size() * channels as usize,
        }
    }

    /// Bytes for `millis` milliseconds of audio, whole frames only.
    pub fn bytes_for_millis(&self, millis: u64) -> usize {
        let frames = self.rate as u64 * millis / 1000;
        frames as usize * self.framesize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_sizes() {
        assert_eq!(Encoding::U8.sample_size(), 1);
        assert_eq!(Encoding::Alaw8.sample_size(), 1);
        assert_eq!(Encoding::S16.sample_size(), 2);
        assert_eq!(Encoding::U24.sample_size(), 3);
        assert_eq!(Encoding::F32.sample_size(), 4);
        assert_eq!(Encoding::S32.sample_size(), 4);
        assert_eq!(Encoding::F64.sample_size(), 8);
    }

    #[test]
    fn test_bits_are_unique() {
        for enc in Encoding::ALL {
            assert_eq!(Encoding::from_bits(enc.bits()), Some(enc));
        }
        assert_eq!(Encoding::from_bits(0x10), None);
    }

    #[test]
    fn test_mask_membership_needs_all_bits() {
        let s16_only = EncodingMask::from(Encoding::S16);
        assert!(s16_only.contains(Encoding::S16));
        // S32 shares the signed/16 bits but needs 0x1000 too.
        assert!(!s16_only.contains(Encoding::S32));

        let mask = EncodingMask::NONE | Encoding::S16 | Encoding::F32;
        assert_eq!(
            mask.encodings().collect::<Vec<_>>(),
            vec![Encoding::S16, Encoding::F32]
        );
    }

    #[test]
    fn test_any_covers_everything() {
        for enc in Encoding::ALL {
            assert!(EncodingMask::ANY.contains(enc), "{enc}");
        }
        assert!(EncodingMask::NONE.is_empty());
    }

    #[test]
    fn test_output_format_framesize() {
        let format = OutputFormat::new(Encoding::S16, 2, 44100);
        assert_eq!(format.framesize, 4);
        assert_eq!(format.bytes_for_millis(1000), 44100 * 4);
        assert_eq!(OutputFormat::new(Encoding::S24, 6, 48000).framesize, 18);
    }
}
