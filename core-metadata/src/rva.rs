//! # Replay Gain
//!
//! Relative volume adjustment found in a tag. There are two modes, track
//! ("mix") and album, and each keeps the priority of the source that last set
//! it so that a weaker source cannot override a stronger one.

use serde::{Deserialize, Serialize};

/// Which gain a value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainMode {
    Mix,
    Album,
}

impl GainMode {
    /// Mode selected by a comment description such as `RVA_ALBUM`.
    pub fn from_comment_description(description: &str) -> Option<Self> {
        const MIX: [&str; 4] = ["rva", "rva_mix", "rva_track", "rva_radio"];
        const ALBUM: [&str; 3] = ["rva_album", "rva_audiophile", "rva_user"];

        if MIX.iter().any(|token| description.eq_ignore_ascii_case(token)) {
            Some(GainMode::Mix)
        } else if ALBUM.iter().any(|token| description.eq_ignore_ascii_case(token)) {
            Some(GainMode::Album)
        } else {
            None
        }
    }

    /// Mode selected by an RVA2 identification string.
    pub fn from_rva2_identification(identification: &[u8]) -> Self {
        const ALBUM: [&[u8]; 3] = [b"album", b"audiophile", b"user"];

        let is_album = ALBUM.iter().any(|prefix| {
            identification.len() >= prefix.len()
                && identification[..prefix.len()].eq_ignore_ascii_case(prefix)
        });
        if is_album {
            GainMode::Album
        } else {
            GainMode::Mix
        }
    }
}

/// Where a gain value came from, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainSource {
    /// LAME/Info header of the first frame, applied by the decoder.
    InfoTag,
    Comment,
    Extra,
    Rva2,
}

/// Gain state of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GainSlot {
    /// Adjustment in dB.
    pub gain: f32,
    pub peak: f32,
    /// Source that last set this slot, `None` while untouched.
    pub level: Option<GainSource>,
}

/// Track and album gain of the current tag.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplayGain {
    mix: GainSlot,
    album: GainSlot,
}

impl ReplayGain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mode: GainMode) -> &GainSlot {
        match mode {
            GainMode::Mix => &self.mix,
            GainMode::Album => &self.album,
        }
    }

    fn get_mut(&mut self, mode: GainMode) -> &mut GainSlot {
        match mode {
            GainMode::Mix => &mut self.mix,
            GainMode::Album => &mut self.album,
        }
    }

    /// Whether `source` may write `mode` given what already set it.
    pub fn accepts(&self, mode: GainMode, source: GainSource) -> bool {
        self.get(mode).level.map_or(true, |level| level <= source)
    }

    /// Store gain and/or peak from `source`; returns false when rejected.
    pub fn update(
        &mut self,
        mode: GainMode,
        source: GainSource,
        gain: Option<f32>,
        peak: Option<f32>,
    ) -> bool {
        if !self.accepts(mode, source) {
            return false;
        }
        let slot = self.get_mut(mode);
        if let Some(gain) = gain {
            slot.gain = gain;
        }
        if let Some(peak) = peak {
            slot.peak = peak;
        }
        slot.level = Some(source);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Parse the longest numeric prefix of `text`, `0.0` when there is none.
///
/// Accepts leading whitespace, an optional sign, digits with an optional
/// fraction and an optional exponent, so `"-6.5 dB"` yields `-6.5`.
pub fn parse_float(text: &str) -> f32 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return 0.0;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f32>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_description_modes() {
        assert_eq!(GainMode::from_comment_description("RVA"), Some(GainMode::Mix));
        assert_eq!(GainMode::from_comment_description("rva_radio"), Some(GainMode::Mix));
        assert_eq!(GainMode::from_comment_description("Rva_Album"), Some(GainMode::Album));
        assert_eq!(GainMode::from_comment_description("rva_user"), Some(GainMode::Album));
        assert_eq!(GainMode::from_comment_description("rva_other"), None);
        assert_eq!(GainMode::from_comment_description(""), None);
    }

    #[test]
    fn test_rva2_identification_modes() {
        assert_eq!(GainMode::from_rva2_identification(b"Album gain"), GainMode::Album);
        assert_eq!(GainMode::from_rva2_identification(b"audiophile"), GainMode::Album);
        assert_eq!(GainMode::from_rva2_identification(b"USER"), GainMode::Album);
        assert_eq!(GainMode::from_rva2_identification(b"track"), GainMode::Mix);
        assert_eq!(GainMode::from_rva2_identification(b"alb"), GainMode::Mix);
    }

    #[test]
    fn test_priority_ordering() {
        let mut rg = ReplayGain::new();
        assert!(rg.update(GainMode::Mix, GainSource::Extra, Some(-4.0), None));
        assert!(!rg.update(GainMode::Mix, GainSource::Comment, Some(-1.0), Some(0.0)));
        assert_eq!(rg.get(GainMode::Mix).gain, -4.0);

        // Equal priority overwrites.
        assert!(rg.update(GainMode::Mix, GainSource::Extra, None, Some(0.9)));
        assert_eq!(rg.get(GainMode::Mix).peak, 0.9);
        assert_eq!(rg.get(GainMode::Mix).gain, -4.0);

        assert!(rg.update(GainMode::Mix, GainSource::Rva2, Some(2.0), Some(0.0)));
        assert_eq!(rg.get(GainMode::Mix).level, Some(GainSource::Rva2));
        assert_eq!(rg.get(GainMode::Album).level, None);

        rg.reset();
        assert_eq!(rg, ReplayGain::default());
    }

    #[test]
    fn test_parse_float_is_lenient() {
        assert_eq!(parse_float("-3.5"), -3.5);
        assert_eq!(parse_float("  +1.25 dB"), 1.25);
        assert_eq!(parse_float("-6.5dB"), -6.5);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("7."), 7.0);
        assert_eq!(parse_float("1e2x"), 100.0);
        assert_eq!(parse_float("2e"), 2.0);
        assert_eq!(parse_float("dB"), 0.0);
        assert_eq!(parse_float("-"), 0.0);
        assert_eq!(parse_float(""), 0.0);
    }
}
