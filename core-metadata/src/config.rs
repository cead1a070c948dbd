//! # Parser Configuration
//!
//! Options consumed by the ID3v2 parser. They are passed to the parser when it
//! is constructed instead of being read from shared decoder state.

use serde::{Deserialize, Serialize};

/// ID3v2 parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Consume ID3v2 tags without interpreting any frame.
    ///
    /// Default: false.
    #[serde(default)]
    pub skip_id3v2: bool,

    /// Keep a verbatim copy of the whole tag (header, body and footer).
    ///
    /// The copy is also kept for tags that are skipped.
    ///
    /// Default: false.
    #[serde(default)]
    pub store_raw_id3: bool,

    /// Keep the undecoded bytes of every text, comment and TXXX entry next to
    /// the UTF-8 value.
    ///
    /// Default: false.
    #[serde(default)]
    pub plain_id3_text: bool,

    /// Extract APIC pictures.
    ///
    /// Default: false.
    #[serde(default)]
    pub pictures: bool,

    /// Suppress every non-fatal diagnostic.
    ///
    /// Default: false.
    #[serde(default)]
    pub quiet: bool,

    /// Verbosity of informational notes (0 = none).
    ///
    /// Default: 0.
    #[serde(default)]
    pub verbose: i32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            skip_id3v2: false,
            store_raw_id3: false,
            plain_id3_text: false,
            pictures: false,
            quiet: false,
            verbose: 0,
        }
    }
}

impl ParserConfig {
    pub fn with_skip_id3v2(mut self, skip: bool) -> Self {
        self.skip_id3v2 = skip;
        self
    }

    pub fn with_store_raw_id3(mut self, store: bool) -> Self {
        self.store_raw_id3 = store;
        self
    }

    pub fn with_plain_id3_text(mut self, plain: bool) -> Self {
        self.plain_id3_text = plain;
        self
    }

    pub fn with_pictures(mut self, pictures: bool) -> Self {
        self.pictures = pictures;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_verbose(mut self, verbose: i32) -> Self {
        self.verbose = verbose;
        self
    }

    /// Whether warnings and errors should be reported.
    pub fn noquiet(&self) -> bool {
        !self.quiet
    }

    /// Whether notes of the given verbosity should be reported.
    pub fn verbose_at(&self, level: i32) -> bool {
        !self.quiet && self.verbose >= level
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose < 0 {
            return Err("verbose must be >= 0".to_string());
        }

        if self.skip_id3v2 && (self.plain_id3_text || self.pictures) {
            return Err("plain_id3_text and pictures have no effect with skip_id3v2".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ParserConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.noquiet());
        assert!(!config.verbose_at(1));
    }

    #[test]
    fn test_builder_and_validation() {
        let config = ParserConfig::default()
            .with_store_raw_id3(true)
            .with_pictures(true)
            .with_verbose(3);
        assert!(config.validate().is_ok());
        assert!(config.verbose_at(3));
        assert!(!config.clone().with_quiet(true).verbose_at(1));

        let conflicting = config.with_skip_id3v2(true);
        assert!(conflicting.validate().is_err());

        let negative = ParserConfig::default().with_verbose(-1);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ParserConfig = serde_json::from_str(r#"{"pictures": true}"#).unwrap();
        assert!(config.pictures);
        assert!(!config.skip_id3v2);
        assert_eq!(config.verbose, 0);
    }
}
