//! Parse options.
//!
//! Options are a plain value handed to every operation; nothing here is
//! global. Both toggles default to enabled.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Toggles that gate debug-directory processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Process the debug directory at all. When false every lookup reports
    /// absence without touching the image.
    pub debug_support: bool,
    /// Accept TE images. Also enables stripped-header compensation of raw
    /// file offsets, for every image format.
    pub allow_te: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            debug_support: true,
            allow_te: true,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with debug-directory processing switched off.
    pub fn without_debug_support() -> Self {
        Self {
            debug_support: false,
            ..Self::default()
        }
    }

    /// Options that reject TE images.
    pub fn prohibit_te() -> Self {
        Self {
            allow_te: false,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert!(options.debug_support);
        assert!(options.allow_te);
        assert_eq!(options, ParseOptions::new());
    }

    #[test]
    fn test_presets() {
        assert!(!ParseOptions::without_debug_support().debug_support);
        assert!(ParseOptions::without_debug_support().allow_te);
        assert!(!ParseOptions::prohibit_te().allow_te);
        assert!(ParseOptions::prohibit_te().debug_support);
    }

    #[test]
    fn test_json_partial_document() {
        let options = ParseOptions::from_json(r#"{"allow_te": false}"#).unwrap();
        assert!(options.debug_support);
        assert!(!options.allow_te);

        let options = ParseOptions::from_json("{}").unwrap();
        assert_eq!(options, ParseOptions::default());
    }

    #[test]
    fn test_json_serialization() {
        let json = ParseOptions::prohibit_te().to_json().unwrap();
        assert!(json.contains("\"allow_te\":false"));
        assert!(json.contains("\"debug_support\":true"));
    }

    #[test]
    fn test_json_invalid() {
        let err = ParseOptions::from_json(r#"{"debug_support": "yes"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
