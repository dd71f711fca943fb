//! Configuration options for iso-surface extraction.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IsoError, Result};

/// Tunable parameters for loading and triangulating a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Number of histogram buckets per axis.
    pub interval: u32,

    /// Upper clamp for gradient lengths before decibel compression.
    pub max_gradient: f32,

    /// Iso-value used by the next triangulation pass.
    pub iso_value: f32,

    /// Whether to run histogram equalization right after loading.
    pub equalize_on_load: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: 16,
            max_gradient: 256.0,
            iso_value: 80.0,
            equalize_on_load: false,
        }
    }
}

impl Options {
    /// Parses options from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the options for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(IsoError::InvalidInterval(self.interval));
        }
        // Lengths are clamped to [1, max_gradient] before log2.
        if self.max_gradient.is_nan() || self.max_gradient < 1.0 {
            return Err(IsoError::InvalidOptions(format!(
                "max_gradient must be >= 1, got {}",
                self.max_gradient
            )));
        }
        if !self.iso_value.is_finite() {
            return Err(IsoError::InvalidOptions(format!(
                "iso_value must be finite, got {}",
                self.iso_value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = Options::default();
        assert_eq!(options.interval, 16);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = Options::from_json_str(r#"{ "interval": 32 }"#).unwrap();
        assert_eq!(options.interval, 32);
        assert_eq!(options.max_gradient, 256.0);
        assert!(!options.equalize_on_load);
    }

    #[test]
    fn test_json_roundtrip() {
        let options = Options {
            interval: 8,
            max_gradient: 64.0,
            iso_value: 12.5,
            equalize_on_load: true,
        };
        let json = options.to_json_string().unwrap();
        assert_eq!(Options::from_json_str(&json).unwrap(), options);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Options::from_json_str(r#"{ "interval": 0 }"#).unwrap_err();
        assert!(matches!(err, IsoError::InvalidInterval(0)));
    }

    #[test]
    fn test_rejects_small_max_gradient() {
        let options = Options {
            max_gradient: 0.5,
            ..Options::default()
        };
        assert!(matches!(
            options.validate(),
            Err(IsoError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Options::from_json_str("{ interval: "),
            Err(IsoError::JsonError(_))
        ));
    }
}
