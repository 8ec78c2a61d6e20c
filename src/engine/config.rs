//! Engine configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Tunables of an engine session.
///
/// Every field has a default, so a partial TOML document is enough:
///
/// ```toml
/// frame_interval_ms = 33
/// blocking_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame period of the render thread while rendering.
    pub frame_interval_ms: u64,
    /// Bound on blocking calls; `None` (or 0 in TOML) waits forever.
    #[serde(deserialize_with = "zero_is_none")]
    pub blocking_timeout_ms: Option<u64>,
    /// Finger travel in pixels before a press becomes a drag.
    pub tap_slop_px: f64,
    /// Search radius in pixels for points of interest.
    pub poi_search_radius_px: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            blocking_timeout_ms: Some(5000),
            tap_slop_px: 8.0,
            poi_search_radius_px: 20.0,
        }
    }
}

fn zero_is_none<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<u64>::deserialize(deserializer)?;
    Ok(value.filter(|ms| *ms > 0))
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        toml::from_str(document).map_err(|err| EngineError::Config(err.to_string()))
    }

    /// Frame period of the render thread.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// Bound on blocking calls.
    pub fn blocking_timeout(&self) -> Option<Duration> {
        self.blocking_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_toml_str("frame_interval_ms = 33").unwrap();
        assert_eq!(config.frame_interval(), Duration::from_millis(33));
        assert_eq!(config.blocking_timeout(), Some(Duration::from_millis(5000)));
        assert!((config.tap_slop_px - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let config = EngineConfig::from_toml_str("blocking_timeout_ms = 0").unwrap();
        assert_eq!(config.blocking_timeout(), None);
    }

    #[test]
    fn test_bad_document() {
        let err = EngineConfig::from_toml_str("frame_interval_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
