//! Persisted settings schema
//!
//! Only the logical schema lives here; storage mechanics belong to the
//! embedding application. Every field is keyed by a stable,
//! language-independent identifier. Localized display text must never be
//! persisted or compared; it is a presentation-layer mapping applied at
//! render time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chamber::ChamberKind;
use crate::params::DetectionParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

/// Last-used values restored at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub last_parameters: DetectionParameters,
    pub last_chamber: ChamberKind,
    /// Counting region key within the chamber, e.g. "four-corners".
    pub last_region: String,
    pub last_dilution: f64,
    pub last_sample_volume_ml: f64,
    pub last_directory: Option<PathBuf>,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_parameters: DetectionParameters::default(),
            last_chamber: ChamberKind::ImprovedNeubauer,
            last_region: "four-corners".to_string(),
            last_dilution: 1.0,
            last_sample_volume_ml: 1.0,
            last_directory: None,
            theme: Theme::Dark,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {:?}", path))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings file {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_uses_stable_keys() {
        let settings = Settings {
            last_chamber: ChamberKind::FuchsRosenthal,
            theme: Theme::Light,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        // Stable keys, never display strings
        assert!(json.contains("\"fuchs-rosenthal\""));
        assert!(json.contains("\"light\""));
        assert!(!json.contains("Fuchs-Rosenthal (CSF)"));

        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
