// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Ability Profiles
//!
//! Static, per-UAV-type maneuver limits. Loaded once at process start from a
//! JSON file shaped `{"<uav_type>": {"max_bearing": <degrees>}}`, read-only
//! thereafter. Only the heading-change strategy consults it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Maneuver limits for one UAV type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityProfile {
    /// Maximum heading-change authority in degrees.
    #[serde(default)]
    pub max_bearing: f64,
}

/// Read-only table of ability profiles keyed by UAV type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityTable(HashMap<String, AbilityProfile>);

impl AbilityTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ability table {}", path.display()))?;
        let table = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse ability table {}", path.display()))?;
        Ok(table)
    }

    /// The configured heading authority for a type, if any. A missing or
    /// non-positive value means the type carries no configured authority and
    /// the caller falls back to its default ceiling.
    pub fn max_bearing_for(&self, uav_type: &str) -> Option<f64> {
        self.0
            .get(uav_type)
            .map(|p| p.max_bearing)
            .filter(|b| *b > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_profiles_from_a_json_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"quad": {{"max_bearing": 20.0}}}}"#).unwrap();
        let table = AbilityTable::load(file.path()).unwrap();
        assert_eq!(table.max_bearing_for("quad"), Some(20.0));
    }

    #[test]
    fn load_fails_on_a_missing_file() {
        assert!(AbilityTable::load("/nonexistent/abilities.json").is_err());
    }

    #[test]
    fn parses_profile_json_and_falls_back_on_unknown_types() {
        let table: AbilityTable =
            serde_json::from_str(r#"{"quad": {"max_bearing": 30.0}, "fixed_wing": {"max_bearing": 0.0}}"#)
                .unwrap();
        assert_eq!(table.max_bearing_for("quad"), Some(30.0));
        // Zero authority is treated as unconfigured.
        assert_eq!(table.max_bearing_for("fixed_wing"), None);
        assert_eq!(table.max_bearing_for("blimp"), None);
    }
}
