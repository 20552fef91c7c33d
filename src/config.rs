//! Serializable search profiles.
//!
//! A [`SearchProfile`] is the plain-data form of a [`SearchConfig`]: numeric
//! limits and ranking weights instead of closures, so it can be stored as
//! JSON, edited by hand and turned into a runnable configuration.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::acceptance::Limits;
use crate::candidates::SearchSpace;
use crate::error::Result;
use crate::ranking::WeightedCost;
use crate::search::SearchConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchProfile {
    pub space: SearchSpace,
    /// log2 of the number of signatures at the target security level
    pub min_signatures_log2: f64,
    /// log2 of the number of signatures at the overuse security level
    pub overuse_min_signatures_log2: Option<f64>,
    pub limits: Limits,
    pub weights: WeightedCost,
    pub max_results: usize,
    pub threads: Option<usize>,
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            min_signatures_log2: 20.0,
            overuse_min_signatures_log2: None,
            limits: Limits::default(),
            weights: WeightedCost::default(),
            max_results: 20,
            threads: None,
        }
    }
}

impl SearchProfile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON profile from disk. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let profile = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded search profile");
        Ok(profile)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn into_config(self) -> SearchConfig {
        SearchConfig {
            space: self.space,
            min_signatures_log2: self.min_signatures_log2,
            overuse_min_signatures_log2: self.overuse_min_signatures_log2,
            acceptance: self.limits.into(),
            ranking: Arc::new(self.weights),
            max_results: self.max_results,
            threads: self.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::ranking::SigningCost;

    #[test]
    fn test_partial_profile_uses_defaults() {
        let profile = SearchProfile::from_json_str(
            r#"{
                "min_signatures_log2": 30,
                "space": { "target_security_level": 192, "lg_w": [4, 8] },
                "weights": { "signing_hashes": 1.0, "signing_cost": "cached" }
            }"#,
        )
        .unwrap();

        assert_eq!(profile.min_signatures_log2, 30.0);
        assert_eq!(profile.space.target_security_level, 192);
        assert_eq!(profile.space.lg_w, vec![4, 8]);
        assert_eq!(profile.space.h_prime, SearchSpace::default().h_prime);
        assert_eq!(profile.limits, Limits::default());
        assert_eq!(profile.weights.signing_cost, SigningCost::Cached);
        assert_eq!(profile.weights.signature_size, 0.5);
        assert_eq!(profile.max_results, 20);
    }

    #[test]
    fn test_json_round_trip() {
        let profile = SearchProfile {
            overuse_min_signatures_log2: Some(24.0),
            threads: Some(4),
            ..SearchProfile::default()
        };
        let json = profile.to_json_pretty().unwrap();
        assert_eq!(SearchProfile::from_json_str(&json).unwrap(), profile);
    }

    #[test]
    fn test_into_config() {
        let config = SearchProfile::default().into_config();
        assert_eq!(config.max_results, 20);
        assert_eq!(config.min_signatures_log2, 20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_profile() {
        assert!(matches!(
            SearchProfile::from_json_str("{ \"max_results\": \"many\" }"),
            Err(SearchError::ProfileParse(_))
        ));
        assert!(matches!(
            SearchProfile::load("/nonexistent/profile.json"),
            Err(SearchError::IoError(_))
        ));
    }
}
