//! Configuration for the zonal processor.

use serde::{Deserialize, Serialize};

/// Smallest field length that still leaves room for a collision suffix.
pub const MIN_FIELD_NAME_LEN: usize = 3;

/// Configuration for an aggregation run.
///
/// Built once before processing starts and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Maximum length of the output field names (dBase limit is 10).
    pub field_name_max_len: usize,

    /// Value written for a layer with no overlapping valid cell.
    pub default_value: f64,

    /// What to do when a single feature fails.
    pub failure_policy: FailurePolicy,

    /// Process features on the rayon thread pool.
    pub parallel: bool,

    /// Reject invalid (e.g. self-intersecting) feature geometries.
    pub validate_geometry: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            field_name_max_len: 10,
            default_value: 0.0,
            failure_policy: FailurePolicy::SkipFeature,
            parallel: true,
            validate_geometry: true,
        }
    }
}

impl AggregationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZONAL_FIELD_NAME_MAX_LEN") {
            if let Ok(len) = val.parse() {
                config.field_name_max_len = len;
            }
        }

        if let Ok(val) = std::env::var("ZONAL_DEFAULT_VALUE") {
            if let Ok(value) = val.parse() {
                config.default_value = value;
            }
        }

        if let Ok(val) = std::env::var("ZONAL_FAILURE_POLICY") {
            config.failure_policy = FailurePolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZONAL_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("ZONAL_VALIDATE_GEOMETRY") {
            config.validate_geometry = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.field_name_max_len < MIN_FIELD_NAME_LEN {
            return Err(format!(
                "field_name_max_len must be >= {}",
                MIN_FIELD_NAME_LEN
            ));
        }

        if !self.default_value.is_finite() {
            return Err("default_value must be finite".to_string());
        }

        Ok(())
    }
}

/// Handling of per-feature failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure, leave the feature unmodified and continue.
    #[default]
    SkipFeature,
    /// Abort the run on the first failing feature.
    FailFast,
}

impl FailurePolicy {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_fast" | "abort" => Self::FailFast,
            _ => Self::SkipFeature,
        }
    }

    /// Get the policy name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipFeature => "skip_feature",
            Self::FailFast => "fail_fast",
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AggregationConfig::default();
        assert_eq!(config.field_name_max_len, 10);
        assert_eq!(config.default_value, 0.0);
        assert_eq!(config.failure_policy, FailurePolicy::SkipFeature);
        assert!(config.parallel);
        assert!(config.validate_geometry);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AggregationConfig::default();
        assert!(config.validate().is_ok());

        config.field_name_max_len = 2;
        assert!(config.validate().is_err());

        config = AggregationConfig::default();
        config.default_value = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!(FailurePolicy::from_str("fail_fast"), FailurePolicy::FailFast);
        assert_eq!(FailurePolicy::from_str("FAIL-FAST"), FailurePolicy::FailFast);
        assert_eq!(
            FailurePolicy::from_str("skip_feature"),
            FailurePolicy::SkipFeature
        );
        assert_eq!(FailurePolicy::from_str("invalid"), FailurePolicy::SkipFeature);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: AggregationConfig =
            serde_json::from_str(r#"{"failure_policy": "fail_fast"}"#).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.field_name_max_len, 10);
    }
}
