//! Dashboard configuration loaded from TOML

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{SUPPORT_CALLS, TENURE, TOTAL_SPEND, USAGE_FREQUENCY};
use crate::error::DashboardError;
use crate::model::{FeatureVector, DEFAULT_THRESHOLD};

/// Artifact locations, decision threshold and chart choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// Customer dataset CSV
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Feature importance CSV
    #[serde(default = "default_importance_path")]
    pub importance_path: PathBuf,
    /// Serialized model JSON
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Churn label threshold applied to the model probability
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Columns to chart churn rate against
    #[serde(default = "default_group_columns")]
    pub group_columns: Vec<String>,
    /// Directory for rendered charts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Values pre-filled for what-if predictions
    #[serde(default = "default_inputs")]
    pub default_inputs: Vec<(String, f64)>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            importance_path: default_importance_path(),
            model_path: default_model_path(),
            threshold: default_threshold(),
            group_columns: default_group_columns(),
            output_dir: default_output_dir(),
            default_inputs: default_inputs(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data_with_prediction.csv")
}

fn default_importance_path() -> PathBuf {
    PathBuf::from("feature_importances.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("churn_model.json")
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_group_columns() -> Vec<String> {
    [TENURE, SUPPORT_CALLS, USAGE_FREQUENCY, TOTAL_SPEND]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("charts")
}

fn default_inputs() -> Vec<(String, f64)> {
    FeatureVector::default_inputs()
        .iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

impl DashboardConfig {
    /// Read a TOML file; absent keys fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            DashboardError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| DashboardError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DashboardError::config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if let Some((name, _)) = self.default_inputs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DashboardError::config(format!(
                "default input '{name}' must be finite"
            )));
        }
        let mut seen = HashSet::new();
        if let Some((name, _)) = self
            .default_inputs
            .iter()
            .find(|(name, _)| !seen.insert(name.as_str()))
        {
            return Err(DashboardError::config(format!(
                "default input '{name}' given more than once"
            )));
        }
        Ok(())
    }

    pub fn default_feature_vector(&self) -> FeatureVector {
        self.default_inputs
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();

        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.group_columns.len(), 4);
        assert_eq!(config.default_feature_vector(), FeatureVector::default_inputs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DashboardConfig::from_toml(
            r#"
            threshold = 0.35
            group_columns = ["Tenure", "Age"]
            "#,
        )
        .unwrap();

        assert_eq!(config.threshold, 0.35);
        assert_eq!(config.group_columns, vec!["Tenure", "Age"]);
        assert_eq!(config.model_path, PathBuf::from("churn_model.json"));
    }

    #[test]
    fn test_default_inputs_from_toml() {
        let config = DashboardConfig::from_toml(
            r#"default_inputs = [["Tenure", 10.0], ["Support Calls", 2.0]]"#,
        )
        .unwrap();

        let features = config.default_feature_vector();
        assert_eq!(features.len(), 2);
        assert_eq!(features.get("Support Calls"), Some(2.0));
    }

    #[test]
    fn test_duplicate_default_input_rejected() {
        let err = DashboardConfig::from_toml(
            r#"default_inputs = [["Tenure", 10.0], ["Tenure", 20.0]]"#,
        )
        .unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = DashboardConfig::from_toml("threshold = 2.0").unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(DashboardConfig::from_toml("treshold = 0.4").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_path = \"customers.csv\"").unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.data_path, PathBuf::from("customers.csv"));

        assert!(DashboardConfig::from_file("no/such/config.toml").is_err());
    }
}
