//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::config::DashboardConfig;
use crate::model::FeatureVector;

/// Customer churn dashboard: summary metrics, churn-rate charts and what-if predictions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the customer dataset CSV
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Path to the feature importance CSV
    #[arg(short, long)]
    pub importance: Option<PathBuf>,

    /// Path to the serialized model JSON
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// What-if prediction: comma-separated overrides of the default inputs
    /// Example: --predict "Tenure=30,Support Calls=2" (no value = defaults only)
    #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
    pub predict: Option<String>,

    /// Churn label threshold for the model probability
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Column to chart churn rate against (repeatable)
    #[arg(short, long = "group-by")]
    pub group_by: Vec<String>,

    /// Directory for the rendered charts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> crate::Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_file(path)?,
            None => DashboardConfig::default(),
        };

        if let Some(path) = &self.data {
            config.data_path = path.clone();
        }
        if let Some(path) = &self.importance {
            config.importance_path = path.clone();
        }
        if let Some(path) = &self.model {
            config.model_path = path.clone();
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if !self.group_by.is_empty() {
            config.group_columns = self.group_by.clone();
        }
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse the `--predict` overrides, `None` when no prediction was requested
    pub fn prediction_overrides(&self) -> crate::Result<Option<FeatureVector>> {
        self.predict.as_deref().map(FeatureVector::parse).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("churnboard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        let config = args.resolve_config().unwrap();

        assert_eq!(config, DashboardConfig::default());
        assert!(args.prediction_overrides().unwrap().is_none());
        assert!(!args.no_charts);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--data",
            "customers.csv",
            "-t",
            "0.7",
            "-g",
            "Tenure",
            "--group-by",
            "Age",
            "--no-charts",
        ]);
        let config = args.resolve_config().unwrap();

        assert_eq!(config.data_path, PathBuf::from("customers.csv"));
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.group_columns, vec!["Tenure", "Age"]);
        assert!(args.no_charts);
    }

    #[test]
    fn test_invalid_threshold() {
        let args = parse(&["--threshold", "1.2"]);
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_prediction_overrides() {
        let args = parse(&["--predict", "Tenure=30,Support Calls=2"]);
        let overrides = args.prediction_overrides().unwrap().unwrap();
        assert_eq!(overrides.get("Tenure"), Some(30.0));
        assert_eq!(overrides.len(), 2);

        let args = parse(&["--predict"]);
        assert!(args.prediction_overrides().unwrap().unwrap().is_empty());

        let args = parse(&["--predict", "Tenure"]);
        assert!(args.prediction_overrides().is_err());
    }
}
