//! churnboard: a Rust CLI dashboard for customer churn analytics
//!
//! This library loads a customer dataset, a feature importance table and a
//! pre-trained churn classifier, derives summary metrics and churn-rate
//! series from the data, and runs what-if churn predictions.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod importance;
pub mod model;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{churn_distribution, churn_rate_by, summary, ChurnDistribution, GroupRate, SummaryMetrics};
pub use cli::Args;
pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use data::{load_records, CustomerRecord, RecordSet};
pub use error::DashboardError;
pub use importance::{load_importance, FeatureImportance};
pub use model::{
    load_model, predict_churn, FeatureVector, ModelArtifact, ModelHandle, PredictionResult,
    Predictor,
};

/// Common result type used throughout the library
pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
