//! Error types for churnboard

use thiserror::Error;

/// Errors raised while loading artifacts, aggregating records or predicting.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Malformed or missing artifact, column or value.
    #[error("Load error: {0}")]
    Load(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// The column exists but cannot be used as requested.
    #[error("Invalid column '{column}': {reason}")]
    InvalidColumn { column: String, reason: String },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Fatal: nothing can be predicted without a model.
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Feature vector does not match model schema (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn unknown_column(name: impl Into<String>) -> Self {
        Self::UnknownColumn(name.into())
    }

    pub fn invalid_column(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidColumn {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::Prediction(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_message_lists_keys() {
        let err = DashboardError::SchemaMismatch {
            missing: vec!["Tenure".to_string()],
            unexpected: vec!["Age".to_string(), "Plan".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing: [Tenure]"));
        assert!(msg.contains("unexpected: [Age, Plan]"));
    }
}
