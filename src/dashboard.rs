//! Immutable bundle of every artifact the dashboard serves from

use crate::aggregate::{self, ChurnDistribution, GroupRate, SummaryMetrics};
use crate::config::DashboardConfig;
use crate::data::{self, RecordSet};
use crate::importance::{self, FeatureImportance};
use crate::model::{self, FeatureVector, ModelHandle, PredictionResult};

/// Loaded once at startup and only read afterwards
#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    records: RecordSet,
    importance: FeatureImportance,
    model: ModelHandle,
}

impl Dashboard {
    /// Load all artifacts named by `config`
    ///
    /// Any failure here is fatal: the dashboard never starts half-loaded.
    pub fn load(config: DashboardConfig) -> crate::Result<Self> {
        config.validate()?;
        let records = data::load_records(&config.data_path)?;
        let importance = importance::load_importance(&config.importance_path)?;
        let model = model::load_model(&config.model_path)?.with_threshold(config.threshold)?;
        Ok(Self::new(config, records, importance, model))
    }

    /// Assemble from artifacts that are already loaded
    pub fn new(
        config: DashboardConfig,
        records: RecordSet,
        importance: FeatureImportance,
        model: ModelHandle,
    ) -> Self {
        // the two artifacts are versioned independently; only warn
        let unknown: Vec<&str> = importance
            .iter()
            .map(|(name, _)| name)
            .filter(|name| !model.feature_names().iter().any(|f| f.as_str() == *name))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(?unknown, "feature importance lists features the model does not use");
        }

        Self {
            config,
            records,
            importance,
            model,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn importance(&self) -> &FeatureImportance {
        &self.importance
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn summary(&self) -> crate::Result<SummaryMetrics> {
        aggregate::summary(&self.records)
    }

    pub fn churn_distribution(&self) -> crate::Result<ChurnDistribution> {
        aggregate::churn_distribution(&self.records)
    }

    pub fn churn_rate_by(&self, column: &str) -> crate::Result<Vec<GroupRate>> {
        aggregate::churn_rate_by(&self.records, column)
    }

    /// The configured default inputs with `overrides` applied on top
    pub fn what_if_inputs(&self, overrides: FeatureVector) -> FeatureVector {
        let mut features = self.config.default_feature_vector();
        features.merge(overrides);
        features
    }

    /// Predict churn for the default inputs adjusted by `overrides`
    pub fn what_if(&self, overrides: FeatureVector) -> crate::Result<PredictionResult> {
        model::predict_churn(&self.model, &self.what_if_inputs(overrides))
    }
}
