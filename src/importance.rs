//! Feature importance table loading

use std::collections::HashSet;
use std::path::Path;

use polars::prelude::*;

use crate::error::DashboardError;

pub const FEATURE: &str = "Feature";
pub const IMPORTANCE: &str = "Importance";

/// Non-negative importance score per model feature
///
/// Entries keep the order of the source artifact; names are not checked
/// against any model here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureImportance {
    entries: Vec<(String, f64)>,
}

impl FeatureImportance {
    /// Build from `(name, score)` pairs, rejecting duplicates and bad scores
    pub fn from_pairs<I, S>(pairs: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (name, score) in pairs {
            let name = name.into();
            if !score.is_finite() || score < 0.0 {
                return Err(DashboardError::load(format!(
                    "importance of '{name}' must be a non-negative number, found {score}"
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(DashboardError::load(format!("duplicate feature '{name}'")));
            }
            entries.push((name, score));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, score)| *score)
    }

    /// Entries in artifact order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, score)| (name.as_str(), *score))
    }

    /// Entries by descending score; equal scores are ordered by name
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Load a `Feature,Importance` CSV
///
/// Extra columns (for example a saved row index) are ignored.
pub fn load_importance(path: impl AsRef<Path>) -> crate::Result<FeatureImportance> {
    let path = path.as_ref();
    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| DashboardError::load(format!("failed to read {}: {e}", path.display())))?;

    let importance = from_frame(&frame)?;
    tracing::info!(
        path = %path.display(),
        features = importance.len(),
        "loaded feature importance"
    );
    Ok(importance)
}

fn required_column<'a>(frame: &'a DataFrame, name: &str) -> crate::Result<&'a Series> {
    let series = frame
        .column(name)
        .map_err(|_| DashboardError::load(format!("missing required column '{name}'")))?;
    if series.null_count() > 0 {
        return Err(DashboardError::load(format!(
            "column '{name}' contains missing values"
        )));
    }
    Ok(series)
}

fn from_frame(frame: &DataFrame) -> crate::Result<FeatureImportance> {
    let names = required_column(frame, FEATURE)?
        .cast(&DataType::String)
        .map_err(|e| DashboardError::load(e.to_string()))?;
    let scores = required_column(frame, IMPORTANCE)?
        .strict_cast(&DataType::Float64)
        .map_err(|_| DashboardError::load(format!("column '{IMPORTANCE}' is not numeric")))?;

    let names = names
        .str()
        .map_err(|e| DashboardError::load(e.to_string()))?;
    let scores = scores
        .f64()
        .map_err(|e| DashboardError::load(e.to_string()))?;

    FeatureImportance::from_pairs(
        names
            .into_no_null_iter()
            .map(str::to_string)
            .zip(scores.into_no_null_iter()),
    )
}
