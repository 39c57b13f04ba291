//! Pre-trained churn classifier loading and single-record inference

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::data::{CUSTOMER_ID, GENDER_MALE, PAYMENT_DELAY, SUPPORT_CALLS, TENURE, USAGE_FREQUENCY};
use crate::error::DashboardError;

/// Decision threshold applied to the churn probability unless configured
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A trained binary classifier seen only through its probability output
///
/// Implementations must accept a row whose values are ordered exactly like
/// `feature_names`; the gateway guarantees this before calling.
pub trait Predictor: fmt::Debug + Send + Sync {
    fn feature_names(&self) -> &[String];

    /// `[P(retained), P(churned)]` for one input row
    fn predict_proba(&self, row: ArrayView1<f64>) -> [f64; 2];

    /// Structural self-check run before the predictor is ever called
    fn validate(&self) -> crate::Result<()> {
        Ok(())
    }
}

/// Logistic regression: `p = sigmoid(w . x + b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Predictor for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: ArrayView1<f64>) -> [f64; 2] {
        let weights = ArrayView1::from(&self.coefficients[..]);
        let z = weights.dot(&row) + self.intercept;
        let churn = 1.0 / (1.0 + (-z).exp());
        [1.0 - churn, churn]
    }

    fn validate(&self) -> crate::Result<()> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(DashboardError::model_load(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(DashboardError::model_load("logistic weights must be finite"));
        }
        Ok(())
    }
}

/// Node of a flattened decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `x[feature] <= threshold` go `left`, the rest go `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Churn probability of the training rows that reached this leaf
    Leaf { probability: f64 },
}

/// Decision tree stored in pre-order: children always follow their parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn churn_probability(&self, row: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => index = if row[feature] <= threshold { left } else { right },
                TreeNode::Leaf { probability } => return probability,
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!("node {index} splits on unknown feature {feature}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {index} has a NaN threshold"));
                    }
                    // forward-only links rule out cycles
                    for child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {index} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { probability } => {
                    if !(0.0..=1.0).contains(&probability) {
                        return Err(format!(
                            "leaf {index} probability {probability} is outside [0, 1]"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest: mean churn probability over all trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl Predictor for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: ArrayView1<f64>) -> [f64; 2] {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.churn_probability(row.view()))
            .sum();
        let churn = total / self.trees.len() as f64;
        [1.0 - churn, churn]
    }

    fn validate(&self) -> crate::Result<()> {
        if self.trees.is_empty() {
            return Err(DashboardError::model_load("forest has no trees"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|reason| DashboardError::model_load(format!("tree {i}: {reason}")))?;
        }
        Ok(())
    }
}

/// Serialized model artifact, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticModel),
    Forest(ForestModel),
}

impl ModelArtifact {
    /// Check the structure so inference can never index out of bounds
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            ModelArtifact::Logistic(model) => model.validate(),
            ModelArtifact::Forest(model) => model.validate(),
        }
    }

    pub fn into_predictor(self) -> Box<dyn Predictor> {
        match self {
            ModelArtifact::Logistic(model) => Box::new(model),
            ModelArtifact::Forest(model) => Box::new(model),
        }
    }
}

/// Named numeric inputs for one prediction request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs pre-filled on the dashboard's prediction form
    pub fn default_inputs() -> Self {
        [
            (PAYMENT_DELAY, 27.0),
            (CUSTOMER_ID, 1.0),
            (TENURE, 25.0),
            (USAGE_FREQUENCY, 14.0),
            (GENDER_MALE, 0.0),
            (SUPPORT_CALLS, 4.0),
        ]
        .into_iter()
        .collect()
    }

    /// Parse `name=value` pairs separated by commas
    ///
    /// Example: `"Tenure=25, Support Calls=4"`
    pub fn parse(input: &str) -> crate::Result<Self> {
        let mut vector = Self::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                DashboardError::invalid_input(format!("expected 'name=value', got '{part}'"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(DashboardError::invalid_input(format!(
                    "missing feature name in '{part}'"
                )));
            }
            let value: f64 = value.trim().parse().map_err(|_| {
                DashboardError::invalid_input(format!("invalid value for '{name}': {}", value.trim()))
            })?;
            if !value.is_finite() {
                return Err(DashboardError::invalid_input(format!(
                    "value for '{name}' must be finite"
                )));
            }
            if vector.insert(name, value).is_some() {
                return Err(DashboardError::invalid_input(format!(
                    "feature '{name}' given more than once"
                )));
            }
        }
        Ok(vector)
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    /// Overwrite or add every value from `other`
    pub fn merge(&mut self, other: FeatureVector) {
        self.values.extend(other.values);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Values ordered like `expected`
    ///
    /// Fails with `SchemaMismatch` if the key sets differ and with
    /// `InvalidInput` if any value is NaN or infinite.
    fn ordered_row(&self, expected: &[String]) -> crate::Result<Array1<f64>> {
        let expected_names: HashSet<&str> = expected.iter().map(String::as_str).collect();
        let missing: Vec<String> = expected
            .iter()
            .filter(|name| !self.values.contains_key(name.as_str()))
            .cloned()
            .collect();
        let unexpected: Vec<String> = self
            .values
            .keys()
            .filter(|name| !expected_names.contains(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(DashboardError::SchemaMismatch {
                missing,
                unexpected,
            });
        }
        if let Some((name, value)) = self.iter().find(|(_, value)| !value.is_finite()) {
            return Err(DashboardError::invalid_input(format!(
                "value for '{name}' must be finite, got {value}"
            )));
        }
        Ok(expected
            .iter()
            .map(|name| self.values[name.as_str()])
            .collect())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// Outcome of one churn prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    /// Churn probability in [0, 1]
    pub probability: f64,
    pub threshold: f64,
    /// `probability > threshold`
    pub churn: bool,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        if self.churn {
            "Yes"
        } else {
            "No"
        }
    }
}

/// Immutable handle to a loaded model plus its decision threshold
#[derive(Debug)]
pub struct ModelHandle {
    predictor: Box<dyn Predictor>,
    threshold: f64,
}

impl ModelHandle {
    /// Wrap any predictor
    ///
    /// Feature names must be non-empty and unique, and the predictor must
    /// pass its own structural `validate`.
    pub fn new(predictor: Box<dyn Predictor>) -> crate::Result<Self> {
        let names = predictor.feature_names();
        if names.is_empty() {
            return Err(DashboardError::model_load("model declares no features"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(DashboardError::model_load(format!(
                "feature '{dup}' declared more than once"
            )));
        }
        predictor.validate()?;

        Ok(Self {
            predictor,
            threshold: DEFAULT_THRESHOLD,
        })
    }

    /// Replace the decision threshold; it must lie in [0, 1]
    pub fn with_threshold(mut self, threshold: f64) -> crate::Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DashboardError::config(format!(
                "threshold must be within [0, 1], got {threshold}"
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn feature_names(&self) -> &[String] {
        self.predictor.feature_names()
    }

    /// Predict churn for one feature vector
    ///
    /// The vector's keys must match the model's features exactly.
    pub fn predict(&self, features: &FeatureVector) -> crate::Result<PredictionResult> {
        let row = features.ordered_row(self.feature_names())?;
        let [_, churn] = self.predictor.predict_proba(row.view());
        if !churn.is_finite() {
            return Err(DashboardError::prediction(format!(
                "model returned churn probability {churn}"
            )));
        }
        let probability = churn.clamp(0.0, 1.0);

        Ok(PredictionResult {
            probability,
            threshold: self.threshold,
            churn: probability > self.threshold,
        })
    }
}

/// Load a JSON model artifact
///
/// # Arguments
/// * `path` - Path to the serialized model
///
/// # Returns
/// * `ModelHandle` using `DEFAULT_THRESHOLD`, or `ModelLoad` on any failure
pub fn load_model(path: impl AsRef<Path>) -> crate::Result<ModelHandle> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        DashboardError::model_load(format!("failed to read {}: {e}", path.display()))
    })?;
    let artifact: ModelArtifact = serde_json::from_str(&contents).map_err(|e| {
        DashboardError::model_load(format!("failed to parse {}: {e}", path.display()))
    })?;
    let handle = ModelHandle::new(artifact.into_predictor())?;
    tracing::info!(
        path = %path.display(),
        features = handle.feature_names().len(),
        "loaded churn model"
    );
    Ok(handle)
}

/// Predict churn for a feature vector with a loaded model
pub fn predict_churn(model: &ModelHandle, features: &FeatureVector) -> crate::Result<PredictionResult> {
    let result = model.predict(features)?;
    tracing::debug!(
        probability = result.probability,
        churn = result.churn,
        "churn prediction"
    );
    Ok(result)
}
