//! Probability model capability consumed by the signal engine.
//!
//! Models are trained elsewhere and injected into the engine at construction.
//! Inference must be stateless so one instance can serve repeated calls and be
//! shared across independent simulator runs.

use super::bar::Bar;
use super::error::{ModelError, TraderError};

pub trait ProbabilityModel: Send + Sync {
    /// Ordered feature names the model was fitted on.
    fn feature_columns(&self) -> &[String];

    /// Probability in [0, 1] that a long entry on this row is profitable.
    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError>;
}

/// Ordered `(column, value)` pairs handed to a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    values: Vec<(String, f64)>,
}

impl FeatureRow {
    /// Collect the listed columns that `bar` carries, keeping their order.
    pub fn from_bar<S: AsRef<str>>(bar: &Bar, wanted: &[S]) -> Self {
        let values = wanted
            .iter()
            .filter_map(|c| {
                let name = c.as_ref();
                bar.value(name).map(|v| (name.to_string(), v))
            })
            .collect();
        FeatureRow { values }
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

/// Logistic regression over named features:
/// p = 1 / (1 + exp(-(intercept + Σ w_i · x_i)))
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    columns: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(columns: Vec<String>, weights: Vec<f64>, intercept: f64) -> Result<Self, TraderError> {
        if columns.is_empty() {
            return Err(TraderError::Model {
                reason: "model declares no feature columns".into(),
            });
        }
        if columns.len() != weights.len() {
            return Err(TraderError::Model {
                reason: format!(
                    "{} feature columns but {} weights",
                    columns.len(),
                    weights.len()
                ),
            });
        }
        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(TraderError::Model {
                reason: "weights and intercept must be finite".into(),
            });
        }
        Ok(LogisticModel {
            columns,
            weights,
            intercept,
        })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl ProbabilityModel for LogisticModel {
    fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let mut z = self.intercept;
        for (column, weight) in self.columns.iter().zip(&self.weights) {
            let x = row.get(column).ok_or_else(|| ModelError::MissingFeature {
                column: column.clone(),
            })?;
            z += weight * x;
        }
        if !z.is_finite() {
            return Err(ModelError::Predict {
                reason: "non-finite linear score".into(),
            });
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}
