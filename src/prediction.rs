//! Emission prediction with a colour label
//!
//! [`PredictionContext`] is loaded once at startup and shared read-only by
//! every request.

use crate::error::Result;
use crate::model::LinearModel;
use crate::percentile::{Colour, ReferenceDistribution};
use serde::Serialize;
use std::path::Path;

/// A predicted emission and where it falls in the reference distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub value: f64,
    pub percentile: f64,
    pub colour: Colour,
}

/// Model plus reference distribution
#[derive(Debug, Clone)]
pub struct PredictionContext {
    model: LinearModel,
    reference: ReferenceDistribution,
}

impl PredictionContext {
    pub fn new(model: LinearModel, reference: ReferenceDistribution) -> Self {
        Self { model, reference }
    }

    /// Load the `.apr` model bundle and the reference distribution
    pub fn load(model_path: impl AsRef<Path>, reference_path: impl AsRef<Path>) -> Result<Self> {
        let model = LinearModel::load(model_path)?;
        let reference = ReferenceDistribution::from_file(reference_path.as_ref())?;
        tracing::info!(
            "Loaded {} reference emissions from {}",
            reference.len(),
            reference_path.as_ref().display()
        );
        Ok(Self::new(model, reference))
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn reference(&self) -> &ReferenceDistribution {
        &self.reference
    }

    /// Predict the emission of an auto-instrumented run
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnknownDomain`] when `domain` was not seen at training
    /// time.
    pub fn predict(&self, datasets_size: f64, domain: &str) -> Result<Prediction> {
        let features = self.model.feature_vector(datasets_size, domain)?;
        let value = self.model.predict(&features);
        let percentile = self.reference.percentile_rank(value);
        let colour = Colour::from_percentile(percentile);

        tracing::debug!(
            "Predicted {} for size {} in '{}' (percentile {:.1}, {})",
            value,
            datasets_size,
            domain,
            percentile,
            colour
        );

        Ok(Prediction {
            value,
            percentile,
            colour,
        })
    }
}
