//! Linear regression training over the normalized emissions dataset
//!
//! Builds the design matrix (`datasets_size`, `auto`, one-hot domains with the
//! first sorted domain dropped), splits it with a seeded shuffle, fits
//! `aprender::linear_model::LinearRegression` and evaluates on the held-out
//! rows. Also derives the reference distribution used for colour labels.

use crate::error::{Error, Result};
use crate::model::{
    LinearModel, LinearModelBundle, ModelMetadata, AUTO_FEATURE, DATASETS_SIZE_FEATURE,
    DOMAIN_PREFIX,
};
use crate::percentile::ReferenceDistribution;
use crate::records::CarbonEmission;
use aprender::linear_model::LinearRegression;
use aprender::primitives::{Matrix, Vector};
use aprender::traits::Estimator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeSet;

/// Options for [`train`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    /// Share of rows held out for evaluation, in `[0, 1)`
    pub test_fraction: f64,
    /// Shuffle seed
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Held-out evaluation of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub train_samples: usize,
    pub test_samples: usize,
    pub mse: f64,
    pub r2: f64,
    /// Mean squared log error; absent when any prediction or target is negative
    pub msle: Option<f64>,
}

/// Output of [`train`]
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: LinearModel,
    pub reference: ReferenceDistribution,
    pub report: TrainingReport,
}

/// Column layout derived from the training records
#[derive(Debug, Clone, PartialEq)]
struct DesignLayout {
    feature_names: Vec<String>,
    baseline_domain: Option<String>,
    /// Encoded domains, index-aligned with the one-hot columns after `auto`
    encoded_domains: Vec<String>,
}

impl DesignLayout {
    fn from_records(records: &[&CarbonEmission]) -> Self {
        let domains: BTreeSet<&str> = records.iter().map(|r| r.domain.as_str()).collect();
        let mut domains = domains.into_iter();
        let baseline_domain = domains.next().map(str::to_string);
        let encoded_domains: Vec<String> = domains.map(str::to_string).collect();

        let mut feature_names = vec![DATASETS_SIZE_FEATURE.to_string(), AUTO_FEATURE.to_string()];
        feature_names.extend(encoded_domains.iter().map(|d| format!("{}{}", DOMAIN_PREFIX, d)));

        Self {
            feature_names,
            baseline_domain,
            encoded_domains,
        }
    }

    fn width(&self) -> usize {
        self.feature_names.len()
    }

    fn encode(&self, record: &CarbonEmission, row: &mut Vec<f32>) {
        row.push(record.datasets_size as f32);
        row.push(if record.auto { 1.0 } else { 0.0 });
        row.extend(
            self.encoded_domains
                .iter()
                .map(|d| if *d == record.domain { 1.0 } else { 0.0 }),
        );
    }

    fn matrix(&self, records: &[&CarbonEmission]) -> Result<Matrix<f32>> {
        let mut data = Vec::with_capacity(records.len() * self.width());
        for record in records {
            self.encode(record, &mut data);
        }
        Matrix::from_vec(records.len(), self.width(), data)
            .map_err(|e| Error::Training(format!("design matrix: {}", e)))
    }
}

fn targets(records: &[&CarbonEmission]) -> Vector<f32> {
    Vector::from_vec(records.iter().map(|r| r.co2_emission as f32).collect())
}

/// Shuffle with a seeded RNG and cut off the test rows
fn split<'a>(
    records: &[&'a CarbonEmission],
    options: &TrainOptions,
) -> (Vec<&'a CarbonEmission>, Vec<&'a CarbonEmission>) {
    let mut shuffled = records.to_vec();
    let mut rng = StdRng::seed_from_u64(options.seed);
    shuffled.shuffle(&mut rng);

    let test_len = (records.len() as f64 * options.test_fraction).ceil() as usize;
    let train = shuffled.split_off(test_len);
    (train, shuffled)
}

fn evaluate(predicted: &[f64], actual: &[f64]) -> (f64, f64, Option<f64>) {
    let n = actual.len() as f64;
    let mse = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / n;

    let mean = actual.iter().sum::<f64>() / n;
    let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let residual = mse * n;
    let r2 = if total > 0.0 { 1.0 - residual / total } else { 0.0 };

    let non_negative = predicted.iter().chain(actual).all(|v| *v >= 0.0);
    let msle = non_negative.then(|| {
        predicted
            .iter()
            .zip(actual)
            .map(|(p, a)| (p.ln_1p() - a.ln_1p()).powi(2))
            .sum::<f64>()
            / n
    });

    (mse, r2, msle)
}

/// Fit the emissions model and derive the reference distribution
///
/// # Errors
///
/// - [`Error::Training`] for an invalid test fraction, too few usable rows,
///   or a singular design matrix
/// - [`Error::InvalidReferenceData`] when no auto-instrumented record exists
pub fn train(records: &[CarbonEmission], options: &TrainOptions) -> Result<TrainedModel> {
    if !(0.0..1.0).contains(&options.test_fraction) {
        return Err(Error::Training(format!(
            "test fraction must be in [0, 1), got {}",
            options.test_fraction
        )));
    }

    let usable: Vec<&CarbonEmission> = records.iter().filter(|r| !r.domain.is_empty()).collect();
    let layout = DesignLayout::from_records(&usable);

    let (train_rows, test_rows) = split(&usable, options);
    if train_rows.len() <= layout.width() {
        return Err(Error::Training(format!(
            "{} training rows for {} features",
            train_rows.len(),
            layout.width()
        )));
    }

    tracing::info!(
        "Training on {} rows ({} held out), features: {}",
        train_rows.len(),
        test_rows.len(),
        layout.feature_names.join(", ")
    );

    let x_train = layout.matrix(&train_rows)?;
    let y_train = targets(&train_rows);

    let mut regression = LinearRegression::new();
    regression
        .fit(&x_train, &y_train)
        .map_err(|e| Error::Training(format!("least squares fit failed: {}", e)))?;

    let bundle = LinearModelBundle {
        coefficients: regression
            .coefficients()
            .as_slice()
            .iter()
            .map(|&c| f64::from(c))
            .collect(),
        intercept: f64::from(regression.intercept()),
        feature_names: layout.feature_names.clone(),
        baseline_domain: layout.baseline_domain.clone(),
        metadata: ModelMetadata::new(train_rows.len())
            .with_hyperparameter("test_fraction", options.test_fraction.to_string())
            .with_hyperparameter("seed", options.seed.to_string())
            .with_description("Ordinary least squares on co2_emission"),
    };
    let model = LinearModel::from_bundle(bundle)?;

    // Scored through the serving-time model
    let eval_rows = if test_rows.is_empty() { &train_rows } else { &test_rows };
    let mut features = Vec::with_capacity(layout.width());
    let predicted: Vec<f64> = eval_rows
        .iter()
        .map(|r| {
            features.clear();
            layout.encode(r, &mut features);
            let row: Vec<f64> = features.iter().map(|&v| f64::from(v)).collect();
            model.predict(&row)
        })
        .collect();
    let actual: Vec<f64> = eval_rows.iter().map(|r| r.co2_emission).collect();
    let (mse, r2, msle) = evaluate(&predicted, &actual);

    let report = TrainingReport {
        train_samples: train_rows.len(),
        test_samples: test_rows.len(),
        mse,
        r2,
        msle,
    };
    tracing::info!("MSE: {}, MSLE: {:?}, R^2: {}", report.mse, report.msle, report.r2);

    let reference = ReferenceDistribution::new(
        records
            .iter()
            .filter(|r| r.auto)
            .map(|r| r.co2_emission)
            .collect(),
    )?;

    Ok(TrainedModel {
        model,
        reference,
        report,
    })
}
