//! Linear emissions model and its persisted bundle
//!
//! The bundle is the training-time view (`coefficients`, `intercept`,
//! `feature_names`, baseline domain, metadata) stored in aprender's `.apr`
//! container. [`LinearModel`] is the validated serving-time view: it resolves
//! the feature names once into a typed [`FeatureIndex`] so that prediction
//! never does string lookups beyond the domain table.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Feature name of the dataset-size slot
pub const DATASETS_SIZE_FEATURE: &str = "datasets_size";
/// Feature name of the auto-instrumented indicator slot
pub const AUTO_FEATURE: &str = "auto";
/// Prefix of one-hot domain slots (`domain_nlp`, `domain_vision`, ...)
pub const DOMAIN_PREFIX: &str = "domain_";

/// Metadata for a persisted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Ecolabel version that created this model
    pub ecolabel_version: String,
    /// Seconds since the Unix epoch at training time
    pub trained_at: String,
    /// Number of samples used for training
    pub training_samples: usize,
    /// Model-specific hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
    /// Optional description
    pub description: Option<String>,
}

impl ModelMetadata {
    /// Create new metadata with current timestamp
    pub fn new(training_samples: usize) -> Self {
        Self {
            ecolabel_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: unix_timestamp(),
            training_samples,
            hyperparameters: BTreeMap::new(),
            description: None,
        }
    }

    /// Add a hyperparameter
    pub fn with_hyperparameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }

    /// Add a description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

/// On-disk form of a fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelBundle {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Column names, index-aligned with `coefficients`
    pub feature_names: Vec<String>,
    /// Domain encoded by the all-zero one-hot vector, if any
    pub baseline_domain: Option<String>,
    pub metadata: ModelMetadata,
}

/// Name written into the `.apr` header unless configured otherwise
pub const DEFAULT_MODEL_NAME: &str = "ecolabel-linear";

/// How a bundle is written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceOptions {
    /// zstd-compress the payload
    pub compress: bool,
    /// Name recorded in the `.apr` header
    pub name: String,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            compress: true,
            name: DEFAULT_MODEL_NAME.to_string(),
        }
    }
}

/// Save a model bundle to `.apr` format
///
/// The header description is taken from the bundle's metadata.
pub fn save_bundle(
    bundle: &LinearModelBundle,
    path: impl AsRef<Path>,
    options: &PersistenceOptions,
) -> Result<()> {
    use aprender::format::{save, Compression, ModelType, SaveOptions};

    let compression = if options.compress {
        Compression::ZstdDefault
    } else {
        Compression::None
    };

    let mut save_options = SaveOptions::new()
        .with_compression(compression)
        .with_name(options.name.clone());
    if let Some(desc) = &bundle.metadata.description {
        save_options = save_options.with_description(desc.clone());
    }

    save(bundle, ModelType::Custom, path.as_ref(), save_options)
        .map_err(|e| Error::Persistence(format!("save {}: {}", path.as_ref().display(), e)))
}

/// Load a model bundle from `.apr` format
pub fn load_bundle(path: impl AsRef<Path>) -> Result<LinearModelBundle> {
    use aprender::format::{load, ModelType};

    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Persistence(format!(
            "model file not found: {}",
            path.display()
        )));
    }

    load::<LinearModelBundle>(path, ModelType::Custom)
        .map_err(|e| Error::Persistence(format!("load {}: {}", path.display(), e)))
}

/// Where a domain lands in the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainSlot {
    /// The dropped reference category; no slot is set
    Baseline,
    /// Index of the `domain_<name>` column
    Column(usize),
}

/// Validated positions of the features prediction needs
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureIndex {
    datasets_size: usize,
    auto: usize,
    domains: HashMap<String, DomainSlot>,
}

impl FeatureIndex {
    /// Resolve feature names, rejecting bundles without the required slots
    pub fn build(feature_names: &[String], baseline_domain: Option<&str>) -> Result<Self> {
        let position = |name: &str| {
            feature_names
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| Error::InvalidModel(format!("missing feature '{}'", name)))
        };

        let mut domains: HashMap<String, DomainSlot> = feature_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                name.strip_prefix(DOMAIN_PREFIX)
                    .map(|domain| (domain.to_string(), DomainSlot::Column(i)))
            })
            .collect();

        if let Some(baseline) = baseline_domain {
            if domains.insert(baseline.to_string(), DomainSlot::Baseline).is_some() {
                return Err(Error::InvalidModel(format!(
                    "baseline domain '{}' also has a one-hot column",
                    baseline
                )));
            }
        }

        Ok(Self {
            datasets_size: position(DATASETS_SIZE_FEATURE)?,
            auto: position(AUTO_FEATURE)?,
            domains,
        })
    }

    /// Slot for a domain
    ///
    /// # Errors
    ///
    /// [`Error::UnknownDomain`] for categories not seen at training time.
    pub fn domain_slot(&self, domain: &str) -> Result<DomainSlot> {
        self.domains
            .get(domain)
            .copied()
            .ok_or_else(|| Error::UnknownDomain(domain.to_string()))
    }

    /// Known domains, sorted
    pub fn domains(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.domains.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Serving-time linear model
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    bundle: LinearModelBundle,
    index: FeatureIndex,
}

impl LinearModel {
    /// Validate a bundle and build its feature index
    pub fn from_bundle(bundle: LinearModelBundle) -> Result<Self> {
        if bundle.coefficients.len() != bundle.feature_names.len() {
            return Err(Error::InvalidModel(format!(
                "{} coefficients for {} feature names",
                bundle.coefficients.len(),
                bundle.feature_names.len()
            )));
        }
        if !bundle.intercept.is_finite() || bundle.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidModel(
                "coefficients must be finite".to_string(),
            ));
        }

        let index = FeatureIndex::build(&bundle.feature_names, bundle.baseline_domain.as_deref())?;
        Ok(Self { bundle, index })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model = Self::from_bundle(load_bundle(path.as_ref())?)?;
        tracing::info!(
            "Loaded linear model from {} ({} features, domains: {})",
            path.as_ref().display(),
            model.dimension(),
            model.index.domains().join(", ")
        );
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>, options: &PersistenceOptions) -> Result<()> {
        save_bundle(&self.bundle, path, options)
    }

    pub fn bundle(&self) -> &LinearModelBundle {
        &self.bundle
    }

    pub fn feature_index(&self) -> &FeatureIndex {
        &self.index
    }

    /// Number of features (length of the coefficient vector)
    pub fn dimension(&self) -> usize {
        self.bundle.coefficients.len()
    }

    /// Sparse feature vector for a request; the auto slot is always 1
    pub fn feature_vector(&self, datasets_size: f64, domain: &str) -> Result<Vec<f64>> {
        let slot = self.index.domain_slot(domain)?;

        let mut features = vec![0.0; self.dimension()];
        features[self.index.datasets_size] = datasets_size;
        features[self.index.auto] = 1.0;
        if let DomainSlot::Column(i) = slot {
            features[i] = 1.0;
        }
        Ok(features)
    }

    /// Dot product with the coefficients plus the intercept
    pub fn predict(&self, features: &[f64]) -> f64 {
        features
            .iter()
            .zip(&self.bundle.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.bundle.intercept
    }
}
