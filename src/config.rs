//! `ecolabel.toml` configuration
//!
//! Every section and key is optional; missing values fall back to the
//! defaults below. CLI flags override whatever is loaded here.
//!
//! ```toml
//! [data]
//! raw_path = "HFCO2.csv"
//! normalized_path = "co2_data.csv"
//! duplicates = "last"
//!
//! [report]
//! top_n = 25
//! significance_level = 0.05
//!
//! [train]
//! test_fraction = 0.2
//! seed = 42
//! compress = true
//! model_name = "ecolabel-linear"
//!
//! [server]
//! address = "127.0.0.1:5000"
//! model_path = "linear_regression_model.apr"
//! reference_path = "sorted_auto_carbon_emissions"
//! ```

use crate::comparison::CompareOptions;
use crate::error::{Error, Result};
use crate::model::PersistenceOptions;
use crate::records::DuplicatePolicy;
use crate::training::TrainOptions;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "ecolabel.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data: DataConfig,
    pub report: ReportConfig,
    pub train: TrainConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Raw Hugging Face export
    pub raw_path: PathBuf,
    /// Normalized 12-column dataset written by `strip`
    pub normalized_path: PathBuf,
    pub duplicates: DuplicatePolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("HFCO2.csv"),
            normalized_path: PathBuf::from("co2_data.csv"),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub top_n: usize,
    pub significance_level: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let options = CompareOptions::default();
        Self {
            top_n: options.top_n,
            significance_level: options.significance_level,
        }
    }
}

impl ReportConfig {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            top_n: self.top_n,
            significance_level: self.significance_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub test_fraction: f64,
    pub seed: u64,
    /// zstd-compress the saved model
    pub compress: bool,
    /// Name stored in the model file header
    pub model_name: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let options = TrainOptions::default();
        let persistence = PersistenceOptions::default();
        Self {
            test_fraction: options.test_fraction,
            seed: options.seed,
            compress: persistence.compress,
            model_name: persistence.name,
        }
    }
}

impl TrainConfig {
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            test_fraction: self.test_fraction,
            seed: self.seed,
        }
    }

    pub fn persistence_options(&self) -> PersistenceOptions {
        PersistenceOptions {
            compress: self.compress,
            name: self.model_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,
    pub model_path: PathBuf,
    pub reference_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5000".to_string(),
            model_path: PathBuf::from("linear_regression_model.apr"),
            reference_path: PathBuf::from("sorted_auto_carbon_emissions"),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address
            .parse()
            .map_err(|e| Error::Config(format!("server.address '{}': {}", self.address, e)))
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Explicit path, else `./ecolabel.toml` if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!("Using {}", default.display());
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.report.top_n == 0 {
            return Err(Error::Config("report.top_n must be at least 1".to_string()));
        }
        if !(self.report.significance_level > 0.0 && self.report.significance_level < 1.0) {
            return Err(Error::Config(format!(
                "report.significance_level must be in (0, 1), got {}",
                self.report.significance_level
            )));
        }
        if !(0.0..1.0).contains(&self.train.test_fraction) {
            return Err(Error::Config(format!(
                "train.test_fraction must be in [0, 1), got {}",
                self.train.test_fraction
            )));
        }
        if self.train.model_name.trim().is_empty() {
            return Err(Error::Config("train.model_name must not be empty".to_string()));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
