//! Ecolabel - carbon-emission estimates and colour labels for ML training runs
//!
//! This library normalizes the Hugging Face emissions export, compares
//! auto-instrumented against manually reported emissions (efficiency
//! rankings, hypergeometric tail probabilities, t-test), fits a linear
//! emissions model, and serves predictions with a green/yellow/orange/red
//! percentile label.

pub mod cli;
pub mod comparison;
pub mod config;
pub mod error;
pub mod hypergeometric;
pub mod model;
pub mod percentile;
pub mod prediction;
pub mod records;
#[cfg(feature = "server")]
pub mod server;
pub mod training;

pub use error::{Error, Result};
