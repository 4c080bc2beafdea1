//! Percentile-of-score colour labels
//!
//! A prediction is ranked against a reference distribution of historical
//! emissions and mapped to one of four colour buckets. The rank uses the
//! "mean" convention: the percentage of reference values strictly below the
//! prediction plus half the percentage exactly equal to it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Colour bucket for a percentile rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    /// Rank <= 25
    Green,
    /// 25 < rank <= 50
    Yellow,
    /// 50 < rank <= 75
    Orange,
    /// Rank > 75
    Red,
}

impl Colour {
    /// Map a percentile rank in [0, 100] to its bucket (inclusive upper bounds)
    pub fn from_percentile(rank: f64) -> Self {
        if rank <= 25.0 {
            Colour::Green
        } else if rank <= 50.0 {
            Colour::Yellow
        } else if rank <= 75.0 {
            Colour::Orange
        } else {
            Colour::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Colour::Green => "green",
            Colour::Yellow => "yellow",
            Colour::Orange => "orange",
            Colour::Red => "red",
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentile rank of `value` within an arbitrary (unsorted) sample
///
/// # Errors
///
/// [`Error::InvalidReferenceData`] if `sample` is empty.
pub fn percentile_rank(sample: &[f64], value: f64) -> Result<f64> {
    if sample.is_empty() {
        return Err(Error::InvalidReferenceData(
            "reference sample is empty".to_string(),
        ));
    }

    let below = sample.iter().filter(|&&v| v < value).count();
    let at_or_below = sample.iter().filter(|&&v| v <= value).count();

    Ok((below + at_or_below) as f64 * 50.0 / sample.len() as f64)
}

/// Classify `prediction` against an arbitrary (unsorted) sample
///
/// ```
/// use ecolabel::percentile::{classify, Colour};
///
/// let colour = classify(25.0, &[10.0, 20.0, 30.0, 40.0]).unwrap();
/// assert_eq!(colour, Colour::Yellow);
/// ```
pub fn classify(prediction: f64, sample: &[f64]) -> Result<Colour> {
    percentile_rank(sample, prediction).map(Colour::from_percentile)
}

/// Sorted, immutable reference distribution loaded once per process
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDistribution {
    sorted: Vec<f64>,
}

impl ReferenceDistribution {
    /// Build from arbitrary values; rejects empty input and non-finite values
    pub fn new(mut values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidReferenceData(
                "reference distribution is empty".to_string(),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidReferenceData(format!(
                "reference distribution contains non-finite value {}",
                bad
            )));
        }

        values.sort_by(f64::total_cmp);
        Ok(Self { sorted: values })
    }

    /// Load from disk
    ///
    /// `.json` files hold a JSON array of numbers. Anything else is read as
    /// a raw array of little-endian `f64` values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;

        let values = if is_json(path) {
            serde_json::from_slice::<Vec<f64>>(&bytes).map_err(|e| {
                Error::InvalidReferenceData(format!("{}: {}", path.display(), e))
            })?
        } else {
            decode_raw_f64(&bytes)?
        };

        let distribution = Self::new(values)?;
        tracing::debug!(
            "Loaded {} reference values from {}",
            distribution.len(),
            path.display()
        );
        Ok(distribution)
    }

    /// Persist using the same format rules as [`ReferenceDistribution::from_file`]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = if is_json(path) {
            serde_json::to_vec(&self.sorted)
                .map_err(|e| Error::InvalidReferenceData(e.to_string()))?
        } else {
            self.sorted.iter().flat_map(|v| v.to_le_bytes()).collect()
        };
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.sorted
    }

    /// Percentile rank via binary search over the sorted values
    pub fn percentile_rank(&self, value: f64) -> f64 {
        let below = self.sorted.partition_point(|&v| v < value);
        let at_or_below = self.sorted.partition_point(|&v| v <= value);
        (below + at_or_below) as f64 * 50.0 / self.sorted.len() as f64
    }

    pub fn classify(&self, prediction: f64) -> Colour {
        Colour::from_percentile(self.percentile_rank(prediction))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn decode_raw_f64(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() % 8 != 0 {
        return Err(Error::InvalidReferenceData(format!(
            "raw f64 file length {} is not a multiple of 8",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect())
}
