// Extraction of the model-quality blob stored in one column of the raw
// emissions export, e.g. `{'accuracy': 0.91, 'f1': 0.88, 'rouge1': nan, 'rougeL': nan}`.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Model-quality metrics parsed from the raw blob
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub f1: f64,
    pub rouge_1: f64,
    pub rouge_l: f64,
}

fn blob_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{'accuracy': (.*), 'f1': (.*), 'rouge1': (.*), 'rougeL': (.*)\}")
            .expect("metrics blob pattern is a valid regex")
    })
}

fn parse_metric(raw: &str, name: &str, line: u64) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::malformed(line, format!("metric '{}' is not a number: {:?}", name, raw)))
}

/// Parse the metrics blob found in a raw row
///
/// Values are Python float reprs, so `nan` and `inf` are accepted.
pub fn parse_performance_metrics(blob: &str, line: u64) -> Result<PerformanceMetrics> {
    let captures = blob_pattern().captures(blob).ok_or_else(|| {
        Error::malformed(
            line,
            format!("performance metrics blob has unexpected shape: {:?}", blob),
        )
    })?;

    Ok(PerformanceMetrics {
        accuracy: parse_metric(&captures[1], "accuracy", line)?,
        f1: parse_metric(&captures[2], "f1", line)?,
        rouge_1: parse_metric(&captures[3], "rouge1", line)?,
        rouge_l: parse_metric(&captures[4], "rougeL", line)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_all_four_fields() {
        let metrics = parse_performance_metrics(
            "{'accuracy': 0.91, 'f1': 0.875, 'rouge1': 0.4, 'rougeL': 0.35}",
            2,
        )
        .unwrap();

        assert_eq!(metrics.accuracy, 0.91);
        assert_eq!(metrics.f1, 0.875);
        assert_eq!(metrics.rouge_1, 0.4);
        assert_eq!(metrics.rouge_l, 0.35);
    }

    #[test]
    fn test_python_nan_accepted() {
        let metrics = parse_performance_metrics(
            "{'accuracy': nan, 'f1': nan, 'rouge1': 0.5, 'rougeL': nan}",
            3,
        )
        .unwrap();

        assert!(metrics.accuracy.is_nan());
        assert_eq!(metrics.rouge_1, 0.5);
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = parse_performance_metrics("{'accuracy': 0.9}", 4).unwrap_err();
        match err {
            Error::MalformedRecord { line, reason } => {
                assert_eq!(line, 4);
                assert!(reason.contains("unexpected shape"));
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_value_is_malformed() {
        let result = parse_performance_metrics(
            "{'accuracy': None, 'f1': 0.1, 'rouge1': 0.2, 'rougeL': 0.3}",
            5,
        );
        assert!(matches!(result, Err(Error::MalformedRecord { line: 5, .. })));
    }
}
