// Number formatting for the efficiency tables

use serde::Serialize;
use std::fmt;

/// Scientific notation split into a two-decimal mantissa and an exponent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scientific {
    pub mantissa: f64,
    pub exponent: i32,
}

impl Scientific {
    pub fn new(value: f64) -> Self {
        // Let the formatter round first so 9.999e-7 becomes 1.00e-6, not 10.00e-7
        let rendered = format!("{:.2e}", value);
        let (mantissa, exponent) = rendered.split_once('e').unwrap_or((rendered.as_str(), "0"));

        Self {
            mantissa: mantissa.parse().unwrap_or(value),
            exponent: exponent.parse().unwrap_or(0),
        }
    }
}

impl fmt::Display for Scientific {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.exponent < 0 { '-' } else { '+' };
        write!(
            f,
            "{:.2}e{}{:02}",
            self.mantissa,
            sign,
            self.exponent.unsigned_abs()
        )
    }
}

/// Human-readable count with k/M/B suffix and one decimal place
///
/// Values below 1000 are printed as-is; values of a trillion and above keep
/// the `B` suffix rather than growing a new one.
pub fn format_large_number(value: u64) -> String {
    if value < 1000 {
        return value.to_string();
    }

    let mut scaled = value as f64 / 1000.0;
    for suffix in ["k", "M"] {
        if scaled < 1000.0 {
            return format!("{:.1}{}", scaled, suffix);
        }
        scaled /= 1000.0;
    }
    format!("{:.1}B", scaled)
}

/// Truncate or pad a model identifier to exactly `width` characters
pub fn fit_identifier(model_id: &str, width: usize) -> String {
    let truncated: String = model_id.chars().take(width).collect();
    format!("{:<width$}", truncated, width = width)
}
