//! Auto-instrumented vs. manually reported emissions
//!
//! Ranks models by CO2 per parameter, locates where each class first shows
//! up from either end of the ranking, estimates how surprising that position
//! is under random ordering (hypergeometric tail), tabulates the most and
//! least efficient models, and runs a t-test on log emission rates.
//!
//! [`compare`] is pure: it returns a [`ComparisonReport`] and leaves
//! presentation to [`render`].

mod format;
pub mod render;
mod statistics;

pub use format::{fit_identifier, format_large_number, Scientific};
pub use statistics::{compare_log_rates, StatisticalTest, MIN_CLASS_SAMPLES};

use crate::error::{Error, Result};
use crate::hypergeometric::tail_probability;
use crate::records::CarbonEmission;
use serde::Serialize;

/// Which way a model's emissions were captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionClass {
    Auto,
    Manual,
}

impl EmissionClass {
    pub fn of(record: &CarbonEmission) -> Self {
        if record.auto {
            EmissionClass::Auto
        } else {
            EmissionClass::Manual
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EmissionClass::Auto => "auto",
            EmissionClass::Manual => "non-auto",
        }
    }
}

/// Options for [`compare`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompareOptions {
    /// Rows in each efficiency table
    pub top_n: usize,
    /// Alpha for the t-test verdict
    pub significance_level: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            top_n: 25,
            significance_level: 0.05,
        }
    }
}

/// First appearance of each class, counted from one end of the ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndSummary {
    /// 0-based index of the first auto record from this end
    pub first_auto_index: usize,
    /// 0-based index of the first manual record from this end
    pub first_manual_index: usize,
    /// Class whose first member appears later
    pub later_class: EmissionClass,
    /// 1-based position of that later first member
    pub position: usize,
    /// Probability of at least one manual record among `position` draws
    pub probability: f64,
}

/// One row of an efficiency table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEmission {
    /// 1-based rank from the table's end of the ranking
    pub rank: usize,
    pub model_id: String,
    /// CO2 grams per parameter
    pub emission_rate: f64,
    pub rate: Scientific,
    pub datasets_size: u64,
    pub datasets_size_label: String,
    pub auto: bool,
}

/// t-test section of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestSummary {
    pub statistic: f64,
    pub pvalue: f64,
    pub df: f64,
    pub auto_mean_log_rate: f64,
    pub manual_mean_log_rate: f64,
    pub significance_level: f64,
    pub significant: bool,
}

/// Structured result of [`compare`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Records that passed the size/emission filter
    pub total: usize,
    /// Records dropped for `size <= 0` or `co2_emission <= 0`
    pub excluded: usize,
    pub auto_count: usize,
    pub manual_count: usize,
    pub most_efficient_end: EndSummary,
    pub least_efficient_end: EndSummary,
    pub most_efficient: Vec<RankedEmission>,
    pub least_efficient: Vec<RankedEmission>,
    /// Absent when both classes hold a single record
    pub t_test: Option<TTestSummary>,
}

struct Ranked<'a> {
    record: &'a CarbonEmission,
    rate: f64,
}

fn rank_by_rate(records: &[CarbonEmission]) -> Vec<Ranked<'_>> {
    let mut ranked: Vec<Ranked<'_>> = records
        .iter()
        .filter(|r| r.is_rankable())
        .map(|record| Ranked {
            record,
            rate: record.co2_emission / record.size as f64,
        })
        .collect();

    // Stable: ties keep input order
    ranked.sort_by(|a, b| a.rate.total_cmp(&b.rate));
    ranked
}

fn end_summary<'a, 'r: 'a, I>(ranking: I, total: usize, manual_count: usize) -> Result<EndSummary>
where
    I: Iterator<Item = &'a Ranked<'r>> + Clone,
{
    let first_auto_index = ranking.clone().position(|r| r.record.auto);
    let first_manual_index = ranking.clone().position(|r| !r.record.auto);

    let (Some(first_auto_index), Some(first_manual_index)) = (first_auto_index, first_manual_index)
    else {
        return Err(Error::InsufficientSampleSize {
            auto: total - manual_count,
            manual: manual_count,
            required: 1,
        });
    };

    let (later_class, index) = if first_auto_index > first_manual_index {
        (EmissionClass::Auto, first_auto_index)
    } else {
        (EmissionClass::Manual, first_manual_index)
    };
    let position = index + 1;

    let probability = tail_probability(total as i64, manual_count as i64, position as i64, 1)?;

    Ok(EndSummary {
        first_auto_index,
        first_manual_index,
        later_class,
        position,
        probability,
    })
}

fn table_rows<'a, 'r: 'a>(
    ranking: impl Iterator<Item = &'a Ranked<'r>>,
    top_n: usize,
) -> Vec<RankedEmission> {
    ranking
        .take(top_n)
        .enumerate()
        .map(|(i, ranked)| RankedEmission {
            rank: i + 1,
            model_id: ranked.record.model_id.clone(),
            emission_rate: ranked.rate,
            rate: Scientific::new(ranked.rate),
            datasets_size: ranked.record.datasets_size,
            datasets_size_label: format_large_number(ranked.record.datasets_size),
            auto: ranked.record.auto,
        })
        .collect()
}

/// Build the auto vs. manual comparison report
///
/// # Errors
///
/// [`Error::InsufficientSampleSize`] when, after filtering out records with
/// `size <= 0` or `co2_emission <= 0`, either class is empty (this includes
/// an empty filtered set).
pub fn compare(records: &[CarbonEmission], options: &CompareOptions) -> Result<ComparisonReport> {
    let ranking = rank_by_rate(records);
    let total = ranking.len();
    let manual_count = ranking.iter().filter(|r| !r.record.auto).count();
    let auto_count = total - manual_count;

    tracing::debug!(
        "Ranking {} of {} records ({} auto, {} manual)",
        total,
        records.len(),
        auto_count,
        manual_count
    );

    if auto_count < MIN_CLASS_SAMPLES || manual_count < MIN_CLASS_SAMPLES {
        return Err(Error::InsufficientSampleSize {
            auto: auto_count,
            manual: manual_count,
            required: MIN_CLASS_SAMPLES,
        });
    }

    let most_efficient_end = end_summary(ranking.iter(), total, manual_count)?;
    let least_efficient_end = end_summary(ranking.iter().rev(), total, manual_count)?;

    let log_rates = |class: EmissionClass| -> Vec<f32> {
        ranking
            .iter()
            .filter(|r| EmissionClass::of(r.record) == class)
            .map(|r| r.rate.ln() as f32)
            .collect()
    };
    let t_test = compare_log_rates(
        &log_rates(EmissionClass::Auto),
        &log_rates(EmissionClass::Manual),
    )?
    .map(|test| {
        let pvalue = f64::from(test.pvalue);
        TTestSummary {
            statistic: f64::from(test.statistic),
            pvalue,
            df: f64::from(test.df),
            auto_mean_log_rate: f64::from(test.auto_mean),
            manual_mean_log_rate: f64::from(test.manual_mean),
            significance_level: options.significance_level,
            significant: pvalue < options.significance_level,
        }
    });

    Ok(ComparisonReport {
        total,
        excluded: records.len() - total,
        auto_count,
        manual_count,
        most_efficient_end,
        least_efficient_end,
        most_efficient: table_rows(ranking.iter(), options.top_n),
        least_efficient: table_rows(ranking.iter().rev(), options.top_n),
        t_test,
    })
}
