// Two-sample t-test over log emission rates using aprender
//
// Auto-instrumented and manually reported emission rates span many orders of
// magnitude, so the comparison runs on ln(co2 / parameters). The pooled
// (equal-variance) Student's t-test is used.
//
// - aprender::stats::hypothesis::ttest_ind for the test itself, ttest_1samp
//   when one class holds a single value
// - trueno::Vector for the per-class means reported alongside

use crate::error::{Error, Result};
use trueno::Vector;

/// Smallest class size the comparison accepts
pub const MIN_CLASS_SAMPLES: usize = 1;

/// Outcome of the auto vs. manual comparison
#[derive(Debug, Clone)]
pub struct StatisticalTest {
    /// t-statistic (positive when auto rates are higher)
    pub statistic: f32,

    /// Two-tailed p-value
    pub pvalue: f32,

    /// Degrees of freedom (n_auto + n_manual - 2)
    pub df: f32,

    /// Mean ln rate of the auto class
    pub auto_mean: f32,

    /// Mean ln rate of the manual class
    pub manual_mean: f32,
}

fn mean(values: &[f32], class: &str) -> Result<f32> {
    Vector::from_slice(values)
        .mean()
        .map_err(|e| Error::Statistics(format!("{} mean: {}", class, e)))
}

/// Pooled t-test of a single observation against a sample of at least two
///
/// With one observation the pooled variance is the sample's own variance and
/// df = n - 1, which matches a one-sample test on `sample`. Shifting the
/// hypothesised mean by `sqrt(n + 1)` makes the one-sample statistic equal
/// the pooled one, so the p-value carries over unchanged.
fn single_observation_ttest(
    observation: f32,
    sample: &[f32],
    sample_mean: f32,
) -> Result<aprender::stats::hypothesis::TTestResult> {
    let shift = (observation - sample_mean) / ((sample.len() + 1) as f32).sqrt();
    let mut result = aprender::stats::hypothesis::ttest_1samp(sample, sample_mean - shift)
        .map_err(|e| Error::Statistics(format!("t-test failed: {}", e)))?;
    // ttest_1samp reports sample - hypothesis; flip to observation - sample
    result.statistic = -result.statistic;
    Ok(result)
}

/// Compare two samples of log rates with a pooled-variance t-test
///
/// Returns `Ok(None)` when both classes hold a single value: the pooled
/// variance then has no degrees of freedom.
///
/// # Errors
///
/// [`Error::InsufficientSampleSize`] when either class is empty.
pub fn compare_log_rates(auto: &[f32], manual: &[f32]) -> Result<Option<StatisticalTest>> {
    if auto.len() < MIN_CLASS_SAMPLES || manual.len() < MIN_CLASS_SAMPLES {
        return Err(Error::InsufficientSampleSize {
            auto: auto.len(),
            manual: manual.len(),
            required: MIN_CLASS_SAMPLES,
        });
    }

    let auto_mean = mean(auto, "auto")?;
    let manual_mean = mean(manual, "manual")?;

    let ttest = match (auto.len(), manual.len()) {
        (1, 1) => return Ok(None),
        (1, _) => single_observation_ttest(auto[0], manual, manual_mean)?,
        (_, 1) => {
            let mut result = single_observation_ttest(manual[0], auto, auto_mean)?;
            result.statistic = -result.statistic;
            result
        }
        _ => aprender::stats::hypothesis::ttest_ind(auto, manual, true)
            .map_err(|e| Error::Statistics(format!("t-test failed: {}", e)))?,
    };

    Ok(Some(StatisticalTest {
        statistic: ttest.statistic,
        pvalue: ttest.pvalue,
        df: ttest.df,
        auto_mean,
        manual_mean,
    }))
}
