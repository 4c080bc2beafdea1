//! Text and JSON renderers for [`ComparisonReport`]

use super::{fit_identifier, ComparisonReport, EndSummary, RankedEmission, TTestSummary};
use std::fmt;

const TABLE_HEADER: &str = "Rank\tModel ID\t\tCO2 Emission\tDataset Size\tAuto";
const ID_WIDTH: usize = 20;

/// Positional statistics counted from one end of the ranking
struct EndSection<'a> {
    summary: &'a EndSummary,
    extreme: &'static str,
}

impl fmt::Display for EndSection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Position of {} efficient {} model: {}",
            self.extreme,
            self.summary.later_class.label(),
            self.summary.position
        )?;
        writeln!(
            f,
            "Probability of observing 1 or more non-auto models among the top {} emission models: {}",
            self.summary.position, self.summary.probability
        )
    }
}

struct TableSection<'a> {
    title: &'static str,
    rows: &'a [RankedEmission],
}

impl fmt::Display for TableSection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Top {} {} =====", self.rows.len(), self.title)?;
        writeln!(f, "{}", TABLE_HEADER)?;
        for row in self.rows {
            writeln!(
                f,
                "{:>2}.\t{}\t{}\t{}\t\t{}",
                row.rank,
                fit_identifier(&row.model_id, ID_WIDTH),
                row.rate,
                row.datasets_size_label,
                if row.auto { "✓" } else { "" }
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for TTestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "T-Value: {}", self.statistic)?;
        writeln!(f, "P-Value: {}", self.pvalue)?;
        writeln!(f)?;

        let qualifier = if self.significant { "a" } else { "no" };
        writeln!(
            f,
            "There is {} statistically significant difference between automatic and non-automatic model emissions (alpha = {}).",
            qualifier, self.significance_level
        )
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Auto vs. Non-Auto =====")?;
        writeln!(
            f,
            "{}",
            EndSection {
                summary: &self.most_efficient_end,
                extreme: "most",
            }
        )?;
        writeln!(
            f,
            "{}",
            EndSection {
                summary: &self.least_efficient_end,
                extreme: "least",
            }
        )?;

        writeln!(
            f,
            "{}",
            TableSection {
                title: "most efficient models",
                rows: &self.most_efficient,
            }
        )?;
        write!(
            f,
            "{}",
            TableSection {
                title: "least efficient models",
                rows: &self.least_efficient,
            }
        )?;

        writeln!(f)?;
        writeln!(f, "===== Non-Auto vs Auto =====")?;
        writeln!(f, "Total Non-Automatic Models: {}", self.manual_count)?;
        writeln!(f, "Total Automatic Models: {}", self.auto_count)?;
        if self.excluded > 0 {
            writeln!(
                f,
                "Excluded (no parameter count or emission): {}",
                self.excluded
            )?;
        }

        writeln!(f)?;
        writeln!(f, "===== T-Test =====")?;
        match &self.t_test {
            Some(test) => write!(f, "{}", test),
            None => writeln!(
                f,
                "Not enough records for a t-test ({} automatic, {} non-automatic)",
                self.auto_count, self.manual_count
            ),
        }
    }
}

/// Human-readable report, section by section
pub fn to_text(report: &ComparisonReport) -> String {
    report.to_string()
}

/// Pretty-printed JSON of the full report
pub fn to_json(report: &ComparisonReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
