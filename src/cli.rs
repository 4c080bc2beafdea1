//! CLI argument parsing for ecolabel

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the comparison report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable sections and tables (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ecolabel")]
#[command(version)]
#[command(about = "Carbon-emission estimates and colour labels for ML training runs", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./ecolabel.toml when present)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalize the raw Hugging Face export into the 12-column dataset
    Strip {
        /// Raw CSV export
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Normalized CSV to write
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Compare auto-instrumented against manually reported emissions
    Compare {
        /// Dataset to analyse
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Read the raw export instead of the normalized dataset
        #[arg(long)]
        raw: bool,

        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: ReportFormat,

        /// Rows in each efficiency table
        #[arg(long = "top", value_name = "N")]
        top: Option<usize>,
    },

    /// Fit the linear emissions model and write the reference distribution
    Train {
        /// Normalized dataset
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Where to write the `.apr` model bundle
        #[arg(long, value_name = "FILE")]
        model: Option<PathBuf>,

        /// Where to write the reference distribution
        #[arg(long, value_name = "FILE")]
        reference: Option<PathBuf>,
    },

    /// Predict the emission of one auto-instrumented run
    Predict {
        /// Training dataset size
        #[arg(long = "dataset-size", value_name = "SIZE")]
        dataset_size: f64,

        /// Task domain, e.g. nlp or vision
        #[arg(long, value_name = "DOMAIN")]
        domain: String,

        #[arg(long, value_name = "FILE")]
        model: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        reference: Option<PathBuf>,
    },

    /// Serve /predict over HTTP
    Serve {
        /// Bind address (e.g. 127.0.0.1:5000)
        #[arg(long, value_name = "ADDR")]
        address: Option<String>,

        #[arg(long, value_name = "FILE")]
        model: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        reference: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["ecolabel"]).is_err());
    }

    #[test]
    fn test_cli_strip_paths() {
        let cli = Cli::parse_from(["ecolabel", "strip", "-i", "HFCO2.csv", "-o", "out.csv"]);
        match cli.command {
            Command::Strip { input, output } => {
                assert_eq!(input, Some(PathBuf::from("HFCO2.csv")));
                assert_eq!(output, Some(PathBuf::from("out.csv")));
            }
            other => panic!("Expected strip, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_compare_defaults() {
        let cli = Cli::parse_from(["ecolabel", "compare"]);
        assert!(!cli.debug);
        assert!(cli.config.is_none());
        match cli.command {
            Command::Compare {
                input,
                raw,
                format,
                top,
            } => {
                assert!(input.is_none());
                assert!(!raw);
                assert_eq!(format, ReportFormat::Text);
                assert!(top.is_none());
            }
            other => panic!("Expected compare, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_compare_json_with_top() {
        let cli = Cli::parse_from(["ecolabel", "compare", "--raw", "--format", "json", "--top", "5"]);
        match cli.command {
            Command::Compare {
                raw, format, top, ..
            } => {
                assert!(raw);
                assert_eq!(format, ReportFormat::Json);
                assert_eq!(top, Some(5));
            }
            other => panic!("Expected compare, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ecolabel", "train", "--debug", "--config", "eco.toml"]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("eco.toml")));
    }

    #[test]
    fn test_cli_predict_requires_domain() {
        assert!(Cli::try_parse_from(["ecolabel", "predict", "--dataset-size", "100"]).is_err());

        let cli = Cli::parse_from([
            "ecolabel",
            "predict",
            "--dataset-size",
            "2500",
            "--domain",
            "nlp",
        ]);
        match cli.command {
            Command::Predict {
                dataset_size,
                domain,
                ..
            } => {
                assert_eq!(dataset_size, 2500.0);
                assert_eq!(domain, "nlp");
            }
            other => panic!("Expected predict, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_invalid_format_rejected() {
        assert!(Cli::try_parse_from(["ecolabel", "compare", "--format", "csv"]).is_err());
    }
}
