use anyhow::{Context, Result};
use clap::Parser;
use ecolabel::cli::{Cli, Command, ReportFormat};
use ecolabel::comparison::{self, render};
use ecolabel::config::Config;
use ecolabel::prediction::PredictionContext;
use ecolabel::records::{self, CsvLayout};
use ecolabel::training;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; logs go to stderr
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn strip(config: &Config, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| config.data.raw_path.clone());
    let output = output.unwrap_or_else(|| config.data.normalized_path.clone());

    let written = records::strip(&input, &output).with_context(|| {
        format!(
            "Failed to normalize {} into {}",
            input.display(),
            output.display()
        )
    })?;
    println!("Wrote {} records to {}", written, output.display());
    Ok(())
}

fn compare(
    config: &Config,
    input: Option<PathBuf>,
    raw: bool,
    format: ReportFormat,
    top: Option<usize>,
) -> Result<()> {
    let (layout, default_path) = if raw {
        (CsvLayout::Raw, &config.data.raw_path)
    } else {
        (CsvLayout::Normalized, &config.data.normalized_path)
    };
    let input = input.unwrap_or_else(|| default_path.clone());

    let records = records::load(&input, layout, config.data.duplicates)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let mut options = config.report.compare_options();
    if let Some(top) = top {
        anyhow::ensure!(top > 0, "--top must be at least 1");
        options.top_n = top;
    }

    let report = comparison::compare(records.as_slice(), &options)?;
    match format {
        ReportFormat::Text => print!("{}", render::to_text(&report)),
        ReportFormat::Json => println!("{}", render::to_json(&report)?),
    }
    Ok(())
}

fn train(
    config: &Config,
    input: Option<PathBuf>,
    model_path: Option<PathBuf>,
    reference_path: Option<PathBuf>,
) -> Result<()> {
    let input = input.unwrap_or_else(|| config.data.normalized_path.clone());
    let model_path = model_path.unwrap_or_else(|| config.server.model_path.clone());
    let reference_path = reference_path.unwrap_or_else(|| config.server.reference_path.clone());

    let records = records::load(&input, CsvLayout::Normalized, config.data.duplicates)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let trained = training::train(records.as_slice(), &config.train.train_options())?;

    trained
        .model
        .save(&model_path, &config.train.persistence_options())
        .with_context(|| format!("Failed to save model to {}", model_path.display()))?;
    trained
        .reference
        .save(&reference_path)
        .with_context(|| format!("Failed to write {}", reference_path.display()))?;

    let report = &trained.report;
    println!("Linear Regression Results:");
    println!(
        "Train samples: {}, test samples: {}",
        report.train_samples, report.test_samples
    );
    match report.msle {
        Some(msle) => println!("MSE: {}, LogMSE: {}, R^2: {}", report.mse, msle, report.r2),
        None => println!("MSE: {}, LogMSE: N/A, R^2: {}", report.mse, report.r2),
    }
    println!("Model written to {}", model_path.display());
    println!(
        "Reference distribution ({} values) written to {}",
        trained.reference.len(),
        reference_path.display()
    );
    Ok(())
}

fn load_context(
    config: &Config,
    model: Option<PathBuf>,
    reference: Option<PathBuf>,
) -> Result<PredictionContext> {
    let model = model.unwrap_or_else(|| config.server.model_path.clone());
    let reference = reference.unwrap_or_else(|| config.server.reference_path.clone());
    PredictionContext::load(&model, &reference).with_context(|| {
        format!(
            "Failed to load prediction assets ({}, {})",
            model.display(),
            reference.display()
        )
    })
}

fn predict(
    config: &Config,
    dataset_size: f64,
    domain: &str,
    model: Option<PathBuf>,
    reference: Option<PathBuf>,
) -> Result<()> {
    let context = load_context(config, model, reference)?;
    let prediction = context.predict(dataset_size, domain)?;

    println!("Prediction: {}", prediction.value);
    println!("Percentile: {:.1}", prediction.percentile);
    println!("Colour: {}", prediction.colour);
    Ok(())
}

#[cfg(feature = "server")]
fn serve(
    config: &Config,
    address: Option<String>,
    model: Option<PathBuf>,
    reference: Option<PathBuf>,
) -> Result<()> {
    let address = match address {
        Some(address) => address
            .parse()
            .with_context(|| format!("Invalid --address '{}'", address))?,
        None => config.server.socket_addr()?,
    };
    let context = load_context(config, model, reference)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    runtime
        .block_on(ecolabel::server::serve(address, context))
        .with_context(|| format!("Server on {} failed", address))
}

#[cfg(not(feature = "server"))]
fn serve(
    _config: &Config,
    _address: Option<String>,
    _model: Option<PathBuf>,
    _reference: Option<PathBuf>,
) -> Result<()> {
    anyhow::bail!("ecolabel was built without the `server` feature")
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Strip { input, output } => strip(&config, input, output),
        Command::Compare {
            input,
            raw,
            format,
            top,
        } => compare(&config, input, raw, format, top),
        Command::Train {
            input,
            model,
            reference,
        } => train(&config, input, model, reference),
        Command::Predict {
            dataset_size,
            domain,
            model,
            reference,
        } => predict(&config, dataset_size, &domain, model, reference),
        Command::Serve {
            address,
            model,
            reference,
        } => serve(&config, address, model, reference),
    }
}
