use airn::report::Report;
use airn::{config::NormalizerConfig, Normalizer, ParseMode, TargetType};
use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "airn", about = "Normalize a captured LLM response into a typed record")]
struct Cli {
    /// Record type to produce: analysis, safety-check, extracted, polish, reply.
    #[arg(long, short, default_value = "analysis")]
    target: TargetType,

    /// Recovery mode: standard, fallback, intelligent. Defaults to the configured mode.
    #[arg(long, short)]
    mode: Option<ParseMode>,

    /// TOML, YAML or JSON file layered over the built-in configuration.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log every tier attempt to stderr (RUST_LOG overrides the filter).
    #[arg(long)]
    debug: bool,

    /// Response file to read; stdin when omitted.
    input: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    let config = match &cli.config {
        Some(path) => NormalizerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NormalizerConfig::defaults(),
    };
    let mode = cli.mode.unwrap_or(config.pipeline.default_mode);
    let normalizer = Normalizer::new(config).context("building normalizer")?;

    let raw = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let report = Report::new(cli.target, mode, normalizer.normalize_as(&raw, cli.target, mode));
    tracing::info!("{}", report.summary());
    println!("{}", report.to_json()?);
    Ok(())
}
