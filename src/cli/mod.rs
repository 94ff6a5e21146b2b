//! Command-line parsing for the forecast calibrator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! calibration code.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fcal", version, about = "Evidence-weighted forecast calibration")]
pub struct Cli {
    /// Debug-level logging on stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON file overriding calibration constants.
    #[arg(long, value_name = "JSON", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deterministic log-odds forecast from evidence.
    Forecast(ForecastArgs),
    /// Assistant forecast, bounded by the guardrail.
    ///
    /// Requires GROQ_API_KEY (environment or .env). Assistant failures fall back
    /// to the market prior instead of erroring.
    Assistant(ForecastArgs),
    /// Run both paths and print them side by side.
    Compare(ForecastArgs),
    /// Deterministic forecasts for a JSON array of requests, in parallel.
    Batch(BatchArgs),
    /// Deterministic forecast over a seeded synthetic evidence set.
    Demo(DemoArgs),
}

/// Market snapshot and evidence source, shared by the single-market commands.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Market-implied probability of YES (0..1). Required unless --request supplies it.
    #[arg(long, value_name = "P")]
    pub market_prob: Option<f64>,

    /// Bid/ask spread in probability units (0.02 = 2pp).
    #[arg(long)]
    pub spread: Option<f64>,

    /// Market move over the last 24h; context for the assistant.
    #[arg(long = "delta-24h", allow_hyphen_values = true)]
    pub delta_24h: Option<f64>,

    #[arg(long)]
    pub market_id: Option<String>,

    /// Market question.
    #[arg(long)]
    pub title: Option<String>,

    /// Evidence CSV (id,url,title,snippet,source_name,stance,reliability,stance_confidence,timestamp).
    #[arg(long, value_name = "CSV", conflicts_with = "request")]
    pub evidence: Option<PathBuf>,

    /// Request JSON with `market` and `evidence`. Flags above override its market fields.
    #[arg(long, value_name = "JSON")]
    pub request: Option<PathBuf>,

    /// Evaluation instant (RFC 3339). Defaults to the current time.
    #[arg(long, value_parser = parse_instant)]
    pub now: Option<DateTime<Utc>>,

    /// Print the result as JSON instead of a report.
    #[arg(long)]
    pub json: bool,

    /// Export the per-item score breakdown to CSV.
    #[arg(long = "export-scores", value_name = "CSV")]
    pub export_scores: Option<PathBuf>,

    /// Export the result to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// JSON array of `{market, evidence}` requests.
    #[arg(long, value_name = "JSON")]
    pub input: PathBuf,

    #[arg(long, value_parser = parse_instant)]
    pub now: Option<DateTime<Utc>>,

    #[arg(long)]
    pub json: bool,

    /// Export all results to one JSON array.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Random seed; the same seed reproduces the same evidence set.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Number of synthetic evidence items.
    #[arg(short = 'n', long, default_value_t = 8)]
    pub count: usize,

    #[arg(long, default_value_t = 0.5)]
    pub market_prob: f64,

    #[arg(long)]
    pub spread: Option<f64>,

    /// Latent direction of the evidence, -1 (contradicting) to 1 (supporting).
    #[arg(long, default_value_t = 0.3, allow_hyphen_values = true)]
    pub lean: f64,

    #[arg(long, value_parser = parse_instant)]
    pub now: Option<DateTime<Utc>>,

    #[arg(long)]
    pub json: bool,

    #[arg(long = "export-scores", value_name = "CSV")]
    pub export_scores: Option<PathBuf>,
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}
