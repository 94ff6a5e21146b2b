//! Application entry: CLI dispatch, logging setup and output.
//!
//! - `pipeline` holds the shared load -> forecast -> log workflow.
//! - handlers here only decide what gets printed and exported.

pub mod pipeline;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::{BatchArgs, Cli, Command, DemoArgs, ForecastArgs};
use crate::data::{ChatCompletionsClient, SampleConfig, generate_sample};
use crate::domain::CalibrationConfig;
use crate::error::AppError;
use crate::forecast::ForecastEngine;
use crate::io::export::{write_json, write_scores_csv};
use crate::io::ingest::load_batch_json;
use crate::report;

use pipeline::ForecastInput;

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => CalibrationConfig::load(path)?,
        None => CalibrationConfig::default(),
    };
    let engine = ForecastEngine::new(config);

    match cli.command {
        Command::Forecast(args) => handle_forecast(&engine, &args),
        Command::Assistant(args) => handle_assistant(&engine, &args),
        Command::Compare(args) => handle_compare(&engine, &args),
        Command::Batch(args) => handle_batch(&engine, &args),
        Command::Demo(args) => handle_demo(&engine, &args),
    }
}

/// Logs go to stderr so stdout stays clean for reports and JSON.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_forecast(engine: &ForecastEngine, args: &ForecastArgs) -> Result<(), AppError> {
    let input = pipeline::load_input(args)?;
    let run = pipeline::run_deterministic(engine, &input)?;

    if args.json {
        print_json(&run.result)?;
    } else {
        print_row_errors(&input);
        println!("{}", report::format_forecast(&run.result));
        if !run.scores.is_empty() {
            println!("{}", report::format_scores(&run.scores));
        }
    }

    if let Some(path) = &args.export_scores {
        write_scores_csv(path, &run.scores)?;
    }
    if let Some(path) = &args.export {
        write_json(path, &run.result)?;
    }
    Ok(())
}

fn handle_assistant(engine: &ForecastEngine, args: &ForecastArgs) -> Result<(), AppError> {
    let input = pipeline::load_input(args)?;
    let client = ChatCompletionsClient::from_env()?;
    let run = pipeline::run_assistant(engine, &input, &client)?;

    if args.json {
        print_json(&run.result)?;
    } else {
        print_row_errors(&input);
        println!("{}", report::format_assistant_forecast(&run.result, &run.trace));
    }

    if let Some(path) = &args.export_scores {
        write_scores_csv(path, &engine.score_evidence(&input.evidence, input.now))?;
    }
    if let Some(path) = &args.export {
        write_json(path, &run.result)?;
    }
    Ok(())
}

fn handle_compare(engine: &ForecastEngine, args: &ForecastArgs) -> Result<(), AppError> {
    let input = pipeline::load_input(args)?;
    let client = ChatCompletionsClient::from_env()?;
    let det = pipeline::run_deterministic(engine, &input)?;
    let asst = pipeline::run_assistant(engine, &input, &client)?;

    let combined = json!({
        "deterministic": det.result,
        "assistant": asst.result,
    });

    if args.json {
        print_json(&combined)?;
    } else {
        print_row_errors(&input);
        println!("{}", report::format_comparison(&det.result, &asst.result, &asst.trace));
    }

    if let Some(path) = &args.export_scores {
        write_scores_csv(path, &det.scores)?;
    }
    if let Some(path) = &args.export {
        write_json(path, &combined)?;
    }
    Ok(())
}

fn handle_batch(engine: &ForecastEngine, args: &BatchArgs) -> Result<(), AppError> {
    let requests = load_batch_json(&args.input)?;
    let now = args.now.unwrap_or_else(chrono::Utc::now);
    let outcomes = pipeline::run_batch(engine, &requests, now);

    if args.json {
        print_json(&outcomes)?;
    } else {
        for outcome in &outcomes {
            match (&outcome.result, &outcome.error) {
                (Some(result), _) => println!("{}", report::format_forecast(result)),
                (None, Some(err)) => eprintln!("{}: {err}", display_id(&outcome.market_id)),
                (None, None) => {}
            }
        }
    }

    if let Some(path) = &args.export {
        write_json(path, &outcomes)?;
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        return Err(AppError::new(
            2,
            format!("{failed} of {} batch request(s) were invalid.", outcomes.len()),
        ));
    }
    Ok(())
}

fn handle_demo(engine: &ForecastEngine, args: &DemoArgs) -> Result<(), AppError> {
    let now = args.now.unwrap_or_else(chrono::Utc::now);
    let sample = generate_sample(
        &SampleConfig {
            seed: args.seed,
            count: args.count,
            market_prob: args.market_prob,
            spread: args.spread,
            lean: args.lean,
            ..SampleConfig::default()
        },
        now,
    )?;

    let input = ForecastInput {
        market: sample.market,
        evidence: sample.items,
        row_errors: Vec::new(),
        now,
    };
    let run = pipeline::run_deterministic(engine, &input)?;

    if args.json {
        print_json(&json!({
            "market": input.market,
            "evidence": input.evidence,
            "result": run.result,
        }))?;
    } else {
        println!("{}", report::format_forecast(&run.result));
        println!("{}", report::format_scores(&run.scores));
    }

    if let Some(path) = &args.export_scores {
        write_scores_csv(path, &run.scores)?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(4, format!("Failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn print_row_errors(input: &ForecastInput) {
    if !input.row_errors.is_empty() {
        eprint!("{}", report::format_row_errors(&input.row_errors));
    }
}

fn display_id(market_id: &str) -> &str {
    if market_id.is_empty() { "(unnamed market)" } else { market_id }
}
