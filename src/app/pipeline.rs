//! Shared forecast pipeline used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load inputs -> validate/dedupe evidence -> forecast -> log what happened
//!
//! The command handlers can then focus on presentation (report vs JSON).

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::ForecastArgs;
use crate::domain::{EvidenceItem, ForecastRequest, ForecastResult, MarketSnapshot};
use crate::error::AppError;
use crate::forecast::{DeterministicRun, ForecastEngine};
use crate::guardrail::{AssistantRun, AssistantTransport, GuardrailTrace, RetryState};
use crate::io::ingest::{RowError, load_evidence_csv, load_request_json};

/// One market plus its evidence, ready to forecast.
#[derive(Debug, Clone)]
pub struct ForecastInput {
    pub market: MarketSnapshot,
    pub evidence: Vec<EvidenceItem>,
    pub row_errors: Vec<RowError>,
    pub now: DateTime<Utc>,
}

/// Resolve the market snapshot and evidence from CLI arguments.
///
/// A `--request` document supplies both; explicit flags override its market
/// fields. Without a request, `--market-prob` is required and evidence comes
/// from `--evidence` (or is empty).
pub fn load_input(args: &ForecastArgs) -> Result<ForecastInput, AppError> {
    let (mut market, mut evidence, mut row_errors) = match &args.request {
        Some(path) => {
            let req = load_request_json(path)?;
            (req.market, req.evidence, Vec::new())
        }
        None => {
            let p = args
                .market_prob
                .ok_or_else(|| AppError::new(2, "--market-prob is required unless --request is given."))?;
            (MarketSnapshot::new(p), Vec::new(), Vec::new())
        }
    };

    if let Some(p) = args.market_prob {
        market.market_prob = p;
    }
    if args.spread.is_some() {
        market.spread = args.spread;
    }
    if args.delta_24h.is_some() {
        market.delta_24h = args.delta_24h;
    }
    if let Some(id) = &args.market_id {
        market.market_id = id.clone();
    }
    if let Some(title) = &args.title {
        market.title = title.clone();
    }

    if let Some(path) = &args.evidence {
        let ingested = load_evidence_csv(path)?;
        debug!(
            rows_read = ingested.rows_read,
            rows_used = ingested.items.len(),
            duplicates_dropped = ingested.duplicates_dropped,
            "loaded evidence"
        );
        evidence = ingested.items;
        row_errors = ingested.row_errors;
    }

    Ok(ForecastInput {
        market,
        evidence,
        row_errors,
        now: args.now.unwrap_or_else(Utc::now),
    })
}

pub fn run_deterministic(engine: &ForecastEngine, input: &ForecastInput) -> Result<DeterministicRun, AppError> {
    let run = engine.deterministic_run(&input.market, &input.evidence, input.now)?;
    info!(
        market_id = %input.market.market_id,
        market_prob = run.result.market_prob,
        model_prob = run.result.model_prob,
        confidence = %run.result.confidence_label,
        items = input.evidence.len(),
        directional = run.confidence.n,
        "deterministic forecast"
    );
    if run.confidence.downgraded {
        debug!(
            score = run.confidence.score,
            avg_reliability = run.confidence.avg_reliability,
            spread_penalty = run.confidence.spread_penalty,
            "confidence downgraded"
        );
    }
    Ok(run)
}

pub fn run_assistant<T: AssistantTransport + ?Sized>(
    engine: &ForecastEngine,
    input: &ForecastInput,
    transport: &T,
) -> Result<AssistantRun, AppError> {
    let run = engine.assistant(&input.market, &input.evidence, transport, input.now)?;
    log_trace(&input.market.market_id, &run.trace);
    info!(
        market_id = %input.market.market_id,
        market_prob = run.result.market_prob,
        model_prob = run.result.model_prob,
        max_shift = run.result.max_shift,
        fallback = run.trace.is_fallback(),
        "assistant forecast"
    );
    Ok(run)
}

fn log_trace(market_id: &str, trace: &GuardrailTrace) {
    if trace.retry == RetryState::Retried {
        warn!(market_id, banned = ?trace.banned_phrases, "assistant reply used banned phrasing; retried once");
    }
    if trace.banned_after_retry {
        warn!(market_id, "retried reply still used banned phrasing");
    }
    if trace.clamped {
        debug!(market_id, raw = ?trace.raw_model_prob, max_shift = trace.max_shift, "assistant probability clamped");
    }
    if trace.dropped_drivers > 0 {
        debug!(market_id, dropped = trace.dropped_drivers, "assistant cited unknown evidence ids");
    }
    if let Some(err) = &trace.fallback {
        warn!(market_id, error = %err, "assistant unusable; falling back to market prior");
    }
}

/// Outcome of one batch entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub market_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ForecastResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deterministic forecasts for every request, computed in parallel, returned in
/// input order.
pub fn run_batch(engine: &ForecastEngine, requests: &[ForecastRequest], now: DateTime<Utc>) -> Vec<BatchOutcome> {
    let outcomes: Vec<BatchOutcome> = requests
        .par_iter()
        .map(|req| match engine.deterministic(&req.market, &req.evidence, now) {
            Ok(result) => BatchOutcome {
                market_id: req.market.market_id.clone(),
                result: Some(result),
                error: None,
            },
            Err(err) => BatchOutcome {
                market_id: req.market.market_id.clone(),
                result: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    info!(requests = requests.len(), failed, "batch complete");
    outcomes
}
