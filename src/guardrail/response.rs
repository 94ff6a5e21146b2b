//! Parsing of the assistant's JSON reply.
//!
//! Expected shape:
//!
//! ```text
//! {
//!   "model_prob_0_1": 0.46,
//!   "overall_confidence": 62,
//!   "top_drivers": [{"id": "ev-1", "stance": "supports", "weight": 0.4, "reason": "..."}],
//!   "notes": "..."
//! }
//! ```
//!
//! The parser is lenient about presentation (code fences, numeric strings,
//! extra keys) and strict about the one field the envelope needs.

use serde_json::{Map, Value};

use crate::domain::{Driver, OutputLimits};
use crate::error::ForecastError;

/// Assistant fields after structural validation, before the envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedForecast {
    /// As emitted; always finite but not yet clamped.
    pub model_prob_raw: f64,
    /// `[0, 100]`; 0 when absent.
    pub overall_confidence: f64,
    pub top_drivers: Vec<Driver>,
    pub notes: String,
}

pub fn parse_assistant_output(raw: &str, limits: &OutputLimits) -> Result<ParsedForecast, ForecastError> {
    let body = strip_code_fences(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ForecastError::AssistantUnavailable(format!("response is not JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ForecastError::AssistantContractViolation("response is not a JSON object".to_string()))?;

    let model_prob_raw = obj
        .get("model_prob_0_1")
        .and_then(as_finite_f64)
        .ok_or_else(|| {
            ForecastError::AssistantContractViolation("model_prob_0_1 is missing or not a number".to_string())
        })?;

    let overall_confidence = obj
        .get("overall_confidence")
        .or_else(|| obj.get("overall_confidence_0_100"))
        .and_then(as_finite_f64)
        .map(|c| c.clamp(0.0, 100.0))
        .unwrap_or(0.0);

    let notes = obj
        .get("notes")
        .and_then(Value::as_str)
        .map(|s| truncate_chars(s.trim(), limits.notes_chars))
        .unwrap_or_default();

    Ok(ParsedForecast {
        model_prob_raw,
        overall_confidence,
        top_drivers: parse_drivers(obj, limits),
        notes,
    })
}

fn parse_drivers(obj: &Map<String, Value>, limits: &OutputLimits) -> Vec<Driver> {
    let Some(list) = obj.get("top_drivers").and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .filter_map(Value::as_object)
        .filter_map(|d| {
            let id = match d.get("id")? {
                Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let stance = d
                .get("stance")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let weight = d.get("weight").and_then(as_finite_f64);
            let reason = d.get("reason").and_then(Value::as_str).map(str::trim).unwrap_or("");
            let reason = if reason.is_empty() {
                truncate_chars(&format!("Evidence {id}"), limits.reason_chars)
            } else {
                truncate_chars(reason, limits.reason_chars)
            };
            Some(Driver {
                id,
                stance,
                weight,
                reason,
            })
        })
        .take(limits.max_drivers)
        .collect()
}

/// Numbers and numeric strings; anything non-finite is rejected.
fn as_finite_f64(v: &Value) -> Option<f64> {
    let x = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
