//! Assistant instructions and request payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{EvidenceItem, MarketSnapshot, OutputLimits};
use crate::evidence::age_hours;
use crate::guardrail::response::truncate_chars;

pub const SYSTEM_PROMPT: &str = "\
You are a prediction-market forecasting analyst. Return ONLY valid JSON. No markdown. No extra keys.
Inputs: market_prior_yes (0..1), market_title, max_shift (0..1), delta_market_24h, evidence[] with {id, stance, reliability, age_hours, snippet}.

Hard rules:
1) Always output model_prob_0_1 in [0.01, 0.99]. Never refuse. Never ask questions.
2) Never say anything about missing/limited/insufficient evidence. Use whatever evidence is provided.
3) Base the update on evidence direction, recency, and reliability; do NOT mention priors in the rationale.
4) Enforce: abs(model_prob_0_1 - market_prior_yes) <= max_shift.

Output rules:
- top_drivers: 2-4 items, each must reference an evidence id exactly.
- notes must summarize evidence direction/recency/reliability without mentioning evidence quantity, availability, or priors.

Schema (exact keys):
{\"model_prob_0_1\": number, \"overall_confidence\": number, \"top_drivers\":[{\"id\":string,\"stance\":\"supports\"|\"contradicts\"|\"neutral\",\"weight\":number,\"reason\":string}], \"notes\": string}";

/// Appended to the system prompt for the single corrective retry.
pub const RETRY_INSTRUCTION: &str = "Your previous output included banned phrases. Rewrite WITHOUT those substrings. \
Keep meaning. Obey schema. Do not mention evidence quantity or priors.";

/// Age reported for evidence with an unparseable timestamp.
const UNKNOWN_AGE_HOURS: f64 = 999.0;

pub fn retry_system_prompt() -> String {
    format!("{SYSTEM_PROMPT}\n\n{RETRY_INSTRUCTION}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactEvidence {
    pub id: String,
    pub source: String,
    pub title: String,
    pub stance: &'static str,
    pub reliability: f64,
    pub age_hours: i64,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantPayload {
    pub market_title: String,
    pub market_prior_yes: f64,
    pub max_shift: f64,
    pub delta_market_24h: f64,
    pub evidence: Vec<CompactEvidence>,
    pub evidence_counts: BTreeMap<&'static str, usize>,
}

impl AssistantPayload {
    /// Project the first `limits.payload_items` items into the compact form.
    pub fn build(
        market: &MarketSnapshot,
        prior: f64,
        max_shift: f64,
        items: &[EvidenceItem],
        limits: &OutputLimits,
        now: DateTime<Utc>,
    ) -> Self {
        let evidence: Vec<CompactEvidence> = items
            .iter()
            .take(limits.payload_items)
            .map(|e| CompactEvidence {
                id: e.id.clone(),
                source: e.source_name.clone(),
                title: e.title.clone(),
                stance: e.stance.as_str(),
                reliability: e.reliability_clamped(),
                age_hours: age_hours(&e.timestamp, now).unwrap_or(UNKNOWN_AGE_HOURS).round() as i64,
                snippet: truncate_chars(&e.snippet, limits.snippet_chars),
            })
            .collect();

        let mut evidence_counts = BTreeMap::new();
        for e in &evidence {
            *evidence_counts.entry(e.stance).or_insert(0) += 1;
        }

        Self {
            market_title: market.title.clone(),
            market_prior_yes: prior,
            max_shift,
            delta_market_24h: market.delta_24h.filter(|d| d.is_finite()).unwrap_or(0.0),
            evidence,
            evidence_counts,
        }
    }

    pub fn to_json(&self) -> String {
        // Plain structs of strings and finite numbers always serialize.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
