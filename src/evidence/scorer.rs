//! Per-item evidence weighting.
//!
//! `weight = (a*reliability + b*recency + c*stance_confidence + floor) * (1 + source_bonus)`
//!
//! where reliability and stance confidence are normalized to `[0, 1]` and
//! recency decays with a fixed half-life. The floor term guarantees every
//! directional item a nonzero weight.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::domain::{EvidenceItem, ScoringConfig, Stance};
use crate::evidence::source::SourceClassifier;
use crate::math::{half_life_decay, pct_to_unit};

/// Full weighting breakdown for one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceScore {
    pub id: String,
    pub host: Option<String>,
    pub stance: Stance,
    pub directional_value: f64,
    pub age_hours: f64,
    pub recency: f64,
    pub reliability_norm: f64,
    pub stance_confidence_norm: f64,
    pub source_bonus: f64,
    pub base_weight: f64,
    pub weight: f64,
}

impl EvidenceScore {
    /// Signed log-odds contribution before any conflict penalty.
    pub fn contribution(&self) -> f64 {
        self.weight * self.directional_value
    }

    /// True when the item takes part in aggregation.
    pub fn is_directional(&self) -> bool {
        self.directional_value != 0.0
    }
}

pub struct EvidenceScorer<'a> {
    config: &'a ScoringConfig,
    classifier: &'a dyn SourceClassifier,
}

impl<'a> EvidenceScorer<'a> {
    pub fn new(config: &'a ScoringConfig, classifier: &'a dyn SourceClassifier) -> Self {
        Self { config, classifier }
    }

    pub fn score(&self, item: &EvidenceItem, now: DateTime<Utc>) -> EvidenceScore {
        let cfg = self.config;

        let age_hours = age_hours(&item.timestamp, now).unwrap_or(cfg.stale_age_hours);
        let recency = half_life_decay(age_hours, cfg.half_life_hours);

        let host = item.source_host();
        let source_bonus = host
            .as_deref()
            .map(|h| self.classifier.prior_bonus(h))
            .filter(|b| b.is_finite() && *b >= 0.0)
            .unwrap_or(0.0);

        let reliability_norm = pct_to_unit(item.reliability);
        let stance_confidence_norm =
            pct_to_unit(item.stance_confidence.unwrap_or(cfg.default_stance_confidence));

        let base_weight = cfg.reliability_weight * reliability_norm
            + cfg.recency_weight * recency
            + cfg.stance_confidence_weight * stance_confidence_norm
            + cfg.floor_weight;
        let weight = base_weight * (1.0 + source_bonus);

        EvidenceScore {
            id: item.id.clone(),
            host,
            stance: item.stance,
            directional_value: item.stance.directional_value(),
            age_hours,
            recency,
            reliability_norm,
            stance_confidence_norm,
            source_bonus,
            base_weight,
            weight,
        }
    }

    /// Score every item exactly once, preserving input order.
    pub fn score_all(&self, items: &[EvidenceItem], now: DateTime<Utc>) -> Vec<EvidenceScore> {
        items.iter().map(|item| self.score(item, now)).collect()
    }
}

/// Parse an evidence timestamp as UTC.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Hours between `raw` and `now`, floored at 0. `None` if `raw` does not parse.
pub fn age_hours(raw: &str, now: DateTime<Utc>) -> Option<f64> {
    let ts = parse_timestamp(raw)?;
    let millis = (now - ts).num_milliseconds() as f64;
    Some((millis / 3_600_000.0).max(0.0))
}
