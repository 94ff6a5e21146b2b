//! Combine scored evidence into one log-odds adjustment.

use serde::Serialize;

use crate::domain::ScoringConfig;
use crate::evidence::EvidenceScore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    /// `Σ weight * directional_value` over directional items (unbounded).
    pub total_delta: f64,
    /// Mean normalized reliability over **all** items, scaled to `[0, 100]`.
    pub avg_reliability: f64,
    /// `conflict_penalty` when strong support and strong contradiction coexist, else 1.
    pub conflict_penalty: f64,
    pub strong_supports: usize,
    pub strong_contradicts: usize,
}

impl Aggregate {
    /// Delta after the conflict penalty; this is what moves the logit.
    pub fn adjusted_delta(&self) -> f64 {
        self.total_delta * self.conflict_penalty
    }

    pub fn is_conflicted(&self) -> bool {
        self.strong_supports > 0 && self.strong_contradicts > 0
    }
}

pub fn aggregate(scores: &[EvidenceScore], config: &ScoringConfig) -> Aggregate {
    let mut total_delta = 0.0;
    let mut strong_supports = 0;
    let mut strong_contradicts = 0;

    for s in scores.iter().filter(|s| s.is_directional()) {
        total_delta += s.contribution();
        if s.directional_value >= config.strong_threshold {
            strong_supports += 1;
        }
        if s.directional_value <= -config.strong_threshold {
            strong_contradicts += 1;
        }
    }

    let avg_reliability = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.reliability_norm).sum::<f64>() / scores.len() as f64 * 100.0
    };

    let conflict_penalty = if strong_supports > 0 && strong_contradicts > 0 {
        config.conflict_penalty
    } else {
        1.0
    };

    Aggregate {
        total_delta,
        avg_reliability,
        conflict_penalty,
        strong_supports,
        strong_contradicts,
    }
}
