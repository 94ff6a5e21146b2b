//! Evidence sufficiency and consensus scoring.
//!
//! The score is the sum of four capped components (count, reliability,
//! consensus, spread). A hard downgrade rule forces `low` on thin or unreliable
//! evidence and on wide spreads.

use serde::Serialize;

use crate::domain::{ConfidenceConfig, ConfidenceLabel};
use crate::evidence::EvidenceScore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confidence {
    /// `[0, 100]`.
    pub score: f64,
    pub label: ConfidenceLabel,
    /// Share of directional items on the minority side of a strong split, `[0, 1]`.
    pub disagreement: f64,
    /// Directional item count.
    pub n: usize,
    /// Mean reliability (`[0, 100]`) over directional items.
    pub avg_reliability: f64,
    pub spread_penalty: f64,
    pub downgraded: bool,
}

pub fn estimate(scores: &[EvidenceScore], spread: Option<f64>, config: &ConfidenceConfig) -> Confidence {
    let directional: Vec<&EvidenceScore> = scores.iter().filter(|s| s.is_directional()).collect();
    let n = directional.len();

    let avg_reliability = if n == 0 {
        0.0
    } else {
        directional.iter().map(|s| s.reliability_norm * 100.0).sum::<f64>() / n as f64
    };

    let supports = directional
        .iter()
        .filter(|s| s.directional_value > config.consensus_threshold)
        .count();
    let contradicts = directional
        .iter()
        .filter(|s| s.directional_value < -config.consensus_threshold)
        .count();
    let disagreement = if n == 0 {
        1.0
    } else {
        supports.min(contradicts) as f64 / n as f64
    };

    let spread_penalty = spread_penalty(spread, config.spread_reference);

    let mut score = (n as f64 * config.points_per_item).clamp(0.0, config.count_cap)
        + (avg_reliability * config.reliability_factor).clamp(0.0, config.reliability_cap)
        + (1.0 - disagreement) * config.consensus_points
        + (1.0 - spread_penalty) * config.spread_points;
    score = score.clamp(0.0, 100.0);

    let mut label = if score >= config.high_threshold {
        ConfidenceLabel::High
    } else if score >= config.med_threshold {
        ConfidenceLabel::Med
    } else {
        ConfidenceLabel::Low
    };

    let downgraded = n < config.min_items
        || avg_reliability < config.min_avg_reliability
        || spread_penalty > config.max_spread_penalty;
    if downgraded {
        label = ConfidenceLabel::Low;
        score = score.min(config.downgrade_score_cap);
    }

    Confidence {
        score,
        label,
        disagreement,
        n,
        avg_reliability,
        spread_penalty,
        downgraded,
    }
}

/// `clamp(spread / reference, 0, 1)`; absent or non-finite spread is no penalty.
fn spread_penalty(spread: Option<f64>, reference: f64) -> f64 {
    match spread {
        Some(s) if s.is_finite() => (s / reference).clamp(0.0, 1.0),
        _ => 0.0,
    }
}
