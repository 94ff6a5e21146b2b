//! Maximum permitted deviation for the assistant path.
//!
//! Tiers (first match wins):
//!
//! 1. `>= 3` strong items on one side averaging `>= 80` reliability: `0.25`
//! 2. `< 2` directional items or average reliability `< 55`: `0.03`
//! 3. `< 4` directional items or average reliability `< 70`: `0.08`
//! 4. otherwise: `0.15`

use crate::domain::{CalibrationConfig, EvidenceItem};
use crate::math::{PROB_CEIL, PROB_FLOOR};

pub fn compute_max_shift(items: &[EvidenceItem], config: &CalibrationConfig) -> f64 {
    let env = &config.envelope;
    let strong = config.scoring.strong_threshold;

    let directional: Vec<&EvidenceItem> = items.iter().filter(|e| e.stance.is_directional()).collect();
    let n = directional.len();

    let strong_side_qualifies = |pick: &dyn Fn(f64) -> bool| {
        let side: Vec<f64> = directional
            .iter()
            .filter(|e| pick(e.stance.directional_value()))
            .map(|e| e.reliability_clamped())
            .collect();
        side.len() >= env.strong_min_count && mean(&side) >= env.strong_min_reliability
    };
    if strong_side_qualifies(&|v: f64| v >= strong) || strong_side_qualifies(&|v: f64| v <= -strong) {
        return env.strong_shift;
    }

    let avg_rel = mean(&directional.iter().map(|e| e.reliability_clamped()).collect::<Vec<_>>());
    if n < env.tight_min_items || avg_rel < env.tight_min_reliability {
        return env.tight_shift;
    }
    if n < env.moderate_min_items || avg_rel < env.moderate_min_reliability {
        return env.moderate_shift;
    }
    env.default_shift
}

/// Adjacent float to a positive `x`, one ulp up or down.
fn ulp_step(x: f64, up: bool) -> f64 {
    let bits = x.to_bits();
    f64::from_bits(if up { bits + 1 } else { bits - 1 })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Closed interval the assistant's probability is forced into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub prior: f64,
    pub max_shift: f64,
    pub lo: f64,
    pub hi: f64,
}

impl Envelope {
    /// Bounds are pulled inward until `|bound - prior| <= max_shift` holds
    /// exactly in `f64`; `prior ± max_shift` alone can round one ulp outside.
    pub fn new(prior: f64, max_shift: f64) -> Self {
        let mut lo = (prior - max_shift).max(PROB_FLOOR);
        let mut hi = (prior + max_shift).min(PROB_CEIL);
        while prior - lo > max_shift {
            lo = ulp_step(lo, true);
        }
        while hi - prior > max_shift {
            hi = ulp_step(hi, false);
        }
        Self {
            prior,
            max_shift,
            lo,
            hi,
        }
    }

    pub fn clamp(&self, p: f64) -> f64 {
        p.clamp(self.lo, self.hi)
    }

    pub fn contains(&self, p: f64) -> bool {
        (self.lo..=self.hi).contains(&p)
    }
}
