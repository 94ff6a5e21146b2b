//! Blend the market prior with the evidence signal.
//!
//! The evidence delta is added to the prior in log-odds space, mapped back
//! through the sigmoid, and the move is then shrunk toward the prior in
//! probability space by a confidence-dependent factor.

use crate::domain::{ConfidenceLabel, ShrinkFactors};
use crate::math::{clamp_prob, inv_logit, logit};

/// Return the calibrated model probability in `[0.01, 0.99]`.
///
/// Total for finite inputs. A zero adjusted delta returns the clamped prior
/// exactly rather than a logit round-trip of it.
pub fn calibrate(
    market_prob: f64,
    total_delta: f64,
    conflict_penalty: f64,
    label: ConfidenceLabel,
    shrink: &ShrinkFactors,
) -> f64 {
    let p = clamp_prob(market_prob);
    let adjusted_delta = total_delta * conflict_penalty;
    if adjusted_delta == 0.0 {
        return p;
    }

    let q_raw = inv_logit(logit(p) + adjusted_delta);
    let q = p + shrink.for_label(label) * (q_raw - p);
    clamp_prob(q)
}
