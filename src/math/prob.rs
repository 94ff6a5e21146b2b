//! Probability-space primitives.
//!
//! Probabilities entering log-odds space are first pulled into
//! `[PROB_FLOOR, PROB_CEIL]` so `logit` never sees 0 or 1.

/// Lowest probability the engine ever emits or takes a logit of.
pub const PROB_FLOOR: f64 = 0.01;

/// Highest probability the engine ever emits or takes a logit of.
pub const PROB_CEIL: f64 = 0.99;

/// Clamp a probability into `[PROB_FLOOR, PROB_CEIL]`.
///
/// Callers must reject non-finite input first; NaN passes through `f64::clamp`.
pub fn clamp_prob(p: f64) -> f64 {
    p.clamp(PROB_FLOOR, PROB_CEIL)
}

/// `ln(p / (1 - p))`.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Inverse logit (sigmoid): `1 / (1 + e^-x)`.
pub fn inv_logit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Exponential decay with the given half-life: `0.5 ^ (age / half_life)`.
///
/// Equals 1 at `age = 0`, 0.5 at one half-life, and approaches 0 from above.
pub fn half_life_decay(age: f64, half_life: f64) -> f64 {
    0.5_f64.powf(age.max(0.0) / half_life)
}

/// Clamp a `[0, 100]` percentage and normalize it to `[0, 1]`.
///
/// Non-finite input is treated as 0.
pub fn pct_to_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0) / 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logit_round_trips_through_sigmoid() {
        for &p in &[0.01, 0.2, 0.5, 0.73, 0.99] {
            let back = inv_logit(logit(p));
            assert!((back - p).abs() < 1e-12, "p={p} came back as {back}");
        }
    }

    #[test]
    fn decay_hits_half_at_one_half_life() {
        assert_eq!(half_life_decay(0.0, 24.0), 1.0);
        assert!((half_life_decay(24.0, 24.0) - 0.5).abs() < 1e-12);
        assert!((half_life_decay(72.0, 24.0) - 0.125).abs() < 1e-12);
        let stale = half_life_decay(999.0, 24.0);
        assert!(stale > 0.0 && stale < 1e-9);
    }

    #[test]
    fn negative_age_is_treated_as_fresh() {
        assert_eq!(half_life_decay(-5.0, 24.0), 1.0);
    }

    #[test]
    fn pct_to_unit_clamps() {
        assert_eq!(pct_to_unit(150.0), 1.0);
        assert_eq!(pct_to_unit(-3.0), 0.0);
        assert_eq!(pct_to_unit(f64::NAN), 0.0);
        assert!((pct_to_unit(60.0) - 0.6).abs() < 1e-12);
    }
}
