//! Calibration constants.
//!
//! Every tunable number of the engine lives here. `Default` reproduces the
//! production values; a JSON file may override any subset of them
//! (missing keys keep their defaults).

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ConfidenceLabel;
use crate::error::AppError;

/// Per-item weighting constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Recency half-life in hours.
    pub half_life_hours: f64,
    /// Age assigned to items whose timestamp cannot be parsed.
    pub stale_age_hours: f64,
    /// Stance confidence assumed when the classifier gave none.
    pub default_stance_confidence: f64,
    pub reliability_weight: f64,
    pub recency_weight: f64,
    pub stance_confidence_weight: f64,
    /// Constant term; every directional item contributes at least this much.
    pub floor_weight: f64,
    /// `|directional value|` at or above which an item counts as strong.
    pub strong_threshold: f64,
    /// Multiplier applied to the total delta when strong evidence conflicts.
    pub conflict_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 24.0,
            stale_age_hours: 999.0,
            default_stance_confidence: 60.0,
            reliability_weight: 0.4,
            recency_weight: 0.3,
            stance_confidence_weight: 0.2,
            floor_weight: 0.1,
            strong_threshold: 0.8,
            conflict_penalty: 0.6,
        }
    }
}

/// Confidence score components, label thresholds and the hard downgrade rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// `|directional value|` above which an item counts toward consensus/disagreement.
    pub consensus_threshold: f64,
    pub points_per_item: f64,
    pub count_cap: f64,
    pub reliability_factor: f64,
    pub reliability_cap: f64,
    pub consensus_points: f64,
    pub spread_points: f64,
    /// Spread (probability points) treated as fully bad.
    pub spread_reference: f64,
    pub high_threshold: f64,
    pub med_threshold: f64,
    pub min_items: usize,
    pub min_avg_reliability: f64,
    pub max_spread_penalty: f64,
    pub downgrade_score_cap: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.75,
            points_per_item: 10.0,
            count_cap: 30.0,
            reliability_factor: 0.4,
            reliability_cap: 30.0,
            consensus_points: 20.0,
            spread_points: 20.0,
            spread_reference: 0.05,
            high_threshold: 70.0,
            med_threshold: 45.0,
            min_items: 2,
            min_avg_reliability: 50.0,
            max_spread_penalty: 0.8,
            downgrade_score_cap: 40.0,
        }
    }
}

/// How far the evidence signal may pull the forecast away from the prior,
/// per confidence label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkFactors {
    pub high: f64,
    pub med: f64,
    pub low: f64,
}

impl Default for ShrinkFactors {
    fn default() -> Self {
        Self {
            high: 0.7,
            med: 0.5,
            low: 0.3,
        }
    }
}

impl ShrinkFactors {
    pub fn for_label(&self, label: ConfidenceLabel) -> f64 {
        match label {
            ConfidenceLabel::High => self.high,
            ConfidenceLabel::Med => self.med,
            ConfidenceLabel::Low => self.low,
        }
    }
}

/// Tiered maximum deviation for the assistant path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub strong_min_count: usize,
    pub strong_min_reliability: f64,
    pub strong_shift: f64,
    pub tight_min_items: usize,
    pub tight_min_reliability: f64,
    pub tight_shift: f64,
    pub moderate_min_items: usize,
    pub moderate_min_reliability: f64,
    pub moderate_shift: f64,
    pub default_shift: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            strong_min_count: 3,
            strong_min_reliability: 80.0,
            strong_shift: 0.25,
            tight_min_items: 2,
            tight_min_reliability: 55.0,
            tight_shift: 0.03,
            moderate_min_items: 4,
            moderate_min_reliability: 70.0,
            moderate_shift: 0.08,
            default_shift: 0.15,
        }
    }
}

/// Hard ceiling on drivers in any assistant result.
pub const MAX_TOP_DRIVERS: usize = 5;

/// Size limits on assistant input and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLimits {
    pub max_drivers: usize,
    pub fallback_drivers: usize,
    pub reason_chars: usize,
    pub notes_chars: usize,
    pub snippet_chars: usize,
    /// Evidence items included in the assistant payload.
    pub payload_items: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            max_drivers: 5,
            fallback_drivers: 4,
            reason_chars: 160,
            notes_chars: 240,
            snippet_chars: 400,
            payload_items: 12,
        }
    }
}

/// All calibration constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub scoring: ScoringConfig,
    pub confidence: ConfidenceConfig,
    pub shrink: ShrinkFactors,
    pub envelope: EnvelopeConfig,
    pub limits: OutputLimits,
}

impl CalibrationConfig {
    /// Read overrides from a JSON file and validate the merged result.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::new(2, format!("Failed to open config '{}': {e}", path.display())))?;
        let config: CalibrationConfig = serde_json::from_reader(file)
            .map_err(|e| AppError::new(2, format!("Invalid config JSON '{}': {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let s = &self.scoring;
        if !(s.half_life_hours.is_finite() && s.half_life_hours > 0.0) {
            return Err(AppError::new(2, "half_life_hours must be finite and > 0."));
        }
        if !(s.stale_age_hours.is_finite() && s.stale_age_hours >= 0.0) {
            return Err(AppError::new(2, "stale_age_hours must be finite and >= 0."));
        }
        let weights = [
            s.reliability_weight,
            s.recency_weight,
            s.stance_confidence_weight,
            s.floor_weight,
        ];
        if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            return Err(AppError::new(2, "Scoring weights must be finite and >= 0."));
        }
        if s.floor_weight <= 0.0 {
            return Err(AppError::new(2, "floor_weight must be > 0."));
        }
        if !(0.0..=1.0).contains(&s.conflict_penalty) {
            return Err(AppError::new(2, "conflict_penalty must be in [0, 1]."));
        }
        if !(0.0..=100.0).contains(&s.default_stance_confidence) {
            return Err(AppError::new(2, "default_stance_confidence must be in [0, 100]."));
        }

        let c = &self.confidence;
        if !(c.spread_reference.is_finite() && c.spread_reference > 0.0) {
            return Err(AppError::new(2, "spread_reference must be finite and > 0."));
        }
        if c.med_threshold > c.high_threshold {
            return Err(AppError::new(2, "med_threshold must not exceed high_threshold."));
        }

        let shrink = [self.shrink.low, self.shrink.med, self.shrink.high];
        if shrink.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(AppError::new(2, "Shrink factors must be in [0, 1]."));
        }

        let e = &self.envelope;
        let shifts = [e.strong_shift, e.tight_shift, e.moderate_shift, e.default_shift];
        if shifts.iter().any(|v| !(v.is_finite() && *v >= 0.0 && *v <= 0.98)) {
            return Err(AppError::new(2, "Envelope shifts must be in [0, 0.98]."));
        }

        let l = &self.limits;
        if l.max_drivers == 0 || l.reason_chars == 0 {
            return Err(AppError::new(2, "Driver limits must be > 0."));
        }
        if l.max_drivers > MAX_TOP_DRIVERS {
            return Err(AppError::new(2, format!("max_drivers must not exceed {MAX_TOP_DRIVERS}.")));
        }
        if l.fallback_drivers > l.max_drivers {
            return Err(AppError::new(2, "fallback_drivers must not exceed max_drivers."));
        }

        Ok(())
    }
}
