//! Deterministic forecast path.
//!
//! `EvidenceScorer -> aggregate -> estimate -> calibrate`, wrapped by
//! `ForecastEngine`, which owns the calibration constants and the source
//! classifier shared by both forecast paths.

use chrono::{DateTime, Utc};

use crate::domain::{CalibrationConfig, EvidenceItem, ForecastResult, MarketSnapshot};
use crate::error::ForecastError;
use crate::evidence::{DefaultSourceClassifier, EvidenceScore, EvidenceScorer, SourceClassifier};
use crate::forecast::aggregate::{Aggregate, aggregate};
use crate::forecast::calibrate::calibrate;
use crate::forecast::confidence::{Confidence, estimate};
use crate::math::clamp_prob;

/// Disagreement above which the summary notes that evidence conflicts.
const CONFLICT_NOTE_THRESHOLD: f64 = 0.4;

/// Deterministic result plus the intermediate values that produced it.
#[derive(Debug, Clone)]
pub struct DeterministicRun {
    pub result: ForecastResult,
    pub scores: Vec<EvidenceScore>,
    pub aggregate: Aggregate,
    pub confidence: Confidence,
}

pub struct ForecastEngine {
    config: CalibrationConfig,
    classifier: Box<dyn SourceClassifier>,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl ForecastEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            classifier: Box::new(DefaultSourceClassifier::default()),
        }
    }

    /// Replace the source classifier.
    pub fn with_classifier(mut self, classifier: impl SourceClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Score each item once, in input order.
    pub fn score_evidence(&self, items: &[EvidenceItem], now: DateTime<Utc>) -> Vec<EvidenceScore> {
        EvidenceScorer::new(&self.config.scoring, self.classifier.as_ref()).score_all(items, now)
    }

    pub fn deterministic(
        &self,
        market: &MarketSnapshot,
        items: &[EvidenceItem],
        now: DateTime<Utc>,
    ) -> Result<ForecastResult, ForecastError> {
        self.deterministic_run(market, items, now).map(|run| run.result)
    }

    /// Run the deterministic path and keep the intermediate breakdown.
    pub fn deterministic_run(
        &self,
        market: &MarketSnapshot,
        items: &[EvidenceItem],
        now: DateTime<Utc>,
    ) -> Result<DeterministicRun, ForecastError> {
        let p = validated_prior(market)?;

        let scores = self.score_evidence(items, now);
        let agg = aggregate(&scores, &self.config.scoring);
        let confidence = estimate(&scores, market.spread, &self.config.confidence);

        let model_prob = calibrate(
            p,
            agg.total_delta,
            agg.conflict_penalty,
            confidence.label,
            &self.config.shrink,
        );
        let delta = model_prob - p;

        let result = ForecastResult {
            market_id: market.market_id.clone(),
            market_title: market.title.clone(),
            computed_at: now,
            market_prob: p,
            model_prob,
            delta,
            confidence_label: confidence.label,
            confidence_score: confidence.score,
            signal: delta,
            summary: summarize(p, items.len(), &agg, &confidence, market.spread),
        };

        Ok(DeterministicRun {
            result,
            scores,
            aggregate: agg,
            confidence,
        })
    }
}

/// Deterministic forecast with the default constants and classifier.
pub fn compute_deterministic_forecast(
    market: &MarketSnapshot,
    items: &[EvidenceItem],
    now: DateTime<Utc>,
) -> Result<ForecastResult, ForecastError> {
    ForecastEngine::default().deterministic(market, items, now)
}

/// Reject a non-finite prior and clamp a finite one into `[0.01, 0.99]`.
pub fn validated_prior(market: &MarketSnapshot) -> Result<f64, ForecastError> {
    if !market.market_prob.is_finite() {
        return Err(ForecastError::InvalidInput(format!(
            "marketProb must be a finite number, got {}",
            market.market_prob
        )));
    }
    Ok(clamp_prob(market.market_prob))
}

fn summarize(p: f64, evidence_count: usize, agg: &Aggregate, confidence: &Confidence, spread: Option<f64>) -> String {
    let mut parts = vec![
        format!("Market prior {:.1}%", p * 100.0),
        format!(
            "Evidence count {evidence_count}, avg reliability {}%",
            agg.avg_reliability.round()
        ),
    ];
    if let Some(spread) = spread.filter(|s| s.is_finite()) {
        parts.push(format!("Spread {:.1}pp", spread * 100.0));
    }
    if confidence.disagreement > CONFLICT_NOTE_THRESHOLD {
        parts.push("Evidence conflicts -> shrink toward market".to_string());
    }
    format!(
        "Log-odds update from market prior using stance-weighted evidence. {}",
        parts.join(" | ")
    )
}
