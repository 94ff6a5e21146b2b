//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - loaded from evidence/request files
//! - passed through both forecast paths as read-only views
//! - exported to JSON for the dashboard layer

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classified directional relationship of an evidence item to the YES outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Supports,
    WeakSupports,
    Contradicts,
    WeakContradicts,
    Neutral,
    Irrelevant,
    Uncertain,
}

impl Stance {
    pub const ALL: [Stance; 7] = [
        Stance::Supports,
        Stance::WeakSupports,
        Stance::Contradicts,
        Stance::WeakContradicts,
        Stance::Neutral,
        Stance::Irrelevant,
        Stance::Uncertain,
    ];

    /// Fixed directional value in `[-1, 1]`.
    pub fn directional_value(self) -> f64 {
        match self {
            Stance::Supports => 1.0,
            Stance::WeakSupports => 0.5,
            Stance::Contradicts => -1.0,
            Stance::WeakContradicts => -0.5,
            Stance::Neutral | Stance::Irrelevant | Stance::Uncertain => 0.0,
        }
    }

    /// True when the stance carries a direction (nonzero value).
    pub fn is_directional(self) -> bool {
        self.directional_value() != 0.0
    }

    /// Wire label (same as the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Supports => "supports",
            Stance::WeakSupports => "weak_supports",
            Stance::Contradicts => "contradicts",
            Stance::WeakContradicts => "weak_contradicts",
            Stance::Neutral => "neutral",
            Stance::Irrelevant => "irrelevant",
            Stance::Uncertain => "uncertain",
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Stance::ALL
            .into_iter()
            .find(|stance| stance.as_str() == normalized)
            .ok_or_else(|| format!("Unknown stance '{s}'"))
    }
}

/// One classified external source.
///
/// Numeric fields are stored as received; every consumer clamps them to their
/// declared range before use. `timestamp` is kept as the raw string so that an
/// unparseable value can be treated as maximally stale instead of rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    /// Synthesized as `ev-{n}` at ingest when missing.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub source_name: String,
    pub stance: Stance,
    /// Source trustworthiness, `[0, 100]`.
    #[serde(default)]
    pub reliability: f64,
    /// Classifier confidence in the stance label, `[0, 100]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance_confidence: Option<f64>,
    /// Publication/observation instant (RFC 3339).
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance_rationale: Option<String>,
}

impl EvidenceItem {
    /// Minimal constructor; descriptive fields start empty.
    pub fn new(id: impl Into<String>, stance: Stance, reliability: f64, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: String::new(),
            title: String::new(),
            snippet: String::new(),
            source_name: String::new(),
            stance,
            reliability,
            stance_confidence: None,
            timestamp: timestamp.into(),
            stance_rationale: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_stance_confidence(mut self, confidence: f64) -> Self {
        self.stance_confidence = Some(confidence);
        self
    }

    /// Domain of `url`, lowercased with a leading `www.` removed.
    pub fn source_host(&self) -> Option<String> {
        crate::evidence::host_from_url(&self.url)
    }

    /// Reliability clamped to `[0, 100]`; non-finite values count as 0.
    pub fn reliability_clamped(&self) -> f64 {
        if self.reliability.is_finite() {
            self.reliability.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// The pre-update belief for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    #[serde(default)]
    pub market_id: String,
    #[serde(default)]
    pub title: String,
    /// Raw market-implied probability (`0..1`).
    pub market_prob: f64,
    /// Bid/ask spread in probability points (`0.02` = 2pp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    /// Recent market move; context for the assistant only.
    #[serde(default, rename = "delta24h", skip_serializing_if = "Option::is_none")]
    pub delta_24h: Option<f64>,
}

impl MarketSnapshot {
    pub fn new(market_prob: f64) -> Self {
        Self {
            market_id: String::new(),
            title: String::new(),
            market_prob,
            spread: None,
            delta_24h: None,
        }
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = Some(spread);
        self
    }
}

/// Confidence label attached to a deterministic forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    Low,
    Med,
    High,
}

impl ConfidenceLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLabel::Low => "low",
            ConfidenceLabel::Med => "med",
            ConfidenceLabel::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the deterministic path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub market_id: String,
    pub market_title: String,
    pub computed_at: DateTime<Utc>,
    /// Clamped market prior actually used.
    pub market_prob: f64,
    pub model_prob: f64,
    pub delta: f64,
    #[serde(rename = "confidence")]
    pub confidence_label: ConfidenceLabel,
    pub confidence_score: f64,
    pub signal: f64,
    pub summary: String,
}

/// One evidence item the assistant (or the fallback ranking) cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub reason: String,
}

/// Output of the guardrail path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantForecastResult {
    pub market_id: String,
    pub market_title: String,
    pub computed_at: DateTime<Utc>,
    pub market_prob: f64,
    pub model_prob: f64,
    pub delta: f64,
    /// Envelope that was enforced on `model_prob`.
    pub max_shift: f64,
    pub overall_confidence: f64,
    pub top_drivers: Vec<Driver>,
    pub notes: String,
    pub rationale: String,
}

/// A market snapshot plus its evidence set, as read from request files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub market: MarketSnapshot,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stance_parses_loose_spellings() {
        assert_eq!("Weak-Supports".parse::<Stance>().unwrap(), Stance::WeakSupports);
        assert_eq!(" contradicts ".parse::<Stance>().unwrap(), Stance::Contradicts);
        assert!("maybe".parse::<Stance>().is_err());
    }

    #[test]
    fn only_four_stances_are_directional() {
        let directional = Stance::ALL.iter().filter(|s| s.is_directional()).count();
        assert_eq!(directional, 4);
    }

    #[test]
    fn evidence_item_reads_dashboard_json() {
        let raw = r#"{
            "id": "ev-002",
            "url": "https://www.reuters.com/fed-rate-cuts",
            "title": "Fed officials signal patience",
            "sourceName": "Reuters",
            "stance": "weak_contradicts",
            "reliability": 88,
            "stanceConfidence": 70,
            "timestamp": "2025-01-09T14:30:00Z"
        }"#;
        let item: EvidenceItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.stance, Stance::WeakContradicts);
        assert_eq!(item.stance_confidence, Some(70.0));
        assert_eq!(item.source_host().as_deref(), Some("reuters.com"));
    }

    #[test]
    fn snapshot_reads_delta_24h_key() {
        let raw = r#"{"marketProb": 0.4, "delta24h": -0.02}"#;
        let snap: MarketSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.delta_24h, Some(-0.02));
        assert!(snap.spread.is_none());
    }
}
