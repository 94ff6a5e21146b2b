//! Synthetic evidence sets for exercising the calibration without collaborators.
//!
//! Each set has a latent `lean` in `[-1, 1]`: positive values make supporting
//! stances more likely, negative values contradicting ones. Reliability and
//! stance confidence are drawn from clamped normals, ages from an exponential.

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal};

use crate::domain::{EvidenceItem, MarketSnapshot, Stance};
use crate::error::AppError;

/// Hosts drawn for synthetic items, spanning every source tier.
const HOSTS: [(&str, &str); 8] = [
    ("bls.gov", "BLS"),
    ("federalreserve.gov", "Federal Reserve"),
    ("stlouisfed.org", "St. Louis Fed"),
    ("reuters.com", "Reuters"),
    ("apnews.com", "AP"),
    ("bloomberg.com", "Bloomberg"),
    ("substack.com", "Newsletter"),
    ("blog.example.com", "Blog"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub seed: u64,
    pub count: usize,
    pub market_prob: f64,
    pub spread: Option<f64>,
    /// Latent direction of the evidence, `[-1, 1]`.
    pub lean: f64,
    /// Probability that an item carries no direction at all.
    pub noise_share: f64,
    pub mean_reliability: f64,
    pub mean_age_hours: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            count: 8,
            market_prob: 0.5,
            spread: Some(0.02),
            lean: 0.3,
            noise_share: 0.25,
            mean_reliability: 70.0,
            mean_age_hours: 36.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleEvidence {
    pub market: MarketSnapshot,
    pub items: Vec<EvidenceItem>,
}

pub fn generate_sample(config: &SampleConfig, now: DateTime<Utc>) -> Result<SampleEvidence, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(config.market_prob.is_finite() && (0.0..=1.0).contains(&config.market_prob)) {
        return Err(AppError::new(2, "Sample market probability must be in [0, 1]."));
    }
    if !(config.lean.is_finite() && (-1.0..=1.0).contains(&config.lean)) {
        return Err(AppError::new(2, "Sample lean must be in [-1, 1]."));
    }
    if !(0.0..1.0).contains(&config.noise_share) {
        return Err(AppError::new(2, "Sample noise share must be in [0, 1)."));
    }
    if !(config.mean_age_hours.is_finite() && config.mean_age_hours > 0.0) {
        return Err(AppError::new(2, "Sample mean age must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let reliability = Normal::new(config.mean_reliability, 15.0)
        .map_err(|e| AppError::new(4, format!("Reliability distribution error: {e}")))?;
    let stance_confidence = Normal::<f64>::new(65.0, 15.0)
        .map_err(|e| AppError::new(4, format!("Stance confidence distribution error: {e}")))?;
    let age = Exp::new(1.0 / config.mean_age_hours)
        .map_err(|e| AppError::new(4, format!("Age distribution error: {e}")))?;

    let mut items = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let stance = sample_stance(&mut rng, config.lean, config.noise_share);
        let (host, source_name) = HOSTS[rng.gen_range(0..HOSTS.len())];
        let age_hours: f64 = age.sample(&mut rng);
        let timestamp = now - Duration::minutes((age_hours * 60.0).round() as i64);

        let mut item = EvidenceItem::new(
            format!("ev-{:03}", i + 1),
            stance,
            reliability.sample(&mut rng).clamp(5.0, 99.0).round(),
            timestamp.to_rfc3339(),
        )
        .with_url(format!("https://{host}/story/{}", i + 1))
        .with_title(format!("{source_name} item {}", i + 1))
        .with_stance_confidence(stance_confidence.sample(&mut rng).clamp(10.0, 99.0).round());
        item.source_name = source_name.to_string();
        items.push(item);
    }

    let mut market = MarketSnapshot::new(config.market_prob);
    market.market_id = format!("demo-{}", config.seed);
    market.title = "Synthetic market".to_string();
    market.spread = config.spread;

    Ok(SampleEvidence { market, items })
}

fn sample_stance(rng: &mut StdRng, lean: f64, noise_share: f64) -> Stance {
    let roll: f64 = rng.r#gen();
    if roll < noise_share {
        return [Stance::Neutral, Stance::Irrelevant, Stance::Uncertain][rng.gen_range(0..3)];
    }

    let p_support = 0.5 * (1.0 + lean);
    let supports = rng.r#gen::<f64>() < p_support;
    let strong = rng.r#gen::<f64>() < 0.6;
    match (supports, strong) {
        (true, true) => Stance::Supports,
        (true, false) => Stance::WeakSupports,
        (false, true) => Stance::Contradicts,
        (false, false) => Stance::WeakContradicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::parse_timestamp;

    fn now() -> DateTime<Utc> {
        parse_timestamp("2025-01-10T12:00:00Z").unwrap()
    }

    #[test]
    fn same_seed_same_sample() {
        let config = SampleConfig::default();
        let a = generate_sample(&config, now()).unwrap();
        let b = generate_sample(&config, now()).unwrap();
        assert_eq!(a.items, b.items);
        assert_eq!(a.items.len(), 8);
    }

    #[test]
    fn values_stay_in_range() {
        let config = SampleConfig {
            count: 200,
            ..SampleConfig::default()
        };
        let sample = generate_sample(&config, now()).unwrap();
        for item in &sample.items {
            assert!((5.0..=99.0).contains(&item.reliability));
            let sc = item.stance_confidence.unwrap();
            assert!((10.0..=99.0).contains(&sc));
            assert!(parse_timestamp(&item.timestamp).unwrap() <= now());
            assert!(item.source_host().is_some());
        }
    }

    #[test]
    fn full_lean_only_supports() {
        let config = SampleConfig {
            count: 50,
            lean: 1.0,
            noise_share: 0.0,
            ..SampleConfig::default()
        };
        let sample = generate_sample(&config, now()).unwrap();
        assert!(sample.items.iter().all(|e| e.stance.directional_value() > 0.0));
    }

    #[test]
    fn rejects_bad_config() {
        let bad = SampleConfig {
            count: 0,
            ..SampleConfig::default()
        };
        assert_eq!(generate_sample(&bad, now()).unwrap_err().exit_code(), 2);
        let bad = SampleConfig {
            lean: 2.0,
            ..SampleConfig::default()
        };
        assert!(generate_sample(&bad, now()).is_err());
    }
}
