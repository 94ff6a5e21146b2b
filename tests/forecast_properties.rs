//! Properties of both forecast paths over seeded random evidence sets.

use std::cell::{Cell, RefCell};

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;

use forecast_calibrator::domain::{CalibrationConfig, ConfidenceLabel, EvidenceItem, MarketSnapshot, Stance};
use forecast_calibrator::evidence::parse_timestamp;
use forecast_calibrator::forecast::{ForecastEngine, compute_deterministic_forecast};
use forecast_calibrator::guardrail::{
    AssistantTransport, RetryState, TransportError, compute_assistant_forecast, compute_max_shift,
};
use forecast_calibrator::math::clamp_prob;

const HOSTS: [&str; 6] = [
    "https://www.bls.gov/news",
    "https://www.reuters.com/markets",
    "https://treasury.gov/press",
    "https://www.bloomberg.com/news",
    "https://substack.com/p/take",
    "not a url",
];

fn now() -> DateTime<Utc> {
    parse_timestamp("2025-01-10T12:00:00Z").unwrap()
}

fn random_item(rng: &mut StdRng, i: usize, stances: &[Stance]) -> EvidenceItem {
    let stance = stances[rng.gen_range(0..stances.len())];
    let reliability = match rng.gen_range(0..10) {
        0 => -20.0,
        1 => 150.0,
        _ => rng.gen_range(0.0..=100.0),
    };
    let timestamp = if rng.gen_range(0..12) == 0 {
        "yesterday-ish".to_string()
    } else {
        (now() - Duration::minutes(rng.gen_range(0..10_000))).to_rfc3339()
    };

    let mut item = EvidenceItem::new(format!("ev-{}", i + 1), stance, reliability, timestamp)
        .with_url(HOSTS[rng.gen_range(0..HOSTS.len())])
        .with_title(format!("Item {}", i + 1));
    if rng.r#gen::<bool>() {
        item = item.with_stance_confidence(rng.gen_range(0.0..=100.0));
    }
    item
}

fn random_set(rng: &mut StdRng, stances: &[Stance], max_len: usize) -> Vec<EvidenceItem> {
    let n = rng.gen_range(0..=max_len);
    (0..n).map(|i| random_item(rng, i, stances)).collect()
}

fn random_market(rng: &mut StdRng) -> MarketSnapshot {
    let p = match rng.gen_range(0..8) {
        0 => 0.0,
        1 => 1.0,
        _ => rng.gen_range(0.0..=1.0),
    };
    let mut market = MarketSnapshot::new(p);
    if rng.r#gen::<bool>() {
        market.spread = Some(rng.gen_range(0.0..0.1));
    }
    market
}

/// Replays canned replies and counts calls.
struct Scripted {
    replies: RefCell<Vec<Result<String, TransportError>>>,
    calls: Cell<usize>,
}

impl Scripted {
    fn new(replies: Vec<Result<String, TransportError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().rev().collect()),
            calls: Cell::new(0),
        }
    }

    fn always(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string()); 5])
    }
}

impl AssistantTransport for Scripted {
    fn invoke(&self, _system_prompt: &str, _user_payload: &str) -> Result<String, TransportError> {
        self.calls.set(self.calls.get() + 1);
        self.replies.borrow_mut().pop().unwrap_or(Err(TransportError::EmptyResponse))
    }
}

#[test]
fn deterministic_probability_is_bounded() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
        let market = random_market(&mut rng);
        let items = random_set(&mut rng, &Stance::ALL, 12);
        let r = compute_deterministic_forecast(&market, &items, now()).unwrap();
        assert!((0.01..=0.99).contains(&r.model_prob), "modelProb={}", r.model_prob);
        assert!((0.0..=100.0).contains(&r.confidence_score));
        assert_eq!(r.delta, r.model_prob - r.market_prob);
    }
}

#[test]
fn assistant_output_never_leaves_the_envelope() {
    let mut rng = StdRng::seed_from_u64(23);
    let config = CalibrationConfig::default();
    for _ in 0..300 {
        let market = random_market(&mut rng);
        let items = random_set(&mut rng, &Stance::ALL, 12);
        let emitted = match rng.gen_range(0..4) {
            0 => 0.0,
            1 => 1.0,
            2 => -3.0,
            _ => rng.gen_range(0.0..=1.0),
        };
        let transport = Scripted::always(&format!(
            r#"{{"model_prob_0_1": {emitted}, "overall_confidence": 140, "top_drivers": [], "notes": "n"}}"#
        ));

        let r = compute_assistant_forecast(&market, &items, &transport, now()).unwrap();
        let max_shift = compute_max_shift(&items, &config);
        assert_eq!(r.max_shift, max_shift);
        assert!((0.01..=0.99).contains(&r.model_prob));
        assert!(
            (r.model_prob - r.market_prob).abs() <= max_shift,
            "p={} q={} max_shift={max_shift}",
            r.market_prob,
            r.model_prob
        );
        assert!((0.0..=100.0).contains(&r.overall_confidence));
        assert_eq!(transport.calls.get(), 1);
    }
}

#[test]
fn persistent_banned_phrasing_is_retried_only_once() {
    let transport = Scripted::always(r#"{"model_prob_0_1": 0.45, "notes": "No data yet, hard to say"}"#);
    let items = vec![EvidenceItem::new("ev-1", Stance::Supports, 80.0, "2025-01-10T10:00:00Z")];
    let run = ForecastEngine::default()
        .assistant(&MarketSnapshot::new(0.4), &items, &transport, now())
        .unwrap();
    assert_eq!(transport.calls.get(), 2);
    assert_eq!(run.trace.retry, RetryState::Retried);
    assert!(run.trace.banned_after_retry);
    // single item: envelope is 0.03
    assert!((run.result.model_prob - 0.43).abs() < 1e-12);
}

#[test]
fn unusable_assistant_falls_back_to_prior() {
    let mut rng = StdRng::seed_from_u64(5);
    let failures: Vec<Result<String, TransportError>> = vec![
        Err(TransportError::Timeout),
        Err(TransportError::Status(500)),
        Ok("I think it's about 60%".to_string()),
        Ok(r#"{"overall_confidence": 50}"#.to_string()),
        Ok(r#"["model_prob_0_1", 0.6]"#.to_string()),
    ];
    for failure in failures {
        let market = random_market(&mut rng);
        let items = random_set(&mut rng, &Stance::ALL, 8);
        let transport = Scripted::new(vec![failure]);
        let r = compute_assistant_forecast(&market, &items, &transport, now()).unwrap();
        assert_eq!(r.model_prob, clamp_prob(market.market_prob));
        assert_eq!(r.delta, 0.0);
        assert_eq!(transport.calls.get(), 1);
        assert!(r.top_drivers.len() <= 4);
        assert!(r.top_drivers.iter().all(|d| d.reason.chars().count() <= 160));
        let lowered = r.rationale.to_lowercase();
        assert!(!lowered.contains("prior") && !lowered.contains("evidence count"));
    }
}

#[test]
fn neutral_evidence_leaves_the_prior_untouched() {
    let mut rng = StdRng::seed_from_u64(31);
    let neutral = [Stance::Neutral, Stance::Irrelevant, Stance::Uncertain];
    for _ in 0..200 {
        let market = random_market(&mut rng);
        let items = random_set(&mut rng, &neutral, 10);
        let r = compute_deterministic_forecast(&market, &items, now()).unwrap();
        assert_eq!(r.model_prob, clamp_prob(market.market_prob));
        assert_eq!(r.delta, 0.0);
    }
}

#[test]
fn more_reliable_support_never_lowers_the_forecast() {
    let mut rng = StdRng::seed_from_u64(47);
    let supporting = [Stance::Supports, Stance::WeakSupports];
    for _ in 0..300 {
        let market = random_market(&mut rng);
        let mut items = random_set(&mut rng, &supporting, 8);
        if items.is_empty() {
            continue;
        }
        let base = compute_deterministic_forecast(&market, &items, now()).unwrap();

        let k = rng.gen_range(0..items.len());
        let current = items[k].reliability_clamped();
        items[k].reliability = rng.gen_range(current..=100.0);
        let raised = compute_deterministic_forecast(&market, &items, now()).unwrap();

        assert!(
            raised.model_prob >= base.model_prob,
            "raising reliability moved {} -> {}",
            base.model_prob,
            raised.model_prob
        );
    }
}

#[test]
fn fewer_than_two_directional_items_downgrade_confidence() {
    let mut rng = StdRng::seed_from_u64(59);
    let neutral = [Stance::Neutral, Stance::Irrelevant, Stance::Uncertain];
    for _ in 0..200 {
        let market = random_market(&mut rng);
        let mut items = random_set(&mut rng, &neutral, 6);
        if rng.r#gen::<bool>() {
            let mut strong = random_item(&mut rng, items.len(), &[Stance::Supports, Stance::Contradicts]);
            strong.reliability = 100.0;
            items.push(strong);
        }
        let r = compute_deterministic_forecast(&market, &items, now()).unwrap();
        assert_eq!(r.confidence_label, ConfidenceLabel::Low);
        assert!(r.confidence_score <= 40.0);
    }
}

#[test]
fn strong_contradiction_dampens_the_shift() {
    let mut rng = StdRng::seed_from_u64(71);
    for _ in 0..200 {
        // a wide spread pins both runs to the same (low) shrink factor
        let market = MarketSnapshot::new(rng.gen_range(0.2..0.8)).with_spread(0.05);
        let ts = (now() - Duration::hours(rng.gen_range(0..48))).to_rfc3339();
        let support_rel = rng.gen_range(60.0..=100.0);

        let support = EvidenceItem::new("ev-1", Stance::Supports, support_rel, ts.clone())
            .with_url("https://www.reuters.com/a")
            .with_stance_confidence(80.0);
        let contradiction = EvidenceItem::new("ev-2", Stance::Contradicts, rng.gen_range(0.0..=support_rel), ts)
            .with_url("https://substack.com/b")
            .with_stance_confidence(80.0);

        let alone = compute_deterministic_forecast(&market, &[support.clone()], now()).unwrap();
        let conflicted = compute_deterministic_forecast(&market, &[support, contradiction], now()).unwrap();
        assert!(conflicted.delta.abs() < alone.delta.abs());
    }
}

#[test]
fn reliable_recent_support_beats_stale_blog_contradiction() {
    let items = vec![
        EvidenceItem::new("ev-1", Stance::Supports, 90.0, "2025-01-10T11:00:00Z")
            .with_url("https://www.reuters.com/markets/fed")
            .with_stance_confidence(80.0),
        EvidenceItem::new("ev-2", Stance::Contradicts, 40.0, "2025-01-07T14:00:00Z")
            .with_url("https://someblog.example.com/post")
            .with_stance_confidence(50.0),
    ];
    let r = compute_deterministic_forecast(&MarketSnapshot::new(0.40), &items, now()).unwrap();
    assert!(r.model_prob > 0.40);
    assert!(r.delta > 0.0);
}

#[test]
fn empty_evidence_keeps_the_market_probability() {
    let r = compute_deterministic_forecast(&MarketSnapshot::new(0.73), &[], now()).unwrap();
    assert_eq!(r.model_prob, 0.73);
    assert_eq!(r.delta, 0.0);
    assert_eq!(r.confidence_label, ConfidenceLabel::Low);

    let transport = Scripted::always(r#"{"model_prob_0_1": 0.99}"#);
    let a = compute_assistant_forecast(&MarketSnapshot::new(0.73), &[], &transport, now()).unwrap();
    assert_eq!(a.max_shift, 0.03);
    assert!((a.model_prob - 0.76).abs() < 1e-12);
}
