//! Assistant forecast path.
//!
//! `ComputeEnvelope -> Invoke -> Validate -> (RetryOnce) -> Clamp -> Finalize`
//!
//! Every assistant failure (transport error, non-JSON reply, missing
//! probability) ends in the fallback terminal: `modelProb = p`, zero delta and
//! drivers ranked from the evidence. Only an invalid market prior is returned as
//! an error.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::{AssistantForecastResult, Driver, EvidenceItem, MarketSnapshot, OutputLimits};
use crate::error::ForecastError;
use crate::forecast::{ForecastEngine, validated_prior};
use crate::guardrail::drivers::{build_rationale, fallback_drivers};
use crate::guardrail::envelope::{Envelope, compute_max_shift};
use crate::guardrail::phrasing::{banned_phrases_in, contains_banned_phrase};
use crate::guardrail::prompt::{AssistantPayload, SYSTEM_PROMPT, retry_system_prompt};
use crate::guardrail::response::{ParsedForecast, parse_assistant_output};
use crate::guardrail::transport::AssistantTransport;
use crate::math::clamp_prob;

/// Whether the corrective retry has been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Initial,
    Retried,
}

/// What happened on the way to an assistant result.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailTrace {
    pub max_shift: f64,
    pub retry: RetryState,
    /// Transport invocations made (1 or 2).
    pub attempts: u8,
    /// Banned phrases found in the first reply.
    pub banned_phrases: Vec<String>,
    /// The retried reply still contained a banned phrase.
    pub banned_after_retry: bool,
    /// Probability as emitted, before any clamping.
    pub raw_model_prob: Option<f64>,
    /// The envelope or the probability bounds changed the emitted value.
    pub clamped: bool,
    /// Assistant drivers dropped for citing an unknown evidence id.
    pub dropped_drivers: usize,
    pub synthesized_drivers: bool,
    /// Set when the fallback terminal was taken.
    pub fallback: Option<ForecastError>,
}

impl GuardrailTrace {
    fn new(max_shift: f64) -> Self {
        Self {
            max_shift,
            retry: RetryState::Initial,
            attempts: 0,
            banned_phrases: Vec::new(),
            banned_after_retry: false,
            raw_model_prob: None,
            clamped: false,
            dropped_drivers: 0,
            synthesized_drivers: false,
            fallback: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AssistantRun {
    pub result: AssistantForecastResult,
    pub trace: GuardrailTrace,
}

impl ForecastEngine {
    /// Run the assistant path against `transport`.
    pub fn assistant<T: AssistantTransport + ?Sized>(
        &self,
        market: &MarketSnapshot,
        items: &[EvidenceItem],
        transport: &T,
        now: DateTime<Utc>,
    ) -> Result<AssistantRun, ForecastError> {
        let p = validated_prior(market)?;
        let limits = &self.config().limits;

        let max_shift = compute_max_shift(items, self.config());
        let envelope = Envelope::new(p, max_shift);
        let mut trace = GuardrailTrace::new(max_shift);

        let payload = AssistantPayload::build(market, p, max_shift, items, limits, now).to_json();
        let parsed = invoke_with_retry(transport, &payload, limits, &mut trace);

        let (model_prob, overall_confidence, mut top_drivers, notes) = match parsed {
            Ok(ParsedForecast {
                model_prob_raw,
                overall_confidence,
                top_drivers,
                notes,
            }) => {
                let q = envelope.clamp(clamp_prob(model_prob_raw));
                trace.raw_model_prob = Some(model_prob_raw);
                trace.clamped = !envelope.contains(model_prob_raw);
                let cited = cited_drivers(top_drivers, items, &mut trace);
                (q, overall_confidence, cited, notes)
            }
            Err(err) => {
                trace.fallback = Some(err);
                (p, 0.0, Vec::new(), String::new())
            }
        };

        if top_drivers.is_empty() {
            top_drivers = fallback_drivers(items, limits);
            trace.synthesized_drivers = !top_drivers.is_empty();
        }

        let rationale = build_rationale(&top_drivers, model_prob, p);
        let result = AssistantForecastResult {
            market_id: market.market_id.clone(),
            market_title: market.title.clone(),
            computed_at: now,
            market_prob: p,
            model_prob,
            delta: model_prob - p,
            max_shift,
            overall_confidence,
            top_drivers,
            notes,
            rationale,
        };

        Ok(AssistantRun { result, trace })
    }
}

/// Assistant forecast with the default constants and classifier.
pub fn compute_assistant_forecast<T: AssistantTransport + ?Sized>(
    market: &MarketSnapshot,
    items: &[EvidenceItem],
    transport: &T,
    now: DateTime<Utc>,
) -> Result<AssistantForecastResult, ForecastError> {
    ForecastEngine::default()
        .assistant(market, items, transport, now)
        .map(|run| run.result)
}

/// At most one corrective retry, fired only when the first reply uses banned
/// phrasing. A failed retry (transport or parse) keeps the first reply.
fn invoke_with_retry<T: AssistantTransport + ?Sized>(
    transport: &T,
    payload: &str,
    limits: &OutputLimits,
    trace: &mut GuardrailTrace,
) -> Result<ParsedForecast, ForecastError> {
    let mut state = RetryState::Initial;
    let mut first_reply = String::new();

    loop {
        trace.retry = state;
        trace.attempts += 1;

        match state {
            RetryState::Initial => {
                let reply = transport
                    .invoke(SYSTEM_PROMPT, payload)
                    .map_err(|e| ForecastError::AssistantUnavailable(e.to_string()))?;
                let banned = banned_phrases_in(&reply);
                if banned.is_empty() {
                    return parse_assistant_output(&reply, limits);
                }
                trace.banned_phrases = banned;
                first_reply = reply;
                state = RetryState::Retried;
            }
            RetryState::Retried => {
                let reply = match transport.invoke(&retry_system_prompt(), payload) {
                    Ok(reply) => reply,
                    Err(_) => return parse_assistant_output(&first_reply, limits),
                };
                trace.banned_after_retry = contains_banned_phrase(&reply);
                return parse_assistant_output(&reply, limits)
                    .or_else(|err| parse_assistant_output(&first_reply, limits).map_err(|_| err));
            }
        }
    }
}

/// Keep drivers whose id names an item in the evidence set.
fn cited_drivers(drivers: Vec<Driver>, items: &[EvidenceItem], trace: &mut GuardrailTrace) -> Vec<Driver> {
    let known: HashSet<&str> = items.iter().map(|e| e.id.as_str()).collect();
    let before = drivers.len();
    let kept: Vec<Driver> = drivers.into_iter().filter(|d| known.contains(d.id.as_str())).collect();
    trace.dropped_drivers = before - kept.len();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stance;
    use crate::evidence::parse_timestamp;
    use crate::guardrail::transport::TransportError;
    use std::cell::RefCell;

    /// Replies in order; records the system prompt of every call.
    struct Scripted {
        replies: RefCell<Vec<Result<String, TransportError>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, TransportError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().rev().map(|r| r.map(str::to_string)).collect()),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.borrow().len()
        }
    }

    impl AssistantTransport for Scripted {
        fn invoke(&self, system_prompt: &str, _user_payload: &str) -> Result<String, TransportError> {
            self.prompts.borrow_mut().push(system_prompt.to_string());
            self.replies.borrow_mut().pop().unwrap_or(Err(TransportError::EmptyResponse))
        }
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2025-01-10T12:00:00Z").unwrap()
    }

    fn evidence() -> Vec<EvidenceItem> {
        vec![
            EvidenceItem::new("ev-1", Stance::Supports, 90.0, "2025-01-10T10:00:00Z")
                .with_url("https://reuters.com/a")
                .with_title("Inflation cools"),
            EvidenceItem::new("ev-2", Stance::Contradicts, 60.0, "2025-01-08T10:00:00Z")
                .with_url("https://blog.example.com/b")
                .with_title("Hot take"),
        ]
    }

    fn run(transport: &Scripted) -> AssistantRun {
        ForecastEngine::default()
            .assistant(&MarketSnapshot::new(0.40), &evidence(), transport, now())
            .unwrap()
    }

    #[test]
    fn violating_probability_is_clamped_to_envelope() {
        let t = Scripted::new(vec![Ok(
            r#"{"model_prob_0_1": 0.95, "overall_confidence": 80, "top_drivers": [{"id": "ev-1", "stance": "supports", "reason": "CPI"}], "notes": "ok"}"#,
        )]);
        let r = run(&t);
        // two directional items averaging 75 -> 0.08
        assert_eq!(r.result.max_shift, 0.08);
        assert!((r.result.model_prob - 0.48).abs() < 1e-12);
        assert!(r.trace.clamped);
        assert_eq!(r.trace.raw_model_prob, Some(0.95));
        assert_eq!(r.result.top_drivers.len(), 1);
        assert!(r.result.rationale.starts_with("Evidence tilts above the market. Key signals: supports: CPI"));
        assert_eq!(t.calls(), 1);
    }

    #[test]
    fn extreme_replies_stay_within_max_shift_exactly() {
        for i in 1..99 {
            let market = MarketSnapshot::new(i as f64 / 100.0 + 0.003);
            for emitted in ["0.0", "1.0"] {
                let reply = format!(r#"{{"model_prob_0_1": {emitted}}}"#);
                let t = Scripted::new(vec![Ok(reply.as_str())]);
                let r = ForecastEngine::default()
                    .assistant(&market, &evidence(), &t, now())
                    .unwrap();
                let shift = (r.result.model_prob - r.result.market_prob).abs();
                assert!(shift <= r.result.max_shift, "p={} q={}", r.result.market_prob, r.result.model_prob);
            }
        }
    }

    #[test]
    fn banned_phrase_triggers_exactly_one_retry() {
        let t = Scripted::new(vec![
            Ok(r#"{"model_prob_0_1": 0.42, "notes": "Limited evidence so far"}"#),
            Ok(r#"{"model_prob_0_1": 0.44, "notes": "Still no data"}"#),
            Ok(r#"{"model_prob_0_1": 0.99}"#),
        ]);
        let r = run(&t);
        assert_eq!(t.calls(), 2);
        assert_eq!(r.trace.retry, RetryState::Retried);
        assert_eq!(r.trace.banned_phrases, vec!["limited evidence".to_string()]);
        assert!(r.trace.banned_after_retry);
        assert!(t.prompts.borrow()[1].contains("banned phrases"));
        assert_eq!(r.result.model_prob, 0.44);
    }

    #[test]
    fn failed_retry_keeps_first_reply() {
        let t = Scripted::new(vec![
            Ok(r#"{"model_prob_0_1": 0.43, "notes": "insufficient evidence"}"#),
            Err(TransportError::Timeout),
        ]);
        let r = run(&t);
        assert_eq!(t.calls(), 2);
        assert!(!r.trace.is_fallback());
        assert_eq!(r.result.model_prob, 0.43);
    }

    #[test]
    fn transport_error_falls_back_to_prior() {
        let t = Scripted::new(vec![Err(TransportError::Status(503))]);
        let r = run(&t);
        assert_eq!(t.calls(), 1);
        assert_eq!(r.result.model_prob, 0.40);
        assert_eq!(r.result.delta, 0.0);
        assert_eq!(r.result.overall_confidence, 0.0);
        assert!(matches!(r.trace.fallback, Some(ForecastError::AssistantUnavailable(_))));
        assert!(r.trace.synthesized_drivers);
        let ids: Vec<&str> = r.result.top_drivers.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ev-1", "ev-2"]);
        assert_eq!(r.result.top_drivers[0].reason, "reuters.com: Inflation cools");
        assert!(r.result.rationale.starts_with("Evidence keeps the view aligned with the market"));
    }

    #[test]
    fn contract_violation_falls_back() {
        let t = Scripted::new(vec![Ok(r#"{"probability": 0.6}"#)]);
        let r = run(&t);
        assert!(matches!(r.trace.fallback, Some(ForecastError::AssistantContractViolation(_))));
        assert_eq!(r.result.model_prob, 0.40);
    }

    #[test]
    fn unknown_driver_ids_are_replaced_by_ranked_evidence() {
        let t = Scripted::new(vec![Ok(
            r#"{"model_prob_0_1": 0.38, "top_drivers": [{"id": "made-up", "reason": "?"}]}"#,
        )]);
        let r = run(&t);
        assert_eq!(r.trace.dropped_drivers, 1);
        assert!(r.trace.synthesized_drivers);
        assert_eq!(r.result.top_drivers[0].id, "ev-1");
        assert!((r.result.delta + 0.02).abs() < 1e-12);
    }

    #[test]
    fn invalid_prior_is_the_only_error() {
        let t = Scripted::new(vec![]);
        let err = ForecastEngine::default()
            .assistant(&MarketSnapshot::new(f64::NAN), &evidence(), &t, now())
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
        assert_eq!(t.calls(), 0);
    }
}
