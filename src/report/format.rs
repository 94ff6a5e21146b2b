//! Formatted terminal output.
//!
//! Formatting lives in one place so:
//! - the calibration code stays free of presentation concerns
//! - output changes are localized

use crate::domain::{AssistantForecastResult, Driver, ForecastResult};
use crate::evidence::EvidenceScore;
use crate::guardrail::GuardrailTrace;
use crate::io::ingest::RowError;

/// Deterministic forecast summary.
pub fn format_forecast(result: &ForecastResult) -> String {
    let mut out = String::new();

    out.push_str("=== fcal - Deterministic forecast ===\n");
    push_market_header(&mut out, &result.market_id, &result.market_title);
    out.push_str(&format!("Computed: {}\n", result.computed_at.to_rfc3339()));
    out.push_str(&format!("Market : {}\n", pct(result.market_prob)));
    out.push_str(&format!("Model  : {}\n", pct(result.model_prob)));
    out.push_str(&format!("Delta  : {}\n", pp(result.delta)));
    out.push_str(&format!(
        "Confidence: {} ({:.0}/100)\n",
        result.confidence_label, result.confidence_score
    ));
    out.push_str(&format!("\n{}\n", result.summary));

    out
}

/// Assistant forecast summary, including how the guardrail intervened.
pub fn format_assistant_forecast(result: &AssistantForecastResult, trace: &GuardrailTrace) -> String {
    let mut out = String::new();

    out.push_str("=== fcal - Assistant forecast ===\n");
    push_market_header(&mut out, &result.market_id, &result.market_title);
    out.push_str(&format!("Computed: {}\n", result.computed_at.to_rfc3339()));
    out.push_str(&format!("Market : {}\n", pct(result.market_prob)));
    out.push_str(&format!(
        "Model  : {} (envelope +/-{:.1}pp)\n",
        pct(result.model_prob),
        result.max_shift * 100.0
    ));
    out.push_str(&format!("Delta  : {}\n", pp(result.delta)));
    out.push_str(&format!("Confidence: {:.0}/100\n", result.overall_confidence));

    out.push_str(&format!("Guardrail: {}\n", describe_trace(trace)));

    out.push_str("\nDrivers:\n");
    out.push_str(&format_drivers(&result.top_drivers));
    out.push_str(&format!("\n{}\n", result.rationale));
    if !result.notes.is_empty() {
        out.push_str(&format!("Notes: {}\n", result.notes));
    }

    out
}

/// Both paths for one market.
pub fn format_comparison(
    deterministic: &ForecastResult,
    assistant: &AssistantForecastResult,
    trace: &GuardrailTrace,
) -> String {
    let mut out = String::new();
    out.push_str("=== fcal - Compare ===\n");
    push_market_header(&mut out, &deterministic.market_id, &deterministic.market_title);
    out.push_str(&format!("Market: {}\n\n", pct(deterministic.market_prob)));
    out.push_str(&format!("{:<14} {:>8} {:>10}\n", "path", "model", "delta"));
    out.push_str(&format!("{:-<14} {:-<8} {:-<10}\n", "", "", ""));
    out.push_str(&format!(
        "{:<14} {:>8} {:>10}\n",
        "deterministic",
        pct(deterministic.model_prob),
        pp(deterministic.delta)
    ));
    out.push_str(&format!(
        "{:<14} {:>8} {:>10}\n",
        "assistant",
        pct(assistant.model_prob),
        pp(assistant.delta)
    ));
    out.push_str(&format!("\nGuardrail: {}\n", describe_trace(trace)));
    out
}

/// Per-item weighting table.
pub fn format_scores(scores: &[EvidenceScore]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:<22} {:<16} {:>8} {:>8} {:>6} {:>7} {:>8}\n",
        "id", "host", "stance", "age_h", "recency", "bonus", "weight", "contrib"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<22} {:-<16} {:-<8} {:-<8} {:-<6} {:-<7} {:-<8}\n",
        "", "", "", "", "", "", "", ""
    ));

    for s in scores {
        out.push_str(&format!(
            "{:<12} {:<22} {:<16} {:>8.1} {:>8.3} {:>6.2} {:>7.3} {:>+8.3}\n",
            clip(&s.id, 12),
            clip(s.host.as_deref().unwrap_or("-"), 22),
            s.stance.as_str(),
            s.age_hours,
            s.recency,
            s.source_bonus,
            s.weight,
            s.contribution()
        ));
    }
    out
}

/// Rows skipped during ingest.
pub fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        return out;
    }
    out.push_str(&format!("Skipped {} row(s):\n", errors.len()));
    for e in errors {
        match &e.id {
            Some(id) => out.push_str(&format!("  line {} ({id}): {}\n", e.line, e.message)),
            None => out.push_str(&format!("  line {}: {}\n", e.line, e.message)),
        }
    }
    out
}

fn format_drivers(drivers: &[Driver]) -> String {
    if drivers.is_empty() {
        return "  (none)\n".to_string();
    }
    let mut out = String::new();
    for d in drivers {
        let weight = d.weight.map(|w| format!("{w:.2}")).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:<12} {:<16} {:>5}  {}\n",
            clip(&d.id, 12),
            d.stance.as_deref().unwrap_or("-"),
            weight,
            d.reason
        ));
    }
    out
}

fn describe_trace(trace: &GuardrailTrace) -> String {
    let mut parts = vec![format!("{} call(s)", trace.attempts)];
    if !trace.banned_phrases.is_empty() {
        parts.push(format!("retried on \"{}\"", trace.banned_phrases.join("\", \"")));
    }
    if trace.clamped {
        if let Some(raw) = trace.raw_model_prob {
            parts.push(format!("clamped from {}", pct(raw)));
        }
    }
    if trace.dropped_drivers > 0 {
        parts.push(format!("{} uncited driver(s) dropped", trace.dropped_drivers));
    }
    if trace.synthesized_drivers {
        parts.push("drivers ranked from evidence".to_string());
    }
    if let Some(err) = &trace.fallback {
        parts.push(format!("fallback ({err})"));
    }
    parts.join(", ")
}

fn push_market_header(out: &mut String, market_id: &str, title: &str) {
    match (market_id.is_empty(), title.is_empty()) {
        (true, true) => {}
        (false, true) => out.push_str(&format!("Market id: {market_id}\n")),
        (true, false) => out.push_str(&format!("{title}\n")),
        (false, false) => out.push_str(&format!("{title} [{market_id}]\n")),
    }
}

/// Probability as a percentage, one decimal.
pub fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

/// Signed probability difference in percentage points.
pub fn pp(delta: f64) -> String {
    format!("{:+.1}pp", delta * 100.0)
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfidenceLabel;
    use crate::evidence::parse_timestamp;

    #[test]
    fn percent_helpers() {
        assert_eq!(pct(0.4), "40.0%");
        assert_eq!(pp(0.0123), "+1.2pp");
        assert_eq!(pp(-0.05), "-5.0pp");
    }

    #[test]
    fn forecast_report_mentions_label_and_summary() {
        let r = ForecastResult {
            market_id: "m1".to_string(),
            market_title: "Fed cuts in March?".to_string(),
            computed_at: parse_timestamp("2025-01-10T12:00:00Z").unwrap(),
            market_prob: 0.4,
            model_prob: 0.43,
            delta: 0.03,
            confidence_label: ConfidenceLabel::Med,
            confidence_score: 55.0,
            signal: 0.03,
            summary: "Log-odds update".to_string(),
        };
        let text = format_forecast(&r);
        assert!(text.contains("Fed cuts in March? [m1]"));
        assert!(text.contains("Model  : 43.0%"));
        assert!(text.contains("Delta  : +3.0pp"));
        assert!(text.contains("Confidence: med (55/100)"));
        assert!(text.contains("Log-odds update"));
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("abcdef", 4), "abc~");
        assert_eq!(clip("abc", 4), "abc");
    }

    #[test]
    fn row_errors_list_lines() {
        let errors = vec![RowError {
            line: 3,
            id: Some("ev-3".to_string()),
            message: "Unknown stance 'x'".to_string(),
        }];
        let text = format_row_errors(&errors);
        assert!(text.starts_with("Skipped 1 row(s):"));
        assert!(text.contains("line 3 (ev-3): Unknown stance 'x'"));
        assert!(format_row_errors(&[]).is_empty());
    }
}
