//! Driver synthesis and rationale text.

use crate::domain::{Driver, EvidenceItem, OutputLimits, Stance};
use crate::guardrail::response::truncate_chars;

/// Rank evidence by reliability and cite the top items as drivers.
///
/// `irrelevant` and `uncertain` items are never cited. Ties keep input order.
pub fn fallback_drivers(items: &[EvidenceItem], limits: &OutputLimits) -> Vec<Driver> {
    let mut ranked: Vec<&EvidenceItem> = items
        .iter()
        .filter(|e| !e.id.trim().is_empty())
        .filter(|e| !matches!(e.stance, Stance::Irrelevant | Stance::Uncertain))
        .collect();
    ranked.sort_by(|a, b| b.reliability_clamped().total_cmp(&a.reliability_clamped()));

    ranked
        .into_iter()
        .take(limits.fallback_drivers)
        .map(|e| Driver {
            id: e.id.clone(),
            stance: Some(e.stance.as_str().to_string()),
            weight: Some(e.reliability_clamped().round() / 100.0),
            reason: truncate_chars(&driver_reason(e), limits.reason_chars),
        })
        .collect()
}

fn driver_reason(item: &EvidenceItem) -> String {
    let source = item
        .source_host()
        .or_else(|| Some(item.source_name.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "source".to_string());
    let title = match item.title.trim() {
        "" => "evidence",
        t => t,
    };
    format!("{source}: {title}")
}

/// Templated rationale from the direction of the move and the first drivers.
pub fn build_rationale(drivers: &[Driver], model_prob: f64, market_prob: f64) -> String {
    let leaning = if model_prob > market_prob {
        "Evidence tilts above the market"
    } else if model_prob < market_prob {
        "Evidence leans below the market"
    } else {
        "Evidence keeps the view aligned with the market"
    };

    if drivers.is_empty() {
        return format!("{leaning}.");
    }

    let highlights: Vec<String> = drivers
        .iter()
        .take(3)
        .map(|d| {
            let reason = match d.reason.trim() {
                "" => d.id.as_str(),
                r => r,
            };
            format!("{}: {reason}", d.stance.as_deref().unwrap_or("neutral"))
        })
        .collect();
    format!("{leaning}. Key signals: {}", highlights.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::phrasing::contains_banned_phrase;

    fn item(id: &str, stance: Stance, rel: f64) -> EvidenceItem {
        EvidenceItem::new(id, stance, rel, "2025-01-10T00:00:00Z")
            .with_url(format!("https://www.{id}.example.com/story"))
            .with_title(format!("Story {id}"))
    }

    #[test]
    fn ranks_by_reliability_and_skips_noise() {
        let items = vec![
            item("a", Stance::Supports, 60.0),
            item("b", Stance::Irrelevant, 99.0),
            item("c", Stance::Contradicts, 85.4),
            item("d", Stance::Neutral, 60.0),
            item("e", Stance::Uncertain, 95.0),
            item("f", Stance::WeakSupports, 70.0),
            item("g", Stance::WeakContradicts, 10.0),
        ];
        let drivers = fallback_drivers(&items, &OutputLimits::default());
        let ids: Vec<&str> = drivers.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "f", "a", "d"]);
        assert_eq!(drivers[0].weight, Some(0.85));
        assert_eq!(drivers[0].stance.as_deref(), Some("contradicts"));
        assert_eq!(drivers[0].reason, "c.example.com: Story c");
    }

    #[test]
    fn only_noise_yields_no_drivers() {
        let items = vec![item("a", Stance::Irrelevant, 90.0), item("b", Stance::Uncertain, 90.0)];
        assert!(fallback_drivers(&items, &OutputLimits::default()).is_empty());
    }

    #[test]
    fn reason_falls_back_to_source_name_then_placeholders() {
        let mut named = EvidenceItem::new("x", Stance::Supports, 50.0, "");
        named.source_name = "Reuters".to_string();
        assert_eq!(driver_reason(&named), "Reuters: evidence");

        let bare = EvidenceItem::new("y", Stance::Supports, 50.0, "");
        assert_eq!(driver_reason(&bare), "source: evidence");
    }

    #[test]
    fn rationale_follows_direction() {
        let drivers = vec![
            Driver {
                id: "a".to_string(),
                stance: Some("supports".to_string()),
                weight: None,
                reason: "Wire: CPI cools".to_string(),
            },
            Driver {
                id: "b".to_string(),
                stance: None,
                weight: None,
                reason: String::new(),
            },
        ];
        let up = build_rationale(&drivers, 0.45, 0.40);
        assert_eq!(up, "Evidence tilts above the market. Key signals: supports: Wire: CPI cools; neutral: b");
        assert!(build_rationale(&drivers, 0.35, 0.40).starts_with("Evidence leans below the market"));
        assert_eq!(
            build_rationale(&[], 0.40, 0.40),
            "Evidence keeps the view aligned with the market."
        );
    }

    #[test]
    fn rationale_never_uses_banned_phrasing() {
        for (q, p) in [(0.5, 0.4), (0.3, 0.4), (0.4, 0.4)] {
            assert!(!contains_banned_phrase(&build_rationale(&[], q, p)));
        }
    }
}
