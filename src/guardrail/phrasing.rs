//! Phrases the assistant must never use.
//!
//! The dashboard shows rationale text to end users; statements about how much
//! evidence exists read as a refusal to forecast and are rejected.

use once_cell::sync::Lazy;
use regex::Regex;

static BANNED_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(lack of evidence|insufficient evidence|not enough evidence|limited evidence|cannot determine|no data)",
    )
    .expect("banned phrase pattern compiles")
});

/// True when `text` contains any banned phrase, case-insensitively.
pub fn contains_banned_phrase(text: &str) -> bool {
    BANNED_PHRASES.is_match(text)
}

/// Distinct banned phrases found in `text`, lowercased, in order of appearance.
pub fn banned_phrases_in(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in BANNED_PHRASES.find_iter(text) {
        let phrase = m.as_str().to_lowercase();
        if !found.contains(&phrase) {
            found.push(phrase);
        }
    }
    found
}
