//! Source hosts and their prior bonus.
//!
//! The scorer never matches domain strings itself; it asks a `SourceClassifier`.
//! `DefaultSourceClassifier` carries the production allow-lists and can be
//! extended at runtime, and any `Fn(&str) -> f64` works as a classifier too.

use url::Url;

/// Maps a source host to a multiplicative weight bonus (`weight *= 1 + bonus`).
pub trait SourceClassifier: Send + Sync {
    fn prior_bonus(&self, host: &str) -> f64;
}

impl<F> SourceClassifier for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn prior_bonus(&self, host: &str) -> f64 {
        self(host)
    }
}

/// Source categories recognized by the default classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTier {
    /// Government or military domains.
    Official,
    /// Official statistical and monetary agencies outside `.gov`.
    StatisticalAgency,
    /// Top-tier wire services and financial press.
    WirePress,
    Other,
}

impl SourceTier {
    pub fn bonus(self) -> f64 {
        match self {
            SourceTier::Official => 0.25,
            SourceTier::StatisticalAgency => 0.20,
            SourceTier::WirePress => 0.15,
            SourceTier::Other => 0.0,
        }
    }
}

const OFFICIAL_LABELS: &[&str] = &["gov", "mil"];

const STATISTICAL_AGENCIES: &[&str] = &[
    "stlouisfed.org",
    "newyorkfed.org",
    "ecb.europa.eu",
    "bankofengland.co.uk",
    "imf.org",
    "oecd.org",
    "worldbank.org",
];

const WIRE_PRESS: &[&str] = &["bloomberg.com", "reuters.com", "apnews.com", "ft.com", "wsj.com"];

/// Allow-list classifier.
///
/// - a host whose TLD, or label before a country code, is in `official_labels` is `Official` (`bls.gov`, `ons.gov.uk`)
/// - a host equal to, or a subdomain of, an agency domain is `StatisticalAgency`
/// - likewise for wire/press domains
#[derive(Debug, Clone)]
pub struct DefaultSourceClassifier {
    official_labels: Vec<String>,
    agencies: Vec<String>,
    wire_press: Vec<String>,
}

impl Default for DefaultSourceClassifier {
    fn default() -> Self {
        Self {
            official_labels: OFFICIAL_LABELS.iter().map(|s| s.to_string()).collect(),
            agencies: STATISTICAL_AGENCIES.iter().map(|s| s.to_string()).collect(),
            wire_press: WIRE_PRESS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DefaultSourceClassifier {
    pub fn with_agency(mut self, domain: impl Into<String>) -> Self {
        self.agencies.push(domain.into().to_ascii_lowercase());
        self
    }

    pub fn with_wire_press(mut self, domain: impl Into<String>) -> Self {
        self.wire_press.push(domain.into().to_ascii_lowercase());
        self
    }

    pub fn classify(&self, host: &str) -> SourceTier {
        let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return SourceTier::Other;
        }

        if self.is_official(&host) {
            return SourceTier::Official;
        }
        if self.agencies.iter().any(|d| matches_domain(&host, d)) {
            return SourceTier::StatisticalAgency;
        }
        if self.wire_press.iter().any(|d| matches_domain(&host, d)) {
            return SourceTier::WirePress;
        }
        SourceTier::Other
    }

    /// `gov`/`mil` as the TLD (`bls.gov`) or as the label before a
    /// two-letter country code (`ons.gov.uk`).
    fn is_official(&self, host: &str) -> bool {
        let labels: Vec<&str> = host.split('.').collect();
        let is_label = |label: &str| self.official_labels.iter().any(|l| l == label);
        match labels.as_slice() {
            [.., _, tld] if is_label(*tld) => true,
            [.., _, sld, cc] if cc.len() == 2 && is_label(*sld) => true,
            _ => false,
        }
    }
}

impl SourceClassifier for DefaultSourceClassifier {
    fn prior_bonus(&self, host: &str) -> f64 {
        self.classify(host).bonus()
    }
}

fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Parse a URL, accepting bare hosts such as `reuters.com/markets`.
fn parse_lenient(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(_) if !raw.contains("://") => Url::parse(&format!("https://{raw}")).ok(),
        Err(_) => None,
    }
}

/// Host of `raw`, lowercased, with a leading `www.` removed.
///
/// Returns `None` for unparseable or host-less URLs.
pub fn host_from_url(raw: &str) -> Option<String> {
    let url = parse_lenient(raw)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() { None } else { Some(host) }
}

/// Canonical form used to detect duplicate evidence URLs.
///
/// Scheme, `www.`, query, fragment and trailing slashes are ignored. Strings that
/// do not parse as URLs fall back to their trimmed, lowercased form.
pub fn normalize_url(raw: &str) -> String {
    let Some(url) = parse_lenient(raw) else {
        return raw.trim().to_ascii_lowercase();
    };
    let Some(host) = host_from_url(url.as_str()) else {
        return raw.trim().to_ascii_lowercase();
    };
    let path = url.path().trim_end_matches('/');
    format!("{host}{path}")
}
