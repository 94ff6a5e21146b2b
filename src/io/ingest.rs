//! Evidence ingest and normalization.
//!
//! Turns evidence CSVs and request JSON documents into clean `EvidenceItem`
//! sets that are safe to score.
//!
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Stable ids**: missing ids are synthesized, duplicates rejected
//! - **Deduplication** by normalized URL, first occurrence wins

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{EvidenceItem, ForecastRequest, Stance};
use crate::error::AppError;
use crate::evidence::normalize_url;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: usable items plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedEvidence {
    pub items: Vec<EvidenceItem>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
}

pub fn load_evidence_csv(path: &Path) -> Result<IngestedEvidence, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_evidence_csv(file)
}

/// Parse evidence rows from any CSV source.
pub fn read_evidence_csv<R: Read>(source: R) -> Result<IngestedEvidence, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for required in ["stance", "reliability"] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(2, format!("Missing required column: `{required}`")));
        }
    }

    let mut items = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(item) => items.push(item),
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, "id").map(str::to_string),
                message,
            }),
        }
    }

    for e in &row_errors {
        warn!(line = e.line, id = e.id.as_deref().unwrap_or(""), "skipped evidence row: {}", e.message);
    }
    if items.is_empty() {
        return Err(AppError::new(3, "No valid evidence rows remain after validation."));
    }

    let before = items.len();
    let items = prepare_evidence(items)?;
    Ok(IngestedEvidence {
        duplicates_dropped: before - items.len(),
        items,
        row_errors,
        rows_read,
    })
}

pub fn load_request_json(path: &Path) -> Result<ForecastRequest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open request '{}': {e}", path.display())))?;
    let mut request: ForecastRequest = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid request JSON '{}': {e}", path.display())))?;
    request.evidence = prepare_evidence(request.evidence)?;
    Ok(request)
}

pub fn load_batch_json(path: &Path) -> Result<Vec<ForecastRequest>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open batch '{}': {e}", path.display())))?;
    let requests: Vec<ForecastRequest> = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid batch JSON '{}': {e}", path.display())))?;
    if requests.is_empty() {
        return Err(AppError::new(3, format!("Batch '{}' contains no requests.", path.display())));
    }
    requests
        .into_iter()
        .enumerate()
        .map(|(i, mut req)| {
            req.evidence = prepare_evidence(req.evidence)
                .map_err(|e| AppError::new(e.exit_code(), format!("Batch request {}: {e}", i + 1)))?;
            Ok(req)
        })
        .collect()
}

/// Synthesize missing ids, reject duplicate ids, then drop repeated URLs.
pub fn prepare_evidence(mut items: Vec<EvidenceItem>) -> Result<Vec<EvidenceItem>, AppError> {
    assign_missing_ids(&mut items);
    ensure_unique_ids(&items)?;
    let (items, dropped) = dedupe_by_url(items);
    if dropped > 0 {
        debug!(dropped, "dropped evidence with repeated URLs");
    }
    Ok(items)
}

/// Missing ids become `ev-{n}` where `n` is the 1-based input position.
pub fn assign_missing_ids(items: &mut [EvidenceItem]) {
    for (i, item) in items.iter_mut().enumerate() {
        if item.id.trim().is_empty() {
            item.id = format!("ev-{}", i + 1);
        } else {
            item.id = item.id.trim().to_string();
        }
    }
}

pub fn ensure_unique_ids(items: &[EvidenceItem]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(AppError::new(2, format!("Duplicate evidence id '{}'.", item.id)));
        }
    }
    Ok(())
}

/// Keep the first item per normalized URL. Items without a URL are always kept.
pub fn dedupe_by_url(items: Vec<EvidenceItem>) -> (Vec<EvidenceItem>, usize) {
    let mut seen = HashSet::new();
    let before = items.len();
    let kept: Vec<EvidenceItem> = items
        .into_iter()
        .filter(|item| item.url.trim().is_empty() || seen.insert(normalize_url(&item.url)))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

/// Lowercase, strip a UTF-8 BOM, and fold camelCase/dashed spellings to snake_case.
fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}');
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '-' || c == ' ' {
            out.push('_');
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<EvidenceItem, String> {
    let stance: Stance = get_required(record, header_map, "stance")?.parse()?;
    let reliability = parse_f64(get_required(record, header_map, "reliability")?, "reliability")?;
    let stance_confidence = get_optional(record, header_map, "stance_confidence")
        .map(|s| parse_f64(s, "stance_confidence"))
        .transpose()?;

    let text = |name: &str| get_optional(record, header_map, name).unwrap_or("").to_string();
    Ok(EvidenceItem {
        id: text("id"),
        url: text("url"),
        title: text("title"),
        snippet: text("snippet"),
        source_name: text("source_name"),
        stance,
        reliability,
        stance_confidence,
        timestamp: text("timestamp"),
        stance_rationale: get_optional(record, header_map, "stance_rationale").map(str::to_string),
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}
