//! Exports: per-item score breakdown as CSV, any result as pretty JSON.
//!
//! Meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::AppError;
use crate::evidence::EvidenceScore;

/// Write the weighting breakdown, one row per evidence item.
pub fn write_scores_csv(path: &Path, scores: &[EvidenceScore]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_scores(file, scores)
}

fn write_scores<W: Write>(out: W, scores: &[EvidenceScore]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "id",
            "host",
            "stance",
            "directional_value",
            "age_hours",
            "recency",
            "reliability",
            "stance_confidence",
            "source_bonus",
            "base_weight",
            "weight",
            "contribution",
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for s in scores {
        writer
            .write_record([
                s.id.clone(),
                s.host.clone().unwrap_or_default(),
                s.stance.to_string(),
                format!("{}", s.directional_value),
                format!("{:.4}", s.age_hours),
                format!("{:.6}", s.recency),
                format!("{:.4}", s.reliability_norm),
                format!("{:.4}", s.stance_confidence_norm),
                format!("{:.4}", s.source_bonus),
                format!("{:.6}", s.base_weight),
                format!("{:.6}", s.weight),
                format!("{:.6}", s.contribution()),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Pretty-printed JSON of any serializable value.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON '{}': {e}", path.display())))
}
