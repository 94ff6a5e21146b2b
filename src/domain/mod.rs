//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - evidence and market inputs (`EvidenceItem`, `Stance`, `MarketSnapshot`)
//! - forecast outputs (`ForecastResult`, `AssistantForecastResult`, `Driver`)
//! - calibration constants (`CalibrationConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
