//! `forecast-calibrator` library crate.
//!
//! The binary (`fcal`) is a thin wrapper around this library so that:
//!
//! - the calibration core is testable without spawning processes
//! - the engine can be embedded behind other surfaces (services, notebooks)
//!
//! Entry points live on [`forecast::ForecastEngine`]: `deterministic` for the
//! log-odds update and `assistant` for the guardrail-bounded path.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod forecast;
pub mod guardrail;
pub mod io;
pub mod math;
pub mod report;
