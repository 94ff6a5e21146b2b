//! Deterministic calibration.
//!
//! Responsibilities:
//!
//! - aggregate scored evidence into a log-odds delta and conflict penalty
//! - estimate confidence from evidence sufficiency, consensus and spread
//! - blend prior and signal into the model probability

pub mod aggregate;
pub mod calibrate;
pub mod confidence;
pub mod engine;

pub use aggregate::*;
pub use calibrate::*;
pub use confidence::*;
pub use engine::*;
