//! Input/output helpers.
//!
//! - evidence CSV / request JSON ingest + validation (`ingest`)
//! - score and result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
