//! Reporting utilities: formatted terminal output for both forecast paths.

pub mod format;

pub use format::*;
