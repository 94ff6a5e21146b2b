//! Evidence handling: source classification and per-item scoring.

pub mod scorer;
pub mod source;

pub use scorer::*;
pub use source::*;
