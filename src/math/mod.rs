//! Numeric primitives shared by both forecast paths.

pub mod prob;

pub use prob::*;
