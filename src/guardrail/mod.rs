//! Guardrail around an untrusted forecasting assistant.
//!
//! The assistant may say anything; what leaves this module is bounded by the
//! envelope, shaped by the parser and never empty-handed on failure.

pub mod drivers;
pub mod envelope;
pub mod harness;
pub mod phrasing;
pub mod prompt;
pub mod response;
pub mod transport;

pub use drivers::{build_rationale, fallback_drivers};
pub use envelope::{Envelope, compute_max_shift};
pub use harness::{AssistantRun, GuardrailTrace, RetryState, compute_assistant_forecast};
pub use phrasing::contains_banned_phrase;
pub use transport::{AssistantTransport, TransportError};
