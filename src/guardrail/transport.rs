//! Seam between the guardrail and whatever actually runs the model.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("response had no message content")]
    EmptyResponse,
}

/// Send one system prompt plus one user payload, return the raw reply text.
///
/// Implementations are free to fail; the guardrail treats every failure as a
/// reason to fall back.
pub trait AssistantTransport {
    fn invoke(&self, system_prompt: &str, user_payload: &str) -> Result<String, TransportError>;
}

impl<T: AssistantTransport + ?Sized> AssistantTransport for &T {
    fn invoke(&self, system_prompt: &str, user_payload: &str) -> Result<String, TransportError> {
        (**self).invoke(system_prompt, user_payload)
    }
}

impl<T: AssistantTransport + ?Sized> AssistantTransport for Box<T> {
    fn invoke(&self, system_prompt: &str, user_payload: &str) -> Result<String, TransportError> {
        (**self).invoke(system_prompt, user_payload)
    }
}
