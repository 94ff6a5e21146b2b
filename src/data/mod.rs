//! Evidence and assistant collaborators.
//!
//! - `chat`: HTTP transport for the assistant path
//! - `sample`: seeded synthetic evidence sets

pub mod chat;
pub mod sample;

pub use chat::{ChatCompletionsClient, ChatSettings};
pub use sample::{SampleConfig, SampleEvidence, generate_sample};
