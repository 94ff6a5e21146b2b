//! OpenAI-compatible chat completions client (Groq by default).

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::guardrail::{AssistantTransport, TransportError};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Connection settings, normally read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ChatSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `GROQ_API_KEY` (required), `ASSISTANT_BASE_URL`, `ASSISTANT_MODEL`,
    /// `ASSISTANT_TIMEOUT_SECS`. A `.env` file is honored if present.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::new(2, "Missing GROQ_API_KEY in environment (.env)."))?;

        let mut settings = Self::new(api_key);
        if let Ok(url) = std::env::var("ASSISTANT_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                url::Url::parse(url)
                    .map_err(|e| AppError::new(2, format!("Invalid ASSISTANT_BASE_URL '{url}': {e}")))?;
                settings.base_url = url.to_string();
            }
        }
        if let Ok(model) = std::env::var("ASSISTANT_MODEL") {
            if !model.trim().is_empty() {
                settings.model = model.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var("ASSISTANT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| AppError::new(2, format!("Invalid ASSISTANT_TIMEOUT_SECS '{raw}'.")))?;
            settings.timeout = Duration::from_secs(secs.max(1));
        }
        Ok(settings)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

pub struct ChatCompletionsClient {
    client: Client,
    settings: ChatSettings,
}

impl ChatCompletionsClient {
    pub fn new(settings: ChatSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::new(ChatSettings::from_env()?)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    response_format: ResponseFormat,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn request_body<'a>(model: &'a str, system_prompt: &'a str, user_payload: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: 0.0,
        response_format: ResponseFormat { kind: "json_object" },
        messages: [
            Message {
                role: "system",
                content: system_prompt,
            },
            Message {
                role: "user",
                content: user_payload,
            },
        ],
    }
}

fn first_content(body: ChatResponse) -> Result<String, TransportError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(TransportError::EmptyResponse)
}

impl AssistantTransport for ChatCompletionsClient {
    fn invoke(&self, system_prompt: &str, user_payload: &str) -> Result<String, TransportError> {
        let started = Instant::now();
        let body = request_body(&self.settings.model, system_prompt, user_payload);

        let resp = self
            .client
            .post(self.settings.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                warn!(error = %e, "assistant request failed");
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            model = %self.settings.model,
            "assistant responded"
        );
        if !status.is_success() {
            warn!(status = status.as_u16(), "assistant returned an error status");
            return Err(TransportError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| TransportError::Request(format!("invalid completion body: {e}")))?;
        first_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_json_mode_and_zero_temperature() {
        let body = request_body("m", "sys", "{\"a\":1}");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "{\"a\":1}");
    }

    #[test]
    fn extracts_first_message_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"{\"model_prob_0_1\":0.4}"}}]}"#).unwrap();
        assert_eq!(first_content(body).unwrap(), "{\"model_prob_0_1\":0.4}");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(first_content(empty), Err(TransportError::EmptyResponse));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let mut s = ChatSettings::new("k");
        assert_eq!(s.endpoint(), "https://api.groq.com/openai/v1/chat/completions");
        s.base_url = "http://localhost:8080/v1".to_string();
        assert_eq!(s.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
