//! LLM client for structured script breakdowns.
//!
//! Supports the Ollama generate API and OpenAI-compatible chat completions. Both are
//! asked for JSON constrained by a schema; the reply is parsed into a `serde_json::Value`.

mod config;
pub mod prompt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use config::{LlmConfig, LlmProvider};

/// Errors that can occur while invoking the model.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model returned no content")]
    EmptyResponse,
}

/// A model that answers a prompt with JSON shaped by `schema`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Name shown in progress messages.
    fn model_name(&self) -> &str;

    async fn invoke(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError>;
}

pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a Value,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient {
    pub fn new(config: LlmConfig, timeout: Duration, user_agent: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn call_ollama(&self, prompt: &str, schema: &Value) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: schema,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };
        let url = format!("{}/api/generate", self.config.endpoint);
        let resp: OllamaResponse = self.post_json(&url, &request).await?;
        Ok(resp.response)
    }

    async fn call_openai(&self, prompt: &str, schema: &Value) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            response_format: json_schema_format("script_analysis", schema),
        };
        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let resp: ChatResponse = self.post_json(&url, &request).await?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, LlmError> {
        let mut req = self.client.post(url).json(body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError> {
        debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "invoking model"
        );
        let text = match self.config.provider {
            LlmProvider::Ollama => self.call_ollama(prompt, schema).await?,
            LlmProvider::OpenAI => self.call_openai(prompt, schema).await?,
        };
        parse_model_output(&text)
    }
}

fn json_schema_format(name: &str, schema: &Value) -> Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": { "name": name, "schema": schema },
    })
}

/// Parse the model's text as JSON, tolerating a surrounding markdown code fence.
pub fn parse_model_output(text: &str) -> Result<Value, LlmError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let v = parse_model_output(r#" {"logline": "A thief must..."} "#).unwrap();
        assert_eq!(v["logline"], "A thief must...");
    }

    #[test]
    fn tolerates_code_fence() {
        let v = parse_model_output("```json\n{\"total_pages\": 110}\n```").unwrap();
        assert_eq!(v["total_pages"], 110);
        let v = parse_model_output("```\n[1, 2]\n```\n").unwrap();
        assert_eq!(v[1], 2);
    }

    #[test]
    fn unparseable_output_is_parse_error() {
        assert!(matches!(
            parse_model_output("Sure! Here is the analysis:"),
            Err(LlmError::Parse(_))
        ));
        assert!(matches!(
            parse_model_output("   "),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn ollama_request_carries_schema_as_format() {
        let schema = prompt::analysis_schema();
        let req = OllamaRequest {
            model: "llama3.1:8b",
            prompt: "p",
            stream: false,
            format: &schema,
            options: OllamaOptions { temperature: 0.2 },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["format"]["type"], "object");
    }

    #[test]
    fn openai_response_format_wraps_schema() {
        let schema = prompt::extraction_schema();
        let f = json_schema_format("script_analysis", &schema);
        assert_eq!(f["type"], "json_schema");
        assert_eq!(f["json_schema"]["name"], "script_analysis");
        assert_eq!(
            f["json_schema"]["schema"]["properties"]["full_text"]["type"],
            "string"
        );
    }

    #[test]
    fn chat_response_without_content_is_empty() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(resp.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connection_error() {
        let config = LlmConfig::default().with_overrides(
            Some("http://127.0.0.1:9".into()),
            None,
            None,
        );
        let client = LlmClient::new(config, Duration::from_secs(2), "test").unwrap();
        let err = client
            .invoke("p", &prompt::analysis_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Connection(_)));
    }
}
