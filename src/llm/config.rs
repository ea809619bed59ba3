//! LLM connection settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions API (OpenAI, Groq, Together.ai, ...)
    #[value(name = "openai", alias = "groq", alias = "together")]
    OpenAI,
}

impl LlmProvider {
    pub fn default_endpoint(self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Ollama => "llama3.1:8b",
            LlmProvider::OpenAI => "gpt-4o-mini",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer key for OpenAI-compatible providers. Never written out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    LlmProvider::Ollama.default_endpoint().to_string()
}

fn default_model() -> String {
    LlmProvider::Ollama.default_model().to_string()
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider(LlmProvider::default())
    }
}

impl LlmConfig {
    /// Config with the provider's default endpoint and model.
    pub fn for_provider(provider: LlmProvider) -> Self {
        Self {
            provider,
            endpoint: provider.default_endpoint().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
            temperature: default_temperature(),
        }
    }

    /// Apply explicit overrides on top of the provider defaults.
    pub fn with_overrides(
        mut self,
        endpoint: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(model) = model {
            self.model = model;
        }
        if api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            self.api_key = api_key;
        }
        self
    }
}
