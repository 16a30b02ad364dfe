//! Chat generation against a local Ollama server.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use kb_core::config::LlmSettings;
use kb_core::traits::Generator;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), model: model.to_string() })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Self::new(&settings.base_url, &settings.model, Duration::from_secs(settings.timeout_secs))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the server has pulled.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().with_context(|| format!("GET {url}"))?;
        let tags: TagsResponse = check_status(response)?.json().context("parsing /api/tags response")?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

impl Generator for OllamaClient {
    fn generate(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage { role: "system", content: system_prompt });
        }
        messages.push(ChatMessage { role: "user", content: prompt });
        let body = ChatRequest { model: &self.model, messages, stream: false };

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling chat endpoint");
        let response = self.client.post(&url).json(&body).send().with_context(|| format!("POST {url}"))?;
        let chat: ChatResponse = check_status(response)?.json().context("parsing /api/chat response")?;
        Ok(chat.message.content)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow!("Ollama request failed ({}): {}", status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_has_ollama_shape() {
        let body = ChatRequest {
            model: "qwen3:8b",
            messages: vec![ChatMessage { role: "system", content: "S" }, ChatMessage { role: "user", content: "U" }],
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "qwen3:8b",
                "messages": [{"role": "system", "content": "S"}, {"role": "user", "content": "U"}],
                "stream": false
            })
        );
    }

    #[test]
    fn parses_chat_and_tags_responses() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"model":"m","message":{"role":"assistant","content":"Hi"},"done":true}"#).unwrap();
        assert_eq!(chat.message.content, "Hi");

        let tags: TagsResponse = serde_json::from_str(r#"{"models":[{"name":"qwen3:8b","size":1}]}"#).unwrap();
        assert_eq!(tags.models[0].name, "qwen3:8b");
    }

    #[test]
    fn unreachable_server_is_an_error() {
        let client = OllamaClient::new("http://127.0.0.1:9/", "m", Duration::from_millis(500)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert!(client.generate("s", "p").is_err());
    }
}
