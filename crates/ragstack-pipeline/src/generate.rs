//! Answer generation against OpenAI-compatible chat completion endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragstack_core::config::GenerationConfig;
use ragstack_core::traits::Generator;
use ragstack_core::{Error, Result};

const SERVICE: &str = "generation";
const SYSTEM_HINT: &str = "Answer the question using only the provided context. \
If the context does not contain the answer, say so.";

#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl HttpGenerator {
    pub fn new(endpoint: String, model: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::unavailable(format!("cannot build http client: {e}")))?;
        Ok(Self { client, endpoint, model, api_key })
    }

    /// `None` when no endpoint is configured.
    pub fn from_config(config: &GenerationConfig, default_timeout: Duration) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::InvalidConfig("generation.model is required with generation.endpoint".into()))?;
        let timeout = config.timeout_secs.map(Duration::from_secs).unwrap_or(default_timeout);
        Self::new(endpoint, model, config.api_key.clone(), timeout).map(Some)
    }
}

fn user_message(prompt: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {prompt}")
}

fn first_answer(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| Error::external(SERVICE, "response contained no choices"))
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system".into(), content: SYSTEM_HINT.into() },
                ChatMessage { role: "user".into(), content: user_message(prompt, context) },
            ],
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, e))?
            .error_for_status()
            .map_err(|e| Error::external(SERVICE, e))?;
        let parsed: ChatResponse = response.json().await.map_err(|e| Error::external(SERVICE, e))?;
        debug!(model = %self.model, context_chars = context.chars().count(), "generation finished");
        first_answer(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"42"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_answer(parsed).unwrap(), "42");
    }

    #[test]
    fn empty_choices_is_external_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_answer(parsed), Err(Error::ExternalService { .. })));
    }

    #[test]
    fn unconfigured_generation_is_none() {
        let none = HttpGenerator::from_config(&GenerationConfig::default(), Duration::from_secs(5)).unwrap();
        assert!(none.is_none());
        let config = GenerationConfig { endpoint: Some("http://localhost:9/v1/chat/completions".into()), ..Default::default() };
        assert!(HttpGenerator::from_config(&config, Duration::from_secs(5)).is_err());
    }
}
