//! OpenAI-compatible chat completion gateway (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use baymax_core::config::GenerationSettings;
use baymax_core::traits::TextGenerator;
use baymax_core::{Error, Result};

const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("generation.api_key is not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("generation client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key: api_key.to_string(),
            temperature: settings.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request<'a>(&'a self, system_prompt: &'a str, user_message: Option<&'a str>) -> ChatRequest<'a> {
        let mut messages = vec![ChatMessage { role: "system", content: system_prompt }];
        if let Some(content) = user_message {
            messages.push(ChatMessage { role: "user", content });
        }
        ChatRequest { model: &self.model, messages, temperature: self.temperature }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, system_prompt: &str, user_message: Option<&str>) -> Result<String> {
        debug!("Requesting completion from {} (model={})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(system_prompt, user_message))
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            return Err(Error::GenerationUnavailable(format!("generation endpoint returned {status}: {body}")));
        }
        let parsed: ChatCompletion = response.json().await.map_err(unavailable)?;
        extract_content(parsed)
    }
}

fn extract_content(parsed: ChatCompletion) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| Error::GenerationUnavailable("response has no choices[0].message.content".into()))
}

fn unavailable(err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() { "timed out" } else if err.is_connect() { "unreachable" } else { "failed" };
    Error::GenerationUnavailable(format!("generation request {kind}: {}", err.without_url()))
}
