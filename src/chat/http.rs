/// HTTP chat client for the hosted and local providers

use crate::chat::{ChatClient, ChatMessage, Provider};
use crate::config::Config;
use crate::error::{LucienError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("LucienCLI/", env!("CARGO_PKG_VERSION"));

pub struct HttpChatClient {
    client: Client,
    timeout: Duration,
    primary_url: String,
    primary_key: Option<String>,
    primary_model: String,
    local_url: String,
    local_model: String,
}

#[derive(Serialize)]
struct PrimaryRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Serialize)]
struct LocalRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: LocalOptions,
}

#[derive(Serialize)]
struct LocalOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct PrimaryResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct LocalResponse {
    message: ChatMessage,
}

impl HttpChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            timeout,
            primary_url: config.groq_api_url.clone(),
            primary_key: config.groq_api_key.clone(),
            primary_model: config.groq_model.clone(),
            local_url: config.ollama_url.clone(),
            local_model: config.ollama_model.clone(),
        })
    }

    async fn complete_primary(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let key = self.primary_key.as_deref().ok_or_else(|| {
            LucienError::Chat("GROQ_API_KEY is not set. Export it or add it to .env.".to_string())
        })?;

        let body = PrimaryRequest {
            model: &self.primary_model,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(&self.primary_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error("Groq", e))?;

        let data = read_json("Groq", response).await?;
        let parsed: PrimaryResponse = serde_json::from_value(data.clone())
            .map_err(|_| unexpected_shape("Groq", &data))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| unexpected_shape("Groq", &data))
    }

    async fn complete_local(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let body = LocalRequest {
            model: &self.local_model,
            messages,
            stream: false,
            options: LocalOptions { temperature },
        };

        let response = self
            .client
            .post(&self.local_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error("Ollama", e))?;

        let data = read_json("Ollama", response).await?;
        let parsed: LocalResponse = serde_json::from_value(data.clone())
            .map_err(|_| unexpected_shape("Ollama", &data))?;

        Ok(parsed.message.content)
    }

    fn transport_error(&self, label: &str, err: reqwest::Error) -> LucienError {
        if err.is_timeout() {
            LucienError::Timeout {
                what: format!("{} request", label),
                secs: self.timeout.as_secs(),
            }
        } else {
            LucienError::Chat(format!("{} request failed: {}", label, err))
        }
    }
}

async fn read_json(label: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| LucienError::Chat(format!("{} response could not be read: {}", label, e)))?;

    if !status.is_success() {
        return Err(LucienError::Chat(format!(
            "{} returned {}: {}",
            label,
            status_label(status),
            truncate(&text, 200)
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| LucienError::Chat(format!("{}: invalid JSON response: {}", label, e)))
}

fn status_label(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn unexpected_shape(label: &str, data: &Value) -> LucienError {
    LucienError::Chat(format!(
        "{}: unexpected response format: {}",
        label,
        truncate(&data.to_string(), 200)
    ))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    #[instrument(skip_all, fields(%provider, messages = messages.len()))]
    async fn complete(
        &self,
        provider: Provider,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String> {
        let started = Instant::now();
        let result = match provider {
            Provider::Primary => self.complete_primary(messages, temperature).await,
            Provider::Local => self.complete_local(messages, temperature).await,
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "chat request finished"
        );
        result
    }
}
