/// Chat-completion collaborator
///
/// Anything the router can't match is handed to a chat model. Two
/// providers are supported: a hosted OpenAI-compatible endpoint and a
/// local Ollama server.

pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use http::HttpChatClient;

/// Persona prompt sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are Lucien, a modern wizard AI coding assistant.\n\
Keep responses concise and practical.";

/// Which backend answers a chat request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Hosted provider, needs network and an API key
    Primary,
    /// Local model server
    Local,
}

impl Provider {
    /// Provider selected by the `internet on|off` flag.
    pub fn for_internet(online: bool) -> Self {
        if online {
            Provider::Primary
        } else {
            Provider::Local
        }
    }

    /// Parse a provider name as typed after `ai`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "primary" | "groq" => Some(Provider::Primary),
            "local" | "ollama" => Some(Provider::Local),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Primary => write!(f, "primary"),
            Provider::Local => write!(f, "local"),
        }
    }
}

/// Role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Persona prompt followed by one user message.
pub fn conversation(prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `messages` to `provider` and return the assistant's text.
    async fn complete(
        &self,
        provider: Provider,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String>;
}

#[cfg(test)]
pub use self::scripted::ScriptedChat;
