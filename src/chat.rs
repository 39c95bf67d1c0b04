//! Chat-completion client.
//!
//! Requests carry one system message and one user message with fixed
//! sampling parameters, so the same prompt yields comparable plans across
//! runs.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::{resolve_api_key, ChatConfig};
use crate::http;

pub const TEMPERATURE: f32 = 0.0;
pub const TOP_P: f32 = 1.0;
pub const FREQUENCY_PENALTY: f32 = 0.0;
pub const PRESENCE_PENALTY: f32 = 0.5;

/// Produces an assistant reply for a system prompt plus a user message.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

impl<'a> ChatRequest<'a> {
    fn new(system_prompt: &'a str, user_message: &'a str) -> Self {
        Self {
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
        }
    }
}

/// Azure OpenAI chat completions over REST.
pub struct AzureChatClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    max_retries: u32,
}

impl AzureChatClient {
    /// Build from config, reading the key from `chat.api_key_env`.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_key_env)?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ChatConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatCompleter for AzureChatClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let body = serde_json::to_value(ChatRequest::new(system_prompt, user_message))?;

        let json = http::post_json(
            &self.client,
            &self.url,
            &self.api_key,
            &body,
            self.max_retries,
            "Chat API",
        )
        .await?;

        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}
