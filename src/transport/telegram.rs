//! Telegram Bot API client
//!
//! Minimal REST client: `sendMessage` for reports, `getUpdates` for
//! long polling.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::Config;

use super::{ReportSink, TransportError, UpdateSource};

/// Extra time the HTTP client waits beyond the long-poll timeout
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 10;

// =========================================================================
// Bot API types
// =========================================================================

/// Envelope wrapping every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

/// Incoming update
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Chat message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

impl Message {
    /// A message is a command when it opens with a `bot_command` entity
    pub fn is_command(&self) -> bool {
        self.entities
            .iter()
            .any(|entity| entity.kind == "bot_command" && entity.offset == 0)
    }
}

/// Message sender
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl TelegramUser {
    /// First and last name joined by a space
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Chat a message was sent in
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        self.kind == "group" || self.kind == "supergroup"
    }
}

/// Formatting entity inside a message
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

// =========================================================================
// Client
// =========================================================================

/// Telegram Bot API client bound to one report chat
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    chat_id: i64,
}

// The base URL embeds the bot token
impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a client from the application configuration
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.poll_timeout_secs + HTTP_TIMEOUT_MARGIN_SECS,
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.telegram_api_url, config.telegram_token),
            chat_id: config.group_chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // Request URLs carry the token, keep them out of error messages
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        unwrap_envelope(method, envelope)
    }

    /// Send a Markdown message to `chat_id`
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "Markdown",
        };
        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        Ok(())
    }

    /// Long-poll for message updates starting at `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &request).await
    }
}

fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> Result<T, TransportError> {
    if !envelope.ok {
        return Err(TransportError::Api {
            code: envelope.error_code.unwrap_or_default(),
            description: envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
        });
    }

    envelope
        .result
        .ok_or_else(|| TransportError::MalformedResponse(format!("{} returned no result", method)))
}

#[async_trait]
impl ReportSink for TelegramClient {
    async fn send_report(&self, text: &str) -> Result<(), TransportError> {
        self.send_message(self.chat_id, text).await
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        TelegramClient::get_updates(self, offset, timeout_secs).await
    }
}
