use crate::config::Config;
use crate::conversation::Message;
use crate::events::Preferences;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

/// Request body sent to the recipe endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Message>,
    pub meal_type: String,
    pub dietary_preference: String,
    pub skill_level: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, history: Vec<Message>, preferences: Preferences) -> Self {
        Self {
            message: message.into(),
            history,
            meal_type: preferences.meal_type.wire_value().to_string(),
            dietary_preference: preferences.dietary_preference.wire_value().to_string(),
            skill_level: preferences.skill_level.wire_value().to_string(),
        }
    }
}

/// Successful response body. A missing or null `reply` reads as blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
}

impl ChatReply {
    #[cfg(test)]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    /// Reply text with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.reply.as_deref().unwrap_or_default().trim()
    }
}

/// Body of a non-success response
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Ways a recipe exchange can fail
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never completed or the response could not be read
    #[error("transport failure: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("server returned {status}")]
    Server { status: u16, message: Option<String> },
}

impl ServiceError {
    pub fn server(status: u16, message: Option<&str>) -> Self {
        ServiceError::Server {
            status,
            message: message.map(str::to_string),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

/// Extract the user-facing message from an error response body.
pub fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
}

/// Something that can turn a conversation into a recipe reply
#[async_trait]
pub trait RecipeService: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError>;
}

/// HTTP client for the recipe endpoint
#[derive(Clone)]
pub struct HttpRecipeService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRecipeService {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecipeService for HttpRecipeService {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            history = request.history.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::server(
                status.as_u16(),
                server_message(&body).as_deref(),
            ));
        }

        let reply = response.json::<ChatReply>().await?;
        Ok(reply)
    }
}
