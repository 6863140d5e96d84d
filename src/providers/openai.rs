use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use reqwest::Client;
use log::{error, warn};

use crate::errors::ProviderError;
use crate::providers::{ChatCompleter, ChatRequest};

/// Client for OpenAI-compatible chat-completion endpoints
///
/// Retries retryable failures on a fixed backoff schedule; fatal errors
/// (bad credentials, unknown model) propagate immediately, and cancellation
/// aborts between attempts and during backoff sleeps.
#[derive(Debug)]
pub struct OpenAiCompatible {
    /// HTTP client for API requests
    client: Client,
    /// API key for bearer authentication
    api_key: String,
    /// Endpoint base URL (e.g. "https://api.openai.com/v1")
    endpoint: String,
    /// Fixed backoff schedule in ms; its length bounds the retry count
    backoff_schedule: Vec<u64>,
}

/// Chat message object
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    role: String,
    /// Content of the message
    content: String,
}

/// Wire request for the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    /// Model name
    model: String,
    /// Conversation messages
    messages: Vec<ChatMessage>,
    /// Sampling temperature
    temperature: f32,
}

/// One completion choice in the response
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// The assistant message
    message: ChatMessage,
}

/// Wire response from the chat completions endpoint
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    /// Generated choices
    choices: Vec<ChatChoice>,
}

impl OpenAiCompatible {
    /// Create a new client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new_with_backoff(api_key, endpoint, vec![1000, 2000])
    }

    /// Create a new client with an explicit backoff schedule
    pub fn new_with_backoff(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        backoff_schedule: Vec<u64>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            backoff_schedule,
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.endpoint.trim_end_matches('/')
        )
    }

    /// Issue the request once, classifying any failure
    async fn send_once(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
        };

        let send = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_millis(request.timeout_ms))
            .json(&body)
            .send();

        let response = tokio::select! {
            result = send => result.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(request.timeout_ms)
                } else {
                    ProviderError::ConnectionError(e.to_string())
                }
            })?,
            _ = request.cancel.cancelled() => return Err(ProviderError::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationError(message),
                404 => ProviderError::ModelNotFound(format!("{}: {}", request.model, message)),
                429 => ProviderError::RateLimitExceeded(message),
                code => ProviderError::ApiError {
                    status_code: code,
                    message,
                },
            });
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))
    }
}

#[async_trait]
impl ChatCompleter for OpenAiCompatible {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let attempts = self.backoff_schedule.len() + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if request.cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            match self.send_once(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let backoff_ms = self.backoff_schedule[attempt];
                    warn!(
                        "provider call failed (attempt {}/{}), retrying in {} ms: {}",
                        attempt + 1,
                        attempts,
                        backoff_ms,
                        e
                    );
                    last_error = Some(e);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
                        _ = request.cancel.cancelled() => return Err(ProviderError::Cancelled),
                    }
                }
                Err(e) => {
                    error!("provider call failed terminally: {}", e);
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::ConnectionError("no attempts were made".to_string())))
    }
}
