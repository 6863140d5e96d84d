/*!
 * Provider abstraction for the LLM calls the pipeline makes.
 *
 * The pipeline consumes a single chat-completion capability through the
 * `ChatCompleter` trait; the HTTP transport behind it is an implementation
 * detail. One concrete client ships here:
 * - OpenAiCompatible: any OpenAI-style chat-completions endpoint
 * plus a MockCompleter for tests that need no network.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::cancel::CancellationToken;
use crate::errors::ProviderError;

/// One chat-completion call: system + user message and per-call controls.
/// The cancellation token rides along so every implementation can abort at
/// its next suspension point.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model name
    pub model: String,

    /// System prompt guiding the model
    pub system: String,

    /// User message content
    pub user: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,

    /// Cooperative cancellation handle for this run
    pub cancel: CancellationToken,
}

impl ChatRequest {
    /// Create a request with default temperature and timeout
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            timeout_ms: 30_000,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-call timeout
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Attach the run's cancellation token
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Common trait for chat-completion providers
///
/// Implementations return the assistant's text or a classified error; the
/// retry policy lives inside the implementation so callers see only the
/// final outcome of a call.
#[async_trait]
pub trait ChatCompleter: Send + Sync + Debug {
    /// Complete a chat request, returning the assistant message text
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = ChatRequest::new(model, "", "Hello");
        self.complete(request).await.map(|_| ())
    }
}

pub mod mock;
pub mod openai;

pub use mock::MockCompleter;
pub use openai::OpenAiCompatible;
