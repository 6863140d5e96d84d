/*!
 * Mock completer for testing.
 *
 * Simulates provider behavior without a network:
 * - `MockCompleter::echo()` - returns the user prompt unchanged
 * - `MockCompleter::scripted(...)` - plays back a fixed response sequence
 * - `MockCompleter::failing(...)` - always fails with the given error builder
 * Every request is recorded so tests can assert on prompts and call counts.
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{ChatCompleter, ChatRequest};

/// One scripted outcome for a mock call
#[derive(Debug)]
pub enum MockOutcome {
    /// Succeed with this text
    Reply(String),
    /// Fail with a rate-limit error (retryable)
    RateLimited,
    /// Fail with a 500 (retryable)
    ServerError,
    /// Fail with an authentication error (fatal)
    AuthError,
    /// Fail with a timeout (retryable)
    Timeout,
}

impl MockOutcome {
    fn into_result(self) -> Result<String, ProviderError> {
        match self {
            Self::Reply(text) => Ok(text),
            Self::RateLimited => Err(ProviderError::RateLimitExceeded("mock 429".to_string())),
            Self::ServerError => Err(ProviderError::ApiError {
                status_code: 500,
                message: "mock server error".to_string(),
            }),
            Self::AuthError => Err(ProviderError::AuthenticationError("mock 401".to_string())),
            Self::Timeout => Err(ProviderError::Timeout(0)),
        }
    }
}

/// Test double for `ChatCompleter`
#[derive(Debug, Default)]
pub struct MockCompleter {
    /// Scripted outcomes, consumed front to back
    script: Mutex<VecDeque<MockOutcome>>,
    /// Whether to echo the user prompt once the script is exhausted
    echo_after_script: bool,
    /// Artificial latency per call
    delay_ms: u64,
    /// Every request seen, for assertions
    requests: Mutex<Vec<ChatRequest>>,
    /// Number of calls made
    call_count: AtomicUsize,
}

impl MockCompleter {
    /// Mock that echoes the user prompt back
    pub fn echo() -> Self {
        Self {
            echo_after_script: true,
            ..Self::default()
        }
    }

    /// Mock that plays back the given outcomes in order, then errors
    pub fn scripted(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    /// Mock that plays back the given outcomes, then echoes
    pub fn scripted_then_echo(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            echo_after_script: true,
            ..Self::default()
        }
    }

    /// Add artificial latency to every call
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request seen so far
    pub fn seen_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompleter for MockCompleter {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.delay_ms > 0 {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(self.delay_ms)) => {}
                _ = request.cancel.cancelled() => return Err(ProviderError::Cancelled),
            }
        }
        if request.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome.into_result(),
            None if self.echo_after_script => Ok(request.user),
            None => Err(ProviderError::ParseError(
                "mock script exhausted".to_string(),
            )),
        }
    }
}
