/*!
 * Error types for the resubai pipeline.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions. Provider errors
 * carry a retryable/fatal classification that drives the retry policy and the
 * translation degradation cascade.
 */

use thiserror::Error;

/// Errors that can occur when talking to an LLM provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication (invalid or missing credentials)
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Requested model does not exist on the provider
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Request exceeded its per-call timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The call was cancelled cooperatively
    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether the retry policy may re-issue the request.
    ///
    /// Timeouts, connection failures, 429 and 5xx qualify. Cancellation is
    /// neither retryable nor fatal; it short-circuits everything.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            _ => false,
        }
    }

    /// Whether the error must abort the run immediately (never retried).
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AuthenticationError(_) | Self::ModelNotFound(_) => true,
            Self::ApiError { status_code, .. } => {
                matches!(status_code, 401 | 403 | 404)
            }
            _ => false,
        }
    }

    /// Whether this error is a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors that can occur during resegmentation of a batch
#[derive(Error, Debug)]
pub enum SegmentError {
    /// Too many consecutive sentences could not be matched back onto the
    /// original timestamps. Fatal to the batch, not to sibling batches.
    #[error("alignment failed: {consecutive} consecutive sentences unmatched")]
    AlignmentFailed {
        /// Number of consecutive unmatched sentences
        consecutive: usize,
    },

    /// The LLM response contained no usable sentences
    #[error("segmentation response was empty")]
    EmptyResponse,

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Response could not be decoded into indexed entries
    #[error("Failed to parse batch response: {0}")]
    BatchParse(String),
}

/// Terminal pipeline error handed to the caller
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input transcript contained no fragments
    #[error("input transcript is empty")]
    EmptyTranscript,

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from resegmentation
    #[error("Segmentation error: {0}")]
    Segment(#[from] SegmentError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// The run was cancelled cooperatively
    #[error("pipeline cancelled")]
    Cancelled,

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::InvalidConfig(error.to_string())
    }
}
