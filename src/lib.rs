/*!
 * # resubai - Resegmenting Subtitles with AI
 *
 * A Rust library that turns time-coded speech-to-text transcripts into
 * resegmented, dual-language subtitle tracks using an LLM as the text
 * transformation oracle.
 *
 * ## Features
 *
 * - Word-level timestamp reconstruction from phrase-level transcripts
 * - LLM-driven sentence boundary discovery with five-tier length safeguards
 * - Similarity-based realignment of cleaned sentences onto original timing
 * - Batched translation with a graduated failure fallback cascade
 * - Streaming partial results under bounded concurrency
 * - Cooperative cancellation threaded through every provider call
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `transcript`: Fragment model, granularity detection and word expansion
 * - `matching`: Block similarity and sentence-to-fragment window search
 * - `resegment`: Sentence boundary discovery, tier classification, alignment
 * - `translate`: Degradation-cascade translation and punctuation cleanup
 * - `pipeline`: End-to-end orchestration, batching and progress reporting
 * - `providers`: Chat-completion capability trait and client implementations
 * - `language_utils`: ISO language code utilities
 * - `cancel`: Cooperative cancellation token
 * - `errors`: Custom error types for the pipeline
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod cancel;
pub mod errors;
pub mod language_utils;
pub mod matching;
pub mod pipeline;
pub mod providers;
pub mod resegment;
pub mod transcript;
pub mod translate;

// Re-export main types for easier usage
pub use app_config::TranslatorConfig;
pub use cancel::CancellationToken;
pub use errors::{PipelineError, ProviderError, SegmentError, TranslationError};
pub use pipeline::{BilingualResult, Pipeline, ProgressPhase};
pub use providers::{ChatCompleter, ChatRequest, MockCompleter, OpenAiCompatible};
pub use transcript::{Fragment, Transcript};
pub use translate::TranslatedEntry;
