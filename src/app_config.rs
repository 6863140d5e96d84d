use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;

/// Pipeline configuration module
/// This module holds the flat configuration record consumed read-only by every
/// component of the pipeline: provider endpoint and credentials, model names,
/// target language, segment length thresholds and concurrency settings.
/// Prompt templates are carried as opaque strings with sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslatorConfig {
    /// Chat-completion endpoint URL (OpenAI-compatible)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model used for sentence boundary discovery
    #[serde(default = "default_split_model")]
    pub split_model: String,

    /// Model used for translation
    #[serde(default = "default_translate_model")]
    pub translate_model: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Target word count per subtitle segment
    #[serde(default = "default_max_word_count")]
    pub max_word_count: usize,

    /// Multiplier above which a segment is split if syntax allows (tier 3)
    #[serde(default = "default_tolerance_multiplier")]
    pub tolerance_multiplier: f64,

    /// Multiplier above which a segment is force-split (tier 4)
    #[serde(default = "default_warning_multiplier")]
    pub warning_multiplier: f64,

    /// Multiplier above which a segment counts as rejected (tier 5)
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: f64,

    /// Maximum number of concurrent batch pipelines / per-entry requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed backoff schedule in milliseconds; its length bounds the retries
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: Vec<u64>,

    /// Sampling temperature for both models
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Minimum sentences per non-first batch
    #[serde(default = "default_batch_size_min")]
    pub batch_size_min: usize,

    /// Maximum sentences per non-first batch
    #[serde(default = "default_batch_size_max")]
    pub batch_size_max: usize,

    /// Similarity threshold below which an alignment candidate is rejected
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// System prompt template for segmentation
    /// Placeholders: {max_word_count}, {delimiter}
    #[serde(default = "default_split_prompt")]
    pub split_prompt: String,

    /// System prompt template for translation
    /// Placeholders: {target_language}
    #[serde(default = "default_translate_prompt")]
    pub translate_prompt: String,

    /// Delimiter token the segmentation model is asked to emit between sentences
    #[serde(default = "default_sentence_delimiter")]
    pub sentence_delimiter: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            split_model: default_split_model(),
            translate_model: default_translate_model(),
            target_language: default_target_language(),
            max_word_count: default_max_word_count(),
            tolerance_multiplier: default_tolerance_multiplier(),
            warning_multiplier: default_warning_multiplier(),
            max_multiplier: default_max_multiplier(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            batch_size_min: default_batch_size_min(),
            batch_size_max: default_batch_size_max(),
            match_threshold: default_match_threshold(),
            split_prompt: default_split_prompt(),
            translate_prompt: default_translate_prompt(),
            sentence_delimiter: default_sentence_delimiter(),
        }
    }
}

/// Word-count thresholds derived from `max_word_count` and the three multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthThresholds {
    /// Segments up to here are accepted silently
    pub target: usize,
    /// Segments up to here are accepted with a log line
    pub tolerance: usize,
    /// Segments up to here get a rule-based split attempt
    pub warning: usize,
    /// Segments beyond here are counted as rejections
    pub max: usize,
}

impl TranslatorConfig {
    /// Derive the five-tier word-count thresholds
    pub fn length_thresholds(&self) -> LengthThresholds {
        let target = self.max_word_count;
        LengthThresholds {
            target,
            tolerance: (target as f64 * self.tolerance_multiplier).ceil() as usize,
            warning: (target as f64 * self.warning_multiplier).ceil() as usize,
            max: (target as f64 * self.max_multiplier).ceil() as usize,
        }
    }

    /// Validate the configuration before a pipeline run
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("Endpoint is required"));
        }
        url::Url::parse(&self.endpoint)
            .map_err(|e| anyhow!("Invalid endpoint URL {}: {}", self.endpoint, e))?;
        if self.split_model.trim().is_empty() || self.translate_model.trim().is_empty() {
            return Err(anyhow!("Both split and translate model names are required"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language is required"));
        }
        if self.max_word_count == 0 {
            return Err(anyhow!("max_word_count must be at least 1"));
        }
        if !(self.tolerance_multiplier >= 1.0
            && self.warning_multiplier > self.tolerance_multiplier
            && self.max_multiplier > self.warning_multiplier)
        {
            return Err(anyhow!(
                "Length multipliers must satisfy 1.0 <= tolerance < warning < max, got {} / {} / {}",
                self.tolerance_multiplier,
                self.warning_multiplier,
                self.max_multiplier
            ));
        }
        if self.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if self.batch_size_min == 0 || self.batch_size_max < self.batch_size_min {
            return Err(anyhow!(
                "Batch size range is invalid: {}..{}",
                self.batch_size_min,
                self.batch_size_max
            ));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(anyhow!("match_threshold must be within 0.0..=1.0"));
        }
        if self.sentence_delimiter.trim().is_empty() {
            return Err(anyhow!("sentence_delimiter must not be blank"));
        }
        Ok(())
    }

    /// Render the segmentation system prompt
    pub fn render_split_prompt(&self) -> String {
        self.split_prompt
            .replace("{max_word_count}", &self.max_word_count.to_string())
            .replace("{delimiter}", &self.sentence_delimiter)
    }

    /// Render the translation system prompt
    pub fn render_translate_prompt(&self) -> String {
        let language_name = crate::language_utils::display_name(&self.target_language);
        self.translate_prompt
            .replace("{target_language}", &language_name)
    }
}

// Default value functions

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_split_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_translate_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_max_word_count() -> usize {
    14
}

fn default_tolerance_multiplier() -> f64 {
    1.2
}

fn default_warning_multiplier() -> f64 {
    1.5
}

fn default_max_multiplier() -> f64 {
    2.0
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> Vec<u64> {
    vec![1000, 2000]
}

fn default_temperature() -> f32 {
    0.3
}

fn default_batch_size_min() -> usize {
    10
}

fn default_batch_size_max() -> usize {
    30
}

fn default_match_threshold() -> f64 {
    0.6
}

fn default_split_prompt() -> String {
    "You are a subtitle segmentation assistant. Rewrite the transcript below into \
     complete sentences, fixing casing and punctuation but never changing any words. \
     Keep every sentence at or under {max_word_count} words where the text allows it. \
     Output the sentences in order, separated by {delimiter}, with no commentary."
        .to_string()
}

fn default_translate_prompt() -> String {
    "You are a professional subtitle translator. Translate each entry below into \
     {target_language}. Keep each <<ENTRY_n>> marker on its own line, immediately \
     followed by the translation of that entry, and finish with <<END>>. \
     Only respond with the marked translations, without any explanations."
        .to_string()
}

fn default_sentence_delimiter() -> String {
    "<br>".to_string()
}
