/*!
 * LLM-driven resegmentation of word-level transcripts.
 *
 * One batch flows through a fixed sequence: punctuation pre-split feeds
 * batching upstream, then the batch text goes to the segmentation model, the
 * response is cleaned and split into candidate sentences, every candidate is
 * classified against the five length tiers (splitting where a tier demands
 * it), the surviving sentences are aligned back onto the original word
 * timestamps, and under-length neighbors are merged.
 */

use std::sync::Arc;

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::{LengthThresholds, TranslatorConfig};
use crate::cancel::CancellationToken;
use crate::errors::SegmentError;
use crate::providers::{ChatCompleter, ChatRequest};
use crate::transcript::{count_tokens, is_sentence_terminator, join_texts, Fragment};

pub mod align;
pub mod split;

pub use align::merge_short_segments;
use align::align_sentences;
use split::{aggressive_split, fallback_split};

// @const: reasoning tags some models wrap their thinking in
static REASONING_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(think|thinking|reasoning)>.*?</(think|thinking|reasoning)>").unwrap()
});

/// A punctuation-delimited span over a word-level transcript. Owned by the
/// resegmentation stage for the duration of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PreSplitSentence {
    /// Sentence text with punctuation-aware spacing
    pub text: String,
    /// Index of the first word fragment (inclusive)
    pub word_start: usize,
    /// Index one past the last word fragment (exclusive)
    pub word_end: usize,
    /// Start time of the first word
    pub start_time_ms: u64,
    /// End time of the last word
    pub end_time_ms: u64,
}

/// Per-tier counters, accumulated for observability only; they never gate
/// pipeline continuation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierStats {
    /// Candidates at or under the target length
    pub within_target: usize,
    /// Candidates accepted with a log line (target < w <= tolerance)
    pub within_tolerance: usize,
    /// Candidates resolved by the rule-based split
    pub rule_split: usize,
    /// Candidates degraded to the position-based split
    pub forced_split: usize,
    /// Candidates beyond the max threshold (counted even when later split)
    pub rejected: usize,
}

impl TierStats {
    /// Fold another batch's counters into this one
    pub fn absorb(&mut self, other: TierStats) {
        self.within_target += other.within_target;
        self.within_tolerance += other.within_tolerance;
        self.rule_split += other.rule_split;
        self.forced_split += other.forced_split;
        self.rejected += other.rejected;
    }
}

/// Split a word-level fragment run into sentence spans at hard terminators.
///
/// A period between digits is a decimal point, not a terminator. Whatever
/// trails the last terminator becomes a final span.
pub fn presplit_by_punctuation(words: &[Fragment]) -> Vec<PreSplitSentence> {
    let mut sentences = Vec::new();
    let mut span_start = 0usize;

    for i in 0..words.len() {
        let text = words[i].text.trim_end();
        let terminated = text.chars().last().is_some_and(is_sentence_terminator)
            && !is_decimal_point(words, i);
        if terminated {
            sentences.push(make_span(words, span_start, i + 1));
            span_start = i + 1;
        }
    }
    if span_start < words.len() {
        sentences.push(make_span(words, span_start, words.len()));
    }
    sentences
}

fn make_span(words: &[Fragment], start: usize, end: usize) -> PreSplitSentence {
    PreSplitSentence {
        text: join_texts(words[start..end].iter().map(|f| f.text.as_str())),
        word_start: start,
        word_end: end,
        start_time_ms: words[start].start_time_ms,
        end_time_ms: words[end - 1].end_time_ms,
    }
}

/// A trailing '.' is a decimal point when it sits between digits, i.e. the
/// fragment ends "…<digit>." and the next fragment starts with a digit.
fn is_decimal_point(words: &[Fragment], i: usize) -> bool {
    let text = words[i].text.trim_end();
    if !text.ends_with('.') {
        return false;
    }
    let mut chars = text.chars().rev();
    chars.next();
    let digit_before = chars.next().is_some_and(|c| c.is_ascii_digit());
    let digit_after = words
        .get(i + 1)
        .and_then(|w| w.text.chars().next())
        .is_some_and(|c| c.is_ascii_digit());
    digit_before && digit_after
}

/// Resegmentation service for one pipeline run. Holds the configuration and
/// the chat-completion capability; each call to `resegment` processes one
/// batch slice of word fragments.
pub struct Resegmenter {
    config: TranslatorConfig,
    completer: Arc<dyn ChatCompleter>,
}

impl Resegmenter {
    /// Create a new resegmenter
    pub fn new(config: TranslatorConfig, completer: Arc<dyn ChatCompleter>) -> Self {
        Self { config, completer }
    }

    /// Resegment one batch of word fragments into sentence-level fragments
    /// with recovered timestamps.
    pub async fn resegment(
        &self,
        words: &[Fragment],
        cancel: &CancellationToken,
    ) -> Result<(Vec<Fragment>, TierStats), SegmentError> {
        let text = join_texts(words.iter().map(|f| f.text.as_str()));

        let request = ChatRequest::new(self.config.split_model.as_str(), self.config.render_split_prompt(), text)
            .temperature(self.config.temperature)
            .timeout_ms(self.config.timeout_secs * 1000)
            .cancel_token(cancel.clone());
        let response = self.completer.complete(request).await?;

        let candidates = self.clean_response(&response);
        if candidates.is_empty() {
            return Err(SegmentError::EmptyResponse);
        }

        let thresholds = self.config.length_thresholds();
        let mut stats = TierStats::default();
        let mut sentences: Vec<String> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            sentences.extend(self.classify(&candidate, thresholds, &mut stats));
        }

        let aligned = align_sentences(&sentences, words, self.config.match_threshold)?;
        let merged = merge_short_segments(aligned, self.config.max_word_count);
        Ok((merged, stats))
    }

    /// Strip reasoning tags, collapse newlines, and split the response on the
    /// configured delimiter
    fn clean_response(&self, response: &str) -> Vec<String> {
        let stripped = REASONING_TAGS.replace_all(response, "");
        let flat = stripped.replace(['\r', '\n'], " ");
        flat.split(&self.config.sentence_delimiter)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Apply the five-tier length classification to one candidate sentence
    fn classify(
        &self,
        sentence: &str,
        thresholds: LengthThresholds,
        stats: &mut TierStats,
    ) -> Vec<String> {
        let w = count_tokens(sentence);

        if w <= thresholds.target {
            stats.within_target += 1;
            return vec![sentence.to_string()];
        }
        if w <= thresholds.tolerance {
            stats.within_tolerance += 1;
            info!("accepting segment of {} words (target {})", w, thresholds.target);
            return vec![sentence.to_string()];
        }
        if w <= thresholds.warning {
            return match aggressive_split(sentence, thresholds.target) {
                Some(parts) => {
                    stats.rule_split += 1;
                    parts
                }
                None => {
                    warn!("no rule split for {}-word segment, accepting whole", w);
                    vec![sentence.to_string()]
                }
            };
        }

        if w > thresholds.max {
            stats.rejected += 1;
        }
        match aggressive_split(sentence, thresholds.target) {
            Some(parts) => {
                stats.rule_split += 1;
                parts
            }
            None => {
                stats.forced_split += 1;
                warn!("forcing position-based split of {}-word segment", w);
                fallback_split(sentence, thresholds.target)
            }
        }
    }
}
