/*!
 * Batched translation with graduated failure fallback.
 *
 * Three cascading strategies always converge on full output coverage: one
 * batch call with indexed markers, one full-batch retry, then bounded
 * per-entry calls for whatever is still missing. A single entry that fails
 * every level becomes visible placeholder text rather than a dropped line,
 * so fragment counts and timing survive downstream.
 */

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::TranslatorConfig;
use crate::cancel::CancellationToken;
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::{ChatCompleter, ChatRequest};
use crate::transcript::Fragment;

pub mod formatting;

use formatting::normalize_subtitle_punctuation;

/// Placeholder prefix for entries that failed every cascade level
pub const FAILURE_PLACEHOLDER: &str = "[translation failed]";

// @const: batch entry marker in prompts and responses
static ENTRY_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<<ENTRY_(\d+)>>").unwrap());

/// One translated sentence with its recovered timing. Immutable after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedEntry {
    /// Ordinal of the source fragment
    pub ordinal: usize,
    /// Start time in ms
    pub start_time_ms: u64,
    /// End time in ms
    pub end_time_ms: u64,
    /// Source-language text
    pub original: String,
    /// Target-language text (or the failure placeholder)
    pub translation: String,
}

impl TranslatedEntry {
    /// Whether this entry carries the failure placeholder
    pub fn is_failed(&self) -> bool {
        self.translation.starts_with(FAILURE_PLACEHOLDER)
    }
}

/// Translation service for one pipeline run
pub struct Translator {
    config: TranslatorConfig,
    completer: Arc<dyn ChatCompleter>,
}

impl Translator {
    /// Create a new translator
    pub fn new(config: TranslatorConfig, completer: Arc<dyn ChatCompleter>) -> Self {
        Self { config, completer }
    }

    /// Translate a batch of resegmented fragments into the target language.
    ///
    /// The output always contains exactly one entry per input fragment,
    /// re-sorted by ordinal. Fatal provider errors and cancellation propagate
    /// immediately; everything else degrades through the cascade.
    pub async fn translate(
        &self,
        fragments: &[Fragment],
        cancel: &CancellationToken,
    ) -> Result<Vec<TranslatedEntry>, TranslationError> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let mut slots: Vec<Option<String>> = vec![None; fragments.len()];

        // Level 1: whole batch in one call
        match self.call_batch(fragments, cancel).await {
            Ok(parsed) => fill_empty_slots(&mut slots, parsed),
            Err(e) => self.check_terminal(e)?,
        }

        // Level 2: one full-batch retry if anything is missing
        if slots.iter().any(Option::is_none) {
            warn!(
                "batch translation left {} of {} entries unfilled, retrying batch",
                slots.iter().filter(|s| s.is_none()).count(),
                slots.len()
            );
            match self.call_batch(fragments, cancel).await {
                Ok(parsed) => fill_empty_slots(&mut slots, parsed),
                Err(e) => self.check_terminal(e)?,
            }
        }

        // Level 3: per-entry concurrent calls for whatever is still failed
        let missing: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
            .collect();
        if !missing.is_empty() {
            info!("translating {} entries individually", missing.len());
            let results: Vec<(usize, Result<String, ProviderError>)> =
                stream::iter(missing.into_iter())
                    .map(|i| {
                        let text = fragments[i].text.clone();
                        let cancel = cancel.clone();
                        async move { (i, self.call_single(&text, &cancel).await) }
                    })
                    .buffer_unordered(self.config.concurrent_requests)
                    .collect()
                    .await;

            for (i, result) in results {
                match result {
                    Ok(translation) => slots[i] = Some(translation),
                    Err(e) => {
                        self.check_terminal(e)?;
                        // Terminal placeholder for this entry only
                        slots[i] = None;
                    }
                }
            }
        }

        let chinese_target = language_utils::is_chinese(&self.config.target_language);
        let mut entries: Vec<TranslatedEntry> = fragments
            .iter()
            .zip(slots)
            .map(|(frag, slot)| {
                let translation = match slot {
                    Some(text) if chinese_target => normalize_subtitle_punctuation(&text),
                    Some(text) => text,
                    None => format!("{} {}", FAILURE_PLACEHOLDER, frag.text),
                };
                TranslatedEntry {
                    ordinal: frag.ordinal,
                    start_time_ms: frag.start_time_ms,
                    end_time_ms: frag.end_time_ms,
                    original: frag.text.clone(),
                    translation,
                }
            })
            .collect();
        entries.sort_by_key(|e| e.ordinal);
        Ok(entries)
    }

    /// Propagate errors the cascade must not swallow
    fn check_terminal(&self, e: ProviderError) -> Result<(), TranslationError> {
        if e.is_cancelled() || e.is_fatal() {
            return Err(TranslationError::Provider(e));
        }
        warn!("translation call failed, degrading: {}", e);
        Ok(())
    }

    /// One batch call: entries encoded with index markers, response decoded
    /// by the same markers
    async fn call_batch(
        &self,
        fragments: &[Fragment],
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<String>>, ProviderError> {
        let mut user = String::new();
        for (i, frag) in fragments.iter().enumerate() {
            user.push_str(&format!("<<ENTRY_{}>>\n{}\n", i, frag.text));
        }
        user.push_str("<<END>>");

        let request = ChatRequest::new(
            self.config.translate_model.as_str(),
            self.config.render_translate_prompt(),
            user,
        )
        .temperature(self.config.temperature)
        .timeout_ms(self.config.timeout_secs * 1000)
        .cancel_token(cancel.clone());

        let response = self.completer.complete(request).await?;
        Ok(parse_tagged_response(&response, fragments.len()))
    }

    /// One single-entry call: plain text in, plain translation out
    async fn call_single(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest::new(
            self.config.translate_model.as_str(),
            self.config.render_translate_prompt(),
            text,
        )
        .temperature(self.config.temperature)
        .timeout_ms(self.config.timeout_secs * 1000)
        .cancel_token(cancel.clone());

        let response = self.completer.complete(request).await?;
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::ParseError("empty translation".to_string()));
        }
        Ok(trimmed.to_string())
    }
}

/// Fill only the slots that are still empty, leaving earlier results alone
fn fill_empty_slots(slots: &mut [Option<String>], parsed: Vec<Option<String>>) {
    for (slot, value) in slots.iter_mut().zip(parsed) {
        if slot.is_none() {
            *slot = value;
        }
    }
}

/// Decode a marker-tagged batch response into per-index texts. Indices
/// missing from the response stay `None`; indices out of range are dropped.
fn parse_tagged_response(response: &str, n: usize) -> Vec<Option<String>> {
    let mut slots: Vec<Option<String>> = vec![None; n];

    let markers: Vec<(usize, usize, usize)> = ENTRY_MARKER
        .captures_iter(response)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let index: usize = cap.get(1)?.as_str().parse().ok()?;
            Some((index, whole.start(), whole.end()))
        })
        .collect();

    for (pos, &(index, _, body_start)) in markers.iter().enumerate() {
        let body_end = markers
            .get(pos + 1)
            .map(|&(_, next_start, _)| next_start)
            .unwrap_or(response.len());
        let mut body = &response[body_start..body_end];
        if let Some(end_pos) = body.find("<<END>>") {
            body = &body[..end_pos];
        }
        let body = body.trim();
        if !body.is_empty() && index < n {
            slots[index] = Some(body.to_string());
        }
    }

    slots
}
