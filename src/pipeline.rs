/*!
 * End-to-end pipeline orchestration.
 *
 * Drives the full flow: word-level conversion, punctuation pre-split,
 * sentence batching, a synchronous first batch for fast feedback, then the
 * remaining batches under a bounded concurrency window. Every finished batch
 * streams out through the partial-result channel the moment it completes;
 * the run's return value is the merged, time-sorted whole.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::app_config::TranslatorConfig;
use crate::cancel::CancellationToken;
use crate::errors::{PipelineError, SegmentError, TranslationError};
use crate::providers::ChatCompleter;
use crate::resegment::{presplit_by_punctuation, PreSplitSentence, Resegmenter};
use crate::transcript::{Fragment, Transcript};
use crate::translate::{TranslatedEntry, Translator};

/// Sentences in the fixed-size first batch
const FIRST_BATCH_SIZE: usize = 5;

/// Pipeline progress phases reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Pre-split finished, sentence total known
    Split,
    /// Sentences translated so far
    Translate,
    /// Run finished
    Complete,
}

/// Progress callback: `(phase, current, total)` with a monotonically
/// increasing completed-sentence count
pub type ProgressCallback = Arc<dyn Fn(ProgressPhase, usize, usize) + Send + Sync>;

/// Two parallel subtitle tracks, index-aligned 1:1. Entry *i* of both tracks
/// shares identical start and end times.
#[derive(Debug, Clone, Default)]
pub struct BilingualResult {
    /// Source-language track
    pub source_track: Vec<Fragment>,
    /// Target-language track
    pub target_track: Vec<Fragment>,
    /// Whether this is the synchronously processed first batch
    pub is_first: bool,
}

impl BilingualResult {
    fn from_entries(entries: &[TranslatedEntry], is_first: bool) -> Self {
        let source_track = entries
            .iter()
            .map(|e| Fragment::new(e.ordinal, e.start_time_ms, e.end_time_ms, e.original.clone()))
            .collect();
        let target_track = entries
            .iter()
            .map(|e| {
                Fragment::new(e.ordinal, e.start_time_ms, e.end_time_ms, e.translation.clone())
            })
            .collect();
        Self {
            source_track,
            target_track,
            is_first,
        }
    }

    /// Number of entries per track
    pub fn len(&self) -> usize {
        self.source_track.len()
    }

    /// Whether both tracks are empty
    pub fn is_empty(&self) -> bool {
        self.source_track.is_empty()
    }
}

/// One batch of pre-split sentences with its word-fragment slice
struct SentenceBatch {
    /// Copy of the word fragments this batch owns
    words: Vec<Fragment>,
    /// Number of pre-split sentences, for progress accounting
    sentence_count: usize,
}

/// How the orchestrator reacts to one batch's outcome
enum BatchOutcome {
    Done(Vec<TranslatedEntry>),
    Skipped,
}

/// Pipeline orchestrator for one run
pub struct Pipeline {
    config: TranslatorConfig,
    completer: Arc<dyn ChatCompleter>,
}

impl Pipeline {
    /// Create a pipeline after validating the configuration
    pub fn new(
        config: TranslatorConfig,
        completer: Arc<dyn ChatCompleter>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config, completer })
    }

    /// Run the full pipeline over a raw transcript.
    ///
    /// Partial results stream through `partials` in completion order (only
    /// the first batch is ordered by construction); the return value is the
    /// merged result sorted by start time. Cancellation aborts in-flight
    /// work without retracting partials already sent.
    pub async fn run(
        &self,
        fragments: Vec<Fragment>,
        partials: UnboundedSender<BilingualResult>,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<BilingualResult, PipelineError> {
        let transcript = Transcript::new(fragments);
        if transcript.is_empty() {
            return Err(PipelineError::EmptyTranscript);
        }

        let words = if transcript.is_word_level() {
            transcript
        } else {
            transcript.expand_to_words()
        };

        let sentences = presplit_by_punctuation(words.fragments());
        let total_sentences = sentences.len();
        info!(
            "pre-split {} word fragments into {} sentences",
            words.len(),
            total_sentences
        );
        if let Some(cb) = &progress {
            cb(ProgressPhase::Split, 0, total_sentences);
        }

        let batches = self.form_batches(&words, &sentences);
        let completed = Arc::new(AtomicUsize::new(0));
        let resegmenter = Arc::new(Resegmenter::new(self.config.clone(), self.completer.clone()));
        let translator = Arc::new(Translator::new(self.config.clone(), self.completer.clone()));

        let mut all_entries: Vec<TranslatedEntry> = Vec::new();
        let mut batch_iter = batches.into_iter();

        // First batch runs synchronously end-to-end
        if let Some(first) = batch_iter.next() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let outcome = self
                .process_batch(&resegmenter, &translator, &first, true, &partials, &cancel)
                .await?;
            finish_batch(&first, &outcome, &completed, &progress, total_sentences);
            if let BatchOutcome::Done(entries) = outcome {
                all_entries.extend(entries);
            }
        }

        // Remaining batches under a bounded concurrency window
        let remaining: Vec<SentenceBatch> = batch_iter.collect();
        if !remaining.is_empty() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let results: Vec<Result<(SentenceBatch, BatchOutcome), PipelineError>> =
                stream::iter(remaining.into_iter())
                    .map(|batch| {
                        let resegmenter = resegmenter.clone();
                        let translator = translator.clone();
                        let partials = partials.clone();
                        let cancel = cancel.clone();
                        let completed = completed.clone();
                        let progress = progress.clone();
                        async move {
                            let outcome = self
                                .process_batch(
                                    &resegmenter,
                                    &translator,
                                    &batch,
                                    false,
                                    &partials,
                                    &cancel,
                                )
                                .await?;
                            finish_batch(&batch, &outcome, &completed, &progress, total_sentences);
                            Ok((batch, outcome))
                        }
                    })
                    .buffer_unordered(self.config.concurrent_requests)
                    .collect()
                    .await;

            for result in results {
                if let (_, BatchOutcome::Done(entries)) = result? {
                    all_entries.extend(entries);
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        all_entries.sort_by_key(|e| e.start_time_ms);
        let mut merged = BilingualResult::from_entries(&all_entries, false);
        for (i, (src, dst)) in merged
            .source_track
            .iter_mut()
            .zip(merged.target_track.iter_mut())
            .enumerate()
        {
            src.ordinal = i;
            dst.ordinal = i;
        }

        if let Some(cb) = &progress {
            cb(ProgressPhase::Complete, total_sentences, total_sentences);
        }
        Ok(merged)
    }

    /// Group pre-split sentences into batches: a small fixed first batch,
    /// then chunks within the configured size range (an undersized trailing
    /// chunk folds into its predecessor).
    fn form_batches(&self, words: &Transcript, sentences: &[PreSplitSentence]) -> Vec<SentenceBatch> {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        let first_end = FIRST_BATCH_SIZE.min(sentences.len());
        if first_end > 0 {
            ranges.push((0, first_end));
        }

        let mut start = first_end;
        while start < sentences.len() {
            let end = (start + self.config.batch_size_max).min(sentences.len());
            ranges.push((start, end));
            start = end;
        }
        if ranges.len() > 2 {
            let last = ranges[ranges.len() - 1];
            if last.1 - last.0 < self.config.batch_size_min {
                // Rebalance the last two chunks instead of shipping a runt
                let prev = ranges[ranges.len() - 2];
                let total = last.1 - prev.0;
                ranges.truncate(ranges.len() - 2);
                if total <= self.config.batch_size_max {
                    ranges.push((prev.0, last.1));
                } else {
                    let mid = prev.0 + total / 2;
                    ranges.push((prev.0, mid));
                    ranges.push((mid, last.1));
                }
            }
        }

        ranges
            .into_iter()
            .map(|(a, b)| SentenceBatch {
                words: words.slice(sentences[a].word_start, sentences[b - 1].word_end),
                sentence_count: b - a,
            })
            .collect()
    }

    /// Resegment and translate one batch, emitting its partial result.
    ///
    /// Alignment failure and exhausted-retry provider failures are fatal to
    /// this batch only; fatal provider errors and cancellation abort the run.
    async fn process_batch(
        &self,
        resegmenter: &Resegmenter,
        translator: &Translator,
        batch: &SentenceBatch,
        is_first: bool,
        partials: &UnboundedSender<BilingualResult>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let segmented = match resegmenter.resegment(&batch.words, cancel).await {
            Ok((fragments, stats)) => {
                debug!("batch tier stats: {:?}", stats);
                fragments
            }
            Err(SegmentError::AlignmentFailed { consecutive }) => {
                error!(
                    "skipping batch: alignment failed after {} consecutive misses",
                    consecutive
                );
                return Ok(BatchOutcome::Skipped);
            }
            Err(SegmentError::EmptyResponse) => {
                error!("skipping batch: segmentation model returned nothing usable");
                return Ok(BatchOutcome::Skipped);
            }
            Err(SegmentError::Provider(e)) if e.is_cancelled() => {
                return Err(PipelineError::Cancelled);
            }
            Err(SegmentError::Provider(e)) if e.is_fatal() => {
                return Err(PipelineError::Provider(e));
            }
            Err(SegmentError::Provider(e)) => {
                error!("skipping batch: segmentation call failed terminally: {}", e);
                return Ok(BatchOutcome::Skipped);
            }
        };

        let entries = match translator.translate(&segmented, cancel).await {
            Ok(entries) => entries,
            Err(TranslationError::Provider(e)) if e.is_cancelled() => {
                return Err(PipelineError::Cancelled);
            }
            Err(e) => return Err(PipelineError::Translation(e)),
        };

        let partial = BilingualResult::from_entries(&entries, is_first);
        if partials.send(partial).is_err() {
            debug!("partial result receiver dropped, continuing");
        }
        Ok(BatchOutcome::Done(entries))
    }
}

/// Advance the completed-sentence counter and report progress
fn finish_batch(
    batch: &SentenceBatch,
    outcome: &BatchOutcome,
    completed: &AtomicUsize,
    progress: &Option<ProgressCallback>,
    total: usize,
) {
    if matches!(outcome, BatchOutcome::Skipped) {
        warn!("batch of {} sentences produced no output", batch.sentence_count);
    }
    let current = completed.fetch_add(batch.sentence_count, Ordering::SeqCst) + batch.sentence_count;
    if let Some(cb) = progress {
        cb(ProgressPhase::Translate, current.min(total), total);
    }
}
