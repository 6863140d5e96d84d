/*!
 * Alignment of LLM-cleaned sentences back onto original word timestamps.
 *
 * Sentences arrive in transcript order, so each match starts where the
 * previous one ended. A matched span is split at long silences so one
 * sentence cannot inherit a pause that spans an edit cut; an unmatched
 * sentence gets a synthetic duration, and too many unmatched sentences in a
 * row abort the batch.
 */

use log::{debug, warn};

use crate::errors::SegmentError;
use crate::matching::find_best_match;
use crate::transcript::{count_tokens, is_sentence_terminator, join_texts, Fragment};

/// Silence longer than this splits a matched span into separate fragments
pub const GAP_SPLIT_MS: u64 = 1500;

/// Duration given to a sentence that could not be matched
const SYNTHETIC_DURATION_MS: u64 = 5000;

/// Consecutive unmatched sentences beyond this are a batch-fatal error
const MAX_CONSECUTIVE_FAILURES: usize = 5;

/// How many fragments past the cursor the window search may slide
const MAX_SHIFT: usize = 20;

/// Adjacent output fragments closer than this are merge candidates
const MERGE_GAP_MS: u64 = 300;

/// Word-count bound for the short side of a merge
const SHORT_WORD_LIMIT: usize = 5;

/// Recover timestamps for each sentence by matching it onto the word
/// fragments, in order. Returns the ordered output fragments.
pub fn align_sentences(
    sentences: &[String],
    words: &[Fragment],
    threshold: f64,
) -> Result<Vec<Fragment>, SegmentError> {
    let mut out: Vec<Fragment> = Vec::new();
    let mut cursor = 0usize;
    let mut consecutive_failures = 0usize;
    let mut ordinal = 0usize;

    for sentence in sentences {
        match find_best_match(sentence, words, cursor, MAX_SHIFT, threshold) {
            Some(span) => {
                consecutive_failures = 0;
                let matched = &words[span.start_index..span.start_index + span.len];
                debug!(
                    "aligned {:?} to fragments {}..{} (score {:.3})",
                    sentence,
                    span.start_index,
                    span.start_index + span.len,
                    span.score
                );
                for group in split_on_gaps(matched) {
                    let first = group.first().expect("gap groups are never empty");
                    let last = group.last().expect("gap groups are never empty");
                    out.push(Fragment::new(
                        ordinal,
                        first.start_time_ms,
                        last.end_time_ms,
                        sentence.clone(),
                    ));
                    ordinal += 1;
                }
                cursor = span.start_index + span.len;
            }
            None => {
                consecutive_failures += 1;
                warn!(
                    "no fragment window matched {:?} ({} consecutive failures)",
                    sentence, consecutive_failures
                );
                if consecutive_failures > MAX_CONSECUTIVE_FAILURES {
                    return Err(SegmentError::AlignmentFailed {
                        consecutive: consecutive_failures,
                    });
                }
                let start = out
                    .last()
                    .map(|f| f.end_time_ms)
                    .unwrap_or_else(|| words.first().map(|f| f.start_time_ms).unwrap_or(0));
                out.push(Fragment::new(
                    ordinal,
                    start,
                    start + SYNTHETIC_DURATION_MS,
                    sentence.clone(),
                ));
                ordinal += 1;
            }
        }
    }

    Ok(out)
}

/// Group a contiguous fragment run into sub-spans separated by long silences
fn split_on_gaps(fragments: &[Fragment]) -> Vec<&[Fragment]> {
    let mut groups = Vec::new();
    let mut start = 0usize;
    for i in 1..fragments.len() {
        let gap = fragments[i]
            .start_time_ms
            .saturating_sub(fragments[i - 1].end_time_ms);
        if gap > GAP_SPLIT_MS {
            groups.push(&fragments[start..i]);
            start = i;
        }
    }
    if start < fragments.len() {
        groups.push(&fragments[start..]);
    }
    groups
}

/// Merge under-length neighbors in a single left-to-right pass.
///
/// Two adjacent fragments merge when the silence between them is short, at
/// least one side is short (left strictly under the limit, right at or under
/// it), the combined length stays within `max_word_count`, and the left side
/// does not already end a sentence. The merged fragment is re-examined
/// against the next neighbor before the pass advances, and the pass is a
/// fixed point: running it on its own output changes nothing.
pub fn merge_short_segments(fragments: Vec<Fragment>, max_word_count: usize) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = Vec::new();

    for frag in fragments {
        let merged = match out.last_mut() {
            Some(last) => {
                let gap = frag.start_time_ms.saturating_sub(last.end_time_ms);
                let left_words = count_tokens(&last.text);
                let right_words = count_tokens(&frag.text);
                let left_terminal = last
                    .text
                    .trim_end()
                    .chars()
                    .last()
                    .is_some_and(is_sentence_terminator);
                if gap < MERGE_GAP_MS
                    && (left_words < SHORT_WORD_LIMIT || right_words <= SHORT_WORD_LIMIT)
                    && left_words + right_words <= max_word_count
                    && !left_terminal
                {
                    last.text = join_texts([last.text.as_str(), frag.text.as_str()]);
                    last.end_time_ms = frag.end_time_ms;
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        if !merged {
            out.push(frag);
        }
    }

    for (i, frag) in out.iter_mut().enumerate() {
        frag.ordinal = i;
    }
    out
}
