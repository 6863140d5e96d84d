/*!
 * Text similarity matching.
 *
 * Provides a Ratcliff/Obershelp-style block similarity ratio and a
 * sliding-window search that locates the contiguous run of word fragments
 * best matching an LLM-cleaned sentence. The window search is what translates
 * resegmented text back onto original timestamps, so its scoring is
 * deliberately conservative: case-folded, whitespace-insensitive, and gated
 * by a caller-supplied threshold.
 */

use log::debug;

use crate::transcript::{count_tokens, Fragment};

/// A contiguous run of fragments matched to a sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSpan {
    /// Index of the first matched fragment
    pub start_index: usize,
    /// Number of fragments in the match
    pub len: usize,
    /// Similarity score that won the search
    pub score: f64,
}

/// Block-matching similarity ratio in `[0, 1]`.
///
/// `2*M / (|a| + |b|)` where `M` is the total length of all non-overlapping
/// longest common substrings found by recursive three-way divide. Identical
/// non-empty strings score 1.0, as do two empty strings; if exactly one side
/// is empty the score is 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    let matched = matching_total(&a_chars, &b_chars);
    (2.0 * matched as f64) / ((a_chars.len() + b_chars.len()) as f64)
}

/// Total length of non-overlapping common substrings: find the single longest
/// match in the full range, then recurse left and right of it.
fn matching_total(a: &[char], b: &[char]) -> usize {
    let (a_pos, b_pos, len) = longest_match(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_total(&a[..a_pos], &b[..b_pos])
        + matching_total(&a[a_pos + len..], &b[b_pos + len..])
}

/// Longest common substring of two char slices, earliest position on ties
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0usize, 0usize, 0usize);
    if a.is_empty() || b.is_empty() {
        return best;
    }

    // Rolling-row DP over match run lengths ending at (i, j)
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for (i, &ac) in a.iter().enumerate() {
        for (j, &bc) in b.iter().enumerate() {
            if ac == bc {
                let run = prev[j] + 1;
                curr[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            } else {
                curr[j + 1] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.fill(0);
    }
    best
}

/// Collapse interior whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded, whitespace-free form used for scoring. Dropping spaces keeps
/// glyph-per-fragment scripts from paying a join penalty against unspaced
/// sentences.
fn scoring_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Locate the window of fragments best matching `sentence`.
///
/// The window-size estimate is the sentence's token count under the same
/// tokenizer that produced the fragments; sizes are tried in order of
/// closeness to that estimate, and each size slides from `start_index` up to
/// `start_index + max_shift`. A perfect score short-circuits; otherwise the
/// best window is returned if it clears `threshold`.
pub fn find_best_match(
    sentence: &str,
    fragments: &[Fragment],
    start_index: usize,
    max_shift: usize,
    threshold: f64,
) -> Option<MatchSpan> {
    if fragments.is_empty() || start_index >= fragments.len() {
        return None;
    }

    let sentence = normalize_whitespace(sentence);
    if sentence.is_empty() {
        return None;
    }
    let sentence_key = scoring_key(&sentence);

    let estimate = count_tokens(&sentence).max(1);
    let deviation = (estimate / 2).max(3);
    let remaining = fragments.len() - start_index;

    let lo = estimate.saturating_sub(deviation).max(1);
    let hi = (estimate + deviation).min(remaining);
    let mut sizes: Vec<usize> = (lo..=hi).collect();
    if sizes.is_empty() {
        // Sentence estimate overshoots what is left; try the whole remainder
        sizes.push(remaining);
    }
    sizes.sort_by_key(|&s| (s.abs_diff(estimate), s));

    let mut best: Option<MatchSpan> = None;
    for size in sizes {
        for offset in 0..=max_shift {
            let window_start = start_index + offset;
            if window_start + size > fragments.len() {
                break;
            }
            let window_text: String = fragments[window_start..window_start + size]
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let score = similarity(&sentence_key, &scoring_key(&window_text));

            if score >= 1.0 {
                return Some(MatchSpan {
                    start_index: window_start,
                    len: size,
                    score,
                });
            }
            if best.is_none_or(|b| score > b.score) {
                best = Some(MatchSpan {
                    start_index: window_start,
                    len: size,
                    score,
                });
            }
        }
    }

    match best {
        Some(span) if span.score >= threshold => Some(span),
        Some(span) => {
            debug!(
                "best window for {:?} scored {:.3}, below threshold {:.3}",
                sentence, span.score, threshold
            );
            None
        }
        None => None,
    }
}
