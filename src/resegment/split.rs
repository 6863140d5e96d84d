/*!
 * Length-reduction splitting for oversized candidate sentences.
 *
 * Two passes with different guarantees: `aggressive_split` only cuts where
 * syntax gives it a defensible boundary and may refuse entirely;
 * `fallback_split` always produces evenly sized pieces, nudging each cut
 * toward the best nearby signal.
 */

use crate::transcript::is_sentence_terminator;

/// Tokens this close to either edge are never split points
const RULE_EDGE_MARGIN: usize = 2;

/// How far (in tokens) a fallback cut may wander from its ideal position
const FALLBACK_WINDOW: usize = 5;

/// A token plus whether the original text had whitespace before it, so any
/// run of units can be rejoined byte-exactly
#[derive(Debug, Clone)]
struct Unit {
    text: String,
    space_before: bool,
}

/// Tokenize while remembering original spacing. Mirrors the transcript
/// tokenizer: letter/digit runs, one unit per glyph for unspaced scripts,
/// punctuation attached to its neighbor.
fn split_units(text: &str) -> Vec<Unit> {
    let mut units: Vec<Unit> = Vec::new();
    let mut current = String::new();
    let mut pending_space = false;
    let mut current_space = false;

    let flush = |units: &mut Vec<Unit>, current: &mut String, space: bool| {
        if !current.is_empty() {
            units.push(Unit {
                text: std::mem::take(current),
                space_before: space,
            });
        }
    };

    for c in text.chars() {
        if c.is_whitespace() {
            flush(&mut units, &mut current, current_space);
            pending_space = true;
        } else if crate::transcript::is_glyph_script(c) {
            flush(&mut units, &mut current, current_space);
            units.push(Unit {
                text: c.to_string(),
                space_before: pending_space,
            });
            pending_space = false;
        } else if c.is_alphanumeric() {
            if current.is_empty() {
                current_space = pending_space;
                pending_space = false;
            }
            current.push(c);
        } else {
            if !current.is_empty() {
                current.push(c);
            } else if !pending_space && !units.is_empty() {
                units.last_mut().unwrap().text.push(c);
            } else {
                current_space = pending_space;
                pending_space = false;
                current.push(c);
            }
        }
    }
    flush(&mut units, &mut current, current_space);
    units
}

/// Rejoin a run of units with their original spacing
fn rejoin(units: &[Unit]) -> String {
    let mut out = String::new();
    for (i, unit) in units.iter().enumerate() {
        if i > 0 && unit.space_before {
            out.push(' ');
        }
        out.push_str(&unit.text);
    }
    out
}

const COORDINATING: &[&str] = &["and", "but", "or", "nor", "for", "so", "yet"];

const SUBORDINATING: &[&str] = &[
    "because", "although", "though", "while", "since", "unless", "until", "if", "when", "after",
    "before", "once", "whereas", "as",
];

const RELATIVE: &[&str] = &["who", "whom", "whose", "which", "that", "where"];

fn word_in(list: &[&str], token: &str) -> bool {
    let bare: String = token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    list.contains(&bare.as_str())
}

/// Split-point priority for cutting before `units[boundary]`.
/// Sentence-end punctuation outranks clause punctuation outranks commas
/// outranks conjunctions outranks relative pronouns.
fn boundary_priority(units: &[Unit], boundary: usize) -> Option<u8> {
    let prev = units[boundary - 1].text.trim_end_matches(['"', '\'', ')', '”', '’']);
    if let Some(last) = prev.chars().last() {
        if is_sentence_terminator(last) {
            return Some(10);
        }
        if matches!(last, ';' | ':' | '；' | '：') {
            return Some(9);
        }
        if matches!(last, ',' | '，' | '、') {
            return Some(8);
        }
    }
    let next = units[boundary].text.as_str();
    if word_in(COORDINATING, next) {
        return Some(7);
    }
    if word_in(SUBORDINATING, next) {
        return Some(6);
    }
    if word_in(RELATIVE, next) {
        return Some(5);
    }
    None
}

/// Rule-based split of an oversized sentence.
///
/// Scans for the highest-priority boundary outside the edge margins, ties
/// broken by distance to the midpoint; recurses on halves still exceeding
/// 1.5x the target. Returns `None` when no usable boundary exists, leaving
/// the choice of accepting the sentence whole or degrading to
/// `fallback_split` to the caller.
pub fn aggressive_split(text: &str, target: usize) -> Option<Vec<String>> {
    let units = split_units(text);
    split_units_recursive(&units, target)
}

fn split_units_recursive(units: &[Unit], target: usize) -> Option<Vec<String>> {
    let n = units.len();
    if n < RULE_EDGE_MARGIN * 2 + 1 {
        return None;
    }

    let midpoint = n / 2;
    let mut best: Option<(usize, u8)> = None;
    for boundary in RULE_EDGE_MARGIN..=(n - RULE_EDGE_MARGIN) {
        if let Some(priority) = boundary_priority(units, boundary) {
            let better = match best {
                None => true,
                Some((b, p)) => {
                    priority > p
                        || (priority == p
                            && boundary.abs_diff(midpoint) < b.abs_diff(midpoint))
                }
            };
            if better {
                best = Some((boundary, priority));
            }
        }
    }

    let (boundary, _) = best?;
    let limit = (target as f32 * 1.5) as usize;
    let mut parts = Vec::new();
    for half in [&units[..boundary], &units[boundary..]] {
        if half.len() > limit {
            match split_units_recursive(half, target) {
                Some(sub) => parts.extend(sub),
                None => parts.push(rejoin(half)),
            }
        } else {
            parts.push(rejoin(half));
        }
    }
    Some(parts)
}

/// Fallback-cut score: the same signals as the rule pass at lower weights
fn fallback_signal(units: &[Unit], boundary: usize) -> u8 {
    match boundary_priority(units, boundary) {
        Some(10) => 5,
        Some(9) => 4,
        Some(8) => 3,
        Some(7) => 2,
        Some(6) | Some(5) => 1,
        _ => 0,
    }
}

/// Position-based split that always produces a result.
///
/// Divides the sentence into `ceil(words / max_words)` evenly sized pieces,
/// then slides each cut within a small window toward the best-scoring nearby
/// boundary. With no usable syntax, the cut lands on the ideal position.
pub fn fallback_split(text: &str, max_words: usize) -> Vec<String> {
    let units = split_units(text);
    let n = units.len();
    let max_words = max_words.max(1);
    let segments = n.div_ceil(max_words);
    if segments <= 1 || n < 2 {
        return vec![text.to_string()];
    }

    let mut cuts: Vec<usize> = Vec::with_capacity(segments - 1);
    let mut prev_cut = 0usize;
    for k in 1..segments {
        let ideal = k * n / segments;
        let lo = ideal.saturating_sub(FALLBACK_WINDOW).max(prev_cut + 1);
        let hi = (ideal + FALLBACK_WINDOW).min(n - 1);
        if lo > hi {
            continue;
        }
        let mut best_boundary = ideal.clamp(lo, hi);
        let mut best_score = i64::MIN;
        for boundary in lo..=hi {
            let signal = fallback_signal(&units, boundary) as i64;
            let score = signal * 100 - (boundary.abs_diff(ideal) as i64);
            if score > best_score {
                best_score = score;
                best_boundary = boundary;
            }
        }
        cuts.push(best_boundary);
        prev_cut = best_boundary;
    }

    let mut parts = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0usize;
    for cut in cuts {
        parts.push(rejoin(&units[start..cut]));
        start = cut;
    }
    parts.push(rejoin(&units[start..]));
    parts.retain(|p| !p.is_empty());
    parts
}
