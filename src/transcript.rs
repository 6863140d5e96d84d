use std::fmt;
use log::debug;

// @module: Transcript model and word-level expansion

/// Minimum duration assigned to any expanded word token
const MIN_TOKEN_DURATION_MS: u64 = 50;

/// Share of word-like fragments above which a transcript counts as word-level
const WORD_LEVEL_RATIO: f64 = 0.8;

// @struct: Single time-coded text fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    // @field: Sequence number
    pub ordinal: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Fragment text
    pub text: String,
}

impl Fragment {
    /// Creates a new fragment without validation - used by internal producers
    /// that already guarantee the invariants
    pub fn new(ordinal: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        Fragment {
            ordinal,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated fragment
    // @validates: Time range and non-empty text
    pub fn new_validated(
        ordinal: usize,
        start_time_ms: u64,
        end_time_ms: u64,
        text: String,
    ) -> Option<Self> {
        if end_time_ms < start_time_ms {
            return None;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Fragment {
            ordinal,
            start_time_ms,
            end_time_ms,
            text: trimmed.to_string(),
        })
    }

    /// Number of tokens in this fragment's text
    pub fn word_count(&self) -> usize {
        count_tokens(&self.text)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{} {}..{}] {}",
            self.ordinal, self.start_time_ms, self.end_time_ms, self.text
        )
    }
}

/// Ordered collection of fragments. Owns its entries exclusively; downstream
/// components receive copies or new containers, never a shared mutable view.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    fragments: Vec<Fragment>,
}

impl Transcript {
    /// Create a transcript from raw fragments. Empty-text fragments are
    /// dropped and the rest are kept in non-decreasing start-time order.
    pub fn new(fragments: Vec<Fragment>) -> Self {
        let mut kept: Vec<Fragment> = fragments
            .into_iter()
            .filter_map(|f| Fragment::new_validated(f.ordinal, f.start_time_ms, f.end_time_ms, f.text))
            .collect();
        kept.sort_by_key(|f| f.start_time_ms);
        Transcript { fragments: kept }
    }

    /// Number of fragments
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the transcript holds no fragments
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Read-only view of the fragments
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Consume the transcript, handing the fragments to the caller
    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    /// Copy of the fragments in an index range, for per-batch slices
    pub fn slice(&self, start: usize, end: usize) -> Vec<Fragment> {
        self.fragments[start..end.min(self.fragments.len())].to_vec()
    }

    /// Whether the transcript is already word-level: at least 80% of fragments
    /// are single whitespace-free ASCII tokens or at most 2 characters long
    /// (which covers CJK single-glyph fragments).
    pub fn is_word_level(&self) -> bool {
        if self.fragments.is_empty() {
            return false;
        }
        let word_like = self
            .fragments
            .iter()
            .filter(|f| {
                let text = f.text.as_str();
                let single_token = !text.chars().any(char::is_whitespace);
                single_token && (text.is_ascii() || text.chars().count() <= 2)
            })
            .count();
        (word_like as f64) / (self.fragments.len() as f64) >= WORD_LEVEL_RATIO
    }

    /// Expand phrase-level fragments into word-level fragments.
    ///
    /// Each fragment is tokenized language-aware, then its duration is divided
    /// among the tokens proportionally to a phoneme estimate `ceil(chars/4)`,
    /// floored at 50 ms per token. Token times are laid out sequentially and
    /// clamped so no token ends after the source fragment; the last token
    /// absorbs whatever duration remains. Fragments yielding zero tokens are
    /// skipped.
    pub fn expand_to_words(&self) -> Transcript {
        let mut words: Vec<Fragment> = Vec::with_capacity(self.fragments.len() * 4);
        let mut ordinal = 0usize;

        for frag in &self.fragments {
            let tokens = tokenize(&frag.text);
            if tokens.is_empty() {
                debug!("skipping fragment {} with no tokens: {:?}", frag.ordinal, frag.text);
                continue;
            }

            let phonemes: Vec<u64> = tokens
                .iter()
                .map(|t| (t.chars().count() as u64).div_ceil(4))
                .collect();
            let total_phonemes: u64 = phonemes.iter().sum::<u64>().max(1);
            let duration = frag.end_time_ms - frag.start_time_ms;

            let last = tokens.len() - 1;
            let mut cursor = frag.start_time_ms;
            for (i, token) in tokens.into_iter().enumerate() {
                let proportional = duration * phonemes[i] / total_phonemes;
                let assigned = proportional.max(MIN_TOKEN_DURATION_MS);
                let start = cursor.min(frag.end_time_ms);
                let end = if i == last {
                    frag.end_time_ms.max(start)
                } else {
                    (cursor + assigned).min(frag.end_time_ms)
                };
                words.push(Fragment::new(ordinal, start, end, token));
                ordinal += 1;
                cursor = end;
            }
        }

        Transcript { fragments: words }
    }

    /// Join fragment texts into prose. Fragments whose text begins with a
    /// non-word, non-space character attach directly to the previous token,
    /// so punctuation reads naturally in the LLM input.
    pub fn to_text(&self) -> String {
        join_texts(self.fragments.iter().map(|f| f.text.as_str()))
    }
}

/// Join a sequence of token texts into prose with punctuation-aware spacing
pub fn join_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for text in texts {
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            let joins_directly = text
                .chars()
                .next()
                .is_some_and(|c| !c.is_alphanumeric() && !c.is_whitespace());
            if !joins_directly {
                out.push(' ');
            }
        }
        out.push_str(text);
    }
    out
}

/// Hard sentence terminators, ASCII and CJK
pub(crate) fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
}

/// Whether a character belongs to a script written without spaces, where each
/// glyph becomes its own token
pub(crate) fn is_glyph_script(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'    // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'  // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}'  // CJK compatibility ideographs
        | '\u{3040}'..='\u{309F}'  // Hiragana
        | '\u{30A0}'..='\u{30FF}'  // Katakana
        | '\u{AC00}'..='\u{D7AF}'  // Hangul syllables
        | '\u{1100}'..='\u{11FF}'  // Hangul jamo
        | '\u{0E00}'..='\u{0E7F}'  // Thai
        | '\u{0900}'..='\u{097F}'  // Devanagari
    )
}

/// Language-aware tokenization.
///
/// Letter runs (Latin, Cyrillic, Greek, Arabic, Hebrew, ...) and digit runs
/// form multi-character tokens; glyph scripts contribute one token per glyph;
/// punctuation sticks to the nearest token so `to_text` round-trips cleanly.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut space_since_flush = true;

    let flush = |tokens: &mut Vec<String>, current: &mut String| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    for c in text.chars() {
        if c.is_whitespace() {
            flush(&mut tokens, &mut current);
            space_since_flush = true;
        } else if is_glyph_script(c) {
            flush(&mut tokens, &mut current);
            tokens.push(c.to_string());
            space_since_flush = false;
        } else if c.is_alphanumeric() {
            if current.is_empty() {
                space_since_flush = false;
            }
            current.push(c);
        } else {
            // Punctuation attaches to the open run, or to the last completed
            // token when no whitespace intervened; otherwise it opens a token
            // that to_text will join without a space.
            if !current.is_empty() {
                current.push(c);
            } else if !space_since_flush && !tokens.is_empty() {
                tokens.last_mut().unwrap().push(c);
            } else {
                current.push(c);
                space_since_flush = false;
            }
        }
    }
    flush(&mut tokens, &mut current);
    tokens
}

/// Token count of a text under the same tokenizer as `expand_to_words`
pub fn count_tokens(text: &str) -> usize {
    tokenize(text).len()
}
