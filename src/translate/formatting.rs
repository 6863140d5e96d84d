/*!
 * Subtitle-style punctuation normalization for translated text.
 *
 * Chinese subtitles conventionally drop sentence-internal punctuation and
 * separate clauses with spaces instead. The normalizer strips commas,
 * periods, semicolons and colons in both their CJK and ASCII forms, keeping
 * decimal points intact, then collapses the leftover whitespace.
 */

/// Punctuation stripped from Chinese-target subtitle lines
fn is_strippable(c: char) -> bool {
    matches!(c, ',' | '.' | ';' | ':' | '，' | '。' | '；' | '：' | '、')
}

/// Normalize one translated line for subtitle display
pub fn normalize_subtitle_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if is_strippable(c) {
            // Keep a '.' that sits between digits
            let decimal = c == '.'
                && i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if decimal {
                out.push(c);
            } else {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
