use isolang::Language;

/// Language utilities for ISO language code handling
///
/// This module provides functions for normalizing ISO 639-1 (2-letter) and
/// ISO 639-2 (3-letter) language codes and for the one language-specific
/// decision the pipeline makes: whether the target language is Chinese, which
/// gates subtitle-style punctuation normalization.
/// Normalize a language code to ISO 639-3 (3-letter) format, if recognized
pub fn normalize_to_part3(code: &str) -> Option<String> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized) {
            return Some(lang.to_639_3().to_string());
        }
    } else if normalized.len() == 3 {
        if Language::from_639_3(&normalized).is_some() {
            return Some(normalized);
        }
        // Common ISO 639-2/B codes that differ from 639-2/T
        let part2t = match normalized.as_str() {
            "chi" => "zho",
            "fre" => "fra",
            "ger" => "deu",
            "dut" => "nld",
            "gre" => "ell",
            _ => return None,
        };
        return Some(part2t.to_string());
    }

    None
}

/// English display name for a language code, falling back to the code itself
pub fn display_name(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    let lang = if normalized.len() == 2 {
        Language::from_639_1(&normalized)
    } else {
        normalize_to_part3(&normalized).and_then(|c| Language::from_639_3(&c))
    };
    match lang {
        Some(l) => l.to_name().to_string(),
        None => code.trim().to_string(),
    }
}

/// Whether the code denotes Chinese in any of its usual spellings
/// ("zh", "chi", "zho", regional variants like "zh-CN", or the full name)
pub fn is_chinese(code: &str) -> bool {
    let normalized = code.trim().to_lowercase();
    let base = normalized.split(['-', '_']).next().unwrap_or("");
    matches!(base, "zh" | "chi" | "zho" | "chinese" | "cmn")
}
