/*!
 * Common test utilities for the resubai test suite
 */

use resubai::app_config::TranslatorConfig;
use resubai::transcript::Fragment;

/// Build a run of word-level fragments with fixed spacing
pub fn word_fragments(words: &[&str], start_ms: u64, step_ms: u64) -> Vec<Fragment> {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let s = start_ms + (i as u64) * step_ms;
            Fragment::new(i, s, s + step_ms - 50, w.to_string())
        })
        .collect()
}

/// Build a single phrase-level fragment
pub fn phrase(ordinal: usize, start_ms: u64, end_ms: u64, text: &str) -> Fragment {
    Fragment::new(ordinal, start_ms, end_ms, text.to_string())
}

/// Configuration pointing at nothing real, with fast retries for tests
pub fn test_config() -> TranslatorConfig {
    TranslatorConfig {
        endpoint: "http://localhost:9999/v1".to_string(),
        api_key: "test-api-key".to_string(),
        split_model: "test-split-model".to_string(),
        translate_model: "test-translate-model".to_string(),
        target_language: "fr".to_string(),
        retry_backoff_ms: vec![1],
        timeout_secs: 5,
        concurrent_requests: 2,
        ..TranslatorConfig::default()
    }
}

/// Encode a marker-tagged batch translation response
pub fn batch_response(translations: &[(usize, &str)]) -> String {
    let mut out = String::new();
    for (index, text) in translations {
        out.push_str(&format!("<<ENTRY_{}>>\n{}\n", index, text));
    }
    out.push_str("<<END>>");
    out
}
