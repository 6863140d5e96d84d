/*!
 * Tests for the translation degradation cascade
 */

use std::sync::Arc;

use resubai::cancel::CancellationToken;
use resubai::errors::TranslationError;
use resubai::providers::mock::{MockCompleter, MockOutcome};
use resubai::translate::{Translator, FAILURE_PLACEHOLDER};

use crate::common::{batch_response, phrase, test_config, word_fragments};

#[tokio::test]
async fn test_translate_withFullBatchResponse_shouldCoverEveryEntry() {
    let fragments = word_fragments(&["alpha", "beta", "gamma"], 0, 1000);
    let response = batch_response(&[(0, "un"), (1, "deux"), (2, "trois")]);
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::Reply(response)]));
    let translator = Translator::new(test_config(), mock.clone());

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entries.len(), fragments.len());
    assert_eq!(mock.calls(), 1);
    let translations: Vec<&str> = entries.iter().map(|e| e.translation.as_str()).collect();
    assert_eq!(translations, vec!["un", "deux", "trois"]);
    // Ordinals come back sorted and contiguous
    let ordinals: Vec<usize> = entries.iter().map(|e| e.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_translate_timestampsSurviveTheCascade() {
    let fragments = vec![
        phrase(0, 100, 900, "alpha"),
        phrase(1, 1000, 1900, "beta"),
    ];
    let response = batch_response(&[(0, "un"), (1, "deux")]);
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::Reply(response)]));
    let translator = Translator::new(test_config(), mock);

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(entries[0].start_time_ms, 100);
    assert_eq!(entries[0].end_time_ms, 900);
    assert_eq!(entries[1].start_time_ms, 1000);
}

#[tokio::test]
async fn test_translate_with429ThenSuccess_shouldShowNoPlaceholders() {
    let fragments = word_fragments(&["alpha", "beta"], 0, 1000);
    let response = batch_response(&[(0, "un"), (1, "deux")]);
    let mock = Arc::new(MockCompleter::scripted(vec![
        MockOutcome::RateLimited,
        MockOutcome::Reply(response),
    ]));
    let translator = Translator::new(test_config(), mock.clone());

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(mock.calls(), 2);
    assert!(entries.iter().all(|e| !e.is_failed()));
}

#[tokio::test]
async fn test_translate_withTwoMissingIndices_shouldRetryExactlyThose() {
    let texts: Vec<String> = (0..10).map(|i| format!("sentence {}", i)).collect();
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let fragments = word_fragments(&text_refs, 0, 1000);

    // Both batch attempts miss indices 3 and 7; the per-entry level then
    // fills them one at a time
    let eight: Vec<(usize, String)> = (0..10)
        .filter(|i| *i != 3 && *i != 7)
        .map(|i| (i, format!("tr-{}", i)))
        .collect();
    let eight_refs: Vec<(usize, &str)> = eight.iter().map(|(i, t)| (*i, t.as_str())).collect();
    let batch = batch_response(&eight_refs);

    let mock = Arc::new(MockCompleter::scripted(vec![
        MockOutcome::Reply(batch.clone()),
        MockOutcome::Reply(batch),
        MockOutcome::Reply("single-3".to_string()),
        MockOutcome::Reply("single-7".to_string()),
    ]));
    let mut config = test_config();
    // Sequential per-entry calls keep the scripted order deterministic
    config.concurrent_requests = 1;
    let translator = Translator::new(config, mock.clone());

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(mock.calls(), 4);
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[3].translation, "single-3");
    assert_eq!(entries[7].translation, "single-7");
    // The other eight keep their first-level translations untouched
    for i in (0..10).filter(|i| *i != 3 && *i != 7) {
        assert_eq!(entries[i].translation, format!("tr-{}", i));
    }
}

#[tokio::test]
async fn test_translate_withEverythingFailing_shouldEmitPlaceholders() {
    let fragments = word_fragments(&["alpha"], 0, 1000);
    let mock = Arc::new(MockCompleter::scripted(vec![
        MockOutcome::ServerError,
        MockOutcome::ServerError,
        MockOutcome::ServerError,
    ]));
    let translator = Translator::new(test_config(), mock.clone());

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();
    // batch, batch retry, one per-entry attempt
    assert_eq!(mock.calls(), 3);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_failed());
    assert_eq!(
        entries[0].translation,
        format!("{} alpha", FAILURE_PLACEHOLDER)
    );
}

#[tokio::test]
async fn test_translate_withFatalError_shouldAbortImmediately() {
    let fragments = word_fragments(&["alpha", "beta"], 0, 1000);
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::AuthError]));
    let translator = Translator::new(test_config(), mock.clone());

    let err = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::Provider(e) if e.is_fatal()));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_translate_whenCancelled_shouldNotSubstitutePlaceholders() {
    let fragments = word_fragments(&["alpha"], 0, 1000);
    let mock = Arc::new(MockCompleter::echo());
    let translator = Translator::new(test_config(), mock);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = translator.translate(&fragments, &cancel).await.unwrap_err();
    assert!(matches!(err, TranslationError::Provider(e) if e.is_cancelled()));
}

#[tokio::test]
async fn test_translate_withChineseTarget_shouldStripMidSentencePunctuation() {
    let fragments = word_fragments(&["alpha", "beta"], 0, 1000);
    let response = batch_response(&[(0, "你好，世界。"), (1, "第一；第二：第三")]);
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::Reply(response)]));
    let mut config = test_config();
    config.target_language = "zh".to_string();
    let translator = Translator::new(config, mock);

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(entries[0].translation, "你好 世界");
    assert_eq!(entries[1].translation, "第一 第二 第三");
}

#[tokio::test]
async fn test_translate_withNonChineseTarget_shouldLeavePunctuation() {
    let fragments = word_fragments(&["alpha"], 0, 1000);
    let response = batch_response(&[(0, "Bonjour, tout le monde.")]);
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::Reply(response)]));
    let translator = Translator::new(test_config(), mock);

    let entries = translator
        .translate(&fragments, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(entries[0].translation, "Bonjour, tout le monde.");
}

#[tokio::test]
async fn test_translate_withEmptyBatch_shouldReturnEmpty() {
    let mock = Arc::new(MockCompleter::echo());
    let translator = Translator::new(test_config(), mock.clone());
    let entries = translator
        .translate(&[], &CancellationToken::new())
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(mock.calls(), 0);
}
