/*!
 * End-to-end pipeline tests against the mock completer
 */

use std::sync::{Arc, Mutex};

use resubai::cancel::CancellationToken;
use resubai::errors::PipelineError;
use resubai::pipeline::{Pipeline, ProgressPhase};
use resubai::providers::mock::{MockCompleter, MockOutcome};
use tokio::sync::mpsc;

use crate::common::{batch_response, phrase, test_config, word_fragments};

type ProgressLog = Arc<Mutex<Vec<(ProgressPhase, usize, usize)>>>;

fn progress_recorder() -> (ProgressLog, resubai::pipeline::ProgressCallback) {
    let log: ProgressLog = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let callback: resubai::pipeline::ProgressCallback =
        Arc::new(move |phase, current, total| {
            sink.lock().unwrap().push((phase, current, total));
        });
    (log, callback)
}

#[tokio::test]
async fn test_pipeline_withEmptyTranscript_shouldFailFast() {
    let mock = Arc::new(MockCompleter::echo());
    let pipeline = Pipeline::new(test_config(), mock).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = pipeline
        .run(Vec::new(), tx, None, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyTranscript));
}

#[tokio::test]
async fn test_pipeline_withInvalidConfig_shouldRejectAtConstruction() {
    let mut config = test_config();
    config.endpoint = String::new();
    let mock = Arc::new(MockCompleter::echo());
    assert!(Pipeline::new(config, mock).is_err());
}

#[tokio::test]
async fn test_pipeline_happyPath_shouldProduceBilingualTracks() {
    let input = vec![
        phrase(0, 0, 2000, "Hello world."),
        phrase(1, 4000, 6000, "This is great"),
    ];
    let mock = Arc::new(MockCompleter::scripted(vec![
        MockOutcome::Reply("Hello world.<br>This is great".to_string()),
        MockOutcome::Reply(batch_response(&[
            (0, "Bonjour le monde."),
            (1, "C'est super"),
        ])),
    ]));
    let pipeline = Pipeline::new(test_config(), mock.clone()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (log, progress) = progress_recorder();

    let result = pipeline
        .run(input, tx, Some(progress), CancellationToken::new())
        .await
        .unwrap();

    // Two LLM calls: one segmentation, one batch translation
    assert_eq!(mock.calls(), 2);

    assert_eq!(result.len(), 2);
    assert_eq!(result.source_track[0].text, "Hello world.");
    assert_eq!(result.target_track[0].text, "Bonjour le monde.");
    assert_eq!(result.target_track[1].text, "C'est super");

    // Pairing invariant: entry i of both tracks shares its timing
    for (src, dst) in result.source_track.iter().zip(result.target_track.iter()) {
        assert_eq!(src.start_time_ms, dst.start_time_ms);
        assert_eq!(src.end_time_ms, dst.end_time_ms);
        assert_eq!(src.ordinal, dst.ordinal);
    }

    // Exactly one partial, tagged as the first batch
    let partial = rx.try_recv().unwrap();
    assert!(partial.is_first);
    assert_eq!(partial.len(), 2);
    assert!(rx.try_recv().is_err());

    // Progress went split -> translate -> complete with a known total
    let events = log.lock().unwrap();
    assert_eq!(events.first().unwrap(), &(ProgressPhase::Split, 0, 2));
    assert_eq!(events.last().unwrap(), &(ProgressPhase::Complete, 2, 2));
    assert!(events
        .iter()
        .any(|(phase, current, _)| *phase == ProgressPhase::Translate && *current == 2));
}

#[tokio::test]
async fn test_pipeline_longSilenceInsideSentence_shouldSplitTimeGroups() {
    // 2500 ms of silence inside what the model considers one sentence
    let input = vec![
        phrase(0, 0, 1000, "Hello world."),
        phrase(1, 3500, 5500, "This is great"),
    ];
    let mock = Arc::new(MockCompleter::scripted(vec![
        MockOutcome::Reply("Hello world. This is great".to_string()),
        MockOutcome::Reply(batch_response(&[(0, "partie un"), (1, "partie deux")])),
    ]));
    let pipeline = Pipeline::new(test_config(), mock).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = pipeline
        .run(input, tx, None, CancellationToken::new())
        .await
        .unwrap();

    // One matched sentence, two time-grouped fragments
    assert_eq!(result.len(), 2);
    assert_eq!(result.source_track[0].text, result.source_track[1].text);
    assert_eq!(result.source_track[0].end_time_ms, 1000);
    assert_eq!(result.source_track[1].start_time_ms, 3500);
}

#[tokio::test]
async fn test_pipeline_alignmentFailure_shouldSkipBatchNotRun() {
    let input = word_fragments(&["hello", "world"], 0, 400);
    let junk = (0..6)
        .map(|i| format!("unrelated output line {}", i))
        .collect::<Vec<_>>()
        .join("<br>");
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::Reply(junk)]));
    let pipeline = Pipeline::new(test_config(), mock.clone()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (log, progress) = progress_recorder();

    let result = pipeline
        .run(input, tx, Some(progress), CancellationToken::new())
        .await
        .unwrap();

    // The batch died in alignment: no translation call, no partial, empty
    // final result, but the run itself completed
    assert_eq!(mock.calls(), 1);
    assert!(result.is_empty());
    assert!(rx.try_recv().is_err());
    let events = log.lock().unwrap();
    assert_eq!(events.last().unwrap(), &(ProgressPhase::Complete, 1, 1));
}

#[tokio::test]
async fn test_pipeline_whenCancelledBeforeStart_shouldAbort() {
    let input = word_fragments(&["hello", "world"], 0, 400);
    let mock = Arc::new(MockCompleter::echo());
    let pipeline = Pipeline::new(test_config(), mock.clone()).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pipeline.run(input, tx, None, cancel).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_pipeline_fatalProviderError_shouldAbortRun() {
    let input = word_fragments(&["hello", "world"], 0, 400);
    let mock = Arc::new(MockCompleter::scripted(vec![MockOutcome::AuthError]));
    let pipeline = Pipeline::new(test_config(), mock).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = pipeline
        .run(input, tx, None, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
}

#[tokio::test]
async fn test_pipeline_multipleBatches_shouldStreamPartialsAndMerge() {
    // Six one-word sentences: five fill the first batch, one remains
    let input = word_fragments(&["one.", "two.", "three.", "four.", "five.", "six."], 0, 400);
    let mock = Arc::new(MockCompleter::scripted(vec![
        MockOutcome::Reply("one.<br>two.<br>three.<br>four.<br>five.".to_string()),
        MockOutcome::Reply(batch_response(&[
            (0, "un."),
            (1, "deux."),
            (2, "trois."),
            (3, "quatre."),
            (4, "cinq."),
        ])),
        MockOutcome::Reply("six.".to_string()),
        MockOutcome::Reply(batch_response(&[(0, "six en français.")])),
    ]));
    let pipeline = Pipeline::new(test_config(), mock.clone()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (log, progress) = progress_recorder();

    let result = pipeline
        .run(input, tx, Some(progress), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(mock.calls(), 4);
    assert_eq!(result.len(), 6);

    // Final merge is time-sorted with contiguous ordinals
    for window in result.source_track.windows(2) {
        assert!(window[0].start_time_ms <= window[1].start_time_ms);
    }
    let ordinals: Vec<usize> = result.source_track.iter().map(|f| f.ordinal).collect();
    assert_eq!(ordinals, (0..6).collect::<Vec<_>>());

    // Two partials: the first tagged first, the second not
    let p1 = rx.try_recv().unwrap();
    let p2 = rx.try_recv().unwrap();
    assert!(p1.is_first);
    assert!(!p2.is_first);
    assert_eq!(p1.len() + p2.len(), 6);

    // The completed-sentence count only ever grows
    let events = log.lock().unwrap();
    let translate_counts: Vec<usize> = events
        .iter()
        .filter(|(phase, _, _)| *phase == ProgressPhase::Translate)
        .map(|(_, current, _)| *current)
        .collect();
    assert_eq!(translate_counts, vec![5, 6]);
}
