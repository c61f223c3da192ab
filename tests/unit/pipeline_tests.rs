/*!
 * Unit tests for the pipeline executor state machine.
 *
 * Every test drives a real executor over the scripted mock provider; the
 * mock's call counter is what proves a stage was skipped or batched.
 */

use sceneforge::jobs::models::{JobStatus, PipelineStep, StageFlags};
use sceneforge::pipeline::RecordingSleeper;
use sceneforge::providers::mock::{MockGenerator, MockReply};

use crate::common;

#[tokio::test]
async fn test_run_happyPath_shouldCompleteWithAllArtifacts() {
    let mock = MockGenerator::with_script(
        common::full_pipeline_script(&["seg-1", "seg-2"], 2),
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(2, 50), &sleeper);
    let mut job = common::queued_job(2);

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.current_step, PipelineStep::Done);
    assert_eq!(job.character_bible.as_ref().map(|b| b.len()), Some(2));
    assert_eq!(job.snippets.as_ref().map(|s| s.len()), Some(2));
    assert_eq!(job.scenes.len(), 2);
    assert!(job.stages.characters && job.stages.snippets && job.stages.scenes);
    // 1 character call + 1 snippet call + 1 scene batch
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn test_run_characterStageAlreadyComplete_shouldNotCallModelForIt() {
    // Script starts at the snippet stage: the character call must not happen.
    let mut script = common::full_pipeline_script(&["seg-1"], 1);
    script.remove(0);
    let mock = MockGenerator::with_script(script, MockReply::Api(500, "exhausted".to_string()));
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(1, 0), &sleeper);

    let mut job = common::queued_job(1);
    // Simulate a resumed job whose character stage finished before a crash.
    let bible = match common::bible_response() {
        MockReply::Text(raw) => sceneforge::validation::parse_character_bible(&raw).unwrap(),
        _ => unreachable!(),
    };
    job.character_bible = Some(bible);
    job.stages.characters = true;

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    // Only snippet and scene calls happened.
    assert_eq!(mock.call_count(), 2);
    assert!(!mock.requests()[0].prompt.contains("Extract every distinct character"));
}

#[tokio::test]
async fn test_run_sceneCountAlreadyMatches_shouldCompleteWithoutAnyCall() {
    let mock = MockGenerator::with_script(
        Vec::new(),
        MockReply::Api(500, "no call expected".to_string()),
    );
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(3, 0), &sleeper);

    let mut job = common::queued_job(2);
    job.stages = StageFlags {
        characters: true,
        snippets: true,
        scenes: false,
    };
    job.character_bible = Some(Default::default());
    job.snippets = Some(Vec::new());
    // Scenes already fully generated by a previous run.
    let scenes = match common::scenes_response(&["seg-1", "seg-2"]) {
        MockReply::Text(raw) => {
            sceneforge::validation::parse_scenes(&raw, &job.segments).unwrap()
        }
        _ => unreachable!(),
    };
    job.scenes = scenes;

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.stages.scenes);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_run_sevenSegmentsBatchThree_shouldMakeThreeSceneCallsWithTwoDelays() {
    let ids = ["seg-1", "seg-2", "seg-3", "seg-4", "seg-5", "seg-6", "seg-7"];
    let mock = MockGenerator::with_script(
        common::full_pipeline_script(&ids, 3),
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(3, 125), &sleeper);
    let mut job = common::queued_job(7);

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.scenes.len(), 7);
    // character + snippet + three scene batches (3 + 3 + 1)
    assert_eq!(mock.call_count(), 5);
    // A delay after the first two batches, none after the third.
    let recorded = sleeper.recorded();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|d| d.as_millis() == 125));
}

#[tokio::test]
async fn test_run_notJsonCharacterResponse_shouldErrorAtCharacterStep() {
    let mock = MockGenerator::fixed("not json");
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(3, 0), &sleeper);
    let mut job = common::queued_job(2);

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.current_step, PipelineStep::Character);
    let message = job.error_message.as_deref().unwrap_or_default();
    assert!(message.contains("Malformed model output"), "got: {}", message);
    assert!(job.character_bible.is_none());
}

#[tokio::test]
async fn test_run_partialSceneList_shouldResumeFromFirstMissingSegment() {
    // Scenes for seg-1..seg-3 already exist; only one more batch is needed.
    let mock = MockGenerator::with_script(
        vec![common::scenes_response(&["seg-4", "seg-5"])],
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(5, 0), &sleeper);

    let mut job = common::queued_job(5);
    job.stages = StageFlags {
        characters: true,
        snippets: true,
        scenes: false,
    };
    job.character_bible = Some(Default::default());
    job.snippets = Some(Vec::new());
    let existing = match common::scenes_response(&["seg-1", "seg-2", "seg-3"]) {
        MockReply::Text(raw) => {
            sceneforge::validation::parse_scenes(&raw, &job.segments[..3]).unwrap()
        }
        _ => unreachable!(),
    };
    job.scenes = existing;

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.scenes.len(), 5);
    assert_eq!(mock.call_count(), 1);
    // The single call only asked for the missing segments.
    let prompt = &mock.requests()[0].prompt;
    assert!(prompt.contains("seg-4") && prompt.contains("seg-5"));
    assert!(!prompt.contains("\"seg-1\""));
}

#[tokio::test]
async fn test_run_emptyBible_shouldSkipSnippetCallAndStillComplete() {
    // Character stage legitimately finds nobody; the snippet stage has
    // nothing to describe and must not call the model.
    let mock = MockGenerator::with_script(
        vec![
            MockReply::Text("[]".to_string()),
            common::scenes_response(&["seg-1"]),
        ],
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(1, 0), &sleeper);
    let mut job = common::queued_job(1);

    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.snippets.as_ref().map(|s| s.len()), Some(0));
    // Character call + scene call, no snippet call.
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_run_failure_shouldAppendToJobLog() {
    let mock = MockGenerator::fixed("not json");
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(&mock, common::test_config(3, 0), &sleeper);
    let mut job = common::queued_job(1);

    executor.run(&mut job).await;

    assert!(job.log.iter().any(|entry| entry.level == "error"));
    assert!(job.log.iter().any(|entry| entry.message == "pipeline started"));
}
