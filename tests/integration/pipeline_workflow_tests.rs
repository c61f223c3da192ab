/*!
 * End-to-end pipeline workflow tests: submission through the controller's
 * store, a full drain over the scripted provider, and crash-resume
 * behavior across a simulated process restart.
 */

use std::sync::Arc;
use std::time::Duration;

use sceneforge::database::repository::Repository;
use sceneforge::generation::GenerationClient;
use sceneforge::jobs::models::{JobStatus, PipelineStep};
use sceneforge::key_pool::KeyPool;
use sceneforge::pipeline::{PipelineExecutor, RecordingSleeper};
use sceneforge::providers::mock::{MockGenerator, MockReply};
use sceneforge::scheduler::{JobQueue, Scheduler};

use crate::common;

fn executor_for(mock: &MockGenerator, batch_size: usize, delay_ms: u64) -> (PipelineExecutor, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let executor = common::executor_with(mock, common::test_config(batch_size, delay_ms), &sleeper);
    (executor, sleeper)
}

#[tokio::test]
async fn test_fullWorkflow_sevenSegmentsBatchThree_shouldPersistCompletedJob() {
    let ids = ["seg-1", "seg-2", "seg-3", "seg-4", "seg-5", "seg-6", "seg-7"];
    let mock = MockGenerator::with_script(
        common::full_pipeline_script(&ids, 3),
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let (executor, sleeper) = executor_for(&mock, 3, 40);

    let repo = Repository::new_in_memory().unwrap();
    let queue = JobQueue::new();
    let job_id = queue.submit(common::queued_job(7));

    let scheduler = Scheduler::new(queue.clone(), executor).with_repository(repo.clone());
    let summary = scheduler.drain().await;

    assert_eq!(summary.completed, 1);
    // 3 + 3 + 1 segments across exactly three scene calls.
    assert_eq!(mock.call_count(), 5);
    assert_eq!(sleeper.recorded().len(), 2);

    // The terminal state reached the store.
    let stored = repo.load_job(&job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.scenes.len(), 7);
    // One scene per segment, each segment claimed exactly once.
    let mut segment_ids: Vec<&str> = stored.scenes.iter().map(|s| s.segment_id.as_str()).collect();
    segment_ids.sort();
    segment_ids.dedup();
    assert_eq!(segment_ids.len(), 7);
}

#[tokio::test]
async fn test_crashAfterCharacterStage_shouldResumeWithoutRepeatingIt() {
    let repo = Repository::new_in_memory().unwrap();

    // First run: the character stage succeeds, then the snippet stage dies
    // on a hard API error.
    let first_mock = MockGenerator::with_script(
        vec![
            common::bible_response(),
            MockReply::Api(500, "server exploded".to_string()),
        ],
        MockReply::Api(500, "server exploded".to_string()),
    );
    let (executor, _) = executor_for(&first_mock, 3, 0);
    let queue = JobQueue::new();
    let job_id = queue.submit(common::queued_job(2));
    let scheduler = Scheduler::new(queue, executor).with_repository(repo.clone());
    let summary = scheduler.drain().await;

    assert_eq!(summary.failed, 1);
    let failed = repo.load_job(&job_id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Error);
    assert!(failed.stages.characters);
    assert!(!failed.stages.snippets);
    assert_eq!(failed.current_step, PipelineStep::Snippet);

    // "Restart": re-hydrate, re-queue, and run with a healthy provider.
    let mut resumed = repo.load_job(&job_id).await.unwrap().unwrap();
    resumed.status = JobStatus::Queued;
    resumed.error_message = None;

    let second_mock = MockGenerator::with_script(
        vec![
            common::snippets_response(),
            common::scenes_response(&["seg-1", "seg-2"]),
        ],
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let (executor, _) = executor_for(&second_mock, 2, 0);
    let queue = JobQueue::new();
    queue.submit(resumed);
    let scheduler = Scheduler::new(queue, executor).with_repository(repo.clone());
    let summary = scheduler.drain().await;

    assert_eq!(summary.completed, 1);
    // Snippet + scene calls only; the character stage was never repeated.
    assert_eq!(second_mock.call_count(), 2);

    let done = repo.load_job(&job_id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.scenes.len(), 2);
}

#[tokio::test]
async fn test_parseFailure_shouldRecordDiagnosticsAndPreserveQueue() {
    let mock = MockGenerator::fixed("I'm sorry, I can't produce JSON today.");
    let (executor, _) = executor_for(&mock, 3, 0);

    let repo = Repository::new_in_memory().unwrap();
    let queue = JobQueue::new();
    let failing_id = queue.submit(common::queued_job(2));

    let scheduler = Scheduler::new(queue.clone(), executor).with_repository(repo.clone());
    scheduler.drain().await;

    let job = repo.load_job(&failing_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.current_step, PipelineStep::Character);
    // The error surface carries the offending fragment, untruncated log.
    let message = job.error_message.as_deref().unwrap_or_default();
    assert!(message.contains("Malformed model output"));
    assert!(job.log.iter().any(|e| e.message.contains("Malformed model output")));
}

#[tokio::test]
async fn test_rehydratedProcessingJob_shouldBePickedUpAgain() {
    let repo = Repository::new_in_memory().unwrap();

    // A job that was mid-flight when the process died.
    let mut job = common::queued_job(1);
    job.status = JobStatus::Processing;
    repo.save_job(&job).await.unwrap();

    let pending = repo.load_pending_jobs().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, JobStatus::Queued);

    let mock = MockGenerator::with_script(
        common::full_pipeline_script(&["seg-1"], 1),
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let (executor, _) = executor_for(&mock, 1, 0);
    let queue = JobQueue::new();
    for job in pending {
        queue.submit(job);
    }
    let scheduler = Scheduler::new(queue, executor).with_repository(repo.clone());
    let summary = scheduler.drain().await;

    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_generationClient_sharedPool_reflectsInvalidationsAcrossStages() {
    // Key 1 dies with quota on the first call; the rest of the pipeline
    // must keep using key 2 without ever touching key 1 again.
    let mock = MockGenerator::with_script(
        {
            let mut script = vec![MockReply::Quota("resource exhausted".to_string())];
            script.extend(common::full_pipeline_script(&["seg-1"], 1));
            script
        },
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let keys = KeyPool::from_keys(["key-1", "key-2"]);
    let client = GenerationClient::new(Arc::new(mock.clone()), keys, common::fast_retry())
        .with_cooldown(Duration::from_millis(1));
    let executor = PipelineExecutor::new(client, Arc::new(common::test_config(1, 0)))
        .with_sleeper(Arc::new(RecordingSleeper::new()));

    let mut job = common::queued_job(1);
    executor.run(&mut job).await;

    assert_eq!(job.status, JobStatus::Completed);
    let keys_used = mock.keys_used();
    assert_eq!(keys_used[0], "key-1");
    assert!(keys_used[1..].iter().all(|k| k == "key-2"));
}
