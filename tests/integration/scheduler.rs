/*
 *  Copyright 2026 Vigilance Authors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Scheduler behavior: claiming, retries, chaining, and status updates.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Barrier;

use vigilance::config::{floor_to_window, CollectionConfig};
use vigilance::dal::DAL;
use vigilance::database::{UniversalTimestamp, UniversalUuid};
use vigilance::dto::CollectionTaskResult;
use vigilance::error::SchedulerError;
use vigilance::mapper::{MonitoringSourceConfig, SourceSpec, SourceType};
use vigilance::models::collection_task::{NewCollectionTask, TaskKind, TaskStatus};
use vigilance::models::job_instance::ExecutionStatus;
use vigilance::progress::JobInstanceProgress;
use vigilance::registry::VerificationTaskRegistry;
use vigilance::scheduler::CollectionTaskScheduler;

use crate::fixtures::{
    file_database, memory_database, new_task, reopen_database, service_guard_verification_task,
    test_config, ACCOUNT_ID, WORKER_ID,
};

async fn scheduler_with(config: CollectionConfig) -> (CollectionTaskScheduler, DAL) {
    let db = memory_database().await;
    let dal = DAL::new(db);
    (CollectionTaskScheduler::new(dal.clone(), config), dal)
}

#[tokio::test]
async fn queued_task_is_claimed_and_marked_running() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let saved = scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();

    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .expect("queued task should be claimable");
    assert_eq!(claimed.id, saved.id);
    assert_eq!(claimed.status, TaskStatus::Running);
    assert!(claimed.last_picked_at.is_some());

    let reloaded = scheduler.get_collection_task(saved.id).await.unwrap();
    assert_eq!(reloaded.status, TaskStatus::Running);
}

#[tokio::test]
async fn unknown_worker_gets_nothing() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();

    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, "some-other-worker")
        .await
        .unwrap();
    assert!(claimed.is_none());
}

#[tokio::test]
async fn future_valid_after_hides_the_task() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let mut task = new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued);
    task.valid_after = Some(UniversalTimestamp(Utc::now() + Duration::minutes(10)));
    scheduler.save(task).await.unwrap();

    assert!(scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .is_none());

    let mut past = new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued);
    past.valid_after = Some(UniversalTimestamp(Utc::now() - Duration::minutes(10)));
    let saved = scheduler.save(past).await.unwrap();
    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .expect("past valid_after should be claimable");
    assert_eq!(claimed.id, saved.id);
}

#[tokio::test]
async fn tasks_are_served_fifo_by_update_time() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let saved = scheduler
            .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
            .await
            .unwrap();
        ids.push(saved.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    for expected in ids {
        let claimed = scheduler
            .get_next_task(ACCOUNT_ID, WORKER_ID)
            .await
            .unwrap()
            .expect("tasks should come back in order");
        assert_eq!(claimed.id, expected);
    }
    assert!(scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn fresh_running_task_is_not_reclaimed() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let mut task = new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Running);
    task.last_picked_at = Some(UniversalTimestamp::now());
    scheduler.save(task).await.unwrap();

    assert!(scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn stale_running_task_is_reclaimed_with_retry_bump() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    // Template sets last_picked_at 10 minutes back, past the 5 minute
    // staleness threshold.
    let saved = scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Running))
        .await
        .unwrap();

    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .expect("stale running task should be reclaimed");
    assert_eq!(claimed.id, saved.id);
    assert_eq!(claimed.retry_count, 1);
    assert_eq!(claimed.status, TaskStatus::Running);
}

#[tokio::test]
async fn queued_is_preferred_over_stale_running() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let stale = scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Running))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let queued = scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();

    let first = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, queued.id);
    let second = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.id, stale.id);
    assert!(scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn exhausted_deployment_task_is_never_served_again() {
    // Zero retry budget and zero staleness threshold, so a single reclaim
    // exhausts the task and the next poll must skip it.
    let config = CollectionConfig::builder()
        .max_retry_deployment(0)
        .stale_running_threshold(Duration::zero())
        .build();
    let (scheduler, dal) = scheduler_with(config).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::Deployment, TaskStatus::Running))
        .await
        .unwrap();

    let reclaimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .expect("first reclaim is within budget");
    assert_eq!(reclaimed.retry_count, 1);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(
        scheduler
            .get_next_task(ACCOUNT_ID, WORKER_ID)
            .await
            .unwrap()
            .is_none(),
        "exhausted deployment task must stay stuck"
    );
}

#[tokio::test]
async fn exhausted_service_guard_task_is_still_served() {
    let config = CollectionConfig::builder()
        .max_retry_service_guard(0)
        .stale_running_threshold(Duration::zero())
        .build();
    let (scheduler, dal) = scheduler_with(config).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Running))
        .await
        .unwrap();

    for expected_retry in 1..=3 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let claimed = scheduler
            .get_next_task(ACCOUNT_ID, WORKER_ID)
            .await
            .unwrap()
            .expect("service-guard tasks are served past the retry bound");
        assert_eq!(claimed.retry_count, expected_retry);
    }
}

#[tokio::test]
async fn success_clears_diagnostics_and_chains_next_window() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();
    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .unwrap();

    scheduler
        .update_task_status(CollectionTaskResult::success(claimed.id))
        .await
        .unwrap();

    let updated = scheduler.get_collection_task(claimed.id).await.unwrap();
    assert_eq!(updated.status, TaskStatus::Success);
    assert_eq!(updated.retry_count, 0);
    assert!(updated.exception.is_none());
    assert!(updated.stacktrace.is_none());

    let all = scheduler
        .get_all_collection_tasks(ACCOUNT_ID, vtid)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let next = all
        .iter()
        .find(|t| t.status == TaskStatus::Queued)
        .expect("success should enqueue the next window");
    assert_eq!(next.start_time, updated.end_time);
    assert_eq!(next.end_time.0, updated.end_time.0 + Duration::minutes(5));
    assert_eq!(next.valid_after.0, next.end_time.0 + Duration::minutes(2));
    assert_eq!(next.worker_id, WORKER_ID);
}

#[tokio::test]
async fn duplicate_success_is_a_noop_and_conflict_is_rejected() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();
    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .unwrap();

    scheduler
        .update_task_status(CollectionTaskResult::success(claimed.id))
        .await
        .unwrap();
    // Duplicate delivery of the same outcome: absorbed, no second chain.
    scheduler
        .update_task_status(CollectionTaskResult::success(claimed.id))
        .await
        .unwrap();
    let all = scheduler
        .get_all_collection_tasks(ACCOUNT_ID, vtid)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    // A different outcome for a terminal task is a consistency error.
    let conflict = scheduler
        .update_task_status(CollectionTaskResult::failure(
            claimed.id,
            "late failure",
            "trace",
        ))
        .await;
    assert!(matches!(
        conflict,
        Err(SchedulerError::ConflictingResult { .. })
    ));
}

#[tokio::test]
async fn failure_requeues_with_backoff_and_diagnostics() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();
    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .unwrap();

    let before = Utc::now();
    scheduler
        .update_task_status(CollectionTaskResult::failure(
            claimed.id,
            "socket timeout",
            "stack trace",
        ))
        .await
        .unwrap();

    let updated = scheduler.get_collection_task(claimed.id).await.unwrap();
    assert_eq!(updated.status, TaskStatus::Queued);
    assert_eq!(updated.retry_count, 1);
    assert_eq!(updated.exception.as_deref(), Some("socket timeout"));
    assert_eq!(updated.stacktrace.as_deref(), Some("stack trace"));
    assert!(updated.valid_after.0 >= before + Duration::seconds(5));
}

#[tokio::test]
async fn deployment_exhaustion_fails_task_and_job_instance() {
    let config = CollectionConfig::builder().max_retry_deployment(2).build();
    let db = memory_database().await;
    let dal = DAL::new(db);
    let scheduler = CollectionTaskScheduler::new(dal.clone(), config);
    let registry = VerificationTaskRegistry::new(dal.clone());
    let progress = JobInstanceProgress::new(dal.clone());

    let job = progress.create(ACCOUNT_ID).await.unwrap();
    let vtid = registry
        .create_deployment_task(ACCOUNT_ID, UniversalUuid::new_v4(), job.id)
        .await
        .unwrap();
    let task = scheduler
        .save(new_task(vtid, TaskKind::Deployment, TaskStatus::Queued))
        .await
        .unwrap();

    let result = CollectionTaskResult::failure(task.id, "exception msg", "trace");
    for expected_retry in 1..=2 {
        scheduler.update_task_status(result.clone()).await.unwrap();
        let updated = scheduler.get_collection_task(task.id).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Queued);
        assert_eq!(updated.retry_count, expected_retry);
    }

    scheduler.update_task_status(result).await.unwrap();
    let updated = scheduler.get_collection_task(task.id).await.unwrap();
    assert_eq!(updated.status, TaskStatus::Failed);
    assert_eq!(updated.retry_count, 2);
    assert_eq!(updated.exception.as_deref(), Some("exception msg"));

    let logs = progress.progress_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].execution_status, TaskStatus::Failed);
    assert!(logs[0].is_final_state);
    assert_eq!(logs[0].verification_task_id, vtid);
    assert_eq!(logs[0].start_time, task.start_time);
    assert_eq!(logs[0].end_time, task.end_time);

    let job = progress.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.execution_status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn deployment_success_records_progress_without_finishing_job() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let registry = VerificationTaskRegistry::new(dal.clone());
    let progress = JobInstanceProgress::new(dal.clone());

    let job = progress.create(ACCOUNT_ID).await.unwrap();
    let vtid = registry
        .create_deployment_task(ACCOUNT_ID, UniversalUuid::new_v4(), job.id)
        .await
        .unwrap();
    let task = scheduler
        .save(new_task(vtid, TaskKind::Deployment, TaskStatus::Queued))
        .await
        .unwrap();

    scheduler
        .update_task_status(CollectionTaskResult::success(task.id))
        .await
        .unwrap();

    let logs = progress.progress_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].execution_status, TaskStatus::Success);
    assert!(!logs[0].is_final_state);

    let job = progress.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.execution_status, ExecutionStatus::Queued);
}

#[tokio::test]
async fn seq_tasks_form_a_chain_with_only_the_head_pollable() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let tasks: Vec<NewCollectionTask> = (0..3)
        .map(|_| new_task(vtid, TaskKind::Deployment, TaskStatus::Queued))
        .collect();

    let chain = scheduler.create_seq_tasks(tasks).await.unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[0].status, TaskStatus::Queued);
    for i in 0..2 {
        assert_eq!(chain[i].next_task_id, Some(chain[i + 1].id));
        assert_eq!(chain[i + 1].status, TaskStatus::Waiting);
    }
    assert!(chain[2].next_task_id.is_none());

    let head = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .expect("head of the chain is pollable");
    assert_eq!(head.id, chain[0].id);
    assert!(
        scheduler
            .get_next_task(ACCOUNT_ID, WORKER_ID)
            .await
            .unwrap()
            .is_none(),
        "successors must stay dormant until the head completes"
    );

    scheduler
        .update_task_status(CollectionTaskResult::success(head.id))
        .await
        .unwrap();
    let successor = scheduler.get_collection_task(chain[1].id).await.unwrap();
    assert_eq!(successor.status, TaskStatus::Queued);
    let tail = scheduler.get_collection_task(chain[2].id).await.unwrap();
    assert_eq!(tail.status, TaskStatus::Waiting);
}

fn source_config(created_at: UniversalTimestamp) -> MonitoringSourceConfig {
    MonitoringSourceConfig {
        id: UniversalUuid::new_v4(),
        account_id: ACCOUNT_ID.to_string(),
        identifier: "service_env/prom".to_string(),
        connector_identifier: "prom-connector".to_string(),
        source_type: SourceType::Prometheus,
        enabled: true,
        created_at,
        spec: SourceSpec::Prometheus {
            metric_queries: vec![vigilance::mapper::MetricQuery {
                metric_name: "cpu_usage".to_string(),
                metric_type: vigilance::models::time_series::MetricType::Infra,
                query: "avg(cpu_usage_total)".to_string(),
            }],
        },
    }
}

#[tokio::test]
async fn first_task_covers_the_configs_first_window() {
    let (scheduler, _dal) = scheduler_with(test_config()).await;
    let created_at = UniversalTimestamp::now();
    let config = source_config(created_at);

    let task = scheduler.enqueue_first_task(&config).await.unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.kind, TaskKind::ServiceGuard);

    let expected_start = floor_to_window(created_at.0, Duration::minutes(5));
    assert_eq!(task.start_time.0, expected_start);
    assert_eq!(task.end_time.0, expected_start + Duration::minutes(5));
    assert_eq!(task.valid_after.0, task.end_time.0 + Duration::minutes(2));
    assert_eq!(
        task.worker_id,
        CollectionTaskScheduler::live_monitoring_worker_id(&config)
    );
    assert_eq!(task.collection_info["type"], "prometheus");
}

#[tokio::test]
async fn tombstoned_worker_suppresses_chaining() {
    let (scheduler, _dal) = scheduler_with(test_config()).await;
    // Backdate the config so the first window is already collectible.
    let config = source_config(UniversalTimestamp(Utc::now() - Duration::hours(1)));
    let task = scheduler.enqueue_first_task(&config).await.unwrap();
    let worker_id = CollectionTaskScheduler::live_monitoring_worker_id(&config);

    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, &worker_id)
        .await
        .unwrap()
        .expect("backdated first window is claimable");
    assert_eq!(claimed.id, task.id);

    // Source deleted while collection is in flight.
    scheduler
        .delete_perpetual_tasks(ACCOUNT_ID, &worker_id)
        .await
        .unwrap();
    scheduler
        .delete_perpetual_tasks(ACCOUNT_ID, &worker_id)
        .await
        .unwrap();

    scheduler
        .update_task_status(CollectionTaskResult::success(claimed.id))
        .await
        .unwrap();
    let all = scheduler
        .get_all_collection_tasks(ACCOUNT_ID, task.verification_task_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1, "no next window after tombstone");
    assert_eq!(all[0].status, TaskStatus::Success);
}

#[tokio::test]
async fn stale_service_guard_window_is_replaced_not_retried() {
    let (scheduler, dal) = scheduler_with(test_config()).await;
    let vtid = service_guard_verification_task(&dal).await;
    let now = Utc::now();
    let mut task = new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Running);
    task.start_time = UniversalTimestamp(now - Duration::hours(3) - Duration::minutes(5));
    task.end_time = UniversalTimestamp(now - Duration::hours(3));
    let saved = scheduler.save(task).await.unwrap();

    scheduler
        .update_task_status(CollectionTaskResult::failure(
            saved.id,
            "source unreachable",
            "trace",
        ))
        .await
        .unwrap();

    let failed = scheduler.get_collection_task(saved.id).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);

    let all = scheduler
        .get_all_collection_tasks(ACCOUNT_ID, vtid)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let replacement = all
        .iter()
        .find(|t| t.status == TaskStatus::Queued)
        .expect("stuck window is replaced");
    assert!(
        replacement.start_time.0 >= now - Duration::minutes(10),
        "replacement window snaps to the present instead of chasing the backlog"
    );
    assert_eq!(
        replacement.end_time.0,
        replacement.start_time.0 + Duration::minutes(5)
    );
}

#[tokio::test]
async fn batch_poll_respects_the_parallelism_bound() {
    let config = CollectionConfig::builder().max_parallel_collections(4).build();
    let (scheduler, dal) = scheduler_with(config).await;
    let vtid = service_guard_verification_task(&dal).await;
    for _ in 0..6 {
        scheduler
            .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
            .await
            .unwrap();
    }

    let dtos = scheduler
        .get_next_task_dtos(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap();
    assert_eq!(dtos.len(), 4);
    let rest = scheduler
        .get_next_task_dtos(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);
}

#[tokio::test]
async fn reset_retry_zeroes_the_count_and_defers_the_task() {
    let config = CollectionConfig::builder()
        .stale_running_threshold(Duration::zero())
        .build();
    let (scheduler, dal) = scheduler_with(config).await;
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Running))
        .await
        .unwrap();
    let claimed = scheduler
        .get_next_task(ACCOUNT_ID, WORKER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.retry_count, 1);

    let before = Utc::now();
    scheduler.reset_retry(claimed.id).await.unwrap();
    let updated = scheduler.get_collection_task(claimed.id).await.unwrap();
    assert_eq!(updated.retry_count, 0);
    assert!(updated.valid_after.0 >= before + Duration::minutes(4));
}

#[tokio::test]
async fn concurrent_claimers_get_at_most_one_winner() {
    let (db, dir) = file_database().await;
    let dal = DAL::new(db);
    let scheduler = CollectionTaskScheduler::new(dal.clone(), test_config());
    let vtid = service_guard_verification_task(&dal).await;
    scheduler
        .save(new_task(vtid, TaskKind::ServiceGuard, TaskStatus::Queued))
        .await
        .unwrap();

    const NUM_WORKERS: usize = 8;
    let barrier = Arc::new(Barrier::new(NUM_WORKERS));
    let mut handles = Vec::new();
    for _ in 0..NUM_WORKERS {
        // Each claimer gets its own pool, as an independent worker process
        // sharing the database file would.
        let worker_db = reopen_database(&dir).await;
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            let scheduler =
                CollectionTaskScheduler::new(DAL::new(worker_db), test_config());
            barrier.wait().await;
            scheduler
                .get_next_task(ACCOUNT_ID, WORKER_ID)
                .await
                .expect("claim must not error")
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.expect("claimer panicked").is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one claimer may win the task");
}
