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

//! Registry and job-instance progress behavior.

use chrono::{Duration, Utc};

use vigilance::dal::DAL;
use vigilance::database::{UniversalTimestamp, UniversalUuid};
use vigilance::models::collection_task::{TaskKind, TaskStatus};
use vigilance::models::job_instance::{ExecutionStatus, ProgressLogEntry};
use vigilance::progress::JobInstanceProgress;
use vigilance::registry::VerificationTaskRegistry;

use crate::fixtures::{memory_database, ACCOUNT_ID};

fn entry(
    job_instance_id: UniversalUuid,
    verification_task_id: UniversalUuid,
    status: TaskStatus,
    is_final_state: bool,
) -> ProgressLogEntry {
    let now = Utc::now();
    ProgressLogEntry {
        job_instance_id,
        execution_status: status,
        verification_task_id,
        start_time: UniversalTimestamp(now - Duration::minutes(7)),
        end_time: UniversalTimestamp(now - Duration::minutes(2)),
        log: format!("Data collection task status: {}", status),
        is_final_state,
    }
}

#[tokio::test]
async fn live_monitoring_registry_entry_is_get_or_create() {
    let dal = DAL::new(memory_database().await);
    let registry = VerificationTaskRegistry::new(dal.clone());
    let cv_config_id = UniversalUuid::new_v4();

    let first = registry
        .create_live_monitoring_task(ACCOUNT_ID, cv_config_id)
        .await
        .unwrap();
    let second = registry
        .create_live_monitoring_task(ACCOUNT_ID, cv_config_id)
        .await
        .unwrap();
    assert_eq!(first, second);

    let entry = registry.get(first).await.unwrap().unwrap();
    assert_eq!(entry.kind, TaskKind::ServiceGuard);
    assert_eq!(entry.cv_config_id, cv_config_id);
    assert!(entry.job_instance_id.is_none());
}

#[tokio::test]
async fn deployment_registry_entries_are_distinct_per_run() {
    let dal = DAL::new(memory_database().await);
    let registry = VerificationTaskRegistry::new(dal.clone());
    let progress = JobInstanceProgress::new(dal.clone());
    let cv_config_id = UniversalUuid::new_v4();

    let job_a = progress.create(ACCOUNT_ID).await.unwrap();
    let job_b = progress.create(ACCOUNT_ID).await.unwrap();
    let vtid_a = registry
        .create_deployment_task(ACCOUNT_ID, cv_config_id, job_a.id)
        .await
        .unwrap();
    let vtid_b = registry
        .create_deployment_task(ACCOUNT_ID, cv_config_id, job_b.id)
        .await
        .unwrap();
    assert_ne!(vtid_a, vtid_b);

    assert_eq!(
        registry.maybe_get_job_instance_id(vtid_a).await.unwrap(),
        Some(job_a.id)
    );
    assert_eq!(
        registry.maybe_get_job_instance_id(vtid_b).await.unwrap(),
        Some(job_b.id)
    );
}

#[tokio::test]
async fn non_final_progress_extends_the_log_without_state_change() {
    let dal = DAL::new(memory_database().await);
    let progress = JobInstanceProgress::new(dal.clone());
    let job = progress.create(ACCOUNT_ID).await.unwrap();
    assert_eq!(job.execution_status, ExecutionStatus::Queued);
    let vtid = UniversalUuid::new_v4();

    progress
        .log_progress(entry(job.id, vtid, TaskStatus::Success, false))
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
async fn duplicate_progress_delivery_appends_nothing() {
    let dal = DAL::new(memory_database().await);
    let progress = JobInstanceProgress::new(dal.clone());
    let job = progress.create(ACCOUNT_ID).await.unwrap();
    let vtid = UniversalUuid::new_v4();

    let event = entry(job.id, vtid, TaskStatus::Success, false);
    progress.log_progress(event.clone()).await.unwrap();
    progress.log_progress(event).await.unwrap();

    let logs = progress.progress_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn final_failed_entry_fails_the_job() {
    let dal = DAL::new(memory_database().await);
    let progress = JobInstanceProgress::new(dal.clone());
    let job = progress.create(ACCOUNT_ID).await.unwrap();
    let vtid = UniversalUuid::new_v4();

    progress
        .log_progress(entry(job.id, vtid, TaskStatus::Failed, true))
        .await
        .unwrap();

    let job = progress.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.execution_status, ExecutionStatus::Failed);
    let logs = progress.progress_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].is_final_state);
}

#[tokio::test]
async fn final_success_entry_completes_the_job() {
    let dal = DAL::new(memory_database().await);
    let progress = JobInstanceProgress::new(dal.clone());
    let job = progress.create(ACCOUNT_ID).await.unwrap();
    let vtid = UniversalUuid::new_v4();

    progress
        .log_progress(entry(job.id, vtid, TaskStatus::Success, false))
        .await
        .unwrap();
    progress
        .log_progress(entry(job.id, vtid, TaskStatus::Success, true))
        .await
        .unwrap();

    let job = progress.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.execution_status, ExecutionStatus::Success);
    let logs = progress.progress_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 2);
}
