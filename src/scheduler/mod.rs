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

//! Collection task scheduling.
//!
//! The scheduler is the task queue and state machine of the pipeline:
//! remote workers poll [`CollectionTaskScheduler::get_next_task`] for their
//! (account, worker) pair, execute the collection externally, and post the
//! outcome back through [`CollectionTaskScheduler::update_task_status`],
//! which drives retries, window chaining, and job-instance progress.
//!
//! # Concurrency
//!
//! Many worker processes poll concurrently. Claiming delegates to the DAL's
//! atomic find-and-modify, so exactly one poller wins a QUEUED task.
//! Duplicate result delivery is absorbed by the terminal-status idempotency
//! rule; a conflicting terminal result is rejected rather than merged.
//!
//! # Failure policy
//!
//! Deployment windows retry up to their bound and then fail the owning
//! verification run. Service-guard windows favor availability: a window
//! stuck past the restart threshold is failed and replaced with a window
//! snapped to the present, so continuous monitoring never silently stops.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{floor_to_window, CollectionConfig};
use crate::dal::{ClaimPolicy, DAL};
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::dto::{CollectionOutcome, CollectionTaskDTO, CollectionTaskResult};
use crate::error::SchedulerError;
use crate::mapper::{MapperRegistry, MonitoringSourceConfig};
use crate::models::collection_task::{CollectionTask, NewCollectionTask, TaskKind, TaskStatus};
use crate::models::job_instance::ProgressLogEntry;
use crate::progress::JobInstanceProgress;
use crate::registry::VerificationTaskRegistry;

/// Task queue and state machine for data collection.
#[derive(Clone, Debug)]
pub struct CollectionTaskScheduler {
    dal: DAL,
    config: CollectionConfig,
    registry: VerificationTaskRegistry,
    progress: JobInstanceProgress,
    mappers: Arc<MapperRegistry>,
}

impl CollectionTaskScheduler {
    pub fn new(dal: DAL, config: CollectionConfig) -> Self {
        Self {
            registry: VerificationTaskRegistry::new(dal.clone()),
            progress: JobInstanceProgress::new(dal.clone()),
            mappers: Arc::new(MapperRegistry::with_defaults()),
            dal,
            config,
        }
    }

    /// Replaces the mapper registry (e.g. to add a custom source type).
    pub fn with_mappers(mut self, mappers: MapperRegistry) -> Self {
        self.mappers = Arc::new(mappers);
        self
    }

    /// The worker id that live-monitoring tasks of a config are polled
    /// under.
    pub fn live_monitoring_worker_id(config: &MonitoringSourceConfig) -> String {
        format!(
            "{}/{}/{}",
            config.account_id, config.connector_identifier, config.identifier
        )
    }

    /// Persists a task. WAITING tasks stay dormant; QUEUED tasks are
    /// immediately pollable.
    pub async fn save(&self, task: NewCollectionTask) -> Result<CollectionTask, SchedulerError> {
        let valid_until =
            UniversalTimestamp(UniversalTimestamp::now().0 + self.config.task_ttl());
        let stored = self.dal.collection_task().create(task, valid_until).await?;
        debug!(task_id = %stored.id, status = %stored.status, "Collection task saved");
        Ok(stored)
    }

    /// Claims the next eligible task for (account, worker), if any.
    pub async fn get_next_task(
        &self,
        account_id: &str,
        worker_id: &str,
    ) -> Result<Option<CollectionTask>, SchedulerError> {
        let now = UniversalTimestamp::now();
        let policy = ClaimPolicy {
            stale_before: UniversalTimestamp(now.0 - self.config.stale_running_threshold()),
            max_retry_deployment: self.config.max_retry_count(TaskKind::Deployment),
        };
        let claimed = self
            .dal
            .collection_task()
            .claim_next(account_id, worker_id, policy)
            .await?;
        if let Some(task) = &claimed {
            metrics::counter!("collection_tasks_claimed_total").increment(1);
            debug!(task_id = %task.id, retry_count = task.retry_count, "Collection task claimed");
        }
        Ok(claimed)
    }

    /// DTO projection of [`Self::get_next_task`].
    pub async fn get_next_task_dto(
        &self,
        account_id: &str,
        worker_id: &str,
    ) -> Result<Option<CollectionTaskDTO>, SchedulerError> {
        Ok(self
            .get_next_task(account_id, worker_id)
            .await?
            .as_ref()
            .map(CollectionTaskDTO::from))
    }

    /// Claims up to `max_parallel_collections` tasks for one poll cycle.
    pub async fn get_next_task_dtos(
        &self,
        account_id: &str,
        worker_id: &str,
    ) -> Result<Vec<CollectionTaskDTO>, SchedulerError> {
        let mut dtos = Vec::new();
        while dtos.len() < self.config.max_parallel_collections() {
            match self.get_next_task_dto(account_id, worker_id).await? {
                Some(dto) => dtos.push(dto),
                None => break,
            }
        }
        Ok(dtos)
    }

    /// Applies a worker-reported outcome to a task.
    ///
    /// Idempotent for duplicate delivery of the same outcome; a second,
    /// different outcome for an already terminal task is a consistency
    /// error.
    pub async fn update_task_status(
        &self,
        result: CollectionTaskResult,
    ) -> Result<(), SchedulerError> {
        let task = self
            .dal
            .collection_task()
            .get(result.collection_task_id)
            .await?
            .ok_or(SchedulerError::TaskNotFound(result.collection_task_id))?;

        let incoming = match result.status {
            CollectionOutcome::Success => TaskStatus::Success,
            CollectionOutcome::Failed => TaskStatus::Failed,
        };

        if task.status.is_terminal() {
            if task.status == incoming {
                debug!(task_id = %task.id, status = %task.status,
                    "Duplicate result for terminal task ignored");
                return Ok(());
            }
            return Err(SchedulerError::ConflictingResult {
                task_id: task.id,
                existing: task.status.to_string(),
                incoming: incoming.to_string(),
            });
        }

        metrics::counter!("collection_task_results_total").increment(1);
        match result.status {
            CollectionOutcome::Success => self.handle_success(&task).await,
            CollectionOutcome::Failed => self.handle_failure(&task, &result).await,
        }
    }

    async fn handle_success(&self, task: &CollectionTask) -> Result<(), SchedulerError> {
        self.dal.collection_task().mark_success(task.id).await?;
        info!(task_id = %task.id, "Collection task succeeded");

        self.record_progress(
            task,
            TaskStatus::Success,
            false,
            "Data collection task successful",
        )
        .await?;

        match task.kind {
            TaskKind::Deployment => {
                if let Some(next_id) = task.next_task_id {
                    let activated = self.dal.collection_task().activate_waiting(next_id).await?;
                    if activated {
                        debug!(task_id = %task.id, next_task_id = %next_id,
                            "Chain successor activated");
                    } else {
                        debug!(next_task_id = %next_id,
                            "Chain successor not in WAITING state, left untouched");
                    }
                }
            }
            TaskKind::ServiceGuard => {
                self.enqueue_next_window(task, None).await?;
            }
        }
        Ok(())
    }

    async fn handle_failure(
        &self,
        task: &CollectionTask,
        result: &CollectionTaskResult,
    ) -> Result<(), SchedulerError> {
        let now = UniversalTimestamp::now();
        let max_retry = self.config.max_retry_count(task.kind);
        let exception = result.exception.as_deref();
        let stacktrace = result.stacktrace.as_deref();
        let window_stale = now.0 - task.end_time.0 > self.config.window_restart_threshold();

        let retriable = task.retry_count < max_retry
            && !(task.kind == TaskKind::ServiceGuard && window_stale);
        if retriable {
            let new_retry = task.retry_count + 1;
            let delay = self.config.retry_backoff(task.retry_count)
                + chrono::Duration::milliseconds(rand::thread_rng().gen_range(0..1000));
            let valid_after = UniversalTimestamp(now.0 + delay);
            self.dal
                .collection_task()
                .requeue_failed(task.id, new_retry, valid_after, exception, stacktrace)
                .await?;
            metrics::counter!("collection_task_retries_total").increment(1);
            debug!(task_id = %task.id, retry_count = new_retry,
                exception = exception.unwrap_or(""), "Collection task re-queued after failure");
            return Ok(());
        }

        self.dal
            .collection_task()
            .mark_failed(task.id, exception, stacktrace)
            .await?;
        warn!(task_id = %task.id, retry_count = task.retry_count,
            exception = exception.unwrap_or(""), "Collection task failed terminally");

        match task.kind {
            TaskKind::Deployment => {
                let log = format!(
                    "Data collection failed with exception: {}",
                    exception.unwrap_or("unknown")
                );
                self.record_progress(task, TaskStatus::Failed, true, &log)
                    .await?;
            }
            TaskKind::ServiceGuard => {
                // Monitoring must not stop: replace the stuck window with
                // one further in the future instead of retrying forever.
                self.enqueue_next_window(task, Some(now)).await?;
            }
        }
        Ok(())
    }

    /// Creates the next service-guard window after `task`, unless the
    /// worker registration has been tombstoned.
    ///
    /// The next window normally starts where the previous one ended. A
    /// window whose end is older than the restart threshold snaps to the
    /// present instead, so an outage does not produce an unbounded backlog
    /// of stale windows.
    async fn enqueue_next_window(
        &self,
        task: &CollectionTask,
        replace_after_failure: Option<UniversalTimestamp>,
    ) -> Result<(), SchedulerError> {
        if self
            .dal
            .worker_registration()
            .is_tombstoned(&task.account_id, &task.worker_id)
            .await?
        {
            info!(task_id = %task.id, worker_id = %task.worker_id,
                "Worker registration tombstoned, not chaining next window");
            return Ok(());
        }

        let now = UniversalTimestamp::now();
        let window = self.config.analysis_window();
        let next_start = if now.0 - task.end_time.0 > self.config.window_restart_threshold() {
            floor_to_window(now.0, window)
        } else {
            task.end_time.0
        };
        let next_end = next_start + window;
        let valid_after = match replace_after_failure {
            // Replacement for a failed window: pollable after a backoff
            // rather than after the collection delay.
            Some(failed_at) => {
                UniversalTimestamp(failed_at.0 + self.config.retry_backoff(task.retry_count))
            }
            None => UniversalTimestamp(next_end + self.config.data_collection_delay()),
        };

        let next = NewCollectionTask {
            account_id: task.account_id.clone(),
            verification_task_id: task.verification_task_id,
            worker_id: task.worker_id.clone(),
            kind: TaskKind::ServiceGuard,
            status: TaskStatus::Queued,
            start_time: UniversalTimestamp(next_start),
            end_time: UniversalTimestamp(next_end),
            valid_after: Some(valid_after),
            last_picked_at: None,
            collection_info: task.collection_info.clone(),
        };
        let stored = self.save(next).await?;
        debug!(task_id = %stored.id, start = %stored.start_time, end = %stored.end_time,
            "Next collection window enqueued");
        Ok(())
    }

    async fn record_progress(
        &self,
        task: &CollectionTask,
        status: TaskStatus,
        is_final_state: bool,
        log: &str,
    ) -> Result<(), SchedulerError> {
        let Some(job_instance_id) = self
            .registry
            .maybe_get_job_instance_id(task.verification_task_id)
            .await?
        else {
            return Ok(());
        };
        self.progress
            .log_progress(ProgressLogEntry {
                job_instance_id,
                execution_status: status,
                verification_task_id: task.verification_task_id,
                start_time: task.start_time,
                end_time: task.end_time,
                log: log.to_string(),
                is_final_state,
            })
            .await?;
        Ok(())
    }

    /// Bulk-saves same-size windows as a chain: the head QUEUED, the rest
    /// WAITING behind `next_task_id` pointers. Future windows are only
    /// activated one at a time by the success handler.
    pub async fn create_seq_tasks(
        &self,
        tasks: Vec<NewCollectionTask>,
    ) -> Result<Vec<CollectionTask>, SchedulerError> {
        let valid_until =
            UniversalTimestamp(UniversalTimestamp::now().0 + self.config.task_ttl());
        let stored = self
            .dal
            .collection_task()
            .create_seq_tasks(tasks, valid_until)
            .await?;
        debug!(count = stored.len(), "Sequential task chain created");
        Ok(stored)
    }

    /// Computes a config's first collection window, builds its payload via
    /// the source-type mapper, registers the worker, and persists the
    /// first QUEUED task.
    pub async fn enqueue_first_task(
        &self,
        config: &MonitoringSourceConfig,
    ) -> Result<CollectionTask, SchedulerError> {
        let verification_task_id = self
            .registry
            .create_live_monitoring_task(&config.account_id, config.id)
            .await?;
        let worker_id = Self::live_monitoring_worker_id(config);
        self.dal
            .worker_registration()
            .register(&config.account_id, &worker_id)
            .await?;

        let info = self.mappers.to_collection_info(config)?;
        let window = self.config.analysis_window();
        let first_start = floor_to_window(config.created_at.0, window);
        let first_end = first_start + window;
        let valid_after = UniversalTimestamp(first_end + self.config.data_collection_delay());

        let task = NewCollectionTask {
            account_id: config.account_id.clone(),
            verification_task_id,
            worker_id,
            kind: TaskKind::ServiceGuard,
            status: TaskStatus::Queued,
            start_time: UniversalTimestamp(first_start),
            end_time: UniversalTimestamp(first_end),
            valid_after: Some(valid_after),
            last_picked_at: None,
            collection_info: serde_json::to_value(&info)?,
        };
        let stored = self.save(task).await?;
        info!(task_id = %stored.id, verification_task_id = %verification_task_id,
            "First collection task enqueued");
        Ok(stored)
    }

    /// Tombstones the worker registration so completed tasks stop chaining
    /// new windows. Idempotent; in-flight RUNNING tasks finish normally.
    pub async fn delete_perpetual_tasks(
        &self,
        account_id: &str,
        worker_id: &str,
    ) -> Result<(), SchedulerError> {
        self.dal
            .worker_registration()
            .tombstone(account_id, worker_id)
            .await?;
        info!(account_id, worker_id, "Worker registration tombstoned");
        Ok(())
    }

    /// Retrieves a task, failing if it does not exist.
    pub async fn get_collection_task(
        &self,
        id: UniversalUuid,
    ) -> Result<CollectionTask, SchedulerError> {
        self.dal
            .collection_task()
            .get(id)
            .await?
            .ok_or(SchedulerError::TaskNotFound(id))
    }

    /// All tasks for a verification task, oldest first.
    pub async fn get_all_collection_tasks(
        &self,
        account_id: &str,
        verification_task_id: UniversalUuid,
    ) -> Result<Vec<CollectionTask>, SchedulerError> {
        Ok(self
            .dal
            .collection_task()
            .get_all(account_id, verification_task_id)
            .await?)
    }

    /// Non-terminal tasks for a verification task, oldest first.
    pub async fn get_all_non_final_tasks(
        &self,
        account_id: &str,
        verification_task_id: UniversalUuid,
    ) -> Result<Vec<CollectionTask>, SchedulerError> {
        Ok(self
            .dal
            .collection_task()
            .get_all_non_final(account_id, verification_task_id)
            .await?)
    }

    /// Ops recovery hook: zero a task's retry count and push its
    /// `valid_after` out by the maximum backoff.
    pub async fn reset_retry(&self, task_id: UniversalUuid) -> Result<(), SchedulerError> {
        let task = self.get_collection_task(task_id).await?;
        let valid_after =
            UniversalTimestamp(UniversalTimestamp::now().0 + self.config.retry_backoff_cap());
        self.dal
            .collection_task()
            .reset_retry(task.id, valid_after)
            .await?;
        info!(task_id = %task.id, "Retry state reset");
        Ok(())
    }
}
