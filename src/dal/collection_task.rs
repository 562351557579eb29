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

//! Collection task storage operations.
//!
//! Claiming runs inside an IMMEDIATE transaction: SQLite takes the write
//! lock up front, so the select-then-update cannot race another claimer,
//! whether in this process or in another process sharing the database
//! file. Two workers polling the same (account, worker) pair get disjoint
//! tasks.
//!
//! Eligibility inside the claim is evaluated on the stored representation
//! (status strings, fixed-width timestamps) so the whole decision stays
//! within the write transaction.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::collection_tasks;
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::collection_task::{
    CollectionTask, CollectionTaskRow, NewCollectionTask, NewCollectionTaskRow, TaskKind,
    TaskStatus,
};

/// Claim-time policy knobs, resolved from [`crate::config::CollectionConfig`]
/// by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct ClaimPolicy {
    /// RUNNING tasks picked before this instant are considered abandoned.
    pub stale_before: UniversalTimestamp,
    /// Deployment tasks with `retry_count` above this are never served.
    pub max_retry_deployment: i32,
}

/// Data access for collection tasks.
#[derive(Clone)]
pub struct CollectionTaskDAL<'a> {
    dal: &'a DAL,
}

impl<'a> CollectionTaskDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    fn build_row(
        task: &NewCollectionTask,
        id: UniversalUuid,
        next_task_id: Option<UniversalUuid>,
        status: TaskStatus,
        valid_until: UniversalTimestamp,
        now: UniversalTimestamp,
    ) -> NewCollectionTaskRow {
        NewCollectionTaskRow {
            id: id.to_blob(),
            account_id: task.account_id.clone(),
            verification_task_id: task.verification_task_id.to_blob(),
            worker_id: task.worker_id.clone(),
            kind: task.kind.as_str().to_string(),
            status: status.as_str().to_string(),
            start_time: task.start_time.to_stored(),
            end_time: task.end_time.to_stored(),
            valid_after: task.valid_after.unwrap_or(now).to_stored(),
            valid_until: valid_until.to_stored(),
            last_picked_at: task.last_picked_at.map(|t| t.to_stored()),
            retry_count: 0,
            next_task_id: next_task_id.map(|i| i.to_blob()),
            collection_info: task.collection_info.to_string(),
            created_at: now.to_stored(),
            updated_at: now.to_stored(),
        }
    }

    /// Inserts a single task and returns the stored view.
    pub async fn create(
        &self,
        task: NewCollectionTask,
        valid_until: UniversalTimestamp,
    ) -> Result<CollectionTask, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now();
        let id = UniversalUuid::new_v4();
        let row = Self::build_row(&task, id, None, task.status, valid_until, now);

        let stored: CollectionTaskRow = conn
            .interact(move |conn| {
                diesel::insert_into(collection_tasks::table)
                    .values(&row)
                    .execute(conn)?;
                collection_tasks::table.find(row.id.clone()).first(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        stored.try_into()
    }

    /// Persists a list of same-size windows as a chain.
    ///
    /// The head is stored QUEUED, the rest WAITING with `next_task_id`
    /// pointers forming the singly linked list. Only the head is pollable;
    /// successors are activated one at a time by the success handler.
    pub async fn create_seq_tasks(
        &self,
        tasks: Vec<NewCollectionTask>,
        valid_until: UniversalTimestamp,
    ) -> Result<Vec<CollectionTask>, StoreError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now();

        let ids: Vec<UniversalUuid> = tasks.iter().map(|_| UniversalUuid::new_v4()).collect();
        let rows: Vec<NewCollectionTaskRow> = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let status = if i == 0 {
                    TaskStatus::Queued
                } else {
                    TaskStatus::Waiting
                };
                let next = ids.get(i + 1).copied();
                Self::build_row(task, ids[i], next, status, valid_until, now)
            })
            .collect();

        let id_blobs: Vec<Vec<u8>> = ids.iter().map(|i| i.to_blob()).collect();
        let stored: Vec<CollectionTaskRow> = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                    diesel::insert_into(collection_tasks::table)
                        .values(&rows)
                        .execute(conn)?;
                    let mut loaded = Vec::with_capacity(id_blobs.len());
                    for id in &id_blobs {
                        loaded.push(collection_tasks::table.find(id.clone()).first(conn)?);
                    }
                    Ok(loaded)
                })
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        stored.into_iter().map(TryInto::try_into).collect()
    }

    /// Retrieves a task by id.
    pub async fn get(&self, id: UniversalUuid) -> Result<Option<CollectionTask>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let row: Option<CollectionTaskRow> = conn
            .interact(move |conn| {
                collection_tasks::table
                    .find(id_blob)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        row.map(TryInto::try_into).transpose()
    }

    /// Atomically claims the next eligible task for (account, worker).
    ///
    /// Selection order: QUEUED tasks first, then stale RUNNING tasks (the
    /// recovery path for workers that died mid-collection; reclaiming bumps
    /// `retry_count`). Ties break FIFO on `updated_at`. Tasks whose
    /// `valid_after` is in the future are invisible. Exhausted deployment
    /// tasks are skipped before staleness is even considered.
    pub async fn claim_next(
        &self,
        account_id: &str,
        worker_id: &str,
        policy: ClaimPolicy,
    ) -> Result<Option<CollectionTask>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now();
        let now_stored = now.to_stored();
        let stale_before = policy.stale_before.to_stored();
        let account = account_id.to_string();
        let worker = worker_id.to_string();
        let max_retry_deployment = policy.max_retry_deployment;

        let claimed: Option<CollectionTaskRow> = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                    let candidates: Vec<CollectionTaskRow> = collection_tasks::table
                        .filter(collection_tasks::account_id.eq(&account))
                        .filter(collection_tasks::worker_id.eq(&worker))
                        .filter(collection_tasks::valid_after.le(&now_stored))
                        .filter(collection_tasks::status.eq_any(vec![
                            TaskStatus::Queued.as_str(),
                            TaskStatus::Running.as_str(),
                        ]))
                        .order(collection_tasks::updated_at.asc())
                        .load(conn)?;

                    let eligible = |row: &CollectionTaskRow| {
                        // Exhaustion is checked before reclaim eligibility:
                        // a stale-but-exhausted deployment task stays stuck.
                        !(row.kind == TaskKind::Deployment.as_str()
                            && row.retry_count > max_retry_deployment)
                    };

                    let queued = candidates
                        .iter()
                        .find(|row| row.status == TaskStatus::Queued.as_str() && eligible(row));
                    let stale_running = candidates.iter().find(|row| {
                        row.status == TaskStatus::Running.as_str()
                            && eligible(row)
                            && row
                                .last_picked_at
                                .as_deref()
                                .map(|picked| picked < stale_before.as_str())
                                .unwrap_or(true)
                    });

                    let picked = match (queued, stale_running) {
                        (Some(row), _) => row,
                        (None, Some(row)) => row,
                        (None, None) => return Ok(None),
                    };

                    let reclaim = picked.status == TaskStatus::Running.as_str();
                    let new_retry = picked.retry_count + if reclaim { 1 } else { 0 };
                    diesel::update(collection_tasks::table.find(picked.id.clone()))
                        .set((
                            collection_tasks::status.eq(TaskStatus::Running.as_str()),
                            collection_tasks::last_picked_at.eq(Some(now_stored.clone())),
                            collection_tasks::retry_count.eq(new_retry),
                            collection_tasks::updated_at.eq(&now_stored),
                        ))
                        .execute(conn)?;

                    collection_tasks::table
                        .find(picked.id.clone())
                        .first(conn)
                        .map(Some)
                })
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        claimed.map(TryInto::try_into).transpose()
    }

    /// Marks a task SUCCESS: diagnostics cleared, retry count reset.
    pub async fn mark_success(&self, id: UniversalUuid) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let now = UniversalTimestamp::now().to_stored();
        conn.interact(move |conn| {
            diesel::update(collection_tasks::table.find(id_blob))
                .set((
                    collection_tasks::status.eq(TaskStatus::Success.as_str()),
                    collection_tasks::retry_count.eq(0),
                    collection_tasks::exception.eq(None::<String>),
                    collection_tasks::stacktrace.eq(None::<String>),
                    collection_tasks::updated_at.eq(now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Re-queues a failed task for another attempt after the backoff delay.
    pub async fn requeue_failed(
        &self,
        id: UniversalUuid,
        retry_count: i32,
        valid_after: UniversalTimestamp,
        exception: Option<&str>,
        stacktrace: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let now = UniversalTimestamp::now().to_stored();
        let exception = exception.map(|s| s.to_string());
        let stacktrace = stacktrace.map(|s| s.to_string());
        let valid_after = valid_after.to_stored();
        conn.interact(move |conn| {
            diesel::update(collection_tasks::table.find(id_blob))
                .set((
                    collection_tasks::status.eq(TaskStatus::Queued.as_str()),
                    collection_tasks::retry_count.eq(retry_count),
                    collection_tasks::valid_after.eq(valid_after),
                    collection_tasks::exception.eq(exception),
                    collection_tasks::stacktrace.eq(stacktrace),
                    collection_tasks::updated_at.eq(now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Marks a task terminally FAILED with its diagnostics.
    pub async fn mark_failed(
        &self,
        id: UniversalUuid,
        exception: Option<&str>,
        stacktrace: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let now = UniversalTimestamp::now().to_stored();
        let exception = exception.map(|s| s.to_string());
        let stacktrace = stacktrace.map(|s| s.to_string());
        conn.interact(move |conn| {
            diesel::update(collection_tasks::table.find(id_blob))
                .set((
                    collection_tasks::status.eq(TaskStatus::Failed.as_str()),
                    collection_tasks::exception.eq(exception),
                    collection_tasks::stacktrace.eq(stacktrace),
                    collection_tasks::updated_at.eq(now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Promotes a WAITING chain successor to QUEUED.
    ///
    /// Conditional on the current status, so a tombstoned or already
    /// activated successor is left untouched. Returns whether a row moved.
    pub async fn activate_waiting(&self, id: UniversalUuid) -> Result<bool, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let now = UniversalTimestamp::now().to_stored();
        let affected = conn
            .interact(move |conn| {
                diesel::update(
                    collection_tasks::table
                        .find(id_blob)
                        .filter(collection_tasks::status.eq(TaskStatus::Waiting.as_str())),
                )
                .set((
                    collection_tasks::status.eq(TaskStatus::Queued.as_str()),
                    collection_tasks::updated_at.eq(now),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(affected > 0)
    }

    /// Zeroes the retry count and pushes `valid_after` out; ops recovery
    /// hook for a wedged task.
    pub async fn reset_retry(
        &self,
        id: UniversalUuid,
        valid_after: UniversalTimestamp,
    ) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let now = UniversalTimestamp::now().to_stored();
        let valid_after = valid_after.to_stored();
        conn.interact(move |conn| {
            diesel::update(collection_tasks::table.find(id_blob))
                .set((
                    collection_tasks::retry_count.eq(0),
                    collection_tasks::valid_after.eq(valid_after),
                    collection_tasks::updated_at.eq(now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// All tasks for a verification task, oldest first.
    pub async fn get_all(
        &self,
        account_id: &str,
        verification_task_id: UniversalUuid,
    ) -> Result<Vec<CollectionTask>, StoreError> {
        self.load_for_verification_task(account_id, verification_task_id, None)
            .await
    }

    /// Tasks for a verification task that have not reached a terminal
    /// state, oldest first.
    pub async fn get_all_non_final(
        &self,
        account_id: &str,
        verification_task_id: UniversalUuid,
    ) -> Result<Vec<CollectionTask>, StoreError> {
        let statuses: Vec<&'static str> = TaskStatus::non_terminal_statuses()
            .iter()
            .map(|s| s.as_str())
            .collect();
        self.load_for_verification_task(account_id, verification_task_id, Some(statuses))
            .await
    }

    async fn load_for_verification_task(
        &self,
        account_id: &str,
        verification_task_id: UniversalUuid,
        statuses: Option<Vec<&'static str>>,
    ) -> Result<Vec<CollectionTask>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let account = account_id.to_string();
        let vtid_blob = verification_task_id.to_blob();
        let rows: Vec<CollectionTaskRow> = conn
            .interact(move |conn| {
                let query = collection_tasks::table
                    .filter(collection_tasks::account_id.eq(&account))
                    .filter(collection_tasks::verification_task_id.eq(&vtid_blob))
                    .order(collection_tasks::created_at.asc())
                    .into_boxed();
                let query = match statuses {
                    Some(statuses) => {
                        query.filter(collection_tasks::status.eq_any(statuses))
                    }
                    None => query,
                };
                query.load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
