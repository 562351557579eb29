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

//! Collection task model.
//!
//! A collection task is one half-open time window of data collection for a
//! verification task, executed by a remote worker. Tasks for consecutive
//! windows form a singly linked chain through `next_task_id`; the pointer
//! is a plain id reference, resolved through the store, never an owned
//! embedding.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;

/// Execution status of a collection task.
///
/// WAITING tasks are chain members whose predecessor has not completed;
/// QUEUED tasks are pollable; RUNNING tasks are claimed by a worker.
/// SUCCESS and FAILED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Waiting,
    Queued,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "WAITING",
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }

    pub fn non_terminal_statuses() -> &'static [TaskStatus] {
        &[TaskStatus::Waiting, TaskStatus::Queued, TaskStatus::Running]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(TaskStatus::Waiting),
            "QUEUED" => Ok(TaskStatus::Queued),
            "RUNNING" => Ok(TaskStatus::Running),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// Kind of collection task, which decides the retry policy.
///
/// Service-guard (continuous monitoring) tasks favor availability: they
/// keep being served past the retry bound and a permanently stuck window
/// is replaced rather than blocking future collection. Deployment tasks
/// favor correctness: exhausting retries fails the verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    ServiceGuard,
    Deployment,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ServiceGuard => "SERVICE_GUARD",
            TaskKind::Deployment => "DEPLOYMENT",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SERVICE_GUARD" => Ok(TaskKind::ServiceGuard),
            "DEPLOYMENT" => Ok(TaskKind::Deployment),
            other => Err(format!("unknown task kind '{}'", other)),
        }
    }
}

/// Domain view of a collection task.
#[derive(Debug, Clone)]
pub struct CollectionTask {
    pub id: UniversalUuid,
    pub account_id: String,
    pub verification_task_id: UniversalUuid,
    pub worker_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub start_time: UniversalTimestamp,
    pub end_time: UniversalTimestamp,
    pub valid_after: UniversalTimestamp,
    pub valid_until: UniversalTimestamp,
    pub last_picked_at: Option<UniversalTimestamp>,
    pub retry_count: i32,
    pub next_task_id: Option<UniversalUuid>,
    /// Opaque payload handed to the remote worker. The scheduler never
    /// inspects it.
    pub collection_info: serde_json::Value,
    pub exception: Option<String>,
    pub stacktrace: Option<String>,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
}

/// Input for creating a collection task.
#[derive(Debug, Clone)]
pub struct NewCollectionTask {
    pub account_id: String,
    pub verification_task_id: UniversalUuid,
    pub worker_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub start_time: UniversalTimestamp,
    pub end_time: UniversalTimestamp,
    /// Earliest claim time. Defaults to now when unset.
    pub valid_after: Option<UniversalTimestamp>,
    /// Set when persisting a task that is already claimed (recovery and
    /// test scenarios); normal creation leaves this unset.
    pub last_picked_at: Option<UniversalTimestamp>,
    pub collection_info: serde_json::Value,
}

/// Raw row as stored in SQLite.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::collection_tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CollectionTaskRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub verification_task_id: Vec<u8>,
    pub worker_id: String,
    pub kind: String,
    pub status: String,
    pub start_time: String,
    pub end_time: String,
    pub valid_after: String,
    pub valid_until: String,
    pub last_picked_at: Option<String>,
    pub retry_count: i32,
    pub next_task_id: Option<Vec<u8>>,
    pub collection_info: String,
    pub exception: Option<String>,
    pub stacktrace: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::collection_tasks)]
pub struct NewCollectionTaskRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub verification_task_id: Vec<u8>,
    pub worker_id: String,
    pub kind: String,
    pub status: String,
    pub start_time: String,
    pub end_time: String,
    pub valid_after: String,
    pub valid_until: String,
    pub last_picked_at: Option<String>,
    pub retry_count: i32,
    pub next_task_id: Option<Vec<u8>>,
    pub collection_info: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<CollectionTaskRow> for CollectionTask {
    type Error = StoreError;

    fn try_from(row: CollectionTaskRow) -> Result<Self, Self::Error> {
        Ok(CollectionTask {
            id: UniversalUuid::from_blob(&row.id)
                .map_err(|e| StoreError::corrupt("collection_tasks.id", e))?,
            account_id: row.account_id,
            verification_task_id: UniversalUuid::from_blob(&row.verification_task_id)
                .map_err(|e| StoreError::corrupt("collection_tasks.verification_task_id", e))?,
            worker_id: row.worker_id,
            kind: row
                .kind
                .parse()
                .map_err(|e| StoreError::corrupt("collection_tasks.kind", e))?,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::corrupt("collection_tasks.status", e))?,
            start_time: UniversalTimestamp::from_stored(&row.start_time)
                .map_err(|e| StoreError::corrupt("collection_tasks.start_time", e))?,
            end_time: UniversalTimestamp::from_stored(&row.end_time)
                .map_err(|e| StoreError::corrupt("collection_tasks.end_time", e))?,
            valid_after: UniversalTimestamp::from_stored(&row.valid_after)
                .map_err(|e| StoreError::corrupt("collection_tasks.valid_after", e))?,
            valid_until: UniversalTimestamp::from_stored(&row.valid_until)
                .map_err(|e| StoreError::corrupt("collection_tasks.valid_until", e))?,
            last_picked_at: row
                .last_picked_at
                .as_deref()
                .map(UniversalTimestamp::from_stored)
                .transpose()
                .map_err(|e| StoreError::corrupt("collection_tasks.last_picked_at", e))?,
            retry_count: row.retry_count,
            next_task_id: row
                .next_task_id
                .as_deref()
                .map(UniversalUuid::from_blob)
                .transpose()
                .map_err(|e| StoreError::corrupt("collection_tasks.next_task_id", e))?,
            collection_info: serde_json::from_str(&row.collection_info)
                .map_err(|e| StoreError::corrupt("collection_tasks.collection_info", e))?,
            exception: row.exception,
            stacktrace: row.stacktrace,
            created_at: UniversalTimestamp::from_stored(&row.created_at)
                .map_err(|e| StoreError::corrupt("collection_tasks.created_at", e))?,
            updated_at: UniversalTimestamp::from_stored(&row.updated_at)
                .map_err(|e| StoreError::corrupt("collection_tasks.updated_at", e))?,
        })
    }
}
