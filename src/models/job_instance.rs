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

//! Verification job instance and its append-only progress log.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::collection_task::TaskStatus;

/// Overall execution status of a verification job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "QUEUED",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(ExecutionStatus::Queued),
            "RUNNING" => Ok(ExecutionStatus::Running),
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "FAILED" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

/// Domain view of a verification job instance.
#[derive(Debug, Clone)]
pub struct JobInstance {
    pub id: UniversalUuid,
    pub account_id: String,
    pub execution_status: ExecutionStatus,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
}

/// One entry of a job instance's progress log.
///
/// Entries are immutable once written; `is_final_state` marks the entry
/// that decides the job's terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLogEntry {
    pub job_instance_id: UniversalUuid,
    pub execution_status: TaskStatus,
    pub verification_task_id: UniversalUuid,
    pub start_time: UniversalTimestamp,
    pub end_time: UniversalTimestamp,
    pub log: String,
    pub is_final_state: bool,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::job_instances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobInstanceRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub execution_status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::job_instances)]
pub struct NewJobInstanceRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub execution_status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::progress_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProgressLogRow {
    pub id: Vec<u8>,
    pub job_instance_id: Vec<u8>,
    pub execution_status: String,
    pub verification_task_id: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    pub log: String,
    pub is_final_state: i32,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::progress_logs)]
pub struct NewProgressLogRow {
    pub id: Vec<u8>,
    pub job_instance_id: Vec<u8>,
    pub execution_status: String,
    pub verification_task_id: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    pub log: String,
    pub is_final_state: i32,
    pub created_at: String,
}

impl TryFrom<JobInstanceRow> for JobInstance {
    type Error = StoreError;

    fn try_from(row: JobInstanceRow) -> Result<Self, Self::Error> {
        Ok(JobInstance {
            id: UniversalUuid::from_blob(&row.id)
                .map_err(|e| StoreError::corrupt("job_instances.id", e))?,
            account_id: row.account_id,
            execution_status: row
                .execution_status
                .parse()
                .map_err(|e| StoreError::corrupt("job_instances.execution_status", e))?,
            created_at: UniversalTimestamp::from_stored(&row.created_at)
                .map_err(|e| StoreError::corrupt("job_instances.created_at", e))?,
            updated_at: UniversalTimestamp::from_stored(&row.updated_at)
                .map_err(|e| StoreError::corrupt("job_instances.updated_at", e))?,
        })
    }
}

impl TryFrom<ProgressLogRow> for ProgressLogEntry {
    type Error = StoreError;

    fn try_from(row: ProgressLogRow) -> Result<Self, Self::Error> {
        Ok(ProgressLogEntry {
            job_instance_id: UniversalUuid::from_blob(&row.job_instance_id)
                .map_err(|e| StoreError::corrupt("progress_logs.job_instance_id", e))?,
            execution_status: row
                .execution_status
                .parse()
                .map_err(|e| StoreError::corrupt("progress_logs.execution_status", e))?,
            verification_task_id: UniversalUuid::from_blob(&row.verification_task_id)
                .map_err(|e| StoreError::corrupt("progress_logs.verification_task_id", e))?,
            start_time: UniversalTimestamp::from_stored(&row.start_time)
                .map_err(|e| StoreError::corrupt("progress_logs.start_time", e))?,
            end_time: UniversalTimestamp::from_stored(&row.end_time)
                .map_err(|e| StoreError::corrupt("progress_logs.end_time", e))?,
            log: row.log,
            is_final_state: row.is_final_state != 0,
        })
    }
}
