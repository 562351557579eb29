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

//! Verification job instance progress.
//!
//! Consumes collection-task outcomes to advance a job instance's ordered
//! progress log and derive its terminal state. Entries are immutable;
//! duplicate delivery of the same event appends nothing.

use tracing::{debug, info};

use crate::dal::DAL;
use crate::database::universal_types::UniversalUuid;
use crate::error::StoreError;
use crate::models::collection_task::TaskStatus;
use crate::models::job_instance::{ExecutionStatus, JobInstance, ProgressLogEntry};

/// Progress tracking service for verification job instances.
#[derive(Clone, Debug)]
pub struct JobInstanceProgress {
    dal: DAL,
}

impl JobInstanceProgress {
    pub fn new(dal: DAL) -> Self {
        Self { dal }
    }

    /// Creates a QUEUED job instance.
    pub async fn create(&self, account_id: &str) -> Result<JobInstance, StoreError> {
        self.dal.job_instance().create(account_id).await
    }

    /// Appends a progress entry and derives the job state from it.
    ///
    /// A final FAILED entry fails the job (a verification run cannot
    /// proceed on partial data); a final SUCCESS entry completes it.
    /// Non-final entries only extend the log.
    pub async fn log_progress(&self, entry: ProgressLogEntry) -> Result<(), StoreError> {
        let appended = self.dal.job_instance().append_progress(&entry).await?;
        if !appended {
            debug!(job_instance_id = %entry.job_instance_id,
                "Duplicate progress entry ignored");
            return Ok(());
        }

        if entry.is_final_state {
            let terminal = match entry.execution_status {
                TaskStatus::Failed => Some(ExecutionStatus::Failed),
                TaskStatus::Success => Some(ExecutionStatus::Success),
                _ => None,
            };
            if let Some(status) = terminal {
                self.dal
                    .job_instance()
                    .set_execution_status(entry.job_instance_id, status)
                    .await?;
                info!(job_instance_id = %entry.job_instance_id, status = %status,
                    "Job instance reached terminal state");
            }
        }
        Ok(())
    }

    /// Retrieves a job instance.
    pub async fn get(&self, id: UniversalUuid) -> Result<Option<JobInstance>, StoreError> {
        self.dal.job_instance().get(id).await
    }

    /// Progress entries in append order.
    pub async fn progress_logs(
        &self,
        job_instance_id: UniversalUuid,
    ) -> Result<Vec<ProgressLogEntry>, StoreError> {
        self.dal.job_instance().progress_logs(job_instance_id).await
    }
}
