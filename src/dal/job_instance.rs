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

//! Job instance and progress log storage.
//!
//! Progress entries are append-only and content-unique: re-delivering the
//! same progress event inserts nothing, so duplicate worker callbacks
//! cannot inflate the log.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::{job_instances, progress_logs};
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::job_instance::{
    ExecutionStatus, JobInstance, JobInstanceRow, NewJobInstanceRow, NewProgressLogRow,
    ProgressLogEntry, ProgressLogRow,
};

/// Data access for job instances and their progress logs.
#[derive(Clone)]
pub struct JobInstanceDAL<'a> {
    dal: &'a DAL,
}

impl<'a> JobInstanceDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Creates a QUEUED job instance.
    pub async fn create(&self, account_id: &str) -> Result<JobInstance, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let row = NewJobInstanceRow {
            id: UniversalUuid::new_v4().to_blob(),
            account_id: account_id.to_string(),
            execution_status: ExecutionStatus::Queued.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        let stored: JobInstanceRow = conn
            .interact(move |conn| {
                diesel::insert_into(job_instances::table)
                    .values(&row)
                    .execute(conn)?;
                job_instances::table.find(row.id.clone()).first(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        stored.try_into()
    }

    /// Retrieves a job instance by id.
    pub async fn get(&self, id: UniversalUuid) -> Result<Option<JobInstance>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let row: Option<JobInstanceRow> = conn
            .interact(move |conn| job_instances::table.find(id_blob).first(conn).optional())
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        row.map(TryInto::try_into).transpose()
    }

    /// Sets the overall execution status.
    pub async fn set_execution_status(
        &self,
        id: UniversalUuid,
        status: ExecutionStatus,
    ) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let now = UniversalTimestamp::now().to_stored();
        conn.interact(move |conn| {
            diesel::update(job_instances::table.find(id_blob))
                .set((
                    job_instances::execution_status.eq(status.as_str()),
                    job_instances::updated_at.eq(now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Appends a progress entry; duplicate content is ignored. Returns
    /// whether a new entry was written.
    pub async fn append_progress(&self, entry: &ProgressLogEntry) -> Result<bool, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let row = NewProgressLogRow {
            id: UniversalUuid::new_v4().to_blob(),
            job_instance_id: entry.job_instance_id.to_blob(),
            execution_status: entry.execution_status.as_str().to_string(),
            verification_task_id: entry.verification_task_id.to_blob(),
            start_time: entry.start_time.to_stored(),
            end_time: entry.end_time.to_stored(),
            log: entry.log.clone(),
            is_final_state: entry.is_final_state as i32,
            created_at: now,
        };
        let inserted = conn
            .interact(move |conn| {
                diesel::insert_into(progress_logs::table)
                    .values(&row)
                    .on_conflict((
                        progress_logs::job_instance_id,
                        progress_logs::verification_task_id,
                        progress_logs::execution_status,
                        progress_logs::start_time,
                        progress_logs::end_time,
                        progress_logs::is_final_state,
                    ))
                    .do_nothing()
                    .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(inserted > 0)
    }

    /// Progress entries for a job instance, in append order.
    pub async fn progress_logs(
        &self,
        job_instance_id: UniversalUuid,
    ) -> Result<Vec<ProgressLogEntry>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = job_instance_id.to_blob();
        let rows: Vec<ProgressLogRow> = conn
            .interact(move |conn| {
                progress_logs::table
                    .filter(progress_logs::job_instance_id.eq(id_blob))
                    .order(progress_logs::created_at.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
