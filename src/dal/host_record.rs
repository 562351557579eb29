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

//! Host record storage: distinct hosts observed per collection range.

use diesel::prelude::*;
use std::collections::BTreeSet;

use super::DAL;
use crate::database::schema::host_records;
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::host_record::NewHostRecordRow;

/// Data access for host records.
#[derive(Clone)]
pub struct HostRecordDAL<'a> {
    dal: &'a DAL,
}

impl<'a> HostRecordDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Records hosts observed for a collection range. Re-recording a host
    /// already known for the range is a no-op.
    pub async fn record_hosts(
        &self,
        verification_task_id: UniversalUuid,
        start_time: UniversalTimestamp,
        end_time: UniversalTimestamp,
        hosts: Vec<String>,
    ) -> Result<(), StoreError> {
        if hosts.is_empty() {
            return Ok(());
        }
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let rows: Vec<NewHostRecordRow> = hosts
            .into_iter()
            .map(|host| NewHostRecordRow {
                id: UniversalUuid::new_v4().to_blob(),
                verification_task_id: verification_task_id.to_blob(),
                start_time: start_time.to_stored(),
                end_time: end_time.to_stored(),
                host,
                created_at: now.clone(),
            })
            .collect();
        conn.interact(move |conn| {
            for row in &rows {
                diesel::insert_into(host_records::table)
                    .values(row)
                    .on_conflict((
                        host_records::verification_task_id,
                        host_records::start_time,
                        host_records::end_time,
                        host_records::host,
                    ))
                    .do_nothing()
                    .execute(conn)?;
            }
            Ok::<_, diesel::result::Error>(())
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Distinct hosts whose recorded range overlaps `[start, end)`.
    pub async fn hosts_in_range(
        &self,
        verification_task_id: UniversalUuid,
        start: UniversalTimestamp,
        end: UniversalTimestamp,
    ) -> Result<BTreeSet<String>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let vtid_blob = verification_task_id.to_blob();
        let start = start.to_stored();
        let end = end.to_stored();
        let hosts: Vec<String> = conn
            .interact(move |conn| {
                host_records::table
                    .filter(host_records::verification_task_id.eq(vtid_blob))
                    .filter(host_records::start_time.lt(end))
                    .filter(host_records::end_time.gt(start))
                    .select(host_records::host)
                    .distinct()
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(hosts.into_iter().collect())
    }
}
