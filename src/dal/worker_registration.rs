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

//! Worker registration storage.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::worker_registrations;
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::worker_registration::NewWorkerRegistrationRow;

/// Data access for remote-worker registrations.
#[derive(Clone)]
pub struct WorkerRegistrationDAL<'a> {
    dal: &'a DAL,
}

impl<'a> WorkerRegistrationDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Registers a worker if not already present.
    pub async fn register(&self, account_id: &str, worker_id: &str) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let row = NewWorkerRegistrationRow {
            id: UniversalUuid::new_v4().to_blob(),
            account_id: account_id.to_string(),
            worker_id: worker_id.to_string(),
            tombstoned: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        conn.interact(move |conn| {
            diesel::insert_into(worker_registrations::table)
                .values(&row)
                .on_conflict((
                    worker_registrations::account_id,
                    worker_registrations::worker_id,
                ))
                .do_nothing()
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Tombstones a registration, creating a tombstoned row if none
    /// exists. Idempotent.
    pub async fn tombstone(&self, account_id: &str, worker_id: &str) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let row = NewWorkerRegistrationRow {
            id: UniversalUuid::new_v4().to_blob(),
            account_id: account_id.to_string(),
            worker_id: worker_id.to_string(),
            tombstoned: 1,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        conn.interact(move |conn| {
            diesel::insert_into(worker_registrations::table)
                .values(&row)
                .on_conflict((
                    worker_registrations::account_id,
                    worker_registrations::worker_id,
                ))
                .do_update()
                .set((
                    worker_registrations::tombstoned.eq(1),
                    worker_registrations::updated_at.eq(&now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Whether the registration exists and has been tombstoned.
    pub async fn is_tombstoned(
        &self,
        account_id: &str,
        worker_id: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let account = account_id.to_string();
        let worker = worker_id.to_string();
        let tombstoned: Option<i32> = conn
            .interact(move |conn| {
                worker_registrations::table
                    .filter(worker_registrations::account_id.eq(account))
                    .filter(worker_registrations::worker_id.eq(worker))
                    .select(worker_registrations::tombstoned)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(tombstoned.unwrap_or(0) != 0)
    }
}
