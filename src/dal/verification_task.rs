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

//! Verification task registry storage.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::verification_tasks;
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::collection_task::TaskKind;
use crate::models::verification_task::{
    NewVerificationTaskRow, VerificationTask, VerificationTaskRow,
};

/// Data access for verification task registry entries.
#[derive(Clone)]
pub struct VerificationTaskDAL<'a> {
    dal: &'a DAL,
}

impl<'a> VerificationTaskDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a registry entry.
    pub async fn create(
        &self,
        account_id: &str,
        cv_config_id: UniversalUuid,
        job_instance_id: Option<UniversalUuid>,
        kind: TaskKind,
    ) -> Result<VerificationTask, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let row = NewVerificationTaskRow {
            id: UniversalUuid::new_v4().to_blob(),
            account_id: account_id.to_string(),
            cv_config_id: cv_config_id.to_blob(),
            job_instance_id: job_instance_id.map(|i| i.to_blob()),
            kind: kind.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        let stored: VerificationTaskRow = conn
            .interact(move |conn| {
                diesel::insert_into(verification_tasks::table)
                    .values(&row)
                    .execute(conn)?;
                verification_tasks::table.find(row.id.clone()).first(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        stored.try_into()
    }

    /// Retrieves a registry entry by id.
    pub async fn get(&self, id: UniversalUuid) -> Result<Option<VerificationTask>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let id_blob = id.to_blob();
        let row: Option<VerificationTaskRow> = conn
            .interact(move |conn| {
                verification_tasks::table
                    .find(id_blob)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        row.map(TryInto::try_into).transpose()
    }

    /// Finds the live-monitoring entry for a config, if one exists.
    pub async fn find_live_monitoring(
        &self,
        account_id: &str,
        cv_config_id: UniversalUuid,
    ) -> Result<Option<VerificationTask>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let account = account_id.to_string();
        let config_blob = cv_config_id.to_blob();
        let row: Option<VerificationTaskRow> = conn
            .interact(move |conn| {
                verification_tasks::table
                    .filter(verification_tasks::account_id.eq(account))
                    .filter(verification_tasks::cv_config_id.eq(config_blob))
                    .filter(verification_tasks::kind.eq(TaskKind::ServiceGuard.as_str()))
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        row.map(TryInto::try_into).transpose()
    }
}
