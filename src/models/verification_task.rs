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

//! Verification task registry model.
//!
//! A verification task binds a monitoring-source config to either continuous
//! (service-guard) monitoring or one deployment verification run. Its id is
//! the scoping key for all collection and aggregation queries.

use diesel::prelude::*;

use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::collection_task::TaskKind;

/// Domain view of a verification task registry entry.
#[derive(Debug, Clone)]
pub struct VerificationTask {
    pub id: UniversalUuid,
    pub account_id: String,
    pub cv_config_id: UniversalUuid,
    /// Present only for deployment-kind tasks.
    pub job_instance_id: Option<UniversalUuid>,
    pub kind: TaskKind,
    pub created_at: UniversalTimestamp,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::verification_tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VerificationTaskRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub cv_config_id: Vec<u8>,
    pub job_instance_id: Option<Vec<u8>>,
    pub kind: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::verification_tasks)]
pub struct NewVerificationTaskRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub cv_config_id: Vec<u8>,
    pub job_instance_id: Option<Vec<u8>>,
    pub kind: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<VerificationTaskRow> for VerificationTask {
    type Error = StoreError;

    fn try_from(row: VerificationTaskRow) -> Result<Self, Self::Error> {
        Ok(VerificationTask {
            id: UniversalUuid::from_blob(&row.id)
                .map_err(|e| StoreError::corrupt("verification_tasks.id", e))?,
            account_id: row.account_id,
            cv_config_id: UniversalUuid::from_blob(&row.cv_config_id)
                .map_err(|e| StoreError::corrupt("verification_tasks.cv_config_id", e))?,
            job_instance_id: row
                .job_instance_id
                .as_deref()
                .map(UniversalUuid::from_blob)
                .transpose()
                .map_err(|e| StoreError::corrupt("verification_tasks.job_instance_id", e))?,
            kind: row
                .kind
                .parse()
                .map_err(|e| StoreError::corrupt("verification_tasks.kind", e))?,
            created_at: UniversalTimestamp::from_stored(&row.created_at)
                .map_err(|e| StoreError::corrupt("verification_tasks.created_at", e))?,
        })
    }
}
