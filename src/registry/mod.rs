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

//! Verification task registry.
//!
//! Maps an opaque verification-task id to the monitored entity: a config
//! for continuous monitoring, a (config, job instance) pair for deployment
//! verification. Pure lookup and creation; no scheduling logic.

use tracing::debug;

use crate::dal::DAL;
use crate::database::universal_types::UniversalUuid;
use crate::error::StoreError;
use crate::models::collection_task::TaskKind;
use crate::models::verification_task::VerificationTask;

/// Registry service for verification tasks.
#[derive(Clone, Debug)]
pub struct VerificationTaskRegistry {
    dal: DAL,
}

impl VerificationTaskRegistry {
    pub fn new(dal: DAL) -> Self {
        Self { dal }
    }

    /// Returns the live-monitoring verification task id for a config,
    /// creating the registry entry on first use.
    pub async fn create_live_monitoring_task(
        &self,
        account_id: &str,
        cv_config_id: UniversalUuid,
    ) -> Result<UniversalUuid, StoreError> {
        if let Some(existing) = self
            .dal
            .verification_task()
            .find_live_monitoring(account_id, cv_config_id)
            .await?
        {
            return Ok(existing.id);
        }
        let created = self
            .dal
            .verification_task()
            .create(account_id, cv_config_id, None, TaskKind::ServiceGuard)
            .await?;
        debug!(verification_task_id = %created.id, cv_config_id = %cv_config_id,
            "Created live-monitoring verification task");
        Ok(created.id)
    }

    /// Creates a fresh deployment verification task bound to a job
    /// instance.
    pub async fn create_deployment_task(
        &self,
        account_id: &str,
        cv_config_id: UniversalUuid,
        job_instance_id: UniversalUuid,
    ) -> Result<UniversalUuid, StoreError> {
        let created = self
            .dal
            .verification_task()
            .create(
                account_id,
                cv_config_id,
                Some(job_instance_id),
                TaskKind::Deployment,
            )
            .await?;
        debug!(verification_task_id = %created.id, job_instance_id = %job_instance_id,
            "Created deployment verification task");
        Ok(created.id)
    }

    /// Looks up a registry entry.
    pub async fn get(
        &self,
        verification_task_id: UniversalUuid,
    ) -> Result<Option<VerificationTask>, StoreError> {
        self.dal.verification_task().get(verification_task_id).await
    }

    /// The owning job instance, when the entry is deployment-kind.
    pub async fn maybe_get_job_instance_id(
        &self,
        verification_task_id: UniversalUuid,
    ) -> Result<Option<UniversalUuid>, StoreError> {
        Ok(self
            .get(verification_task_id)
            .await?
            .and_then(|task| task.job_instance_id))
    }
}
