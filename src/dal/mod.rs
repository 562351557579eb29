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

//! Data Access Layer.
//!
//! The [`DAL`] struct hands out per-entity accessors; each accessor owns the
//! queries for one table family. All operations are async and run their
//! Diesel work on the pool's blocking thread via `interact`.
//!
//! Task claiming is the one operation with cross-process correctness
//! requirements: it runs inside an IMMEDIATE transaction so the
//! select-then-update is a single atomic find-and-modify at the store.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigilance::dal::DAL;
//! use vigilance::database::Database;
//!
//! let db = Database::new(":memory:");
//! db.run_migrations().await?;
//! let dal = DAL::new(db);
//! let task = dal.collection_task().get(task_id).await?;
//! ```

pub mod collection_task;
pub mod host_record;
pub mod job_instance;
pub mod time_series;
pub mod verification_task;
pub mod worker_registration;

pub use collection_task::{ClaimPolicy, CollectionTaskDAL};
pub use host_record::HostRecordDAL;
pub use job_instance::JobInstanceDAL;
pub use time_series::TimeSeriesDAL;
pub use verification_task::VerificationTaskDAL;
pub use worker_registration::WorkerRegistrationDAL;

use crate::database::Database;

/// Entry point to all database operations.
///
/// `DAL` is `Clone` and cheap to share; clones reference the same pool.
#[derive(Clone, Debug)]
pub struct DAL {
    pub database: Database,
}

impl DAL {
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Collection task operations.
    pub fn collection_task(&self) -> CollectionTaskDAL {
        CollectionTaskDAL::new(self)
    }

    /// Time-series bucket and value operations.
    pub fn time_series(&self) -> TimeSeriesDAL {
        TimeSeriesDAL::new(self)
    }

    /// Host record operations.
    pub fn host_record(&self) -> HostRecordDAL {
        HostRecordDAL::new(self)
    }

    /// Verification task registry operations.
    pub fn verification_task(&self) -> VerificationTaskDAL {
        VerificationTaskDAL::new(self)
    }

    /// Job instance and progress log operations.
    pub fn job_instance(&self) -> JobInstanceDAL {
        JobInstanceDAL::new(self)
    }

    /// Worker registration operations.
    pub fn worker_registration(&self) -> WorkerRegistrationDAL {
        WorkerRegistrationDAL::new(self)
    }
}
