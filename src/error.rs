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

//! Error taxonomy.
//!
//! [`StoreError`] covers the DAL boundary; [`SchedulerError`] wraps it for
//! the scheduler service, which adds the consistency violations that the
//! task state machine can raise.

use thiserror::Error;

use crate::database::universal_types::UniversalUuid;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failure checking out or using a pooled connection.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    /// Underlying Diesel error.
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// A stored row could not be decoded into its domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Missing or invalid configuration (e.g. `DATABASE_URL`).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    pub(crate) fn corrupt(context: &str, detail: impl std::fmt::Display) -> Self {
        StoreError::Corrupt(format!("{}: {}", context, detail))
    }
}

/// Errors raised by the collection task scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The referenced collection task does not exist.
    #[error("Collection task not found: {0}")]
    TaskNotFound(UniversalUuid),

    /// A result was posted for a task that already holds a different
    /// terminal outcome. Terminal results are never overwritten.
    #[error("Conflicting result for task {task_id}: already {existing}, got {incoming}")]
    ConflictingResult {
        task_id: UniversalUuid,
        existing: String,
        incoming: String,
    },

    /// The task result or payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The collection payload could not be built for the config.
    #[error(transparent)]
    Mapper(#[from] crate::mapper::MapperError),
}
