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

//! Persisted entity models and their domain enums.

pub mod collection_task;
pub mod host_record;
pub mod job_instance;
pub mod time_series;
pub mod verification_task;
pub mod worker_registration;

pub use collection_task::{CollectionTask, NewCollectionTask, TaskKind, TaskStatus};
pub use job_instance::{ExecutionStatus, JobInstance, ProgressLogEntry};
pub use time_series::{MetricType, TimeSeriesBucket, TimeSeriesValue};
pub use verification_task::VerificationTask;
