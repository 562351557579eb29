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

//! # Vigilance
//!
//! A library for resilient continuous-verification data collection and
//! aggregation: a pull-model scheduler that hands time-windowed collection
//! tasks to remote workers, and an aggregation engine that merges the
//! collected samples into fixed analysis windows for downstream risk
//! scoring.
//!
//! # Architecture
//!
//! - [`registry`]: maps opaque verification-task ids to the monitored
//!   entity (config + optional deployment run).
//! - [`scheduler`]: the task queue and state machine: creation, atomic
//!   claiming, retrying, window chaining, and status-driven side effects.
//! - [`aggregator`]: buckets per-minute samples into analysis windows with
//!   idempotent keyed upserts, and enriches them with risk scores.
//! - [`progress`]: consumes collection outcomes to advance a verification
//!   run's progress log and terminal state.
//! - [`dal`] / [`database`]: Diesel-over-SQLite persistence. Claiming uses
//!   IMMEDIATE transactions, so at-most-one-worker-per-task holds across
//!   independent worker processes sharing the database.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigilance::config::CollectionConfig;
//! use vigilance::dal::DAL;
//! use vigilance::database::Database;
//! use vigilance::scheduler::CollectionTaskScheduler;
//!
//! let db = Database::new("collection.db");
//! db.run_migrations().await?;
//! let scheduler = CollectionTaskScheduler::new(DAL::new(db), CollectionConfig::default());
//!
//! // A remote worker polls for work...
//! if let Some(task) = scheduler.get_next_task_dto("account", "worker").await? {
//!     // ...executes the collection externally, then reports back.
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod dal;
pub mod database;
pub mod dto;
pub mod error;
pub mod mapper;
pub mod models;
pub mod progress;
pub mod registry;
pub mod scheduler;

pub use aggregator::TimeSeriesAggregator;
pub use config::CollectionConfig;
pub use dal::DAL;
pub use database::Database;
pub use error::{SchedulerError, StoreError};
pub use progress::JobInstanceProgress;
pub use registry::VerificationTaskRegistry;
pub use scheduler::CollectionTaskScheduler;
