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

//! Configuration for the collection scheduler and aggregator.
//!
//! All policy knobs live here, including the per-kind retry bounds. Retry
//! bounds are plain configuration values, never shared mutable state.
//!
//! # Construction
//!
//! ```rust,ignore
//! let config = CollectionConfig::builder()
//!     .analysis_window(Duration::minutes(5))
//!     .max_retry_deployment(2)
//!     .build();
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::collection_task::TaskKind;

/// Floors a timestamp to the start of its analysis window.
pub fn floor_to_window(ts: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let window_ms = window.num_milliseconds().max(1);
    let ms = ts.timestamp_millis();
    let floored = ms - ms.rem_euclid(window_ms);
    Utc.timestamp_millis_opt(floored).single().unwrap_or(ts)
}

/// Configuration parameters controlling collection scheduling and
/// aggregation windows.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CollectionConfig {
    analysis_window: Duration,
    data_collection_delay: Duration,
    stale_running_threshold: Duration,
    window_restart_threshold: Duration,
    task_ttl: Duration,
    retry_backoff_base: Duration,
    retry_backoff_cap: Duration,
    max_retry_service_guard: i32,
    max_retry_deployment: i32,
    max_parallel_collections: usize,
}

impl CollectionConfig {
    pub fn builder() -> CollectionConfigBuilder {
        CollectionConfigBuilder::default()
    }

    /// Fixed analysis window size; samples are bucketed and collection
    /// windows are sized by this.
    pub fn analysis_window(&self) -> Duration {
        self.analysis_window
    }

    /// Buffer between a window's end and its earliest claim time, giving
    /// the remote source time to ingest data for the window.
    pub fn data_collection_delay(&self) -> Duration {
        self.data_collection_delay
    }

    /// Age of `last_picked_at` after which a RUNNING task is considered
    /// abandoned by its worker and becomes reclaimable.
    pub fn stale_running_threshold(&self) -> Duration {
        self.stale_running_threshold
    }

    /// Age of a window past which the scheduler stops chasing it and snaps
    /// the next window to the present (bounds the backlog after an outage).
    pub fn window_restart_threshold(&self) -> Duration {
        self.window_restart_threshold
    }

    /// Retention bound stamped on every task as `valid_until`.
    pub fn task_ttl(&self) -> Duration {
        self.task_ttl
    }

    /// Maximum retry count for the given task kind.
    pub fn max_retry_count(&self, kind: TaskKind) -> i32 {
        match kind {
            TaskKind::ServiceGuard => self.max_retry_service_guard,
            TaskKind::Deployment => self.max_retry_deployment,
        }
    }

    /// Maximum number of tasks handed out by one batch poll.
    pub fn max_parallel_collections(&self) -> usize {
        self.max_parallel_collections
    }

    /// Upper bound of the retry backoff schedule.
    pub fn retry_backoff_cap(&self) -> Duration {
        self.retry_backoff_cap
    }

    /// Retry delay for the given attempt: doubling from the base, capped.
    pub fn retry_backoff(&self, retry_count: i32) -> Duration {
        let exp = retry_count.clamp(0, 16) as u32;
        let delay = self
            .retry_backoff_base
            .checked_mul(2_i32.saturating_pow(exp))
            .unwrap_or(self.retry_backoff_cap);
        delay.min(self.retry_backoff_cap)
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfigBuilder::default().build()
    }
}

/// Builder for [`CollectionConfig`].
#[derive(Debug, Clone)]
pub struct CollectionConfigBuilder {
    analysis_window: Duration,
    data_collection_delay: Duration,
    stale_running_threshold: Duration,
    window_restart_threshold: Duration,
    task_ttl: Duration,
    retry_backoff_base: Duration,
    retry_backoff_cap: Duration,
    max_retry_service_guard: i32,
    max_retry_deployment: i32,
    max_parallel_collections: usize,
}

impl Default for CollectionConfigBuilder {
    fn default() -> Self {
        Self {
            analysis_window: Duration::minutes(5),
            data_collection_delay: Duration::minutes(2),
            stale_running_threshold: Duration::minutes(5),
            window_restart_threshold: Duration::hours(2),
            task_ttl: Duration::days(30),
            retry_backoff_base: Duration::seconds(5),
            retry_backoff_cap: Duration::minutes(5),
            max_retry_service_guard: 10,
            max_retry_deployment: 2,
            max_parallel_collections: 10,
        }
    }
}

impl CollectionConfigBuilder {
    pub fn analysis_window(mut self, window: Duration) -> Self {
        self.analysis_window = window;
        self
    }

    pub fn data_collection_delay(mut self, delay: Duration) -> Self {
        self.data_collection_delay = delay;
        self
    }

    pub fn stale_running_threshold(mut self, threshold: Duration) -> Self {
        self.stale_running_threshold = threshold;
        self
    }

    pub fn window_restart_threshold(mut self, threshold: Duration) -> Self {
        self.window_restart_threshold = threshold;
        self
    }

    pub fn task_ttl(mut self, ttl: Duration) -> Self {
        self.task_ttl = ttl;
        self
    }

    pub fn retry_backoff_base(mut self, base: Duration) -> Self {
        self.retry_backoff_base = base;
        self
    }

    pub fn retry_backoff_cap(mut self, cap: Duration) -> Self {
        self.retry_backoff_cap = cap;
        self
    }

    pub fn max_retry_service_guard(mut self, count: i32) -> Self {
        self.max_retry_service_guard = count;
        self
    }

    pub fn max_retry_deployment(mut self, count: i32) -> Self {
        self.max_retry_deployment = count;
        self
    }

    pub fn max_parallel_collections(mut self, count: usize) -> Self {
        self.max_parallel_collections = count;
        self
    }

    pub fn build(self) -> CollectionConfig {
        CollectionConfig {
            analysis_window: self.analysis_window,
            data_collection_delay: self.data_collection_delay,
            stale_running_threshold: self.stale_running_threshold,
            window_restart_threshold: self.window_restart_threshold,
            task_ttl: self.task_ttl,
            retry_backoff_base: self.retry_backoff_base,
            retry_backoff_cap: self.retry_backoff_cap,
            max_retry_service_guard: self.max_retry_service_guard,
            max_retry_deployment: self.max_retry_deployment,
            max_parallel_collections: self.max_parallel_collections,
        }
    }
}
