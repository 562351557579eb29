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

//! Shared test fixtures.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use vigilance::config::CollectionConfig;
use vigilance::dal::DAL;
use vigilance::database::{Database, UniversalTimestamp, UniversalUuid};
use vigilance::models::collection_task::{NewCollectionTask, TaskKind, TaskStatus};

/// In-memory database with migrations applied.
pub async fn memory_database() -> Database {
    let db = Database::new(":memory:");
    db.run_migrations().await.expect("Failed to run migrations");
    db
}

/// File-backed database for tests that open multiple handles to the same
/// store (simulating independent worker processes). Keep the returned
/// `TempDir` alive for the duration of the test.
pub async fn file_database() -> (Database, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("collection.db");
    let db = Database::new(path.to_str().expect("non-utf8 temp path"));
    db.run_migrations().await.expect("Failed to run migrations");
    (db, dir)
}

/// Opens an additional handle onto a file-backed database.
pub async fn reopen_database(dir: &TempDir) -> Database {
    let path = dir.path().join("collection.db");
    let db = Database::new(path.to_str().expect("non-utf8 temp path"));
    db.run_migrations().await.expect("Failed to run migrations");
    db
}

pub const ACCOUNT_ID: &str = "test-account";
pub const WORKER_ID: &str = "test-worker";

/// Registers a service-guard verification task and returns its id.
pub async fn service_guard_verification_task(dal: &DAL) -> UniversalUuid {
    vigilance::registry::VerificationTaskRegistry::new(dal.clone())
        .create_live_monitoring_task(ACCOUNT_ID, UniversalUuid::new_v4())
        .await
        .expect("Failed to create verification task")
}

/// A collection task template over the window [now-7m, now-2m), matching
/// the shape a chained service-guard window would have.
pub fn new_task(
    verification_task_id: UniversalUuid,
    kind: TaskKind,
    status: TaskStatus,
) -> NewCollectionTask {
    let now = Utc::now();
    NewCollectionTask {
        account_id: ACCOUNT_ID.to_string(),
        verification_task_id,
        worker_id: WORKER_ID.to_string(),
        kind,
        status,
        start_time: UniversalTimestamp(now - Duration::minutes(7)),
        end_time: UniversalTimestamp(now - Duration::minutes(2)),
        valid_after: None,
        last_picked_at: if status == TaskStatus::Running {
            Some(UniversalTimestamp(now - Duration::minutes(10)))
        } else {
            None
        },
        collection_info: serde_json::json!({"type": "appDynamics"}),
    }
}

/// Default config used by most tests.
pub fn test_config() -> CollectionConfig {
    CollectionConfig::default()
}
