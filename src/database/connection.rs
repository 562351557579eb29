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

//! Database connection management over an async SQLite pool.
//!
//! Uses `deadpool-diesel` for pooling. All DAL operations go through
//! [`Database::get_connection`] and run their Diesel work inside an
//! `interact` closure on the pool's blocking thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigilance::database::Database;
//!
//! let db = Database::new("path/to/collection.db");
//! db.run_migrations().await?;
//! ```

use deadpool_diesel::sqlite::{Manager as SqliteManager, Pool as SqlitePool, Runtime};
use tracing::info;

use crate::error::StoreError;

/// Thread-safe handle to the SQLite connection pool.
///
/// Cloning is cheap; all clones share the same pool. Concurrent claim
/// correctness does not depend on this process's pool: claims run in
/// IMMEDIATE transactions, so independent processes sharing the database
/// file serialize at the store itself.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a new database handle for the given connection string.
    ///
    /// Accepts a file path, `:memory:`, or a `sqlite://`-prefixed URL.
    /// The connection string can also come from `DATABASE_URL` via
    /// [`Database::from_env`].
    pub fn new(connection_string: &str) -> Self {
        let connection_url = Self::build_sqlite_url(connection_string);
        let manager = SqliteManager::new(connection_url, Runtime::Tokio1);
        // SQLite has limited concurrent write support even with WAL mode.
        // A single pooled connection avoids "database is locked" errors
        // from within one process; cross-process writers are serialized by
        // busy_timeout.
        let pool = SqlitePool::builder(manager)
            .max_size(1)
            .build()
            .expect("Failed to create SQLite connection pool");

        info!("SQLite connection pool initialized (size: 1)");

        Self { pool }
    }

    /// Creates a database handle from the `DATABASE_URL` environment
    /// variable, loading `.env` if present.
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::Configuration("DATABASE_URL is not set".to_string()))?;
        Ok(Self::new(&url))
    }

    fn build_sqlite_url(connection_string: &str) -> String {
        match connection_string.strip_prefix("sqlite://") {
            Some(path) => path.to_string(),
            None => connection_string.to_string(),
        }
    }

    /// Checks out a pooled connection.
    pub async fn get_connection(
        &self,
    ) -> Result<deadpool::managed::Object<SqliteManager>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))
    }

    /// Runs pending migrations and sets the concurrency pragmas.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.get_connection().await?;
        conn.interact(|conn| {
            use diesel::prelude::*;
            use diesel_migrations::MigrationHarness;

            // WAL allows concurrent reads during writes; busy_timeout makes
            // writers wait instead of failing immediately on a locked file.
            diesel::sql_query("PRAGMA journal_mode=WAL;")
                .execute(conn)
                .map_err(|e| StoreError::Migration(e.to_string()))?;
            diesel::sql_query("PRAGMA busy_timeout=30000;")
                .execute(conn)
                .map_err(|e| StoreError::Migration(e.to_string()))?;

            conn.run_pending_migrations(crate::database::MIGRATIONS)
                .map_err(|e| StoreError::Migration(e.to_string()))?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        info!("Database migrations up to date");
        Ok(())
    }
}
