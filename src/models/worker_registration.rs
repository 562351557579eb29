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

//! Remote-worker ("perpetual task") registrations.
//!
//! One row per (account, worker). Tombstoning a registration stops new
//! windows from being chained for its tasks; it never touches in-flight
//! work.

use diesel::prelude::*;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::worker_registrations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WorkerRegistrationRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub worker_id: String,
    pub tombstoned: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::worker_registrations)]
pub struct NewWorkerRegistrationRow {
    pub id: Vec<u8>,
    pub account_id: String,
    pub worker_id: String,
    pub tombstoned: i32,
    pub created_at: String,
    pub updated_at: String,
}
