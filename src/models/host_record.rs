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

//! Host records: the set of distinct hosts observed per collection range.

use diesel::prelude::*;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::host_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HostRecordRow {
    pub id: Vec<u8>,
    pub verification_task_id: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    pub host: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::host_records)]
pub struct NewHostRecordRow {
    pub id: Vec<u8>,
    pub verification_task_id: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    pub host: String,
    pub created_at: String,
}
