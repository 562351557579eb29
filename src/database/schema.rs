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

//! Diesel table definitions, kept in sync with `migrations/`.

diesel::table! {
    verification_tasks (id) {
        id -> Binary,
        account_id -> Text,
        cv_config_id -> Binary,
        job_instance_id -> Nullable<Binary>,
        kind -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    collection_tasks (id) {
        id -> Binary,
        account_id -> Text,
        verification_task_id -> Binary,
        worker_id -> Text,
        kind -> Text,
        status -> Text,
        start_time -> Text,
        end_time -> Text,
        valid_after -> Text,
        valid_until -> Text,
        last_picked_at -> Nullable<Text>,
        retry_count -> Integer,
        next_task_id -> Nullable<Binary>,
        collection_info -> Text,
        exception -> Nullable<Text>,
        stacktrace -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    time_series_buckets (id) {
        id -> Binary,
        verification_task_id -> Binary,
        metric_name -> Text,
        metric_identifier -> Text,
        metric_type -> Text,
        bucket_start -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    time_series_values (id) {
        id -> Binary,
        bucket_id -> Binary,
        group_name -> Text,
        timestamp -> Text,
        value -> Double,
        risk_score -> Nullable<Double>,
        percent_value -> Nullable<Double>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    host_records (id) {
        id -> Binary,
        verification_task_id -> Binary,
        start_time -> Text,
        end_time -> Text,
        host -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    job_instances (id) {
        id -> Binary,
        account_id -> Text,
        execution_status -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    progress_logs (id) {
        id -> Binary,
        job_instance_id -> Binary,
        execution_status -> Text,
        verification_task_id -> Binary,
        start_time -> Text,
        end_time -> Text,
        log -> Text,
        is_final_state -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    worker_registrations (id) {
        id -> Binary,
        account_id -> Text,
        worker_id -> Text,
        tombstoned -> Integer,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::joinable!(time_series_values -> time_series_buckets (bucket_id));
diesel::joinable!(progress_logs -> job_instances (job_instance_id));

diesel::allow_tables_to_appear_in_same_query!(
    verification_tasks,
    collection_tasks,
    time_series_buckets,
    time_series_values,
    host_records,
    job_instances,
    progress_logs,
    worker_registrations,
);
