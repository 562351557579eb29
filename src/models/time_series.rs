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

//! Time-series bucket and value models.
//!
//! A bucket is keyed by (verification task, metric name, metric identifier,
//! bucket start), where the bucket start is the sample timestamp floored to
//! the analysis window. Values inside a bucket are unique by
//! (group name, timestamp); re-inserting an existing tuple is a no-op.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;

/// Classification of a metric, taken from the metric-pack definition.
///
/// Only `Error` metrics get a derived percent value; the others store raw
/// values alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    Infra,
    RespTime,
    Throughput,
    Error,
    Apdex,
    Other,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Infra => "INFRA",
            MetricType::RespTime => "RESP_TIME",
            MetricType::Throughput => "THROUGHPUT",
            MetricType::Error => "ERROR",
            MetricType::Apdex => "APDEX",
            MetricType::Other => "OTHER",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFRA" => Ok(MetricType::Infra),
            "RESP_TIME" => Ok(MetricType::RespTime),
            "THROUGHPUT" => Ok(MetricType::Throughput),
            "ERROR" => Ok(MetricType::Error),
            "APDEX" => Ok(MetricType::Apdex),
            "OTHER" => Ok(MetricType::Other),
            other => Err(format!("unknown metric type '{}'", other)),
        }
    }
}

/// Domain view of a bucket.
#[derive(Debug, Clone)]
pub struct TimeSeriesBucket {
    pub id: UniversalUuid,
    pub verification_task_id: UniversalUuid,
    pub metric_name: String,
    pub metric_identifier: String,
    pub metric_type: MetricType,
    pub bucket_start: UniversalTimestamp,
}

/// Domain view of one (group, timestamp) tuple inside a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesValue {
    pub group_name: String,
    pub timestamp: UniversalTimestamp,
    pub value: f64,
    pub risk_score: Option<f64>,
    pub percent_value: Option<f64>,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::time_series_buckets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TimeSeriesBucketRow {
    pub id: Vec<u8>,
    pub verification_task_id: Vec<u8>,
    pub metric_name: String,
    pub metric_identifier: String,
    pub metric_type: String,
    pub bucket_start: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::time_series_buckets)]
pub struct NewTimeSeriesBucketRow {
    pub id: Vec<u8>,
    pub verification_task_id: Vec<u8>,
    pub metric_name: String,
    pub metric_identifier: String,
    pub metric_type: String,
    pub bucket_start: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = crate::database::schema::time_series_values)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TimeSeriesValueRow {
    pub id: Vec<u8>,
    pub bucket_id: Vec<u8>,
    pub group_name: String,
    pub timestamp: String,
    pub value: f64,
    pub risk_score: Option<f64>,
    pub percent_value: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::time_series_values)]
pub struct NewTimeSeriesValueRow {
    pub id: Vec<u8>,
    pub bucket_id: Vec<u8>,
    pub group_name: String,
    pub timestamp: String,
    pub value: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TimeSeriesBucketRow> for TimeSeriesBucket {
    type Error = StoreError;

    fn try_from(row: TimeSeriesBucketRow) -> Result<Self, Self::Error> {
        Ok(TimeSeriesBucket {
            id: UniversalUuid::from_blob(&row.id)
                .map_err(|e| StoreError::corrupt("time_series_buckets.id", e))?,
            verification_task_id: UniversalUuid::from_blob(&row.verification_task_id)
                .map_err(|e| StoreError::corrupt("time_series_buckets.verification_task_id", e))?,
            metric_name: row.metric_name,
            metric_identifier: row.metric_identifier,
            metric_type: row
                .metric_type
                .parse()
                .map_err(|e| StoreError::corrupt("time_series_buckets.metric_type", e))?,
            bucket_start: UniversalTimestamp::from_stored(&row.bucket_start)
                .map_err(|e| StoreError::corrupt("time_series_buckets.bucket_start", e))?,
        })
    }
}

impl TryFrom<TimeSeriesValueRow> for TimeSeriesValue {
    type Error = StoreError;

    fn try_from(row: TimeSeriesValueRow) -> Result<Self, Self::Error> {
        Ok(TimeSeriesValue {
            group_name: row.group_name,
            timestamp: UniversalTimestamp::from_stored(&row.timestamp)
                .map_err(|e| StoreError::corrupt("time_series_values.timestamp", e))?,
            value: row.value,
            risk_score: row.risk_score,
            percent_value: row.percent_value,
        })
    }
}
