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

//! Wire contracts with the remote collection worker and the analysis engine.
//!
//! These types cross process boundaries and are (de)serialized with serde;
//! field names follow the JSON camelCase convention of the consumers.

use serde::{Deserialize, Serialize};

use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::models::collection_task::CollectionTask;
use crate::models::time_series::MetricType;

/// Task handed to a remote worker for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionTaskDTO {
    pub id: UniversalUuid,
    pub account_id: String,
    /// Opaque payload; the worker interprets it, the scheduler does not.
    pub collection_info: serde_json::Value,
    pub start_time: UniversalTimestamp,
    pub end_time: UniversalTimestamp,
}

impl From<&CollectionTask> for CollectionTaskDTO {
    fn from(task: &CollectionTask) -> Self {
        CollectionTaskDTO {
            id: task.id,
            account_id: task.account_id.clone(),
            collection_info: task.collection_info.clone(),
            start_time: task.start_time,
            end_time: task.end_time,
        }
    }
}

/// Outcome reported by a remote worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionOutcome {
    Success,
    Failed,
}

/// Result posted back by a remote worker after executing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionTaskResult {
    pub collection_task_id: UniversalUuid,
    pub status: CollectionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl CollectionTaskResult {
    pub fn success(collection_task_id: UniversalUuid) -> Self {
        CollectionTaskResult {
            collection_task_id,
            status: CollectionOutcome::Success,
            exception: None,
            stacktrace: None,
        }
    }

    pub fn failure(
        collection_task_id: UniversalUuid,
        exception: impl Into<String>,
        stacktrace: impl Into<String>,
    ) -> Self {
        CollectionTaskResult {
            collection_task_id,
            status: CollectionOutcome::Failed,
            exception: Some(exception.into()),
            stacktrace: Some(stacktrace.into()),
        }
    }
}

/// One per-minute sample record delivered by a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecordDTO {
    pub account_id: String,
    pub verification_task_id: UniversalUuid,
    pub timestamp: UniversalTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub metric_values: Vec<MetricValueDTO>,
}

/// Values of one metric at one sample timestamp, grouped by transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValueDTO {
    pub metric_name: String,
    pub metric_identifier: String,
    pub metric_type: MetricType,
    pub group_values: Vec<GroupValueDTO>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupValueDTO {
    pub group_name: String,
    pub value: f64,
}

/// Risk scores produced by the analysis engine for one analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummaryDTO {
    pub verification_task_id: UniversalUuid,
    pub analysis_start_time: UniversalTimestamp,
    pub analysis_end_time: UniversalTimestamp,
    pub metric_risks: Vec<MetricRiskDTO>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRiskDTO {
    pub metric_name: String,
    pub group_name: String,
    pub risk_score: f64,
}

/// Flattened time-series tuple returned to downstream analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesRecordDTO {
    pub verification_task_id: UniversalUuid,
    pub metric_name: String,
    pub metric_identifier: String,
    pub group_name: String,
    pub timestamp: UniversalTimestamp,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_value: Option<f64>,
}
