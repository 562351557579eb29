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

//! Time-series aggregation.
//!
//! Converts raw per-minute sample batches into fixed-size analysis buckets.
//! Saving is idempotent: every tuple lands on a unique
//! (bucket, group, timestamp) key, so re-delivery of a batch reproduces the
//! stored state exactly. A batch may straddle several buckets; each bucket
//! is upserted independently.
//!
//! Risk scores arrive out-of-band from the analysis engine and are written
//! in place onto existing tuples; enrichment never creates buckets.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

use crate::config::{floor_to_window, CollectionConfig};
use crate::dal::DAL;
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::dto::{RiskSummaryDTO, SampleRecordDTO, TimeSeriesRecordDTO};
use crate::error::StoreError;
use crate::models::time_series::MetricType;

/// Pivot of raw values: outer key then inner key to the ordered value
/// list over the queried range.
pub type NestedMetricData = BTreeMap<String, BTreeMap<String, Vec<f64>>>;

/// Aggregation service for time-series sample batches.
#[derive(Clone, Debug)]
pub struct TimeSeriesAggregator {
    dal: DAL,
    config: CollectionConfig,
}

impl TimeSeriesAggregator {
    pub fn new(dal: DAL, config: CollectionConfig) -> Self {
        Self { dal, config }
    }

    /// Persists a batch of sample records into their analysis buckets.
    ///
    /// Safe to call twice with identical input: tuple upserts are keyed,
    /// host rows are insert-or-ignore, and the derived error percentages
    /// are recomputed from stored state.
    pub async fn save(&self, records: Vec<SampleRecordDTO>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let window = self.config.analysis_window();
        let time_series = self.dal.time_series();

        // Bucket ids resolved once per (metric, window) key within the batch.
        let mut bucket_ids: HashMap<(UniversalUuid, String, String, String), UniversalUuid> =
            HashMap::new();
        let mut error_buckets: HashSet<UniversalUuid> = HashSet::new();
        let mut tuples = 0usize;

        for record in &records {
            let bucket_start =
                UniversalTimestamp(floor_to_window(record.timestamp.0, window));
            for metric_value in &record.metric_values {
                let key = (
                    record.verification_task_id,
                    metric_value.metric_name.clone(),
                    metric_value.metric_identifier.clone(),
                    bucket_start.to_stored(),
                );
                let bucket_id = match bucket_ids.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = time_series
                            .get_or_create_bucket(
                                record.verification_task_id,
                                &metric_value.metric_name,
                                &metric_value.metric_identifier,
                                metric_value.metric_type,
                                bucket_start,
                            )
                            .await?;
                        bucket_ids.insert(key, id);
                        id
                    }
                };
                if metric_value.metric_type == MetricType::Error {
                    error_buckets.insert(bucket_id);
                }
                for group_value in &metric_value.group_values {
                    time_series
                        .upsert_value(
                            bucket_id,
                            &group_value.group_name,
                            record.timestamp,
                            group_value.value,
                        )
                        .await?;
                    tuples += 1;
                }
            }
        }

        for bucket_id in error_buckets {
            self.recompute_percent_values(bucket_id).await?;
        }

        self.record_batch_hosts(&records).await?;

        info!(records = records.len(), tuples, "Sample batch saved");
        Ok(())
    }

    /// Recomputes each group's share of the bucket total. Deterministic
    /// over stored state, which keeps `save` idempotent.
    async fn recompute_percent_values(&self, bucket_id: UniversalUuid) -> Result<(), StoreError> {
        let values = self.dal.time_series().values_for_bucket(bucket_id).await?;
        let total: f64 = values.iter().map(|v| v.value).sum();
        let mut group_sums: BTreeMap<&str, f64> = BTreeMap::new();
        for value in &values {
            *group_sums.entry(value.group_name.as_str()).or_insert(0.0) += value.value;
        }
        for (group, sum) in group_sums {
            let percent = if total > 0.0 { 100.0 * sum / total } else { 0.0 };
            self.dal
                .time_series()
                .set_percent_value(bucket_id, group, percent)
                .await?;
        }
        Ok(())
    }

    /// Records the hosts seen in a batch against each verification task's
    /// sampled range. Samples are per-minute, so the range end is one
    /// minute past the newest sample.
    async fn record_batch_hosts(&self, records: &[SampleRecordDTO]) -> Result<(), StoreError> {
        let mut per_task: HashMap<
            UniversalUuid,
            (UniversalTimestamp, UniversalTimestamp, BTreeSet<String>),
        > = HashMap::new();
        for record in records {
            let Some(host) = &record.host else { continue };
            let entry = per_task
                .entry(record.verification_task_id)
                .or_insert_with(|| (record.timestamp, record.timestamp, BTreeSet::new()));
            entry.0 = entry.0.min(record.timestamp);
            entry.1 = entry.1.max(record.timestamp);
            entry.2.insert(host.clone());
        }
        for (verification_task_id, (min, max, hosts)) in per_task {
            let end = UniversalTimestamp(max.0 + chrono::Duration::minutes(1));
            self.dal
                .host_record()
                .record_hosts(
                    verification_task_id,
                    min,
                    end,
                    hosts.into_iter().collect(),
                )
                .await?;
        }
        Ok(())
    }

    /// Writes risk scores onto stored tuples for each (metric, group)
    /// entry whose `analysis_start_time` matches a bucket start. Tuple
    /// count and existence never change.
    pub async fn update_risk_scores(&self, summary: RiskSummaryDTO) -> Result<(), StoreError> {
        for entry in &summary.metric_risks {
            let updated = self
                .dal
                .time_series()
                .update_risk_score(
                    summary.verification_task_id,
                    &entry.metric_name,
                    &entry.group_name,
                    summary.analysis_start_time,
                    entry.risk_score,
                )
                .await?;
            if updated == 0 {
                debug!(metric = %entry.metric_name, group = %entry.group_name,
                    analysis_start = %summary.analysis_start_time,
                    "Risk entry matched no stored bucket");
            }
        }
        Ok(())
    }

    /// Flattened tuples whose timestamp falls in `[start, end)`. The range
    /// need not align to bucket boundaries.
    pub async fn get_time_series_record_dtos(
        &self,
        verification_task_id: UniversalUuid,
        start: UniversalTimestamp,
        end: UniversalTimestamp,
    ) -> Result<Vec<TimeSeriesRecordDTO>, StoreError> {
        let records = self
            .dal
            .time_series()
            .records_in_range(verification_task_id, start, end)
            .await?;
        Ok(records
            .into_iter()
            .map(|(bucket, value)| TimeSeriesRecordDTO {
                verification_task_id: bucket.verification_task_id,
                metric_name: bucket.metric_name,
                metric_identifier: bucket.metric_identifier,
                group_name: value.group_name,
                timestamp: value.timestamp,
                value: value.value,
                risk_score: value.risk_score,
                percent_value: value.percent_value,
            })
            .collect())
    }

    /// Raw values over a range, pivoted by transaction group then metric.
    pub async fn get_txn_metric_data_for_range(
        &self,
        verification_task_id: UniversalUuid,
        start: UniversalTimestamp,
        end: UniversalTimestamp,
    ) -> Result<NestedMetricData, StoreError> {
        let records = self
            .dal
            .time_series()
            .records_in_range(verification_task_id, start, end)
            .await?;
        let mut pivot: NestedMetricData = BTreeMap::new();
        for (bucket, value) in records {
            pivot
                .entry(value.group_name)
                .or_default()
                .entry(bucket.metric_name)
                .or_default()
                .push(value.value);
        }
        Ok(pivot)
    }

    /// Raw values over a range, pivoted by metric then transaction group.
    pub async fn get_metric_group_data_for_range(
        &self,
        verification_task_id: UniversalUuid,
        start: UniversalTimestamp,
        end: UniversalTimestamp,
    ) -> Result<NestedMetricData, StoreError> {
        let records = self
            .dal
            .time_series()
            .records_in_range(verification_task_id, start, end)
            .await?;
        let mut pivot: NestedMetricData = BTreeMap::new();
        for (bucket, value) in records {
            pivot
                .entry(bucket.metric_name)
                .or_default()
                .entry(value.group_name)
                .or_default()
                .push(value.value);
        }
        Ok(pivot)
    }

    /// Distinct hosts observed for a verification task over `[start, end)`.
    pub async fn get_hosts(
        &self,
        verification_task_id: UniversalUuid,
        start: UniversalTimestamp,
        end: UniversalTimestamp,
    ) -> Result<BTreeSet<String>, StoreError> {
        self.dal
            .host_record()
            .hosts_in_range(verification_task_id, start, end)
            .await
    }
}
