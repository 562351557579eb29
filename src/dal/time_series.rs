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

//! Time-series bucket and value storage operations.
//!
//! Every write here is a keyed upsert: buckets are unique by their 4-part
//! key, values by (bucket, group, timestamp). Concurrent writers targeting
//! the same bucket converge without a bucket-level lock because each tuple
//! upsert lands on its own unique key.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::{time_series_buckets, time_series_values};
use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::error::StoreError;
use crate::models::time_series::{
    MetricType, NewTimeSeriesBucketRow, NewTimeSeriesValueRow, TimeSeriesBucket,
    TimeSeriesBucketRow, TimeSeriesValue, TimeSeriesValueRow,
};

/// Data access for time-series buckets and values.
#[derive(Clone)]
pub struct TimeSeriesDAL<'a> {
    dal: &'a DAL,
}

impl<'a> TimeSeriesDAL<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Returns the id of the bucket for the given key, creating it on the
    /// first sample.
    pub async fn get_or_create_bucket(
        &self,
        verification_task_id: UniversalUuid,
        metric_name: &str,
        metric_identifier: &str,
        metric_type: MetricType,
        bucket_start: UniversalTimestamp,
    ) -> Result<UniversalUuid, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let vtid_blob = verification_task_id.to_blob();
        let metric_name = metric_name.to_string();
        let metric_identifier = metric_identifier.to_string();
        let bucket_start = bucket_start.to_stored();
        let row = NewTimeSeriesBucketRow {
            id: UniversalUuid::new_v4().to_blob(),
            verification_task_id: vtid_blob.clone(),
            metric_name: metric_name.clone(),
            metric_identifier: metric_identifier.clone(),
            metric_type: metric_type.as_str().to_string(),
            bucket_start: bucket_start.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        let id_blob: Vec<u8> = conn
            .interact(move |conn| {
                diesel::insert_into(time_series_buckets::table)
                    .values(&row)
                    .on_conflict((
                        time_series_buckets::verification_task_id,
                        time_series_buckets::metric_name,
                        time_series_buckets::metric_identifier,
                        time_series_buckets::bucket_start,
                    ))
                    .do_nothing()
                    .execute(conn)?;
                time_series_buckets::table
                    .filter(time_series_buckets::verification_task_id.eq(&vtid_blob))
                    .filter(time_series_buckets::metric_name.eq(&metric_name))
                    .filter(time_series_buckets::metric_identifier.eq(&metric_identifier))
                    .filter(time_series_buckets::bucket_start.eq(&bucket_start))
                    .select(time_series_buckets::id)
                    .first(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        UniversalUuid::from_blob(&id_blob)
            .map_err(|e| StoreError::corrupt("time_series_buckets.id", e))
    }

    /// Upserts one (group, timestamp) tuple: insert on first delivery,
    /// last-write-wins on the value for re-deliveries of the same key.
    pub async fn upsert_value(
        &self,
        bucket_id: UniversalUuid,
        group_name: &str,
        timestamp: UniversalTimestamp,
        value: f64,
    ) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let now = UniversalTimestamp::now().to_stored();
        let row = NewTimeSeriesValueRow {
            id: UniversalUuid::new_v4().to_blob(),
            bucket_id: bucket_id.to_blob(),
            group_name: group_name.to_string(),
            timestamp: timestamp.to_stored(),
            value,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        conn.interact(move |conn| {
            diesel::insert_into(time_series_values::table)
                .values(&row)
                .on_conflict((
                    time_series_values::bucket_id,
                    time_series_values::group_name,
                    time_series_values::timestamp,
                ))
                .do_update()
                .set((
                    time_series_values::value.eq(value),
                    time_series_values::updated_at.eq(&now),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Looks up a bucket by its unique key.
    pub async fn find_bucket(
        &self,
        verification_task_id: UniversalUuid,
        metric_name: &str,
        metric_identifier: &str,
        bucket_start: UniversalTimestamp,
    ) -> Result<Option<TimeSeriesBucket>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let vtid_blob = verification_task_id.to_blob();
        let metric_name = metric_name.to_string();
        let metric_identifier = metric_identifier.to_string();
        let bucket_start = bucket_start.to_stored();
        let row: Option<TimeSeriesBucketRow> = conn
            .interact(move |conn| {
                time_series_buckets::table
                    .filter(time_series_buckets::verification_task_id.eq(&vtid_blob))
                    .filter(time_series_buckets::metric_name.eq(&metric_name))
                    .filter(time_series_buckets::metric_identifier.eq(&metric_identifier))
                    .filter(time_series_buckets::bucket_start.eq(&bucket_start))
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        row.map(TryInto::try_into).transpose()
    }

    /// All tuples stored in a bucket.
    pub async fn values_for_bucket(
        &self,
        bucket_id: UniversalUuid,
    ) -> Result<Vec<TimeSeriesValue>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let bucket_blob = bucket_id.to_blob();
        let rows: Vec<TimeSeriesValueRow> = conn
            .interact(move |conn| {
                time_series_values::table
                    .filter(time_series_values::bucket_id.eq(bucket_blob))
                    .order(time_series_values::timestamp.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Sets the derived percent value on every tuple of a group within a
    /// bucket.
    pub async fn set_percent_value(
        &self,
        bucket_id: UniversalUuid,
        group_name: &str,
        percent_value: f64,
    ) -> Result<(), StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let bucket_blob = bucket_id.to_blob();
        let group = group_name.to_string();
        let now = UniversalTimestamp::now().to_stored();
        conn.interact(move |conn| {
            diesel::update(
                time_series_values::table
                    .filter(time_series_values::bucket_id.eq(bucket_blob))
                    .filter(time_series_values::group_name.eq(group)),
            )
            .set((
                time_series_values::percent_value.eq(Some(percent_value)),
                time_series_values::updated_at.eq(now),
            ))
            .execute(conn)
        })
        .await
        .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    /// Sets the risk score on every tuple of (metric, group) in buckets
    /// starting exactly at `bucket_start`. Purely an enrichment: no tuples
    /// or buckets are created. Returns the number of tuples touched.
    pub async fn update_risk_score(
        &self,
        verification_task_id: UniversalUuid,
        metric_name: &str,
        group_name: &str,
        bucket_start: UniversalTimestamp,
        risk_score: f64,
    ) -> Result<usize, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let vtid_blob = verification_task_id.to_blob();
        let metric_name = metric_name.to_string();
        let group = group_name.to_string();
        let bucket_start = bucket_start.to_stored();
        let now = UniversalTimestamp::now().to_stored();
        let affected = conn
            .interact(move |conn| {
                let matching_buckets = time_series_buckets::table
                    .filter(time_series_buckets::verification_task_id.eq(vtid_blob))
                    .filter(time_series_buckets::metric_name.eq(metric_name))
                    .filter(time_series_buckets::bucket_start.eq(bucket_start))
                    .select(time_series_buckets::id);
                diesel::update(
                    time_series_values::table
                        .filter(time_series_values::bucket_id.eq_any(matching_buckets))
                        .filter(time_series_values::group_name.eq(group)),
                )
                .set((
                    time_series_values::risk_score.eq(Some(risk_score)),
                    time_series_values::updated_at.eq(now),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(affected)
    }

    /// All (bucket, value) pairs for a verification task whose tuple
    /// timestamp falls in `[start, end)`. Start and end need not align to
    /// bucket boundaries; partial buckets are extracted tuple-by-tuple.
    pub async fn records_in_range(
        &self,
        verification_task_id: UniversalUuid,
        start: UniversalTimestamp,
        end: UniversalTimestamp,
    ) -> Result<Vec<(TimeSeriesBucket, TimeSeriesValue)>, StoreError> {
        let conn = self.dal.database.get_connection().await?;
        let vtid_blob = verification_task_id.to_blob();
        let start = start.to_stored();
        let end = end.to_stored();
        let rows: Vec<(TimeSeriesBucketRow, TimeSeriesValueRow)> = conn
            .interact(move |conn| {
                time_series_values::table
                    .inner_join(time_series_buckets::table)
                    .filter(time_series_buckets::verification_task_id.eq(&vtid_blob))
                    .filter(time_series_values::timestamp.ge(&start))
                    .filter(time_series_values::timestamp.lt(&end))
                    .order(time_series_values::timestamp.asc())
                    .select((
                        TimeSeriesBucketRow::as_select(),
                        TimeSeriesValueRow::as_select(),
                    ))
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        rows.into_iter()
            .map(|(bucket, value)| Ok((bucket.try_into()?, value.try_into()?)))
            .collect()
    }
}
