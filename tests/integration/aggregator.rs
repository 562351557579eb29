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

//! Aggregation behavior: bucketing, idempotent saves, enrichment, and
//! range queries.

use chrono::{Duration, TimeZone, Utc};

use vigilance::aggregator::TimeSeriesAggregator;
use vigilance::dal::DAL;
use vigilance::database::{UniversalTimestamp, UniversalUuid};
use vigilance::dto::{
    GroupValueDTO, MetricRiskDTO, MetricValueDTO, RiskSummaryDTO, SampleRecordDTO,
};
use vigilance::models::time_series::MetricType;

use crate::fixtures::{memory_database, test_config, ACCOUNT_ID};

async fn aggregator() -> (TimeSeriesAggregator, DAL) {
    let db = memory_database().await;
    let dal = DAL::new(db);
    (TimeSeriesAggregator::new(dal.clone(), test_config()), dal)
}

/// A fixed, minute-aligned base instant well in the past.
fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
}

fn sample(
    vtid: UniversalUuid,
    minute: i64,
    host: Option<&str>,
    metric_name: &str,
    metric_type: MetricType,
    groups: &[(&str, f64)],
) -> SampleRecordDTO {
    SampleRecordDTO {
        account_id: ACCOUNT_ID.to_string(),
        verification_task_id: vtid,
        timestamp: UniversalTimestamp(base_time() + Duration::minutes(minute)),
        host: host.map(|h| h.to_string()),
        metric_values: vec![MetricValueDTO {
            metric_name: metric_name.to_string(),
            metric_identifier: metric_name.to_string(),
            metric_type,
            group_values: groups
                .iter()
                .map(|(group, value)| GroupValueDTO {
                    group_name: group.to_string(),
                    value: *value,
                })
                .collect(),
        }],
    }
}

#[tokio::test]
async fn sample_lands_in_the_floored_bucket() {
    let (aggregator, dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();

    // Minute 37 with a 5-minute window belongs to the bucket at minute 35.
    aggregator
        .save(vec![sample(
            vtid,
            37,
            None,
            "throughput",
            MetricType::Throughput,
            &[("login", 20.0)],
        )])
        .await
        .unwrap();

    let bucket = dal
        .time_series()
        .find_bucket(
            vtid,
            "throughput",
            "throughput",
            UniversalTimestamp(base_time() + Duration::minutes(35)),
        )
        .await
        .unwrap()
        .expect("bucket at the window floor");
    let values = dal.time_series().values_for_bucket(bucket.id).await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].group_name, "login");
    assert_eq!(values[0].value, 20.0);
}

#[tokio::test]
async fn saving_the_same_batch_twice_changes_nothing() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    let batch = vec![
        sample(vtid, 0, Some("host-1"), "errors", MetricType::Error, &[
            ("login", 3.0),
            ("checkout", 7.0),
        ]),
        sample(vtid, 1, Some("host-2"), "errors", MetricType::Error, &[
            ("login", 2.0),
        ]),
    ];

    aggregator.save(batch.clone()).await.unwrap();
    let first = aggregator
        .get_time_series_record_dtos(
            vtid,
            UniversalTimestamp(base_time()),
            UniversalTimestamp(base_time() + Duration::minutes(5)),
        )
        .await
        .unwrap();

    aggregator.save(batch).await.unwrap();
    let second = aggregator
        .get_time_series_record_dtos(
            vtid,
            UniversalTimestamp(base_time()),
            UniversalTimestamp(base_time() + Duration::minutes(5)),
        )
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn a_batch_straddling_windows_fills_both_buckets() {
    let (aggregator, dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    aggregator
        .save(vec![
            sample(vtid, 4, None, "resp_time", MetricType::RespTime, &[("login", 12.0)]),
            sample(vtid, 5, None, "resp_time", MetricType::RespTime, &[("login", 14.0)]),
        ])
        .await
        .unwrap();

    for (window_minute, expected_value) in [(0, 12.0), (5, 14.0)] {
        let bucket = dal
            .time_series()
            .find_bucket(
                vtid,
                "resp_time",
                "resp_time",
                UniversalTimestamp(base_time() + Duration::minutes(window_minute)),
            )
            .await
            .unwrap()
            .expect("each straddled window gets its own bucket");
        let values = dal.time_series().values_for_bucket(bucket.id).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, expected_value);
    }
}

#[tokio::test]
async fn error_metrics_get_percent_of_bucket_total() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    aggregator
        .save(vec![sample(
            vtid,
            0,
            None,
            "errors",
            MetricType::Error,
            &[("login", 30.0), ("checkout", 70.0)],
        )])
        .await
        .unwrap();

    let records = aggregator
        .get_time_series_record_dtos(
            vtid,
            UniversalTimestamp(base_time()),
            UniversalTimestamp(base_time() + Duration::minutes(5)),
        )
        .await
        .unwrap();
    let login = records.iter().find(|r| r.group_name == "login").unwrap();
    let checkout = records.iter().find(|r| r.group_name == "checkout").unwrap();
    assert_eq!(login.percent_value, Some(30.0));
    assert_eq!(checkout.percent_value, Some(70.0));
}

#[tokio::test]
async fn non_error_metrics_have_no_percent_value() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    aggregator
        .save(vec![sample(
            vtid,
            0,
            None,
            "throughput",
            MetricType::Throughput,
            &[("login", 30.0)],
        )])
        .await
        .unwrap();

    let records = aggregator
        .get_time_series_record_dtos(
            vtid,
            UniversalTimestamp(base_time()),
            UniversalTimestamp(base_time() + Duration::minutes(5)),
        )
        .await
        .unwrap();
    assert_eq!(records[0].percent_value, None);
}

#[tokio::test]
async fn risk_update_enriches_matching_buckets_only() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    aggregator
        .save(vec![
            sample(vtid, 0, None, "resp_time", MetricType::RespTime, &[("login", 12.0)]),
            sample(vtid, 5, None, "resp_time", MetricType::RespTime, &[("login", 14.0)]),
        ])
        .await
        .unwrap();

    aggregator
        .update_risk_scores(RiskSummaryDTO {
            verification_task_id: vtid,
            analysis_start_time: UniversalTimestamp(base_time()),
            analysis_end_time: UniversalTimestamp(base_time() + Duration::minutes(5)),
            metric_risks: vec![
                MetricRiskDTO {
                    metric_name: "resp_time".to_string(),
                    group_name: "login".to_string(),
                    risk_score: 0.87,
                },
                // No bucket starts at minute 10; this entry must be a no-op.
                MetricRiskDTO {
                    metric_name: "memory".to_string(),
                    group_name: "login".to_string(),
                    risk_score: 0.5,
                },
            ],
        })
        .await
        .unwrap();

    let records = aggregator
        .get_time_series_record_dtos(
            vtid,
            UniversalTimestamp(base_time()),
            UniversalTimestamp(base_time() + Duration::minutes(10)),
        )
        .await
        .unwrap();
    assert_eq!(records.len(), 2, "enrichment never adds or removes tuples");
    let first_window = records
        .iter()
        .find(|r| r.timestamp.0 == base_time())
        .unwrap();
    let second_window = records
        .iter()
        .find(|r| r.timestamp.0 == base_time() + Duration::minutes(5))
        .unwrap();
    assert_eq!(first_window.risk_score, Some(0.87));
    assert_eq!(second_window.risk_score, None);
}

#[tokio::test]
async fn range_query_is_half_open_and_supports_partial_buckets() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    let batch: Vec<SampleRecordDTO> = (0..10)
        .map(|minute| {
            sample(vtid, minute, None, "resp_time", MetricType::RespTime, &[(
                "login",
                minute as f64,
            )])
        })
        .collect();
    aggregator.save(batch).await.unwrap();

    // [3, 8) spans the tail of the first bucket and the head of the second.
    let records = aggregator
        .get_time_series_record_dtos(
            vtid,
            UniversalTimestamp(base_time() + Duration::minutes(3)),
            UniversalTimestamp(base_time() + Duration::minutes(8)),
        )
        .await
        .unwrap();
    let mut minutes: Vec<i64> = records
        .iter()
        .map(|r| (r.timestamp.0 - base_time()).num_minutes())
        .collect();
    minutes.sort_unstable();
    assert_eq!(minutes, vec![3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn pivot_queries_nest_by_group_and_by_metric() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    aggregator
        .save(vec![
            sample(vtid, 0, None, "resp_time", MetricType::RespTime, &[
                ("login", 12.0),
                ("checkout", 40.0),
            ]),
            sample(vtid, 1, None, "throughput", MetricType::Throughput, &[(
                "login", 200.0,
            )]),
        ])
        .await
        .unwrap();

    let start = UniversalTimestamp(base_time());
    let end = UniversalTimestamp(base_time() + Duration::minutes(5));

    let by_txn = aggregator
        .get_txn_metric_data_for_range(vtid, start, end)
        .await
        .unwrap();
    assert_eq!(by_txn["login"]["resp_time"], vec![12.0]);
    assert_eq!(by_txn["login"]["throughput"], vec![200.0]);
    assert_eq!(by_txn["checkout"]["resp_time"], vec![40.0]);

    let by_metric = aggregator
        .get_metric_group_data_for_range(vtid, start, end)
        .await
        .unwrap();
    assert_eq!(by_metric["resp_time"]["login"], vec![12.0]);
    assert_eq!(by_metric["resp_time"]["checkout"], vec![40.0]);
    assert_eq!(by_metric["throughput"]["login"], vec![200.0]);
}

#[tokio::test]
async fn hosts_are_recorded_per_sampled_range() {
    let (aggregator, _dal) = aggregator().await;
    let vtid = UniversalUuid::new_v4();
    aggregator
        .save(vec![
            sample(vtid, 0, Some("host-1"), "cpu", MetricType::Infra, &[("login", 0.4)]),
            sample(vtid, 1, Some("host-2"), "cpu", MetricType::Infra, &[("login", 0.6)]),
            sample(vtid, 1, None, "cpu", MetricType::Infra, &[("login", 0.5)]),
        ])
        .await
        .unwrap();

    let hosts = aggregator
        .get_hosts(
            vtid,
            UniversalTimestamp(base_time()),
            UniversalTimestamp(base_time() + Duration::minutes(5)),
        )
        .await
        .unwrap();
    assert_eq!(
        hosts.into_iter().collect::<Vec<_>>(),
        vec!["host-1".to_string(), "host-2".to_string()]
    );

    // A disjoint range observes nothing.
    let none = aggregator
        .get_hosts(
            vtid,
            UniversalTimestamp(base_time() + Duration::hours(2)),
            UniversalTimestamp(base_time() + Duration::hours(3)),
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}
