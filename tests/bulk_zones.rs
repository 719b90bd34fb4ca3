//! Bulk zone batching and result aggregation against an in-memory API

mod common;

use common::{Call, MockApi};
use zonectl::api::{BulkFailure, BulkOperation, BulkResult, BulkStatus};
use zonectl::dns::bulk::{submit_bulk_create, submit_bulk_delete, BatchSize};
use zonectl::dns::bulk_results::{collect_results, collect_statuses, BulkSummary};
use zonectl::dns::errors::DnsError;
use zonectl::dns::recordset::{ContractInfo, ZoneCreateSpec, ZoneType};

fn zones(n: usize) -> Vec<ZoneCreateSpec> {
    (0..n)
        .map(|i| ZoneCreateSpec::new(format!("zone{}.example", i), ZoneType::Primary))
        .collect()
}

fn batch_sizes(api: &MockApi) -> Vec<usize> {
    api.calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::CreateBulkZones(names) => Some(names.len()),
            _ => None,
        })
        .collect()
}

#[test]
fn batches_preserve_size_and_order() {
    let api = MockApi::new();
    let input = zones(2500);

    let handles = submit_bulk_create(
        &api,
        &input,
        &ContractInfo::new("C-1"),
        BatchSize::new(1000).unwrap(),
    )
    .unwrap();

    assert_eq!(batch_sizes(&api), vec![1000, 1000, 500]);
    let ids: Vec<&str> = handles.iter().map(|h| h.request_id.as_str()).collect();
    assert_eq!(ids, vec!["create-1", "create-2", "create-3"]);

    let submitted: Vec<String> = api
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::CreateBulkZones(names) => Some(names),
            _ => None,
        })
        .flatten()
        .collect();
    let expected: Vec<String> = input.into_iter().map(|z| z.zone).collect();
    assert_eq!(submitted, expected);
}

#[test]
fn empty_input_submits_nothing() {
    let api = MockApi::new();
    let handles = submit_bulk_create(&api, &[], &ContractInfo::new("C-1"), BatchSize::default()).unwrap();

    assert!(handles.is_empty());
    assert!(api.calls().is_empty());
}

#[test]
fn failing_batch_keeps_earlier_handles() {
    let api = MockApi::new().failing_bulk_batch(1);

    let err = submit_bulk_create(
        &api,
        &zones(25),
        &ContractInfo::new("C-1"),
        BatchSize::new(10).unwrap(),
    )
    .unwrap_err();

    match err {
        DnsError::Submission {
            batch_index,
            handles,
            ..
        } => {
            assert_eq!(batch_index, 1);
            assert_eq!(handles.len(), 1);
            assert_eq!(handles[0].request_id, "create-1");
        }
        other => panic!("unexpected {:?}", other),
    }
    // the third batch is never sent
    assert_eq!(batch_sizes(&api), vec![10, 10]);
}

#[test]
fn delete_is_one_unbatched_request() {
    let api = MockApi::new();
    let names: Vec<String> = (0..2500).map(|i| format!("zone{}.example", i)).collect();

    let handle = submit_bulk_delete(&api, &names, true).unwrap().unwrap();

    assert_eq!(handle.request_id, "delete-1");
    assert_eq!(api.calls(), vec![Call::DeleteBulkZones(names, true)]);

    assert!(submit_bulk_delete(&api, &[], false).unwrap().is_none());
    assert_eq!(api.calls().len(), 1);
}

#[test]
fn aggregation_reports_failures_per_id() {
    let api = MockApi::new()
        .with_status(BulkStatus {
            request_id: "create-1".to_string(),
            zones_submitted: 10,
            success_count: 9,
            failure_count: 1,
            is_complete: true,
            expiration_date: "2026-11-01T00:00:00Z".to_string(),
        })
        .with_status(BulkStatus {
            request_id: "create-3".to_string(),
            zones_submitted: 5,
            success_count: 0,
            failure_count: 0,
            is_complete: false,
            expiration_date: "2026-11-01T00:00:00Z".to_string(),
        });

    let ids = vec![
        "create-1".to_string(),
        "create-2".to_string(),
        "create-3".to_string(),
    ];
    let entries = collect_statuses(&api, BulkOperation::Create, &ids);

    let order: Vec<&str> = entries.iter().map(|e| e.request_id.as_str()).collect();
    assert_eq!(order, vec!["create-1", "create-2", "create-3"]);
    assert!(entries[0].record().is_some());
    assert!(entries[1].error().is_some());
    assert!(entries[2].record().is_some());

    let summary = BulkSummary::from_statuses(&entries);
    assert_eq!(summary.unavailable, 1);
    assert_eq!(summary.complete, 1);
    assert_eq!(summary.zones_submitted, 15);
}

#[test]
fn results_flatten_into_outcomes() {
    let api = MockApi::new().with_result(BulkResult {
        request_id: "delete-1".to_string(),
        succeeded_zones: vec!["a.example".to_string()],
        failed_zones: vec![BulkFailure {
            zone: "b.example".to_string(),
            failure_reason: "ZONE_NOT_FOUND".to_string(),
        }],
    });

    let entries = collect_results(&api, BulkOperation::Delete, &["delete-1".to_string()]);
    let summary = BulkSummary::from_results(&entries);

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        api.calls(),
        vec![Call::GetBulkResult(BulkOperation::Delete, "delete-1".to_string())]
    );
}
