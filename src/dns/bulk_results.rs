//! Bulk request status and result aggregation
//!
//! Bulk request IDs are independent, so each is fetched on its own and a
//! failure is recorded against that ID instead of ending the whole lookup.
//! Entries come back in the order the IDs were given.

use crate::api::{ApiError, BulkOperation, BulkOutcome, BulkResult, BulkStatus, DnsApi};

/// One request ID and what fetching it produced
#[derive(Debug)]
pub struct BulkEntry<T> {
    pub request_id: String,
    pub outcome: Result<T, ApiError>,
}

impl<T> BulkEntry<T> {
    pub fn record(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.outcome.as_ref().err()
    }
}

fn collect<T, F>(operation: BulkOperation, request_ids: &[String], fetch: F) -> Vec<BulkEntry<T>>
where
    F: Fn(&str) -> Result<T, ApiError>,
{
    request_ids
        .iter()
        .map(|request_id| {
            let outcome = fetch(request_id);
            if let Err(e) = &outcome {
                log::warn!("Could not fetch bulk {} request {}: {}", operation, request_id, e);
            }
            BulkEntry {
                request_id: request_id.clone(),
                outcome,
            }
        })
        .collect()
}

/// Fetches the status of every request, in order.
pub fn collect_statuses(
    api: &dyn DnsApi,
    operation: BulkOperation,
    request_ids: &[String],
) -> Vec<BulkEntry<BulkStatus>> {
    collect(operation, request_ids, |id| api.get_bulk_status(operation, id))
}

/// Fetches the per-zone result of every request, in order.
pub fn collect_results(
    api: &dyn DnsApi,
    operation: BulkOperation,
    request_ids: &[String],
) -> Vec<BulkEntry<BulkResult>> {
    collect(operation, request_ids, |id| api.get_bulk_result(operation, id))
}

/// Totals across a set of aggregated entries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Request IDs looked up
    pub requests: usize,
    /// IDs whose lookup failed
    pub unavailable: usize,
    /// Requests the service reports as finished
    pub complete: usize,
    pub zones_submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl BulkSummary {
    pub fn from_statuses(entries: &[BulkEntry<BulkStatus>]) -> Self {
        entries.iter().fold(
            BulkSummary {
                requests: entries.len(),
                ..Default::default()
            },
            |mut summary, entry| {
                match entry.record() {
                    Some(status) => {
                        if status.is_complete {
                            summary.complete += 1;
                        }
                        summary.zones_submitted += u64::from(status.zones_submitted);
                        summary.succeeded += u64::from(status.success_count);
                        summary.failed += u64::from(status.failure_count);
                    }
                    None => summary.unavailable += 1,
                }
                summary
            },
        )
    }

    /// Result records only exist for finished requests, so every fetched
    /// entry counts as complete.
    pub fn from_results(entries: &[BulkEntry<BulkResult>]) -> Self {
        entries.iter().fold(
            BulkSummary {
                requests: entries.len(),
                ..Default::default()
            },
            |mut summary, entry| {
                match entry.record() {
                    Some(result) => {
                        summary.complete += 1;
                        for (_, outcome) in result.outcomes() {
                            summary.zones_submitted += 1;
                            match outcome {
                                BulkOutcome::Succeeded => summary.succeeded += 1,
                                BulkOutcome::Failed { .. } => summary.failed += 1,
                            }
                        }
                    }
                    None => summary.unavailable += 1,
                }
                summary
            },
        )
    }

    pub fn all_complete(&self) -> bool {
        self.unavailable == 0 && self.complete == self.requests
    }
}
