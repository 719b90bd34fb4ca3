//! Bulk zone batching
//!
//! Large zone creation lists are split into consecutive batches of at most
//! [`BatchSize`] zones and submitted one after another. Each accepted batch
//! is an independent remote request; a later failure does not undo it, so
//! the handles obtained so far travel with the error.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::api::{BulkRequestHandle, DnsApi};
use crate::dns::errors::{DnsError, DnsResult};
use crate::dns::recordset::{ContractInfo, ZoneCreateSpec};

/// Upper bound on zones per bulk create request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub const DEFAULT: usize = 1000;

    pub fn new(size: usize) -> Option<Self> {
        NonZeroUsize::new(size).map(BatchSize)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        // DEFAULT is non-zero
        BatchSize(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}

impl From<NonZeroUsize> for BatchSize {
    fn from(size: NonZeroUsize) -> Self {
        BatchSize(size)
    }
}

impl FromStr for BatchSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size: usize = s
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a positive integer", s))?;
        BatchSize::new(size).ok_or_else(|| "batch size must be positive".to_string())
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consecutive batches of `zones`, in input order; the last may be short.
pub fn plan_batches(zones: &[ZoneCreateSpec], size: BatchSize) -> Vec<&[ZoneCreateSpec]> {
    zones.chunks(size.get()).collect()
}

/// Submits `zones` for creation in batches, returning one handle per batch.
///
/// An empty list submits nothing. The first failing batch stops the loop
/// with [`DnsError::Submission`], which carries its index and every handle
/// already obtained.
pub fn submit_bulk_create(
    api: &dyn DnsApi,
    zones: &[ZoneCreateSpec],
    contract: &ContractInfo,
    size: BatchSize,
) -> DnsResult<Vec<BulkRequestHandle>> {
    let batches = plan_batches(zones, size);
    let total = batches.len();
    let mut handles = Vec::with_capacity(total);

    for (batch_index, batch) in batches.into_iter().enumerate() {
        log::info!(
            "Submitting bulk create batch {}/{} ({} zones)",
            batch_index + 1,
            total,
            batch.len()
        );

        match api.create_bulk_zones(batch, contract) {
            Ok(handle) => {
                log::debug!("Batch {} accepted as request {}", batch_index + 1, handle.request_id);
                handles.push(handle);
            }
            Err(source) => {
                if !handles.is_empty() {
                    log::warn!(
                        "Batch {} failed after {} batch(es) were accepted",
                        batch_index + 1,
                        handles.len()
                    );
                }
                return Err(DnsError::Submission {
                    batch_index,
                    handles,
                    source,
                });
            }
        }
    }

    Ok(handles)
}

/// Submits a single delete request for all of `zones`.
///
/// Deletes are never batched. An empty list submits nothing.
pub fn submit_bulk_delete(
    api: &dyn DnsApi,
    zones: &[String],
    bypass_safety: bool,
) -> DnsResult<Option<BulkRequestHandle>> {
    if zones.is_empty() {
        return Ok(None);
    }

    if bypass_safety {
        log::warn!("Submitting bulk delete of {} zones with safety checks bypassed", zones.len());
    } else {
        log::info!("Submitting bulk delete of {} zones", zones.len());
    }

    api.delete_bulk_zones(zones, bypass_safety)
        .map(Some)
        .map_err(|source| DnsError::Submission {
            batch_index: 0,
            handles: Vec::new(),
            source,
        })
}
