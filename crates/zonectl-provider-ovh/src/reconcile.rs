// # Set-Records Reconciliation
//
// Converges every `(name, type)` group named by the target list to exactly
// the target records of that group, with the fewest creations and deletions.
//
// OVH has no multi-record transaction, so the work is split in two phases:
//
// 1. Creations. Groups are visited in first-occurrence order; for each one
//    the current records are fetched, records equal to some target are kept,
//    the rest are scheduled for deletion, and missing targets are created.
//    If this phase fails, every record it created is deleted again.
// 2. Deletions, only once every creation succeeded.
//
// A record is therefore never removed before its replacement exists. A crash
// between the phases leaves both the new and the obsolete records in place.
//
// Failure classification:
//
// - phase 1 failed, rollback succeeded     -> `Error::Atomic` (zone unchanged)
// - phase 1 failed, rollback failed        -> `Error::NonAtomic`
// - a creation returned no identifier      -> `Error::NonAtomic`, since that
//                                             record cannot be rolled back
// - phase 2 failed                          -> `Error::NonAtomic`
// - cancelled                               -> `Error::Cancelled`, no rollback

use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use zonectl_core::{Error, NonAtomicError, Record, Result};

use crate::finder::find_matching;
use crate::models::OvhRecord;
use crate::store::{CreateFailure, RecordStore};

/// What a successful reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Records that had to be created, as OVH stored them
    pub created: Vec<Record>,
    /// Obsolete records that were removed
    pub deleted: Vec<Record>,
}

impl Reconciliation {
    /// Whether the zone was modified
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.deleted.is_empty()
    }
}

/// Why the creation phase stopped
enum Abort {
    Lookup(Error),
    Create(Error),
    /// OVH stored the record but did not say under which identifier
    Unidentified(Error, Record),
}

/// Progress of the creation phase, kept for rollback
#[derive(Default)]
struct Creations {
    ids: Vec<i64>,
    records: Vec<Record>,
}

/// Converge the groups named by `targets` in `zone`.
///
/// Every target is validated before the first backend call, so invalid input
/// fails with `Error::Validation` and no side effects.
pub async fn set_records(
    store: &RecordStore,
    cancel: &CancellationToken,
    zone: &str,
    targets: &[Record],
) -> Result<Reconciliation> {
    for target in targets {
        OvhRecord::from_record(target)?;
    }

    let mut creations = Creations::default();
    let mut obsolete: Vec<(i64, Record)> = Vec::new();

    let phase_one =
        create_missing(store, cancel, zone, targets, &mut creations, &mut obsolete).await;

    if let Err(abort) = phase_one {
        let mut stranded = Vec::new();
        let cause = match abort {
            Abort::Lookup(e) | Abort::Create(e) if e.is_cancelled() => {
                tracing::warn!(
                    zone,
                    created = creations.ids.len(),
                    "set records cancelled, records created so far are kept"
                );
                return Err(e);
            }
            // Nothing was touched yet
            Abort::Lookup(e) if creations.ids.is_empty() => return Err(e),
            Abort::Lookup(e) | Abort::Create(e) => e,
            Abort::Unidentified(e, record) => {
                stranded.push(Error::transport(format!(
                    "{} cannot be rolled back without its identifier",
                    record
                )));
                e
            }
        };
        return Err(rollback(store, cancel, zone, &creations.ids, cause, stranded).await);
    }

    let mut deleted = Vec::with_capacity(obsolete.len());
    let mut failures = Vec::new();
    for (id, record) in obsolete {
        match store.delete(cancel, zone, id).await {
            Ok(()) => deleted.push(record),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(zone, id, record = %record, error = %e, "failed to delete obsolete record");
                failures.push(e);
            }
        }
    }

    if !failures.is_empty() {
        return Err(NonAtomicError::cleanup_failed(failures).into());
    }

    tracing::info!(
        zone,
        created = creations.records.len(),
        deleted = deleted.len(),
        "zone records reconciled"
    );

    Ok(Reconciliation {
        created: creations.records,
        deleted,
    })
}

/// Phase 1: look up every group and create its missing records
async fn create_missing(
    store: &RecordStore,
    cancel: &CancellationToken,
    zone: &str,
    targets: &[Record],
    creations: &mut Creations,
    obsolete: &mut Vec<(i64, Record)>,
) -> std::result::Result<(), Abort> {
    let mut seen = HashSet::new();

    for target in targets {
        let group = target.group_key();
        if !seen.insert(group) {
            continue;
        }

        let template = Record::template(group.0, group.1);
        let found = find_matching(store, cancel, zone, &template)
            .await
            .map_err(Abort::Lookup)?;

        let mut kept: Vec<Record> = Vec::new();
        let mut stale = 0;
        for (id, current) in found {
            if targets.iter().any(|t| t.equal(&current)) {
                kept.push(current);
            } else {
                obsolete.push((id, current));
                stale += 1;
            }
        }

        tracing::debug!(
            zone,
            name = group.0,
            record_type = group.1,
            kept = kept.len(),
            obsolete = stale,
            "reconciling record group"
        );

        for wanted in targets.iter().filter(|t| t.group_key() == group) {
            if kept.iter().any(|k| k.equal(wanted)) {
                continue;
            }

            let (created, id) = store
                .create_tracked(cancel, zone, wanted)
                .await
                .map_err(|failure| match failure {
                    CreateFailure::Rejected(e) => Abort::Create(e),
                    CreateFailure::Unidentified(e) => Abort::Unidentified(e, wanted.clone()),
                })?;
            creations.ids.push(id);
            creations.records.push(created);
            // Duplicate targets are created once
            kept.push(wanted.clone());
        }
    }

    Ok(())
}

/// Delete everything phase 1 created and classify the failure.
///
/// `failures` starts with the creations that are known to be impossible to
/// undo; any of them makes the result non-atomic.
async fn rollback(
    store: &RecordStore,
    cancel: &CancellationToken,
    zone: &str,
    created: &[i64],
    cause: Error,
    mut failures: Vec<Error>,
) -> Error {
    tracing::warn!(zone, created = created.len(), error = %cause, "set records failed, rolling back");

    for &id in created {
        if let Err(e) = store.delete(cancel, zone, id).await {
            tracing::warn!(zone, id, error = %e, "rollback deletion failed");
            failures.push(e);
        }
    }

    if failures.is_empty() {
        Error::atomic(cause)
    } else {
        tracing::warn!(
            zone,
            failures = failures.len(),
            "rollback incomplete, zone may be inconsistent"
        );
        NonAtomicError::rollback_failed(cause, failures).into()
    }
}
