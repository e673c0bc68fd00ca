// # Record Finder
//
// Looks up the zone records resembling a template. The listing is narrowed
// server-side by type and sub-domain when the template pins them, then every
// candidate is fetched and checked with `Record::matches`.

use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use zonectl_core::{Record, Result};

use crate::models::RecordQuery;
use crate::store::RecordStore;

/// Zone records matching `template`, keyed by OVH identifier so callers can
/// delete exactly what was found without another lookup.
pub async fn find_matching(
    store: &RecordStore,
    cancel: &CancellationToken,
    zone: &str,
    template: &Record,
) -> Result<BTreeMap<i64, Record>> {
    let query = RecordQuery::from_template(template);
    let ids = store.list_ids(cancel, zone, &query).await?;

    let mut found = BTreeMap::new();
    for id in ids {
        let candidate = store.get(cancel, zone, id).await?;
        if template.matches(&candidate) {
            found.insert(id, candidate);
        }
    }

    tracing::debug!(
        zone,
        name = %template.name,
        record_type = %template.record_type,
        found = found.len(),
        "matched zone records"
    );
    Ok(found)
}
