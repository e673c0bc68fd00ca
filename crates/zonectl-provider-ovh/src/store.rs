// # Remote Record Store
//
// Sole owner of the backend client. Every method takes the store lock for
// the whole backend call, and the client is built on first use inside that
// same lock, so:
//
// - at most one backend call per provider instance is in flight
// - the client is constructed exactly once
//
// Nothing is cached: every read goes to the backend.

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use zonectl_core::{Error, Record, Result};

use crate::client::{Connector, Transport};
use crate::models::{OvhRecord, RecordQuery};

type ClientSlot = Option<Box<dyn Transport>>;

/// Why a creation did not yield an identified record
pub(crate) enum CreateFailure {
    /// Nothing is known to have been created
    Rejected(Error),
    /// OVH accepted the record but returned no identifier, so it cannot be
    /// deleted by id
    Unidentified(Error),
}

impl CreateFailure {
    pub(crate) fn into_error(self) -> Error {
        match self {
            CreateFailure::Rejected(e) | CreateFailure::Unidentified(e) => e,
        }
    }
}

/// Record-level access to the zones of one OVH account
pub struct RecordStore {
    connector: Box<dyn Connector>,
    client: Mutex<ClientSlot>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Create a store; `connector` is not invoked until the first call
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            client: Mutex::new(None),
        }
    }

    /// List record identifiers of `zone`, filtered server-side by `query`
    pub async fn list_ids(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        query: &RecordQuery,
    ) -> Result<Vec<i64>> {
        let mut slot = self.lock(cancel).await?;
        let client = connected(&mut slot, self.connector.as_ref())?;

        let path = format!("{}/record{}", zone_path(zone), query.to_query_string());
        let ids: Vec<i64> = serde_json::from_value(client.get(cancel, &path).await?)?;

        tracing::debug!(zone, count = ids.len(), "listed record identifiers");
        Ok(ids)
    }

    /// Fetch one record
    ///
    /// A payload that does not have the shape of an OVH record is a
    /// `Error::Parse`, like any other malformed wire record.
    pub async fn get(&self, cancel: &CancellationToken, zone: &str, id: i64) -> Result<Record> {
        let mut slot = self.lock(cancel).await?;
        let client = connected(&mut slot, self.connector.as_ref())?;

        let path = format!("{}/record/{}", zone_path(zone), id);
        let wire: OvhRecord = serde_json::from_value(client.get(cancel, &path).await?)
            .map_err(|e| Error::parse(format!("record {} of zone {}: {}", id, zone, e)))?;
        wire.to_record()
    }

    /// Create `record`, returning OVH's copy of it and its new identifier.
    ///
    /// The record is validated before anything is sent.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        record: &Record,
    ) -> Result<(Record, i64)> {
        self.create_tracked(cancel, zone, record)
            .await
            .map_err(CreateFailure::into_error)
    }

    /// Like [`RecordStore::create`], but tells a request that was refused
    /// apart from one that created a record OVH did not identify.
    pub(crate) async fn create_tracked(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        record: &Record,
    ) -> std::result::Result<(Record, i64), CreateFailure> {
        let (wire, echo) = self
            .post_record(cancel, zone, record)
            .await
            .map_err(CreateFailure::Rejected)?;

        let id = echo.get("id").and_then(Value::as_i64).unwrap_or(0);
        if id == 0 {
            return Err(CreateFailure::Unidentified(Error::transport(format!(
                "OVH created {} without returning its identifier",
                record
            ))));
        }

        // The record exists from here on; the caller must learn its id even
        // if OVH's echo is unreadable, so fall back to what was sent.
        let echoed = serde_json::from_value::<OvhRecord>(echo)
            .map_err(Error::from)
            .and_then(|echoed| echoed.to_record());
        let created = match echoed {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(zone, id, error = %e, "unreadable echo of created record");
                OvhRecord { id, ..wire }.to_record().unwrap_or_else(|_| record.clone())
            }
        };

        tracing::debug!(zone, id, record = %created, "record created");
        Ok((created, id))
    }

    async fn post_record(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        record: &Record,
    ) -> Result<(OvhRecord, Value)> {
        let wire = OvhRecord::from_record(record)?;

        let mut slot = self.lock(cancel).await?;
        let client = connected(&mut slot, self.connector.as_ref())?;

        let path = format!("{}/record", zone_path(zone));
        let body = serde_json::to_value(&wire)?;
        let echo = client.post(cancel, &path, Some(&body)).await?;
        Ok((wire, echo))
    }

    /// Delete a record by identifier.
    ///
    /// An unknown identifier is a backend error (404), not a no-op.
    pub async fn delete(&self, cancel: &CancellationToken, zone: &str, id: i64) -> Result<()> {
        let mut slot = self.lock(cancel).await?;
        let client = connected(&mut slot, self.connector.as_ref())?;

        let path = format!("{}/record/{}", zone_path(zone), id);
        client.delete(cancel, &path).await?;

        tracing::debug!(zone, id, "record deleted");
        Ok(())
    }

    /// Ask OVH to publish pending changes of `zone`
    pub async fn refresh(&self, cancel: &CancellationToken, zone: &str) -> Result<()> {
        let mut slot = self.lock(cancel).await?;
        let client = connected(&mut slot, self.connector.as_ref())?;

        let path = format!("{}/refresh", zone_path(zone));
        let _: Value = client.post(cancel, &path, None).await?;

        tracing::info!(zone, "zone refreshed");
        Ok(())
    }

    async fn lock(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, ClientSlot>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            slot = self.client.lock() => Ok(slot),
        }
    }
}

/// Return the client held in `slot`, building it on first use
fn connected<'a>(slot: &'a mut ClientSlot, connector: &dyn Connector) -> Result<&'a dyn Transport> {
    let client = match slot.take() {
        Some(client) => client,
        None => {
            tracing::debug!("connecting backend client");
            connector.connect()?
        }
    };
    Ok(&**slot.insert(client))
}

fn zone_path(zone: &str) -> String {
    format!("/domain/zone/{}", zone)
}
