// # OVH DNS Provider
//
// This crate implements the zonectl zone contract on top of the OVH API.
//
// ## Layout
//
// - `models`: OVH wire record and conversions to `zonectl_core::Record`
// - `client`: signed HTTP transport (`OvhClient`) behind the `Transport` trait
// - `store`: serialized record access through one lazily built client
// - `finder`: template lookups
// - `reconcile`: the set-records algorithm with rollback
//
// ## Behavior
//
// - Zone names are accepted fully qualified (`example.com.`) and normalized
// - Every successful mutating call is followed by a zone refresh so that
//   changes get published
// - NO retry logic: a failed backend call surfaces immediately
// - NO caching: every read goes to the API
// - Calls are sequential, one backend round trip at a time
//
// ## API Reference
//
// - List records: GET `/domain/zone/{zone}/record?fieldType=..&subDomain=..`
// - Get record: GET `/domain/zone/{zone}/record/{id}`
// - Create record: POST `/domain/zone/{zone}/record`
// - Delete record: DELETE `/domain/zone/{zone}/record/{id}`
// - Publish zone: POST `/domain/zone/{zone}/refresh`

pub mod client;
pub mod finder;
pub mod models;
pub mod reconcile;
pub mod store;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use zonectl_core::config::ProviderConfig;
use zonectl_core::traits::{
    RecordAppender, RecordDeleter, RecordGetter, RecordSetter, ZoneProvider, ZoneProviderFactory,
};
use zonectl_core::{Error, Record, Result, unfqdn};

pub use client::{Connector, OvhClient, OvhCredentials, Transport};
pub use models::OvhRecord;
pub use reconcile::Reconciliation;
pub use store::RecordStore;

use crate::models::RecordQuery;

/// OVH zone provider
///
/// Cheap to construct: the HTTP client is built on the first API call.
/// All calls made through one provider are serialized.
#[derive(Debug)]
pub struct OvhProvider {
    store: RecordStore,
}

impl OvhProvider {
    /// Create a provider from OVH credentials
    pub fn new(credentials: OvhCredentials) -> Self {
        Self::with_connector(Box::new(credentials))
    }

    /// Create a provider whose backend client comes from `connector`
    pub fn with_connector(connector: Box<dyn Connector>) -> Self {
        Self {
            store: RecordStore::new(connector),
        }
    }

    /// Converge the groups named by `records` and report both what was
    /// created and what was removed.
    ///
    /// [`RecordSetter::set_records`] returns only the created records.
    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Reconciliation> {
        let zone = unfqdn(zone);
        let outcome = reconcile::set_records(&self.store, cancel, zone, records).await?;

        if outcome.changed() {
            self.store.refresh(cancel, zone).await?;
        }

        Ok(outcome)
    }
}

#[async_trait]
impl RecordGetter for OvhProvider {
    async fn get_records(&self, cancel: &CancellationToken, zone: &str) -> Result<Vec<Record>> {
        let zone = unfqdn(zone);
        let ids = self
            .store
            .list_ids(cancel, zone, &RecordQuery::default())
            .await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            records.push(self.store.get(cancel, zone, id).await?);
        }

        Ok(records)
    }
}

#[async_trait]
impl RecordAppender for OvhProvider {
    async fn append_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        let zone = unfqdn(zone);
        for record in records {
            OvhRecord::from_record(record)?;
        }

        let mut created = Vec::with_capacity(records.len());
        for record in records {
            let (record, _id) = self.store.create(cancel, zone, record).await?;
            created.push(record);
        }

        if !created.is_empty() {
            self.store.refresh(cancel, zone).await?;
        }

        tracing::info!(zone, appended = created.len(), "records appended");
        Ok(created)
    }
}

#[async_trait]
impl RecordSetter for OvhProvider {
    async fn set_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.reconcile(cancel, zone, records)
            .await
            .map(|outcome| outcome.created)
    }
}

#[async_trait]
impl RecordDeleter for OvhProvider {
    async fn delete_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        let zone = unfqdn(zone);

        let mut deleted = Vec::new();
        for template in records {
            let found = finder::find_matching(&self.store, cancel, zone, template).await?;
            for (id, record) in found {
                self.store.delete(cancel, zone, id).await?;
                deleted.push(record);
            }
        }

        if !deleted.is_empty() {
            self.store.refresh(cancel, zone).await?;
        }

        tracing::info!(zone, deleted = deleted.len(), "records deleted");
        Ok(deleted)
    }
}

impl ZoneProvider for OvhProvider {
    fn provider_name(&self) -> &'static str {
        "ovh"
    }
}

/// Factory for creating OVH providers
pub struct OvhFactory;

impl ZoneProviderFactory for OvhFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ZoneProvider>> {
        match config {
            ProviderConfig::Ovh {
                endpoint,
                application_key,
                application_secret,
                consumer_key,
            } => {
                // Fail fast on a bad endpoint instead of at the first call
                client::resolve_endpoint(endpoint)?;

                Ok(Box::new(OvhProvider::new(OvhCredentials {
                    endpoint: endpoint.clone(),
                    application_key: application_key.clone(),
                    application_secret: application_secret.clone(),
                    consumer_key: consumer_key.clone(),
                })))
            }
            _ => Err(Error::config("Invalid config for OVH provider")),
        }
    }
}

/// Register the OVH provider with a registry
///
/// # Example
///
/// ```rust
/// use zonectl_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// zonectl_provider_ovh::register(&registry);
/// assert!(registry.has_provider("ovh"));
/// ```
pub fn register(registry: &zonectl_core::ProviderRegistry) {
    registry.register_provider("ovh", Box::new(OvhFactory));
}
