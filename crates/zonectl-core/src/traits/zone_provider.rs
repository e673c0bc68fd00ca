// # Zone Provider Traits
//
// Defines the four-operation contract every DNS zone provider offers.
//
// ## Implementations
//
// - OVH: `zonectl-provider-ovh` crate
//
// ## Usage
//
// ```rust,ignore
// use std::time::Duration;
// use tokio_util::sync::CancellationToken;
// use zonectl_core::{Record, RecordSetter};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* ZoneProvider implementation */;
//     let cancel = CancellationToken::new();
//
//     // Converge the "www" A records of the zone
//     let created = provider
//         .set_records(
//             &cancel,
//             "example.com.",
//             &[Record::new("www", "A", "192.0.2.1", Duration::from_secs(300))],
//         )
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::record::Record;

/// Lists the records of a zone
#[async_trait]
pub trait RecordGetter: Send + Sync {
    /// Return every record currently in `zone`.
    ///
    /// `zone` may be given fully qualified (`example.com.`).
    async fn get_records(&self, cancel: &CancellationToken, zone: &str)
    -> crate::Result<Vec<Record>>;
}

/// Adds records to a zone
#[async_trait]
pub trait RecordAppender: Send + Sync {
    /// Create every record in `records`, without checking for existing ones.
    ///
    /// # Returns
    ///
    /// The records as the provider stored them.
    async fn append_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> crate::Result<Vec<Record>>;
}

/// Converges record groups of a zone to a desired state
#[async_trait]
pub trait RecordSetter: Send + Sync {
    /// Make every `(name, type)` group present in `records` hold exactly the
    /// records given for it. Groups absent from `records` are left alone.
    ///
    /// # Returns
    ///
    /// - `Ok(created)`: the records that had to be created; records already
    ///   present are not repeated
    /// - `Err(Error::Atomic)`: nothing changed
    /// - `Err(Error::NonAtomic)`: the zone may be inconsistent and should be
    ///   re-read
    async fn set_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> crate::Result<Vec<Record>>;
}

/// Removes records from a zone
#[async_trait]
pub trait RecordDeleter: Send + Sync {
    /// Delete every zone record matched by one of `records`
    /// (see [`Record::matches`]; empty type or data act as wildcards).
    ///
    /// # Returns
    ///
    /// The records that were removed.
    async fn delete_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> crate::Result<Vec<Record>>;
}

/// A provider offering the full zone contract
///
/// # Thread Safety
///
/// Implementations must be usable from several tasks at once. Whether calls
/// actually run concurrently against the backend is the provider's business.
pub trait ZoneProvider: RecordGetter + RecordAppender + RecordSetter + RecordDeleter {
    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing zone providers from configuration
pub trait ZoneProviderFactory: Send + Sync {
    /// Create a provider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed ZoneProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn ZoneProvider>, crate::Error>;
}
