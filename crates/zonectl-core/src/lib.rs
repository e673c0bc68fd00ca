// # zonectl-core
//
// Provider-agnostic library for reconciling DNS zone records.
//
// ## Architecture Overview
//
// - **Record**: the abstract record value callers work with, plus the
//   `equal`/`matches` predicates reconciliation is built on
// - **RecordGetter / RecordAppender / RecordSetter / RecordDeleter**: the
//   four zone operations every provider offers, bundled as `ZoneProvider`
// - **Error**: the error taxonomy, including the atomic/non-atomic
//   classification of failed set-records calls
// - **ProviderRegistry**: plugin-based registry building providers from
//   `ProviderConfig`
//
// Providers live in their own crates (`zonectl-provider-ovh`) and never leak
// wire payloads through this API.

pub mod config;
pub mod error;
pub mod record;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::ProviderConfig;
pub use error::{Error, NonAtomicError, Result};
pub use record::{APEX, Record};
pub use registry::ProviderRegistry;
pub use traits::{
    RecordAppender, RecordDeleter, RecordGetter, RecordSetter, ZoneProvider, ZoneProviderFactory,
};

/// Strip the trailing dot of a fully-qualified zone name
///
/// `example.com.` and `example.com` both become `example.com`.
pub fn unfqdn(zone: &str) -> &str {
    zone.strip_suffix('.').unwrap_or(zone)
}
