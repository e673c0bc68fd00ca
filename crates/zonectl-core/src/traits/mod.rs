//! Core traits for zonectl
//!
//! This module defines the abstract interfaces every provider implements.
//!
//! - [`RecordGetter`], [`RecordAppender`], [`RecordSetter`], [`RecordDeleter`]:
//!   the four zone operations
//! - [`ZoneProvider`]: a provider offering all four
//! - [`ZoneProviderFactory`]: builds providers from configuration

pub mod zone_provider;

pub use zone_provider::{
    RecordAppender, RecordDeleter, RecordGetter, RecordSetter, ZoneProvider, ZoneProviderFactory,
};
