//! Test doubles for the core contract tests
//!
//! `MemoryProvider` is a reference model of the zone contract built only on
//! `Record::equal` and `Record::matches`. It is installed through the
//! registry as a custom provider so tests exercise the trait objects the way
//! a real front end does.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zonectl_core::traits::{
    RecordAppender, RecordDeleter, RecordGetter, RecordSetter, ZoneProvider, ZoneProviderFactory,
};
use zonectl_core::{Error, ProviderConfig, Record, Result, unfqdn};

pub const MEMORY: &str = "memory";

/// Zone content shared between a factory and the providers it builds
#[derive(Clone, Default)]
pub struct SharedZone {
    records: Arc<Mutex<Vec<Record>>>,
    mutations: Arc<AtomicUsize>,
}

impl SharedZone {
    pub fn with(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            mutations: Arc::default(),
        }
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

pub struct MemoryProvider {
    zone: String,
    state: SharedZone,
}

impl MemoryProvider {
    fn check(&self, cancel: &CancellationToken, zone: &str) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if unfqdn(zone) != self.zone {
            return Err(Error::backend(404, format!("unknown zone {}", zone)));
        }
        Ok(())
    }
}

fn validate(record: &Record) -> Result<()> {
    if record.record_type.is_empty() {
        return Err(Error::validation("record type not specified"));
    }
    if record.is_apex() && record.record_type == "CNAME" {
        return Err(Error::validation("CNAME not allowed at apex"));
    }
    Ok(())
}

#[async_trait]
impl RecordGetter for MemoryProvider {
    async fn get_records(&self, cancel: &CancellationToken, zone: &str) -> Result<Vec<Record>> {
        self.check(cancel, zone)?;
        Ok(self.state.snapshot())
    }
}

#[async_trait]
impl RecordAppender for MemoryProvider {
    async fn append_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.check(cancel, zone)?;
        records.iter().try_for_each(validate)?;

        self.state.records.lock().unwrap().extend_from_slice(records);
        self.state.mutations.fetch_add(records.len(), Ordering::SeqCst);
        Ok(records.to_vec())
    }
}

#[async_trait]
impl RecordSetter for MemoryProvider {
    async fn set_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.check(cancel, zone)?;
        records.iter().try_for_each(validate)?;

        let groups: HashSet<(&str, &str)> = records.iter().map(Record::group_key).collect();
        let mut current = self.state.records.lock().unwrap();

        let before = current.len();
        current.retain(|r| !groups.contains(&r.group_key()) || records.iter().any(|t| t.equal(r)));
        let mut changes = before - current.len();

        let mut created = Vec::new();
        for target in records {
            if !current.iter().any(|r| r.equal(target)) {
                current.push(target.clone());
                created.push(target.clone());
            }
        }
        changes += created.len();

        self.state.mutations.fetch_add(changes, Ordering::SeqCst);
        Ok(created)
    }
}

#[async_trait]
impl RecordDeleter for MemoryProvider {
    async fn delete_records(
        &self,
        cancel: &CancellationToken,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>> {
        self.check(cancel, zone)?;

        let mut current = self.state.records.lock().unwrap();
        let (deleted, kept): (Vec<Record>, Vec<Record>) = current
            .drain(..)
            .partition(|r| records.iter().any(|template| template.matches(r)));
        *current = kept;

        self.state.mutations.fetch_add(deleted.len(), Ordering::SeqCst);
        Ok(deleted)
    }
}

impl ZoneProvider for MemoryProvider {
    fn provider_name(&self) -> &'static str {
        MEMORY
    }
}

/// Builds `MemoryProvider`s over one shared zone
pub struct MemoryFactory {
    pub state: SharedZone,
}

impl ZoneProviderFactory for MemoryFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ZoneProvider>> {
        let ProviderConfig::Custom { config, .. } = config else {
            return Err(Error::config("memory provider needs a custom config"));
        };
        let zone = config["zone"]
            .as_str()
            .ok_or_else(|| Error::config("memory provider needs a zone"))?;

        Ok(Box::new(MemoryProvider {
            zone: unfqdn(zone).to_string(),
            state: self.state.clone(),
        }))
    }
}

pub fn memory_config(zone: &str) -> ProviderConfig {
    ProviderConfig::Custom {
        factory: MEMORY.to_string(),
        config: serde_json::json!({ "zone": zone }),
    }
}

pub fn record(name: &str, record_type: &str, data: &str) -> Record {
    Record::new(name, record_type, data, Duration::from_secs(3600))
}
