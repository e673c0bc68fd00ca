//! Test doubles for the OVH provider contract tests
//!
//! `FakeZone` is an in-memory stand-in for the OVH record API. It speaks the
//! same paths and JSON shapes as the real service, so the store, finder,
//! reconciler and facade run unmodified on top of it.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zonectl_core::{Error, Record, Result};
use zonectl_provider_ovh::{Connector, OvhProvider, Transport};

pub const ZONE: &str = "example.com";

#[derive(Default)]
struct ZoneState {
    records: BTreeMap<i64, Value>,
    next_id: i64,
    creates: usize,
    lists: usize,
    refreshes: usize,
    journal: Vec<String>,
    fail_create_at: Option<usize>,
    cancel_create_at: Option<(usize, CancellationToken)>,
    fail_delete_of: HashSet<i64>,
    fail_delete_targets: HashSet<String>,
    fail_refresh: bool,
    fail_list: bool,
    fail_list_at: Option<usize>,
    unidentified_create_at: Option<usize>,
}

/// In-memory OVH zone; clones share state
#[derive(Clone, Default)]
pub struct FakeZone {
    state: Arc<Mutex<ZoneState>>,
    connects: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeZone {
    pub fn new() -> Self {
        let zone = Self::default();
        zone.state.lock().unwrap().next_id = 1000;
        zone
    }

    /// Seed a record, returning its identifier
    pub fn seed(&self, sub_domain: &str, field_type: &str, target: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.records.insert(
            id,
            json!({
                "id": id,
                "zone": ZONE,
                "fieldType": field_type,
                "subDomain": sub_domain,
                "ttl": 3600,
                "target": target,
            }),
        );
        id
    }

    /// Store `wire` verbatim under `id`, whatever its shape
    pub fn seed_raw(&self, id: i64, wire: Value) {
        self.state.lock().unwrap().records.insert(id, wire);
    }

    /// A provider talking to this zone
    pub fn provider(&self) -> OvhProvider {
        OvhProvider::with_connector(Box::new(self.clone()))
    }

    /// Fail the `n`th create call (1-based) with a 500
    pub fn fail_create_at(&self, n: usize) {
        self.state.lock().unwrap().fail_create_at = Some(n);
    }

    /// Store the record of the `n`th create call (1-based) but echo it
    /// without its identifier
    pub fn unidentified_create_at(&self, n: usize) {
        self.state.lock().unwrap().unidentified_create_at = Some(n);
    }

    /// Cancel `token` while the `n`th create call is in flight
    pub fn cancel_create_at(&self, n: usize, token: CancellationToken) {
        self.state.lock().unwrap().cancel_create_at = Some((n, token));
    }

    /// Fail every delete of record `id` with a 500
    pub fn fail_delete_of(&self, id: i64) {
        self.state.lock().unwrap().fail_delete_of.insert(id);
    }

    /// Fail every delete of a record whose target is `target`
    pub fn fail_delete_target(&self, target: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_delete_targets
            .insert(target.to_string());
    }

    pub fn fail_refresh(&self) {
        self.state.lock().unwrap().fail_refresh = true;
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    /// Fail the `n`th listing (1-based) with a 503
    pub fn fail_list_at(&self, n: usize) {
        self.state.lock().unwrap().fail_list_at = Some(n);
    }

    /// Current zone content as abstract records, sorted
    pub fn records(&self) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<Record> = state
            .records
            .values()
            .map(|wire| {
                let sub_domain = wire["subDomain"].as_str().unwrap();
                Record::new(
                    if sub_domain.is_empty() { "@" } else { sub_domain },
                    wire["fieldType"].as_str().unwrap(),
                    wire["target"].as_str().unwrap(),
                    Duration::from_secs(wire["ttl"].as_u64().unwrap()),
                )
            })
            .collect();
        records.sort_by(|a, b| (&a.name, &a.record_type, &a.data).cmp(&(&b.name, &b.record_type, &b.data)));
        records
    }

    /// Raw wire record by identifier
    pub fn wire(&self, id: i64) -> Option<Value> {
        self.state.lock().unwrap().records.get(&id).cloned()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.state.lock().unwrap().records.contains_key(&id)
    }

    /// Every call as `"METHOD path"`, in order
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Journal entries starting with `prefix`
    pub fn calls(&self, prefix: &str) -> usize {
        self.journal().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn refreshes(&self) -> usize {
        self.state.lock().unwrap().refreshes
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Track overlapping calls and give other tasks a chance to interleave
    async fn enter(&self) -> InFlight {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        InFlight(self.in_flight.clone())
    }

    fn record_path<'a>(&self, path: &'a str) -> Result<&'a str> {
        let prefix = format!("/domain/zone/{}/", ZONE);
        path.strip_prefix(&prefix)
            .ok_or_else(|| Error::backend(404, format!("This service does not exist: {}", path)))
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| Error::backend(400, format!("Invalid record id: {}", raw)))
}

fn not_found(id: i64) -> Error {
    Error::backend(404, format!("The requested object (id = {}) does not exist", id))
}

#[async_trait]
impl Transport for FakeZone {
    async fn get(&self, cancel: &CancellationToken, path: &str) -> Result<Value> {
        let _guard = self.enter().await;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("GET {}", path));
        let rest = self.record_path(path)?;

        if let Some(id) = rest.strip_prefix("record/") {
            let id = parse_id(id)?;
            return state.records.get(&id).cloned().ok_or_else(|| not_found(id));
        }

        if let Some(query) = rest.strip_prefix("record") {
            state.lists += 1;
            if state.fail_list || state.fail_list_at == Some(state.lists) {
                return Err(Error::backend(503, "listing unavailable"));
            }
            let query = query.strip_prefix('?').unwrap_or(query);
            let mut field_type = None;
            let mut sub_domain = None;
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                match key.as_ref() {
                    "fieldType" => field_type = Some(value.into_owned()),
                    "subDomain" => sub_domain = Some(value.into_owned()),
                    _ => return Err(Error::backend(400, format!("bad query parameter: {}", key))),
                }
            }

            let ids: Vec<i64> = state
                .records
                .iter()
                .filter(|(_, wire)| {
                    field_type.as_deref().is_none_or(|t| wire["fieldType"] == t)
                        && sub_domain.as_deref().is_none_or(|s| wire["subDomain"] == s)
                })
                .map(|(id, _)| *id)
                .collect();
            return Ok(json!(ids));
        }

        Err(Error::backend(404, format!("unknown path {}", path)))
    }

    async fn post(
        &self,
        cancel: &CancellationToken,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let _guard = self.enter().await;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("POST {}", path));
        let rest = self.record_path(path)?;

        match rest {
            "refresh" => {
                if state.fail_refresh {
                    return Err(Error::backend(500, "refresh failed"));
                }
                state.refreshes += 1;
                Ok(Value::Null)
            }
            "record" => {
                state.creates += 1;
                let attempt = state.creates;

                if let Some((n, token)) = &state.cancel_create_at {
                    if *n == attempt {
                        token.cancel();
                        return Err(Error::Cancelled);
                    }
                }
                if state.fail_create_at == Some(attempt) {
                    return Err(Error::backend(500, "Internal server error"));
                }

                let body = body.ok_or_else(|| Error::backend(400, "missing body"))?;
                let id = state.next_id;
                state.next_id += 1;

                let mut stored = body.clone();
                stored["id"] = json!(id);
                stored["zone"] = json!(ZONE);
                state.records.insert(id, stored.clone());

                if state.unidentified_create_at == Some(attempt) {
                    if let Some(echo) = stored.as_object_mut() {
                        echo.remove("id");
                    }
                }
                Ok(stored)
            }
            _ => Err(Error::backend(404, format!("unknown path {}", path))),
        }
    }

    async fn delete(&self, cancel: &CancellationToken, path: &str) -> Result<()> {
        let _guard = self.enter().await;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("DELETE {}", path));
        let rest = self.record_path(path)?;

        let id = rest
            .strip_prefix("record/")
            .ok_or_else(|| Error::backend(404, format!("unknown path {}", path)))
            .and_then(parse_id)?;

        let target = state
            .records
            .get(&id)
            .and_then(|wire| wire["target"].as_str())
            .unwrap_or_default()
            .to_string();
        if state.fail_delete_of.contains(&id) || state.fail_delete_targets.contains(&target) {
            return Err(Error::backend(500, format!("cannot delete record {}", id)));
        }

        state.records.remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
    }
}

impl Connector for FakeZone {
    fn connect(&self) -> Result<Box<dyn Transport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

/// A record with the default test TTL
pub fn record(name: &str, record_type: &str, data: &str) -> Record {
    Record::new(name, record_type, data, Duration::from_secs(3600))
}

/// `(name, type, data)` triples of `records`, sorted
pub fn triples(records: &[Record]) -> Vec<(String, String, String)> {
    let mut out: Vec<_> = records
        .iter()
        .map(|r| (r.name.clone(), r.record_type.clone(), r.data.clone()))
        .collect();
    out.sort();
    out
}
