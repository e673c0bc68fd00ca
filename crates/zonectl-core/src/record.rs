//! Abstract DNS record values
//!
//! A [`Record`] is what callers hand to and receive from a provider. It has no
//! identity of its own: for reconciliation, records are grouped by
//! `(name, type)` and `data`/`ttl` are attributes within that group.
//!
//! Names are zone-relative and the zone apex is always spelled `"@"`.
//! Providers translate to and from their own apex convention at their wire
//! boundary and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use crate::error::{Error, Result};

/// Name used for the zone apex
pub const APEX: &str = "@";

/// A DNS resource record as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Zone-relative name, `"@"` for the apex
    pub name: String,

    /// Record type (`A`, `AAAA`, `CNAME`, `TXT`, ...)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Type-specific payload in presentation format
    #[serde(default)]
    pub data: String,

    /// Time-to-live, seconds granularity
    #[serde(default, with = "ttl_seconds")]
    pub ttl: Duration,
}

impl Record {
    /// Create a record
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        data: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            data: data.into(),
            ttl,
        }
    }

    /// Create a lookup template: exact name and type, any data
    pub fn template(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self::new(name, record_type, "", Duration::ZERO)
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether this record sits at the zone apex
    pub fn is_apex(&self) -> bool {
        self.name == APEX
    }

    /// Equality used for drift detection: name, type and data must match
    /// exactly.
    ///
    /// TTL is ignored because providers may rewrite it server-side.
    pub fn equal(&self, other: &Record) -> bool {
        self.name == other.name && self.record_type == other.record_type && self.data == other.data
    }

    /// Wildcard match used to find records resembling `self`.
    ///
    /// Names must be identical. Type and data must be identical unless either
    /// side leaves them empty, in which case they match anything.
    pub fn matches(&self, candidate: &Record) -> bool {
        if self.name != candidate.name {
            return false;
        }

        if self.record_type != candidate.record_type
            && !self.record_type.is_empty()
            && !candidate.record_type.is_empty()
        {
            return false;
        }

        if self.data != candidate.data && !self.data.is_empty() && !candidate.data.is_empty() {
            return false;
        }

        true
    }

    /// Validate `data` against `record_type` and return the record with its
    /// data in canonical form.
    ///
    /// Address literals are re-rendered (`2001:0db8::0001` becomes
    /// `2001:db8::1`). Types without a structured payload are accepted as is.
    pub fn parse(self) -> Result<Record> {
        let data = canonical_data(&self.record_type, &self.data)
            .map_err(|reason| Error::parse(format!("{} {} {:?}: {}", self.name, self.record_type, self.data, reason)))?;
        Ok(Record { data, ..self })
    }

    /// Identity of the reconciliation group this record belongs to
    pub fn group_key(&self) -> (&str, &str) {
        (&self.name, &self.record_type)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name,
            self.ttl.as_secs(),
            self.record_type,
            self.data
        )
    }
}

fn canonical_data(record_type: &str, data: &str) -> std::result::Result<String, String> {
    match record_type {
        "A" => data
            .parse::<Ipv4Addr>()
            .map(|addr| addr.to_string())
            .map_err(|e| format!("invalid IPv4 address: {}", e)),
        "AAAA" => data
            .parse::<Ipv6Addr>()
            .map(|addr| addr.to_string())
            .map_err(|e| format!("invalid IPv6 address: {}", e)),
        "MX" => {
            let fields: Vec<&str> = data.split_whitespace().collect();
            match fields.as_slice() {
                [preference, target] => {
                    preference
                        .parse::<u16>()
                        .map_err(|e| format!("invalid MX preference: {}", e))?;
                    Ok(format!("{} {}", preference, target))
                }
                _ => Err("expected '<preference> <target>'".to_string()),
            }
        }
        "SRV" => {
            let fields: Vec<&str> = data.split_whitespace().collect();
            match fields.as_slice() {
                [priority, weight, port, target] => {
                    for (label, value) in [("priority", priority), ("weight", weight), ("port", port)] {
                        value
                            .parse::<u16>()
                            .map_err(|e| format!("invalid SRV {}: {}", label, e))?;
                    }
                    Ok(format!("{} {} {} {}", priority, weight, port, target))
                }
                _ => Err("expected '<priority> <weight> <port> <target>'".to_string()),
            }
        }
        "CAA" => {
            let mut fields = data.splitn(3, char::is_whitespace);
            let flags = fields.next().unwrap_or_default();
            let tag = fields.next().unwrap_or_default();
            let value = fields.next().unwrap_or_default().trim();
            flags
                .parse::<u8>()
                .map_err(|e| format!("invalid CAA flags: {}", e))?;
            if tag.is_empty() || value.is_empty() {
                return Err("expected '<flags> <tag> <value>'".to_string());
            }
            Ok(data.to_string())
        }
        _ => Ok(data.to_string()),
    }
}

mod ttl_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ttl.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
