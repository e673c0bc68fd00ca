// # OVH Record Model
//
// Wire representation of a zone record and the conversions to and from
// `zonectl_core::Record`.
//
// OVH spells the zone apex as an empty `subDomain` while callers use `"@"`.
// That translation happens here and only here.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::form_urlencoded;
use zonectl_core::{APEX, Error, Record, Result};

/// Smallest TTL OVH accepts, in seconds
pub const MIN_TTL_SECS: i64 = 60;

/// A record as exchanged with `/domain/zone/{zone}/record`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvhRecord {
    /// Assigned by OVH on creation, never set client-side
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: i64,
    pub field_type: String,
    #[serde(default)]
    pub sub_domain: String,
    #[serde(default)]
    pub ttl: i64,
    #[serde(default)]
    pub target: String,
}

fn is_unassigned(id: &i64) -> bool {
    *id == 0
}

impl OvhRecord {
    /// Build the creation payload for `record`.
    ///
    /// Fails with `Error::Validation` when the type is missing or when a
    /// CNAME is placed at the apex (OVH requires a name for CNAMEs). TTLs
    /// below 60 seconds are raised to 60.
    pub fn from_record(record: &Record) -> Result<Self> {
        if record.record_type.is_empty() {
            return Err(Error::validation(format!(
                "type of record {:?} not specified",
                record.name
            )));
        }

        let sub_domain = sub_domain_of(&record.name);
        if sub_domain.is_empty() && record.record_type == "CNAME" {
            return Err(Error::validation("name is mandatory for CNAME on OVH"));
        }

        let ttl = i64::try_from(record.ttl.as_secs()).unwrap_or(i64::MAX);

        Ok(Self {
            id: 0,
            field_type: record.record_type.clone(),
            sub_domain: sub_domain.to_string(),
            ttl: ttl.max(MIN_TTL_SECS),
            target: record.data.clone(),
        })
    }

    /// Convert to the caller's representation.
    ///
    /// One pair of enclosing quotes OVH adds to text-bearing targets is
    /// stripped; quotes inside the data are kept. The data is validated against the type (`Error::Parse` on failure).
    pub fn to_record(&self) -> Result<Record> {
        let name = if self.sub_domain.is_empty() {
            APEX.to_string()
        } else {
            self.sub_domain.clone()
        };

        let data = self
            .target
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(&self.target);

        Record {
            name,
            record_type: self.field_type.clone(),
            data: data.to_string(),
            ttl: Duration::from_secs(u64::try_from(self.ttl).unwrap_or(0)),
        }
        .parse()
    }
}

/// Server-side filter for record listings
///
/// Built from a lookup template; unlike [`OvhRecord::from_record`] it never
/// rejects a template, since looking up is always allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub field_type: Option<String>,
    pub sub_domain: Option<String>,
}

impl RecordQuery {
    /// Filter on whatever the template pins down.
    ///
    /// An empty type leaves the type unfiltered. The apex cannot be expressed
    /// as a `subDomain` filter (an empty value means "no filter" to OVH), so
    /// apex templates list the whole zone and rely on client-side matching.
    pub fn from_template(template: &Record) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            field_type: non_empty(&template.record_type),
            sub_domain: non_empty(sub_domain_of(&template.name)),
        }
    }

    /// Query string to append to the listing path, including the leading `?`
    pub fn to_query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(field_type) = &self.field_type {
            query.append_pair("fieldType", field_type);
        }
        if let Some(sub_domain) = &self.sub_domain {
            query.append_pair("subDomain", sub_domain);
        }

        let query = query.finish();
        if query.is_empty() {
            query
        } else {
            format!("?{}", query)
        }
    }
}

fn sub_domain_of(name: &str) -> &str {
    if name == APEX { "" } else { name }
}
