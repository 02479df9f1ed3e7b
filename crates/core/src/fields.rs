//! Helpers for pulling typed fields out of client JSON documents.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::Attributes;
use crate::error::{DomainError, DomainResult};
use crate::id::DocumentId;

pub(crate) fn into_object(value: Value, what: &str) -> DomainResult<Attributes> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DomainError::validation(format!("{what} must be a JSON object"))),
    }
}

/// Drop keys the server owns.
pub(crate) fn strip(map: &mut Attributes, keys: &[&str]) {
    for key in keys {
        map.remove(*key);
    }
}

pub(crate) fn take_string(map: &mut Attributes, key: &str) -> DomainResult<Option<String>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(DomainError::validation(format!("{key} must be a string"))),
    }
}

pub(crate) fn take_non_empty(map: &mut Attributes, key: &str) -> DomainResult<Option<String>> {
    match take_string(map, key)? {
        Some(s) if s.trim().is_empty() => Err(DomainError::validation(format!("{key} must not be empty"))),
        other => Ok(other),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (truncated to its date).
pub(crate) fn parse_date(key: &str, raw: &str) -> DomainResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| DomainError::validation(format!("{key} must be a date (YYYY-MM-DD)")))
}

pub(crate) fn take_date(map: &mut Attributes, key: &str) -> DomainResult<Option<NaiveDate>> {
    take_string(map, key)?
        .map(|raw| parse_date(key, &raw))
        .transpose()
}

pub(crate) fn take_id(map: &mut Attributes, key: &str) -> DomainResult<Option<DocumentId>> {
    take_string(map, key)?.map(|raw| raw.parse()).transpose()
}
