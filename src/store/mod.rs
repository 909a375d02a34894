//! Document store boundary.
//!
//! The host application owns record storage and its consistency guarantees;
//! this core only needs a small transactional query interface. Date-window
//! queries use an exclusive lower bound and an inclusive upper bound on the
//! record creation timestamp, everywhere.

pub mod in_memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use thiserror::Error;

use crate::error::DisbursementError;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("query against {doctype} failed: {message}")]
    Query { doctype: String, message: String },

    #[error("write to {doctype} failed: {message}")]
    Write { doctype: String, message: String },
}

impl From<StoreError> for DisbursementError {
    fn from(err: StoreError) -> Self {
        DisbursementError::Store {
            message: err.to_string(),
        }
    }
}

/// A record as stored by the host: a name, a creation timestamp, and a bag
/// of fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub name: String,
    pub created: DateTime<Utc>,
    pub fields: JsonValue,
}

impl StoredRecord {
    pub fn new(name: impl Into<String>, created: DateTime<Utc>, fields: JsonValue) -> Self {
        Self {
            name: name.into(),
            created,
            fields,
        }
    }

    /// Builds a stored record from any serialisable document.
    pub fn from_document<T: Serialize>(
        name: impl Into<String>,
        created: DateTime<Utc>,
        document: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: name.into(),
            created,
            fields: serde_json::to_value(document)?,
        })
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.fields.clone())
    }

    /// Non-empty string field, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Numeric field parsed as a decimal; accepts JSON numbers and numeric
    /// strings, which is how host stores serialise currency fields.
    pub fn decimal_field(&self, key: &str) -> Option<Decimal> {
        match self.fields.get(key) {
            Some(JsonValue::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
            Some(JsonValue::String(s)) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

/// Filters understood by [`DocumentStore::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    /// Creation strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Creation at or before this instant.
    pub created_through: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on the record name.
    pub name_like: Option<String>,
}

impl QueryFilters {
    pub fn created_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            created_after: Some(start),
            created_through: Some(end),
            name_like: None,
        }
    }
}

/// How [`DocumentStore::get`] locates a single record.
#[derive(Debug, Clone)]
pub enum RecordMatch {
    /// Exact record name.
    Name(String),
    /// Case-insensitive substring match on the record name; first match wins.
    NameLike(String),
    /// First record whose string field equals the given value.
    Field { field: String, value: String },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All records of `doctype` matching `filters`, in creation order.
    async fn query(
        &self,
        doctype: &str,
        filters: &QueryFilters,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// A single record of `doctype`, or `None`. `fields` is a projection
    /// hint; implementations may return the full record.
    async fn get(
        &self,
        doctype: &str,
        matcher: &RecordMatch,
        fields: &[&str],
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Inserts or replaces a record by name.
    async fn upsert(&self, doctype: &str, record: StoredRecord) -> Result<(), StoreError>;
}
