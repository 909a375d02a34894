//! In-memory document store for tests and hosts without a real backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{DocumentStore, QueryFilters, RecordMatch, StoreError, StoredRecord};

/// Thread-safe in-memory store keyed by doctype and record name.
#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    records: Arc<RwLock<HashMap<String, Vec<StoredRecord>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch of records without going through `upsert` one by one.
    pub async fn seed(&self, doctype: &str, records: Vec<StoredRecord>) {
        let mut guard = self.records.write().await;
        let bucket = guard.entry(doctype.to_string()).or_default();
        for record in records {
            bucket.retain(|existing| existing.name != record.name);
            bucket.push(record);
        }
    }
}

fn matches_filters(record: &StoredRecord, filters: &QueryFilters) -> bool {
    if let Some(after) = filters.created_after {
        if record.created <= after {
            return false;
        }
    }
    if let Some(through) = filters.created_through {
        if record.created > through {
            return false;
        }
    }
    if let Some(pattern) = &filters.name_like {
        if !record
            .name
            .to_lowercase()
            .contains(&pattern.to_lowercase())
        {
            return false;
        }
    }
    true
}

fn matches_record(record: &StoredRecord, matcher: &RecordMatch) -> bool {
    match matcher {
        RecordMatch::Name(name) => record.name == *name,
        RecordMatch::NameLike(pattern) => record
            .name
            .to_lowercase()
            .contains(&pattern.to_lowercase()),
        RecordMatch::Field { field, value } => record.str_field(field) == Some(value.as_str()),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        doctype: &str,
        filters: &QueryFilters,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let guard = self.records.read().await;
        let mut matched: Vec<StoredRecord> = guard
            .get(doctype)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|record| matches_filters(record, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matched.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.name.cmp(&b.name)));
        Ok(matched)
    }

    async fn get(
        &self,
        doctype: &str,
        matcher: &RecordMatch,
        _fields: &[&str],
    ) -> Result<Option<StoredRecord>, StoreError> {
        let guard = self.records.read().await;
        Ok(guard.get(doctype).and_then(|bucket| {
            bucket
                .iter()
                .find(|record| matches_record(record, matcher))
                .cloned()
        }))
    }

    async fn upsert(&self, doctype: &str, record: StoredRecord) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        let bucket = guard.entry(doctype.to_string()).or_default();
        if let Some(existing) = bucket.iter_mut().find(|existing| existing.name == record.name) {
            *existing = record;
        } else {
            bucket.push(record);
        }
        Ok(())
    }
}
