//! In-memory staging store
//!
//! All staged state lives behind one mutex, which is what gives `take` its
//! compare-and-delete atomicity: a promote and a delete racing on the same
//! id serialize on the lock, one removes the record, the other sees `None`.
//! The lock is never held across an await point.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::models::{BatchStatus, BatchSummary, StagedFields, StagedRecord};
use crate::stores::{Removal, StagingStore};

#[derive(Debug)]
struct BatchState {
    source_filename: String,
    created_at: chrono::DateTime<Utc>,
    promoted: u64,
    deleted: u64,
}

#[derive(Debug, Default)]
struct Inner {
    next_batch_id: i64,
    next_record_id: i64,
    batches: BTreeMap<i64, BatchState>,
    records: BTreeMap<i64, StagedRecord>,
}

impl Inner {
    fn remaining(&self, batch_id: i64) -> u64 {
        self.records
            .values()
            .filter(|r| r.batch_id == batch_id)
            .count() as u64
    }

    fn summary(&self, batch_id: i64, state: &BatchState) -> BatchSummary {
        let remaining = self.remaining(batch_id);
        let status = if remaining > 0 {
            BatchStatus::Reviewing
        } else if state.promoted > 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Rejected
        };
        BatchSummary {
            id: batch_id,
            source_filename: state.source_filename.clone(),
            created_at: state.created_at,
            status,
            remaining,
        }
    }
}

/// Staging store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStagingStore {
    inner: Mutex<Inner>,
}

impl InMemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    async fn create_batch(
        &self,
        source_filename: &str,
        rows: Vec<StagedFields>,
    ) -> (BatchSummary, Vec<StagedRecord>) {
        let mut inner = self.lock();
        let now = Utc::now();

        inner.next_batch_id += 1;
        let batch_id = inner.next_batch_id;

        let mut created = Vec::with_capacity(rows.len());
        for fields in rows {
            inner.next_record_id += 1;
            let record = StagedRecord {
                id: inner.next_record_id,
                batch_id,
                created_at: now,
                fields,
            };
            inner.records.insert(record.id, record.clone());
            created.push(record);
        }

        let state = BatchState {
            source_filename: source_filename.to_string(),
            created_at: now,
            promoted: 0,
            deleted: 0,
        };
        let summary = inner.summary(batch_id, &state);
        inner.batches.insert(batch_id, state);

        (summary, created)
    }

    async fn get(&self, id: i64) -> Option<StagedRecord> {
        self.lock().records.get(&id).cloned()
    }

    async fn save(&self, record: StagedRecord) -> Option<StagedRecord> {
        let mut inner = self.lock();
        match inner.records.get_mut(&record.id) {
            Some(existing) => {
                // Batch membership is immutable; only the fields move.
                existing.fields = record.fields;
                Some(existing.clone())
            },
            None => None,
        }
    }

    async fn take(&self, id: i64, removal: Removal) -> Option<StagedRecord> {
        let mut inner = self.lock();
        let record = inner.records.remove(&id)?;
        if let Some(state) = inner.batches.get_mut(&record.batch_id) {
            match removal {
                Removal::Promoted => state.promoted += 1,
                Removal::Deleted => state.deleted += 1,
            }
        }
        Some(record)
    }

    async fn list(
        &self,
        batch_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> (Vec<StagedRecord>, i64) {
        let inner = self.lock();
        let matching: Vec<&StagedRecord> = inner
            .records
            .values()
            .filter(|r| batch_id.is_none_or(|b| r.batch_id == b))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        (page, total)
    }

    async fn all(&self, batch_id: Option<i64>) -> Vec<StagedRecord> {
        let inner = self.lock();
        inner
            .records
            .values()
            .filter(|r| batch_id.is_none_or(|b| r.batch_id == b))
            .cloned()
            .collect()
    }

    async fn batch_record_ids(&self, batch_id: i64) -> Vec<i64> {
        let inner = self.lock();
        inner
            .records
            .values()
            .filter(|r| r.batch_id == batch_id)
            .map(|r| r.id)
            .collect()
    }

    async fn batch(&self, batch_id: i64) -> Option<BatchSummary> {
        let inner = self.lock();
        inner
            .batches
            .get(&batch_id)
            .map(|state| inner.summary(batch_id, state))
    }

    async fn batches(&self) -> Vec<BatchSummary> {
        let inner = self.lock();
        inner
            .batches
            .iter()
            .rev()
            .map(|(id, state)| inner.summary(*id, state))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DamageLevel, LocationLabels};

    fn fields(name: &str) -> StagedFields {
        StagedFields {
            name_ar: name.to_string(),
            name_en: name.to_string(),
            location: LocationLabels {
                governorate: "حلب".to_string(),
                district: "جبل سمعان".to_string(),
                sub_district: "مركز".to_string(),
                neighborhood: "الميدان".to_string(),
            },
            address: None,
            damage_level: DamageLevel::Partial,
            estimated_cost: 1000.0,
            is_reconstruction: false,
            committee_name: "اللجنة".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_batch_assigns_stable_ids() {
        let store = InMemoryStagingStore::new();
        let (batch, records) = store
            .create_batch("masajid.xlsx", vec![fields("a"), fields("b")])
            .await;

        assert_eq!(batch.status, BatchStatus::Reviewing);
        assert_eq!(batch.remaining, 2);
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
        assert!(records.iter().all(|r| r.batch_id == batch.id));
    }

    #[tokio::test]
    async fn test_take_is_terminal() {
        let store = InMemoryStagingStore::new();
        let (_, records) = store.create_batch("f.xlsx", vec![fields("a")]).await;
        let id = records[0].id;

        assert!(store.take(id, Removal::Promoted).await.is_some());
        assert!(store.take(id, Removal::Promoted).await.is_none());
        assert!(store.take(id, Removal::Deleted).await.is_none());
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_save_after_take_reports_gone() {
        let store = InMemoryStagingStore::new();
        let (_, records) = store.create_batch("f.xlsx", vec![fields("a")]).await;
        let record = records[0].clone();

        store.take(record.id, Removal::Deleted).await;
        assert!(store.save(record).await.is_none());
    }

    #[tokio::test]
    async fn test_batch_status_transitions() {
        let store = InMemoryStagingStore::new();
        let (batch, records) = store
            .create_batch("f.xlsx", vec![fields("a"), fields("b")])
            .await;

        store.take(records[0].id, Removal::Promoted).await;
        let summary = store.batch(batch.id).await.unwrap();
        assert_eq!(summary.status, BatchStatus::Reviewing);
        assert_eq!(summary.remaining, 1);

        store.take(records[1].id, Removal::Deleted).await;
        let summary = store.batch(batch.id).await.unwrap();
        assert_eq!(summary.status, BatchStatus::Completed);
        assert_eq!(summary.remaining, 0);
    }

    #[tokio::test]
    async fn test_batch_rejected_when_all_deleted() {
        let store = InMemoryStagingStore::new();
        let (batch, records) = store.create_batch("f.xlsx", vec![fields("a")]).await;

        store.take(records[0].id, Removal::Deleted).await;
        let summary = store.batch(batch.id).await.unwrap();
        assert_eq!(summary.status, BatchStatus::Rejected);
    }

    #[tokio::test]
    async fn test_list_pagination_and_filter() {
        let store = InMemoryStagingStore::new();
        let (batch_a, _) = store
            .create_batch("a.xlsx", vec![fields("a1"), fields("a2"), fields("a3")])
            .await;
        store.create_batch("b.xlsx", vec![fields("b1")]).await;

        let (page, total) = store.list(None, 0, 2).await;
        assert_eq!(total, 4);
        assert_eq!(page.len(), 2);

        let (page, total) = store.list(Some(batch_a.id), 2, 2).await;
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_takes_resolve_to_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStagingStore::new());
        let (_, records) = store.create_batch("f.xlsx", vec![fields("a")]).await;
        let id = records[0].id;

        let promote = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.take(id, Removal::Promoted).await })
        };
        let delete = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.take(id, Removal::Deleted).await })
        };

        let (a, b) = (promote.await.unwrap(), delete.await.unwrap());
        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
    }
}
