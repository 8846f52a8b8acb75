//! Invoice persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use paytrack_core::{ClientId, DomainError, DomainResult, InvoiceId};

use crate::record::InvoiceRecord;

/// Closure run by [`InvoiceRepository::edit`] on a draft copy of the stored
/// record. `Ok(true)` writes the draft back, `Ok(false)` leaves the store as
/// it was, `Err` aborts without writing.
pub type EditFn<'a> = dyn FnMut(&mut InvoiceRecord) -> DomainResult<bool> + 'a;

/// Invoice storage keyed by invoice id.
///
/// `edit` runs a read-modify-write under the store's write lock, so edits of
/// one invoice are applied one after another. `update` is the optimistic
/// variant for callers that read earlier: it succeeds only if the stored
/// record is still at `expected_version`.
pub trait InvoiceRepository: Send + Sync {
    fn get(&self, id: InvoiceId) -> DomainResult<InvoiceRecord>;

    /// Store a new record. Fails with `Conflict` if the id already exists.
    fn insert(&self, record: InvoiceRecord) -> DomainResult<()>;

    /// Replace a record, bumping its version. Returns the stored record.
    fn update(&self, record: InvoiceRecord, expected_version: u64) -> DomainResult<InvoiceRecord>;

    /// Atomically read, modify and (optionally) write one record.
    ///
    /// Returns the record as stored afterwards; its version is bumped only
    /// when the closure asked for a write.
    fn edit(&self, id: InvoiceId, f: &mut EditFn<'_>) -> DomainResult<InvoiceRecord>;

    fn list(&self) -> DomainResult<Vec<InvoiceRecord>>;

    fn list_for_client(&self, client_id: ClientId) -> DomainResult<Vec<InvoiceRecord>>;
}

impl<R> InvoiceRepository for Arc<R>
where
    R: InvoiceRepository + ?Sized,
{
    fn get(&self, id: InvoiceId) -> DomainResult<InvoiceRecord> {
        (**self).get(id)
    }

    fn insert(&self, record: InvoiceRecord) -> DomainResult<()> {
        (**self).insert(record)
    }

    fn update(&self, record: InvoiceRecord, expected_version: u64) -> DomainResult<InvoiceRecord> {
        (**self).update(record, expected_version)
    }

    fn edit(&self, id: InvoiceId, f: &mut EditFn<'_>) -> DomainResult<InvoiceRecord> {
        (**self).edit(id, f)
    }

    fn list(&self) -> DomainResult<Vec<InvoiceRecord>> {
        (**self).list()
    }

    fn list_for_client(&self, client_id: ClientId) -> DomainResult<Vec<InvoiceRecord>> {
        (**self).list_for_client(client_id)
    }
}

/// In-memory repository for tests, batch runs and dev.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    inner: RwLock<HashMap<InvoiceId, InvoiceRecord>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing records, keeping their versions.
    pub fn from_records(records: impl IntoIterator<Item = InvoiceRecord>) -> DomainResult<Self> {
        let repo = Self::new();
        for record in records {
            repo.insert(record)?;
        }
        Ok(repo)
    }
}

fn poisoned() -> DomainError {
    DomainError::invariant("invoice store lock poisoned")
}

impl InvoiceRepository for InMemoryInvoiceRepository {
    fn get(&self, id: InvoiceId) -> DomainResult<InvoiceRecord> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.get(&id).cloned().ok_or_else(DomainError::not_found)
    }

    fn insert(&self, record: InvoiceRecord) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&record.id) {
            return Err(DomainError::conflict(format!(
                "invoice {} already exists",
                record.id
            )));
        }
        map.insert(record.id, record);
        Ok(())
    }

    fn update(
        &self,
        mut record: InvoiceRecord,
        expected_version: u64,
    ) -> DomainResult<InvoiceRecord> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let stored = map.get_mut(&record.id).ok_or_else(DomainError::not_found)?;

        if stored.version != expected_version {
            return Err(DomainError::conflict(format!(
                "stale write for invoice {} (expected version {expected_version}, actual {})",
                record.id, stored.version
            )));
        }

        record.version = expected_version + 1;
        *stored = record.clone();
        Ok(record)
    }

    fn edit(&self, id: InvoiceId, f: &mut EditFn<'_>) -> DomainResult<InvoiceRecord> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let stored = map.get_mut(&id).ok_or_else(DomainError::not_found)?;

        let mut draft = stored.clone();
        if !f(&mut draft)? {
            return Ok(stored.clone());
        }
        if draft.id != id {
            return Err(DomainError::invariant(format!(
                "edit of invoice {id} tried to change its id"
            )));
        }

        draft.version = stored.version + 1;
        *stored = draft.clone();
        Ok(draft)
    }

    fn list(&self) -> DomainResult<Vec<InvoiceRecord>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut records: Vec<_> = map.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn list_for_client(&self, client_id: ClientId) -> DomainResult<Vec<InvoiceRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.client_id == client_id)
            .collect())
    }
}
