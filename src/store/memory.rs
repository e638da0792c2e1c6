use super::{merge_fields, stamp, Document, RecordStore, StoreError, StoreResult};
use crate::record::Fields;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
struct StoredDoc {
    admin_id: String,
    body: Fields,
}

/// In-process store with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: BTreeMap<(String, String), StoredDoc>,
    denied_reads: HashSet<String>,
    denied_writes: HashSet<String>,
    failing: HashMap<String, String>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_reads(&mut self, collection: &str) {
        self.denied_reads.insert(collection.to_string());
    }

    pub fn deny_writes(&mut self, collection: &str) {
        self.denied_writes.insert(collection.to_string());
    }

    /// Every operation on `collection` fails with `Other(message)`.
    pub fn fail(&mut self, collection: &str, message: &str) {
        self.failing
            .insert(collection.to_string(), message.to_string());
    }

    pub fn heal(&mut self, collection: &str) {
        self.failing.remove(collection);
        self.denied_reads.remove(collection);
        self.denied_writes.remove(collection);
    }

    /// Seeds a document verbatim, bypassing access checks and stamping.
    pub fn seed(&mut self, collection: &str, admin_id: &str, id: &str, body: Fields) {
        self.docs.insert(
            (collection.to_string(), id.to_string()),
            StoredDoc {
                admin_id: admin_id.to_string(),
                body,
            },
        );
    }

    pub fn len(&self, collection: &str) -> usize {
        self.docs.keys().filter(|(c, _)| c == collection).count()
    }

    fn check(&self, collection: &str, write: bool) -> StoreResult<()> {
        if let Some(msg) = self.failing.get(collection) {
            return Err(StoreError::Other(msg.clone()));
        }
        let denied = if write {
            &self.denied_writes
        } else {
            &self.denied_reads
        };
        if denied.contains(collection) {
            return Err(StoreError::denied(collection));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn list(&self, collection: &str, admin_id: &str) -> StoreResult<Vec<Document>> {
        self.check(collection, false)?;
        Ok(self
            .docs
            .iter()
            .filter(|((c, _), d)| c == collection && d.admin_id == admin_id)
            .map(|((_, id), d)| Document {
                id: id.clone(),
                body: d.body.clone(),
            })
            .collect())
    }

    fn get(&self, collection: &str, admin_id: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check(collection, false)?;
        Ok(self
            .docs
            .get(&(collection.to_string(), id.to_string()))
            .filter(|d| d.admin_id == admin_id)
            .map(|d| Document {
                id: id.to_string(),
                body: d.body.clone(),
            }))
    }

    fn insert(&mut self, collection: &str, admin_id: &str, mut fields: Fields) -> StoreResult<String> {
        self.check(collection, true)?;
        self.next_id += 1;
        let id = format!("{}-{}", collection, self.next_id);
        stamp(&mut fields, true);
        self.seed(collection, admin_id, &id, fields);
        Ok(id)
    }

    fn update(
        &mut self,
        collection: &str,
        admin_id: &str,
        id: &str,
        mut fields: Fields,
    ) -> StoreResult<()> {
        self.check(collection, true)?;
        let Some(doc) = self
            .docs
            .get_mut(&(collection.to_string(), id.to_string()))
            .filter(|d| d.admin_id == admin_id)
        else {
            return Err(StoreError::Other(format!("{collection}/{id} not found")));
        };
        stamp(&mut fields, false);
        merge_fields(&mut doc.body, fields);
        Ok(())
    }

    fn set(
        &mut self,
        collection: &str,
        admin_id: &str,
        id: &str,
        mut fields: Fields,
        merge: bool,
    ) -> StoreResult<()> {
        self.check(collection, true)?;
        let key = (collection.to_string(), id.to_string());
        if let Some(doc) = self.docs.get_mut(&key).filter(|_| merge) {
            stamp(&mut fields, false);
            merge_fields(&mut doc.body, fields);
            return Ok(());
        }
        stamp(&mut fields, true);
        self.seed(collection, admin_id, id, fields);
        Ok(())
    }
}
