use crate::record::Fields;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

/// Closed set of failures the table engine distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("access denied to {collection}")]
    AccessDenied { collection: String },
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn denied(collection: &str) -> Self {
        Self::AccessDenied {
            collection: collection.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Other(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Fields,
}

/// The hosted document store as seen by the dashboard. Reads are scoped
/// to the requesting admin; writes carry full field maps.
pub trait RecordStore {
    fn list(&self, collection: &str, admin_id: &str) -> StoreResult<Vec<Document>>;

    fn get(&self, collection: &str, admin_id: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Returns the new document id.
    fn insert(&mut self, collection: &str, admin_id: &str, fields: Fields) -> StoreResult<String>;

    /// Merges top-level fields into an existing document.
    fn update(&mut self, collection: &str, admin_id: &str, id: &str, fields: Fields)
        -> StoreResult<()>;

    /// Creates or replaces (`merge == false`) or merges into a document at a known id.
    fn set(
        &mut self,
        collection: &str,
        admin_id: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> StoreResult<()>;
}

pub fn server_timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Server-side stamping: `createdAt` on first write when absent,
/// `updatedAt` on every write.
pub fn stamp(fields: &mut Fields, creating: bool) {
    let now = server_timestamp();
    if creating && !fields.contains_key("createdAt") {
        fields.insert("createdAt".into(), now.clone());
    }
    fields.insert("updatedAt".into(), now);
}

pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (k, v) in patch {
        target.insert(k, v);
    }
}

#[cfg(test)]
mod memory;
#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn list_is_scoped_to_owner() {
        let mut s = MemoryStore::new();
        s.insert("participants", "admin-a", fields(json!({ "fullName": "A" })))
            .unwrap();
        s.insert("participants", "admin-b", fields(json!({ "fullName": "B" })))
            .unwrap();

        let docs = s.list("participants", "admin-a").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body["fullName"], json!("A"));
        assert!(docs[0].body.contains_key("createdAt"));
        assert!(docs[0].body.contains_key("updatedAt"));
    }

    #[test]
    fn update_merges_and_keeps_created_at() {
        let mut s = MemoryStore::new();
        let id = s
            .insert(
                "scenarios",
                "a",
                fields(json!({ "title": "T", "createdAt": "2026-01-01T00:00:00Z" })),
            )
            .unwrap();
        s.update("scenarios", "a", &id, fields(json!({ "difficulty": "hard" })))
            .unwrap();

        let doc = s.get("scenarios", "a", &id).unwrap().unwrap();
        assert_eq!(doc.body["title"], json!("T"));
        assert_eq!(doc.body["difficulty"], json!("hard"));
        assert_eq!(doc.body["createdAt"], json!("2026-01-01T00:00:00Z"));
    }

    #[test]
    fn denials_and_failures_map_to_closed_kinds() {
        let mut s = MemoryStore::new();
        s.deny_reads("contents");
        assert!(matches!(
            s.list("contents", "a"),
            Err(StoreError::AccessDenied { .. })
        ));

        s.deny_writes("scenarios");
        let e = s.insert("scenarios", "a", Fields::new()).unwrap_err();
        assert!(matches!(e, StoreError::AccessDenied { .. }));

        s.fail("participants", "network down");
        assert_eq!(
            s.list("participants", "a").unwrap_err(),
            StoreError::Other("network down".into())
        );
    }
}
