use crate::record::Fields;
use crate::store::{merge_fields, stamp, Document, RecordStore, StoreError, StoreResult};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE: &str = "scenariodesk.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            admin_id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT,
            PRIMARY KEY(collection, id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, admin_id)",
        [],
    )?;
    ensure_documents_updated_at(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // No row means access is granted; provisioning only ever narrows it.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS access_rules(
            admin_id TEXT NOT NULL,
            collection TEXT NOT NULL,
            can_read INTEGER NOT NULL,
            can_write INTEGER NOT NULL,
            PRIMARY KEY(admin_id, collection)
        )",
        [],
    )?;

    Ok(conn)
}

fn ensure_documents_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "documents", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE documents ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn access_set(
    conn: &Connection,
    admin_id: &str,
    collection: &str,
    can_read: bool,
    can_write: bool,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO access_rules(admin_id, collection, can_read, can_write) VALUES(?, ?, ?, ?)
         ON CONFLICT(admin_id, collection)
         DO UPDATE SET can_read = excluded.can_read, can_write = excluded.can_write",
        (admin_id, collection, can_read as i64, can_write as i64),
    )?;
    Ok(())
}

/// Document store backed by the workspace database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: open_db(workspace)?,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn check_access(&self, collection: &str, admin_id: &str, write: bool) -> StoreResult<()> {
        let rule: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT can_read, can_write FROM access_rules WHERE admin_id = ? AND collection = ?",
                (admin_id, collection),
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let allowed = match rule {
            None => true,
            Some((can_read, can_write)) => {
                if write {
                    can_write != 0
                } else {
                    can_read != 0
                }
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(StoreError::denied(collection))
        }
    }

    fn load_body(&self, collection: &str, admin_id: &str, id: &str) -> StoreResult<Option<Fields>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ? AND admin_id = ?",
                (collection, id, admin_id),
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(Some(parse_body(&s)?)),
            None => Ok(None),
        }
    }

    fn write_body(
        &self,
        collection: &str,
        admin_id: &str,
        id: &str,
        body: &Fields,
    ) -> StoreResult<()> {
        let created_at = body.get("createdAt").and_then(|v| v.as_str());
        let updated_at = body.get("updatedAt").and_then(|v| v.as_str());
        self.conn.execute(
            "INSERT INTO documents(collection, id, admin_id, body, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
               admin_id = excluded.admin_id,
               body = excluded.body,
               created_at = excluded.created_at,
               updated_at = excluded.updated_at",
            (
                collection,
                id,
                admin_id,
                serde_json::to_string(body)?,
                created_at,
                updated_at,
            ),
        )?;
        Ok(())
    }
}

fn parse_body(raw: &str) -> StoreResult<Fields> {
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::Other("document body is not an object".into())),
    }
}

impl RecordStore for SqliteStore {
    fn list(&self, collection: &str, admin_id: &str) -> StoreResult<Vec<Document>> {
        self.check_access(collection, admin_id, false)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ? AND admin_id = ? ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map((collection, admin_id), |row| {
                let id: String = row.get(0)?;
                let body: String = row.get(1)?;
                Ok((id, body))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, body)| {
                Ok(Document {
                    id,
                    body: parse_body(&body)?,
                })
            })
            .collect()
    }

    fn get(&self, collection: &str, admin_id: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_access(collection, admin_id, false)?;
        Ok(self
            .load_body(collection, admin_id, id)?
            .map(|body| Document {
                id: id.to_string(),
                body,
            }))
    }

    fn insert(&mut self, collection: &str, admin_id: &str, mut fields: Fields) -> StoreResult<String> {
        self.check_access(collection, admin_id, true)?;
        let id = Uuid::new_v4().to_string();
        stamp(&mut fields, true);
        self.write_body(collection, admin_id, &id, &fields)?;
        Ok(id)
    }

    fn update(
        &mut self,
        collection: &str,
        admin_id: &str,
        id: &str,
        mut fields: Fields,
    ) -> StoreResult<()> {
        self.check_access(collection, admin_id, true)?;
        let Some(mut body) = self.load_body(collection, admin_id, id)? else {
            return Err(StoreError::Other(format!("{collection}/{id} not found")));
        };
        stamp(&mut fields, false);
        merge_fields(&mut body, fields);
        self.write_body(collection, admin_id, id, &body)
    }

    fn set(
        &mut self,
        collection: &str,
        admin_id: &str,
        id: &str,
        mut fields: Fields,
        merge: bool,
    ) -> StoreResult<()> {
        self.check_access(collection, admin_id, true)?;
        let existing = if merge {
            self.load_body(collection, admin_id, id)?
        } else {
            None
        };
        let body = match existing {
            Some(mut body) => {
                stamp(&mut fields, false);
                merge_fields(&mut body, fields);
                body
            }
            None => {
                stamp(&mut fields, true);
                fields
            }
        };
        self.write_body(collection, admin_id, id, &body)
    }
}
