//! rollcall-store — Schemaless document collections backed by SQLite.
//!
//! Every document is a JSON object stored under a named collection. The
//! store assigns each document an `_id` and preserves insertion order.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Registered attendees and their facial encodings.
pub const FACE_ENCODINGS: &str = "face_encodings";
/// Presence events.
pub const ATTENDANCE: &str = "attendance";

/// Field holding the store-assigned document id.
pub const ID_FIELD: &str = "_id";

/// A loosely-schematized record.
pub type Document = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt document {id}: {source}")]
    Corrupt {
        id: String,
        source: serde_json::Error,
    },
    #[error("document is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Create, query and bulk-delete documents in named collections.
pub trait DocumentStore: Send + Sync {
    /// Insert a document, returning its assigned `_id`.
    fn insert(&self, collection: &str, document: Document) -> Result<String, StoreError>;

    /// Every document in the collection, in insertion order.
    fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// The first document whose fields equal every field of `filter`.
    fn find_one(&self, collection: &str, filter: &Document) -> Result<Option<Document>, StoreError>;

    /// Remove every document in the collection, returning how many were removed.
    fn delete_all(&self, collection: &str) -> Result<usize, StoreError>;
}

/// Database file named by a connection string; a `sqlite://` prefix is optional.
pub fn path_from_url(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("sqlite://").unwrap_or(url))
}

/// True if `document` carries every field of `filter` with an equal value.
pub fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

/// [`DocumentStore`] on a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "could not create database directory");
                }
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "record store opened");
        Self::init(conn)
    }

    /// A private in-memory database, discarded on drop.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                 seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                 id         TEXT NOT NULL UNIQUE,
                 collection TEXT NOT NULL,
                 body       TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS documents_collection ON documents(collection, seq);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn decode(id: String, body: &str) -> Result<Document, StoreError> {
    let mut document: Document =
        serde_json::from_str(body).map_err(|source| StoreError::Corrupt { id: id.clone(), source })?;
    document.insert(ID_FIELD.to_string(), Value::String(id));
    Ok(document)
}

impl DocumentStore for SqliteStore {
    fn insert(&self, collection: &str, mut document: Document) -> Result<String, StoreError> {
        document.remove(ID_FIELD);
        let id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::to_string(&document)?;

        self.lock()?.execute(
            "INSERT INTO documents (id, collection, body) VALUES (?1, ?2, ?3)",
            params![id, collection, body],
        )?;
        tracing::debug!(collection, id = %id, "document inserted");
        Ok(id)
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            documents.push(decode(id, &body)?);
        }
        Ok(documents)
    }

    fn find_one(&self, collection: &str, filter: &Document) -> Result<Option<Document>, StoreError> {
        if let Some(Value::String(id)) = filter.get(ID_FIELD) {
            let body: Option<String> = self
                .lock()?
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            return match body {
                Some(body) => {
                    let document = decode(id.clone(), &body)?;
                    Ok(matches_filter(&document, filter).then_some(document))
                }
                None => Ok(None),
            };
        }

        Ok(self
            .find_all(collection)?
            .into_iter()
            .find(|document| matches_filter(document, filter)))
    }

    fn delete_all(&self, collection: &str) -> Result<usize, StoreError> {
        let removed = self
            .lock()?
            .execute("DELETE FROM documents WHERE collection = ?1", params![collection])?;
        tracing::info!(collection, removed, "collection cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_insert_assigns_id_and_preserves_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert(ATTENDANCE, doc(json!({"name": "ada", "status": "present"}))).unwrap();
        store.insert(ATTENDANCE, doc(json!({"roll_number": "7", "status": "present"}))).unwrap();

        let all = store.find_all(ATTENDANCE).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0][ID_FIELD], json!(first));
        assert_eq!(all[0]["name"], "ada");
        assert_eq!(all[1]["roll_number"], "7");
    }

    #[test]
    fn test_collections_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(FACE_ENCODINGS, doc(json!({"name": "ada"}))).unwrap();
        assert!(store.find_all(ATTENDANCE).unwrap().is_empty());
        assert_eq!(store.find_all(FACE_ENCODINGS).unwrap().len(), 1);
    }

    #[test]
    fn test_find_one_filters_on_every_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(ATTENDANCE, doc(json!({"roll_number": "7", "status": "absent"}))).unwrap();
        store.insert(ATTENDANCE, doc(json!({"roll_number": "7", "status": "present"}))).unwrap();

        let hit = store
            .find_one(ATTENDANCE, &doc(json!({"roll_number": "7", "status": "present"})))
            .unwrap()
            .unwrap();
        assert_eq!(hit["status"], "present");

        assert!(store
            .find_one(ATTENDANCE, &doc(json!({"roll_number": "8"})))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_one_by_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert(ATTENDANCE, doc(json!({"name": "grace"}))).unwrap();
        let hit = store.find_one(ATTENDANCE, &doc(json!({"_id": &id}))).unwrap().unwrap();
        assert_eq!(hit["name"], "grace");
        assert!(store.find_one(FACE_ENCODINGS, &doc(json!({"_id": &id}))).unwrap().is_none());
    }

    #[test]
    fn test_delete_all_empties_collection() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(ATTENDANCE, doc(json!({"name": "a"}))).unwrap();
        store.insert(ATTENDANCE, doc(json!({"name": "b"}))).unwrap();
        store.insert(FACE_ENCODINGS, doc(json!({"name": "a"}))).unwrap();

        assert_eq!(store.delete_all(ATTENDANCE).unwrap(), 2);
        assert!(store.find_all(ATTENDANCE).unwrap().is_empty());
        assert_eq!(store.find_all(FACE_ENCODINGS).unwrap().len(), 1);
    }

    #[test]
    fn test_caller_supplied_id_is_replaced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert(ATTENDANCE, doc(json!({"_id": "mine", "name": "x"}))).unwrap();
        assert_ne!(id, "mine");
        assert_eq!(store.find_all(ATTENDANCE).unwrap()[0][ID_FIELD], json!(id));
    }

    #[test]
    fn test_path_from_url() {
        assert_eq!(path_from_url("sqlite:///var/lib/rollcall.db"), PathBuf::from("/var/lib/rollcall.db"));
        assert_eq!(path_from_url("data/rollcall.db"), PathBuf::from("data/rollcall.db"));
    }

    #[test]
    fn test_reopen_file_persists() {
        let path = std::env::temp_dir().join(format!("rollcall-store-{}.db", uuid::Uuid::new_v4()));
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(ATTENDANCE, doc(json!({"name": "kept"}))).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.find_all(ATTENDANCE).unwrap()[0]["name"], "kept");
        let _ = std::fs::remove_file(&path);
    }
}
