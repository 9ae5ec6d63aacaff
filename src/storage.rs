use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use dirs::data_dir;
use rusqlite::{Connection, OptionalExtension, params};
use tempfile::NamedTempFile;

const STORE_USER_VERSION: i32 = 1;
const STORE_MIGRATIONS: &[(i32, &str)] = &[];

#[derive(Debug)]
pub enum StorageError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Encode(err) => write!(f, "encode error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Sqlite(err) => Some(err),
            StorageError::Io(err) => Some(err),
            StorageError::Encode(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        StorageError::Sqlite(value)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Encode(value)
    }
}

/// Keyed storage for serialized favorites documents.
pub trait DocumentStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, document: &str) -> Result<(), StorageError>;
}

/// Global, cross-project store in the user's data directory.
#[derive(Clone, Debug)]
pub struct SqliteDocuments {
    db_path: PathBuf,
}

impl SqliteDocuments {
    pub fn open() -> Result<Self, StorageError> {
        let mut base = data_dir().unwrap_or_else(|| PathBuf::from("."));
        base.push("favorite-groups");
        fs::create_dir_all(&base)?;
        base.push("favorites.sqlite");
        Self::open_in_path(base)
    }

    pub fn open_in_path(db_path: PathBuf) -> Result<Self, StorageError> {
        let store = Self { db_path };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT doc_key FROM documents ORDER BY doc_key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;
        Ok(keys)
    }

    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let conn = self.connection()?;
        let affected = conn.execute("DELETE FROM documents WHERE doc_key = ?1", params![key])?;
        Ok(affected > 0)
    }

    fn initialize_schema(&self) -> rusqlite::Result<()> {
        let conn = Connection::open(&self.db_path)?;
        Self::configure_connection(&conn)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                doc_key TEXT PRIMARY KEY,
                document_json TEXT NOT NULL,
                updated_utc INTEGER NOT NULL
            );
            "#,
        )?;
        Self::apply_migrations(&conn)?;
        Ok(())
    }

    fn connection(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        Self::configure_connection(&conn)?;
        Ok(conn)
    }

    fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(())
    }

    fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
        let mut current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        for (version, sql) in STORE_MIGRATIONS {
            if *version > current {
                conn.execute_batch(sql)?;
                conn.pragma_update(None, "user_version", *version)?;
                current = *version;
            }
        }

        if current < STORE_USER_VERSION {
            conn.pragma_update(None, "user_version", STORE_USER_VERSION)?;
        }

        Ok(())
    }
}

impl DocumentStore for SqliteDocuments {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.connection()?;
        let document = conn
            .query_row(
                "SELECT document_json FROM documents WHERE doc_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(document)
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO documents (doc_key, document_json, updated_utc)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(doc_key) DO UPDATE SET
                document_json = excluded.document_json,
                updated_utc = excluded.updated_utc",
            params![key, document, now],
        )?;
        Ok(())
    }
}

/// Project-scoped store: one `<key>.json` file per document inside `dir`.
#[derive(Clone, Debug)]
pub struct JsonFileDocuments {
    dir: PathBuf,
}

impl JsonFileDocuments {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl DocumentStore for JsonFileDocuments {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.document_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(document.as_bytes())?;
        staged.flush()?;
        staged
            .persist(self.document_path(key))
            .map_err(|err| StorageError::Io(err.error))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocuments {
    documents: RefCell<BTreeMap<String, String>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(key: &str, document: &str) -> Self {
        let store = Self::default();
        store
            .documents
            .borrow_mut()
            .insert(key.to_string(), document.to_string());
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.documents.borrow().get(key).cloned()
    }
}

impl DocumentStore for MemoryDocuments {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        self.documents
            .borrow_mut()
            .insert(key.to_string(), document.to_string());
        Ok(())
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::rc::Rc<T> {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        (**self).save(key, document)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        (**self).save(key, document)
    }
}
