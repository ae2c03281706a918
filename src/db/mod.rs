//! Vector store backed by SQLite and sqlite-vec.
//!
//! One database file holds the documents, their chunks, and a `vec0`
//! virtual table with one embedding per chunk. The embedding width is fixed
//! when the store is created and recorded in `store_meta`.
use std::path::Path;
use std::sync::Once;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use sqlite_vec::sqlite3_vec_init;
use tracing::{debug, info};

use crate::error::{RagError, Result};

pub mod entries;
pub mod models;
pub mod search;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_key TEXT NOT NULL UNIQUE,
    source_path TEXT NOT NULL,
    indexed_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chunk_key TEXT NOT NULL UNIQUE,
    document_id INTEGER NOT NULL,
    char_offset INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
"#;

const REQUIRED_TABLES: [&str; 4] = ["store_meta", "documents", "chunks", "vec_chunks"];

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Persistent mapping from chunk identity to (embedding, text, source).
pub struct VectorStore {
    pub(crate) conn: Connection,
    dimensions: usize,
}

impl VectorStore {
    /// Open the store at `path`, creating the file and schema if needed.
    ///
    /// An existing store must have been created with the same dimensionality.
    pub fn create<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening vector store: {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        init_sqlite_vec();
        let conn = Connection::open(path)?;
        Self::init(conn, dimensions)
    }

    /// Open a fresh in-memory store (useful for testing).
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        Self::init(conn, dimensions)
    }

    /// Load an existing store for reading and writing.
    ///
    /// Fails with `StoreCorrupt` if the file is missing or not a store.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Load an existing store read-only. Any number of read-only handles
    /// may search the same file concurrently.
    pub fn load_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn init(conn: Connection, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::InvalidInput(
                "store dimensions must be positive".to_string(),
            ));
        }

        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        debug!("sqlite-vec version: {}", vec_version);

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(v) => {
                let stored = parse_dimensions(&v)?;
                if stored != dimensions {
                    return Err(RagError::DimensionMismatch {
                        expected: stored,
                        actual: dimensions,
                    });
                }
            }
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('dimensions', ?)",
                    params![dimensions.to_string()],
                )?;
            }
        }

        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(embedding FLOAT[{dimensions}]);"
        ))?;

        Ok(Self { conn, dimensions })
    }

    fn load_with_flags(path: &Path, flags: OpenFlags) -> Result<Self> {
        if !path.is_file() {
            return Err(RagError::StoreCorrupt(format!(
                "no vector store at {}",
                path.display()
            )));
        }

        init_sqlite_vec();
        let corrupt = |e: rusqlite::Error| {
            RagError::StoreCorrupt(format!("{}: {e}", path.display()))
        };

        let conn = Connection::open_with_flags(path, flags).map_err(corrupt)?;

        let tables: usize = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN (?, ?, ?, ?)",
                params_from_iter(REQUIRED_TABLES),
                |row| row.get(0),
            )
            .map_err(corrupt)?;
        if tables != REQUIRED_TABLES.len() {
            return Err(RagError::StoreCorrupt(format!(
                "{} is missing store tables",
                path.display()
            )));
        }

        let dims: String = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .map_err(corrupt)?;
        let dimensions = parse_dimensions(&dims)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(corrupt)?;

        info!(
            "Loaded vector store {} ({} dimensions)",
            path.display(),
            dimensions
        );
        Ok(Self { conn, dimensions })
    }

    /// Embedding width this store accepts.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Write a consistent snapshot of the store to `path`, replacing any
    /// file already there.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        self.conn
            .execute("VACUUM INTO ?", params![path.to_string_lossy().into_owned()])?;
        info!("Persisted vector store to {}", path.display());
        Ok(())
    }

    pub(crate) fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO store_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub(crate) fn get_meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

fn parse_dimensions(value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(RagError::StoreCorrupt(format!(
            "invalid dimensions in store_meta: {value:?}"
        ))),
    }
}

/// Helper to serialize a float32 vector into bytes for vec0 virtual table
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Inverse of [`serialize_vector`].
pub fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_db_init() {
        let store = VectorStore::open_in_memory(8).expect("Failed to open in-memory store");

        let tables: usize = store
            .conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name IN ('store_meta', 'documents', 'chunks', 'vec_chunks');",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
        assert_eq!(store.dimensions(), 8);
        assert_eq!(store.get_meta("dimensions").unwrap().as_deref(), Some("8"));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            VectorStore::open_in_memory(0),
            Err(RagError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_serialize_vector() {
        let vec = vec![1.0, 2.0, -3.5];
        let bytes = serialize_vector(&vec);
        assert_eq!(bytes.len(), 12);

        // 1.0f32 in hex: 0x3f800000 -> little endian: 00 00 80 3f
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x80, 0x3f]);
        // -3.5f32 in hex: 0xc0600000 -> little endian: 00 00 60 c0
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x60, 0xc0]);

        assert_eq!(deserialize_vector(&bytes), vec);
    }

    #[test]
    fn test_load_missing_is_corrupt() {
        let dir = tempdir().unwrap();
        let err = VectorStore::load(dir.path().join("absent.db")).err().unwrap();
        assert!(matches!(err, RagError::StoreCorrupt(_)));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, "this is definitely not a sqlite database\n".repeat(100)).unwrap();
        let err = VectorStore::load_read_only(&path).err().unwrap();
        assert!(matches!(err, RagError::StoreCorrupt(_)), "got {err:?}");
    }

    #[test]
    fn test_load_foreign_sqlite_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE unrelated (x INTEGER);").unwrap();
        }
        let err = VectorStore::load(&path).err().unwrap();
        assert!(matches!(err, RagError::StoreCorrupt(_)));
    }

    #[test]
    fn test_create_then_reopen_checks_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/index.db");
        drop(VectorStore::create(&path, 4).unwrap());

        assert!(VectorStore::create(&path, 4).is_ok());
        assert!(matches!(
            VectorStore::create(&path, 5),
            Err(RagError::DimensionMismatch {
                expected: 4,
                actual: 5
            })
        ));
        assert_eq!(VectorStore::load(&path).unwrap().dimensions(), 4);
    }
}
