use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use super::models::{IndexEntry, StoreInfo};
use super::{VectorStore, deserialize_vector, serialize_vector};
use crate::error::{RagError, Result};
use crate::indexer::chunker::Chunk;

/// Column order expected by [`entry_from_row`].
pub(crate) const ENTRY_COLUMNS: &str =
    "c.chunk_key, d.doc_key, d.source_path, c.content, c.char_offset, v.embedding";

pub(crate) fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexEntry> {
    let blob: Vec<u8> = row.get(5)?;
    Ok(IndexEntry {
        chunk: Chunk {
            id: row.get(0)?,
            document_id: row.get(1)?,
            text: row.get(3)?,
            offset: row.get::<_, i64>(4)? as usize,
        },
        source_path: row.get(2)?,
        embedding: deserialize_vector(&blob),
    })
}

fn insert_entries(conn: &Connection, entries: &[IndexEntry], now: DateTime<Utc>) -> rusqlite::Result<()> {
    let mut doc_ids: HashMap<&str, i64> = HashMap::new();

    for entry in entries {
        let doc_id = match doc_ids.get(entry.chunk.document_id.as_str()) {
            Some(id) => *id,
            None => {
                let id: i64 = conn.query_row(
                    r#"
                    INSERT INTO documents (doc_key, source_path, indexed_at)
                    VALUES (?, ?, ?)
                    ON CONFLICT(doc_key) DO UPDATE SET
                        source_path = excluded.source_path,
                        indexed_at = excluded.indexed_at
                    RETURNING id
                    "#,
                    params![entry.chunk.document_id, entry.source_path, now],
                    |row| row.get(0),
                )?;
                doc_ids.insert(entry.chunk.document_id.as_str(), id);
                id
            }
        };

        // Upsert keeps the row id, so an overwritten chunk keeps its slot
        let chunk_id: i64 = conn.query_row(
            r#"
            INSERT INTO chunks (chunk_key, document_id, char_offset, content)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(chunk_key) DO UPDATE SET
                document_id = excluded.document_id,
                char_offset = excluded.char_offset,
                content = excluded.content
            RETURNING id
            "#,
            params![
                entry.chunk.id,
                doc_id,
                entry.chunk.offset as i64,
                entry.chunk.text
            ],
            |row| row.get(0),
        )?;

        conn.execute("DELETE FROM vec_chunks WHERE rowid = ?", params![chunk_id])?;
        conn.execute(
            "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
            params![chunk_id, serialize_vector(&entry.embedding)],
        )?;
    }

    Ok(())
}

fn clear_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "DELETE FROM vec_chunks;
         DELETE FROM chunks;
         DELETE FROM documents;",
    )
}

impl VectorStore {
    /// Every embedding must have the store's width and a non-zero norm;
    /// cosine similarity is undefined for the zero vector.
    fn check_vectors(&self, entries: &[IndexEntry]) -> Result<()> {
        for e in entries {
            if e.embedding.len() != self.dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: e.embedding.len(),
                });
            }
            if e.embedding.iter().all(|v| *v == 0.0) {
                return Err(RagError::InvalidInput(format!(
                    "chunk {} has a zero-norm embedding",
                    e.chunk.id
                )));
            }
        }
        Ok(())
    }

    /// Append entries in one transaction.
    ///
    /// Duplicate chunk ids are last-write-wins: the later entry replaces the
    /// text and embedding but keeps the original insertion position, which
    /// is what search uses to break score ties.
    pub fn add(&mut self, entries: &[IndexEntry]) -> Result<()> {
        self.check_vectors(entries)?;

        let tx = self.conn.transaction()?;
        insert_entries(&tx, entries, Utc::now())?;
        tx.commit()?;

        debug!("Added {} entries", entries.len());
        Ok(())
    }

    /// Clear the store and insert `entries`, recording the embedding model.
    /// Readers see either the old contents or the new ones, never a mix.
    pub fn replace_all(&mut self, entries: &[IndexEntry], embedding_model: &str) -> Result<()> {
        self.check_vectors(entries)?;

        let now = Utc::now();
        let tx = self.conn.transaction()?;
        clear_tables(&tx)?;
        insert_entries(&tx, entries, now)?;
        Self::set_meta(&tx, "embedding_model", embedding_model)?;
        Self::set_meta(&tx, "built_at", &now.to_rfc3339())?;
        tx.commit()?;
        Ok(())
    }

    /// Remove every document, chunk and embedding.
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        clear_tables(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Number of stored chunks.
    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Source paths of all indexed documents, sorted.
    pub fn list_sources(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_path FROM documents ORDER BY source_path")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }

    /// Every stored entry in insertion order.
    pub fn entries(&self) -> Result<Vec<IndexEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM chunks c
             JOIN documents d ON c.document_id = d.id
             JOIN vec_chunks v ON v.rowid = c.id
             ORDER BY c.id"
        ))?;
        let rows = stmt.query_map([], entry_from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn info(&self) -> Result<StoreInfo> {
        let documents: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let built_at = self
            .get_meta("built_at")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(StoreInfo {
            dimensions: self.dimensions,
            documents: documents as usize,
            chunks: self.len()?,
            embedding_model: self.get_meta("embedding_model")?,
            built_at,
        })
    }
}
