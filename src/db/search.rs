use rusqlite::params;

use super::entries::{ENTRY_COLUMNS, entry_from_row};
use super::models::SearchResult;
use super::{VectorStore, serialize_vector};
use crate::error::{RagError, Result};

fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchResult> {
    let distance: f64 = row.get(6)?;
    Ok(SearchResult {
        entry: entry_from_row(row)?,
        score: (1.0 - distance) as f32,
    })
}

impl VectorStore {
    /// Exact nearest-neighbour search by cosine similarity.
    ///
    /// Results are sorted by descending score; equal scores keep insertion
    /// order. Asking for more than the store holds returns everything, and
    /// an empty store returns an empty list. A zero-norm query (or stored
    /// vector) has no direction, so its pairs score 0.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {ENTRY_COLUMNS},
                    COALESCE(vec_distance_cosine(v.embedding, ?), 1.0) AS distance
             FROM chunks c
             JOIN documents d ON c.document_id = d.id
             JOIN vec_chunks v ON v.rowid = c.id
             ORDER BY distance ASC, c.id ASC
             LIMIT ?"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![serialize_vector(query), k as i64],
            map_search_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
