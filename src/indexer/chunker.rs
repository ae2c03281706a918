use crate::error::{RagError, Result};
use crate::indexer::loader::Document;

/// A contiguous slice of a document's text. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// `<document id>:<offset>`, stable across rebuilds.
    pub id: String,
    pub document_id: String,
    pub text: String,
    /// Start position in the document, in characters.
    pub offset: usize,
}

/// Fixed-size chunker with overlap, measured in characters.
///
/// Consecutive chunks share exactly `overlap` characters and the final chunk
/// may be shorter than `chunk_size`, so dropping the first `overlap`
/// characters of every chunk after the first and concatenating gives back
/// the original text.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::InvalidInput(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    #[must_use]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into `(char offset, slice)` pairs.
    pub fn split<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        // Byte position of every char boundary, including the end
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = bounds.len() - 1;
        if n == 0 {
            return Vec::new();
        }

        let stride = self.chunk_size - self.overlap;
        let mut pieces = Vec::with_capacity(n.div_ceil(stride));
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(n);
            pieces.push((start, &text[bounds[start]..bounds[end]]));
            if end == n {
                break;
            }
            start += stride;
        }
        pieces
    }

    /// Chunk a document, preserving its identity on every chunk.
    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.raw_text)
            .into_iter()
            .map(|(offset, text)| Chunk {
                id: format!("{}:{offset}", doc.id),
                document_id: doc.id.clone(),
                text: text.to_string(),
                offset,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&c.text);
            } else {
                out.extend(c.text.chars().skip(overlap));
            }
        }
        out
    }

    fn doc(text: &str) -> Document {
        Document::new("doc.txt", text)
    }

    #[test]
    fn test_basic_chunking() {
        let chunker = Chunker::new(10, 0).unwrap();
        let chunks = chunker.chunk(&doc("0123456789abcdefghij"));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "0123456789");
        assert_eq!(chunks[1].text, "abcdefghij");
    }

    #[test]
    fn test_overlap_exact() {
        let chunker = Chunker::new(10, 4).unwrap();
        let chunks = chunker.chunk(&doc("0123456789abcdefghij"));

        // stride 6: 0..10, 6..16, 12..20
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["0123456789", "6789abcdef", "cdefghij"]);
        assert_eq!(
            chunks.iter().map(|c| c.offset).collect::<Vec<_>>(),
            vec![0, 6, 12]
        );
    }

    #[test]
    fn test_no_redundant_tail_chunk() {
        // Last chunk ends exactly at the text end; nothing fully contained after it
        let chunker = Chunker::new(10, 5).unwrap();
        let chunks = chunker.chunk(&doc("0123456789abcdefghij"));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text, "abcdefghij");
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunker = Chunker::new(500, 50).unwrap();
        let text = "Cats are mammals. Cats sleep 12-16 hours a day.";
        let chunks = chunker.chunk(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn test_empty_document() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn test_lossless_reassembly() {
        let text = "The quick brown fox jumps over the lazy dog.\n\nこれは日本語のテストです。 🦀 Rust! ".repeat(7);
        for (size, overlap) in [(1, 0), (7, 3), (16, 15), (64, 10), (1000, 999)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&doc(&text));
            assert_eq!(
                reassemble(&chunks, overlap),
                text,
                "size={size} overlap={overlap}"
            );
            for c in &chunks {
                assert!(c.text.chars().count() <= size);
            }
        }
    }

    #[test]
    fn test_offsets_are_char_positions() {
        let chunker = Chunker::new(3, 1).unwrap();
        let text = "äöüßéñ";
        let chunks = chunker.chunk(&doc(text));
        for c in &chunks {
            let expected: String = text.chars().skip(c.offset).take(3).collect();
            assert_eq!(c.text, expected);
        }
    }

    #[test]
    fn test_chunks_trace_back_to_document() {
        let d = doc("abcdefghijklmnop");
        let chunks = Chunker::new(5, 1).unwrap().chunk(&d);
        for c in &chunks {
            assert_eq!(c.document_id, d.id);
            assert_eq!(c.id, format!("{}:{}", d.id, c.offset));
        }
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(Chunker::new(0, 0), Err(RagError::InvalidInput(_))));
        assert!(matches!(Chunker::new(5, 5), Err(RagError::InvalidInput(_))));
    }
}
