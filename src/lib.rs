//! # ragkb — Local knowledge-base question answering
//!
//! Minimal Retrieval-Augmented Generation over a directory of text files:
//! documents are loaded, chunked, embedded into a SQLite vector store, and
//! at query time the closest chunks are handed to a language model that
//! answers with source attribution.
//!
//! ## Architecture
//!
//! ```text
//! build:  Loader -> Chunker -> Embedder -> VectorStore
//! query:  question -> Retriever -> AnswerGenerator -> Answer { text, provenance }
//! ```
//!
//! - **[`config`]** — Configuration loading and validation
//! - **[`indexer`]** — Document loading, fixed-size overlapping chunking, build phase
//! - **[`embedder`]** — Text embedding (Ollama backend, deterministic mock)
//! - **[`db`]** — SQLite + sqlite-vec vector store (insert, search, persist, load)
//! - **[`retriever`]** — Query embedding + top-k search
//! - **[`generator`]** — Prompt templating and answer generation (Ollama backend, mock)
//! - **[`chat`]** / **[`qa`]** — Conversation history and the question-answering session

pub mod chat;
pub mod config;
pub mod db;
pub mod embedder;
pub mod error;
pub mod generator;
pub mod indexer;
pub mod ollama;
pub mod qa;
pub mod retriever;

pub use error::{RagError, Result};
