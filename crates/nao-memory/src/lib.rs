//! `nao-memory` – long-term memory for the robot.
//!
//! # Modules
//!
//! - [`embedding`] – the [`Embedder`][embedding::Embedder] collaborator:
//!   [`OpenAiEmbedder`][embedding::OpenAiEmbedder] talks to an
//!   OpenAI-compatible `/v1/embeddings` endpoint, and
//!   [`HashEmbedder`][embedding::HashEmbedder] is a deterministic offline
//!   stand-in.
//! - [`store`] – [`SqliteVectorStore`][store::SqliteVectorStore]: one SQLite
//!   table per memory type holding text and embedding vectors, ranked by
//!   cosine similarity; [`MemoryBank`][store::MemoryBank] owns the three
//!   disjoint collections.
//! - [`router`] – [`MemoryRouter`][router::MemoryRouter]: dispatches parsed
//!   memory tool calls to the right collection and folds search hits into a
//!   single context string.

pub mod embedding;
pub mod router;
pub mod store;

pub use embedding::{Embedder, EmbeddingError, HashEmbedder, OpenAiEmbedder};
pub use router::MemoryRouter;
pub use store::{MemoryBank, MemoryError, MemoryRecord, SqliteVectorStore, VectorStore};
