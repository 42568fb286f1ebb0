//! Vector collections for long-term memory.
//!
//! Each [`MemoryType`] gets its own collection. A collection persists
//! [`MemoryRecord`]s (text plus embedding) to SQLite and answers
//! nearest-neighbour queries by cosine similarity.
//!
//! # Storage layout
//!
//! One table per collection, named after
//! [`MemoryType::collection_name`] (`semantic_collection`, …):
//!
//! | column     | type | description                                  |
//! |------------|------|----------------------------------------------|
//! | id         | TEXT | creation-time identifier, primary key        |
//! | created_at | TEXT | RFC-3339 creation time (UTC)                 |
//! | document   | TEXT | the remembered text                          |
//! | embedding  | BLOB | little-endian f32 vector (4 × N bytes)       |
//!
//! Records are immutable: there is no update or delete path, and inserting a
//! duplicate id is an error rather than a replacement.
//!
//! # Example
//!
//! ```rust
//! use nao_memory::store::{MemoryBank, VectorStore};
//! use nao_types::MemoryType;
//!
//! let bank = MemoryBank::open_in_memory().unwrap();
//! let semantic = bank.store(MemoryType::Semantic);
//! semantic.add("Ana's favourite colour is blue", vec![0.1, 0.9, 0.3]).unwrap();
//!
//! let hits = semantic.query(&[0.1, 0.9, 0.3], 1).unwrap();
//! assert_eq!(hits[0].0.text, "Ana's favourite colour is blue");
//!
//! // Other namespaces never see it.
//! assert!(bank.store(MemoryType::Episodic).query(&[0.1, 0.9, 0.3], 1).unwrap().is_empty());
//! ```

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use nao_types::{MemoryType, NaoError};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from memory collection operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Embedding vectors must be non-empty")]
    DimensionMismatch,
    #[error("Memory collection lock poisoned")]
    LockPoisoned,
}

impl From<MemoryError> for NaoError {
    fn from(e: MemoryError) -> Self {
        NaoError::Memory(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryRecord
// ─────────────────────────────────────────────────────────────────────────────

/// A single remembered text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Creation-time identifier, unique within its collection.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub embedding: Vec<f32>,
    pub memory_type: MemoryType,
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding serialisation helpers
// ─────────────────────────────────────────────────────────────────────────────

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Compute the cosine similarity between two equal-length vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Build a record identifier from its creation time and the collection's
/// insert sequence number.
fn record_id(created_at: &DateTime<Utc>, seq: u64) -> String {
    format!("{}-{seq:04}", created_at.format("%Y-%m-%d_%H-%M-%S%.6f"))
}

// ─────────────────────────────────────────────────────────────────────────────
// VectorStore
// ─────────────────────────────────────────────────────────────────────────────

/// A named collection of embedded texts.
pub trait VectorStore: Send + Sync {
    /// The namespace this collection serves.
    fn memory_type(&self) -> MemoryType;

    /// Assign an identifier and insert a new record. Identifier assignment and
    /// insertion happen atomically with respect to other `add` calls.
    fn add(&self, text: &str, embedding: Vec<f32>) -> Result<MemoryRecord, MemoryError>;

    /// Return up to `n_results` records ranked by cosine similarity to
    /// `embedding` (highest first). Records of a different dimension are
    /// skipped.
    fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, MemoryError>;

    /// Number of stored records.
    fn len(&self) -> Result<usize, MemoryError>;

    fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len()? == 0)
    }
}

struct Inner {
    conn: Connection,
    /// Monotonic insert counter; disambiguates records created within the
    /// same clock tick.
    seq: u64,
}

/// SQLite-backed [`VectorStore`].
pub struct SqliteVectorStore {
    memory_type: MemoryType,
    inner: Mutex<Inner>,
}

impl SqliteVectorStore {
    /// Open (or create) the collection for `memory_type` in the database at
    /// `path`.
    pub fn open(path: &str, memory_type: MemoryType) -> Result<Self, MemoryError> {
        Self::with_connection(Connection::open(path)?, memory_type)
    }

    /// Open the collection in a private in-memory database.
    pub fn open_in_memory(memory_type: MemoryType) -> Result<Self, MemoryError> {
        Self::with_connection(Connection::open_in_memory()?, memory_type)
    }

    fn with_connection(conn: Connection, memory_type: MemoryType) -> Result<Self, MemoryError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id         TEXT NOT NULL PRIMARY KEY,
                created_at TEXT NOT NULL,
                document   TEXT NOT NULL,
                embedding  BLOB NOT NULL
            );",
            memory_type.collection_name()
        ))?;
        let seq: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", memory_type.collection_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(Self {
            memory_type,
            inner: Mutex::new(Inner {
                conn,
                seq: seq as u64,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, MemoryError> {
        self.inner.lock().map_err(|_| MemoryError::LockPoisoned)
    }

    fn all_records(&self, conn: &Connection) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, created_at, document, embedding FROM {} ORDER BY rowid ASC",
            self.memory_type.collection_name()
        ))?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let ts_str: String = row.get(1)?;
            let text: String = row.get(2)?;
            let blob: Vec<u8> = row.get(3)?;
            Ok((id, ts_str, text, blob))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, ts_str, text, blob) = row?;
            let created_at = ts_str.parse::<DateTime<Utc>>().map_err(|e| {
                rusqlite::Error::InvalidColumnType(1, e.to_string(), rusqlite::types::Type::Text)
            })?;
            records.push(MemoryRecord {
                id,
                created_at,
                text,
                embedding: bytes_to_embedding(&blob),
                memory_type: self.memory_type,
            });
        }
        Ok(records)
    }
}

impl VectorStore for SqliteVectorStore {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    fn add(&self, text: &str, embedding: Vec<f32>) -> Result<MemoryRecord, MemoryError> {
        if embedding.is_empty() {
            return Err(MemoryError::DimensionMismatch);
        }
        let mut inner = self.lock()?;
        inner.seq += 1;
        let created_at = Utc::now();
        let record = MemoryRecord {
            id: record_id(&created_at, inner.seq),
            created_at,
            text: text.to_string(),
            embedding,
            memory_type: self.memory_type,
        };
        inner.conn.execute(
            &format!(
                "INSERT INTO {} (id, created_at, document, embedding) VALUES (?1, ?2, ?3, ?4)",
                self.memory_type.collection_name()
            ),
            params![
                record.id,
                record.created_at.to_rfc3339(),
                record.text,
                embedding_to_bytes(&record.embedding),
            ],
        )?;
        debug!(memory_type = %self.memory_type, id = %record.id, "memory record stored");
        Ok(record)
    }

    fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, MemoryError> {
        if embedding.is_empty() {
            return Err(MemoryError::DimensionMismatch);
        }
        let inner = self.lock()?;
        let mut scored: Vec<(MemoryRecord, f32)> = self
            .all_records(&inner.conn)?
            .into_iter()
            .filter(|r| r.embedding.len() == embedding.len())
            .map(|r| {
                let score = cosine_similarity(&r.embedding, embedding);
                (r, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(n_results);
        Ok(scored)
    }

    fn len(&self) -> Result<usize, MemoryError> {
        let inner = self.lock()?;
        let n: i64 = inner.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.memory_type.collection_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryBank
// ─────────────────────────────────────────────────────────────────────────────

/// The three disjoint memory collections, constructed once and passed to
/// whoever needs them.
pub struct MemoryBank {
    semantic: Box<dyn VectorStore>,
    episodic: Box<dyn VectorStore>,
    procedural: Box<dyn VectorStore>,
}

impl MemoryBank {
    /// Open (or create) all three collections in the SQLite file at `path`.
    pub fn open(path: &str) -> Result<Self, MemoryError> {
        Ok(Self {
            semantic: Box::new(SqliteVectorStore::open(path, MemoryType::Semantic)?),
            episodic: Box::new(SqliteVectorStore::open(path, MemoryType::Episodic)?),
            procedural: Box::new(SqliteVectorStore::open(path, MemoryType::Procedural)?),
        })
    }

    /// Three private in-memory collections; contents are lost on drop.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        Ok(Self {
            semantic: Box::new(SqliteVectorStore::open_in_memory(MemoryType::Semantic)?),
            episodic: Box::new(SqliteVectorStore::open_in_memory(MemoryType::Episodic)?),
            procedural: Box::new(SqliteVectorStore::open_in_memory(MemoryType::Procedural)?),
        })
    }

    /// Assemble a bank from caller-provided collections (e.g. test doubles).
    pub fn from_stores(
        semantic: Box<dyn VectorStore>,
        episodic: Box<dyn VectorStore>,
        procedural: Box<dyn VectorStore>,
    ) -> Self {
        Self {
            semantic,
            episodic,
            procedural,
        }
    }

    pub fn store(&self, memory_type: MemoryType) -> &dyn VectorStore {
        match memory_type {
            MemoryType::Semantic => self.semantic.as_ref(),
            MemoryType::Episodic => self.episodic.as_ref(),
            MemoryType::Procedural => self.procedural.as_ref(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
