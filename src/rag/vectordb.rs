//! Persistent vector knowledge store.
//!
//! Chunks and their embeddings live in a single SQLite table; search is
//! brute-force cosine similarity over all rows. Append-only — nothing in
//! the design updates a stored vector in place. The connection sits behind
//! a `Mutex` so ingest threads and query callers can share one store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::chunker::TextChunk;
use super::types::{IngestSource, RetrievedChunk};
use super::RagError;

/// Vector store abstraction
pub trait VectorStore: Send + Sync {
    /// Store chunks with their embeddings; returns the number stored.
    fn upsert(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
        source: &IngestSource,
    ) -> Result<usize, RagError>;

    /// Nearest-neighbor search, descending similarity. `rank` is left 0.
    fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError>;
}

/// SQLite-backed store with embeddings as little-endian f32 BLOBs.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    pub fn open(path: &Path) -> Result<Self, RagError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store (for tests).
    pub fn open_in_memory() -> Result<Self, RagError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RagError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                 id          TEXT PRIMARY KEY,
                 filename    TEXT NOT NULL,
                 chunk_index INTEGER NOT NULL,
                 content     TEXT NOT NULL,
                 embedding   BLOB NOT NULL,
                 sender      TEXT,
                 subject     TEXT,
                 language    TEXT,
                 created_at  TEXT NOT NULL
             );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self) -> Result<usize, RagError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RagError> {
        self.conn
            .lock()
            .map_err(|_| RagError::VectorDb("Connection lock poisoned".to_string()))
    }
}

impl VectorStore for SqliteVectorStore {
    fn upsert(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
        source: &IngestSource,
    ) -> Result<usize, RagError> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::VectorDb(
                "Chunk count does not match embedding count".to_string(),
            ));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            conn.execute(
                "INSERT INTO chunks
                     (id, filename, chunk_index, content, embedding,
                      sender, subject, language, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    Uuid::new_v4().to_string(),
                    source.filename,
                    chunk.chunk_index as i64,
                    chunk.content,
                    embedding_to_bytes(embedding),
                    source.sender,
                    source.subject,
                    source.language,
                    now,
                ],
            )?;
        }

        Ok(chunks.len())
    }

    fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content, embedding, filename, chunk_index, sender, subject, language
             FROM chunks",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (content, blob, filename, chunk_index, sender, subject, language) = row?;
            let embedding = bytes_to_embedding(&blob);
            let score = cosine_similarity(query_embedding, &embedding);

            scored.push(RetrievedChunk {
                text: content,
                score,
                source: IngestSource {
                    filename,
                    sender,
                    subject,
                    language,
                },
                chunk_index: chunk_index as usize,
                rank: 0,
            });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
