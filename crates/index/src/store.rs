use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use bytemuck::{cast_slice, try_cast_slice};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Append-only embedding index over SQLite. The workflow writes every
/// record before the first query, so the store exposes no update or delete
/// operations.
#[derive(Clone)]
pub struct VectorStore {
    path: PathBuf,
}

impl VectorStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.init()?;
        Ok(store)
    }

    fn connection(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    fn init(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS embeddings (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;
        Ok(())
    }

    /// Inserts one record under a freshly generated id and returns the id.
    pub fn upsert(&self, text: &str, embedding: &[f32], title: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let blob = cast_slice::<f32, u8>(embedding);
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO embeddings (id, title, text, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, text, blob],
        )?;
        Ok(id)
    }

    /// Returns the `k` stored texts nearest to `query_embedding`, ordered
    /// nearest-to-farthest by cosine similarity.
    pub fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT text, embedding FROM embeddings")?;
        let mut rows = stmt.query([])?;
        let mut hits: Vec<(String, f32)> = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            let embedding: &[f32] =
                try_cast_slice(&blob).map_err(|_| anyhow!("invalid embedding blob"))?;
            let score = cosine_similarity(query_embedding, embedding);
            hits.push((text, score));
        }
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if hits.len() > k {
            hits.truncate(k);
        }
        Ok(hits.into_iter().map(|(text, _)| text).collect())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut a_norm = 0.0f32;
    let mut b_norm = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    dot / (a_norm.sqrt() * b_norm.sqrt())
}
