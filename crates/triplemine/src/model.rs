use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use triplemine_core::Chunk;

/// A chunk together with the questions the orchestrator settled on. An
/// empty list marks a chunk that exhausted its retries; downstream stages
/// skip those when pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkQuestions {
    pub chunk: Chunk,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl ChunkQuestions {
    pub fn is_satisfied(&self) -> bool {
        !self.questions.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingTriple {
    pub anchor: String,
    pub positive: String,
    pub negative: String,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid json in {}", path.display()))?;
    Ok(value)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
