use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use triplemine_core::{load_sections, Chunker, ChunkerConfig};
use triplemine_index::VectorStore;
use triplemine_llm::{LlmClient, LlmRequest, LlmResponse};

use crate::config::PipelineConfig;
use crate::logging;
use crate::model::{self, ChunkQuestions};
use crate::retry;
use crate::triples;

pub const QUESTIONS_FILE: &str = "chunks_with_questions.json";
pub const TRIPLES_FILE: &str = "training_data.json";

/// Phase one: parsed sections in, chunks with questions out.
pub fn questions_phase(
    input: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<PathBuf> {
    let sections = load_sections(input)
        .with_context(|| format!("failed to load parsed sections from {}", input.display()))?;
    logging::stage("chunk", format!("chunking {} section(s)", sections.len()));
    let chunker = Chunker::new(ChunkerConfig {
        context_window: config.context_window,
    });
    let chunks = chunker.chunk_sections(&sections);
    let client = LlmClient::new(config.llm_config());
    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    let invoke = |system: Option<&str>, user: &str| -> Result<LlmResponse> {
        runtime.block_on(client.chat(&LlmRequest {
            system: system.map(|s| s.to_string()),
            user: user.to_string(),
        }))
    };
    let with_questions = retry::orchestrate(chunks, &invoke)?;
    let satisfied = with_questions
        .iter()
        .filter(|entry| entry.is_satisfied())
        .count();
    logging::stage(
        "questions",
        format!("{satisfied}/{} chunk(s) satisfied", with_questions.len()),
    );
    let path = output_dir.join(QUESTIONS_FILE);
    model::write_json(&path, &with_questions)?;
    logging::info(format!("chunk questions written to {}", path.display()));
    Ok(path)
}

/// Phase two: upload every chunk embedding, then mine negatives and write
/// the triple dataset. All writes to the index happen before the first
/// query.
pub fn mine_phase(
    questions_path: &Path,
    db_path: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<PathBuf> {
    let chunks: Vec<ChunkQuestions> = model::read_json(questions_path)?;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let store = VectorStore::open(db_path)
        .with_context(|| format!("failed to open index at {}", db_path.display()))?;
    let embeddings = config.embedding_client();
    triples::upload_embeddings(&store, &embeddings, &chunks)?;
    let assembled = triples::assemble_triples(&store, &embeddings, &chunks)?;
    let path = output_dir.join(TRIPLES_FILE);
    model::write_json(&path, &assembled)?;
    logging::info(format!("training triples written to {}", path.display()));
    Ok(path)
}

pub fn full_pipeline(
    input: &Path,
    db_path: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<()> {
    let questions_path = questions_phase(input, output_dir, config)?;
    mine_phase(&questions_path, db_path, output_dir, config)?;
    Ok(())
}
