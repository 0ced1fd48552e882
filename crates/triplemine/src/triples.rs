use anyhow::Result;
use triplemine_index::{EmbeddingClient, VectorStore};

use crate::logging;
use crate::miner;
use crate::model::{ChunkQuestions, TrainingTriple};

/// Upload phase: every chunk text goes into the index, with or without
/// questions, so unanswered chunks still serve as negative candidates.
pub fn upload_embeddings(
    store: &VectorStore,
    embeddings: &EmbeddingClient,
    chunks: &[ChunkQuestions],
) -> Result<usize> {
    let mut uploaded = 0usize;
    for entry in chunks {
        let vector = embeddings.embed(&entry.chunk.text)?;
        store.upsert(&entry.chunk.text, &vector, &entry.chunk.section_title)?;
        uploaded += 1;
    }
    logging::stage("upload", format!("stored {uploaded} chunk embedding(s)"));
    Ok(uploaded)
}

/// Assembly phase: walk chunks in document order, skip the unanswered
/// ones, and emit one triple per mined negative. Triples are not
/// deduplicated across questions or chunks.
pub fn assemble_triples(
    store: &VectorStore,
    embeddings: &EmbeddingClient,
    chunks: &[ChunkQuestions],
) -> Result<Vec<TrainingTriple>> {
    let mut triples = Vec::new();
    for entry in chunks {
        if !entry.is_satisfied() {
            logging::verbose(format!(
                "skipping unanswered chunk {}:{}",
                entry.chunk.section_index, entry.chunk.chunk_index
            ));
            continue;
        }
        for question in &entry.questions {
            let negatives = miner::mine_negatives(store, embeddings, question, &entry.chunk.text)?;
            for negative in negatives {
                triples.push(TrainingTriple {
                    anchor: question.clone(),
                    positive: entry.chunk.text.clone(),
                    negative,
                });
            }
        }
    }
    logging::stage("mine", format!("assembled {} triple(s)", triples.len()));
    Ok(triples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use triplemine_core::Chunk;
    use triplemine_index::HashEmbedderConfig;

    fn entry(index: usize, text: &str, questions: &[&str]) -> ChunkQuestions {
        ChunkQuestions {
            chunk: Chunk {
                section_title: "Intro".to_string(),
                section_index: 0,
                chunk_index: index,
                text: text.to_string(),
                token_count: 4,
            },
            questions: questions.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn fixture() -> (tempfile::TempDir, VectorStore, EmbeddingClient) {
        let dir = tempdir().unwrap();
        let store = VectorStore::open(dir.path().join("index.db")).unwrap();
        let embeddings = EmbeddingClient::hash(HashEmbedderConfig::default());
        (dir, store, embeddings)
    }

    #[test]
    fn upload_stores_every_chunk() {
        let (_dir, store, embeddings) = fixture();
        let chunks = vec![
            entry(0, "first passage about tokens", &["q"]),
            entry(1, "second passage about retries", &[]),
        ];
        let uploaded = upload_embeddings(&store, &embeddings, &chunks).unwrap();
        assert_eq!(uploaded, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn triples_exclude_the_positive_and_respect_the_cap() {
        let (_dir, store, embeddings) = fixture();
        let chunks = vec![
            entry(0, "neural networks learn representations", &[
                "what do neural networks learn",
            ]),
            entry(1, "tokenizers split text into units", &[]),
            entry(2, "vector stores answer similarity queries", &[]),
            entry(3, "contrastive training needs hard negatives", &[]),
            entry(4, "retry loops bound failure handling", &[]),
            entry(5, "chunkers merge fragments under a budget", &[]),
        ];
        upload_embeddings(&store, &embeddings, &chunks).unwrap();
        let triples = assemble_triples(&store, &embeddings, &chunks).unwrap();
        assert!(!triples.is_empty());
        assert!(triples.len() <= miner::MAX_NEGATIVES_PER_QUESTION);
        for triple in &triples {
            assert_eq!(triple.anchor, "what do neural networks learn");
            assert_eq!(triple.positive, "neural networks learn representations");
            assert_ne!(triple.negative, triple.positive);
        }
    }

    #[test]
    fn unanswered_chunks_contribute_no_triples() {
        let (_dir, store, embeddings) = fixture();
        let chunks = vec![
            entry(0, "a lone unanswered chunk", &[]),
            entry(1, "another unanswered chunk", &[]),
        ];
        upload_embeddings(&store, &embeddings, &chunks).unwrap();
        let triples = assemble_triples(&store, &embeddings, &chunks).unwrap();
        assert!(triples.is_empty());
    }

    #[test]
    fn each_question_contributes_its_own_triples() {
        let (_dir, store, embeddings) = fixture();
        let chunks = vec![
            entry(0, "positives come from the source chunk", &[
                "first question",
                "second question",
            ]),
            entry(1, "an unrelated passage about parsing", &[]),
            entry(2, "an unrelated passage about storage", &[]),
        ];
        upload_embeddings(&store, &embeddings, &chunks).unwrap();
        let triples = assemble_triples(&store, &embeddings, &chunks).unwrap();
        let firsts = triples.iter().filter(|t| t.anchor == "first question").count();
        let seconds = triples
            .iter()
            .filter(|t| t.anchor == "second question")
            .count();
        assert!(firsts > 0);
        assert!(seconds > 0);
    }
}
