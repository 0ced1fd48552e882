use anyhow::Result;
use triplemine_index::{EmbeddingClient, VectorStore};

/// How many nearest texts to pull from the index per question.
pub const NEGATIVE_POOL_SIZE: usize = 5;
/// Cap on negatives kept per question.
pub const MAX_NEGATIVES_PER_QUESTION: usize = 3;

/// Negative selection over candidates ordered nearest-first: drop exact
/// matches of the source text, reverse the survivors, and keep the last
/// [`MAX_NEGATIVES_PER_QUESTION`] entries of the reversed list in that
/// order.
pub fn select_negatives(candidates: Vec<String>, source_text: &str) -> Vec<String> {
    let mut survivors: Vec<String> = candidates
        .into_iter()
        .filter(|candidate| candidate != source_text)
        .collect();
    survivors.reverse();
    let start = survivors.len().saturating_sub(MAX_NEGATIVES_PER_QUESTION);
    survivors
        .split_off(start)
        .into_iter()
        .filter(|candidate| candidate != source_text)
        .collect()
}

/// Mines negatives for one question: embed it, query the index, select.
pub fn mine_negatives(
    store: &VectorStore,
    embeddings: &EmbeddingClient,
    question: &str,
    source_text: &str,
) -> Result<Vec<String>> {
    let question_embedding = embeddings.embed(question)?;
    let candidates = store.query(&question_embedding, NEGATIVE_POOL_SIZE)?;
    Ok(select_negatives(candidates, source_text))
}
