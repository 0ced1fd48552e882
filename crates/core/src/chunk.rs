use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

use crate::section::Section;

static TOKENIZER: Lazy<CoreBPE> = Lazy::new(|| tiktoken_rs::cl100k_base().expect("tokenizer"));

/// Fragments keep their original trailing punctuation, so joining two
/// sentences yields e.g. `"one.. two."`.
const FRAGMENT_SEPARATOR: &str = ". ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub context_window: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            context_window: 512,
        }
    }
}

/// A token-bounded merge of consecutive fragments from one section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub section_title: String,
    pub section_index: usize,
    pub chunk_index: usize,
    pub text: String,
    pub token_count: usize,
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Merges a section's fragments into chunks whose token counts stay
    /// within the context window. A fragment whose own count exceeds the
    /// window is never split; it becomes its own chunk as-is. A section
    /// with a single fragment passes through without a token check.
    pub fn chunk_section(&self, section: &Section) -> Vec<Chunk> {
        let fragments = &section.text_fragments;
        if fragments.is_empty() {
            return Vec::new();
        }
        if fragments.len() == 1 {
            let text = fragments[0].clone();
            let token_count = count_tokens(&text);
            return vec![self.build_chunk(section, 0, text, token_count)];
        }
        let window = self.config.context_window.max(1);
        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        let mut pending_tokens = 0usize;
        for fragment in fragments {
            let fragment_tokens = count_tokens(fragment);
            if !pending.is_empty() && pending_tokens + fragment_tokens > window {
                let chunk_index = chunks.len();
                chunks.push(self.build_chunk(
                    section,
                    chunk_index,
                    pending.join(FRAGMENT_SEPARATOR),
                    pending_tokens,
                ));
                pending.clear();
                pending.push(fragment);
                pending_tokens = fragment_tokens;
            } else {
                pending.push(fragment);
                pending_tokens += fragment_tokens;
            }
        }
        // The trailing accumulator always flushes, even when it holds only
        // the fragment that forced the previous flush.
        if !pending.is_empty() {
            let chunk_index = chunks.len();
            chunks.push(self.build_chunk(
                section,
                chunk_index,
                pending.join(FRAGMENT_SEPARATOR),
                pending_tokens,
            ));
        }
        chunks
    }

    /// Chunks every section, keeping document order across sections.
    pub fn chunk_sections(&self, sections: &[Section]) -> Vec<Chunk> {
        sections
            .iter()
            .flat_map(|section| self.chunk_section(section))
            .collect()
    }

    fn build_chunk(
        &self,
        section: &Section,
        chunk_index: usize,
        text: String,
        token_count: usize,
    ) -> Chunk {
        Chunk {
            section_title: section.title.clone(),
            section_index: section.section_index,
            chunk_index,
            text,
            token_count,
        }
    }
}

pub fn count_tokens(text: &str) -> usize {
    TOKENIZER.encode_with_special_tokens(text).len()
}
