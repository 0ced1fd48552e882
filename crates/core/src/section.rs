use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Raw shape of one entry in the external parser's output: a section title
/// mapped to its start page and ordered text fragments.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedSection {
    #[serde(default)]
    pub start_page: Option<u32>,
    #[serde(default)]
    pub text_contents: Vec<String>,
}

/// A named span of source content with an explicit document-order index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub start_page: Option<u32>,
    pub section_index: usize,
    pub text_fragments: Vec<String>,
}

pub fn load_sections(path: &Path) -> Result<Vec<Section>> {
    if !path.exists() {
        return Err(CoreError::MissingInput(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    sections_from_json(&raw)
}

/// Decodes the parser mapping and assigns each section its position. The
/// mapping is read with insertion order preserved; the index is what the
/// rest of the pipeline orders by.
pub fn sections_from_json(raw: &str) -> Result<Vec<Section>> {
    let parsed: IndexMap<String, ParsedSection> = serde_json::from_str(raw)?;
    Ok(parsed
        .into_iter()
        .enumerate()
        .map(|(section_index, (title, entry))| Section {
            title,
            start_page: entry.start_page,
            section_index,
            text_fragments: entry.text_contents,
        })
        .collect())
}
