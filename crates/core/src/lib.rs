mod chunk;
mod error;
mod section;

pub use chunk::{count_tokens, Chunk, Chunker, ChunkerConfig};
pub use error::{CoreError, Result};
pub use section::{load_sections, sections_from_json, ParsedSection, Section};
