mod embedding;
mod store;

pub use embedding::{EmbeddingBackend, EmbeddingClient, HashEmbedderConfig, OpenAiEmbeddingClient};
pub use store::VectorStore;
