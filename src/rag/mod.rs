pub mod chunker;
pub mod embedder;
pub mod generate;
pub mod ollama;
pub mod orchestrator;
pub mod reflect;
pub mod rerank;
pub mod types;
pub mod vectordb;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Ollama connection failed: {0}")]
    OllamaConnection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned {status}: {body}")]
    OllamaError { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Vector store error: {0}")]
    VectorDb(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
