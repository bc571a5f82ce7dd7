use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Factura";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    "factura=info".to_string()
}

/// Get the application data directory
/// ~/Factura/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Factura")
}

/// Inbox watched for new invoice documents
pub fn inbox_dir() -> PathBuf {
    app_data_dir().join("inbox")
}

/// Archive for processed documents (moved here after every pipeline run)
pub fn processed_dir() -> PathBuf {
    app_data_dir().join("processed")
}

/// Output directory for report artifacts (JSON / PDF / HTML)
pub fn reports_dir() -> PathBuf {
    app_data_dir().join("reports")
}

/// Directory holding the ERP reference JSON files
/// (PO_Records.json, sku_master.json, vendors.json)
pub fn reference_data_dir() -> PathBuf {
    app_data_dir().join("reference_data")
}

/// SQLite file backing the vector knowledge store
pub fn knowledge_db_path() -> PathBuf {
    app_data_dir().join("knowledge.db")
}

/// Base URL of the standardization/translation service
pub fn translator_url() -> String {
    std::env::var("FACTURA_TRANSLATOR_URL")
        .unwrap_or_else(|_| "http://localhost:8001".to_string())
}

/// Base URL of the local Ollama instance (completion + embeddings)
pub fn ollama_url() -> String {
    std::env::var("FACTURA_OLLAMA_URL")
        .unwrap_or_else(|_| "http://localhost:11434".to_string())
}

/// Completion model used for re-ranking and answer synthesis
pub fn completion_model() -> String {
    std::env::var("FACTURA_COMPLETION_MODEL").unwrap_or_else(|_| "llama3:8b".to_string())
}

/// Embedding model used for chunk and query embeddings
pub fn embedding_model() -> String {
    std::env::var("FACTURA_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "nomic-embed-text".to_string())
}
