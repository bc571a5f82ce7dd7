//! Service entry point: scan → process → archive, forever.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use factura::config;
use factura::erp::store::ReferenceStore;
use factura::inbox::scheduler::InboxScheduler;
use factura::pipeline::extraction::FileTextExtractor;
use factura::pipeline::orchestrator::InvoicePipeline;
use factura::pipeline::report::ReportWriter;
use factura::pipeline::standardize::HttpStandardizer;
use factura::pipeline::state::ProcessingRecord;
use factura::rag::embedder::OllamaEmbedder;
use factura::rag::ollama::{OllamaClient, OllamaGenerator};
use factura::rag::orchestrator::KnowledgeEngine;
use factura::rag::reflect::LexicalEvaluator;
use factura::rag::vectordb::SqliteVectorStore;

/// Poll interval when the inbox is empty.
const IDLE_POLL: Duration = Duration::from_secs(2);

/// Pause between batches so a busy inbox cannot spin the CPU.
const BATCH_PAUSE: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    std::fs::create_dir_all(config::app_data_dir())?;

    let reference = Arc::new(ReferenceStore::load(&config::reference_data_dir())?);

    let ollama_url = config::ollama_url();
    let knowledge = Arc::new(KnowledgeEngine::new(
        Box::new(OllamaEmbedder::new(&ollama_url, &config::embedding_model(), 120)),
        Box::new(SqliteVectorStore::open(&config::knowledge_db_path())?),
        Box::new(OllamaGenerator::new(
            OllamaClient::new(&ollama_url, 120),
            &config::completion_model(),
        )),
        Box::new(LexicalEvaluator),
    ));

    let pipeline = InvoicePipeline::new(
        Box::new(FileTextExtractor),
        Box::new(HttpStandardizer::new(&config::translator_url(), 60)),
        reference,
        knowledge,
        ReportWriter::new(&config::reports_dir()),
    );

    let scheduler = InboxScheduler::new(&config::inbox_dir(), &config::processed_dir())?;
    tracing::info!(inbox = %scheduler.watch_dir().display(), "Watching inbox");
    tracing::info!(archive = %scheduler.processed_dir().display(), "Archive folder");

    loop {
        let jobs = match scheduler.scan() {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(error = %e, "Inbox scan failed — retrying");
                std::thread::sleep(IDLE_POLL);
                continue;
            }
        };

        if jobs.is_empty() {
            std::thread::sleep(IDLE_POLL);
            continue;
        }

        tracing::info!(count = jobs.len(), "Found pending invoices");

        for job in jobs {
            // Lost race with an external mover — skip, not an error
            if !job.source_path.exists() {
                tracing::debug!(file = %job.source_path.display(), "File gone before processing");
                continue;
            }

            tracing::info!(file = %job.file_name(), "Starting workflow");

            let record = ProcessingRecord::for_file(&job.source_path, job.metadata.clone());
            let finished = pipeline.process(record);

            tracing::info!(
                file = %finished.file_name,
                status = ?finished.status,
                "Workflow finished"
            );

            // Archive unconditionally — a poison document must not block
            // the queue.
            scheduler.archive(&job.source_path);
        }

        std::thread::sleep(BATCH_PAUSE);
    }
}
