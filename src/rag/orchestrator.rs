//! Knowledge engine: chunk+index on ingest; retrieve → re-rank →
//! generate → reflect on query.

use super::chunker::OverlapChunker;
use super::embedder::EmbeddingModel;
use super::generate::synthesize;
use super::ollama::LanguageModel;
use super::reflect::AnswerEvaluator;
use super::rerank::rerank;
use super::types::{EvaluationReport, IngestSource, RagAnswer, RetrievedChunk};
use super::vectordb::VectorStore;
use super::RagError;

/// Candidates fetched per question before re-ranking.
pub const DEFAULT_TOP_K: usize = 5;

/// Answer returned when the store holds nothing relevant to retrieve.
const NO_KNOWLEDGE_ANSWER: &str =
    "I don't know — no invoice content has been indexed yet.";

pub struct KnowledgeEngine {
    chunker: OverlapChunker,
    embedder: Box<dyn EmbeddingModel>,
    store: Box<dyn VectorStore>,
    model: Box<dyn LanguageModel>,
    evaluator: Box<dyn AnswerEvaluator>,
}

impl KnowledgeEngine {
    pub fn new(
        embedder: Box<dyn EmbeddingModel>,
        store: Box<dyn VectorStore>,
        model: Box<dyn LanguageModel>,
        evaluator: Box<dyn AnswerEvaluator>,
    ) -> Self {
        Self {
            chunker: OverlapChunker::new(),
            embedder,
            store,
            model,
            evaluator,
        }
    }

    /// Chunk, embed, and upsert a document. Returns the chunk count.
    pub fn ingest(&self, text: &str, source: IngestSource) -> Result<usize, RagError> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            tracing::debug!(file = %source.filename, "Nothing to index");
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = match self.embedder.embed_batch(&texts) {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!(error = %e, "Batch embedding failed — falling back to per-chunk");
                let mut embeddings = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    match self.embedder.embed(&chunk.content) {
                        Ok(embedding) => embeddings.push(embedding),
                        Err(e) => {
                            tracing::warn!(
                                chunk_index = chunk.chunk_index,
                                error = %e,
                                "Chunk embedding failed — storing zero vector"
                            );
                            embeddings.push(vec![0.0; self.embedder.dimension()]);
                        }
                    }
                }
                embeddings
            }
        };

        let stored = self.store.upsert(&chunks, &embeddings, &source)?;
        tracing::info!(file = %source.filename, chunks = stored, "Indexed document");
        Ok(stored)
    }

    /// Similarity search; `rank` is unset on the results.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedChunk>, RagError> {
        let query_embedding = self
            .embedder
            .embed(query)
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;
        self.store.search(&query_embedding, limit)
    }

    /// Full question path: retrieve → re-rank → generate → reflect.
    pub fn ask(&self, query: &str) -> Result<RagAnswer, RagError> {
        tracing::info!(query = %query, "Answering knowledge question");

        let retrieved = self.search(query, DEFAULT_TOP_K)?;
        if retrieved.is_empty() {
            return Ok(RagAnswer {
                answer: NO_KNOWLEDGE_ANSWER.to_string(),
                context: vec![],
                evaluation: EvaluationReport::failing("no indexed context to retrieve"),
            });
        }

        let ranked = rerank(self.model.as_ref(), query, retrieved);
        let answer = synthesize(self.model.as_ref(), query, &ranked)?;
        let evaluation = self.evaluator.evaluate(query, &answer, &ranked);

        tracing::info!(
            score = evaluation.overall_score,
            passing = evaluation.is_passing,
            chunks = ranked.len(),
            "Answer evaluated"
        );

        Ok(RagAnswer {
            answer,
            context: ranked,
            evaluation,
        })
    }
}
