//! Answer synthesis from re-ranked context chunks.

use super::ollama::LanguageModel;
use super::types::RetrievedChunk;
use super::RagError;

/// Synthesize an answer strictly from the given chunks, each attributed to
/// its source document. The model is told to admit ignorance rather than
/// fabricate when the context does not contain the answer.
pub fn synthesize(
    model: &dyn LanguageModel,
    query: &str,
    chunks: &[RetrievedChunk],
) -> Result<String, RagError> {
    let context = chunks
        .iter()
        .map(|c| format!("[Source: {}] {}", c.source.filename, c.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = format!(
        "You are an expert Invoice Auditor Assistant.\n\
         Use the following CONTEXT to answer the QUESTION.\n\
         If the answer is not in the context, say \"I don't know\".\n\n\
         CONTEXT:\n{context}\n\n\
         QUESTION: {query}\n\n\
         ANSWER:"
    );

    model.complete(&prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::ollama::MockLanguageModel;
    use crate::rag::types::IngestSource;

    fn chunk(filename: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            score: 0.8,
            source: IngestSource {
                filename: filename.to_string(),
                ..IngestSource::default()
            },
            chunk_index: 0,
            rank: 1,
        }
    }

    #[test]
    fn returns_model_answer() {
        let model = MockLanguageModel::returning("The vendor is Acme Corp.");
        let answer = synthesize(
            &model,
            "Who is the vendor?",
            &[chunk("invoice_999.txt", "Vendor: Acme Corp")],
        )
        .unwrap();
        assert_eq!(answer, "The vendor is Acme Corp.");
    }

    #[test]
    fn model_failure_propagates() {
        let model = MockLanguageModel::failing("down");
        assert!(synthesize(&model, "q", &[]).is_err());
    }

    #[test]
    fn context_attributes_each_chunk_to_its_source() {
        // Assemble the same context string the prompt embeds
        let chunks = [
            chunk("invoice_999.txt", "Vendor: Acme Corp"),
            chunk("invoice_1000.txt", "Total: 50.00 USD"),
        ];
        let context = chunks
            .iter()
            .map(|c| format!("[Source: {}] {}", c.source.filename, c.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        assert!(context.contains("[Source: invoice_999.txt] Vendor: Acme Corp"));
        assert!(context.contains("[Source: invoice_1000.txt] Total: 50.00 USD"));
    }
}
