//! Listwise re-ranking of retrieved chunks.
//!
//! The language model sees an indexed candidate list and must answer with a
//! bracketed index list, most relevant first. Anything that goes wrong —
//! model error, unparseable reply, out-of-range indices — degrades to the
//! original similarity order; re-ranking never fails a request.

use regex::Regex;

use super::ollama::LanguageModel;
use super::types::RetrievedChunk;

/// How much of each candidate the ranking model gets to see.
const CANDIDATE_PREVIEW_CHARS: usize = 200;

/// Re-rank `chunks` against `query`, assigning `rank = position + 1` on
/// success. On fallback the input order and ranks are returned untouched.
pub fn rerank(
    model: &dyn LanguageModel,
    query: &str,
    chunks: Vec<RetrievedChunk>,
) -> Vec<RetrievedChunk> {
    if chunks.is_empty() {
        return chunks;
    }

    let prompt = build_ranking_prompt(query, &chunks);

    let reply = match model.complete(&prompt) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Re-ranking call failed — keeping retrieval order");
            return chunks;
        }
    };

    let Some(indices) = parse_index_list(&reply) else {
        tracing::warn!(reply = %reply.chars().take(120).collect::<String>(),
            "Unparseable re-ranking reply — keeping retrieval order");
        return chunks;
    };

    let mut seen = vec![false; chunks.len()];
    let mut reordered = Vec::with_capacity(chunks.len());
    for index in indices {
        if index >= chunks.len() || seen[index] {
            continue;
        }
        seen[index] = true;
        reordered.push(chunks[index].clone());
    }

    if reordered.is_empty() {
        // Every index was out of range — same as an unparseable reply
        return chunks;
    }

    for (position, chunk) in reordered.iter_mut().enumerate() {
        chunk.rank = position + 1;
    }

    reordered
}

fn build_ranking_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let candidates = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let preview: String = c.text.chars().take(CANDIDATE_PREVIEW_CHARS).collect();
            format!("[{i}] {preview}...")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a relevance ranking system.\n\
         QUERY: {query}\n\n\
         CANDIDATES:\n{candidates}\n\n\
         Task: Rank the candidates by relevance to the query.\n\
         Return ONLY a list of indices in order of relevance, e.g., [0, 2, 1]."
    )
}

/// First bracketed integer list in the reply, if any.
fn parse_index_list(reply: &str) -> Option<Vec<usize>> {
    let pattern = Regex::new(r"\[[0-9,\s]*\]").expect("static regex");
    let list = pattern.find(reply)?.as_str();
    serde_json::from_str::<Vec<usize>>(list).ok()
}
