//! Self-evaluation of generated answers.
//!
//! Scores two dimensions against the retrieved context: how much of the
//! question the answer addresses (`answer_relevance`) and how much of the
//! answer is actually supported by the context (`groundedness`). Scoring is
//! deterministic term-overlap — no model call — so the passing gate is
//! reproducible in tests and cheap at runtime.

use std::collections::HashSet;

use super::types::{EvaluationMetric, EvaluationReport, RetrievedChunk};

/// Overall score at or above this passes the gate.
pub const PASS_THRESHOLD: f64 = 0.5;

/// Answer evaluation abstraction
pub trait AnswerEvaluator: Send + Sync {
    fn evaluate(
        &self,
        query: &str,
        answer: &str,
        chunks: &[RetrievedChunk],
    ) -> EvaluationReport;
}

/// Term-overlap evaluator.
pub struct LexicalEvaluator;

impl AnswerEvaluator for LexicalEvaluator {
    fn evaluate(
        &self,
        query: &str,
        answer: &str,
        chunks: &[RetrievedChunk],
    ) -> EvaluationReport {
        let query_terms = content_terms(query);
        let answer_terms = content_terms(answer);
        let context_terms: HashSet<String> = chunks
            .iter()
            .flat_map(|c| content_terms(&c.text))
            .collect();

        let relevance = coverage(&query_terms, &answer_terms);
        let groundedness = coverage(&answer_terms, &context_terms);

        let metrics = vec![
            EvaluationMetric {
                name: "answer_relevance".to_string(),
                score: relevance,
                reason: format!(
                    "{:.0}% of question terms addressed by the answer",
                    relevance * 100.0
                ),
            },
            EvaluationMetric {
                name: "groundedness".to_string(),
                score: groundedness,
                reason: format!(
                    "{:.0}% of answer terms supported by retrieved context",
                    groundedness * 100.0
                ),
            },
        ];

        EvaluationReport::from_metrics(metrics, PASS_THRESHOLD)
    }
}

/// Fraction of `wanted` terms present in `available`; 0 when either side
/// has no content-bearing terms.
fn coverage(wanted: &HashSet<String>, available: &HashSet<String>) -> f64 {
    if wanted.is_empty() || available.is_empty() {
        return 0.0;
    }
    let hits = wanted.iter().filter(|t| available.contains(*t)).count();
    hits as f64 / wanted.len() as f64
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "did", "do", "does", "for", "from", "had",
    "has", "have", "how", "i", "in", "is", "it", "its", "my", "of", "on", "or", "our", "that",
    "the", "their", "there", "this", "to", "was", "we", "were", "what", "when", "where", "which",
    "who", "why", "will", "with", "you", "your",
];

fn content_terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::IngestSource;

    fn chunk(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            score: 0.9,
            source: IngestSource::default(),
            chunk_index: 0,
            rank: 1,
        }
    }

    #[test]
    fn grounded_relevant_answer_passes() {
        let report = LexicalEvaluator.evaluate(
            "Who is the vendor?",
            "The vendor is Acme Corp",
            &[chunk("INVOICE #999 Vendor: Acme Corp Total: 12.00")],
        );

        assert!(report.is_passing, "overall = {}", report.overall_score);
        assert_eq!(report.metrics.len(), 2);
        assert!(report.metrics.iter().all(|m| m.score > 0.9));
    }

    #[test]
    fn fabricated_answer_scores_low_groundedness() {
        let report = LexicalEvaluator.evaluate(
            "Who is the vendor?",
            "Globex Industries headquartered in Springfield",
            &[chunk("INVOICE #999 Vendor: Acme Corp")],
        );

        let groundedness = report
            .metrics
            .iter()
            .find(|m| m.name == "groundedness")
            .unwrap();
        assert_eq!(groundedness.score, 0.0);
    }

    #[test]
    fn no_context_never_passes() {
        let report = LexicalEvaluator.evaluate("Who is the vendor?", "Acme Corp", &[]);
        assert!(!report.is_passing);
    }

    #[test]
    fn off_topic_answer_scores_low_relevance() {
        let report = LexicalEvaluator.evaluate(
            "What is the total amount due?",
            "Acme ships from Rotterdam",
            &[chunk("Total amount due: 12.00 USD. Acme ships from Rotterdam.")],
        );

        let relevance = report
            .metrics
            .iter()
            .find(|m| m.name == "answer_relevance")
            .unwrap();
        assert!(relevance.score < 0.5);
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let report = LexicalEvaluator.evaluate(
            "total total total",
            "total",
            &[chunk("total and more total")],
        );
        for metric in &report.metrics {
            assert!((0.0..=1.0).contains(&metric.score));
        }
        assert!((0.0..=1.0).contains(&report.overall_score));
    }
}
