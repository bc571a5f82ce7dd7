use serde::{Deserialize, Serialize};

/// Pass-through provenance attached to every chunk of an ingested document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSource {
    pub filename: String,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub language: Option<String>,
}

/// A chunk returned from the knowledge store.
///
/// `rank` is 0 straight out of similarity search; re-ranking assigns
/// `position + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
    pub source: IngestSource,
    pub chunk_index: usize,
    pub rank: usize,
}

/// One scored dimension of an answer evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetric {
    pub name: String,
    pub score: f64,
    pub reason: String,
}

/// Self-evaluation of a generated answer against its retrieved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: Vec<EvaluationMetric>,
    pub overall_score: f64,
    pub is_passing: bool,
}

impl EvaluationReport {
    /// Overall score is the metric mean; the passing gate sits at
    /// `threshold`.
    pub fn from_metrics(metrics: Vec<EvaluationMetric>, threshold: f64) -> Self {
        let overall_score = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.score).sum::<f64>() / metrics.len() as f64
        };

        Self {
            metrics,
            overall_score,
            is_passing: overall_score >= threshold,
        }
    }

    /// A report for answers produced without any supporting context.
    pub fn failing(reason: &str) -> Self {
        Self {
            metrics: vec![EvaluationMetric {
                name: "groundedness".to_string(),
                score: 0.0,
                reason: reason.to_string(),
            }],
            overall_score: 0.0,
            is_passing: false,
        }
    }
}

/// Full result of a knowledge question.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub context: Vec<RetrievedChunk>,
    pub evaluation: EvaluationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_averages_metric_scores() {
        let report = EvaluationReport::from_metrics(
            vec![
                EvaluationMetric {
                    name: "answer_relevance".into(),
                    score: 1.0,
                    reason: String::new(),
                },
                EvaluationMetric {
                    name: "groundedness".into(),
                    score: 0.5,
                    reason: String::new(),
                },
            ],
            0.5,
        );

        assert!((report.overall_score - 0.75).abs() < 1e-9);
        assert!(report.is_passing);
    }

    #[test]
    fn empty_metrics_never_pass() {
        let report = EvaluationReport::from_metrics(vec![], 0.5);
        assert_eq!(report.overall_score, 0.0);
        assert!(!report.is_passing);
    }

    #[test]
    fn failing_report_carries_reason() {
        let report = EvaluationReport::failing("no indexed documents");
        assert!(!report.is_passing);
        assert_eq!(report.metrics[0].reason, "no indexed documents");
    }
}
