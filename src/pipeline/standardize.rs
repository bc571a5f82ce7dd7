//! Standardization collaborator: translation + schema mapping service.
//!
//! The service receives raw text plus sidecar context and returns a
//! structured payload. `structured_data` is either an invoice in the
//! expected shape or a wrapper carrying an `error` string — the service
//! reports logical failures inside a successful HTTP response, and the
//! orchestrator must check for that explicitly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StandardizeError {
    #[error("Standardization service unreachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Standardization service returned {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Request body for the `/translate` endpoint.
#[derive(Debug, Serialize)]
pub struct StandardizeRequest<'a> {
    pub raw_text: &'a str,
    pub metadata: &'a BTreeMap<String, String>,
    pub target_language: &'a str,
}

/// Response body from the `/translate` endpoint.
///
/// `structured_data` stays untyped here; the orchestrator checks the
/// wrapped-error contract before deserializing it into an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardizeResponse {
    #[serde(default)]
    pub translated_text: String,
    #[serde(default = "unknown_language")]
    pub detected_language: String,
    #[serde(default)]
    pub confidence_score: f64,
    pub structured_data: serde_json::Value,
}

fn unknown_language() -> String {
    "unknown".to_string()
}

/// Standardization abstraction (allows mocking for tests).
pub trait Standardizer: Send + Sync {
    fn standardize(
        &self,
        raw_text: &str,
        metadata: &BTreeMap<String, String>,
        target_language: &str,
    ) -> Result<StandardizeResponse, StandardizeError>;
}

/// HTTP client for the external standardization service.
pub struct HttpStandardizer {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpStandardizer {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Service default: localhost:8001 with a 60 second ceiling per call.
    pub fn default_local() -> Self {
        Self::new("http://localhost:8001", 60)
    }
}

impl Standardizer for HttpStandardizer {
    fn standardize(
        &self,
        raw_text: &str,
        metadata: &BTreeMap<String, String>,
        target_language: &str,
    ) -> Result<StandardizeResponse, StandardizeError> {
        let url = format!("{}/translate", self.base_url);
        let body = StandardizeRequest {
            raw_text,
            metadata,
            target_language,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                StandardizeError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                StandardizeError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                StandardizeError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StandardizeError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| StandardizeError::ResponseParsing(e.to_string()))
    }
}

/// Mock standardizer with a canned outcome and an invocation counter, so
/// tests can assert the stage was (or was not) reached.
pub struct MockStandardizer {
    outcome: Result<StandardizeResponse, String>,
    calls: Arc<AtomicUsize>,
}

impl MockStandardizer {
    pub fn returning(response: StandardizeResponse) -> Self {
        Self {
            outcome: Ok(response),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle for asserting call counts after the mock has been boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Standardizer for MockStandardizer {
    fn standardize(
        &self,
        _raw_text: &str,
        _metadata: &BTreeMap<String, String>,
        _target_language: &str,
    ) -> Result<StandardizeResponse, StandardizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(StandardizeError::HttpClient(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_service_payload() {
        let response: StandardizeResponse = serde_json::from_str(
            r#"{
                "translated_text": "INVOICE #42",
                "detected_language": "de",
                "confidence_score": 0.91,
                "structured_data": {"invoice_no": "42", "line_items": []}
            }"#,
        )
        .unwrap();

        assert_eq!(response.detected_language, "de");
        assert!(response.structured_data.get("invoice_no").is_some());
    }

    #[test]
    fn response_defaults_missing_fields() {
        let response: StandardizeResponse =
            serde_json::from_str(r#"{"structured_data": {"error": "LLM unavailable"}}"#).unwrap();
        assert_eq!(response.detected_language, "unknown");
        assert_eq!(response.confidence_score, 0.0);
    }

    #[test]
    fn mock_counts_invocations() {
        let mock = MockStandardizer::failing("down");
        let calls = mock.call_counter();

        let _ = mock.standardize("text", &BTreeMap::new(), "English");
        let _ = mock.standardize("text", &BTreeMap::new(), "English");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn http_standardizer_trims_trailing_slash() {
        let client = HttpStandardizer::new("http://localhost:8001/", 30);
        assert_eq!(client.base_url, "http://localhost:8001");
    }
}
