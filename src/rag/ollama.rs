//! Ollama HTTP client for completion calls, and the `LanguageModel`
//! abstraction the re-ranking and synthesis steps depend on.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::RagError;

/// Narrow completion interface so pipeline steps can be tested with
/// deterministic fakes.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, RagError>;
}

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
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

    /// Default Ollama instance at localhost:11434 with a 2-minute timeout.
    pub fn default_local() -> Self {
        Self::new("http://localhost:11434", 120)
    }

    pub fn generate(&self, model: &str, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                RagError::OllamaConnection(self.base_url.clone())
            } else if e.is_timeout() {
                RagError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                RagError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| RagError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// `LanguageModel` backed by an `OllamaClient` with a fixed model name.
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for OllamaGenerator {
    fn complete(&self, prompt: &str) -> Result<String, RagError> {
        self.client.generate(&self.model, prompt)
    }
}

/// Mock model returning scripted responses in order; the last response
/// repeats once the script runs out.
pub struct MockLanguageModel {
    responses: Mutex<VecDeque<String>>,
    last: String,
    fail_with: Option<String>,
}

impl MockLanguageModel {
    pub fn returning(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: response.to_string(),
            fail_with: None,
        }
    }

    pub fn with_responses(responses: Vec<&str>) -> Self {
        let last = responses.last().map(|s| s.to_string()).unwrap_or_default();
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            last,
            fail_with: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: String::new(),
            fail_with: Some(message.to_string()),
        }
    }
}

impl LanguageModel for MockLanguageModel {
    fn complete(&self, _prompt: &str) -> Result<String, RagError> {
        if let Some(message) = &self.fail_with {
            return Err(RagError::HttpClient(message.clone()));
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| RagError::HttpClient("Mock lock poisoned".to_string()))?;

        Ok(responses.pop_front().unwrap_or_else(|| self.last.clone()))
    }
}
