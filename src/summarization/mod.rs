//! Abstractions for generating abstractive summaries of individual chunks.
//!
//! The pipeline treats the summarization model as an opaque, potentially slow call: one chunk
//! of text goes in, one summary string comes out. Adapters here speak to a Hugging Face
//! inference endpoint or a local Ollama runtime over HTTP; an offline extractive client covers
//! runs without any model server. No adapter retries or falls back to another provider.

use crate::config::{Config, SummarizationProvider};
use crate::processing::key_points::select_sentences_within_budget;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or reported itself unavailable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Fixed decoding parameters sent with every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    /// Maximum length of the generated summary, in model tokens.
    pub max_length: usize,
    /// Minimum length of the generated summary, in model tokens.
    pub min_length: usize,
    /// Exponential length penalty applied during beam search.
    pub length_penalty: f32,
    /// Beam width.
    pub num_beams: usize,
    /// Stop beam search once every beam has finished.
    pub early_stopping: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 40,
            length_penalty: 2.0,
            num_beams: 4,
            early_stopping: true,
        }
    }
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Prefixed, length-capped chunk text.
    pub input: String,
    /// Generation parameters.
    pub params: GenerationParams,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a summary for a single chunk.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;

    /// Whether the model is steered by the task prompt placed in front of each chunk.
    fn expects_prompt_prefix(&self) -> bool {
        true
    }
}

/// Build the summarization client selected by configuration.
pub fn build_summarization_client(config: &Config) -> Arc<dyn SummarizationClient> {
    match config.summarization_provider {
        SummarizationProvider::HuggingFace => {
            let base_url = config
                .summarization_url
                .clone()
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_URL.to_string());
            Arc::new(HuggingFaceSummarizationClient::new(
                base_url,
                config.summarization_api_token.clone(),
            ))
        }
        SummarizationProvider::Ollama => {
            let base_url = config
                .summarization_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Arc::new(OllamaSummarizationClient::new(base_url))
        }
        SummarizationProvider::Extractive => Arc::new(ExtractiveSummarizationClient),
    }
}

fn http_client(user_agent: &str) -> Client {
    Client::builder()
        .user_agent(user_agent)
        .build()
        .expect("Failed to construct reqwest::Client for summarization")
}

/// Client for Hugging Face style `summarization` inference endpoints.
///
/// Speaks the `POST /models/{model}` contract of the hosted Inference API; self-hosted
/// inference servers exposing the same route work by overriding the base URL.
pub struct HuggingFaceSummarizationClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HuggingFaceSummarizationClient {
    /// Create a client for the given base URL and optional bearer token.
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            http: http_client("rusty-sum/summary"),
            base_url,
            api_token,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}",
            self.base_url.trim_end_matches('/'),
            model.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct HuggingFaceSummary {
    #[serde(alias = "generated_text")]
    summary_text: String,
}

#[async_trait]
impl SummarizationClient for HuggingFaceSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let endpoint = self.endpoint(&request.model);
        let payload = json!({
            "inputs": request.input,
            "parameters": request.params,
        });

        let mut builder = self.http.post(&endpoint).json(&payload);
        if let Some(token) = self.api_token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to reach inference endpoint at {}: {error}",
                self.base_url
            ))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "inference endpoint {endpoint} returned {status}: {body}"
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "inference endpoint returned {status}: {body}"
            )));
        }

        let mut body: Vec<HuggingFaceSummary> = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode inference response: {error}"
            ))
        })?;

        if body.is_empty() {
            return Err(SummarizationClientError::InvalidResponse(
                "inference response contained no summaries".into(),
            ));
        }

        Ok(body.swap_remove(0).summary_text.trim().to_string())
    }
}

/// Client for a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Create a client for the given Ollama base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            http: http_client("rusty-sum/summary"),
            base_url,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        tracing::debug!(
            min_length = request.params.min_length,
            num_beams = request.params.num_beams,
            length_penalty = request.params.length_penalty,
            early_stopping = request.params.early_stopping,
            "Ollama ignores beam search parameters"
        );
        let payload = json!({
            "model": request.model,
            "prompt": request.input,
            "stream": false,
            "options": {
                // Lower temperature for deterministic summaries.
                "temperature": 0.1,
                "num_predict": request.params.max_length,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Offline summarizer that keeps the highest-ranked sentences of each chunk.
///
/// `max_length` is interpreted as a word budget. Chunks reach this client without the prompt
/// prefix, since a prefix would otherwise be kept as part of the first sentence.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizationClient;

#[async_trait]
impl SummarizationClient for ExtractiveSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        Ok(select_sentences_within_budget(&request.input, request.params.max_length).join(" "))
    }

    fn expects_prompt_prefix(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request(input: &str) -> SummarizationRequest {
        SummarizationRequest {
            model: "facebook/bart-large-cnn".into(),
            input: input.into(),
            params: GenerationParams::default(),
        }
    }

    #[tokio::test]
    async fn huggingface_client_sends_generation_parameters() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient::new(server.base_url(), Some("hf_test".into()));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/facebook/bart-large-cnn")
                    .header("authorization", "Bearer hf_test")
                    .json_body(json!({
                        "inputs": "summarize: Some chunk.",
                        "parameters": {
                            "max_length": 150,
                            "min_length": 40,
                            "length_penalty": 2.0,
                            "num_beams": 4,
                            "early_stopping": true
                        }
                    }));
                then.status(200)
                    .json_body(json!([{ "summary_text": "  Chunk summary.  " }]));
            })
            .await;

        let summary = client
            .generate_summary(request("summarize: Some chunk."))
            .await
            .expect("summary");

        mock.assert();
        assert_eq!(summary, "Chunk summary.");
    }

    #[tokio::test]
    async fn huggingface_client_maps_loading_model_to_unavailable() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient::new(server.base_url(), None);

        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/facebook/bart-large-cnn");
                then.status(503)
                    .json_body(json!({ "error": "Model is currently loading" }));
            })
            .await;

        let error = client
            .generate_summary(request("text"))
            .await
            .expect_err("unavailable");
        assert!(
            matches!(error, SummarizationClientError::ProviderUnavailable(message) if message.contains("loading"))
        );
    }

    #[tokio::test]
    async fn huggingface_client_rejects_empty_result_list() {
        let server = MockServer::start_async().await;
        let client = HuggingFaceSummarizationClient::new(server.base_url(), None);

        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/facebook/bart-large-cnn");
                then.status(200).json_body(json!([]));
            })
            .await;

        let error = client
            .generate_summary(request("text"))
            .await
            .expect_err("empty list");
        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{ "stream": false, "options": { "num_predict": 150 } }"#);
                then.status(200).json_body(json!({
                    "response": "Summary text",
                    "done": true
                }));
            })
            .await;

        let summary = client
            .generate_summary(request("Summarize"))
            .await
            .expect("summary");

        mock.assert();
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_summary(request("Summarize"))
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn extractive_client_respects_word_budget() {
        let client = ExtractiveSummarizationClient;
        let mut params = GenerationParams::default();
        params.max_length = 6;
        let summary = client
            .generate_summary(SummarizationRequest {
                model: String::new(),
                input: "Insulin lowers glucose. Glucose rises after meals. Cats sleep.".into(),
                params,
            })
            .await
            .expect("summary");

        assert!(!summary.is_empty());
        assert!(summary.split_whitespace().count() <= 6);
    }
}
