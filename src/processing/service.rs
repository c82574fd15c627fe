//! Summarization pipeline: extraction, chunking, per-chunk summarization, and aggregation.

use crate::{
    config::Config,
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        aggregate::aggregate_summaries,
        chunking::chunk_tokens,
        extract::{extract_document, extract_document_from_path},
        types::{Chunk, ChunkingError, ExtractedDocument, ProcessingError, SummaryOutcome},
    },
    summarization::{
        GenerationParams, SummarizationClient, SummarizationRequest, build_summarization_client,
    },
    tokenizer::{TiktokenTokenizer, Tokenizer, TokenizerError},
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Fixed knobs applied to every pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Default tokens per chunk when the caller does not override it.
    pub chunk_size: usize,
    /// Model identifier forwarded to the summarization client.
    pub model: String,
    /// Generation parameters forwarded with every chunk.
    pub params: GenerationParams,
    /// Text prepended to every chunk before summarization.
    pub prompt_prefix: String,
    /// Token ceiling for the prefixed chunk; longer inputs are truncated.
    pub max_input_tokens: usize,
}

impl PipelineSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            model: config.summarization_model.clone(),
            params: config.generation,
            prompt_prefix: config.prompt_prefix.clone(),
            max_input_tokens: config.max_input_tokens,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            model: "facebook/bart-large-cnn".to_string(),
            params: GenerationParams::default(),
            prompt_prefix: "summarize: ".to_string(),
            max_input_tokens: 1024,
        }
    }
}

/// Runs Extract → Chunk → Summarize-each → Aggregate.
///
/// The tokenizer and summarization client are injected and shared read-only, so one pipeline
/// behind an `Arc` serves any number of concurrent callers. Chunks within a single run are
/// summarized strictly one after another, and the first failure aborts the run.
pub struct SummaryPipeline {
    tokenizer: Arc<dyn Tokenizer>,
    summarizer: Arc<dyn SummarizationClient>,
    settings: PipelineSettings,
    metrics: Arc<SummaryMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummarizationApi: Send + Sync {
    /// Summarize an in-memory PDF.
    async fn summarize_document(
        &self,
        pdf: &[u8],
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Summarize already-extracted text.
    async fn summarize_text(
        &self,
        text: &str,
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryPipeline {
    /// Assemble a pipeline from explicit handles.
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        summarizer: Arc<dyn SummarizationClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            tokenizer,
            summarizer,
            settings,
            metrics: Arc::new(SummaryMetrics::new()),
        }
    }

    /// Load the tokenizer and summarization client named by configuration.
    pub fn from_config(config: &Config) -> Result<Self, TokenizerError> {
        tracing::info!(tokenizer = %config.tokenizer_encoding, "Loading tokenizer");
        let tokenizer = Arc::new(TiktokenTokenizer::from_name(&config.tokenizer_encoding)?);
        tracing::info!(
            provider = ?config.summarization_provider,
            model = %config.summarization_model,
            "Summarization client initialized"
        );
        Ok(Self::new(
            tokenizer,
            build_summarization_client(config),
            PipelineSettings::from_config(config),
        ))
    }

    /// Settings this pipeline was built with.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Summarize an in-memory PDF.
    pub async fn summarize_document(
        &self,
        pdf: &[u8],
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        tracing::info!(bytes = pdf.len(), "Summarizing PDF document");
        let bytes = pdf.to_vec();
        let result = match run_blocking(move || extract_document(&bytes)).await {
            Ok(document) => self.summarize_extracted(document, chunk_size).await,
            Err(error) => Err(error),
        };
        self.observe(result)
    }

    /// Read a PDF from disk and summarize it.
    pub async fn summarize_file(
        &self,
        path: &Path,
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        tracing::info!(path = %path.display(), "Summarizing PDF file");
        let path = path.to_path_buf();
        let result = match run_blocking(move || extract_document_from_path(&path)).await {
            Ok(document) => self.summarize_extracted(document, chunk_size).await,
            Err(error) => Err(error),
        };
        self.observe(result)
    }

    /// Summarize already-extracted text.
    pub async fn summarize_text(
        &self,
        text: &str,
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let result = self.run(text.to_string(), chunk_size, None).await;
        self.observe(result)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn summarize_extracted(
        &self,
        document: ExtractedDocument,
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let page_count = document.page_count();
        tracing::debug!(pages = page_count, "Pages extracted");
        self.run(document.text(), chunk_size, Some(page_count))
            .await
    }

    async fn run(
        &self,
        text: String,
        chunk_size: Option<usize>,
        page_count: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let chunk_size = chunk_size.unwrap_or(self.settings.chunk_size);
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize.into());
        }

        let tokenizer = self.tokenizer.clone();
        let (tokens, chunks) = run_blocking(move || {
            let tokens = tokenizer.encode(&text)?;
            let chunks = chunk_tokens(&tokens, chunk_size, tokenizer.as_ref())?;
            Ok::<_, ProcessingError>((tokens, chunks))
        })
        .await?;
        tracing::info!(
            tokens = tokens.len(),
            chunk_size,
            chunks = chunks.len(),
            "Chunk plan ready"
        );

        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            summaries.push(self.summarize_chunk(chunk).await?);
        }

        let summary = aggregate_summaries(&summaries);
        self.metrics
            .record_document(chunks.len() as u64, chunk_size as u64);
        tracing::info!(
            chunks = chunks.len(),
            summary_chars = summary.len(),
            "Document summarized"
        );

        Ok(SummaryOutcome {
            summary,
            chunk_count: chunks.len(),
            chunk_size,
            token_count: tokens.len(),
            page_count,
        })
    }

    async fn summarize_chunk(&self, chunk: &Chunk) -> Result<String, ProcessingError> {
        let input = self.prepare_input(&chunk.text)?;
        let input_chars = input.len();
        let summary = self
            .summarizer
            .generate_summary(SummarizationRequest {
                model: self.settings.model.clone(),
                input,
                params: self.settings.params,
            })
            .await
            .map_err(|source| ProcessingError::Summarization {
                chunk: chunk.index,
                source,
            })?;
        tracing::debug!(
            chunk = chunk.index,
            tokens = chunk.tokens.len(),
            input_chars,
            output_chars = summary.len(),
            "Chunk summarized"
        );
        Ok(summary.trim().to_string())
    }

    /// Prefix the chunk text and cap it at `max_input_tokens`.
    ///
    /// Clients that are not steered by a prompt receive the bare chunk text.
    fn prepare_input(&self, text: &str) -> Result<String, TokenizerError> {
        let prompt = if self.summarizer.expects_prompt_prefix() {
            format!("{}{}", self.settings.prompt_prefix, text)
        } else {
            text.to_string()
        };
        let tokens = self.tokenizer.encode(&prompt)?;
        if tokens.len() <= self.settings.max_input_tokens {
            return Ok(prompt);
        }
        tracing::debug!(
            tokens = tokens.len(),
            limit = self.settings.max_input_tokens,
            "Truncating model input"
        );
        self.tokenizer
            .decode(&tokens[..self.settings.max_input_tokens])
    }

    fn observe(
        &self,
        result: Result<SummaryOutcome, ProcessingError>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        if let Err(error) = &result {
            self.metrics.record_failure();
            tracing::warn!(error = %error, "Summarization pipeline failed");
        }
        result
    }
}

/// Run CPU-bound parsing or tokenization off the async workers.
async fn run_blocking<T, E, F>(task: F) -> Result<T, ProcessingError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ProcessingError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await?
        .map_err(Into::into)
}

#[async_trait]
impl SummarizationApi for SummaryPipeline {
    async fn summarize_document(
        &self,
        pdf: &[u8],
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        SummaryPipeline::summarize_document(self, pdf, chunk_size).await
    }

    async fn summarize_text(
        &self,
        text: &str,
        chunk_size: Option<usize>,
    ) -> Result<SummaryOutcome, ProcessingError> {
        SummaryPipeline::summarize_text(self, text, chunk_size).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryPipeline::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::extract::test_support::build_pdf;
    use crate::processing::types::ExtractionError;
    use crate::summarization::{ExtractiveSummarizationClient, SummarizationClientError};
    use crate::tokenizer::test_support::CharTokenizer;
    use std::sync::Mutex;

    /// Returns `S{n}.` for call `n` and fails on the configured call.
    #[derive(Default)]
    struct ScriptedClient {
        inputs: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl ScriptedClient {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on: Some(call),
                ..Self::default()
            }
        }

        fn inputs(&self) -> Vec<String> {
            self.inputs.lock().expect("inputs lock").clone()
        }
    }

    #[async_trait]
    impl SummarizationClient for ScriptedClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let call = {
                let mut inputs = self.inputs.lock().expect("inputs lock");
                inputs.push(request.input);
                inputs.len() - 1
            };
            if self.fail_on == Some(call) {
                return Err(SummarizationClientError::GenerationFailed("boom".into()));
            }
            Ok(format!(" S{call}. "))
        }
    }

    fn settings(chunk_size: usize) -> PipelineSettings {
        PipelineSettings {
            chunk_size,
            prompt_prefix: String::new(),
            ..PipelineSettings::default()
        }
    }

    fn pipeline(client: Arc<ScriptedClient>, settings: PipelineSettings) -> SummaryPipeline {
        SummaryPipeline::new(Arc::new(CharTokenizer), client, settings)
    }

    #[tokio::test]
    async fn chunk_summaries_are_joined_in_order() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = pipeline(client.clone(), settings(4));

        let outcome = pipeline
            .summarize_text("abcdefghij", None)
            .await
            .expect("outcome");

        assert_eq!(client.inputs(), vec!["abcd", "efgh", "ij"]);
        assert_eq!(outcome.summary, "S0. S1. S2.");
        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(outcome.chunk_size, 4);
        assert_eq!(outcome.token_count, 10);
        assert_eq!(outcome.page_count, None);

        let snapshot = pipeline.metrics_snapshot();
        assert_eq!(snapshot.documents_summarized, 1);
        assert_eq!(snapshot.chunks_summarized, 3);
        assert_eq!(snapshot.last_chunk_size, Some(4));
    }

    #[tokio::test]
    async fn failure_on_middle_chunk_discards_partial_summary() {
        let client = Arc::new(ScriptedClient::failing_on(1));
        let pipeline = pipeline(client.clone(), settings(2));

        let error = pipeline
            .summarize_text("aabbcc", None)
            .await
            .expect_err("second chunk fails");

        assert!(matches!(
            error,
            ProcessingError::Summarization { chunk: 1, .. }
        ));
        // The third chunk is never attempted.
        assert_eq!(client.inputs(), vec!["aa", "bb"]);

        let snapshot = pipeline.metrics_snapshot();
        assert_eq!(snapshot.documents_summarized, 0);
        assert_eq!(snapshot.failed_documents, 1);
    }

    #[tokio::test]
    async fn per_call_chunk_size_overrides_default() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = pipeline(client.clone(), settings(1024));

        let outcome = pipeline
            .summarize_text("abcdef", Some(3))
            .await
            .expect("outcome");
        assert_eq!(outcome.chunk_count, 2);
        assert_eq!(outcome.chunk_size, 3);

        let error = pipeline.summarize_text("abcdef", Some(0)).await.unwrap_err();
        assert!(matches!(
            error,
            ProcessingError::Chunking(ChunkingError::InvalidChunkSize)
        ));
    }

    #[tokio::test]
    async fn prefix_is_added_and_input_is_capped() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = pipeline(
            client.clone(),
            PipelineSettings {
                chunk_size: 6,
                prompt_prefix: "summarize: ".into(),
                max_input_tokens: 14,
                ..PipelineSettings::default()
            },
        );

        pipeline
            .summarize_text("abcdefgh", None)
            .await
            .expect("outcome");

        assert_eq!(client.inputs(), vec!["summarize: abc", "summarize: gh"]);
    }

    #[tokio::test]
    async fn extractive_summaries_never_carry_the_prompt_prefix() {
        let pipeline = SummaryPipeline::new(
            Arc::new(TiktokenTokenizer::from_name("r50k_base").expect("tokenizer")),
            Arc::new(ExtractiveSummarizationClient),
            PipelineSettings::default(),
        );

        let outcome = pipeline
            .summarize_text("Insulin lowers glucose. Glucose rises after meals.", None)
            .await
            .expect("outcome");

        assert_eq!(
            outcome.summary,
            "Insulin lowers glucose. Glucose rises after meals."
        );
    }

    #[tokio::test]
    async fn configured_extractive_pipeline_uses_default_prefix_safely() {
        let config = Config::from_lookup(|key| match key {
            "SUMMARIZATION_PROVIDER" => Some("extractive".into()),
            "SUMMARIZATION_MODEL" => Some("sentence-rank".into()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.prompt_prefix, "summarize: ");

        let pipeline = SummaryPipeline::from_config(&config).expect("pipeline");
        let pdf = build_pdf(&[Some("Dosage was halved. Symptoms resolved within a week.")])
            .expect("pdf");
        let outcome = pipeline
            .summarize_document(&pdf, None)
            .await
            .expect("outcome");

        assert!(!outcome.summary.contains("summarize"));
        assert!(outcome.summary.starts_with("Dosage was halved."));
    }

    #[tokio::test]
    async fn empty_text_produces_empty_summary_without_model_calls() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = pipeline(client.clone(), settings(8));

        let outcome = pipeline.summarize_text("", None).await.expect("outcome");
        assert_eq!(outcome.summary, "");
        assert_eq!(outcome.chunk_count, 0);
        assert!(client.inputs().is_empty());
    }

    #[tokio::test]
    async fn pdf_documents_flow_through_every_stage() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = pipeline(client.clone(), settings(1024));
        let pdf = build_pdf(&[Some("Hello world.")]).expect("pdf");

        let outcome = pipeline
            .summarize_document(&pdf, None)
            .await
            .expect("outcome");

        assert_eq!(client.inputs(), vec!["Hello world."]);
        assert_eq!(outcome.summary, "S0.");
        assert_eq!(outcome.page_count, Some(1));
    }

    #[tokio::test]
    async fn unreadable_pdf_never_reaches_the_model() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = pipeline(client.clone(), settings(1024));

        let error = pipeline
            .summarize_document(&build_pdf(&[None]).expect("pdf"), None)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ProcessingError::Extraction(ExtractionError::Empty)
        ));
        assert!(client.inputs().is_empty());
        assert_eq!(pipeline.metrics_snapshot().failed_documents, 1);
    }

    #[tokio::test]
    async fn shared_pipeline_serves_concurrent_callers() {
        let client = Arc::new(ScriptedClient::default());
        let pipeline = Arc::new(pipeline(client.clone(), settings(4)));

        let handles: Vec<_> = ["aaaa", "bbbbbbbb", "cc"]
            .into_iter()
            .map(|text| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.summarize_text(text, None).await })
            })
            .collect();

        let mut chunk_total = 0;
        for handle in handles {
            chunk_total += handle.await.expect("join").expect("outcome").chunk_count;
        }

        assert_eq!(chunk_total, 4);
        assert_eq!(client.inputs().len(), 4);
        assert_eq!(pipeline.metrics_snapshot().documents_summarized, 3);
    }
}
