//! Document summarization pipeline: extraction, token chunking, per-chunk summarization, and
//! aggregation.

pub mod aggregate;
pub mod chunking;
pub mod extract;
pub mod key_points;
mod service;
pub mod types;

pub use service::{PipelineSettings, SummarizationApi, SummaryPipeline};
pub use types::{
    Chunk, ChunkingError, ExtractedDocument, ExtractionError, KeyPoint, ProcessingError,
    SummaryOutcome,
};
