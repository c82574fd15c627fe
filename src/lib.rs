#![deny(missing_docs)]

//! Core library for the Rusty Summary PDF summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Document processing pipeline.
pub mod processing;
/// Summarization client abstraction and provider adapters.
pub mod summarization;
/// Tokenizer abstraction and BPE implementation.
pub mod tokenizer;
