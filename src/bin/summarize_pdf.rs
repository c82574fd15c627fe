use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rustysum::{
    config::Config,
    logging::{self, ConsoleTarget},
    processing::{KeyPoint, SummaryOutcome, SummaryPipeline, key_points::extract_key_points},
};
use serde::Serialize;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "summarize-pdf",
    about = "Summarize PDF documents with the configured summarization model"
)]
struct Cli {
    /// Tokens per chunk; defaults to SUMMARY_CHUNK_SIZE.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Also print key points derived from each summary.
    #[arg(long)]
    key_points: bool,
    /// Print one JSON object per document.
    #[arg(long)]
    json: bool,
    /// PDF files or directories to search for PDFs.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Serialize)]
struct DocumentReport<'a> {
    path: String,
    summary: &'a str,
    chunk_count: usize,
    chunk_size: usize,
    token_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_points: Option<Vec<KeyPoint>>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing_with(ConsoleTarget::Stderr);

    if cli.chunk_size == Some(0) {
        bail!("--chunk-size must be greater than zero");
    }

    let config = Config::from_env().context("failed to load configuration")?;
    let pipeline = SummaryPipeline::from_config(&config).context("failed to load tokenizer")?;
    let documents = collect_pdfs(&cli.paths)?;
    if documents.is_empty() {
        bail!("no PDF files found");
    }

    let mut failures = 0usize;
    for path in &documents {
        match pipeline.summarize_file(path, cli.chunk_size).await {
            Ok(outcome) => print_outcome(path, &outcome, &cli)?,
            Err(err) => {
                failures += 1;
                tracing::error!(path = %path.display(), error = %err, "Summarization failed");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} documents failed", documents.len());
    }
    Ok(())
}

fn print_outcome(path: &Path, outcome: &SummaryOutcome, cli: &Cli) -> Result<()> {
    let key_points = cli
        .key_points
        .then(|| extract_key_points(&outcome.summary));

    if cli.json {
        let report = DocumentReport {
            path: path.display().to_string(),
            summary: &outcome.summary,
            chunk_count: outcome.chunk_count,
            chunk_size: outcome.chunk_size,
            token_count: outcome.token_count,
            page_count: outcome.page_count,
            key_points,
        };
        let line = serde_json::to_string(&report).context("failed to encode report")?;
        println!("{line}");
        return Ok(());
    }

    println!("== {} ({} chunks)", path.display(), outcome.chunk_count);
    println!("{}", outcome.summary);
    if let Some(points) = key_points {
        for point in points {
            println!("- {}: {}", point.label, point.text);
        }
    }
    println!();
    Ok(())
}

/// Expand the given paths into a list of PDF files.
///
/// Files are taken as given; directories are walked recursively and contribute every file
/// with a `.pdf` extension in any case, sorted by path.
fn collect_pdfs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path) {
                let entry = entry
                    .with_context(|| format!("failed to walk directory {}", path.display()))?;
                if entry.file_type().is_file() && has_pdf_extension(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            documents.extend(found);
        } else if path.exists() {
            documents.push(path.clone());
        } else {
            bail!("path does not exist: {}", path.display());
        }
    }
    Ok(documents)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
