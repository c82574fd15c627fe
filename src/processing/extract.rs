//! PDF text extraction.
//!
//! Pages are read in page-number order and their text concatenated. Extraction is
//! all-or-nothing: an unreadable page aborts the document instead of being skipped, and a
//! document whose text is empty or whitespace-only is rejected.

use super::types::{ExtractedDocument, ExtractionError};
use lopdf::Document;
use std::path::Path;

/// Extract the per-page text of an in-memory PDF.
pub fn extract_document(bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    let document =
        Document::load_mem(bytes).map_err(|error| ExtractionError::Load(error.to_string()))?;
    if document.is_encrypted() {
        return Err(ExtractionError::Encrypted);
    }

    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    for page in page_numbers {
        let text = document
            .extract_text(&[page])
            .map_err(|error| ExtractionError::Page {
                page,
                message: error.to_string(),
            })?;
        // lopdf terminates every text object with a newline; drop that artifact.
        pages.push(text.trim_end().to_string());
    }

    let extracted = ExtractedDocument { pages };
    if extracted.pages.iter().all(|page| page.trim().is_empty()) {
        return Err(ExtractionError::Empty);
    }

    tracing::debug!(pages = extracted.page_count(), "Extracted PDF text");
    Ok(extracted)
}

/// Extract the full text of an in-memory PDF.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    extract_document(bytes).map(|document| document.text())
}

/// Read a PDF from disk and extract its per-page text.
///
/// Blocking; async callers run it on the blocking pool.
pub fn extract_document_from_path(path: &Path) -> Result<ExtractedDocument, ExtractionError> {
    let bytes = std::fs::read(path)?;
    extract_document(&bytes)
}

/// In-memory PDF fixtures for unit and integration tests.
#[doc(hidden)]
pub mod test_support {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Build a PDF whose pages each draw one line of text; `None` pages are blank.
    pub fn build_pdf(pages: &[Option<&str>]) -> lopdf::Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let operations = match page {
                Some(text) => vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                None => Vec::new(),
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode()?,
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}
