//! Source document normalization into a plain-text corpus
//!
//! Wraps pdf-extract with error handling for:
//! - Encrypted PDFs
//! - Scanned/image-only PDFs
//! - Corrupted PDFs
//!
//! Hyperlink annotations are part of the signal (portfolio/LinkedIn/GitHub
//! URLs often exist only as link targets, not visible text), so each page's
//! link targets are appended to the corpus after that page's text.

use lopdf::{Document, Object, ObjectId};

use crate::error::PipelineError;

/// Declared content kind of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    PlainText,
    Pdf,
}

/// One page of a paginated document: visible text plus hyperlink targets
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub text: String,
    pub links: Vec<String>,
}

/// Detect document kind from magic bytes
pub fn detect_kind(bytes: &[u8]) -> SourceKind {
    if bytes.starts_with(b"%PDF") {
        SourceKind::Pdf
    } else {
        SourceKind::PlainText
    }
}

/// Turn raw document bytes into a single UTF-8 corpus string.
///
/// Failures are recoverable: the caller keeps its session and may retry
/// with a different file.
pub fn extract_corpus(bytes: &[u8], kind: SourceKind) -> Result<String, PipelineError> {
    match kind {
        SourceKind::PlainText => decode_plain_text(bytes),
        SourceKind::Pdf => {
            let pages = extract_pdf_pages(bytes)?;
            let corpus = join_pages(&pages);
            if corpus.trim().is_empty() {
                return Err(PipelineError::Extraction(
                    "document contains no extractable text (scanned or image-only?)".to_string(),
                ));
            }
            println!(
                "[EXTRACT] {} page(s), {} link(s), {} bytes of text",
                pages.len(),
                pages.iter().map(|p| p.links.len()).sum::<usize>(),
                corpus.len()
            );
            Ok(corpus)
        }
    }
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, PipelineError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        PipelineError::Decode(format!(
            "invalid UTF-8 sequence at byte {}",
            e.utf8_error().valid_up_to()
        ))
    })
}

/// Extract per-page visible text and link annotations from PDF bytes
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<Page>, PipelineError> {
    let texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PipelineError::Extraction(format!("PDF text extraction failed: {}", e)))?;

    // Annotations are best-effort: text extraction already succeeded, so a
    // parse failure here only loses link targets, not the document.
    let links_by_page: Vec<Vec<String>> = match Document::load_mem(bytes) {
        Ok(doc) => {
            let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
            page_ids.iter().map(|&id| page_links(&doc, id)).collect()
        }
        Err(e) => {
            eprintln!("[EXTRACT] skipping link annotations: {}", e);
            Vec::new()
        }
    };

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            text,
            links: links_by_page.get(i).cloned().unwrap_or_default(),
        })
        .collect())
}

/// Follow an indirect reference, or return the object itself
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj.as_reference() {
        Ok(id) => doc.get_object(id).unwrap_or(obj),
        Err(_) => obj,
    }
}

/// Collect URI targets of /Link annotations on one page
fn page_links(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let mut links = Vec::new();

    let page = match doc.get_object(page_id).and_then(|o| o.as_dict()) {
        Ok(dict) => dict,
        Err(_) => return links,
    };
    let annots = match page.get(b"Annots").map(|o| resolve(doc, o)).and_then(|o| o.as_array()) {
        Ok(array) => array,
        Err(_) => return links,
    };

    for annot in annots {
        let dict = match resolve(doc, annot).as_dict() {
            Ok(dict) => dict,
            Err(_) => continue,
        };
        let is_link = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|name| name == b"Link")
            .unwrap_or(false);
        if !is_link {
            continue;
        }
        let uri = dict
            .get(b"A")
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict())
            .ok()
            .and_then(|action| action.get(b"URI").ok())
            .and_then(|o| o.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).to_string());
        if let Some(uri) = uri {
            links.push(uri);
        }
    }

    links
}

/// Concatenate pages in document order: each page's text, then its link
/// targets one per line
pub fn join_pages(pages: &[Page]) -> String {
    let mut parts = Vec::new();
    for page in pages {
        let text = page.text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
        for link in &page.links {
            parts.push(link.clone());
        }
    }
    parts.join("\n")
}
