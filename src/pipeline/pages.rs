//! Page extraction: read the text layer of every PDF page via lopdf.
//!
//! lopdf parses the document in pure Rust and decodes text straight from the
//! page content streams, so no rasteriser or native library is involved.
//! Parsing is CPU-bound and synchronous; [`extract_pages`] moves it onto
//! `spawn_blocking` so async callers never stall a runtime worker.
//!
//! Scanned pages without a text layer come back blank and are dropped unless
//! the extractor is told to keep empty pages.

use crate::error::SummaryError;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-chunk provenance, copied unmodified from the page it came from.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One extracted PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Raw page text as decoded from the content stream.
    pub text: String,
    /// 1-based position in the source document.
    pub page_number: usize,
    /// `"n/m"` where `m` is the document's total page count.
    pub page_label: String,
    /// Path the page was read from.
    pub source_path: String,
}

impl Page {
    /// The provenance every chunk of this page carries.
    pub fn metadata(&self) -> Metadata {
        let mut m = Metadata::new();
        m.insert("source_path".into(), self.source_path.clone().into());
        m.insert("page_number".into(), self.page_number.into());
        m.insert("page_label".into(), self.page_label.clone().into());
        m
    }

    /// `true` when the page has no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Document page count, read back from the label's denominator.
    pub fn total_pages(&self) -> Option<usize> {
        self.page_label.split_once('/')?.1.parse().ok()
    }
}

/// Reads a PDF into an ordered list of [`Page`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageExtractor {
    include_empty: bool,
}

impl PageExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep pages whose text is empty or whitespace-only.
    pub fn include_empty(mut self, include: bool) -> Self {
        self.include_empty = include;
        self
    }

    /// Load `path` and extract every page. Blocking.
    pub fn extract(&self, path: &Path) -> Result<Vec<Page>, SummaryError> {
        if !path.exists() {
            return Err(SummaryError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }

        let doc = Document::load(path).map_err(|e| SummaryError::ExtractionFailure {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        if doc.is_encrypted() {
            return Err(SummaryError::ExtractionFailure {
                path: path.to_path_buf(),
                detail: "document is encrypted".into(),
            });
        }

        Ok(self.extract_document(&doc, &path.display().to_string()))
    }

    /// Extract pages from an already-loaded document.
    pub fn extract_document(&self, doc: &Document, source_path: &str) -> Vec<Page> {
        let page_map = doc.get_pages();
        let total = page_map.len();
        info!("PDF loaded: {} pages", total);

        let mut pages = Vec::with_capacity(total);
        for (idx, page_no) in page_map.keys().enumerate() {
            let page_number = idx + 1;
            let text = match doc.extract_text(&[*page_no]) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Page {}: text extraction failed: {}", page_number, e);
                    String::new()
                }
            };

            let page = Page {
                text,
                page_number,
                page_label: format!("{page_number}/{total}"),
                source_path: source_path.to_string(),
            };

            if page.is_blank() && !self.include_empty {
                debug!("Dropping blank page {}", page.page_label);
                continue;
            }
            pages.push(page);
        }
        pages
    }
}

/// Extract pages on the blocking pool.
pub async fn extract_pages(path: &Path, include_empty: bool) -> Result<Vec<Page>, SummaryError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        PageExtractor::new()
            .include_empty(include_empty)
            .extract(&path)
    })
    .await
    .map_err(|e| SummaryError::Internal(format!("Page extraction task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> Page {
        Page {
            text: text.into(),
            page_number: 2,
            page_label: "2/7".into(),
            source_path: "/cases/a.pdf".into(),
        }
    }

    #[test]
    fn metadata_carries_provenance() {
        let m = page("x").metadata();
        assert_eq!(m["source_path"], "/cases/a.pdf");
        assert_eq!(m["page_number"], 2);
        assert_eq!(m["page_label"], "2/7");
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn total_pages_comes_from_label() {
        assert_eq!(page("x").total_pages(), Some(7));
        let odd = Page { page_label: "iv".into(), ..page("x") };
        assert_eq!(odd.total_pages(), None);
    }

    #[test]
    fn whitespace_only_page_is_blank() {
        assert!(page(" \n\t ").is_blank());
        assert!(!page(" a ").is_blank());
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = PageExtractor::new()
            .extract(Path::new("/no/such/case.pdf"))
            .unwrap_err();
        assert!(matches!(err, SummaryError::SourceNotFound { .. }));
    }

    #[test]
    fn garbage_file_is_extraction_failure() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, b"%PDF-1.5\nthis is not really a pdf").unwrap();
        let err = PageExtractor::new().extract(f.path()).unwrap_err();
        assert!(matches!(err, SummaryError::ExtractionFailure { .. }), "got: {err}");
    }
}
