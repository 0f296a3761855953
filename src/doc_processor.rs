use crate::store::models::DocumentContext;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How far into the file the `%PDF-` header may appear.
const PDF_HEADER_WINDOW: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: not a PDF document")]
    UnsupportedFormat,
    #[error("PDF parse error: {0}")]
    Parse(String),
    #[error("Document loader unavailable: {0}")]
    LoaderUnavailable(String),
}

/// A parsed, paginated document.
pub trait LoadedDocument: Send {
    fn num_pages(&self) -> usize;

    /// Text fragments of the page at `index` (0-based), in reading order.
    fn text_items(&self, index: usize) -> Result<Vec<String>, ExtractError>;
}

/// Turns raw bytes into a [`LoadedDocument`]. Injected into [`DocumentExtractor`]
/// so tests can substitute a fake backend.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn LoadedDocument>, ExtractError>;
}

/// Loader backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractLoader;

struct PdfPages {
    pages: Vec<String>,
}

impl LoadedDocument for PdfPages {
    fn num_pages(&self) -> usize {
        self.pages.len()
    }

    fn text_items(&self, index: usize) -> Result<Vec<String>, ExtractError> {
        let page = self
            .pages
            .get(index)
            .ok_or_else(|| ExtractError::Parse(format!("page {} out of range", index + 1)))?;
        Ok(page
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

impl DocumentLoader for PdfExtractLoader {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn LoadedDocument>, ExtractError> {
        if !looks_like_pdf(bytes) {
            return Err(ExtractError::UnsupportedFormat);
        }
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractError::Parse(e.to_string()))?;
        Ok(Box::new(PdfPages { pages }))
    }
}

/// Page-headed text of a whole document and how many pages it had.
#[derive(Debug)]
pub struct ParsedDocument {
    pub content: String,
    pub page_count: usize,
}

/// Render every page as `"Page {n}:\n{fragments joined by ' '}\n"`.
/// Fails as a whole if any page fails.
pub fn render_pages(doc: &dyn LoadedDocument) -> Result<ParsedDocument, ExtractError> {
    let page_count = doc.num_pages();
    let mut content = String::new();
    for index in 0..page_count {
        let items = doc.text_items(index)?;
        content.push_str(&format!("Page {}:\n{}\n", index + 1, items.join(" ")));
    }
    Ok(ParsedDocument {
        content,
        page_count,
    })
}

#[derive(Clone)]
pub struct DocumentExtractor {
    loader: Arc<dyn DocumentLoader>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(Arc::new(PdfExtractLoader))
    }
}

impl DocumentExtractor {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }

    pub fn extract(
        &self,
        bytes: &[u8],
        file_name: Option<String>,
    ) -> Result<DocumentContext, ExtractError> {
        debug!(bytes = bytes.len(), file_name = ?file_name, "extracting document");
        let doc = self.loader.load(bytes)?;
        let parsed = render_pages(doc.as_ref())?;
        info!(
            pages = parsed.page_count,
            chars = parsed.content.len(),
            "document extracted"
        );
        Ok(DocumentContext::new(
            parsed.content,
            file_name,
            parsed.page_count,
        ))
    }

    /// Runs [`extract`](Self::extract) on the blocking pool. A panic inside the
    /// loader is reported as [`ExtractError::LoaderUnavailable`].
    pub async fn extract_blocking(
        &self,
        bytes: Vec<u8>,
        file_name: Option<String>,
    ) -> Result<DocumentContext, ExtractError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&bytes, file_name))
            .await
            .map_err(|e| {
                warn!(error = %e, "document loader task failed");
                ExtractError::LoaderUnavailable(e.to_string())
            })?
    }
}
