//! Document ingestion and layout.
//!
//! A [`SourceDocument`] holds what was extracted once from the file. A
//! [`Layout`] is derived from it for one page size and is replaced wholesale
//! whenever the page size changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::DocumentBackend;
use crate::format::{page_plain_text, Formatter};
use crate::model::{normalize_whitespace, StyledSegment};
use crate::page_map::{build_page_map, PageMap};
use crate::paginate::{paginate, paginate_plain, styled_from_plain, Pagination};

pub const DEFAULT_MIN_READABLE_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("error loading file: {0:#}")]
    Extraction(anyhow::Error),
    #[error("no readable text found in {file_name}")]
    NoReadableText { file_name: String },
    #[error("unsupported file {file_name}: please open a PDF or text file")]
    UnsupportedFile { file_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else if lower.ends_with(".txt") {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub file_name: String,
    pub kind: DocumentKind,
    /// Whitespace-normalized full text.
    pub content: String,
    /// Formatted segments per source page; empty for text files.
    pub source_segments: Vec<Vec<StyledSegment>>,
}

impl SourceDocument {
    pub fn source_page_count(&self) -> usize {
        self.source_segments.len()
    }

    /// Plain text of every source page, used for word counting.
    pub fn source_texts(&self) -> Vec<String> {
        self.source_segments
            .iter()
            .map(|segments| page_plain_text(segments))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub words_per_page: usize,
    pub pages: Pagination,
    /// Empty for text files.
    pub page_map: PageMap,
}

impl Layout {
    pub fn build(source: &SourceDocument, words_per_page: usize) -> Self {
        let words_per_page = words_per_page.max(1);
        match source.kind {
            DocumentKind::Pdf => {
                let pages = paginate(&source.content, &source.source_segments, words_per_page);
                let page_map = build_page_map(&source.source_texts(), &pages.plain, words_per_page);
                Self {
                    words_per_page,
                    pages,
                    page_map,
                }
            }
            DocumentKind::Text => {
                let plain = paginate_plain(&source.content, words_per_page);
                let styled = styled_from_plain(&plain);
                Self {
                    words_per_page,
                    pages: Pagination { plain, styled },
                    page_map: PageMap::default(),
                }
            }
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: SourceDocument,
    pub layout: Layout,
}

impl Document {
    pub fn new(source: SourceDocument, words_per_page: usize) -> Self {
        let layout = Layout::build(&source, words_per_page);
        Self { source, layout }
    }

    pub fn relayout(&mut self, words_per_page: usize) {
        self.layout = Layout::build(&self.source, words_per_page);
    }
}

/// Progress of a running extraction, in `0.0..=1.0`.
pub type Progress = f32;

#[derive(Debug, Clone, Copy)]
pub struct Ingestor {
    formatter: Formatter,
    min_readable_chars: usize,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(Formatter::default(), DEFAULT_MIN_READABLE_CHARS)
    }
}

impl Ingestor {
    pub fn new(formatter: Formatter, min_readable_chars: usize) -> Self {
        Self {
            formatter,
            min_readable_chars,
        }
    }

    /// Extracts and formats every source page in order, reporting progress
    /// after each one. Any page failure abandons the whole document.
    pub fn ingest_pdf(
        &self,
        backend: &dyn DocumentBackend,
        mut progress: impl FnMut(Progress),
    ) -> Result<SourceDocument, IngestError> {
        let info = backend.info();
        let page_count = backend.page_count();
        let mut source_segments = Vec::with_capacity(page_count);
        let mut full_text = String::new();

        for page_number in 1..=page_count {
            let runs = backend
                .page_runs(page_number)
                .map_err(IngestError::Extraction)?;
            let segments = self.formatter.format_page(&runs);
            full_text.push_str(&page_plain_text(&segments));
            full_text.push(' ');
            source_segments.push(segments);

            debug!(page = page_number, runs = runs.len(), "extracted page text");
            progress(page_number as f32 / page_count as f32);
        }

        let content = self.readable(&info.file_name, &full_text)?;
        info!(
            file = %info.file_name,
            pages = page_count,
            chars = content.len(),
            "ingested pdf"
        );
        Ok(SourceDocument {
            file_name: info.file_name.clone(),
            kind: DocumentKind::Pdf,
            content,
            source_segments,
        })
    }

    pub fn ingest_text(&self, file_name: &str, text: &str) -> Result<SourceDocument, IngestError> {
        let content = normalize_whitespace(text);
        if content.is_empty() {
            return Err(IngestError::NoReadableText {
                file_name: file_name.to_string(),
            });
        }
        info!(file = %file_name, chars = content.len(), "ingested text");
        Ok(SourceDocument {
            file_name: file_name.to_string(),
            kind: DocumentKind::Text,
            content,
            source_segments: Vec::new(),
        })
    }

    fn readable(&self, file_name: &str, full_text: &str) -> Result<String, IngestError> {
        let content = normalize_whitespace(full_text);
        if content.chars().count() <= self.min_readable_chars {
            return Err(IngestError::NoReadableText {
                file_name: file_name.to_string(),
            });
        }
        Ok(content)
    }
}
