use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::model::{PositionedRun, Viewport};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("3f0d5c2e-8a41-5b7e-9c6d-1e2f4a7b9c30").expect("valid namespace UUID")
});

/// Documents are identified by file name, so a book keeps its progress when
/// the same file is opened again from another directory.
pub fn document_id_for_name(file_name: &str) -> DocumentId {
    Uuid::new_v5(&DOCUMENT_NAMESPACE, file_name.as_bytes())
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub file_name: String,
    pub path: Option<PathBuf>,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderRequest {
    /// 1-based, like the page map entries.
    pub page_number: usize,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            scale: 1.0,
        }
    }
}

/// RGBA8 pixels, row major.
#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub image: RenderImage,
    pub viewport: Viewport,
    /// Text runs of the page as seen at render time, in user space.
    pub runs: Vec<PositionedRun>,
}

/// A loaded PDF as seen by the reader: text extraction per source page and
/// rasterization of a source page.
pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;

    fn page_count(&self) -> usize {
        self.info().page_count
    }

    fn page_runs(&self, page_number: usize) -> Result<Vec<PositionedRun>>;

    fn render_page(&self, request: RenderRequest) -> Result<RenderedPage>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>>;

    async fn open_bytes(&self, file_name: &str, bytes: Vec<u8>)
        -> Result<Arc<dyn DocumentBackend>>;
}
