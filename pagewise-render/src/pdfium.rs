use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::DynamicImage;
use parking_lot::Mutex;
use pagewise_core::{
    document_id_for_name, file_name_of, DocumentBackend, DocumentInfo, DocumentMetadata,
    DocumentProvider, PositionedRun, RenderImage, RenderRequest, RenderedPage, Viewport,
};
use pdfium_render::prelude::*;
use tracing::{debug, instrument, warn};

/// Environment variable naming a pdfium shared library to bind before the
/// default locations are tried.
pub const PDFIUM_LIBRARY_ENV: &str = "PAGEWISE_PDFIUM_LIBRARY_PATH";

pub struct PdfiumProvider {
    pdfium: Arc<Pdfium>,
}

impl PdfiumProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pdfium: Arc::new(bind_pdfium()?),
        })
    }
}

#[async_trait]
impl DocumentProvider for PdfiumProvider {
    #[instrument(skip(self))]
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let document = PdfiumDocument::load(
            Arc::clone(&self.pdfium),
            file_name_of(&absolute),
            PdfSource::File(absolute),
        )?;
        Ok(Arc::new(document))
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn open_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Arc<dyn DocumentBackend>> {
        let document = PdfiumDocument::load(
            Arc::clone(&self.pdfium),
            file_name.to_string(),
            PdfSource::Bytes(bytes),
        )?;
        Ok(Arc::new(document))
    }
}

enum PdfSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl PdfSource {
    fn path(&self) -> Option<PathBuf> {
        match self {
            PdfSource::File(path) => Some(path.clone()),
            PdfSource::Bytes(_) => None,
        }
    }
}

struct PdfiumDocument {
    // Declared before `pdfium` so the document is dropped first.
    document: Mutex<PdfDocument<'static>>,
    info: DocumentInfo,
    _pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn load(pdfium: Arc<Pdfium>, file_name: String, source: PdfSource) -> Result<Self> {
        let document = match &source {
            PdfSource::File(path) => pdfium
                .load_pdf_from_file(path, None)
                .with_context(|| format!("failed to open {:?}", path))?,
            PdfSource::Bytes(bytes) => pdfium
                .load_pdf_from_byte_vec(bytes.clone(), None)
                .with_context(|| format!("failed to open {} from stored bytes", file_name))?,
        };
        // SAFETY: the document borrows the bindings owned by `pdfium`. This
        // struct keeps its own `Arc<Pdfium>` and drops `document` before it,
        // so the borrow outlives neither.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };

        let info = build_document_info(&document, file_name, source.path());
        debug!(file = %info.file_name, pages = info.page_count, "opened pdf");
        Ok(Self {
            document: Mutex::new(document),
            info,
            _pdfium: pdfium,
        })
    }

    fn with_page<R, F>(&self, page_number: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        let index = page_number
            .checked_sub(1)
            .and_then(|index| PdfPageIndex::try_from(index).ok())
            .ok_or_else(|| anyhow!("page {} is out of supported range", page_number))?;
        let document = self.document.lock();
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_number))?;
        f(&page)
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_runs(&self, page_number: usize) -> Result<Vec<PositionedRun>> {
        self.with_page(page_number, |page| collect_runs(page, page_number))
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderedPage> {
        self.with_page(request.page_number, |page| {
            let scale = request.scale.max(0.1);
            let viewport = Viewport::new(page.width().value, page.height().value, scale);
            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let bitmap = page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", request.page_number))?;
            let image = to_render_image(bitmap.as_image());
            let runs = collect_runs(page, request.page_number)?;
            Ok(RenderedPage {
                image,
                viewport,
                runs,
            })
        })
    }
}

/// One run per pdfium text segment, in the order pdfium reports them.
/// Segment bounds stand in for the baseline box.
fn collect_runs(page: &PdfPage<'_>, page_number: usize) -> Result<Vec<PositionedRun>> {
    let text = page
        .text()
        .with_context(|| format!("failed to extract text for page {}", page_number))?;

    let mut runs = Vec::new();
    for segment in text.segments().iter() {
        let content = segment.text();
        if content.trim().is_empty() {
            continue;
        }
        let bounds = segment.bounds();
        let font_name = match segment.chars() {
            Ok(chars) => chars.iter().next().map(|c| c.font_name()),
            Err(err) => {
                warn!(?err, page = page_number, "failed to read segment characters");
                None
            }
        };
        runs.push(PositionedRun {
            text: content,
            baseline_x: bounds.left().value,
            baseline_y: bounds.bottom().value,
            width: (bounds.right().value - bounds.left().value).max(0.0),
            height: (bounds.top().value - bounds.bottom().value).max(0.0),
            font_name: font_name.filter(|name| !name.is_empty()),
        });
    }
    Ok(runs)
}

fn to_render_image(image: DynamicImage) -> RenderImage {
    let rgba = image.to_rgba8();
    RenderImage {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    }
}

fn build_document_info(
    document: &PdfDocument<'_>,
    file_name: String,
    path: Option<PathBuf>,
) -> DocumentInfo {
    let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
    let metadata = document.metadata();

    let title = metadata
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().to_owned());
    let author = metadata
        .get(PdfDocumentMetadataTagType::Author)
        .map(|t| t.value().to_owned());

    DocumentInfo {
        id: document_id_for_name(&file_name),
        file_name,
        path,
        page_count,
        metadata: DocumentMetadata { title, author },
    }
}

/// Library paths to try in order: the one named by the environment, then the
/// platform library name in the working directory.
fn library_candidates(env_path: Option<String>) -> Vec<PathBuf> {
    env_path
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .chain(std::iter::once(Pdfium::pdfium_platform_library_name_at_path("./")))
        .collect()
}

fn bind_pdfium() -> Result<Pdfium> {
    let mut failures = Vec::new();
    for path in library_candidates(std::env::var(PDFIUM_LIBRARY_ENV).ok()) {
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(err) => {
                debug!(path = %path.display(), %err, "pdfium not found");
                failures.push(format!("{}: {err}", path.display()));
            }
        }
    }
    let bindings = Pdfium::bind_to_system_library().map_err(|err| {
        failures.push(format!("system: {err}"));
        anyhow!(
            "failed to bind to a pdfium library; install it or set {} ({})",
            PDFIUM_LIBRARY_ENV,
            failures.join(", ")
        )
    })?;
    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_library_is_tried_before_the_working_directory() {
        let candidates = library_candidates(Some("/opt/pdfium/libpdfium.so".to_string()));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], PathBuf::from("/opt/pdfium/libpdfium.so"));
        assert_eq!(
            candidates[1],
            Pdfium::pdfium_platform_library_name_at_path("./")
        );
    }

    #[test]
    fn empty_env_value_is_ignored() {
        assert_eq!(library_candidates(Some(String::new())).len(), 1);
        assert_eq!(library_candidates(None).len(), 1);
    }
}
