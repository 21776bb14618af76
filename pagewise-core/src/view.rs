//! The "original PDF" view: renders source pages and places highlights.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::backend::{DocumentBackend, RenderRequest, RenderedPage};
use crate::locate::locate_snippet;
use crate::model::HighlightRect;

#[derive(Debug, Clone)]
pub struct HighlightedPage {
    pub page_number: usize,
    pub page: RenderedPage,
    pub rects: Vec<HighlightRect>,
}

pub struct OriginalView {
    backend: Arc<dyn DocumentBackend>,
}

impl OriginalView {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    pub fn render(&self, page_number: usize, scale: f32) -> Result<RenderedPage> {
        if page_number == 0 || page_number > self.page_count() {
            return Err(anyhow!("source page {} out of range", page_number));
        }
        self.backend.render_page(RenderRequest { page_number, scale })
    }

    /// Renders `page_number` and finds `snippet` on it. Not finding the
    /// snippet is not an error; the page comes back without rectangles.
    pub fn highlight(&self, page_number: usize, scale: f32, snippet: &str) -> Result<HighlightedPage> {
        let page = self.render(page_number, scale)?;
        let rects = locate_snippet(&page.runs, &page.viewport, snippet);
        debug!(page = page_number, rects = rects.len(), "located highlight snippet");
        Ok(HighlightedPage {
            page_number,
            page,
            rects,
        })
    }

    /// Renders a source page the reader picked. Highlights are placed only
    /// when it is `mapped_page`, the page holding the current reading page.
    pub fn show_source_page(
        &self,
        page_number: usize,
        mapped_page: usize,
        scale: f32,
        snippet: &str,
    ) -> Result<HighlightedPage> {
        if page_number == mapped_page {
            return self.highlight(page_number, scale, snippet);
        }
        let page = self.render(page_number, scale)?;
        Ok(HighlightedPage {
            page_number,
            page,
            rects: Vec::new(),
        })
    }
}
