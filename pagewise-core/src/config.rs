use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::document::{Ingestor, DEFAULT_MIN_READABLE_CHARS};
use crate::format::{Formatter, DEFAULT_LINE_BREAK_THRESHOLD};
use crate::locate::DEFAULT_HIGHLIGHT_MAX_CHARS;

pub const DEFAULT_WORDS_PER_PAGE: usize = 120;
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub words_per_page: usize,
    pub highlight_max_chars: usize,
    pub render_scale: f32,
    pub line_break_threshold: f32,
    pub min_readable_chars: usize,
    /// Keep a copy of opened PDFs in the document record so the original
    /// view works after the file moves.
    pub keep_pdf_bytes: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            words_per_page: DEFAULT_WORDS_PER_PAGE,
            highlight_max_chars: DEFAULT_HIGHLIGHT_MAX_CHARS,
            render_scale: DEFAULT_RENDER_SCALE,
            line_break_threshold: DEFAULT_LINE_BREAK_THRESHOLD,
            min_readable_chars: DEFAULT_MIN_READABLE_CHARS,
            keep_pdf_bytes: false,
        }
    }
}

impl ReaderConfig {
    /// Reads `path` if it exists; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: ReaderConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(config.sanitized())
    }

    pub fn sanitized(mut self) -> Self {
        self.words_per_page = self.words_per_page.max(1);
        if !self.render_scale.is_finite() || self.render_scale <= 0.0 {
            self.render_scale = DEFAULT_RENDER_SCALE;
        }
        self
    }

    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            Formatter::new(self.line_break_threshold),
            self.min_readable_chars,
        )
    }
}
