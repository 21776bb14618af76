use serde::{Deserialize, Serialize};

/// Marker text carried by segments that stand for a line break.
pub const LINE_BREAK: &str = "\n";

/// A run of text as reported by the extractor, anchored at its baseline in
/// PDF user space (origin at the bottom-left corner of the page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedRun {
    pub text: String,
    pub baseline_x: f32,
    pub baseline_y: f32,
    pub width: f32,
    pub height: f32,
    pub font_name: Option<String>,
}

impl PositionedRun {
    pub fn new(text: impl Into<String>, baseline_x: f32, baseline_y: f32) -> Self {
        Self {
            text: text.into(),
            baseline_x,
            baseline_y,
            width: 0.0,
            height: 0.0,
            font_name: None,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = Some(font_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledSegment {
    pub text: String,
    pub emphasized: bool,
}

impl StyledSegment {
    pub fn new(text: impl Into<String>, emphasized: bool) -> Self {
        Self {
            text: text.into(),
            emphasized,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    pub fn line_break() -> Self {
        Self::plain(LINE_BREAK)
    }

    pub fn is_line_break(&self) -> bool {
        self.text == LINE_BREAK
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}

/// Highlight rectangle in rendered-canvas pixels, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Geometry of a rendered source page: its size in PDF user units and the
/// scale it was rasterized at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    pub fn pixel_width(&self) -> u32 {
        to_pixels(self.width * self.scale)
    }

    pub fn pixel_height(&self) -> u32 {
        to_pixels(self.height * self.scale)
    }

    /// Maps a user-space point (y up) to viewport pixels (y down).
    pub fn to_viewport_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale, (self.height - y) * self.scale)
    }
}

fn to_pixels(value: f32) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        0
    } else {
        value.round() as u32
    }
}

/// Collapses every run of whitespace to one space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
