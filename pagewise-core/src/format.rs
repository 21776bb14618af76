//! Turns positioned runs into line-aware, emphasis-aware segments.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{PositionedRun, StyledSegment};

pub const DEFAULT_LINE_BREAK_THRESHOLD: f32 = 5.0;

static EMPHASIS_FONT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bold|semibold|medium|black|heavy").expect("valid emphasis regex"));

/// Font-name heuristic for bold-ish faces. Missing names are never emphasized.
pub fn is_emphasized(font_name: Option<&str>) -> bool {
    font_name.is_some_and(|name| EMPHASIS_FONT.is_match(name))
}

#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    line_break_threshold: f32,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_BREAK_THRESHOLD)
    }
}

impl Formatter {
    pub fn new(line_break_threshold: f32) -> Self {
        Self {
            line_break_threshold,
        }
    }

    pub fn line_break_threshold(&self) -> f32 {
        self.line_break_threshold
    }

    /// Formats the runs of one source page. Runs are taken in the order given.
    pub fn format_page(&self, runs: &[PositionedRun]) -> Vec<StyledSegment> {
        let mut segments = Vec::new();
        let mut current = StyledSegment::plain("");
        let mut last_y: Option<f32> = None;

        for run in runs {
            let emphasized = is_emphasized(run.font_name.as_deref());

            if let Some(last_y) = last_y {
                if (last_y - run.baseline_y).abs() > self.line_break_threshold {
                    flush(&mut segments, &mut current, emphasized);
                    segments.push(StyledSegment::line_break());
                }
            }

            if !current.text.is_empty() && current.emphasized != emphasized {
                flush(&mut segments, &mut current, emphasized);
            }

            if !current.text.is_empty() {
                current.text.push(' ');
            }
            current.text.push_str(&run.text);
            current.emphasized = emphasized;
            last_y = Some(run.baseline_y);
        }

        if !current.text.is_empty() {
            segments.push(current);
        }
        segments
    }
}

fn flush(segments: &mut Vec<StyledSegment>, current: &mut StyledSegment, next_emphasis: bool) {
    let done = std::mem::replace(current, StyledSegment::new("", next_emphasis));
    if !done.text.is_empty() {
        segments.push(done);
    }
}

/// Plain text of a formatted page: segment texts joined by single spaces.
pub fn page_plain_text(segments: &[StyledSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
