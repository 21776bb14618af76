//! Best-effort location of a reading snippet on a rendered source page.
//!
//! Each run is normalized on its own before the page text is rebuilt, so run
//! offsets and match offsets count the same characters. The first occurrence
//! of the snippet selects the runs to highlight. A miss is a normal outcome
//! and yields no rectangles.

use crate::model::{normalize_whitespace, HighlightRect, PositionedRun, Viewport};

/// Long snippets that do not match verbatim are retried with this many
/// leading characters.
pub const RETRY_SNIPPET_CHARS: usize = 150;

pub const DEFAULT_HIGHLIGHT_MAX_CHARS: usize = 300;

struct RunSpan<'a> {
    run: &'a PositionedRun,
    start: usize,
    end: usize,
}

pub fn locate_snippet(
    runs: &[PositionedRun],
    viewport: &Viewport,
    snippet: &str,
) -> Vec<HighlightRect> {
    let mut haystack = String::new();
    let mut spans = Vec::new();
    let mut offset = 0usize;
    for run in runs {
        let text = normalize_for_search(&run.text);
        if text.is_empty() {
            continue;
        }
        let len = text.chars().count();
        spans.push(RunSpan {
            run,
            start: offset,
            end: offset + len,
        });
        haystack.push_str(&text);
        haystack.push(' ');
        offset += len + 1;
    }
    haystack.pop();

    let Some((match_start, match_len)) = find_snippet(&haystack, snippet) else {
        return Vec::new();
    };
    let match_end = match_start + match_len;

    spans
        .iter()
        .filter(|span| span.start < match_end && span.end > match_start)
        .map(|span| run_rect(span.run, viewport))
        .collect()
}

/// Character offset and length of the first match in `haystack`, which is
/// already normalized. A long snippet that misses is retried once with its
/// leading characters; the match still spans the whole snippet.
fn find_snippet(haystack: &str, snippet: &str) -> Option<(usize, usize)> {
    let needle = normalize_for_search(snippet);
    let needle_len = needle.chars().count();
    if needle_len == 0 {
        return None;
    }

    if let Some(found) = char_find(haystack, &needle) {
        return Some((found, needle_len));
    }

    if needle_len > RETRY_SNIPPET_CHARS {
        let shorter: String = needle.chars().take(RETRY_SNIPPET_CHARS).collect();
        if let Some(found) = char_find(haystack, &shorter) {
            return Some((found, needle_len));
        }
    }

    None
}

fn normalize_for_search(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}

fn char_find(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte_index| haystack[..byte_index].chars().count())
}

fn run_rect(run: &PositionedRun, viewport: &Viewport) -> HighlightRect {
    let (x, y) = viewport.to_viewport_point(run.baseline_x, run.baseline_y);
    let width = run.width * viewport.scale;
    let height = run.height * viewport.scale;
    HighlightRect {
        x,
        y: y - height,
        width,
        height,
    }
}

/// The text used to find a reading page on its source page: the page's
/// leading `max_chars` characters.
pub fn snippet_for_page(page: &str, max_chars: usize) -> String {
    page.chars()
        .take(max_chars)
        .collect::<String>()
        .trim()
        .to_string()
}
