use serde::{Deserialize, Serialize};

use crate::model::word_count;

/// 1-based source page for every reading page, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageMap(Vec<usize>);

impl PageMap {
    pub fn from_entries(entries: Vec<usize>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn source_page(&self, reading_page: usize) -> Option<usize> {
        self.0.get(reading_page).copied()
    }

    /// First reading page whose content comes from `source_page` or later.
    /// Past the end of the document this is the last reading page.
    pub fn reading_page_for_source(&self, source_page: usize) -> Option<usize> {
        if self.0.is_empty() {
            return None;
        }
        let index = self.0.partition_point(|&entry| entry < source_page);
        Some(index.min(self.0.len() - 1))
    }
}

/// Maps reading pages to source pages by locating each reading page's middle
/// word in the cumulative word counts of the source pages.
pub fn build_page_map(
    source_pages: &[String],
    reading_pages: &[String],
    words_per_page: usize,
) -> PageMap {
    let words_per_page = words_per_page.max(1);
    let source_count = source_pages.len().max(1);

    let mut cumulative = Vec::with_capacity(source_pages.len() + 1);
    cumulative.push(0usize);
    for page in source_pages {
        let last = cumulative[cumulative.len() - 1];
        cumulative.push(last + word_count(page));
    }

    let entries = reading_pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let start = (index * words_per_page) as f64;
            let mid = start + word_count(page) as f64 / 2.0;
            let source = cumulative
                .windows(2)
                .position(|bounds| bounds[0] as f64 <= mid && mid < bounds[1] as f64)
                .map(|k| k + 1)
                .unwrap_or(1);
            source.clamp(1, source_count)
        })
        .collect();

    PageMap(entries)
}
