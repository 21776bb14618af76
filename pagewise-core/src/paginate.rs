//! Word-budgeted re-flow of document text into reading pages.

use serde::{Deserialize, Serialize};

use crate::model::{normalize_whitespace, StyledSegment};

/// Reading pages of one layout: plain text for search, mapping and
/// highlighting, and the same content as styled segments for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub plain: Vec<String>,
    pub styled: Vec<Vec<StyledSegment>>,
}

impl Pagination {
    pub fn len(&self) -> usize {
        self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty()
    }
}

/// Groups atomic units into consecutive windows whose summed weight stays
/// within `budget`. A unit heavier than the remaining budget closes the
/// current window unless that window is still empty, so units are never
/// split and an oversized unit gets a window of its own.
pub fn window_by_words<T, F>(units: impl IntoIterator<Item = T>, budget: usize, weight: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> usize,
{
    let budget = budget.max(1);
    let mut windows = Vec::new();
    let mut current = Vec::new();
    let mut used = 0usize;

    for unit in units {
        let words = weight(&unit);
        if used + words > budget && !current.is_empty() {
            windows.push(std::mem::take(&mut current));
            used = 0;
        }
        used += words;
        current.push(unit);
    }

    if !current.is_empty() {
        windows.push(current);
    }
    windows
}

/// Splits text into pages of `words_per_page` words joined by single spaces.
pub fn paginate_plain(text: &str, words_per_page: usize) -> Vec<String> {
    window_by_words(text.split_whitespace(), words_per_page, |_| 1)
        .into_iter()
        .map(|words| words.join(" "))
        .collect()
}

pub fn paginate_styled<'a>(
    segments: impl IntoIterator<Item = &'a StyledSegment>,
    words_per_page: usize,
) -> Vec<Vec<StyledSegment>> {
    window_by_words(segments.into_iter().cloned(), words_per_page, StyledSegment::word_count)
}

/// Builds both page sequences from the source content. Always starts from the
/// unpaginated input so a new page size never compounds earlier layouts.
pub fn paginate(
    full_text: &str,
    segments_by_page: &[Vec<StyledSegment>],
    words_per_page: usize,
) -> Pagination {
    let normalized = normalize_whitespace(full_text);
    Pagination {
        plain: paginate_plain(&normalized, words_per_page),
        styled: paginate_styled(segments_by_page.iter().flatten(), words_per_page),
    }
}

/// Styled pages for plain-text sources: one unemphasized segment per word.
pub fn styled_from_plain(pages: &[String]) -> Vec<Vec<StyledSegment>> {
    pages
        .iter()
        .map(|page| page.split_whitespace().map(StyledSegment::plain).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::word_count;

    fn numbered_words(count: usize) -> String {
        (1..=count)
            .map(|n| format!("w{n}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn plain_pages_rejoin_to_the_input() {
        let text = "  The quick\nbrown   fox\tjumps over the lazy dog ";
        for words_per_page in 1..=10 {
            let pages = paginate_plain(text, words_per_page);
            assert_eq!(pages.join(" "), normalize_whitespace(text));
        }
    }

    #[test]
    fn plain_page_count_is_ceiling_of_words_over_budget() {
        let text = numbered_words(23);
        for words_per_page in 1..=30 {
            let pages = paginate_plain(&text, words_per_page);
            assert_eq!(pages.len(), 23usize.div_ceil(words_per_page));
            let (last, full) = pages.split_last().unwrap();
            assert!(full.iter().all(|page| word_count(page) == words_per_page));
            assert!(word_count(last) <= words_per_page);
        }
    }

    #[test]
    fn empty_text_has_no_pages() {
        assert!(paginate_plain("   ", 5).is_empty());
    }

    #[test]
    fn segments_are_never_split() {
        let segments = vec![
            StyledSegment::plain("a b c"),
            StyledSegment::new("d e", true),
            StyledSegment::line_break(),
            StyledSegment::plain("f g h i"),
            StyledSegment::plain("j"),
        ];

        let pages = paginate_styled(&segments, 4);

        assert_eq!(
            pages,
            vec![
                vec![StyledSegment::plain("a b c")],
                vec![
                    StyledSegment::new("d e", true),
                    StyledSegment::line_break(),
                ],
                vec![StyledSegment::plain("f g h i")],
                vec![StyledSegment::plain("j")],
            ]
        );
        let flattened: Vec<_> = pages.into_iter().flatten().collect();
        assert_eq!(flattened, segments);
    }

    #[test]
    fn oversized_segment_gets_its_own_page() {
        let segments = vec![
            StyledSegment::plain("a"),
            StyledSegment::plain("b c d e f g"),
            StyledSegment::plain("h"),
        ];

        let pages = paginate_styled(&segments, 3);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], vec![StyledSegment::plain("b c d e f g")]);
    }

    #[test]
    fn repaginating_starts_from_source() {
        let segments = vec![vec![
            StyledSegment::plain("one two three"),
            StyledSegment::plain("four five"),
        ]];
        let text = "one two three four five";

        let small = paginate(text, &segments, 2);
        let large = paginate(text, &segments, 10);

        assert_eq!(small.plain, vec!["one two", "three four", "five"]);
        assert_eq!(large.plain, vec!["one two three four five"]);
        assert_eq!(large.styled.len(), 1);
        assert_eq!(large, paginate(text, &segments, 10));
    }

    #[test]
    fn zero_budget_is_treated_as_one() {
        assert_eq!(paginate_plain("a b", 0), vec!["a", "b"]);
    }

    #[test]
    fn plain_sources_get_word_segments() {
        let styled = styled_from_plain(&["a b".to_string(), "c".to_string()]);
        assert_eq!(
            styled,
            vec![
                vec![StyledSegment::plain("a"), StyledSegment::plain("b")],
                vec![StyledSegment::plain("c")],
            ]
        );
    }
}
