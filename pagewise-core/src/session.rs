use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Result};
use tracing::{info, instrument, warn};

use crate::backend::{document_id_for_name, DocumentId};
use crate::direction::{Direction, DirectionMode};
use crate::document::{Document, IngestError, SourceDocument};
use crate::locate::snippet_for_page;
use crate::model::StyledSegment;
use crate::store::{load_or_default, PersistedDocument, StateStore};

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingState {
    pub current_page: usize,
    pub bookmarks: Vec<usize>,
    /// Per-page notes from older records, kept until they are migrated into
    /// the note book.
    pub notes: BTreeMap<usize, String>,
    pub direction_mode: DirectionMode,
    pub direction: Direction,
}

impl Default for ReadingState {
    fn default() -> Self {
        Self {
            current_page: 0,
            bookmarks: Vec::new(),
            notes: BTreeMap::new(),
            direction_mode: DirectionMode::Auto,
            direction: Direction::Ltr,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    NextPage { count: usize },
    PrevPage { count: usize },
    GotoPage { page: usize },
    /// Moves to the first reading page on a 1-based source page.
    GotoSourcePage { page: usize },
    ToggleBookmark,
    SetWordsPerPage { words: usize },
    SetDirectionMode { mode: DirectionMode },
}

/// One opened book: its layout, the reader's position and annotations.
pub struct ReadingSession {
    id: DocumentId,
    document: Document,
    state: ReadingState,
    pdf_bytes: Option<Vec<u8>>,
    store: Arc<dyn StateStore>,
}

impl ReadingSession {
    /// Restores `file_name` from the store when it was read before, and
    /// runs `ingest` only for books never seen.
    #[instrument(skip(store, ingest))]
    pub fn open<F>(
        store: Arc<dyn StateStore>,
        file_name: &str,
        words_per_page: usize,
        ingest: F,
    ) -> Result<Self, IngestError>
    where
        F: FnOnce() -> Result<SourceDocument, IngestError>,
    {
        let id = document_id_for_name(file_name);
        match load_or_default(store.as_ref(), id) {
            Some(record) => {
                info!(file = %file_name, "restoring stored document");
                Ok(Self::from_record(store, record, words_per_page))
            }
            None => Ok(Self::new(store, Document::new(ingest()?, words_per_page))),
        }
    }

    pub fn new(store: Arc<dyn StateStore>, document: Document) -> Self {
        let id = document_id_for_name(&document.source.file_name);
        let mut state = ReadingState::default();
        state.direction = state.direction_mode.resolve(&document.source.content);
        Self {
            id,
            document,
            state,
            pdf_bytes: None,
            store,
        }
    }

    fn from_record(
        store: Arc<dyn StateStore>,
        record: PersistedDocument,
        words_per_page: usize,
    ) -> Self {
        let document = record.restore_document(words_per_page);
        let mut session = Self::new(store, document);
        session.state.bookmarks = record.bookmarks;
        session.state.notes = record.notes;
        session.state.direction_mode = record.direction_mode;
        session.state.direction = match record.direction_mode {
            DirectionMode::Auto => record.direction,
            mode => mode.resolve(&session.document.source.content),
        };
        session.state.current_page = record.current_page.min(session.last_page());
        session.pdf_bytes = record.pdf_bytes;
        session
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> &ReadingState {
        &self.state
    }

    pub fn file_name(&self) -> &str {
        &self.document.source.file_name
    }

    pub fn pdf_bytes(&self) -> Option<&[u8]> {
        self.pdf_bytes.as_deref()
    }

    pub fn set_pdf_bytes(&mut self, bytes: Option<Vec<u8>>) {
        self.pdf_bytes = bytes;
    }

    pub fn page_count(&self) -> usize {
        self.document.layout.page_count()
    }

    fn last_page(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    pub fn current_text(&self) -> &str {
        self.page_text(self.state.current_page).unwrap_or_default()
    }

    pub fn page_text(&self, page: usize) -> Option<&str> {
        self.document.layout.pages.plain.get(page).map(String::as_str)
    }

    /// Styled segments of the current page. Styled pages can be fewer than
    /// plain pages, so the last styled page stands in past their end.
    pub fn current_segments(&self) -> &[StyledSegment] {
        let styled = &self.document.layout.pages.styled;
        styled
            .get(self.state.current_page)
            .or_else(|| styled.last())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_bookmarked(&self) -> bool {
        self.state.bookmarks.contains(&self.state.current_page)
    }

    /// Source page (1-based) holding the current reading page, for PDFs.
    pub fn source_page_for_current(&self) -> Option<usize> {
        self.document
            .layout
            .page_map
            .source_page(self.state.current_page)
    }

    pub fn reading_page_for_source(&self, source_page: usize) -> Option<usize> {
        self.document
            .layout
            .page_map
            .reading_page_for_source(source_page)
    }

    pub fn highlight_snippet(&self, max_chars: usize) -> String {
        snippet_for_page(self.current_text(), max_chars)
    }

    /// Reading pages containing `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<usize> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.document
            .layout
            .pages
            .plain
            .iter()
            .enumerate()
            .filter(|(_, page)| page.to_lowercase().contains(&query))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::NextPage { count } => {
                let next = (self.state.current_page + count).min(self.last_page());
                self.move_to(next);
            }
            Command::PrevPage { count } => {
                let next = self.state.current_page.saturating_sub(count);
                self.move_to(next);
            }
            Command::GotoPage { page } => {
                let next = page.min(self.last_page());
                self.move_to(next);
            }
            Command::GotoSourcePage { page } => {
                let Some(next) = self.reading_page_for_source(page) else {
                    bail!("{} has no source pages", self.file_name());
                };
                self.move_to(next);
            }
            Command::ToggleBookmark => {
                let page = self.state.current_page;
                match self.state.bookmarks.binary_search(&page) {
                    Ok(index) => {
                        self.state.bookmarks.remove(index);
                    }
                    Err(index) => self.state.bookmarks.insert(index, page),
                }
            }
            Command::SetWordsPerPage { words } => {
                if words == 0 {
                    bail!("words per page must be at least 1");
                }
                if words != self.document.layout.words_per_page {
                    self.document.relayout(words);
                    let pages = self.page_count();
                    self.state.current_page = self.state.current_page.min(self.last_page());
                    self.state.bookmarks.retain(|&b| b < pages);
                    self.state.notes.retain(|&page, _| page < pages);
                    info!(pages, "repaginated");
                }
            }
            Command::SetDirectionMode { mode } => {
                self.state.direction_mode = mode;
                self.state.direction = mode.resolve(&self.document.source.content);
            }
        }
        Ok(())
    }

    fn move_to(&mut self, page: usize) {
        self.state.current_page = page;
    }

    pub fn record(&self) -> PersistedDocument {
        let layout = &self.document.layout;
        PersistedDocument {
            file_name: self.document.source.file_name.clone(),
            kind: self.document.source.kind,
            current_page: self.state.current_page,
            bookmarks: self.state.bookmarks.clone(),
            notes: self.state.notes.clone(),
            direction: self.state.direction,
            direction_mode: self.state.direction_mode,
            pdf_bytes: self.pdf_bytes.clone(),
            page_map: layout.page_map.clone(),
            source_page_count: self.document.source.source_page_count(),
            styled_pages: layout.pages.styled.clone(),
            content: self.document.source.content.clone(),
            source_segments: self.document.source.source_segments.clone(),
            words_per_page: layout.words_per_page,
            total_pages: layout.page_count(),
            last_read: SystemTime::now(),
        }
    }

    /// Saves progress; a failed write is logged and otherwise ignored.
    pub fn persist(&self) {
        if let Err(err) = self.store.save(&self.record()) {
            warn!(?err, file = %self.file_name(), "failed to save reading progress");
        }
    }
}
