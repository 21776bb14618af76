//! Reading core: re-flows document text into fixed-size reading pages, maps
//! them back to source PDF pages, and locates reading snippets on rendered
//! source pages for highlighting.

pub mod backend;
pub mod config;
pub mod direction;
pub mod document;
pub mod format;
pub mod locate;
pub mod model;
pub mod notes;
pub mod page_map;
pub mod paginate;
pub mod session;
pub mod store;
pub mod view;

pub use backend::{
    document_id_for_name, file_name_of, DocumentBackend, DocumentId, DocumentInfo,
    DocumentMetadata, DocumentProvider, RenderImage, RenderRequest, RenderedPage,
};
pub use config::ReaderConfig;
pub use direction::{detect_direction, Direction, DirectionMode};
pub use document::{Document, DocumentKind, IngestError, Ingestor, Layout, SourceDocument};
pub use format::{is_emphasized, Formatter};
pub use locate::{locate_snippet, snippet_for_page};
pub use model::{HighlightRect, PositionedRun, StyledSegment, Viewport, LINE_BREAK};
pub use notes::{migrate_page_notes, Note, NoteBook};
pub use page_map::{build_page_map, PageMap};
pub use paginate::{paginate, Pagination};
pub use session::{Command, ReadingSession, ReadingState};
pub use store::{
    list_or_default, load_or_default, FileStateStore, MemoryStateStore, PersistedDocument,
    StateStore,
};
pub use view::{HighlightedPage, OriginalView};
