use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use tracing::warn;

use crate::backend::{document_id_for_name, DocumentId};
use crate::direction::{Direction, DirectionMode};
use crate::document::{Document, DocumentKind, Layout, SourceDocument};
use crate::model::StyledSegment;
use crate::page_map::PageMap;
use crate::paginate::{paginate_plain, Pagination};

/// Everything kept about one book between sessions. The page map and styled
/// pages are replayed as stored when the page size is unchanged.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub file_name: String,
    pub kind: DocumentKind,
    #[serde(default)]
    pub current_page: usize,
    #[serde(default)]
    pub bookmarks: Vec<usize>,
    #[serde(default)]
    pub notes: BTreeMap<usize, String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub direction_mode: DirectionMode,
    #[serde(default, with = "serde_bytes", skip_serializing_if = "Option::is_none")]
    pub pdf_bytes: Option<Vec<u8>>,
    #[serde(default)]
    pub page_map: PageMap,
    #[serde(default)]
    pub source_page_count: usize,
    #[serde(default)]
    pub styled_pages: Vec<Vec<StyledSegment>>,
    pub content: String,
    #[serde(default)]
    pub source_segments: Vec<Vec<StyledSegment>>,
    pub words_per_page: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub last_read: SystemTime,
}

impl PersistedDocument {
    pub fn id(&self) -> DocumentId {
        document_id_for_name(&self.file_name)
    }

    pub fn source(&self) -> SourceDocument {
        SourceDocument {
            file_name: self.file_name.clone(),
            kind: self.kind,
            content: self.content.clone(),
            source_segments: self.source_segments.clone(),
        }
    }

    /// Rebuilds the document without touching the original file.
    pub fn restore_document(&self, words_per_page: usize) -> Document {
        let source = self.source();
        let replayable = self.words_per_page == words_per_page
            && !self.styled_pages.is_empty()
            && (self.kind == DocumentKind::Text || !self.page_map.is_empty());
        if !replayable {
            return Document::new(source, words_per_page);
        }

        let layout = Layout {
            words_per_page,
            pages: Pagination {
                plain: paginate_plain(&self.content, words_per_page),
                styled: self.styled_pages.clone(),
            },
            page_map: self.page_map.clone(),
        };
        Document { source, layout }
    }
}

pub trait StateStore: Send + Sync {
    fn load(&self, id: DocumentId) -> Result<Option<PersistedDocument>>;
    fn save(&self, record: &PersistedDocument) -> Result<()>;
    fn list(&self) -> Result<Vec<PersistedDocument>>;
}

/// Loads a record, treating any storage failure as "nothing stored".
pub fn load_or_default(store: &dyn StateStore, id: DocumentId) -> Option<PersistedDocument> {
    match store.load(id) {
        Ok(record) => record,
        Err(err) => {
            warn!(?err, %id, "failed to load document state");
            None
        }
    }
}

pub fn list_or_default(store: &dyn StateStore) -> Vec<PersistedDocument> {
    let mut records = store.list().unwrap_or_else(|err| {
        warn!(?err, "failed to list stored documents");
        Vec::new()
    });
    records.sort_by(|a, b| b.last_read.cmp(&a.last_read));
    records
}

pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create state directory at {:?}", root))?;
        Ok(Self { root })
    }

    fn state_path(&self, id: DocumentId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

fn read_record(path: &Path) -> Result<PersistedDocument> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open state file {:?}", path))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    serde_json::from_str(&buf).with_context(|| format!("failed to decode state file {:?}", path))
}

impl StateStore for FileStateStore {
    fn load(&self, id: DocumentId) -> Result<Option<PersistedDocument>> {
        let path = self.state_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    fn save(&self, record: &PersistedDocument) -> Result<()> {
        let path = self.state_path(record.id());
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(record)?;
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp state file {:?}", tmp))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move state file into place at {:?}", path))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<PersistedDocument>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read state directory {:?}", self.root))?;
        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => warn!(?err, path = %path.display(), "skipping unreadable state file"),
            }
        }
        Ok(records)
    }
}

pub struct MemoryStateStore {
    inner: Mutex<HashMap<DocumentId, PersistedDocument>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, id: DocumentId) -> Result<Option<PersistedDocument>> {
        Ok(self.inner.lock().get(&id).cloned())
    }

    fn save(&self, record: &PersistedDocument) -> Result<()> {
        self.inner.lock().insert(record.id(), record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<PersistedDocument>> {
        Ok(self.inner.lock().values().cloned().collect())
    }
}
