use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use directories::ProjectDirs;
use pagewise_core::{
    document_id_for_name, file_name_of, list_or_default, load_or_default, migrate_page_notes,
    Command, Direction, DirectionMode, DocumentBackend, DocumentKind, DocumentProvider,
    FileStateStore, IngestError, Note, NoteBook, OriginalView, ReaderConfig, ReadingSession,
    StateStore,
};
use pagewise_render::{paint_highlights, write_png, PdfiumProvider};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "pagewise",
    version,
    about = "Reads PDF and text documents one fixed-size page at a time"
)]
struct Args {
    /// Words on each reading page (overrides the config file)
    #[arg(long, global = true)]
    words_per_page: Option<usize>,

    /// Directory holding reading progress, notes and logs
    #[arg(long, global = true, env = "PAGEWISE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file to load instead of the default location
    #[arg(long, global = true, env = "PAGEWISE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Print the current reading page
    Read {
        file: PathBuf,
        /// Reading page to go to first (1-based)
        #[arg(short = 'p', long = "page")]
        page: Option<usize>,
        /// Go to the first reading page of this source page (1-based)
        #[arg(long, conflicts_with = "page")]
        source_page: Option<usize>,
    },
    /// Move forward and print the page
    Next {
        file: PathBuf,
        #[arg(default_value_t = 1)]
        count: usize,
    },
    /// Move back and print the page
    Prev {
        file: PathBuf,
        #[arg(default_value_t = 1)]
        count: usize,
    },
    /// Print which source page each reading page comes from
    Map { file: PathBuf },
    /// List reading pages containing a phrase
    Search { file: PathBuf, query: String },
    /// Toggle a bookmark on the current page
    Bookmark { file: PathBuf },
    /// Manage notes of a document
    Note {
        file: PathBuf,
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Set the reading direction (auto, ltr or rtl)
    Direction { file: PathBuf, mode: DirectionMode },
    /// Render the source page of the current reading page with the page text highlighted
    Highlight {
        file: PathBuf,
        /// Where to write the PNG
        #[arg(long)]
        out: PathBuf,
        /// Render scale (overrides the config file)
        #[arg(long)]
        scale: Option<f32>,
        /// Source page to render instead of the mapped one; highlighted only
        /// when it holds the current reading page
        #[arg(long)]
        source_page: Option<usize>,
    },
    /// List documents read before
    Library,
}

#[derive(Debug, Subcommand)]
enum NoteAction {
    /// Attach a note to the current page
    Add { text: String },
    /// List the notes of the document
    List,
    /// Delete a note by id
    Delete { id: String },
}

struct AppPaths {
    data_dir: PathBuf,
    config_file: PathBuf,
}

impl AppPaths {
    fn resolve(data_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let project_dirs = || {
            ProjectDirs::from("net", "pagewise", "pagewise")
                .ok_or_else(|| anyhow!("unable to resolve platform data directories"))
        };
        let config_file = match (&config, &data_dir) {
            (Some(config), _) => config.clone(),
            (None, Some(data_dir)) => data_dir.join("config.toml"),
            (None, None) => project_dirs()?.config_dir().join("config.toml"),
        };
        let data_dir = match data_dir {
            Some(data_dir) => data_dir,
            None => project_dirs()?.data_local_dir().to_path_buf(),
        };
        Ok(Self {
            data_dir,
            config_file,
        })
    }

    fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    fn notes_file(&self) -> PathBuf {
        self.data_dir.join("notes.json")
    }

    fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

struct App {
    config: ReaderConfig,
    words_per_page: usize,
    store: Arc<dyn StateStore>,
    notes: NoteBook,
    provider: Option<PdfiumProvider>,
}

impl App {
    fn new(paths: &AppPaths, words_per_page: Option<usize>) -> Result<Self> {
        let config = ReaderConfig::load(&paths.config_file)?;
        let words_per_page = match words_per_page {
            Some(0) => bail!("--words-per-page must be at least 1"),
            Some(words) => words,
            None => config.words_per_page,
        };
        let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(paths.state_dir())?);
        Ok(Self {
            config,
            words_per_page,
            store,
            notes: NoteBook::new(paths.notes_file()),
            provider: None,
        })
    }

    /// Binds pdfium on first use so text documents never need it.
    fn provider(&mut self) -> Result<&PdfiumProvider> {
        if self.provider.is_none() {
            self.provider = Some(PdfiumProvider::new()?);
        }
        self.provider
            .as_ref()
            .ok_or_else(|| anyhow!("pdfium provider unavailable"))
    }

    async fn open(&mut self, path: &Path) -> Result<ReadingSession> {
        let file_name = file_name_of(path);
        let kind = DocumentKind::from_file_name(&file_name).ok_or_else(|| {
            IngestError::UnsupportedFile {
                file_name: file_name.clone(),
            }
        })?;
        let ingestor = self.config.ingestor();

        let mut session = match kind {
            DocumentKind::Text => {
                ReadingSession::open(Arc::clone(&self.store), &file_name, self.words_per_page, || {
                    let raw = fs::read_to_string(path).map_err(|err| {
                        IngestError::Extraction(
                            anyhow::Error::new(err).context(format!("failed to read {:?}", path)),
                        )
                    })?;
                    ingestor.ingest_text(&file_name, &raw)
                })?
            }
            DocumentKind::Pdf => {
                let stored =
                    load_or_default(self.store.as_ref(), document_id_for_name(&file_name)).is_some();
                let backend = if stored {
                    None
                } else {
                    Some(self.provider()?.open(path).await?)
                };
                ReadingSession::open(Arc::clone(&self.store), &file_name, self.words_per_page, || {
                    match &backend {
                        Some(backend) => ingestor.ingest_pdf(backend.as_ref(), |progress| {
                            debug!(progress, "extracting pdf text");
                        }),
                        None => Err(IngestError::Extraction(anyhow!(
                            "stored state for {} could not be restored",
                            file_name
                        ))),
                    }
                })?
            }
        };

        if kind == DocumentKind::Pdf && self.config.keep_pdf_bytes && session.pdf_bytes().is_none() {
            let bytes = fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
            session.set_pdf_bytes(Some(bytes));
        }
        info!(file = %session.file_name(), pages = session.page_count(), "opened document");
        Ok(session)
    }

    /// Prefers the file on disk and falls back to the PDF kept in the record.
    async fn original_backend(
        &mut self,
        path: &Path,
        session: &ReadingSession,
    ) -> Result<Arc<dyn DocumentBackend>> {
        let bytes = session.pdf_bytes().map(<[u8]>::to_vec);
        let file_name = session.file_name().to_string();
        let provider = self.provider()?;
        if path.exists() {
            return provider.open(path).await;
        }
        match bytes {
            Some(bytes) => provider.open_bytes(&file_name, bytes).await,
            None => bail!("{:?} not found and no copy of the PDF was kept", path),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let paths = AppPaths::resolve(args.data_dir, args.config)?;
    let _log_guard = init_logging(&paths.log_dir())?;
    let mut app = App::new(&paths, args.words_per_page)?;
    let mut stdout = io::stdout();

    match args.command {
        CliCommand::Read {
            file,
            page,
            source_page,
        } => {
            let mut session = app.open(&file).await?;
            if let Some(page) = page {
                session.apply(Command::GotoPage {
                    page: page.saturating_sub(1),
                })?;
            }
            if let Some(page) = source_page {
                session.apply(Command::GotoSourcePage { page })?;
            }
            print_page(&mut stdout, &app.notes, &session)?;
            session.persist();
        }
        CliCommand::Next { file, count } => {
            let mut session = app.open(&file).await?;
            session.apply(Command::NextPage { count })?;
            print_page(&mut stdout, &app.notes, &session)?;
            session.persist();
        }
        CliCommand::Prev { file, count } => {
            let mut session = app.open(&file).await?;
            session.apply(Command::PrevPage { count })?;
            print_page(&mut stdout, &app.notes, &session)?;
            session.persist();
        }
        CliCommand::Map { file } => {
            let session = app.open(&file).await?;
            print_page_map(&mut stdout, &session)?;
        }
        CliCommand::Search { file, query } => {
            let session = app.open(&file).await?;
            let matches = session.search(&query);
            if matches.is_empty() {
                writeln!(stdout, "no pages contain {:?}", query)?;
            }
            for page in matches {
                writeln!(stdout, "page {}", page + 1)?;
            }
        }
        CliCommand::Bookmark { file } => {
            let mut session = app.open(&file).await?;
            session.apply(Command::ToggleBookmark)?;
            let page = session.state().current_page + 1;
            if session.is_bookmarked() {
                writeln!(stdout, "bookmarked page {page}")?;
            } else {
                writeln!(stdout, "removed bookmark from page {page}")?;
            }
            session.persist();
        }
        CliCommand::Note { file, action } => {
            let session = app.open(&file).await?;
            run_note_action(&mut stdout, &app.notes, &session, action)?;
            session.persist();
        }
        CliCommand::Direction { file, mode } => {
            let mut session = app.open(&file).await?;
            session.apply(Command::SetDirectionMode { mode })?;
            writeln!(stdout, "direction: {}", direction_label(session.state().direction))?;
            session.persist();
        }
        CliCommand::Highlight {
            file,
            out,
            scale,
            source_page,
        } => {
            let session = app.open(&file).await?;
            if session.document().source.kind != DocumentKind::Pdf {
                bail!("highlighting needs a PDF document");
            }
            let mapped_page = session
                .source_page_for_current()
                .ok_or_else(|| anyhow!("no source page for the current reading page"))?;
            let source_page = source_page.unwrap_or(mapped_page);
            let scale = scale
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(app.config.render_scale);
            let snippet = session.highlight_snippet(app.config.highlight_max_chars);

            let backend = app.original_backend(&file, &session).await?;
            let view = OriginalView::new(backend);
            let mut highlighted = view.show_source_page(source_page, mapped_page, scale, &snippet)?;
            paint_highlights(&mut highlighted.page.image, &highlighted.rects);
            write_png(&highlighted.page.image, &out)?;

            if source_page != mapped_page {
                writeln!(
                    stdout,
                    "rendered source page {source_page}; the current page is on source page {mapped_page}; wrote {}",
                    out.display()
                )?;
            } else if highlighted.rects.is_empty() {
                writeln!(
                    stdout,
                    "page text not found on source page {source_page}; wrote {}",
                    out.display()
                )?;
            } else {
                writeln!(
                    stdout,
                    "highlighted {} regions on source page {source_page}; wrote {}",
                    highlighted.rects.len(),
                    out.display()
                )?;
            }
            session.persist();
        }
        CliCommand::Library => {
            let records = list_or_default(app.store.as_ref());
            if records.is_empty() {
                writeln!(stdout, "no documents yet")?;
            }
            for record in records {
                let total = record.total_pages.max(1);
                let percent = (record.current_page + 1) * 100 / total;
                writeln!(
                    stdout,
                    "{}\t{}/{}\t{}%",
                    record.file_name,
                    record.current_page + 1,
                    total,
                    percent
                )?;
            }
        }
    }

    Ok(())
}

fn run_note_action(
    out: &mut impl Write,
    notes: &NoteBook,
    session: &ReadingSession,
    action: NoteAction,
) -> Result<()> {
    let book_id = session.file_name();
    migrate_legacy_notes(notes, session);

    match action {
        NoteAction::Add { text } => {
            if text.trim().is_empty() {
                bail!("note text is empty");
            }
            let note = Note::new(
                book_id,
                session.state().current_page,
                &text,
                Some(session.current_text()),
            );
            notes.save(&note);
            writeln!(out, "added note {} on page {}", note.id, note.page_index + 1)?;
        }
        NoteAction::List => {
            let listed = notes.notes_for(book_id);
            if listed.is_empty() {
                writeln!(out, "no notes")?;
            }
            for note in listed {
                writeln!(out, "{}\tpage {}\t{}", note.id, note.page_index + 1, note.text)?;
            }
        }
        NoteAction::Delete { id } => {
            let id = Uuid::parse_str(id.trim()).with_context(|| format!("invalid note id {id:?}"))?;
            if notes.delete(id) {
                writeln!(out, "deleted note {id}")?;
            } else {
                bail!("no note with id {id}");
            }
        }
    }
    Ok(())
}

/// Records from older versions keep one note per page inside the document
/// state; they move to the note book the first time notes are touched.
fn migrate_legacy_notes(notes: &NoteBook, session: &ReadingSession) {
    let page_notes = &session.state().notes;
    if page_notes.is_empty() || !notes.notes_for(session.file_name()).is_empty() {
        return;
    }
    for note in migrate_page_notes(session.file_name(), page_notes) {
        notes.save(&note);
    }
}

fn print_page(out: &mut impl Write, notes: &NoteBook, session: &ReadingSession) -> Result<()> {
    let mut line_start = true;
    for segment in session.current_segments() {
        if segment.is_line_break() {
            queue!(out, Print('\n'))?;
            line_start = true;
            continue;
        }
        if !line_start {
            queue!(out, Print(' '))?;
        }
        if segment.emphasized {
            queue!(
                out,
                SetAttribute(Attribute::Bold),
                Print(&segment.text),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(out, Print(&segment.text))?;
        }
        line_start = false;
    }
    queue!(out, Print('\n'))?;

    migrate_legacy_notes(notes, session);
    let current_page = session.state().current_page;
    for note in notes
        .notes_for(session.file_name())
        .into_iter()
        .filter(|note| note.page_index == current_page)
    {
        queue!(out, Print(format!("note: {}\n", note.text)))?;
    }
    queue!(
        out,
        SetAttribute(Attribute::Reverse),
        Print(format_status(session)),
        SetAttribute(Attribute::Reset),
        Print('\n')
    )?;
    out.flush()?;
    Ok(())
}

fn format_status(session: &ReadingSession) -> String {
    let state = session.state();
    let mut status = format!(
        "{} | page {}/{}",
        session.file_name(),
        state.current_page + 1,
        session.page_count()
    );
    if let Some(source_page) = session.source_page_for_current() {
        status.push_str(&format!(
            " | source page {}/{}",
            source_page,
            session.document().source.source_page_count()
        ));
    }
    if session.is_bookmarked() {
        status.push_str(" | bookmarked");
    }
    if state.direction == Direction::Rtl {
        status.push_str(" | rtl");
    }
    status
}

fn print_page_map(out: &mut impl Write, session: &ReadingSession) -> Result<()> {
    let page_map = &session.document().layout.page_map;
    if page_map.is_empty() {
        writeln!(out, "{} has no source pages", session.file_name())?;
        return Ok(());
    }
    writeln!(out, "reading\tsource")?;
    for (index, source_page) in page_map.entries().iter().enumerate() {
        writeln!(out, "{}\t{}", index + 1, source_page)?;
    }
    Ok(())
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Ltr => "ltr",
        Direction::Rtl => "rtl",
    }
}

fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {:?}", log_dir))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "pagewise.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
