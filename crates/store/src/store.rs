//! The book store: session lifecycle, lookups, mutations, save and import.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use book_core::codec::{binary, text};
use book_core::{
    AperyZobrist, Book, BookEntry, BookFormat, BookKey, BookMove, EntryKind, FormatError,
    PositionHasher, position_key, resolve_entry,
};
use tokio::fs::File;
use tracing::{debug, info};

use crate::api::{BookError, BookLoadingMode, OpenOptions, Result, SessionId};
use crate::config::StoreConfig;
use crate::import::{self, BuiltinRecordParser, ImportSettings, ImportSummary, RecordParser};
use crate::persist;
use crate::reader::{self, EntryStream};
use crate::session::{OnTheFlyBook, Session, SessionRegistry};

const ORDER_CHECK_BUFFER: usize = 64 * 1024;

/// Owns every open session and routes operations to them.
///
/// Operations that touch a session take `&mut self`, so calls against one
/// store are serialized by the borrow checker. Sharing a store across tasks
/// (and any locking that needs) is up to the embedding application.
pub struct BookStore {
    config: StoreConfig,
    hasher: Arc<dyn PositionHasher>,
    parser: Arc<dyn RecordParser>,
    sessions: SessionRegistry,
}

impl BookStore {
    /// Store with default configuration, the Apery hasher and the built-in record parser.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BookStoreBuilder {
        BookStoreBuilder::new()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Opens `path` into the default session.
    ///
    /// Files above the on-the-fly threshold stay on disk; everything else is
    /// decoded into memory. On failure the default session is left as it was.
    pub async fn open(&mut self, path: impl AsRef<Path>, options: &OpenOptions) -> Result<BookLoadingMode> {
        let session = self.load(path.as_ref(), options).await?;
        let mode = session.mode();
        self.sessions.replace(SessionId::DEFAULT, session)?;
        Ok(mode)
    }

    /// Opens `path` into a new session.
    pub async fn open_as_new_session(
        &mut self,
        path: impl AsRef<Path>,
        options: &OpenOptions,
    ) -> Result<(SessionId, BookLoadingMode)> {
        let session = self.load(path.as_ref(), options).await?;
        let mode = session.mode();
        let id = self.sessions.insert(session);
        debug!("opened session {}", id);
        Ok((id, mode))
    }

    /// Releases a session. Closing the default session resets it instead.
    pub fn close(&mut self, id: SessionId) -> Result<()> {
        self.sessions.remove(id)?;
        debug!("closed session {}", id);
        Ok(())
    }

    /// Releases a session's file and resets it to an empty in-memory text book.
    pub fn clear(&mut self, id: SessionId) -> Result<()> {
        self.sessions.replace(id, Session::empty())
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        self.sessions.ids()
    }

    pub fn is_saved(&self, id: SessionId) -> Result<bool> {
        Ok(self.sessions.get(id)?.is_saved())
    }

    pub fn format(&self, id: SessionId) -> Result<BookFormat> {
        Ok(self.sessions.get(id)?.format())
    }

    pub fn loading_mode(&self, id: SessionId) -> Result<BookLoadingMode> {
        Ok(self.sessions.get(id)?.mode())
    }

    /// Candidate moves for a SFEN, in priority order.
    pub async fn search(&mut self, id: SessionId, sfen: &str) -> Result<Vec<BookMove>> {
        Ok(self
            .entry(id, sfen)
            .await?
            .map(|entry| entry.moves)
            .unwrap_or_default())
    }

    /// Effective entry for a SFEN; on-the-fly sessions merge the overlay over the file.
    pub async fn entry(&mut self, id: SessionId, sfen: &str) -> Result<Option<BookEntry>> {
        let session = self.sessions.get_mut(id)?;
        let (key, _) = position_key(session.format(), sfen, self.hasher.as_ref())?;
        match session {
            Session::InMemory { book, .. } => Ok(book.get(&key).cloned()),
            Session::OnTheFly { book, .. } => {
                let layout = reader::layout_for(book.overlay.format(), &self.config);
                let base = reader::lookup(layout.as_ref(), &mut book.file, book.size, &key).await?;
                Ok(resolve_entry(base, book.overlay.get(&key)))
            }
        }
    }

    /// Replaces the move with the same usi, or appends it.
    ///
    /// Binary sessions drop the comment, ponder and depth, which that format
    /// cannot store.
    pub async fn update_move(&mut self, id: SessionId, sfen: &str, mut mv: BookMove) -> Result<()> {
        self.sessions.get(id)?.format().normalize_move(&mut mv);
        self.mutate(id, sfen, true, move |entry| {
            entry.upsert_move(mv);
            true
        })
        .await
    }

    /// Removes a move; unknown positions and moves are ignored.
    pub async fn remove_move(&mut self, id: SessionId, sfen: &str, usi: &str) -> Result<()> {
        self.mutate(id, sfen, false, |entry| entry.remove_move(usi))
            .await
    }

    /// Moves `usi` to `index` (clamped); unknown positions and moves are ignored.
    pub async fn reorder_move(
        &mut self,
        id: SessionId,
        sfen: &str,
        usi: &str,
        index: usize,
    ) -> Result<()> {
        self.mutate(id, sfen, false, |entry| entry.reorder_move(usi, index))
            .await
    }

    /// Applies `edit` to the effective entry of `sfen` and stores the result.
    ///
    /// On-the-fly sessions write the whole edited entry into the overlay as
    /// a `Normal` entry so it replaces the base record, including when it
    /// ends up empty.
    async fn mutate<F>(&mut self, id: SessionId, sfen: &str, create: bool, edit: F) -> Result<()>
    where
        F: FnOnce(&mut BookEntry) -> bool + Send,
    {
        let session = self.sessions.get_mut(id)?;
        let (key, ply) = position_key(session.format(), sfen, self.hasher.as_ref())?;

        match session {
            Session::InMemory { book, saved } => {
                let entry = if create {
                    book.get_or_insert_with(&key, || BookEntry::new(ply, EntryKind::Normal))
                } else {
                    book.get_mut(&key)
                };
                if let Some(entry) = entry
                    && edit(entry)
                {
                    *saved = false;
                }
            }
            Session::OnTheFly { book, saved } => {
                let layout = reader::layout_for(book.overlay.format(), &self.config);
                let base = reader::lookup(layout.as_ref(), &mut book.file, book.size, &key).await?;
                let mut entry = match resolve_entry(base, book.overlay.get(&key)) {
                    Some(entry) => entry,
                    None if create => BookEntry::new(ply, EntryKind::Normal),
                    None => return Ok(()),
                };
                if edit(&mut entry) {
                    entry.kind = EntryKind::Normal;
                    if let Some(slot) = book.overlay.get_or_insert_with(&key, BookEntry::default) {
                        *slot = entry;
                    }
                    *saved = false;
                }
            }
        }
        Ok(())
    }

    /// Writes the session's effective book to `output`.
    ///
    /// The extension must match the session format. An on-the-fly session
    /// cannot be saved over its own source file.
    pub async fn save(&mut self, id: SessionId, output: impl AsRef<Path>) -> Result<()> {
        let output = output.as_ref();
        let session = self.sessions.get_mut(id)?;
        let format = session.format();
        if BookFormat::from_path(output) != format {
            return Err(BookError::UnsupportedExtension {
                path: output.to_path_buf(),
                format,
            });
        }

        match session {
            Session::InMemory { book, saved } => {
                persist::save_book(book, output, &self.config).await?;
                *saved = true;
            }
            Session::OnTheFly { book, saved } => {
                if resolve_target(output).await? == book.path {
                    return Err(BookError::PathConflict(output.to_path_buf()));
                }
                persist::save_merged(&mut book.file, format, &book.overlay, output, &self.config)
                    .await?;
                *saved = true;
            }
        }
        Ok(())
    }

    /// Imports game records into a session, reporting progress in `[0, 1]`.
    pub async fn import(
        &mut self,
        id: SessionId,
        settings: &ImportSettings,
        mut on_progress: impl FnMut(f64) + Send,
    ) -> Result<ImportSummary> {
        let session = self.sessions.get_mut(id)?;
        import::run(
            session,
            self.hasher.as_ref(),
            self.parser.as_ref(),
            settings,
            &mut on_progress,
        )
        .await
    }

    async fn load(&self, path: &Path, options: &OpenOptions) -> Result<Session> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(BookError::NotAFile(path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BookError::NotAFile(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let format = BookFormat::from_path(path);
        let size = metadata.len();

        match self.config.threshold_bytes(options.on_the_fly_threshold_mb) {
            Some(threshold) if size > threshold => self.attach(path, format, size).await,
            _ => {
                let bytes = tokio::fs::read(path).await?;
                let book = match format {
                    BookFormat::Text => Book::Text(text::decode(&bytes)?),
                    BookFormat::Binary => Book::Binary(binary::decode(&bytes)?),
                };
                info!(
                    "Loaded {} positions from {} into memory",
                    book.len(),
                    path.display()
                );
                Ok(Session::InMemory { book, saved: true })
            }
        }
    }

    async fn attach(&self, path: &Path, format: BookFormat, size: u64) -> Result<Session> {
        let mut file = File::open(path).await?;
        match format {
            BookFormat::Binary if size % binary::RECORD_SIZE as u64 != 0 => {
                return Err(FormatError::BadLength(size).into());
            }
            BookFormat::Binary => {}
            BookFormat::Text => self.check_order(&mut file, path).await?,
        }
        let canonical = tokio::fs::canonicalize(path).await?;
        info!("Attached {} ({} bytes) on-the-fly", path.display(), size);
        Ok(Session::OnTheFly {
            book: OnTheFlyBook {
                file,
                size,
                path: canonical,
                overlay: format.empty_book(),
            },
            saved: true,
        })
    }

    /// Checks that the leading positions of a text book are strictly ascending.
    async fn check_order(&self, file: &mut File, path: &Path) -> Result<()> {
        let mut stream = EntryStream::open(BookFormat::Text, file, ORDER_CHECK_BUFFER).await?;
        let mut previous: Option<String> = None;
        for _ in 0..self.config.order_check_positions {
            let Some((BookKey::Text(key), _)) = stream.next_entry().await? else {
                break;
            };
            if let Some(previous) = previous.as_deref()
                && previous >= key.as_str()
            {
                return Err(BookError::OrderingViolation {
                    path: path.to_path_buf(),
                    previous: previous.to_string(),
                    next: key,
                });
            }
            previous = Some(key);
        }
        Ok(())
    }
}

impl Default for BookStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical form of a save target, which may not exist yet.
async fn resolve_target(output: &Path) -> Result<PathBuf> {
    if let Ok(path) = tokio::fs::canonicalize(output).await {
        return Ok(path);
    }
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = tokio::fs::canonicalize(parent).await?;
    Ok(match output.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    })
}

/// Builder for [`BookStore`] with injectable collaborators.
pub struct BookStoreBuilder {
    config: StoreConfig,
    hasher: Option<Arc<dyn PositionHasher>>,
    parser: Option<Arc<dyn RecordParser>>,
}

impl BookStoreBuilder {
    fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            hasher: None,
            parser: None,
        }
    }

    /// Override store configuration
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Position hasher for binary books (default: Apery Zobrist keys)
    pub fn hasher(mut self, hasher: impl PositionHasher + 'static) -> Self {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    /// Record parser for imports (default: built-in CSA/USI parser)
    pub fn record_parser(mut self, parser: impl RecordParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn build(self) -> BookStore {
        BookStore {
            config: self.config,
            hasher: self
                .hasher
                .unwrap_or_else(|| Arc::new(AperyZobrist::new())),
            parser: self
                .parser
                .unwrap_or_else(|| Arc::new(BuiltinRecordParser)),
            sessions: SessionRegistry::new(),
        }
    }
}
