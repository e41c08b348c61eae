//! Open book handles and the registry that owns them.
//!
//! # Design
//!
//! ```text
//! SessionRegistry
//! ├── sessions: BTreeMap<SessionId, Session>  (DEFAULT always present)
//! └── next_id: u32                            (monotonic, never reused)
//! ```
use std::collections::BTreeMap;
use std::path::PathBuf;

use book_core::{Book, BookFormat};
use tokio::fs::File;

use crate::api::{BookError, BookLoadingMode, Result, SessionId};

/// Source file of an on-the-fly session plus the edits made on top of it.
pub(crate) struct OnTheFlyBook {
    pub(crate) file: File,
    pub(crate) size: u64,
    /// Canonical source path, compared against save targets.
    pub(crate) path: PathBuf,
    pub(crate) overlay: Book,
}

pub(crate) enum Session {
    InMemory { book: Book, saved: bool },
    OnTheFly { book: OnTheFlyBook, saved: bool },
}

impl Session {
    /// Fresh empty in-memory text book.
    pub(crate) fn empty() -> Self {
        Session::InMemory {
            book: BookFormat::Text.empty_book(),
            saved: true,
        }
    }

    pub(crate) fn format(&self) -> BookFormat {
        match self {
            Session::InMemory { book, .. } => book.format(),
            Session::OnTheFly { book, .. } => book.overlay.format(),
        }
    }

    pub(crate) fn mode(&self) -> BookLoadingMode {
        match self {
            Session::InMemory { .. } => BookLoadingMode::InMemory,
            Session::OnTheFly { .. } => BookLoadingMode::OnTheFly,
        }
    }

    pub(crate) fn is_saved(&self) -> bool {
        match self {
            Session::InMemory { saved, .. } | Session::OnTheFly { saved, .. } => *saved,
        }
    }

    pub(crate) fn set_saved(&mut self, value: bool) {
        match self {
            Session::InMemory { saved, .. } | Session::OnTheFly { saved, .. } => *saved = value,
        }
    }
}

pub(crate) struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
    next_id: u32,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        let mut sessions = BTreeMap::new();
        sessions.insert(SessionId::DEFAULT, Session::empty());
        Self {
            sessions,
            next_id: 1,
        }
    }

    pub(crate) fn get(&self, id: SessionId) -> Result<&Session> {
        self.sessions.get(&id).ok_or(BookError::SessionNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Result<&mut Session> {
        self.sessions
            .get_mut(&id)
            .ok_or(BookError::SessionNotFound(id))
    }

    /// Replaces a live session, dropping the previous one and its file handle.
    pub(crate) fn replace(&mut self, id: SessionId, session: Session) -> Result<()> {
        let slot = self.get_mut(id)?;
        *slot = session;
        Ok(())
    }

    /// Registers a session under a fresh id.
    pub(crate) fn insert(&mut self, session: Session) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, session);
        id
    }

    /// Removes a session; the default session is reset instead.
    pub(crate) fn remove(&mut self, id: SessionId) -> Result<()> {
        if id.is_default() {
            return self.replace(id, Session::empty());
        }
        self.sessions
            .remove(&id)
            .map(drop)
            .ok_or(BookError::SessionNotFound(id))
    }

    pub(crate) fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }
}
