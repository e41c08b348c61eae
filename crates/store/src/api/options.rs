use std::fmt;

/// Identifier of an open session.
///
/// [`SessionId::DEFAULT`] is reserved and always live; ids handed out by
/// `open_as_new_session` count up from 1 and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u32);

impl SessionId {
    pub const DEFAULT: SessionId = SessionId(0);

    pub const fn is_default(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a session holds its book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BookLoadingMode {
    /// Whole book decoded into memory.
    InMemory,
    /// Source file stays on disk; edits live in an overlay.
    OnTheFly,
}

/// Per-call options for `open`.
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    /// Files larger than this many MiB open on-the-fly. Overrides the store config.
    pub on_the_fly_threshold_mb: Option<u64>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_the_fly_threshold_mb(mut self, threshold: u64) -> Self {
        self.on_the_fly_threshold_mb = Some(threshold);
        self
    }
}
