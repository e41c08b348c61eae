use std::path::PathBuf;

use book_core::Color;

use super::record::GameRecord;

/// Where records come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportSource {
    File(PathBuf),
    /// Walked recursively; only files with a known record extension count.
    Directory(PathBuf),
}

/// Whose moves are imported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayerCriteria {
    #[default]
    Any,
    Black,
    White,
    /// Sides whose player name contains this text.
    Name(String),
}

impl PlayerCriteria {
    pub fn admits(&self, color: Color, record: &GameRecord) -> bool {
        match self {
            PlayerCriteria::Any => true,
            PlayerCriteria::Black => color == Color::Black,
            PlayerCriteria::White => color == Color::White,
            PlayerCriteria::Name(name) => record
                .player(color)
                .is_some_and(|player| player.contains(name.as_str())),
        }
    }

    pub fn needs_names(&self) -> bool {
        matches!(self, PlayerCriteria::Name(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSettings {
    pub source: ImportSource,
    /// Moves played from positions with a ply in `min_ply..=max_ply` are imported.
    pub min_ply: u32,
    pub max_ply: u32,
    pub player_criteria: PlayerCriteria,
}

impl ImportSettings {
    pub fn new(source: ImportSource) -> Self {
        Self {
            source,
            min_ply: 1,
            max_ply: u32::MAX,
            player_criteria: PlayerCriteria::Any,
        }
    }

    pub fn ply_range(mut self, min_ply: u32, max_ply: u32) -> Self {
        self.min_ply = min_ply;
        self.max_ply = max_ply;
        self
    }

    pub fn player_criteria(mut self, criteria: PlayerCriteria) -> Self {
        self.player_criteria = criteria;
        self
    }

    pub(crate) fn admits_ply(&self, ply: u32) -> bool {
        (self.min_ply..=self.max_ply).contains(&ply)
    }
}

/// Outcome of an import.
///
/// `entry_count` (moves added) and `duplicate_count` (existing moves whose
/// count went up) are only reported for in-memory sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub success_file_count: u64,
    pub error_file_count: u64,
    pub skipped_file_count: u64,
    pub entry_count: Option<u64>,
    pub duplicate_count: Option<u64>,
}
