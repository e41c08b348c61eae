use std::path::{Path, PathBuf};

use book_core::{BookEntry, BookMove, EntryKind, Position, PositionHasher, key_of_position};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::record::{GameRecord, RecordError, RecordFormat, RecordParser};
use super::settings::{ImportSettings, ImportSource, ImportSummary};
use crate::api::{BookError, BookLoadingMode, Result};
use crate::session::Session;

enum FileOutcome {
    Success,
    Error,
    Skipped,
}

/// Counts admitted moves into a session's book or overlay.
struct Tally<'a> {
    session: &'a mut Session,
    hasher: &'a dyn PositionHasher,
    added: u64,
    duplicates: u64,
}

impl Tally<'_> {
    fn record(&mut self, position: &Position, usi: &str) {
        let key = key_of_position(self.session.format(), position, self.hasher);
        let ply = position.ply();
        let (book, kind) = match &mut *self.session {
            Session::InMemory { book, .. } => (book, EntryKind::Normal),
            Session::OnTheFly { book, .. } => (&mut book.overlay, EntryKind::Patch),
        };
        let Some(entry) = book.get_or_insert_with(&key, || BookEntry::new(ply, kind)) else {
            return;
        };
        entry.min_ply = entry.min_ply.min(ply);
        match entry.moves.iter_mut().find(|mv| mv.usi == usi) {
            Some(mv) => {
                mv.count = Some(mv.count.unwrap_or(0).saturating_add(1));
                self.duplicates += 1;
            }
            None => {
                entry.moves.push(BookMove::new(usi).with_count(1));
                self.added += 1;
            }
        }
        entry.sort_by_count();
        self.session.set_saved(false);
    }
}

/// Moves of `record` that pass the ply and player filters, with the
/// position each was played from. Fails without side effects if any move
/// cannot be played.
fn admitted_moves(
    record: &GameRecord,
    settings: &ImportSettings,
) -> std::result::Result<Vec<(Position, String)>, RecordError> {
    let mut admitted = Vec::new();
    let mut stack: Vec<_> = record
        .moves
        .iter()
        .rev()
        .map(|node| (record.start.clone(), node))
        .collect();

    while let Some((position, node)) = stack.pop() {
        let mut next = position.clone();
        next.apply_usi(&node.usi)?;
        stack.extend(node.children.iter().rev().map(|child| (next.clone(), child)));
        if settings.admits_ply(position.ply())
            && settings.player_criteria.admits(position.turn(), record)
        {
            admitted.push((position, node.usi.clone()));
        }
    }
    Ok(admitted)
}

/// Record files named by `settings`. The directory walk runs on the
/// blocking pool.
async fn collect_files(
    settings: &ImportSettings,
    parser: &dyn RecordParser,
) -> Result<Vec<(PathBuf, Option<RecordFormat>)>> {
    match &settings.source {
        ImportSource::File(path) => {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {}
                _ => return Err(BookError::NotAFile(path.clone())),
            }
            Ok(vec![(path.clone(), parser.detect(path))])
        }
        ImportSource::Directory(root) => {
            match tokio::fs::metadata(root).await {
                Ok(meta) if meta.is_dir() => {}
                _ => return Err(BookError::NotAFile(root.clone())),
            }
            let walk_root = root.clone();
            let paths = tokio::task::spawn_blocking(move || walk_files(&walk_root))
                .await
                .map_err(|e| BookError::Io(std::io::Error::other(e)))?;
            Ok(paths
                .into_iter()
                .filter_map(|path| {
                    let format = parser.detect(&path)?;
                    Some((path, Some(format)))
                })
                .collect())
        }
    }
}

/// Regular files under `root` in file-name order, following links.
fn walk_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Imports every record named by `settings` into `session`.
pub(crate) async fn run(
    session: &mut Session,
    hasher: &dyn PositionHasher,
    parser: &dyn RecordParser,
    settings: &ImportSettings,
    on_progress: &mut (dyn FnMut(f64) + Send),
) -> Result<ImportSummary> {
    let files = collect_files(settings, parser).await?;
    let total = files.len() as f64;
    let mode = session.mode();
    let mut tally = Tally {
        session,
        hasher,
        added: 0,
        duplicates: 0,
    };
    let mut summary = ImportSummary::default();

    for (index, (path, format)) in files.iter().enumerate() {
        let done = index as f64;
        let mut progress = |fraction: f64| on_progress(((done + fraction) / total).min(1.0));

        let outcome = match format {
            None => {
                warn!("unknown record format: {}", path.display());
                FileOutcome::Error
            }
            Some(format) if format.is_batch() && settings.player_criteria.needs_names() => {
                debug!("batch file has no player names: {}", path.display());
                FileOutcome::Skipped
            }
            Some(format) => {
                import_file(&mut tally, parser, settings, path, *format, &mut progress).await
            }
        };
        match outcome {
            FileOutcome::Success => summary.success_file_count += 1,
            FileOutcome::Error => summary.error_file_count += 1,
            FileOutcome::Skipped => summary.skipped_file_count += 1,
        }
        progress(1.0);
    }

    if mode == BookLoadingMode::InMemory {
        summary.entry_count = Some(tally.added);
        summary.duplicate_count = Some(tally.duplicates);
    }
    info!(
        "Imported {} files ({} failed, {} skipped): {} new moves, {} repeats",
        summary.success_file_count,
        summary.error_file_count,
        summary.skipped_file_count,
        tally.added,
        tally.duplicates
    );
    Ok(summary)
}

async fn import_file(
    tally: &mut Tally<'_>,
    parser: &dyn RecordParser,
    settings: &ImportSettings,
    path: &Path,
    format: RecordFormat,
    progress: &mut (dyn FnMut(f64) + Send),
) -> FileOutcome {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            return FileOutcome::Error;
        }
    };

    if !format.is_batch() {
        let admitted = parser
            .parse(&bytes, format)
            .and_then(|record| admitted_moves(&record, settings));
        return match admitted {
            Ok(admitted) => {
                for (position, usi) in &admitted {
                    tally.record(position, usi);
                }
                FileOutcome::Success
            }
            Err(e) => {
                warn!("cannot import {}: {}", path.display(), e);
                FileOutcome::Error
            }
        };
    }

    let Ok(text) = std::str::from_utf8(&bytes) else {
        warn!("cannot import {}: not UTF-8", path.display());
        return FileOutcome::Error;
    };
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let mut usable = 0usize;
    for (index, line) in lines.iter().enumerate() {
        let admitted = parser
            .parse(line.as_bytes(), RecordFormat::Usi)
            .and_then(|record| admitted_moves(&record, settings));
        match admitted {
            Ok(admitted) => {
                usable += 1;
                for (position, usi) in &admitted {
                    tally.record(position, usi);
                }
            }
            Err(e) => debug!("{} line {}: {}", path.display(), index + 1, e),
        }
        progress((index + 1) as f64 / lines.len() as f64);
    }

    if usable == 0 {
        warn!("no usable lines in {}", path.display());
        return FileOutcome::Error;
    }
    FileOutcome::Success
}
