//! Base ⊕ overlay merge rule.
//!
//! The same rule backs on-the-fly lookups, on-the-fly mutations and the
//! streaming save, so an entry reads the same before and after a save.

use crate::book::{BookEntry, BookMove, EntryKind};

/// Combines a base entry with an overlay entry.
///
/// A `Normal` overlay replaces the base outright. A `Patch` overlay is merged
/// move by move: for a usi present in both, the patch's ponder, score, depth
/// and comment win when set, and counts are summed. Base-only moves keep
/// their base order; patch-only moves are appended after them.
pub fn merge_entries(base: &BookEntry, overlay: &BookEntry) -> BookEntry {
    if overlay.kind == EntryKind::Normal {
        return overlay.clone();
    }

    let mut moves: Vec<BookMove> = Vec::with_capacity(base.moves.len() + overlay.moves.len());
    for base_move in &base.moves {
        match overlay.moves.iter().find(|mv| mv.usi == base_move.usi) {
            Some(patch) => moves.push(merge_move(base_move, patch)),
            None => moves.push(base_move.clone()),
        }
    }
    for patch in &overlay.moves {
        if base.position_of(&patch.usi).is_none() {
            moves.push(patch.clone());
        }
    }

    BookEntry {
        comment: if overlay.comment.is_empty() {
            base.comment.clone()
        } else {
            overlay.comment.clone()
        },
        moves,
        min_ply: base.min_ply.min(overlay.min_ply),
        kind: EntryKind::Normal,
    }
}

fn merge_move(base: &BookMove, patch: &BookMove) -> BookMove {
    let count = match (base.count, patch.count) {
        (None, None) => None,
        (base, patch) => Some(base.unwrap_or(0).saturating_add(patch.unwrap_or(0))),
    };
    BookMove {
        usi: base.usi.clone(),
        usi2: patch.usi2.clone().or_else(|| base.usi2.clone()),
        score: patch.score.or(base.score),
        depth: patch.depth.or(base.depth),
        count,
        comment: if patch.comment.is_empty() {
            base.comment.clone()
        } else {
            patch.comment.clone()
        },
    }
}

/// Effective entry for a key given what the base file and the overlay hold.
pub fn resolve_entry(base: Option<BookEntry>, overlay: Option<&BookEntry>) -> Option<BookEntry> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(merge_entries(&base, overlay)),
        (None, Some(overlay)) => Some(overlay.clone()),
        (base, None) => base,
    }
}
