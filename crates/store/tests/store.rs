use std::path::{Path, PathBuf};

use book_store::{
    BookError, BookFormat, BookLoadingMode, BookMove, BookStore, ImportSettings, ImportSource,
    OpenOptions, SessionId, StoreConfig,
};

const START: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";
const AFTER_7G7F: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2";
const AFTER_2G2F: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/7P1/PPPPPPP1P/1B5R1/LNSGKGSNL w - 2";

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/standard.db")
}

fn on_the_fly() -> OpenOptions {
    OpenOptions::new().on_the_fly_threshold_mb(0)
}

fn usis(moves: &[BookMove]) -> Vec<&str> {
    moves.iter().map(|mv| mv.usi.as_str()).collect()
}

/// Copy of the sample book inside a scratch directory.
fn scratch_book(dir: &Path) -> PathBuf {
    let path = dir.join("book.db");
    std::fs::copy(fixture(), &path).expect("copy fixture");
    path
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn standard_start_position_in_memory() {
    let mut store = BookStore::new();
    let mode = store
        .open(fixture(), &OpenOptions::new())
        .await
        .expect("open sample book");
    assert_eq!(mode, BookLoadingMode::InMemory);

    let moves = store.search(SessionId::DEFAULT, START).await.expect("search");
    assert_eq!(usis(&moves), ["2g2f", "7g7f", "5g5f", "2h7h", "3g3f"]);
    assert_eq!(moves[0].usi2.as_deref(), Some("8c8d"));
    assert_eq!(moves[0].score, Some(63));
    assert_eq!(moves[0].depth, Some(27));
    assert_eq!(moves[0].count, None);
    assert_eq!(moves[4].comment, "rare");
}

#[tokio::test]
async fn standard_start_position_on_the_fly() {
    let mut store = BookStore::new();
    let mode = store.open(fixture(), &on_the_fly()).await.expect("open sample book");
    assert_eq!(mode, BookLoadingMode::OnTheFly);

    let moves = store.search(SessionId::DEFAULT, START).await.expect("search");
    assert_eq!(usis(&moves), ["2g2f", "7g7f", "5g5f", "2h7h", "3g3f"]);
    assert_eq!(moves[0].score, Some(63));
    assert_eq!(moves[0].depth, Some(27));
}

#[tokio::test]
async fn both_modes_agree_on_every_position() {
    let mut store = BookStore::new();
    store.open(fixture(), &OpenOptions::new()).await.unwrap();
    let (disk, _) = store
        .open_as_new_session(fixture(), &on_the_fly())
        .await
        .unwrap();

    let missing = "lnsgkgsnl/1r5b1/ppppppppp/9/9/4P4/PPPP1PPPP/1B5R1/LNSGKGSNL w - 2";
    for sfen in [START, AFTER_7G7F, AFTER_2G2F, missing] {
        let in_memory = store.search(SessionId::DEFAULT, sfen).await.unwrap();
        let on_disk = store.search(disk, sfen).await.unwrap();
        assert_eq!(in_memory, on_disk, "{sfen}");
    }
    assert!(store.search(disk, missing).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_ignores_ply_and_sfen_prefix() {
    let mut store = BookStore::new();
    store.open(fixture(), &on_the_fly()).await.unwrap();

    let moves = store
        .search(
            SessionId::DEFAULT,
            "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 40",
        )
        .await
        .unwrap();
    assert_eq!(usis(&moves), ["3c3d", "8c8d"]);
}

#[tokio::test]
async fn malformed_sfen_is_rejected() {
    let mut store = BookStore::new();
    let err = store.search(SessionId::DEFAULT, "garbage").await.unwrap_err();
    assert!(matches!(err, BookError::InvalidPosition(_)), "{err:?}");
}

// ============================================================================
// Opening
// ============================================================================

#[tokio::test]
async fn open_rejects_missing_files_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = BookStore::new();

    let err = store
        .open(dir.path(), &OpenOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookError::NotAFile(_)), "{err:?}");

    let err = store
        .open(dir.path().join("absent.db"), &OpenOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookError::NotAFile(_)), "{err:?}");
}

#[tokio::test]
async fn failed_open_keeps_previous_session() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.db");
    std::fs::write(&bad, "not a book\nsfen a b - 1\n").unwrap();

    let mut store = BookStore::new();
    store.open(fixture(), &OpenOptions::new()).await.unwrap();

    let err = store.open(&bad, &OpenOptions::new()).await.unwrap_err();
    assert!(matches!(err, BookError::MalformedFormat(_)), "{err:?}");
    let err = store.open(&bad, &on_the_fly()).await.unwrap_err();
    assert!(matches!(err, BookError::MalformedFormat(_)), "{err:?}");

    assert_eq!(store.search(SessionId::DEFAULT, START).await.unwrap().len(), 5);
}

#[tokio::test]
async fn unsorted_book_cannot_be_opened_on_the_fly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unsorted.db");
    std::fs::write(
        &path,
        concat!(
            "#YANEURAOU-DB2016 1.00\n",
            "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1\n",
            "7g7f none none none \n",
            "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2\n",
            "3c3d none none none \n",
        ),
    )
    .unwrap();

    let mut store = BookStore::new();
    let err = store.open(&path, &on_the_fly()).await.unwrap_err();
    assert!(matches!(err, BookError::OrderingViolation { .. }), "{err:?}");

    // Decoding into memory sorts the entries, so the same file loads fine.
    store.open(&path, &OpenOptions::new()).await.unwrap();
    assert_eq!(usis(&store.search(SessionId::DEFAULT, START).await.unwrap()), ["7g7f"]);
}

#[tokio::test]
async fn binary_book_length_must_be_whole_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.bin");
    std::fs::write(&path, [0u8; 17]).unwrap();

    let mut store = BookStore::new();
    for options in [OpenOptions::new(), on_the_fly()] {
        let err = store.open(&path, &options).await.unwrap_err();
        assert!(matches!(err, BookError::MalformedFormat(_)), "{err:?}");
    }
}

#[tokio::test]
async fn zero_search_window_keeps_base_moves() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("book.toml");
    std::fs::write(&config_path, "search_window_bytes = 0\n").unwrap();
    let config = StoreConfig::load(&config_path).expect("load config");

    let mut store = BookStore::builder().config(config).build();
    store.open(fixture(), &on_the_fly()).await.unwrap();
    assert_eq!(store.search(SessionId::DEFAULT, START).await.unwrap().len(), 5);

    store
        .update_move(SessionId::DEFAULT, START, BookMove::new("1g1f"))
        .await
        .unwrap();
    let output = dir.path().join("out.db");
    store.save(SessionId::DEFAULT, &output).await.unwrap();

    let (saved, _) = store
        .open_as_new_session(&output, &OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(
        usis(&store.search(saved, START).await.unwrap()),
        ["2g2f", "7g7f", "5g5f", "2h7h", "3g3f", "1g1f"]
    );
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn session_ids_are_never_reused() {
    let mut store = BookStore::new();
    let (first, _) = store
        .open_as_new_session(fixture(), &OpenOptions::new())
        .await
        .unwrap();
    let (second, _) = store
        .open_as_new_session(fixture(), &on_the_fly())
        .await
        .unwrap();
    assert_eq!((first, second), (SessionId(1), SessionId(2)));

    store.close(first).unwrap();
    assert_eq!(store.sessions(), [SessionId::DEFAULT, second]);
    let err = store.search(first, START).await.unwrap_err();
    assert!(matches!(err, BookError::SessionNotFound(SessionId(1))));
    assert!(matches!(store.close(first), Err(BookError::SessionNotFound(_))));

    let (third, _) = store
        .open_as_new_session(fixture(), &OpenOptions::new())
        .await
        .unwrap();
    assert_eq!(third, SessionId(3));
}

#[tokio::test]
async fn sessions_are_independent() {
    let mut store = BookStore::new();
    store.open(fixture(), &OpenOptions::new()).await.unwrap();
    let (other, _) = store
        .open_as_new_session(fixture(), &OpenOptions::new())
        .await
        .unwrap();

    store.remove_move(other, START, "2g2f").await.unwrap();
    assert_eq!(store.search(other, START).await.unwrap().len(), 4);
    assert_eq!(store.search(SessionId::DEFAULT, START).await.unwrap().len(), 5);
}

#[tokio::test]
async fn clear_and_close_reset_to_an_empty_text_book() {
    let mut store = BookStore::new();
    store.open(fixture(), &on_the_fly()).await.unwrap();
    let (other, _) = store
        .open_as_new_session(fixture(), &on_the_fly())
        .await
        .unwrap();

    store.clear(other).unwrap();
    assert_eq!(store.loading_mode(other).unwrap(), BookLoadingMode::InMemory);
    assert_eq!(store.format(other).unwrap(), BookFormat::Text);
    assert!(store.search(other, START).await.unwrap().is_empty());

    store.close(SessionId::DEFAULT).unwrap();
    assert_eq!(store.sessions(), [SessionId::DEFAULT, other]);
    assert_eq!(
        store.loading_mode(SessionId::DEFAULT).unwrap(),
        BookLoadingMode::InMemory
    );
    assert!(store.search(SessionId::DEFAULT, START).await.unwrap().is_empty());
}

// ============================================================================
// Mutations
// ============================================================================

async fn exercise_mutations(store: &mut BookStore) {
    let id = SessionId::DEFAULT;
    assert!(store.is_saved(id).unwrap());

    // Unknown positions and moves are ignored without dirtying the session.
    store.remove_move(id, START, "9g9f").await.unwrap();
    store.reorder_move(id, AFTER_2G2F, "1c1d", 0).await.unwrap();
    store
        .remove_move(id, "4k4/9/9/9/9/9/9/9/4K4 b - 1", "5i5h")
        .await
        .unwrap();
    assert!(store.is_saved(id).unwrap());

    store
        .update_move(id, START, BookMove::new("7g7f").with_score(99))
        .await
        .unwrap();
    store
        .update_move(id, START, BookMove::new("1g1f").with_count(4))
        .await
        .unwrap();
    assert!(!store.is_saved(id).unwrap());

    let moves = store.search(id, START).await.unwrap();
    assert_eq!(usis(&moves), ["2g2f", "7g7f", "5g5f", "2h7h", "3g3f", "1g1f"]);
    assert_eq!(moves[1], BookMove::new("7g7f").with_score(99));

    store.remove_move(id, START, "2h7h").await.unwrap();
    store.reorder_move(id, START, "3g3f", 0).await.unwrap();
    store.reorder_move(id, START, "2g2f", 100).await.unwrap();
    let moves = store.search(id, START).await.unwrap();
    assert_eq!(usis(&moves), ["3g3f", "7g7f", "5g5f", "1g1f", "2g2f"]);

    // Other positions are untouched.
    assert_eq!(usis(&store.search(id, AFTER_7G7F).await.unwrap()), ["3c3d", "8c8d"]);
    assert_eq!(usis(&store.search(id, AFTER_2G2F).await.unwrap()), ["8c8d"]);

    // A position emptied by removals stays empty.
    store.remove_move(id, AFTER_2G2F, "8c8d").await.unwrap();
    assert!(store.search(id, AFTER_2G2F).await.unwrap().is_empty());

    // A brand new position records the ply it was added at.
    let fresh = "lnsgkgsnl/1r5b1/ppppppppp/9/9/4P4/PPPP1PPPP/1B5R1/LNSGKGSNL w - 2";
    store
        .update_move(id, fresh, BookMove::new("8c8d").with_depth(12))
        .await
        .unwrap();
    assert_eq!(usis(&store.search(id, fresh).await.unwrap()), ["8c8d"]);
}

const EDITED: &str = concat!(
    "#YANEURAOU-DB2016 1.00\n",
    "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2\n",
    "3c3d none 5 20 \n",
    "8c8d none 0 18 \n",
    "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/4P4/PPPP1PPPP/1B5R1/LNSGKGSNL w - 2\n",
    "8c8d none none 12 \n",
    "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1\n",
    "#standard opening\n",
    "3g3f none 10 18  #rare\n",
    "7g7f none 99 none \n",
    "5g5f none 0 20 \n",
    "1g1f none none none 4\n",
    "2g2f 8c8d 63 27 \n",
);

#[tokio::test]
async fn mutations_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = BookStore::new();
    store.open(fixture(), &OpenOptions::new()).await.unwrap();
    exercise_mutations(&mut store).await;

    let output = dir.path().join("edited.db");
    store.save(SessionId::DEFAULT, &output).await.unwrap();
    assert!(store.is_saved(SessionId::DEFAULT).unwrap());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), EDITED);
}

#[tokio::test]
async fn mutations_on_the_fly() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = BookStore::new();
    store.open(fixture(), &on_the_fly()).await.unwrap();
    exercise_mutations(&mut store).await;

    let output = dir.path().join("edited.db");
    store.save(SessionId::DEFAULT, &output).await.unwrap();
    assert!(store.is_saved(SessionId::DEFAULT).unwrap());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), EDITED);

    // Saving leaves the session on-the-fly with its edits still visible.
    assert_eq!(
        store.loading_mode(SessionId::DEFAULT).unwrap(),
        BookLoadingMode::OnTheFly
    );
    assert_eq!(store.search(SessionId::DEFAULT, START).await.unwrap()[0].usi, "3g3f");

    let (reopened, _) = store.open_as_new_session(&output, &on_the_fly()).await.unwrap();
    assert_eq!(
        usis(&store.search(reopened, START).await.unwrap()),
        ["3g3f", "7g7f", "5g5f", "1g1f", "2g2f"]
    );
}

// ============================================================================
// Saving
// ============================================================================

#[tokio::test]
async fn save_reproduces_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = std::fs::read(fixture()).unwrap();
    let mut store = BookStore::new();

    for (name, options) in [("memory", OpenOptions::new()), ("disk", on_the_fly())] {
        let (id, _) = store.open_as_new_session(fixture(), &options).await.unwrap();
        let first = dir.path().join(format!("{name}-1.db"));
        let second = dir.path().join(format!("{name}-2.db"));
        store.save(id, &first).await.unwrap();
        store.save(id, &second).await.unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), source, "{name}");
        assert_eq!(std::fs::read(&second).unwrap(), source, "{name}");
        assert!(!dir.path().join(format!("{name}-1.db.tmp")).exists());
    }
}

#[tokio::test]
async fn save_checks_extension_and_source_path() {
    let dir = tempfile::tempdir().unwrap();
    let book = scratch_book(dir.path());
    let mut store = BookStore::new();
    store.open(&book, &on_the_fly()).await.unwrap();

    let err = store
        .save(SessionId::DEFAULT, dir.path().join("out.bin"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, BookError::UnsupportedExtension { format: BookFormat::Text, .. }),
        "{err:?}"
    );

    let err = store.save(SessionId::DEFAULT, &book).await.unwrap_err();
    assert!(matches!(err, BookError::PathConflict(_)), "{err:?}");
    let aliased = dir.path().join(".").join("book.db");
    let err = store.save(SessionId::DEFAULT, &aliased).await.unwrap_err();
    assert!(matches!(err, BookError::PathConflict(_)), "{err:?}");

    #[cfg(unix)]
    {
        let link = dir.path().join("link.db");
        std::os::unix::fs::symlink(&book, &link).unwrap();
        let err = store.save(SessionId::DEFAULT, &link).await.unwrap_err();
        assert!(matches!(err, BookError::PathConflict(_)), "{err:?}");
    }

    assert_eq!(std::fs::read(&book).unwrap(), std::fs::read(fixture()).unwrap());
    assert!(!dir.path().join("out.bin").exists());
}

#[tokio::test]
async fn in_memory_session_may_overwrite_its_source() {
    let dir = tempfile::tempdir().unwrap();
    let book = scratch_book(dir.path());
    let mut store = BookStore::new();
    store.open(&book, &OpenOptions::new()).await.unwrap();

    store.remove_move(SessionId::DEFAULT, START, "3g3f").await.unwrap();
    store.save(SessionId::DEFAULT, &book).await.unwrap();

    store.open(&book, &OpenOptions::new()).await.unwrap();
    assert_eq!(
        usis(&store.search(SessionId::DEFAULT, START).await.unwrap()),
        ["2g2f", "7g7f", "5g5f", "2h7h"]
    );
}

// ============================================================================
// Binary books
// ============================================================================

#[tokio::test]
async fn binary_book_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.bin");
    std::fs::write(&empty, b"").unwrap();

    let mut store = BookStore::new();
    store.open(&empty, &OpenOptions::new()).await.unwrap();
    assert_eq!(store.format(SessionId::DEFAULT).unwrap(), BookFormat::Binary);

    // Ponder, depth and comment have no place in a binary record.
    let mv = BookMove {
        usi2: Some("3c3d".into()),
        ..BookMove::new("7g7f")
            .with_score(30)
            .with_depth(20)
            .with_count(5)
            .with_comment("dropped")
    };
    store.update_move(SessionId::DEFAULT, START, mv).await.unwrap();
    let expected = vec![BookMove::new("7g7f").with_score(30).with_count(5)];
    assert_eq!(store.search(SessionId::DEFAULT, START).await.unwrap(), expected);

    let output = dir.path().join("out.bin");
    store.save(SessionId::DEFAULT, &output).await.unwrap();
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(hex::encode(&bytes[8..]), "3b1e05001e000000");

    let (disk, mode) = store.open_as_new_session(&output, &on_the_fly()).await.unwrap();
    assert_eq!(mode, BookLoadingMode::OnTheFly);
    assert_eq!(store.search(disk, START).await.unwrap(), expected);

    let again = dir.path().join("again.bin");
    store.save(disk, &again).await.unwrap();
    assert_eq!(hex::encode(std::fs::read(&again).unwrap()), hex::encode(&bytes));

    let err = store.save(disk, dir.path().join("out.db")).await.unwrap_err();
    assert!(matches!(err, BookError::UnsupportedExtension { .. }), "{err:?}");
}

#[tokio::test]
async fn binary_edits_agree_across_modes() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.bin");
    std::fs::write(&empty, b"").unwrap();

    // Base counts dominate the imported ones, so re-sorting by count keeps
    // the base order in memory just as the merge does on disk.
    let mut store = BookStore::new();
    store.open(&empty, &OpenOptions::new()).await.unwrap();
    for (sfen, mv) in [
        (START, BookMove::new("7g7f").with_score(40).with_count(10)),
        (START, BookMove::new("5g5f").with_score(10).with_count(5)),
        (AFTER_7G7F, BookMove::new("3c3d").with_count(4)),
        (AFTER_7G7F, BookMove::new("8c8d").with_count(2)),
    ] {
        store.update_move(SessionId::DEFAULT, sfen, mv).await.unwrap();
    }
    let base = dir.path().join("base.bin");
    store.save(SessionId::DEFAULT, &base).await.unwrap();

    let (memory, _) = store
        .open_as_new_session(&base, &OpenOptions::new())
        .await
        .unwrap();
    let (disk, mode) = store.open_as_new_session(&base, &on_the_fly()).await.unwrap();
    assert_eq!(mode, BookLoadingMode::OnTheFly);

    let corpus = ImportSettings::new(ImportSource::Directory(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/corpus"),
    ));
    for id in [memory, disk] {
        store.import(id, &corpus, |_| {}).await.unwrap();
        store.reorder_move(id, START, "2g2f", 0).await.unwrap();
        store.remove_move(id, AFTER_7G7F, "8c8d").await.unwrap();
        store
            .update_move(id, START, BookMove::new("1g1f").with_score(5).with_count(2))
            .await
            .unwrap();
    }

    for sfen in [START, AFTER_7G7F, AFTER_2G2F] {
        let in_memory = store.search(memory, sfen).await.unwrap();
        let on_disk = store.search(disk, sfen).await.unwrap();
        assert_eq!(in_memory, on_disk, "{sfen}");
    }
    let moves = store.search(disk, START).await.unwrap();
    assert_eq!(usis(&moves), ["2g2f", "7g7f", "5g5f", "1g1f"]);
    assert_eq!(moves[1], BookMove::new("7g7f").with_score(40).with_count(13));
    assert_eq!(usis(&store.search(disk, AFTER_7G7F).await.unwrap()), ["3c3d"]);

    let from_memory = dir.path().join("memory.bin");
    let from_disk = dir.path().join("disk.bin");
    store.save(memory, &from_memory).await.unwrap();
    store.save(disk, &from_disk).await.unwrap();
    assert_eq!(
        hex::encode(std::fs::read(&from_memory).unwrap()),
        hex::encode(std::fs::read(&from_disk).unwrap())
    );
}
