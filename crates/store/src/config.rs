//! Store configuration structures and loaders.
use std::env;
use std::path::Path;

use serde::Deserialize;

use crate::api::{BookError, Result};

/// Smallest lookup read buffer; a line scan needs room for at least a partial line.
pub(crate) const MIN_SEARCH_WINDOW: usize = 64;

/// Tunables shared by every session of a [`BookStore`](crate::BookStore).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Books larger than this many MiB open on-the-fly; `None` always loads into memory.
    pub on_the_fly_threshold_mb: Option<u64>,
    /// Read buffer used when probing an on-the-fly text book.
    pub search_window_bytes: usize,
    /// Leading positions checked for key order when a text book opens on-the-fly.
    pub order_check_positions: usize,
    /// Write buffer of the save stream.
    pub write_buffer_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            on_the_fly_threshold_mb: None,
            search_window_bytes: 1024,
            order_check_positions: 10_000,
            write_buffer_bytes: 1024 * 1024,
        }
    }
}

impl StoreConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BOOK_ON_THE_FLY_THRESHOLD_MB` - Size above which books open on-the-fly (default: unset)
    /// - `BOOK_SEARCH_WINDOW_BYTES` - Lookup read buffer size (default: 1024)
    /// - `BOOK_ORDER_CHECK_POSITIONS` - Positions sampled for order (default: 10000)
    /// - `BOOK_WRITE_BUFFER_BYTES` - Save buffer size (default: 1 MiB)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(threshold) = read_env::<u64>("BOOK_ON_THE_FLY_THRESHOLD_MB") {
            config.on_the_fly_threshold_mb = Some(threshold);
        }
        if let Some(window) = read_env::<usize>("BOOK_SEARCH_WINDOW_BYTES") {
            config.search_window_bytes = window.max(MIN_SEARCH_WINDOW);
        }
        if let Some(positions) = read_env::<usize>("BOOK_ORDER_CHECK_POSITIONS") {
            config.order_check_positions = positions;
        }
        if let Some(buffer) = read_env::<usize>("BOOK_WRITE_BUFFER_BYTES") {
            config.write_buffer_bytes = buffer.max(1);
        }

        config
    }

    /// Load config from a TOML file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| BookError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.search_window_bytes = config.search_window_bytes.max(MIN_SEARCH_WINDOW);
        config.write_buffer_bytes = config.write_buffer_bytes.max(1);
        Ok(config)
    }

    /// Threshold in bytes after applying a per-call override.
    pub(crate) fn threshold_bytes(&self, override_mb: Option<u64>) -> Option<u64> {
        override_mb
            .or(self.on_the_fly_threshold_mb)
            .map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.toml");
        std::fs::write(&path, "on_the_fly_threshold_mb = 64\nsearch_window_bytes = 4096\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.on_the_fly_threshold_mb, Some(64));
        assert_eq!(config.search_window_bytes, 4096);
        assert_eq!(config.order_check_positions, 10_000);
        assert_eq!(config.write_buffer_bytes, 1024 * 1024);
    }

    #[test]
    fn load_clamps_zero_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.toml");
        std::fs::write(&path, "search_window_bytes = 0\nwrite_buffer_bytes = 0\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.search_window_bytes, MIN_SEARCH_WINDOW);
        assert_eq!(config.write_buffer_bytes, 1);
    }

    #[test]
    fn load_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.toml");
        std::fs::write(&path, "search_window_bytes = \"wide\"\n").unwrap();
        assert!(matches!(StoreConfig::load(&path), Err(BookError::Config { .. })));
    }

    #[test]
    fn per_call_threshold_wins() {
        let config = StoreConfig {
            on_the_fly_threshold_mb: Some(100),
            ..StoreConfig::default()
        };
        assert_eq!(config.threshold_bytes(Some(1)), Some(1024 * 1024));
        assert_eq!(config.threshold_bytes(None), Some(100 * 1024 * 1024));
        assert_eq!(StoreConfig::default().threshold_bytes(None), None);
    }
}
