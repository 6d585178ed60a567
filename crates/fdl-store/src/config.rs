use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::layout::Layout;

/// Flush/sync strategy for store writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
    /// `fsync` every object, document, and log append before it is visible.
    EveryWrite,
}

impl SyncMode {
    pub fn syncs(&self) -> bool {
        matches!(self, Self::EveryWrite)
    }
}

/// Configuration for one store root.
///
/// Loadable from TOML; absent keys take their defaults:
///
/// ```toml
/// root = "/var/lib/fdl"
/// sync_mode = "every_write"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory of the whole store namespace.
    pub root: PathBuf,
    pub sync_mode: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(Layout::DEFAULT_ROOT),
            sync_mode: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Config for the given root with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load a TOML config file.
    pub fn from_toml_file(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// The path layout rooted at this config's root.
    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.root, PathBuf::from("./data"));
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
        assert!(!c.sync_mode.syncs());
    }

    #[test]
    fn toml_with_all_keys() {
        let c = StoreConfig::from_toml_str("root = \"/srv/fdl\"\nsync_mode = \"every_write\"\n")
            .unwrap();
        assert_eq!(c.root, PathBuf::from("/srv/fdl"));
        assert_eq!(c.sync_mode, SyncMode::EveryWrite);
    }

    #[test]
    fn toml_missing_keys_use_defaults() {
        let c = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(c, StoreConfig::default());
    }

    #[test]
    fn toml_rejects_unknown_sync_mode() {
        let err = StoreConfig::from_toml_str("sync_mode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn from_toml_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fdl.toml");
        std::fs::write(&path, "root = \"store\"").unwrap();
        let c = StoreConfig::from_toml_file(&path).unwrap();
        assert_eq!(c.layout().root(), Path::new("store"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreConfig::from_toml_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
