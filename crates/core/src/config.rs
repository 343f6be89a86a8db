//! Application configuration and the data directory layout.
//!
//! [`AppConfig`] is read from `<config-dir>/shelfmark/config.toml`; every
//! field has a default, so a missing or partial file is fine. The data
//! directory can be overridden with the `SHELFMARK_DIR` environment variable.
//!
//! ```text
//! <data>/shelfmark.db     bookmark database
//! <data>/archive/<id>     offline archive of bookmark <id>
//! <data>/thumb/<id>       thumbnail of bookmark <id>
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, ShelfmarkError};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SHELFMARK_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether new bookmarks get an offline archive unless told otherwise.
    #[serde(default = "default_archive")]
    pub archive: bool,

    #[serde(default = "default_archive_concurrency")]
    pub archive_concurrency: usize,

    /// Page download timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Subresource download timeout in seconds.
    #[serde(default = "default_archive_timeout")]
    pub archive_timeout: u64,

    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Address the web server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("shelfmark")
}

fn default_archive() -> bool {
    true
}

fn default_archive_concurrency() -> usize {
    5
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_archive_timeout() -> u64 {
    60
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            archive: default_archive(),
            archive_concurrency: default_archive_concurrency(),
            fetch_timeout: default_fetch_timeout(),
            archive_timeout: default_archive_timeout(),
            accept_invalid_certs: false,
            bind: default_bind(),
        }
    }
}

impl AppConfig {
    /// Loads the user's config file and applies `SHELFMARK_DIR`.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::ConfigError`] when the file is not valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ShelfmarkError::ConfigError(format!("{}: {e}", path.display())))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ShelfmarkError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("shelfmark").join("config.toml")
    }

    pub fn data(&self) -> DataDir {
        DataDir::new(&self.data_dir)
    }

    #[cfg(feature = "fetch")]
    pub fn fetch_config(&self) -> crate::fetch::FetchConfig {
        crate::fetch::FetchConfig::builder()
            .timeout(self.fetch_timeout)
            .accept_invalid_certs(self.accept_invalid_certs)
            .build()
    }

    #[cfg(feature = "fetch")]
    pub fn archiver_config(&self) -> crate::archive::ArchiverConfig {
        crate::archive::ArchiverConfig::builder()
            .concurrency(self.archive_concurrency)
            .timeout(std::time::Duration::from_secs(self.archive_timeout))
            .accept_invalid_certs(self.accept_invalid_certs)
            .build()
    }
}

/// Paths of everything stored under the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> PathBuf {
        self.root.join("shelfmark.db")
    }

    pub fn archive(&self, id: i64) -> PathBuf {
        self.root.join("archive").join(id.to_string())
    }

    pub fn thumbnail(&self, id: i64) -> PathBuf {
        self.root.join("thumb").join(id.to_string())
    }

    /// Removes the archive and thumbnail of a deleted bookmark.
    pub fn remove_files(&self, id: i64) -> Result<()> {
        remove_if_exists(&self.archive(id))?;
        remove_if_exists(&self.thumbnail(id))?;
        Ok(())
    }

    /// Removes every archive and thumbnail, after all bookmarks were deleted.
    pub fn remove_all(&self) -> Result<()> {
        for dir in [self.root.join("archive"), self.root.join("thumb")] {
            match fs::remove_dir_all(&dir) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Follows the `(old, new)` id moves reported by a delete.
    ///
    /// Files already at the new id belong to a deleted bookmark and are replaced.
    pub fn relocate(&self, moves: &[(i64, i64)]) -> Result<()> {
        for &(old, new) in moves {
            for (from, to) in [(self.archive(old), self.archive(new)), (self.thumbnail(old), self.thumbnail(new))] {
                remove_if_exists(&to)?;
                if from.exists() {
                    fs::rename(&from, &to)?;
                    debug!(from = %from.display(), to = %to.display(), "moved bookmark file");
                }
            }
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.archive);
        assert_eq!(config.archive_concurrency, 5);
        assert_eq!(config.archive_timeout, 60);
        assert!(!config.accept_invalid_certs);
        assert!(config.data_dir.ends_with("shelfmark"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "data_dir = \"/srv/shelfmark\"\narchive = false\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/shelfmark"));
        assert!(!config.archive);
        assert_eq!(config.fetch_timeout, 20);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "archive = maybe").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ShelfmarkError::ConfigError(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig { archive_concurrency: 2, ..AppConfig::default() };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().archive_concurrency, 2);
    }

    #[test]
    fn test_data_dir_layout() {
        let data = DataDir::new("/data");
        assert_eq!(data.database(), PathBuf::from("/data/shelfmark.db"));
        assert_eq!(data.archive(3), PathBuf::from("/data/archive/3"));
        assert_eq!(data.thumbnail(3), PathBuf::from("/data/thumb/3"));
    }

    #[test]
    fn test_relocate_follows_moves() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());
        fs::create_dir_all(dir.path().join("thumb")).unwrap();
        fs::create_dir_all(dir.path().join("archive")).unwrap();
        fs::write(data.thumbnail(5), "five").unwrap();
        fs::write(data.thumbnail(2), "stale").unwrap();
        fs::write(data.archive(2), "stale").unwrap();

        data.relocate(&[(5, 2)]).unwrap();

        assert_eq!(fs::read_to_string(data.thumbnail(2)).unwrap(), "five");
        assert!(!data.thumbnail(5).exists());
        assert!(!data.archive(2).exists());
    }

    #[test]
    fn test_remove_files_ignores_missing() {
        let dir = TempDir::new().unwrap();
        DataDir::new(dir.path()).remove_files(9).unwrap();
    }

    #[test]
    fn test_remove_all_keeps_database() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());
        fs::create_dir_all(dir.path().join("archive")).unwrap();
        fs::write(data.archive(1), "a").unwrap();
        fs::write(data.database(), "db").unwrap();

        data.remove_all().unwrap();
        assert!(!data.archive(1).exists());
        assert!(data.database().exists());
    }
}
