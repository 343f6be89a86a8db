//! Single-file archive storage.
//!
//! An archive is an SQLite file holding one bucket per resource. Each bucket
//! has two keys: `content` (gzip-compressed payload) and `type` (the
//! content-type the resource was served with).

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::debug;

use crate::uri::ARCHIVE_ROOT;
use crate::{Result, ShelfmarkError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS archive_entry (
    bucket TEXT NOT NULL,
    key TEXT NOT NULL,
    value BLOB NOT NULL,
    PRIMARY KEY (bucket, key)
);
"#;

const CONTENT_KEY: &str = "content";
const TYPE_KEY: &str = "type";

/// Writes a new archive next to its destination and moves it into place on [`finish`](Self::finish).
pub struct ArchiveWriter {
    conn: Connection,
    temp_path: PathBuf,
    dest: PathBuf,
}

impl ArchiveWriter {
    /// Starts an archive that will replace `dest` once finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the temporary database cannot be created.
    pub fn create(dest: &Path) -> Result<Self> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let file_name = dest.file_name().and_then(|n| n.to_str()).unwrap_or("archive");
        let temp_path = dir.join(format!(".{file_name}.tmp"));
        if temp_path.exists() {
            fs::remove_file(&temp_path)?;
        }

        let conn = Connection::open(&temp_path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self { conn, temp_path, dest: dest.to_path_buf() })
    }

    /// Compresses and stores a resource under `name`.
    ///
    /// Returns `false` without writing when the bucket already exists.
    pub fn save(&mut self, name: &str, content: &[u8], content_type: &str) -> Result<bool> {
        let compressed = compress(content)?;

        let tx = self.conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM archive_entry WHERE bucket = ?1 LIMIT 1", params![name], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO archive_entry (bucket, key, value) VALUES (?1, ?2, ?3)",
            params![name, CONTENT_KEY, compressed],
        )?;
        tx.execute(
            "INSERT INTO archive_entry (bucket, key, value) VALUES (?1, ?2, ?3)",
            params![name, TYPE_KEY, content_type.as_bytes()],
        )?;
        tx.commit()?;

        debug!(name, bytes = content.len(), "stored archive entry");
        Ok(true)
    }

    /// Closes the archive and atomically replaces the destination with it.
    pub fn finish(self) -> Result<PathBuf> {
        let Self { conn, temp_path, dest } = self;
        conn.close().map_err(|(_, e)| ShelfmarkError::StorageFailed(e))?;
        fs::rename(&temp_path, &dest)?;
        Ok(dest)
    }

    /// Drops the unfinished archive, leaving any previous one in place.
    pub fn discard(self) -> Result<()> {
        let Self { conn, temp_path, .. } = self;
        drop(conn);
        fs::remove_file(temp_path)?;
        Ok(())
    }
}

/// Read-only view of a finished archive.
///
/// Each reader owns its own connection, so open one per concurrent reader.
///
/// # Example
///
/// ```rust,no_run
/// use shelfmark_core::archive::ArchiveReader;
///
/// let reader = ArchiveReader::open("data/archive/1".as_ref()).unwrap();
/// let (html, content_type) = reader.read("").unwrap();
/// assert!(content_type.starts_with("text/html"));
/// # let _ = html;
/// ```
pub struct ArchiveReader {
    conn: Connection,
}

impl ArchiveReader {
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::NotFound`] if no archive exists at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ShelfmarkError::NotFound(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        Ok(Self { conn })
    }

    /// Decompressed payload and content-type of `name`. An empty name reads the root page.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::NotFound`] when the archive has no such resource.
    pub fn read(&self, name: &str) -> Result<(Vec<u8>, String)> {
        let name = if name.is_empty() { ARCHIVE_ROOT } else { name };

        let compressed = self.value(name, CONTENT_KEY)?.ok_or_else(|| ShelfmarkError::NotFound(name.to_string()))?;
        let content_type = self.value(name, TYPE_KEY)?.unwrap_or_default();

        let mut content = Vec::new();
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut content)?;

        Ok((content, String::from_utf8_lossy(&content_type).into_owned()))
    }

    pub fn has(&self, name: &str) -> Result<bool> {
        let name = if name.is_empty() { ARCHIVE_ROOT } else { name };
        Ok(self.value(name, TYPE_KEY)?.is_some())
    }

    /// Every resource name in the archive, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT bucket FROM archive_entry ORDER BY bucket")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn value(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM archive_entry WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn compress(content: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    Ok(encoder.finish()?)
}
