//! SQLite bookmark store with full-text search.
//!
//! The store keeps bookmark ids dense: deleting bookmarks moves the rows with
//! the highest ids into the freed slots, and reports every move so callers
//! can rename files keyed by id (thumbnails, archives).
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::model::{Bookmark, Tag};
//! use shelfmark_core::store::BookmarkStore;
//!
//! let mut store = BookmarkStore::open_in_memory().unwrap();
//! let mut bookmark = Bookmark::new("https://ex.com/post");
//! bookmark.title = "A post".into();
//! bookmark.content = "Widgets are great".into();
//! bookmark.tags = vec![Tag::new("News")];
//!
//! let saved = store.create_bookmark(bookmark).unwrap();
//! assert_eq!(saved.id, 1);
//!
//! let found = store.search_bookmarks(false, "widgets", &[]).unwrap();
//! assert_eq!(found[0].tags[0].name, "news");
//! ```

mod index;
mod schema;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock, format_timestamp};
use crate::model::{Account, Bookmark, Tag, normalize_tag};
use crate::{Result, ShelfmarkError};

pub use index::parse_index_list;
use schema::SCHEMA;

const BOOKMARK_COLUMNS: &str = "b.id, b.url, b.title, b.image_url, b.excerpt, b.author, b.language, \
     b.min_read_time, b.max_read_time, b.modified, IFNULL(bc.content, '') <> ''";

/// Bookmark, tag and account storage backed by one SQLite file.
pub struct BookmarkStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl BookmarkStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, clock: Arc::new(SystemClock) })
    }

    /// Replaces the clock used for `modified` timestamps.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Inserts a bookmark with its full-text row and tags.
    ///
    /// An id of 0 takes the next free id after the current maximum. An empty
    /// `modified` is set to now.
    ///
    /// # Errors
    ///
    /// * [`ShelfmarkError::EmptyUrl`] / [`ShelfmarkError::EmptyTitle`] on missing fields
    /// * [`ShelfmarkError::InvalidBookmarkId`] for a negative id
    /// * [`ShelfmarkError::StorageFailed`] if the URL or id already exists
    pub fn create_bookmark(&mut self, mut bookmark: Bookmark) -> Result<Bookmark> {
        if bookmark.url.trim().is_empty() {
            return Err(ShelfmarkError::EmptyUrl);
        }
        if bookmark.title.trim().is_empty() {
            return Err(ShelfmarkError::EmptyTitle);
        }
        if bookmark.id < 0 {
            return Err(ShelfmarkError::InvalidBookmarkId(bookmark.id));
        }
        if bookmark.modified.is_empty() {
            bookmark.modified = self.now();
        }
        clamp_read_times(&mut bookmark);

        let tx = self.conn.transaction()?;
        if bookmark.id == 0 {
            bookmark.id = tx.query_row("SELECT IFNULL(MAX(id) + 1, 1) FROM bookmark", [], |row| row.get(0))?;
        }

        tx.execute(
            "INSERT INTO bookmark (id, url, title, image_url, excerpt, author, language, \
             min_read_time, max_read_time, modified) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                bookmark.id,
                bookmark.url,
                bookmark.title,
                bookmark.image_url,
                bookmark.excerpt,
                bookmark.author,
                bookmark.language,
                bookmark.min_read_time,
                bookmark.max_read_time,
                bookmark.modified,
            ],
        )?;
        tx.execute(
            "INSERT INTO bookmark_content (rowid, title, content, html) VALUES (?1, ?2, ?3, ?4)",
            params![bookmark.id, bookmark.title, bookmark.content, bookmark.html],
        )?;

        for tag in &bookmark.tags {
            let name = normalize_tag(&tag.name);
            if name.is_empty() || name.starts_with('-') {
                continue;
            }
            attach_tag(&tx, bookmark.id, &name)?;
        }

        bookmark.tags = load_tags(&tx, bookmark.id)?;
        bookmark.has_content = !bookmark.content.is_empty();
        tx.commit()?;

        info!(id = bookmark.id, url = %bookmark.url, "created bookmark");
        Ok(bookmark)
    }

    /// Bookmarks with the given ids, or every bookmark when `ids` is empty, sorted by id.
    ///
    /// Content and HTML are loaded only when `with_content` is set.
    pub fn get_bookmarks(&self, with_content: bool, ids: &[i64]) -> Result<Vec<Bookmark>> {
        let mut sql = select_bookmarks(with_content);
        if !ids.is_empty() {
            sql.push_str(&format!(" WHERE b.id IN ({})", placeholders(ids.len())));
        }
        sql.push_str(" ORDER BY b.id");

        self.query_bookmarks(&sql, ids.iter().map(|&id| Value::Integer(id)).collect(), with_content)
    }

    /// One bookmark by id, or by URL when `id` is 0.
    pub fn get_bookmark(&self, id: i64, url: &str) -> Result<Option<Bookmark>> {
        let mut sql = select_bookmarks(true);
        sql.push_str(" WHERE b.id = ?1 OR (?1 = 0 AND b.url = ?2)");
        let mut found = self.query_bookmarks(&sql, vec![Value::Integer(id), Value::Text(url.to_string())], true)?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    /// Bookmarks matching `keyword` and carrying every tag in `tags`.
    ///
    /// The keyword matches a URL substring or the full-text index over title
    /// and content. Results are sorted by id, newest first with `order_latest`.
    pub fn search_bookmarks(&self, order_latest: bool, keyword: &str, tags: &[String]) -> Result<Vec<Bookmark>> {
        let mut sql = select_bookmarks(false);
        let mut args = Vec::new();
        sql.push_str(" WHERE 1");

        let keyword = keyword.trim();
        if !keyword.is_empty() {
            sql.push_str(
                " AND (b.url LIKE ? OR b.id IN \
                 (SELECT rowid FROM bookmark_content WHERE bookmark_content MATCH ?))",
            );
            args.push(Value::Text(format!("%{keyword}%")));
            args.push(Value::Text(fts_query(keyword)));
        }

        let tags: BTreeSet<String> = tags.iter().map(|t| normalize_tag(t)).filter(|t| !t.is_empty()).collect();
        if !tags.is_empty() {
            sql.push_str(&format!(
                " AND b.id IN (SELECT bt.bookmark_id FROM bookmark_tag bt JOIN tag t ON t.id = bt.tag_id \
                 WHERE t.name IN ({}) GROUP BY bt.bookmark_id HAVING COUNT(DISTINCT bt.tag_id) = ?)",
                placeholders(tags.len())
            ));
            args.extend(tags.iter().cloned().map(Value::Text));
            args.push(Value::Integer(tags.len() as i64));
        }

        sql.push_str(if order_latest { " ORDER BY b.id DESC" } else { " ORDER BY b.id" });
        self.query_bookmarks(&sql, args, false)
    }

    /// Saves changed bookmarks in one transaction.
    ///
    /// Scalar columns and the full-text row are replaced and `modified` is
    /// set to now. Tags are applied as a diff: a name prefixed with `-` is
    /// removed, any other name is added if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::NotFound`] if a bookmark does not exist; no
    /// bookmark is changed in that case.
    pub fn update_bookmarks(&mut self, bookmarks: &[Bookmark]) -> Result<Vec<Bookmark>> {
        let modified = self.now();
        let tx = self.conn.transaction()?;
        let mut updated = Vec::with_capacity(bookmarks.len());

        for bookmark in bookmarks {
            if bookmark.id <= 0 {
                return Err(ShelfmarkError::InvalidBookmarkId(bookmark.id));
            }
            let mut bookmark = bookmark.clone();
            bookmark.modified = modified.clone();
            clamp_read_times(&mut bookmark);

            let changed = tx.execute(
                "UPDATE bookmark SET url = ?2, title = ?3, image_url = ?4, excerpt = ?5, author = ?6, \
                 language = ?7, min_read_time = ?8, max_read_time = ?9, modified = ?10 WHERE id = ?1",
                params![
                    bookmark.id,
                    bookmark.url,
                    bookmark.title,
                    bookmark.image_url,
                    bookmark.excerpt,
                    bookmark.author,
                    bookmark.language,
                    bookmark.min_read_time,
                    bookmark.max_read_time,
                    bookmark.modified,
                ],
            )?;
            if changed == 0 {
                return Err(ShelfmarkError::NotFound(format!("bookmark {}", bookmark.id)));
            }

            tx.execute("DELETE FROM bookmark_content WHERE rowid = ?1", params![bookmark.id])?;
            tx.execute(
                "INSERT INTO bookmark_content (rowid, title, content, html) VALUES (?1, ?2, ?3, ?4)",
                params![bookmark.id, bookmark.title, bookmark.content, bookmark.html],
            )?;

            for tag in &bookmark.tags {
                match tag.name.trim().strip_prefix('-') {
                    Some(removed) => detach_tag(&tx, bookmark.id, &normalize_tag(removed))?,
                    None => {
                        let name = normalize_tag(&tag.name);
                        if !name.is_empty() {
                            attach_tag(&tx, bookmark.id, &name)?;
                        }
                    }
                }
            }

            bookmark.tags = load_tags(&tx, bookmark.id)?;
            bookmark.has_content = !bookmark.content.is_empty();
            updated.push(bookmark);
        }

        tx.commit()?;
        debug!(count = updated.len(), "updated bookmarks");
        Ok(updated)
    }

    /// Deletes bookmarks and compacts the remaining ids into `1..=N`.
    ///
    /// An empty `ids` deletes every bookmark. Returns the `(old, new)` id of
    /// every bookmark that was moved. Deletion and compaction share one
    /// transaction, so a failure leaves the store unchanged.
    pub fn delete_bookmarks(&mut self, ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        let tx = self.conn.transaction()?;

        if ids.is_empty() {
            tx.execute_batch("DELETE FROM bookmark; DELETE FROM bookmark_tag; DELETE FROM bookmark_content;")?;
            tx.commit()?;
            info!("deleted all bookmarks");
            return Ok(Vec::new());
        }

        for &id in ids {
            if id <= 0 {
                return Err(ShelfmarkError::InvalidBookmarkId(id));
            }
            delete_rows(&tx, id)?;
        }

        let moves = compact_ids(&tx)?;
        tx.commit()?;

        info!(deleted = ids.len(), moved = moves.len(), "deleted bookmarks");
        Ok(moves)
    }

    /// Tags in use with their bookmark counts, sorted by name.
    pub fn get_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, COUNT(bt.bookmark_id) FROM tag t \
             JOIN bookmark_tag bt ON bt.tag_id = t.id GROUP BY t.id ORDER BY t.name",
        )?;
        let tags = stmt
            .query_map([], |row| Ok(Tag { id: row.get(0)?, name: row.get(1)?, bookmark_count: Some(row.get(2)?) }))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    pub fn create_account(&self, username: &str, password: &str) -> Result<Account> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ShelfmarkError::InvalidCredentials);
        }
        self.conn
            .execute("INSERT INTO account (username, password) VALUES (?1, ?2)", params![username, password])?;
        Ok(Account { id: self.conn.last_insert_rowid(), username: username.to_string(), password: password.to_string() })
    }

    /// # Errors
    ///
    /// Returns [`ShelfmarkError::NotFound`] for an unknown username.
    pub fn get_account(&self, username: &str) -> Result<Account> {
        self.conn
            .query_row(
                "SELECT id, username, password FROM account WHERE username = ?1",
                params![username],
                account_from_row,
            )
            .optional()?
            .ok_or_else(|| ShelfmarkError::NotFound(format!("account {username}")))
    }

    /// Accounts whose username contains `keyword`, sorted by username.
    pub fn get_accounts(&self, keyword: &str) -> Result<Vec<Account>> {
        let mut stmt =
            self.conn.prepare("SELECT id, username, password FROM account WHERE username LIKE ?1 ORDER BY username")?;
        let accounts = stmt
            .query_map(params![format!("%{}%", keyword.trim())], account_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Deletes accounts by username and returns how many existed.
    pub fn delete_accounts<S: AsRef<str>>(&self, usernames: &[S]) -> Result<usize> {
        if usernames.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM account WHERE username IN ({})", placeholders(usernames.len()));
        let deleted = self.conn.execute(&sql, params_from_iter(usernames.iter().map(AsRef::as_ref)))?;
        Ok(deleted)
    }

    fn query_bookmarks(&self, sql: &str, args: Vec<Value>, with_content: bool) -> Result<Vec<Bookmark>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut bookmarks = stmt
            .query_map(params_from_iter(args), |row| bookmark_from_row(row, with_content))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for bookmark in &mut bookmarks {
            bookmark.tags = load_tags(&self.conn, bookmark.id)?;
        }
        Ok(bookmarks)
    }
}

fn select_bookmarks(with_content: bool) -> String {
    let content = if with_content { ", IFNULL(bc.content, ''), IFNULL(bc.html, '')" } else { "" };
    format!("SELECT {BOOKMARK_COLUMNS}{content} FROM bookmark b LEFT JOIN bookmark_content bc ON bc.rowid = b.id")
}

fn bookmark_from_row(row: &Row<'_>, with_content: bool) -> rusqlite::Result<Bookmark> {
    let mut bookmark = Bookmark {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        image_url: row.get(3)?,
        excerpt: row.get(4)?,
        author: row.get(5)?,
        language: row.get(6)?,
        min_read_time: row.get(7)?,
        max_read_time: row.get(8)?,
        modified: row.get(9)?,
        has_content: row.get(10)?,
        ..Default::default()
    };
    if with_content {
        bookmark.content = row.get(11)?;
        bookmark.html = row.get(12)?;
    }
    Ok(bookmark)
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account { id: row.get(0)?, username: row.get(1)?, password: row.get(2)? })
}

fn load_tags(conn: &Connection, bookmark_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM bookmark_tag bt JOIN tag t ON t.id = bt.tag_id \
         WHERE bt.bookmark_id = ?1 ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map(params![bookmark_id], |row| Ok(Tag { id: row.get(0)?, name: row.get(1)?, bookmark_count: None }))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Links `name` to a bookmark, creating the tag if needed. Existing links are kept.
fn attach_tag(tx: &Transaction<'_>, bookmark_id: i64, name: &str) -> Result<()> {
    let existing: Option<i64> =
        tx.query_row("SELECT id FROM tag WHERE name = ?1", params![name], |row| row.get(0)).optional()?;
    let tag_id = match existing {
        Some(id) => id,
        None => {
            tx.execute("INSERT INTO tag (name) VALUES (?1)", params![name])?;
            tx.last_insert_rowid()
        }
    };
    tx.execute("INSERT OR IGNORE INTO bookmark_tag (bookmark_id, tag_id) VALUES (?1, ?2)", params![bookmark_id, tag_id])?;
    Ok(())
}

fn detach_tag(tx: &Transaction<'_>, bookmark_id: i64, name: &str) -> Result<()> {
    tx.execute(
        "DELETE FROM bookmark_tag WHERE bookmark_id = ?1 AND tag_id IN (SELECT id FROM tag WHERE name = ?2)",
        params![bookmark_id, name],
    )?;
    Ok(())
}

fn delete_rows(tx: &Transaction<'_>, id: i64) -> Result<()> {
    tx.execute("DELETE FROM bookmark WHERE id = ?1", params![id])?;
    tx.execute("DELETE FROM bookmark_tag WHERE bookmark_id = ?1", params![id])?;
    tx.execute("DELETE FROM bookmark_content WHERE rowid = ?1", params![id])?;
    Ok(())
}

/// Moves the highest id into the lowest free slot until no slot below the maximum is free.
fn compact_ids(tx: &Transaction<'_>) -> Result<Vec<(i64, i64)>> {
    let mut stmt = tx.prepare("SELECT id FROM bookmark ORDER BY id")?;
    let mut remaining: BTreeSet<i64> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    drop(stmt);

    let Some(&max) = remaining.last() else {
        return Ok(Vec::new());
    };
    let occupied: HashSet<i64> = remaining.iter().copied().collect();
    let mut free: BTreeSet<i64> = (1..max).filter(|id| !occupied.contains(id)).collect();
    let mut moves = Vec::new();

    loop {
        let (Some(&hole), Some(&top)) = (free.first(), remaining.last()) else {
            break;
        };
        if hole >= top {
            break;
        }
        move_bookmark(tx, top, hole)?;
        debug!(from = top, to = hole, "compacted bookmark id");

        free.remove(&hole);
        remaining.remove(&top);
        remaining.insert(hole);
        moves.push((top, hole));
    }

    Ok(moves)
}

fn move_bookmark(tx: &Transaction<'_>, from: i64, to: i64) -> Result<()> {
    tx.execute("UPDATE bookmark SET id = ?2 WHERE id = ?1", params![from, to])?;
    tx.execute("UPDATE bookmark_tag SET bookmark_id = ?2 WHERE bookmark_id = ?1", params![from, to])?;

    let content: Option<(String, String, String)> = tx
        .query_row(
            "SELECT title, content, html FROM bookmark_content WHERE rowid = ?1",
            params![from],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    if let Some((title, content, html)) = content {
        tx.execute("DELETE FROM bookmark_content WHERE rowid = ?1", params![from])?;
        tx.execute(
            "INSERT INTO bookmark_content (rowid, title, content, html) VALUES (?1, ?2, ?3, ?4)",
            params![to, title, content, html],
        )?;
    }
    Ok(())
}

fn clamp_read_times(bookmark: &mut Bookmark) {
    bookmark.min_read_time = bookmark.min_read_time.max(0);
    bookmark.max_read_time = bookmark.max_read_time.max(bookmark.min_read_time);
}

/// Full-text query matching every whitespace-separated term of `keyword` as a literal.
fn fts_query(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
