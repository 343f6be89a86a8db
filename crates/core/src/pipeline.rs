//! Turning a downloaded page into a saved bookmark.
//!
//! [`Processor::process`] fills a bookmark from the page's readable content,
//! stores a thumbnail of its principal image and optionally writes an offline
//! archive. Only an invalid bookmark id or URL aborts processing; every other
//! failure is logged, recorded in [`ProcessOutcome::warnings`] and the
//! bookmark is still returned for saving.

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveReport, ArchiveRequest, Archiver, ArchiverConfig};
use crate::config::DataDir;
use crate::fetch::{FetchConfig, Fetched, build_client, fetch_url, is_html};
use crate::model::Bookmark;
use crate::readability::{Readability, ReadabilityConfig};
use crate::thumbnail::{ThumbnailConfig, is_supported_type, render_thumbnail, save_thumbnail};
use crate::uri::parse_http_url;
use crate::{Result, ShelfmarkError};

/// A page body to process into `bookmark`.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Must already carry its store id.
    pub bookmark: Bookmark,
    pub content: Vec<u8>,
    pub content_type: String,
    pub data_dir: DataDir,

    /// Keep the caller's title instead of the extracted one, unless it is empty.
    pub keep_title: bool,

    /// Keep the caller's excerpt instead of the extracted one, unless it is empty.
    pub keep_excerpt: bool,

    pub create_archive: bool,
}

impl ProcessRequest {
    pub fn new(bookmark: Bookmark, fetched: Fetched, data_dir: DataDir) -> Self {
        Self {
            bookmark,
            content: fetched.body,
            content_type: fetched.content_type,
            data_dir,
            keep_title: false,
            keep_excerpt: false,
            create_archive: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub bookmark: Bookmark,
    pub archive: Option<ArchiveReport>,
    /// Non-fatal failures, in the order they happened.
    pub warnings: Vec<String>,
}

/// Runs readability, thumbnail download and archival for bookmarks.
pub struct Processor {
    client: Client,
    timeout: u64,
    readability: Readability,
    archiver: Archiver,
    thumbnail: ThumbnailConfig,
}

impl Processor {
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(fetch: &FetchConfig, archiver: ArchiverConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(fetch)?,
            timeout: fetch.timeout,
            readability: Readability::new(),
            archiver: Archiver::new(archiver)?,
            thumbnail: ThumbnailConfig::default(),
        })
    }

    pub fn with_readability(mut self, config: ReadabilityConfig) -> Self {
        self.readability = Readability::with_config(config);
        self
    }

    pub fn with_thumbnail(mut self, config: ThumbnailConfig) -> Self {
        self.thumbnail = config;
        self
    }

    /// Downloads the page a bookmark points at.
    ///
    /// # Errors
    ///
    /// See [`fetch_url`].
    pub async fn download(&self, url: &str) -> Result<Fetched> {
        fetch_url(&self.client, url, self.timeout).await
    }

    /// Processes `request.content` into the bookmark.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::InvalidBookmarkId`] for an id below 1 and
    /// [`ShelfmarkError::InvalidUrl`] when the bookmark URL is unusable.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutcome> {
        let ProcessRequest { mut bookmark, content, content_type, data_dir, keep_title, keep_excerpt, create_archive } =
            request;

        if bookmark.id <= 0 {
            return Err(ShelfmarkError::InvalidBookmarkId(bookmark.id));
        }
        let page_url = parse_http_url(&bookmark.url)?;
        let thumb_path = data_dir.thumbnail(bookmark.id);
        let mut warnings = Vec::new();
        let mut images = Vec::new();

        if is_html(&content_type) {
            let html = String::from_utf8_lossy(&content);
            let readable = self.readability.is_probably_readable(&html);

            match self.readability.parse_with_url(&html, page_url.as_str()) {
                Ok(article) => {
                    bookmark.author = article.byline;
                    bookmark.language = article.language;
                    bookmark.content = if readable { article.text_content } else { String::new() };
                    bookmark.html = article.content;
                    bookmark.min_read_time = article.min_read_time;
                    bookmark.max_read_time = article.max_read_time;
                    if !keep_title || bookmark.title.is_empty() {
                        bookmark.title = article.title;
                    }
                    if !keep_excerpt || bookmark.excerpt.is_empty() {
                        bookmark.excerpt = article.excerpt;
                    }

                    if article.image.is_empty() {
                        remove_stale(&thumb_path);
                    } else {
                        images.push(article.image);
                    }
                    if !article.favicon.is_empty() {
                        images.push(article.favicon);
                    }
                }
                Err(e) => {
                    warn!(url = %page_url, error = %e, "readability failed");
                    warnings.push(format!("failed to parse article: {e}"));
                }
            }
            bookmark.has_content = !bookmark.content.is_empty();
        }

        if bookmark.title.trim().is_empty() {
            bookmark.title = bookmark.url.clone();
        }

        for (i, image_url) in images.iter().enumerate() {
            match self.download_thumbnail(image_url, &thumb_path).await {
                Ok(()) => {
                    bookmark.image_url = Bookmark::thumbnail_url(bookmark.id);
                    break;
                }
                Err(e) => {
                    warn!(url = %image_url, error = %e, "thumbnail download failed");
                    warnings.push(format!("failed to download image {image_url}: {e}"));
                    if i + 1 == images.len() && matches!(e, ShelfmarkError::UnsupportedContent(_)) {
                        remove_stale(&thumb_path);
                    }
                }
            }
        }

        let mut archive = None;
        if create_archive {
            let request = ArchiveRequest::with_content(bookmark.url.clone(), content, content_type);
            match self.archiver.archive(request, &data_dir.archive(bookmark.id)).await {
                Ok(report) => {
                    warnings.extend(report.warnings.iter().cloned());
                    archive = Some(report);
                }
                Err(e) => {
                    warn!(url = %page_url, error = %e, "archival failed");
                    warnings.push(format!("failed to create archive: {e}"));
                }
            }
        }

        info!(id = bookmark.id, url = %page_url, warnings = warnings.len(), "bookmark processed");
        Ok(ProcessOutcome { bookmark, archive, warnings })
    }

    async fn download_thumbnail(&self, url: &str, path: &std::path::Path) -> Result<()> {
        let fetched = self.download(url).await?;
        if !is_supported_type(&fetched.content_type) {
            return Err(ShelfmarkError::UnsupportedContent(fetched.content_type));
        }
        let jpeg = render_thumbnail(&fetched.body, &self.thumbnail)?;
        save_thumbnail(path, &jpeg)?;
        debug!(url, path = %path.display(), "thumbnail saved");
        Ok(())
    }
}

fn remove_stale(path: &std::path::Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to remove thumbnail");
    }
}
