//! Concurrent archival of a page and its subresources.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::extract::extract_html;
use super::storage::ArchiveWriter;
use crate::fetch::{FetchConfig, Fetched, build_client, fetch_url, is_html};
use crate::model::Resource;
use crate::scanner::scan_css;
use crate::uri::{ARCHIVE_ROOT, normalize, parse_http_url};
use crate::{Result, ShelfmarkError};

/// Archiver settings.
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    /// Maximum number of subresource downloads in flight.
    pub concurrency: usize,
    pub timeout: Duration,
    /// Skip TLS verification for subresources. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeout: Duration::from_secs(60),
            accept_invalid_certs: false,
            user_agent: crate::fetch::USER_AGENT.to_string(),
        }
    }
}

impl ArchiverConfig {
    pub fn builder() -> ArchiverConfigBuilder {
        ArchiverConfigBuilder::default()
    }
}

/// Builder for [`ArchiverConfig`].
#[derive(Debug, Default)]
pub struct ArchiverConfigBuilder {
    config: ArchiverConfig,
}

impl ArchiverConfigBuilder {
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> ArchiverConfig {
        self.config
    }
}

/// The page an archive is built from.
///
/// When `content` is set the page is not downloaded again.
#[derive(Debug, Clone, Default)]
pub struct ArchiveRequest {
    pub url: String,
    pub content: Option<Vec<u8>>,
    pub content_type: String,
}

impl ArchiveRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    pub fn with_content(url: impl Into<String>, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self { url: url.into(), content: Some(content), content_type: content_type.into() }
    }
}

/// What an archive job did.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    pub path: PathBuf,
    /// Buckets written, the root page included.
    pub saved: usize,
    /// Subresource URLs downloaded, each exactly once.
    pub downloaded: Vec<String>,
    /// One entry per subresource that could not be fetched, processed or stored.
    pub warnings: Vec<String>,
}

/// Downloads a page and its subresources into a single archive file.
///
/// The root page is processed first. Every discovered subresource goes
/// through a seen-set owned by the scheduling loop, so each URL is
/// downloaded at most once; downloads run on spawned tasks bounded by a
/// semaphore. HTML is walked again only for iframes, stylesheets are always
/// rescanned, and everything else is stored as fetched.
pub struct Archiver {
    client: Client,
    config: ArchiverConfig,
}

impl Archiver {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ArchiverConfig) -> Result<Self> {
        let fetch_config = FetchConfig::builder()
            .timeout(config.timeout.as_secs())
            .user_agent(config.user_agent.clone())
            .accept_invalid_certs(config.accept_invalid_certs)
            .build();
        let client = build_client(&fetch_config)?;
        Ok(Self { client, config })
    }

    /// Archives `request` into `dest`, replacing any archive already there.
    ///
    /// # Errors
    ///
    /// Fails only when the root page is unusable: invalid URL, failed
    /// download, or an archive that cannot be written. Subresource failures
    /// are collected in [`ArchiveReport::warnings`].
    pub async fn archive(&self, request: ArchiveRequest, dest: &Path) -> Result<ArchiveReport> {
        let page_url = parse_http_url(&request.url)?;
        let root = match request.content {
            Some(body) => Fetched { url: request.url.clone(), content_type: request.content_type, body },
            None => fetch_url(&self.client, &request.url, self.config.timeout.as_secs()).await?,
        };

        info!(url = %page_url, "archiving page");

        let (root_body, mut pending) = if root.is_html() {
            let extraction = extract_html(&String::from_utf8_lossy(&root.body), &page_url);
            (extraction.html.into_bytes(), VecDeque::from(extraction.resources))
        } else {
            (root.body, VecDeque::new())
        };

        let mut writer = ArchiveWriter::create(dest)?;
        if let Err(e) = writer.save(ARCHIVE_ROOT, &root_body, &root.content_type) {
            writer.discard()?;
            return Err(e);
        }

        let mut report = ArchiveReport { saved: 1, ..Default::default() };
        // Subresource URLs are normalized, so the root must be too.
        let root_key = normalize(page_url.as_str()).unwrap_or_else(|_| page_url.to_string());
        let mut seen: HashSet<String> = HashSet::from([root_key]);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<(Resource, Result<Fetched>)> = JoinSet::new();

        loop {
            while let Some(resource) = pending.pop_front() {
                if !seen.insert(resource.url.clone()) {
                    continue;
                }

                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let client = self.client.clone();
                let timeout = self.config.timeout.as_secs();
                tasks.spawn(async move {
                    let _permit = permit;
                    let fetched = fetch_url(&client, &resource.url, timeout).await;
                    (resource, fetched)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            let (resource, fetched) = match joined {
                Ok(result) => result,
                Err(e) => {
                    report.warnings.push(format!("archive task failed: {e}"));
                    continue;
                }
            };

            let fetched = match fetched {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(url = %resource.url, error = %e, "failed to download subresource");
                    report.warnings.push(format!("failed to download {}: {e}", resource.url));
                    continue;
                }
            };
            report.downloaded.push(resource.url.clone());

            let (body, discovered) = process_subresource(&resource, fetched.body, &fetched.content_type);
            pending.extend(discovered);

            match writer.save(&resource.name, &body, &fetched.content_type) {
                Ok(true) => {
                    report.saved += 1;
                    debug!(url = %resource.url, name = %resource.name, "saved subresource");
                }
                Ok(false) => debug!(name = %resource.name, "bucket already present"),
                Err(e) => {
                    warn!(url = %resource.url, error = %e, "failed to save subresource");
                    report.warnings.push(format!("failed to save {}: {e}", resource.url));
                }
            }
        }

        report.path = writer.finish()?;
        info!(
            path = %report.path.display(),
            saved = report.saved,
            warnings = report.warnings.len(),
            "archive complete"
        );
        Ok(report)
    }
}

/// Rewrites a fetched subresource and returns the resources it references.
///
/// Only iframe documents are walked as HTML. Other HTML is kept verbatim.
fn process_subresource(resource: &Resource, body: Vec<u8>, content_type: &str) -> (Vec<u8>, Vec<Resource>) {
    let lowered = content_type.to_ascii_lowercase();
    let Ok(url) = parse_http_url(&resource.url) else {
        return (body, Vec::new());
    };

    if is_html(&lowered) && resource.is_embed {
        let extraction = extract_html(&String::from_utf8_lossy(&body), &url);
        return (extraction.html.into_bytes(), extraction.resources);
    }
    if lowered.contains("text/css") {
        let out = scan_css(&String::from_utf8_lossy(&body), &url);
        return (out.text.into_bytes(), out.resources);
    }
    (body, Vec::new())
}
