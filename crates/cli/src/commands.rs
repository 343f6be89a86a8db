use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::CommandFactory;
use clap_complete::Shell;
use shelfmark_core::{
    AppConfig, ArchiveReader, Bookmark, BookmarkStore, DataDir, ProcessRequest, Processor, Tag, parse_index_list, uri,
};
use tracing::debug;

use crate::echo::{
    format_size, print_archive_report, print_bookmark, print_error, print_info, print_moves, print_step, print_success,
    print_timing, print_warning,
};

pub struct AddArgs {
    pub url: String,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub offline: bool,
    pub no_archival: bool,
}

pub struct UpdateArgs {
    pub indices: Vec<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub offline: bool,
    pub no_archival: bool,
    pub dont_overwrite: bool,
    pub yes: bool,
}

/// Opened store plus the settings every command needs.
pub struct App {
    config: AppConfig,
    data: DataDir,
    store: BookmarkStore,
    verbose: bool,
}

impl App {
    pub fn open(data_dir: Option<PathBuf>, verbose: bool) -> anyhow::Result<Self> {
        let mut config = AppConfig::load().context("Failed to load configuration")?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        let data = config.data();
        let store = BookmarkStore::open(&data.database())
            .with_context(|| format!("Failed to open database in {}", data.root().display()))?;
        debug!(path = %data.database().display(), "opened bookmark database");
        if verbose {
            print_info(&format!("Data directory: {}", data.root().display()));
        }
        Ok(Self { config, data, store, verbose })
    }

    fn processor(&self) -> anyhow::Result<Processor> {
        Processor::new(&self.config.fetch_config(), self.config.archiver_config()).context("Failed to build HTTP client")
    }

    pub async fn add(&mut self, args: AddArgs) -> anyhow::Result<()> {
        let url = uri::normalize(&args.url).context("URL is not valid")?;
        if let Some(existing) = self.store.get_bookmark(0, &url)? {
            bail!("URL is already saved as bookmark {}", existing.id);
        }

        let title = args.title.as_deref().map(normalize_space).unwrap_or_default();
        let excerpt = args.excerpt.as_deref().map(normalize_space).unwrap_or_default();
        let bookmark = Bookmark {
            title: if title.is_empty() { url.clone() } else { title.clone() },
            excerpt: excerpt.clone(),
            tags: args.tags.iter().map(|t| Tag::new(t.as_str())).collect(),
            ..Bookmark::new(url.clone())
        };
        let mut bookmark = self.store.create_bookmark(bookmark).context("Failed to save bookmark")?;

        if !args.offline {
            let request = ProcessRequest {
                keep_title: !title.is_empty(),
                keep_excerpt: !excerpt.is_empty(),
                create_archive: self.config.archive && !args.no_archival,
                ..ProcessRequest::new(bookmark.clone(), Default::default(), self.data.clone())
            };
            let processor = self.processor()?;
            if let Some(processed) = self.refresh(&processor, request, 1, 1).await {
                bookmark = self.store.update_bookmarks(&[processed]).context("Failed to save bookmark")?.remove(0);
            }
        }

        println!();
        print_bookmark(&bookmark);
        Ok(())
    }

    /// Downloads and processes one bookmark. Failures are reported and yield `None`.
    async fn refresh(
        &self, processor: &Processor, mut request: ProcessRequest, step: usize, total: usize,
    ) -> Option<Bookmark> {
        let url = request.bookmark.url.clone();
        print_step(step, total, &format!("Downloading {url}"));

        let started = Instant::now();
        let fetched = match processor.download(&url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                print_error(&format!("Failed to download {url}: {e}"));
                return None;
            }
        };
        if self.verbose {
            print_info(&format!("Size: {}", format_size(fetched.body.len() as u64)));
        }
        request.content = fetched.body;
        request.content_type = fetched.content_type;

        match processor.process(request).await {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    print_warning(warning);
                }
                if self.verbose {
                    if let Some(report) = &outcome.archive {
                        print_archive_report(report, std::fs::metadata(&report.path).ok().map(|m| m.len()));
                    }
                    print_timing("Processed", started.elapsed());
                }
                Some(outcome.bookmark)
            }
            Err(e) => {
                print_error(&format!("Failed to process {url}: {e}"));
                None
            }
        }
    }

    pub fn print(&self, indices: &[String], json: bool, index_only: bool) -> anyhow::Result<()> {
        let ids = parse_index_list(indices)?;
        let bookmarks = self.store.get_bookmarks(false, &ids)?;
        show(&bookmarks, json, index_only)
    }

    pub fn search(&self, keyword: &str, tags: &[String], json: bool, latest: bool) -> anyhow::Result<()> {
        let bookmarks = self.store.search_bookmarks(latest, keyword, tags)?;
        if bookmarks.is_empty() && !json {
            print_info("No matching bookmarks found");
            return Ok(());
        }
        show(&bookmarks, json, false)
    }

    pub async fn update(&mut self, args: UpdateArgs) -> anyhow::Result<()> {
        let ids = parse_index_list(&args.indices)?;
        if ids.is_empty() && !args.yes && !confirm("Update ALL bookmarks?")? {
            println!("No bookmarks updated");
            return Ok(());
        }

        let bookmarks = self.store.get_bookmarks(true, &ids)?;
        if bookmarks.is_empty() {
            bail!("No matching index found");
        }

        let title = args.title.as_deref().map(normalize_space).unwrap_or_default();
        let excerpt = args.excerpt.as_deref().map(normalize_space).unwrap_or_default();
        let processor = if args.offline { None } else { Some(self.processor()?) };
        let total = bookmarks.len();
        let mut updated = Vec::with_capacity(total);

        for (i, mut bookmark) in bookmarks.into_iter().enumerate() {
            if let Some(processor) = &processor {
                let request = ProcessRequest {
                    keep_title: args.dont_overwrite,
                    keep_excerpt: args.dont_overwrite,
                    create_archive: self.config.archive && !args.no_archival,
                    ..ProcessRequest::new(bookmark.clone(), Default::default(), self.data.clone())
                };
                if let Some(processed) = self.refresh(processor, request, i + 1, total).await {
                    bookmark = processed;
                }
            }
            if !title.is_empty() {
                bookmark.title = title.clone();
            }
            if !excerpt.is_empty() {
                bookmark.excerpt = excerpt.clone();
            }
            bookmark.tags = args.tags.iter().map(|t| Tag::new(t.as_str())).collect();
            updated.push(bookmark);
        }

        let updated = self.store.update_bookmarks(&updated).context("Failed to save bookmarks")?;
        for bookmark in &updated {
            print_bookmark(bookmark);
        }
        print_success(&format!("{} bookmark(s) updated", updated.len()));
        Ok(())
    }

    pub fn delete(&mut self, indices: &[String], yes: bool) -> anyhow::Result<()> {
        let ids = parse_index_list(indices)?;
        if ids.is_empty() && !yes && !confirm("Remove ALL bookmarks?")? {
            println!("No bookmarks deleted");
            return Ok(());
        }

        let moves = self.store.delete_bookmarks(&ids).context("Failed to delete bookmarks")?;
        if ids.is_empty() {
            self.data.remove_all()?;
            print_success("All bookmarks have been deleted");
            return Ok(());
        }

        for &id in &ids {
            self.data.remove_files(id)?;
        }
        self.data.relocate(&moves)?;
        print_moves(&moves);
        print_success(&format!("Bookmark(s) {} deleted", indices.join(", ")));
        Ok(())
    }

    pub fn open_bookmark(&self, id: i64, archive: bool, resource: Option<&str>) -> anyhow::Result<()> {
        let bookmark = self.store.get_bookmark(id, "")?.with_context(|| format!("No bookmark with index {id}"))?;

        if !archive {
            if bookmark.content.is_empty() {
                bail!("This bookmark doesn't have any cached content");
            }
            println!("{}. {}\n", bookmark.id, bookmark.title);
            println!("{}", bookmark.content);
            return Ok(());
        }

        let reader = ArchiveReader::open(&self.data.archive(id)).context("Failed to open archive")?;
        match resource {
            Some(name) => {
                let (body, _) = reader.read(name)?;
                io::stdout().write_all(&body)?;
            }
            None => {
                for name in reader.names()? {
                    println!("{name}");
                }
            }
        }
        Ok(())
    }

    pub fn tags(&self) -> anyhow::Result<()> {
        for tag in self.store.get_tags()? {
            println!("{} ({})", tag.name, tag.bookmark_count.unwrap_or_default());
        }
        Ok(())
    }

    pub fn add_account(&self, username: &str, password: &str) -> anyhow::Result<()> {
        let account = self.store.create_account(username, password).context("Failed to create account")?;
        print_success(&format!("Account {} created", account.username));
        Ok(())
    }

    pub fn list_accounts(&self, keyword: &str) -> anyhow::Result<()> {
        for account in self.store.get_accounts(keyword)? {
            println!("{}. {}", account.id, account.username);
        }
        Ok(())
    }

    pub fn remove_accounts(&self, usernames: &[String]) -> anyhow::Result<()> {
        let removed = self.store.delete_accounts(usernames)?;
        print_success(&format!("{removed} account(s) removed"));
        Ok(())
    }
}

pub fn completions<C: CommandFactory>(shell: Shell) {
    let mut cmd = C::command();
    clap_complete::generate(shell, &mut cmd, "shelfmark", &mut io::stdout());
}

fn show(bookmarks: &[Bookmark], json: bool, index_only: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(bookmarks)?);
    } else if index_only {
        let ids: Vec<String> = bookmarks.iter().map(|b| b.id.to_string()).collect();
        println!("{}", ids.join(" "));
    } else {
        for bookmark in bookmarks {
            print_bookmark(bookmark);
        }
    }
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} (y/N): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn normalize_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
