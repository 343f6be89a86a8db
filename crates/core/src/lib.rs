pub mod archive;
pub mod article;
pub mod clock;
pub mod config;
pub mod dom;
pub mod error;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod model;
#[cfg(feature = "fetch")]
pub mod pipeline;
pub mod readability;
pub mod scanner;
pub mod store;
pub mod thumbnail;
pub mod uri;

#[cfg(feature = "fetch")]
pub use archive::{ArchiveReport, ArchiveRequest, Archiver, ArchiverConfig};
pub use archive::{ArchiveReader, ArchiveWriter, extract_html};
pub use article::{Article, OutputFormat};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, DataDir};
pub use error::{Result, ShelfmarkError};
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, Fetched, fetch_url};
pub use model::{Account, Bookmark, Resource, Tag};
#[cfg(feature = "fetch")]
pub use pipeline::{ProcessOutcome, ProcessRequest, Processor};
pub use readability::{Readability, ReadabilityConfig, ReadabilityConfigBuilder, is_probably_readable, parse_with_url};
pub use scanner::{ScanOutput, scan_css, scan_js};
pub use store::{BookmarkStore, parse_index_list};
pub use thumbnail::{ThumbnailConfig, render_thumbnail};
