//! Offline page archives.
//!
//! [`extract_html`] rewrites a page so every subresource reference points at
//! an archival name, [`Archiver`] downloads those subresources concurrently,
//! and [`ArchiveWriter`]/[`ArchiveReader`] store and serve the resulting
//! single-file archive.

#[cfg(feature = "fetch")]
mod archiver;
mod extract;
mod storage;

#[cfg(feature = "fetch")]
pub use archiver::{ArchiveReport, ArchiveRequest, Archiver, ArchiverConfig, ArchiverConfigBuilder};
pub use extract::{Extraction, extract_html, extract_resources};
pub use storage::{ArchiveReader, ArchiveWriter};

