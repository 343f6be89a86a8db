//! Records shared by the store, the pipeline and the front ends.

use serde::{Deserialize, Serialize};

/// A tag as attached to a bookmark, or as listed with its usage count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,

    /// Number of bookmarks carrying the tag, filled by tag listings only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_count: Option<i64>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: 0, name: name.into(), bookmark_count: None }
    }
}

/// Lowercased, trimmed tag name.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A saved URL together with what was extracted from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,

    /// Absolute remote URL, or `/bookmark/<id>/thumb` once a thumbnail is stored.
    pub image_url: String,
    pub excerpt: String,
    pub author: String,
    pub language: String,
    pub min_read_time: i64,
    pub max_read_time: i64,

    /// UTC, formatted `YYYY-MM-DD HH:MM:SS`.
    pub modified: String,

    /// Plain text of the readable content.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub content: String,

    /// Cleaned HTML of the readable content.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub html: String,

    pub has_content: bool,
    pub tags: Vec<Tag>,
}

impl Bookmark {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    /// Local image path served for a bookmark with a stored thumbnail.
    pub fn thumbnail_url(id: i64) -> String {
        format!("/bookmark/{id}/thumb")
    }
}

/// Login for the web front end. The password is stored as supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// One archived item: what to fetch and the name it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Archival name of the resource, [`crate::uri::ARCHIVE_ROOT`] for the page itself.
    pub name: String,

    /// Normalised absolute URL.
    pub url: String,

    /// Set for iframes: fetched HTML is walked for its own subresources.
    pub is_embed: bool,
}

impl Resource {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into(), is_embed: false }
    }

    pub fn embed(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self { is_embed: true, ..Self::new(url, name) }
    }
}
