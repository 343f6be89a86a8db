//! The readability result.
//!
//! An [`Article`] carries the cleaned HTML, its plain text, the page metadata
//! and the estimated reading time. The pipeline copies it onto a bookmark, and
//! [`Article::to_format`] renders it as HTML, plain text or JSON.

use serde::Serialize;

use crate::dom::{Dom, NodeId};
use crate::{Result, ShelfmarkError};

/// Output format options for Article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// HTML format (cleaned extracted content).
    Html,
    /// Plain text format.
    PlainText,
    /// JSON format (structured data).
    Json,
}

/// The readable subtree, kept so callers can walk the result without
/// reparsing `content`.
#[derive(Debug, Clone)]
pub struct ReadableNode {
    pub dom: Dom,
    pub root: NodeId,
}

/// The complete result of reading an HTML document.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: String,

    /// Author line from metadata or from a byline node in the page.
    pub byline: String,

    pub excerpt: String,

    pub site_name: String,

    /// Absolute URL of the principal image, empty when none was declared.
    pub image: String,

    /// Absolute URL of the largest PNG icon.
    pub favicon: String,

    /// Value of `<html lang>`.
    pub language: String,

    /// Value of `<html dir>`.
    pub text_direction: String,

    /// Length of `text_content` in characters.
    pub length: usize,

    /// Extracted readable content as clean HTML.
    pub content: String,

    /// Plain text version of content.
    pub text_content: String,

    pub min_read_time: i64,

    pub max_read_time: i64,

    #[serde(skip)]
    pub node: Option<ReadableNode>,
}

impl Article {
    /// Converts content to the specified format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.content.clone()),
            OutputFormat::PlainText => Ok(self.text_content.clone()),
            OutputFormat::Json => self.to_json().map(|v| v.to_string()),
        }
    }

    /// Gets content as structured JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| ShelfmarkError::UnsupportedContent(e.to_string()))
    }

    /// Estimated reading time as `"min-max"` minutes, or `"min"` when both agree.
    pub fn read_time_label(&self) -> String {
        if self.min_read_time == self.max_read_time {
            format!("{} min", self.min_read_time)
        } else {
            format!("{}-{} min", self.min_read_time, self.max_read_time)
        }
    }
}
