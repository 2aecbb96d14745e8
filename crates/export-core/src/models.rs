use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExportError;
use crate::{filename, mime};

/// Account that authored a piece of content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable, opaque account identifier
    pub account_id: String,
    pub username: String,
    pub display_name: String,
    pub public_name: String,
    pub email: String,
}

/// One historical revision of a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub number: u32,
    pub by: User,
    pub when: DateTime<Utc>,
    /// Human readable rendering of `when` as supplied by the API
    pub friendly_when: String,
}

/// Top-level content collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Id of the root page of the space
    pub homepage: u64,
}

/// Reference to a page (minimal fields for ancestry and child listings)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub id: u64,
    pub title: String,
}

impl PageRef {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Result of a page-by-id lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: u64,
    pub title: String,
    pub space_key: String,
    /// Ancestor chain as reported by the API, root first
    pub ancestors: Vec<PageRef>,
}

impl PageInfo {
    pub fn to_ref(&self) -> PageRef {
        PageRef::new(self.id, self.title.clone())
    }
}

/// A page snapshot ready to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: u64,
    pub title: String,
    /// Rendered HTML body
    pub html: String,
    /// Ancestor chain, root first
    pub ancestors: Vec<PageRef>,
    pub labels: Vec<String>,
    pub space: Space,
}

impl Page {
    pub fn file_extension(&self, format: ExportFormat) -> &'static str {
        format.page_extension()
    }
}

/// Target document format for exported pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    #[serde(alias = "md")]
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn page_extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => ".md",
            ExportFormat::Html => ".html",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            other => Err(ExportError::Config(format!(
                "Unknown export format '{}' (expected 'markdown' or 'html')",
                other
            ))),
        }
    }
}

/// Binary file attached to a page
///
/// `space` and `ancestors` describe where the attachment lives; sources may
/// leave them empty, the exporter fills them from the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Content id, unique within an export run
    pub id: String,
    /// Globally unique file id (Cloud); empty on Server / Data Center
    pub file_id: String,
    /// Original filename as uploaded
    pub title: String,
    pub media_type: String,
    pub media_type_description: String,
    pub file_size: u64,
    pub collection_name: String,
    pub download_link: String,
    pub comment: String,
    /// Ancestor chain ending with the containing page
    pub ancestors: Vec<PageRef>,
    pub space: Space,
    pub version: Option<Version>,
}

impl Attachment {
    /// File extension derived from the media type, empty when unknown
    pub fn extension(&self) -> &'static str {
        mime::extension_for_media_type(&self.media_type).unwrap_or("")
    }

    /// Whether the media type maps to a known extension
    pub fn has_known_extension(&self) -> bool {
        mime::extension_for_media_type(&self.media_type).is_some()
    }

    /// Collision-free filename without extension
    pub fn file_stem(&self) -> String {
        filename::attachment_stem(self)
    }

    /// Collision-free filename
    pub fn filename(&self) -> String {
        filename::attachment_filename(self)
    }
}
