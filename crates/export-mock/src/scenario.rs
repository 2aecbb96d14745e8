//! Scenario definition and loading
//!
//! A scenario describes one space: its pages in remote order, their labels
//! and attachments, and which calls should fail.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete mock space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario metadata
    #[serde(default)]
    pub scenario: ScenarioMeta,

    pub space: SpaceFixture,

    /// Pages in the order the remote lists them
    #[serde(default)]
    pub pages: Vec<PageFixture>,

    #[serde(default)]
    pub attachments: Vec<AttachmentFixture>,
}

/// Scenario metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceFixture {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Id of the space homepage; 0 when the space has none
    #[serde(default)]
    pub homepage: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFixture {
    pub id: u64,
    pub title: String,

    /// Parent page id; absent for the homepage and other top-level pages
    #[serde(default)]
    pub parent: Option<u64>,

    /// Inline rendered body
    #[serde(default)]
    pub html: Option<String>,

    /// Rendered body read from a file relative to the scenario directory
    #[serde(default)]
    pub html_file: Option<PathBuf>,

    #[serde(default)]
    pub labels: Vec<String>,

    /// Body fetch answers with an API error
    #[serde(default)]
    pub fail_html: bool,

    /// Child listing answers with an API error
    #[serde(default)]
    pub fail_children: bool,

    /// Attachment listing answers with an API error
    #[serde(default)]
    pub fail_attachments: bool,

    /// Label listing answers with an API error
    #[serde(default)]
    pub fail_labels: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentFixture {
    pub id: String,
    /// Id of the page the file is attached to
    pub page: u64,
    pub title: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    /// Inline text payload
    #[serde(default)]
    pub content: Option<String>,

    /// Payload read from a file relative to the scenario directory
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Download answers with an API error
    #[serde(default)]
    pub fail_download: bool,
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let scenario: Scenario =
            toml::from_str(&content).map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario from a directory (looks for scenario.toml)
    pub fn load_from_dir(dir: &Path) -> Result<Self, ScenarioError> {
        if !dir.is_dir() {
            return Err(ScenarioError::DirNotFound(dir.to_path_buf()));
        }
        Self::load(&dir.join("scenario.toml"))
    }

    /// Check ids and references
    ///
    /// Parent cycles are allowed on purpose so exports of broken hierarchies
    /// can be exercised.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut ids = HashSet::new();
        for page in &self.pages {
            if !ids.insert(page.id) {
                return Err(ScenarioError::Invalid(format!(
                    "page {} is defined twice",
                    page.id
                )));
            }
            if page.html.is_some() && page.html_file.is_some() {
                return Err(ScenarioError::Invalid(format!(
                    "page {} sets both html and html_file",
                    page.id
                )));
            }
        }

        for page in &self.pages {
            if let Some(parent) = page.parent {
                if !ids.contains(&parent) {
                    return Err(ScenarioError::Invalid(format!(
                        "page {} has unknown parent {}",
                        page.id, parent
                    )));
                }
            }
        }

        if self.space.homepage != 0 && !ids.contains(&self.space.homepage) {
            return Err(ScenarioError::Invalid(format!(
                "homepage {} is not among the pages",
                self.space.homepage
            )));
        }

        let mut attachment_ids = HashSet::new();
        for attachment in &self.attachments {
            if !attachment_ids.insert(attachment.id.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "attachment {} is defined twice",
                    attachment.id
                )));
            }
            if !ids.contains(&attachment.page) {
                return Err(ScenarioError::Invalid(format!(
                    "attachment {} belongs to unknown page {}",
                    attachment.id, attachment.page
                )));
            }
            if attachment.content.is_some() && attachment.file.is_some() {
                return Err(ScenarioError::Invalid(format!(
                    "attachment {} sets both content and file",
                    attachment.id
                )));
            }
        }

        Ok(())
    }

    pub fn page(&self, id: u64) -> Option<&PageFixture> {
        self.pages.iter().find(|p| p.id == id)
    }
}

/// Errors that can occur when loading a scenario
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario file {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Failed to parse scenario {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Scenario directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("Invalid scenario: {0}")]
    Invalid(String),
}
