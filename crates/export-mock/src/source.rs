//! Mock content source implementing ContentSource
//!
//! Serves a loaded scenario instead of making HTTP requests.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use export_core::{
    Attachment, ContentSource, ExportError, PageInfo, PageRef, Result, Space, User, Version,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scenario::{AttachmentFixture, PageFixture, Scenario};

/// Prefix of the download links handed out for attachments
const DOWNLOAD_PREFIX: &str = "/download/attachments/";

/// A content source that reads a space from fixture files
pub struct MockSource {
    /// Root directory containing the scenario
    scenario_dir: PathBuf,

    scenario: Scenario,

    /// Every call made, in order
    calls: Mutex<Vec<CallLogEntry>>,

    /// Optional JSONL file that mirrors `calls`
    log_path: Option<PathBuf>,
}

/// A single call log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    pub timestamp: DateTime<Utc>,

    /// Trait method name
    pub method: String,

    /// Page id, space key or download link the call was about
    pub target: String,

    /// Error message (if call failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MockSource {
    /// Load the scenario in `scenario_dir`
    pub fn load(scenario_dir: impl AsRef<Path>) -> Result<Self> {
        let scenario_dir = scenario_dir.as_ref().to_path_buf();
        let scenario = Scenario::load_from_dir(&scenario_dir)
            .map_err(|e| ExportError::Config(format!("Failed to load mock scenario: {}", e)))?;
        Ok(Self::new(scenario_dir, scenario))
    }

    /// Serve an already built scenario; file references resolve against `scenario_dir`
    pub fn new(scenario_dir: impl Into<PathBuf>, scenario: Scenario) -> Self {
        Self {
            scenario_dir: scenario_dir.into(),
            scenario,
            calls: Mutex::new(Vec::new()),
            log_path: None,
        }
    }

    /// Append every call to a JSONL file
    pub fn with_call_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Calls made so far
    pub fn calls(&self) -> Vec<CallLogEntry> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls made to `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }

    fn record<T>(&self, method: &str, target: &str, result: Result<T>) -> Result<T> {
        let entry = CallLogEntry {
            timestamp: Utc::now(),
            method: method.to_string(),
            target: target.to_string(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        debug!(method, target, failed = entry.error.is_some(), "mock call");

        if let Some(path) = &self.log_path {
            if let Ok(json) = serde_json::to_string(&entry) {
                let file = OpenOptions::new().create(true).append(true).open(path);
                if let Ok(mut file) = file {
                    let _ = writeln!(file, "{}", json);
                }
            }
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(entry);
        }
        result
    }

    fn page(&self, id: u64) -> Result<&PageFixture> {
        self.scenario
            .page(id)
            .ok_or_else(|| ExportError::NotFound(format!("page {}", id)))
    }

    fn space(&self) -> Space {
        let fixture = &self.scenario.space;
        Space {
            key: fixture.key.clone(),
            name: if fixture.name.is_empty() {
                fixture.key.clone()
            } else {
                fixture.name.clone()
            },
            description: fixture.description.clone(),
            homepage: fixture.homepage,
        }
    }

    /// Ancestor chain from the parent links, root first
    ///
    /// Stops when a page repeats so cyclic fixtures still answer.
    fn ancestors(&self, id: u64) -> Vec<PageRef> {
        let mut chain = Vec::new();
        let mut seen = vec![id];
        let mut current = self.scenario.page(id).and_then(|p| p.parent);
        while let Some(parent_id) = current {
            if seen.contains(&parent_id) {
                break;
            }
            seen.push(parent_id);
            match self.scenario.page(parent_id) {
                Some(parent) => {
                    chain.push(PageRef::new(parent.id, parent.title.clone()));
                    current = parent.parent;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    fn read_file(&self, relative: &Path) -> Result<Vec<u8>> {
        let path = self.scenario_dir.join(relative);
        std::fs::read(&path).map_err(|e| {
            ExportError::Io(format!(
                "Failed to read mock file {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn download_link(fixture: &AttachmentFixture) -> String {
        format!("{}{}/{}", DOWNLOAD_PREFIX, fixture.page, fixture.id)
    }

    fn attachment(&self, fixture: &AttachmentFixture) -> Attachment {
        let version = fixture.version.map(|number| Version {
            number,
            by: User::default(),
            when: fixture.modified.unwrap_or_default(),
            friendly_when: String::new(),
        });
        let file_size = fixture
            .content
            .as_ref()
            .map(|c| c.len() as u64)
            .unwrap_or(0);

        Attachment {
            id: fixture.id.clone(),
            file_id: fixture.file_id.clone(),
            title: fixture.title.clone(),
            media_type: fixture.media_type.clone(),
            media_type_description: String::new(),
            file_size,
            collection_name: format!("contentId-{}", fixture.page),
            download_link: Self::download_link(fixture),
            comment: fixture.comment.clone(),
            ancestors: Vec::new(),
            space: Space::default(),
            version,
        }
    }

    fn injected(what: &str, target: impl std::fmt::Display) -> ExportError {
        ExportError::Api {
            status: 500,
            message: format!("injected failure: {} {}", what, target),
        }
    }
}

impl ContentSource for MockSource {
    fn get_space(&self, key: &str) -> Result<Space> {
        let result = if self.scenario.space.key == key {
            Ok(self.space())
        } else {
            Err(ExportError::NotFound(format!("space {}", key)))
        };
        self.record("get_space", key, result)
    }

    fn get_page(&self, id: u64) -> Result<PageInfo> {
        let result = self.page(id).map(|page| PageInfo {
            id: page.id,
            title: page.title.clone(),
            space_key: self.scenario.space.key.clone(),
            ancestors: self.ancestors(id),
        });
        self.record("get_page", &id.to_string(), result)
    }

    fn list_child_pages(&self, id: u64) -> Result<Vec<PageRef>> {
        let result = self.page(id).and_then(|page| {
            if page.fail_children {
                return Err(Self::injected("child listing of page", id));
            }
            Ok(self
                .scenario
                .pages
                .iter()
                .filter(|p| p.parent == Some(id))
                .map(|p| PageRef::new(p.id, p.title.clone()))
                .collect())
        });
        self.record("list_child_pages", &id.to_string(), result)
    }

    fn fetch_page_html(&self, id: u64) -> Result<String> {
        let result = self.page(id).and_then(|page| {
            if page.fail_html {
                return Err(Self::injected("body of page", id));
            }
            match (&page.html, &page.html_file) {
                (Some(html), _) => Ok(html.clone()),
                (None, Some(file)) => {
                    let bytes = self.read_file(file)?;
                    String::from_utf8(bytes)
                        .map_err(|e| ExportError::Parse(format!("page {} body: {}", id, e)))
                }
                (None, None) => Ok(String::new()),
            }
        });
        self.record("fetch_page_html", &id.to_string(), result)
    }

    fn get_page_labels(&self, id: u64) -> Result<Vec<String>> {
        let result = self.page(id).and_then(|page| {
            if page.fail_labels {
                return Err(Self::injected("labels of page", id));
            }
            Ok(page.labels.clone())
        });
        self.record("get_page_labels", &id.to_string(), result)
    }

    fn list_attachments(&self, page_id: u64) -> Result<Vec<Attachment>> {
        let result = self.page(page_id).and_then(|page| {
            if page.fail_attachments {
                return Err(Self::injected("attachment listing of page", page_id));
            }
            Ok(self
                .scenario
                .attachments
                .iter()
                .filter(|a| a.page == page_id)
                .map(|a| self.attachment(a))
                .collect())
        });
        self.record("list_attachments", &page_id.to_string(), result)
    }

    fn fetch_attachment_bytes(&self, download_link: &str) -> Result<Vec<u8>> {
        let fixture = self
            .scenario
            .attachments
            .iter()
            .find(|a| Self::download_link(a) == download_link);

        let result = match fixture {
            None => Err(ExportError::NotFound(format!("download {}", download_link))),
            Some(a) if a.fail_download => Err(Self::injected("download of attachment", &a.id)),
            Some(a) => match (&a.content, &a.file) {
                (Some(content), _) => Ok(content.as_bytes().to_vec()),
                (None, Some(file)) => self.read_file(file),
                (None, None) => Ok(Vec::new()),
            },
        };
        self.record("fetch_attachment_bytes", download_link, result)
    }
}
