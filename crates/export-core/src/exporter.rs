//! The export pipeline
//!
//! A run discovers the page tree below its root, then walks it depth first:
//! every page is written before its children and followed by its own
//! attachments. Failures of a single entity are recorded in the summary and
//! the walk moves on; only problems that make the whole run meaningless
//! (unwritable output root, unknown space or root page) are returned as
//! errors.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::{render_html, render_markdown, Breadcrumb, PageDocument};
use crate::error::{ExportError, Result};
use crate::models::{Attachment, ExportFormat, Page, PageInfo, PageRef, Space};
use crate::settings::ExportOptions;
use crate::template::PathContext;
use crate::traits::{ContentSource, Converter};
use crate::tree::ContentTree;
use crate::writer::{ExportWriter, WriteOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Space,
    Page,
    Attachment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Space => "space",
            EntityKind::Page => "page",
            EntityKind::Attachment => "attachment",
        };
        f.write_str(name)
    }
}

/// One entity that could not be exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFailure {
    pub kind: EntityKind,
    pub id: String,
    /// Resolved path, when resolution got that far
    pub path: Option<PathBuf>,
    pub error: String,
}

/// Outcome of one or more export runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub pages_exported: usize,
    pub attachments_exported: usize,
    /// Files left untouched because their content did not change
    pub unchanged: usize,
    /// Attachments written without an extension (unknown media type)
    pub degraded_attachments: usize,
    pub failures: Vec<ExportFailure>,
    pub cancelled: bool,
}

impl ExportSummary {
    pub fn merge(&mut self, other: ExportSummary) {
        self.pages_exported += other.pages_exported;
        self.attachments_exported += other.attachments_exported;
        self.unchanged += other.unchanged;
        self.degraded_attachments += other.degraded_attachments;
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }

    pub fn push_failure(
        &mut self,
        kind: EntityKind,
        id: impl Into<String>,
        path: Option<PathBuf>,
        error: &ExportError,
    ) {
        let id = id.into();
        warn!(%kind, %id, path = ?path, error = %error, "export failed");
        self.failures.push(ExportFailure {
            kind,
            id,
            path,
            error: error.to_string(),
        });
    }

    pub fn total_exported(&self) -> usize {
        self.pages_exported + self.attachments_exported
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Drives an export against a content source
pub struct Exporter<'a> {
    source: &'a dyn ContentSource,
    converter: &'a dyn Converter,
    options: ExportOptions,
    deadline: Option<Instant>,
}

impl<'a> Exporter<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        converter: &'a dyn Converter,
        options: ExportOptions,
    ) -> Self {
        Self {
            source,
            converter,
            options,
            deadline: None,
        }
    }

    /// Stop dispatching new entities once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export every page of a space, starting at its homepage
    pub fn export_space(&self, key: &str) -> Result<ExportSummary> {
        let space = self.source.get_space(key)?;
        if space.homepage == 0 {
            return Err(ExportError::Structure(format!(
                "space {} has no homepage",
                space.key
            )));
        }

        let home = self.source.get_page(space.homepage)?;
        info!(space = %space.key, homepage = home.id, "exporting space");
        let homepage = home.to_ref();
        self.run(space, homepage.clone(), homepage, Vec::new(), true)
    }

    /// Export a single page and its attachments
    pub fn export_page(&self, id: u64) -> Result<ExportSummary> {
        let info = self.source.get_page(id)?;
        let space = self.source.get_space(&info.space_key)?;
        let homepage = self.resolve_homepage(&space, &info)?;
        info!(page = id, space = %space.key, "exporting page");
        self.run(space, homepage, info.to_ref(), info.ancestors, false)
    }

    /// Export a page, its attachments and all of its descendants
    pub fn export_page_tree(&self, id: u64) -> Result<ExportSummary> {
        let info = self.source.get_page(id)?;
        let space = self.source.get_space(&info.space_key)?;
        let homepage = self.resolve_homepage(&space, &info)?;
        info!(page = id, space = %space.key, "exporting page tree");
        self.run(space, homepage, info.to_ref(), info.ancestors, true)
    }

    fn resolve_homepage(&self, space: &Space, info: &PageInfo) -> Result<PageRef> {
        if space.homepage == 0 {
            return Ok(info
                .ancestors
                .first()
                .cloned()
                .unwrap_or_else(|| info.to_ref()));
        }
        if info.id == space.homepage {
            return Ok(info.to_ref());
        }
        if let Some(home) = info.ancestors.iter().find(|a| a.id == space.homepage) {
            return Ok(home.clone());
        }
        Ok(self.source.get_page(space.homepage)?.to_ref())
    }

    fn run(
        &self,
        space: Space,
        homepage: PageRef,
        root: PageRef,
        base_ancestors: Vec<PageRef>,
        recursive: bool,
    ) -> Result<ExportSummary> {
        let writer = ExportWriter::new(&self.options.output_path, self.options.skip_unchanged)?;
        let tree = ContentTree::new(root, base_ancestors)?;

        let mut run = Run {
            exporter: self,
            space,
            homepage,
            writer,
            tree,
            summary: ExportSummary::default(),
            claimed: HashSet::new(),
        };

        if recursive {
            run.discover();
        }
        run.walk();

        let summary = run.summary;
        info!(
            pages = summary.pages_exported,
            attachments = summary.attachments_exported,
            unchanged = summary.unchanged,
            failures = summary.failures.len(),
            cancelled = summary.cancelled,
            "export finished"
        );
        Ok(summary)
    }
}

/// State of a single export run
struct Run<'e, 'a> {
    exporter: &'e Exporter<'a>,
    space: Space,
    homepage: PageRef,
    writer: ExportWriter,
    tree: ContentTree,
    summary: ExportSummary,
    /// Paths written in this run
    claimed: HashSet<PathBuf>,
}

impl Run<'_, '_> {
    fn source(&self) -> &dyn ContentSource {
        self.exporter.source
    }

    fn options(&self) -> &ExportOptions {
        &self.exporter.options
    }

    /// Mark the run cancelled once the deadline has passed
    fn expired(&mut self) -> bool {
        if self.summary.cancelled {
            return true;
        }
        if let Some(deadline) = self.exporter.deadline {
            if Instant::now() >= deadline {
                warn!("deadline reached, stopping export");
                self.summary.cancelled = true;
            }
        }
        self.summary.cancelled
    }

    /// Fill the tree with every page reachable from the root
    fn discover(&mut self) {
        let mut pending = vec![ContentTree::ROOT];
        while let Some(idx) = pending.pop() {
            if self.expired() {
                return;
            }

            let parent_id = self.tree.node(idx).page.id;
            let children = match self.source().list_child_pages(parent_id) {
                Ok(children) => children,
                Err(e) => {
                    self.summary
                        .push_failure(EntityKind::Page, parent_id.to_string(), None, &e);
                    continue;
                }
            };
            debug!(page = parent_id, children = children.len(), "listed child pages");

            for child in children {
                let child_id = child.id;
                match self.tree.insert_child(idx, child) {
                    Ok(child_idx) => pending.push(child_idx),
                    Err(e) => {
                        self.summary
                            .push_failure(EntityKind::Page, child_id.to_string(), None, &e)
                    }
                }
            }
        }
    }

    fn walk(&mut self) {
        for idx in self.tree.preorder() {
            if self.expired() {
                return;
            }
            self.export_node(idx);
        }
    }

    /// Reserve `path` for one entity; a second claim is a collision
    fn claim(&mut self, path: &Path) -> Result<()> {
        if self.claimed.insert(path.to_path_buf()) {
            Ok(())
        } else {
            Err(ExportError::Structure(format!(
                "{} is already used by another exported entity",
                path.display()
            )))
        }
    }

    fn page_context<'c>(
        &'c self,
        page: &'c PageRef,
        ancestors: &'c [PageRef],
        attachment: Option<&'c Attachment>,
    ) -> PathContext<'c> {
        PathContext {
            space: &self.space,
            homepage: &self.homepage,
            ancestors,
            page,
            format: self.options().format,
            attachment,
        }
    }

    fn page_path(&self, page: &PageRef, ancestors: &[PageRef]) -> Result<PathBuf> {
        self.options()
            .page_path
            .render(&self.page_context(page, ancestors, None))
    }

    fn breadcrumbs(&self, ancestors: &[PageRef]) -> Vec<Breadcrumb> {
        if !self.options().page_breadcrumbs {
            return Vec::new();
        }

        ancestors
            .iter()
            .enumerate()
            .filter_map(|(i, ancestor)| {
                self.page_path(ancestor, &ancestors[..i])
                    .ok()
                    .map(|path| Breadcrumb {
                        title: ancestor.title.clone(),
                        path,
                    })
            })
            .collect()
    }

    fn export_node(&mut self, idx: usize) {
        let page_ref = self.tree.node(idx).page.clone();
        let ancestors = self.tree.ancestors(idx);

        self.export_page_body(&page_ref, &ancestors);
        self.export_attachments(&page_ref, &ancestors);
    }

    fn export_page_body(&mut self, page_ref: &PageRef, ancestors: &[PageRef]) {
        let id = page_ref.id.to_string();

        let resolved = self.page_path(page_ref, ancestors);
        let path = match resolved.and_then(|path| self.claim(&path).map(|()| path)) {
            Ok(path) => path,
            Err(e) => {
                self.summary.push_failure(EntityKind::Page, id, None, &e);
                return;
            }
        };

        let html = match self.source().fetch_page_html(page_ref.id) {
            Ok(html) => html,
            Err(e) => {
                self.summary
                    .push_failure(EntityKind::Page, id, Some(path), &e);
                return;
            }
        };

        let labels = self.source().get_page_labels(page_ref.id).unwrap_or_else(|e| {
            warn!(page = page_ref.id, error = %e, "could not fetch labels");
            Vec::new()
        });

        let page = Page {
            id: page_ref.id,
            title: page_ref.title.clone(),
            html,
            ancestors: ancestors.to_vec(),
            labels,
            space: self.space.clone(),
        };

        let bytes = self.render_page(&page, &path);
        match self.writer.write(&path, bytes.as_bytes()) {
            Ok(outcome) => {
                self.record_write(outcome, EntityKind::Page);
                info!(page = page.id, path = %path.display(), ?outcome, "exported page");
            }
            Err(e) => self
                .summary
                .push_failure(EntityKind::Page, id, Some(path), &e),
        }
    }

    fn render_page(&self, page: &Page, path: &Path) -> String {
        let options = self.options();
        let breadcrumbs = self.breadcrumbs(&page.ancestors);
        let doc = PageDocument {
            title: &page.title,
            path,
            labels: &page.labels,
            breadcrumbs: &breadcrumbs,
            include_title: options.include_document_title,
        };

        match options.format {
            ExportFormat::Markdown => {
                let body = self.exporter.converter.convert(&page.html);
                render_markdown(&doc, &body)
            }
            ExportFormat::Html => render_html(&doc, &page.html),
        }
    }

    fn export_attachments(&mut self, page: &PageRef, ancestors: &[PageRef]) {
        let attachments = match self.source().list_attachments(page.id) {
            Ok(attachments) => attachments,
            Err(e) => {
                self.summary
                    .push_failure(EntityKind::Page, page.id.to_string(), None, &e);
                return;
            }
        };
        debug!(page = page.id, count = attachments.len(), "listed attachments");

        let mut chain = ancestors.to_vec();
        chain.push(page.clone());

        for attachment in attachments {
            if self.expired() {
                return;
            }

            let attachment = Attachment {
                space: if attachment.space.key.is_empty() {
                    self.space.clone()
                } else {
                    attachment.space
                },
                ancestors: if attachment.ancestors.is_empty() {
                    chain.clone()
                } else {
                    attachment.ancestors
                },
                ..attachment
            };
            self.export_attachment(page, ancestors, &attachment);
        }
    }

    fn export_attachment(&mut self, page: &PageRef, ancestors: &[PageRef], attachment: &Attachment) {
        let id = attachment.id.clone();

        let rendered = self
            .options()
            .attachment_path
            .render(&self.page_context(page, ancestors, Some(attachment)));
        let path = match rendered {
            Ok(path) => path,
            Err(e) => {
                self.summary.push_failure(EntityKind::Attachment, id, None, &e);
                return;
            }
        };

        // Attachment ids are unique per run, so distinct attachments cannot resolve here
        let claimed = self.claim(&path);
        debug_assert!(claimed.is_ok(), "attachment path collision at {}", path.display());
        if let Err(e) = claimed {
            self.summary
                .push_failure(EntityKind::Attachment, id, Some(path), &e);
            return;
        }

        let bytes = match self.source().fetch_attachment_bytes(&attachment.download_link) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.summary
                    .push_failure(EntityKind::Attachment, id, Some(path), &e);
                return;
            }
        };

        if !attachment.has_known_extension() {
            warn!(
                attachment = %attachment.id,
                media_type = %attachment.media_type,
                path = %path.display(),
                "unknown media type, exporting without extension"
            );
            self.summary.degraded_attachments += 1;
        }

        match self.writer.write(&path, &bytes) {
            Ok(outcome) => {
                self.record_write(outcome, EntityKind::Attachment);
                info!(attachment = %attachment.id, path = %path.display(), ?outcome, "exported attachment");
            }
            Err(e) => self
                .summary
                .push_failure(EntityKind::Attachment, id, Some(path), &e),
        }
    }

    fn record_write(&mut self, outcome: WriteOutcome, kind: EntityKind) {
        match (outcome, kind) {
            (WriteOutcome::Unchanged, _) => self.summary.unchanged += 1,
            (_, EntityKind::Attachment) => self.summary.attachments_exported += 1,
            _ => self.summary.pages_exported += 1,
        }
    }
}
