use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ExportFormat;
use crate::template::{PathTemplate, TemplateKind};

pub const DEFAULT_PAGE_PATH: &str =
    "{space_name}/{homepage_title}/{ancestor_titles}/{page_title}{page_extension}";
pub const DEFAULT_ATTACHMENT_PATH: &str =
    "{space_name}/attachments/{attachment_file_id}{attachment_extension}";

/// Export settings as they appear in the `[export]` configuration table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Root directory of the export
    pub output_path: PathBuf,
    pub export_format: ExportFormat,
    /// Path template for pages
    pub page_path: String,
    /// Path template for attachments
    pub attachment_path: String,
    /// Prepend a trail of links to the page's ancestors
    pub page_breadcrumbs: bool,
    /// Start pages with a title heading (`# Title` or `<h1>`)
    pub include_document_title: bool,
    /// Leave byte-identical files untouched
    pub skip_unchanged: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("."),
            export_format: ExportFormat::default(),
            page_path: DEFAULT_PAGE_PATH.to_string(),
            attachment_path: DEFAULT_ATTACHMENT_PATH.to_string(),
            page_breadcrumbs: true,
            include_document_title: true,
            skip_unchanged: true,
        }
    }
}

impl ExportSettings {
    /// Validate the settings and parse the path templates
    pub fn compile(&self) -> Result<ExportOptions> {
        Ok(ExportOptions {
            output_path: self.output_path.clone(),
            format: self.export_format,
            page_path: PathTemplate::parse(&self.page_path, TemplateKind::Page)?,
            attachment_path: PathTemplate::parse(&self.attachment_path, TemplateKind::Attachment)?,
            page_breadcrumbs: self.page_breadcrumbs,
            include_document_title: self.include_document_title,
            skip_unchanged: self.skip_unchanged,
        })
    }
}

/// Validated settings consumed by the exporter
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_path: PathBuf,
    pub format: ExportFormat,
    pub page_path: PathTemplate,
    pub attachment_path: PathTemplate,
    pub page_breadcrumbs: bool,
    pub include_document_title: bool,
    pub skip_unchanged: bool,
}
