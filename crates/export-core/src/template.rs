//! Path templates for exported pages and attachments
//!
//! A template is parsed once, when the configuration is loaded, so that an
//! unknown or misplaced placeholder stops the run before anything is fetched.
//! Rendering is a pure function of the entity and its ancestry.
//!
//! | placeholder              | page | attachment | value |
//! |--------------------------|------|------------|-------|
//! | `{space_key}`            | yes  | yes        | space key |
//! | `{space_name}`           | yes  | yes        | space name (falls back to the key) |
//! | `{homepage_id}`          | yes  | yes        | id of the space homepage |
//! | `{homepage_title}`       | yes  | yes        | title of the space homepage |
//! | `{ancestor_ids}`         | yes  | yes        | ancestor ids joined with `/` |
//! | `{ancestor_titles}`      | yes  | yes        | ancestor titles joined with `/` |
//! | `{page_id}`              | yes  | yes        | page id (containing page for attachments) |
//! | `{page_title}`           | yes  | yes        | page title (containing page for attachments) |
//! | `{page_extension}`       | yes  | no         | `.md` or `.html` |
//! | `{attachment_id}`        | no   | yes        | attachment id |
//! | `{attachment_title}`     | no   | yes        | attachment title as uploaded |
//! | `{attachment_file_id}`   | no   | yes        | collision-free filename stem |
//! | `{attachment_extension}` | no   | yes        | extension from the media type |
//! | `{attachment_filename}`  | no   | yes        | stem plus extension |
//!
//! The ancestor chain never starts with the space homepage, which has its own
//! placeholders. For attachments the chain ends with the containing page.

use std::path::PathBuf;

use crate::error::{ExportError, Result};
use crate::models::{Attachment, ExportFormat, PageRef, Space};
use crate::sanitize::sanitize_filename;

/// Which entity a template resolves paths for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Page,
    Attachment,
}

impl TemplateKind {
    fn name(self) -> &'static str {
        match self {
            TemplateKind::Page => "page",
            TemplateKind::Attachment => "attachment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    SpaceKey,
    SpaceName,
    HomepageId,
    HomepageTitle,
    AncestorIds,
    AncestorTitles,
    PageId,
    PageTitle,
    PageExtension,
    AttachmentId,
    AttachmentTitle,
    AttachmentFileId,
    AttachmentExtension,
    AttachmentFilename,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        let placeholder = match name {
            "space_key" => Placeholder::SpaceKey,
            "space_name" => Placeholder::SpaceName,
            "homepage_id" => Placeholder::HomepageId,
            "homepage_title" => Placeholder::HomepageTitle,
            "ancestor_ids" => Placeholder::AncestorIds,
            "ancestor_titles" => Placeholder::AncestorTitles,
            "page_id" => Placeholder::PageId,
            "page_title" => Placeholder::PageTitle,
            "page_extension" => Placeholder::PageExtension,
            "attachment_id" => Placeholder::AttachmentId,
            "attachment_title" => Placeholder::AttachmentTitle,
            "attachment_file_id" => Placeholder::AttachmentFileId,
            "attachment_extension" => Placeholder::AttachmentExtension,
            "attachment_filename" => Placeholder::AttachmentFilename,
            _ => return None,
        };
        Some(placeholder)
    }

    fn allowed_in(self, kind: TemplateKind) -> bool {
        match self {
            Placeholder::PageExtension => kind == TemplateKind::Page,
            Placeholder::AttachmentId
            | Placeholder::AttachmentTitle
            | Placeholder::AttachmentFileId
            | Placeholder::AttachmentExtension
            | Placeholder::AttachmentFilename => kind == TemplateKind::Attachment,
            _ => true,
        }
    }

    /// Placeholders that make a rendered path unique per entity
    fn identifies(self, kind: TemplateKind) -> bool {
        match kind {
            TemplateKind::Page => matches!(self, Placeholder::PageId | Placeholder::PageTitle),
            TemplateKind::Attachment => matches!(
                self,
                Placeholder::AttachmentId
                    | Placeholder::AttachmentFileId
                    | Placeholder::AttachmentFilename
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Everything a template may refer to when rendering one path
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
    pub space: &'a Space,
    pub homepage: &'a PageRef,
    /// Ancestors of `page`, root first, possibly starting with the homepage
    pub ancestors: &'a [PageRef],
    /// The page itself, or the containing page of an attachment
    pub page: &'a PageRef,
    pub format: ExportFormat,
    pub attachment: Option<&'a Attachment>,
}

impl PathContext<'_> {
    fn ancestor_chain(&self) -> Vec<&PageRef> {
        let skip = match self.ancestors.first() {
            Some(first) if first.id == self.homepage.id => 1,
            _ => 0,
        };

        let mut chain: Vec<&PageRef> = self.ancestors[skip..].iter().collect();
        if self.attachment.is_some() && self.page.id != self.homepage.id {
            chain.push(self.page);
        }
        chain
    }
}

/// A parsed path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    kind: TemplateKind,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse and validate a template for the given entity kind
    pub fn parse(text: &str, kind: TemplateKind) -> Result<Self> {
        let invalid = |reason: String| {
            ExportError::Template(format!("{} path '{}': {}", kind.name(), text, reason))
        };

        if text.trim().is_empty() {
            return Err(invalid("template is empty".to_string()));
        }
        if text.starts_with('/') || text.starts_with('\\') || text.contains(":\\") {
            return Err(invalid("template must be a relative path".to_string()));
        }
        if text.split('/').any(|segment| segment == "..") {
            return Err(invalid("'..' segments are not allowed".to_string()));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(invalid("nested '{'".to_string())),
                            Some(ch) => name.push(ch),
                            None => return Err(invalid("unclosed '{'".to_string())),
                        }
                    }

                    let placeholder = Placeholder::from_name(name.trim())
                        .ok_or_else(|| invalid(format!("Unknown placeholder '{{{}}}'", name)))?;
                    if !placeholder.allowed_in(kind) {
                        return Err(invalid(format!(
                            "placeholder '{{{}}}' cannot be used in a {} path",
                            name.trim(),
                            kind.name()
                        )));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(placeholder));
                }
                '}' => return Err(invalid("unmatched '}'".to_string())),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let identifies = segments.iter().any(|segment| match segment {
            Segment::Placeholder(p) => p.identifies(kind),
            Segment::Literal(_) => false,
        });
        if !identifies {
            let required = match kind {
                TemplateKind::Page => "{page_id} or {page_title}",
                TemplateKind::Attachment => {
                    "{attachment_id}, {attachment_file_id} or {attachment_filename}"
                }
            };
            return Err(invalid(format!(
                "must contain {} so that paths are unique",
                required
            )));
        }

        Ok(Self {
            source: text.to_string(),
            kind,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Expand the template into a relative path
    pub fn render(&self, ctx: &PathContext<'_>) -> Result<PathBuf> {
        if self.kind == TemplateKind::Attachment && ctx.attachment.is_none() {
            return Err(ExportError::Template(format!(
                "attachment path '{}' rendered without an attachment",
                self.source
            )));
        }

        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(p) => rendered.push_str(&expand(*p, ctx)),
            }
        }

        let mut path = PathBuf::new();
        for component in rendered.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    return Err(ExportError::Structure(format!(
                        "path '{}' escapes the output directory",
                        rendered
                    )))
                }
                _ => path.push(component),
            }
        }

        if path.as_os_str().is_empty() {
            return Err(ExportError::Structure(format!(
                "{} path '{}' rendered to an empty path",
                self.kind.name(),
                self.source
            )));
        }

        Ok(path)
    }
}

/// Sanitized title, or the id when nothing printable is left
fn title_component(page: &PageRef) -> String {
    let title = sanitize_filename(&page.title);
    if title.is_empty() {
        page.id.to_string()
    } else {
        title
    }
}

fn expand(placeholder: Placeholder, ctx: &PathContext<'_>) -> String {
    match placeholder {
        Placeholder::SpaceKey => sanitize_filename(&ctx.space.key),
        Placeholder::SpaceName => {
            let name = sanitize_filename(&ctx.space.name);
            if name.is_empty() {
                sanitize_filename(&ctx.space.key)
            } else {
                name
            }
        }
        Placeholder::HomepageId => ctx.homepage.id.to_string(),
        Placeholder::HomepageTitle => title_component(ctx.homepage),
        Placeholder::AncestorIds => ctx
            .ancestor_chain()
            .iter()
            .map(|a| a.id.to_string())
            .collect::<Vec<_>>()
            .join("/"),
        Placeholder::AncestorTitles => ctx
            .ancestor_chain()
            .iter()
            .map(|a| title_component(a))
            .collect::<Vec<_>>()
            .join("/"),
        Placeholder::PageId => ctx.page.id.to_string(),
        Placeholder::PageTitle => title_component(ctx.page),
        Placeholder::PageExtension => ctx.format.page_extension().to_string(),
        Placeholder::AttachmentId => ctx
            .attachment
            .map(|a| sanitize_filename(&a.id))
            .unwrap_or_default(),
        Placeholder::AttachmentTitle => ctx
            .attachment
            .map(|a| sanitize_filename(&a.title))
            .unwrap_or_default(),
        Placeholder::AttachmentFileId => ctx.attachment.map(|a| a.file_stem()).unwrap_or_default(),
        Placeholder::AttachmentExtension => ctx
            .attachment
            .map(|a| a.extension().to_string())
            .unwrap_or_default(),
        Placeholder::AttachmentFilename => ctx.attachment.map(|a| a.filename()).unwrap_or_default(),
    }
}
