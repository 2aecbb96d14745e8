pub mod convert;
pub mod document;
mod dom;
pub mod error;
pub mod exporter;
pub mod filename;
pub mod mime;
pub mod models;
pub mod pagination;
pub mod sanitize;
pub mod settings;
pub mod template;
pub mod traits;
pub mod tree;
pub mod writer;

pub use convert::HtmlToMarkdown;
pub use error::{ExportError, Result};
pub use exporter::{EntityKind, ExportFailure, ExportSummary, Exporter};
pub use models::*;
pub use pagination::{fetch_all_pages, get_max_results};
pub use sanitize::sanitize_filename;
pub use settings::{ExportOptions, ExportSettings};
pub use template::{PathContext, PathTemplate, TemplateKind};
pub use traits::{ContentSource, Converter};
pub use writer::{ExportWriter, WriteOutcome};
