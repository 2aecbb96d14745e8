use crate::error::Result;
use crate::models::*;

/// Read access to a remote content hierarchy
///
/// Implemented by the Confluence HTTP client and by the fixture-backed mock.
/// Implementations do not retry; a failed call is reported to the caller and
/// only affects the entity being exported.
pub trait ContentSource: Send + Sync {
    /// Get a space by its key
    fn get_space(&self, key: &str) -> Result<Space>;

    /// Look up a page's title, space and ancestor chain
    fn get_page(&self, id: u64) -> Result<PageInfo>;

    /// List the direct children of a page, in the order the remote reports them
    fn list_child_pages(&self, id: u64) -> Result<Vec<PageRef>>;

    /// Fetch the rendered HTML body of a page
    fn fetch_page_html(&self, id: u64) -> Result<String>;

    /// Labels attached to a page
    fn get_page_labels(&self, id: u64) -> Result<Vec<String>> {
        let _ = id;
        Ok(Vec::new())
    }

    /// List attachments of a page
    fn list_attachments(&self, page_id: u64) -> Result<Vec<Attachment>>;

    /// Download attachment content from its download link
    fn fetch_attachment_bytes(&self, download_link: &str) -> Result<Vec<u8>>;
}

/// Transforms a rendered HTML body into the target document format
pub trait Converter: Send + Sync {
    fn convert(&self, html: &str) -> String;
}
