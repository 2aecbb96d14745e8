//! ContentSource trait implementation for the Confluence client

use export_core::{
    Attachment, ContentSource, ExportError, PageInfo, PageRef, Result, Space, fetch_all_pages,
};

use crate::client::ConfluenceClient;

impl ContentSource for ConfluenceClient {
    fn get_space(&self, key: &str) -> Result<Space> {
        let space = self.fetch_space(key).map_err(ExportError::from)?;
        Ok(space.into())
    }

    fn get_page(&self, id: u64) -> Result<PageInfo> {
        let content = self.fetch_content(id).map_err(ExportError::from)?;
        PageInfo::try_from(content).map_err(ExportError::from)
    }

    fn list_child_pages(&self, id: u64) -> Result<Vec<PageRef>> {
        fetch_all_pages(
            |start, limit| {
                let list = self
                    .fetch_child_pages(id, start, limit)
                    .map_err(ExportError::from)?;
                list.results
                    .into_iter()
                    .map(|c| PageRef::try_from(c).map_err(ExportError::from))
                    .collect()
            },
            self.page_size(),
        )
    }

    fn fetch_page_html(&self, id: u64) -> Result<String> {
        let content = self.fetch_page_body(id).map_err(ExportError::from)?;
        content
            .body
            .and_then(|b| b.view)
            .map(|v| v.value)
            .ok_or_else(|| ExportError::Parse(format!("page {} has no rendered body", id)))
    }

    fn get_page_labels(&self, id: u64) -> Result<Vec<String>> {
        fetch_all_pages(
            |start, limit| {
                let list = self
                    .fetch_labels(id, start, limit)
                    .map_err(ExportError::from)?;
                Ok(list.results.into_iter().map(|l| l.name).collect())
            },
            self.page_size(),
        )
    }

    fn list_attachments(&self, page_id: u64) -> Result<Vec<Attachment>> {
        fetch_all_pages(
            |start, limit| {
                let list = self
                    .fetch_attachments(page_id, start, limit)
                    .map_err(ExportError::from)?;
                list.results
                    .into_iter()
                    .map(|c| Attachment::try_from(c).map_err(ExportError::from))
                    .collect()
            },
            self.page_size(),
        )
    }

    fn fetch_attachment_bytes(&self, download_link: &str) -> Result<Vec<u8>> {
        if download_link.is_empty() {
            return Err(ExportError::Parse(
                "attachment has no download link".to_string(),
            ));
        }
        self.download(download_link).map_err(ExportError::from)
    }
}
