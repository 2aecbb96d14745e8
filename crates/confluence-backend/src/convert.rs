//! Model conversions from Confluence types to export-core types

use chrono::{DateTime, Utc};
use export_core::{Attachment, PageInfo, PageRef, Space, User, Version};

use crate::error::{ConfluenceError, Result};
use crate::models::*;

/// Parse a numeric content id, accepting the `att` prefix attachments carry
pub(crate) fn parse_content_id(id: &str) -> Result<u64> {
    id.trim_start_matches("att")
        .parse()
        .map_err(|_| ConfluenceError::InvalidId(id.to_string()))
}

impl TryFrom<ConfluenceContentRef> for PageRef {
    type Error = ConfluenceError;

    fn try_from(r: ConfluenceContentRef) -> Result<Self> {
        Ok(PageRef::new(parse_content_id(&r.id)?, r.title))
    }
}

impl From<ConfluenceSpace> for Space {
    fn from(s: ConfluenceSpace) -> Self {
        let description = s
            .description
            .and_then(|d| d.plain)
            .map(|p| p.value)
            .unwrap_or_default();

        // A space without a readable homepage keeps 0, which callers reject
        let homepage = s
            .homepage
            .and_then(|h| parse_content_id(&h.id).ok())
            .unwrap_or(0);

        let name = if s.name.is_empty() { s.key.clone() } else { s.name };

        Space {
            key: s.key,
            name,
            description,
            homepage,
        }
    }
}

impl TryFrom<ConfluenceContent> for PageInfo {
    type Error = ConfluenceError;

    fn try_from(c: ConfluenceContent) -> Result<Self> {
        let ancestors = c
            .ancestors
            .unwrap_or_default()
            .into_iter()
            .map(PageRef::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(PageInfo {
            id: parse_content_id(&c.id)?,
            title: c.title,
            space_key: c.space.map(|s| s.key).unwrap_or_default(),
            ancestors,
        })
    }
}

impl TryFrom<ConfluenceContent> for PageRef {
    type Error = ConfluenceError;

    fn try_from(c: ConfluenceContent) -> Result<Self> {
        Ok(PageRef::new(parse_content_id(&c.id)?, c.title))
    }
}

impl From<ConfluenceUser> for User {
    fn from(u: ConfluenceUser) -> Self {
        User {
            account_id: u.account_id.unwrap_or_default(),
            username: u.username.unwrap_or_default(),
            display_name: u.display_name.unwrap_or_default(),
            public_name: u.public_name.unwrap_or_default(),
            email: u.email.unwrap_or_default(),
        }
    }
}

/// Versions without a parseable timestamp are dropped
fn convert_version(v: ConfluenceVersion) -> Option<Version> {
    let when = v
        .when
        .as_deref()
        .and_then(|w| DateTime::parse_from_rfc3339(w).ok())
        .map(|dt| dt.with_timezone(&Utc))?;

    Some(Version {
        number: v.number,
        by: v.by.map(User::from).unwrap_or_default(),
        when,
        friendly_when: v.friendly_when.unwrap_or_default(),
    })
}

impl TryFrom<ConfluenceContent> for Attachment {
    type Error = ConfluenceError;

    fn try_from(c: ConfluenceContent) -> Result<Self> {
        // Validates the id; the textual form is kept without the prefix
        parse_content_id(&c.id)?;
        let id = c.id.trim_start_matches("att").to_string();

        let extensions = c.extensions;
        let metadata = c.metadata;

        let media_type = extensions
            .as_ref()
            .and_then(|e| e.media_type.clone())
            .or_else(|| metadata.as_ref().and_then(|m| m.media_type.clone()))
            .unwrap_or_default();
        let comment = extensions
            .as_ref()
            .and_then(|e| e.comment.clone())
            .or_else(|| metadata.as_ref().and_then(|m| m.comment.clone()))
            .unwrap_or_default();

        let ancestors = c
            .ancestors
            .unwrap_or_default()
            .into_iter()
            .map(PageRef::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Attachment {
            id,
            file_id: extensions
                .as_ref()
                .and_then(|e| e.file_id.clone())
                .unwrap_or_default(),
            title: c.title,
            media_type,
            media_type_description: extensions
                .as_ref()
                .and_then(|e| e.media_type_description.clone())
                .unwrap_or_default(),
            file_size: extensions.as_ref().and_then(|e| e.file_size).unwrap_or(0),
            collection_name: extensions
                .as_ref()
                .and_then(|e| e.collection_name.clone())
                .unwrap_or_default(),
            download_link: c.links.and_then(|l| l.download).unwrap_or_default(),
            comment,
            ancestors,
            space: c.space.map(Space::from).unwrap_or_default(),
            version: c.version.and_then(convert_version),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(json: serde_json::Value) -> ConfluenceContent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parse_content_id() {
        assert_eq!(parse_content_id("12345").unwrap(), 12345);
        assert_eq!(parse_content_id("att98765").unwrap(), 98765);
        assert!(matches!(
            parse_content_id("abc"),
            Err(ConfluenceError::InvalidId(_))
        ));
    }

    #[test]
    fn test_space_conversion() {
        let space: ConfluenceSpace = serde_json::from_value(serde_json::json!({
            "id": 98304,
            "key": "DOCS",
            "name": "Documentation",
            "description": {"plain": {"value": "All the docs", "representation": "plain"}},
            "homepage": {"id": "65537", "title": "Docs Home"}
        }))
        .unwrap();

        let space = Space::from(space);
        assert_eq!(space.key, "DOCS");
        assert_eq!(space.name, "Documentation");
        assert_eq!(space.description, "All the docs");
        assert_eq!(space.homepage, 65537);
    }

    #[test]
    fn test_space_without_homepage() {
        let space: ConfluenceSpace =
            serde_json::from_value(serde_json::json!({"key": "EMPTY"})).unwrap();
        let space = Space::from(space);
        assert_eq!(space.homepage, 0);
        assert_eq!(space.name, "EMPTY");
    }

    #[test]
    fn test_page_info_conversion() {
        let page = content(serde_json::json!({
            "id": "300",
            "type": "page",
            "title": "Install",
            "space": {"key": "DOCS", "name": "Documentation"},
            "ancestors": [
                {"id": "100", "title": "Home"},
                {"id": "200", "title": "Getting Started"}
            ]
        }));

        let info = PageInfo::try_from(page).unwrap();
        assert_eq!(info.id, 300);
        assert_eq!(info.space_key, "DOCS");
        assert_eq!(
            info.ancestors,
            vec![PageRef::new(100, "Home"), PageRef::new(200, "Getting Started")]
        );
    }

    #[test]
    fn test_attachment_conversion() {
        let att = content(serde_json::json!({
            "id": "att111",
            "type": "attachment",
            "title": "manual.pdf",
            "version": {
                "number": 2,
                "by": {"accountId": "abc", "displayName": "Jane Doe"},
                "when": "2024-01-15T10:30:00.000Z",
                "friendlyWhen": "Jan 15, 2024"
            },
            "extensions": {
                "mediaType": "application/pdf",
                "fileSize": 2048,
                "comment": "v2",
                "fileId": "f-111",
                "collectionName": "contentId-200"
            },
            "_links": {"download": "/download/attachments/200/manual.pdf?version=2"}
        }));

        let attachment = Attachment::try_from(att).unwrap();
        assert_eq!(attachment.id, "111");
        assert_eq!(attachment.file_id, "f-111");
        assert_eq!(attachment.media_type, "application/pdf");
        assert_eq!(attachment.file_size, 2048);
        assert_eq!(attachment.collection_name, "contentId-200");
        assert_eq!(
            attachment.download_link,
            "/download/attachments/200/manual.pdf?version=2"
        );
        let version = attachment.version.unwrap();
        assert_eq!(version.number, 2);
        assert_eq!(version.by.display_name, "Jane Doe");
        assert_eq!(version.friendly_when, "Jan 15, 2024");
    }

    #[test]
    fn test_attachment_falls_back_to_metadata() {
        let att = content(serde_json::json!({
            "id": "att5",
            "title": "old.bin",
            "metadata": {"mediaType": "image/png", "comment": "server"},
            "version": {"number": 1, "when": "not a date"}
        }));

        let attachment = Attachment::try_from(att).unwrap();
        assert_eq!(attachment.media_type, "image/png");
        assert_eq!(attachment.comment, "server");
        assert_eq!(attachment.file_id, "");
        assert!(attachment.download_link.is_empty());
        assert!(attachment.version.is_none());
    }
}
