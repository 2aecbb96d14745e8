//! Confluence v1 content API models for spaces, pages, labels and attachments

use serde::Deserialize;

// ============================================================================
// Space Models
// ============================================================================

/// Space as returned by `/rest/api/space/{key}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceSpace {
    pub id: Option<i64>,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub space_type: Option<String>,
    pub description: Option<ConfluenceSpaceDescription>,
    pub homepage: Option<ConfluenceContentRef>,
}

/// Expanded space description
#[derive(Debug, Deserialize)]
pub struct ConfluenceSpaceDescription {
    pub plain: Option<ConfluenceBodyValue>,
}

// ============================================================================
// Content Models
// ============================================================================

/// Page or attachment as returned by `/rest/api/content`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceContent {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub title: String,
    pub space: Option<ConfluenceSpace>,
    pub ancestors: Option<Vec<ConfluenceContentRef>>,
    pub body: Option<ConfluenceBody>,
    pub version: Option<ConfluenceVersion>,
    pub extensions: Option<ConfluenceAttachmentExtensions>,
    pub metadata: Option<ConfluenceAttachmentMetadata>,
    #[serde(rename = "_links")]
    pub links: Option<ConfluenceLinks>,
}

/// Minimal content reference used for ancestors and space homepages
#[derive(Debug, Deserialize)]
pub struct ConfluenceContentRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Page body representations
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceBody {
    pub view: Option<ConfluenceBodyValue>,
    pub export_view: Option<ConfluenceBodyValue>,
    pub storage: Option<ConfluenceBodyValue>,
}

#[derive(Debug, Deserialize)]
pub struct ConfluenceBodyValue {
    #[serde(default)]
    pub value: String,
    pub representation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceVersion {
    pub number: u32,
    pub by: Option<ConfluenceUser>,
    pub when: Option<String>,
    pub friendly_when: Option<String>,
    pub message: Option<String>,
    pub minor_edit: Option<bool>,
}

/// Author of a version; Cloud omits `username`, Server omits `accountId`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceUser {
    pub account_id: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub public_name: Option<String>,
    pub email: Option<String>,
}

/// Attachment-only fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceAttachmentExtensions {
    pub media_type: Option<String>,
    pub media_type_description: Option<String>,
    pub file_size: Option<u64>,
    pub comment: Option<String>,
    pub file_id: Option<String>,
    pub collection_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceAttachmentMetadata {
    pub media_type: Option<String>,
    pub comment: Option<String>,
}

/// HATEOAS links
#[derive(Debug, Deserialize)]
pub struct ConfluenceLinks {
    pub download: Option<String>,
    #[serde(rename = "webui")]
    pub web_ui: Option<String>,
    pub base: Option<String>,
}

// ============================================================================
// Collections
// ============================================================================

/// One page of a paged v1 listing
#[derive(Debug, Deserialize)]
pub struct ConfluencePagedList<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct ConfluenceLabel {
    pub id: Option<String>,
    pub prefix: Option<String>,
    pub name: String,
}

pub type ConfluenceContentList = ConfluencePagedList<ConfluenceContent>;
pub type ConfluenceLabelList = ConfluencePagedList<ConfluenceLabel>;
