//! Confluence REST API v1 client

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use tracing::debug;
use ureq::Agent;

use crate::error::{ConfluenceError, Result};
use crate::models::*;

/// Results requested per listing call
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Per-request timeout, covering the whole body download
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest attachment body that will be read into memory
pub const MAX_DOWNLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// Confluence REST API client
///
/// Works against Cloud (`https://{domain}/wiki`, email + API token) and
/// Server / Data Center (base URL of the instance, personal access token).
/// The base URL is used as given, so Cloud users must include `/wiki`.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
    page_size: usize,
}

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

impl ConfluenceClient {
    /// Create a new Confluence client
    ///
    /// With a username the token is sent as Basic auth (Cloud API tokens);
    /// without one it is sent as a Bearer token (Server personal access tokens).
    pub fn new(base_url: &str, username: Option<&str>, token: &str) -> Self {
        let auth_header = match username.filter(|u| !u.is_empty()) {
            Some(user) => format!("Basic {}", STANDARD.encode(format!("{}:{}", user, token))),
            None => format!("Bearer {}", token),
        };

        Self {
            agent: build_agent(DEFAULT_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api{}", self.base_url, path)
    }

    /// Check response status and return error if not successful
    fn check_response(
        &self,
        mut response: ureq::http::Response<ureq::Body>,
        url: &str,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        let status = response.status().as_u16();

        if (200..300).contains(&status) {
            return Ok(response);
        }

        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());

        // Confluence error format: {"statusCode": 404, "message": "..."}
        let message = if let Ok(error_response) = serde_json::from_str::<serde_json::Value>(&body) {
            let mut messages = Vec::new();

            if let Some(msg) = error_response.get("message").and_then(|m| m.as_str()) {
                messages.push(msg.to_string());
            }

            if let Some(errors) = error_response.get("errors").and_then(|e| e.as_array()) {
                for e in errors {
                    if let Some(msg) = e.get("message").and_then(|m| m.as_str()) {
                        messages.push(msg.to_string());
                    }
                }
            }

            if messages.is_empty() {
                body
            } else {
                messages.join("; ")
            }
        } else if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        };

        debug!(status, url, %message, "request failed");

        match status {
            401 => Err(ConfluenceError::Unauthorized),
            404 => Err(ConfluenceError::NotFound(url.to_string())),
            _ => Err(ConfluenceError::Api { status, message }),
        }
    }

    fn get(&self, url: &str, accept: &str) -> Result<ureq::http::Response<ureq::Body>> {
        debug!(url, "GET");
        let response = self
            .agent
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", accept)
            .call()
            .map_err(ConfluenceError::from)?;

        self.check_response(response, url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut response = self.get(url, "application/json")?;
        let value: T = response.body_mut().read_json()?;
        Ok(value)
    }

    // ==================== Space Operations ====================

    /// Get a space with its description and homepage expanded
    pub fn fetch_space(&self, key: &str) -> Result<ConfluenceSpace> {
        let url = format!(
            "{}?expand=description.plain,homepage",
            self.api_url(&format!("/space/{}", urlencoding::encode(key)))
        );
        self.get_json(&url)
    }

    // ==================== Page Operations ====================

    /// Get a page with its space and ancestor chain
    pub fn fetch_content(&self, id: u64) -> Result<ConfluenceContent> {
        let url = format!(
            "{}?expand=ancestors,space",
            self.api_url(&format!("/content/{}", id))
        );
        self.get_json(&url)
    }

    /// Get a page with its rendered (view) body
    pub fn fetch_page_body(&self, id: u64) -> Result<ConfluenceContent> {
        let url = format!(
            "{}?expand=body.view",
            self.api_url(&format!("/content/{}", id))
        );
        self.get_json(&url)
    }

    /// List direct child pages, one page of results
    pub fn fetch_child_pages(
        &self,
        id: u64,
        start: usize,
        limit: usize,
    ) -> Result<ConfluenceContentList> {
        let url = format!(
            "{}?start={}&limit={}",
            self.api_url(&format!("/content/{}/child/page", id)),
            start,
            limit
        );
        self.get_json(&url)
    }

    /// List labels of a content item, one page of results
    pub fn fetch_labels(&self, id: u64, start: usize, limit: usize) -> Result<ConfluenceLabelList> {
        let url = format!(
            "{}?start={}&limit={}",
            self.api_url(&format!("/content/{}/label", id)),
            start,
            limit
        );
        self.get_json(&url)
    }

    // ==================== Attachment Operations ====================

    /// List attachments of a page with version info, one page of results
    pub fn fetch_attachments(
        &self,
        page_id: u64,
        start: usize,
        limit: usize,
    ) -> Result<ConfluenceContentList> {
        let url = format!(
            "{}?start={}&limit={}&expand=version",
            self.api_url(&format!("/content/{}/child/attachment", page_id)),
            start,
            limit
        );
        self.get_json(&url)
    }

    /// Download a file from a `_links.download` link
    ///
    /// Relative links are resolved against the base URL.
    pub fn download(&self, link: &str) -> Result<Vec<u8>> {
        let url = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.base_url, link.trim_start_matches('/'))
        };

        let mut response = self.get(&url, "*/*")?;
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_DOWNLOAD_BYTES)
            .read_to_vec()?;
        debug!(url, bytes = bytes.len(), "downloaded");
        Ok(bytes)
    }
}
