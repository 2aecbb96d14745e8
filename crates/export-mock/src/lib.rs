//! Fixture-backed content source for cfexport
//!
//! Serves a space described by a `scenario.toml` file instead of talking to a
//! Confluence instance. Used by the CLI integration tests and for trying out
//! path templates without credentials.
//!
//! # Usage
//!
//! ```bash
//! CFEXPORT_MOCK_DIR=./fixtures/scenarios/basic-space cfexport space DOCS
//! ```
//!
//! # Scenario Structure
//!
//! ```text
//! scenarios/basic-space/
//! ├── scenario.toml      # Space, pages, labels and attachments
//! └── files/             # Attachment payloads referenced by `file = ...`
//! ```

mod scenario;
mod source;

pub use scenario::{AttachmentFixture, PageFixture, Scenario, ScenarioError, ScenarioMeta, SpaceFixture};
pub use source::{CallLogEntry, MockSource};

/// Environment variable to enable mock mode
pub const MOCK_DIR_ENV: &str = "CFEXPORT_MOCK_DIR";

/// Environment variable naming a JSONL file that receives every mock call
pub const MOCK_LOG_ENV: &str = "CFEXPORT_MOCK_LOG";

/// Get the mock directory from environment, if set
pub fn get_mock_dir() -> Option<std::path::PathBuf> {
    std::env::var(MOCK_DIR_ENV)
        .ok()
        .map(std::path::PathBuf::from)
}

/// Get the call log path from environment, if set
pub fn get_mock_log() -> Option<std::path::PathBuf> {
    std::env::var(MOCK_LOG_ENV)
        .ok()
        .map(std::path::PathBuf::from)
}
