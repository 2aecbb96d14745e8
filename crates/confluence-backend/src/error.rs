use export_core::ExportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfluenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid content id '{0}'")]
    InvalidId(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ConfluenceError>;

impl From<ConfluenceError> for ExportError {
    fn from(err: ConfluenceError) -> Self {
        match err {
            ConfluenceError::Http(e) => ExportError::Http(e.to_string()),
            ConfluenceError::Parse(e) => ExportError::Parse(e.to_string()),
            ConfluenceError::Io(e) => ExportError::Io(e.to_string()),
            ConfluenceError::NotFound(what) => ExportError::NotFound(what),
            ConfluenceError::InvalidId(id) => ExportError::Parse(format!("invalid content id '{}'", id)),
            ConfluenceError::Unauthorized => ExportError::Unauthorized,
            ConfluenceError::Api { status, message } => ExportError::Api { status, message },
        }
    }
}
