use thiserror::Error;

/// Common errors for content sources and the export pipeline
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Authentication failed")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid path template: {0}")]
    Template(String),

    #[error("Invalid content structure: {0}")]
    Structure(String),
}

impl ExportError {
    /// Whether the error came from talking to the remote API
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ExportError::Unauthorized
                | ExportError::NotFound(_)
                | ExportError::Api { .. }
                | ExportError::Http(_)
                | ExportError::Parse(_)
        )
    }

    /// Whether the error should stop a run before any network activity
    pub fn is_config(&self) -> bool {
        matches!(self, ExportError::Config(_) | ExportError::Template(_))
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
