//! All error types for the txformats crate.
//!
//! These are returned from all fallible operations (binding content, parsing,
//! compiling, storage access, etc.).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),

    #[error("content error: {0}")]
    Content(String),

    #[error("{format} parse error: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("{format} compile error: {reason}")]
    Compile { format: &'static str, reason: String },

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("post-save hook failed: {0}")]
    PostSaveHook(String),

    #[error("handler state error: {0}")]
    State(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("no file extensions registered for method `{0}`")]
    NoExtensions(String),
}

impl Error {
    /// Creates a new parse error for the given format method.
    pub fn parse_error(format: &'static str, reason: impl Into<String>) -> Self {
        Error::Parse {
            format,
            reason: reason.into(),
        }
    }

    /// Creates a new compile error for the given format method.
    pub fn compile_error(format: &'static str, reason: impl Into<String>) -> Self {
        Error::Compile {
            format,
            reason: reason.into(),
        }
    }

    /// Creates a new content error.
    pub fn content_error(message: impl Into<String>) -> Self {
        Error::Content(message.into())
    }

    /// Creates a new storage error.
    pub fn storage_error(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// Creates a new handler state error (precondition not met).
    pub fn state_error(message: impl Into<String>) -> Self {
        Error::State(message.into())
    }
}
