//! Error types for the claimex-core library.

use thiserror::Error;

/// Main error type for the claimex library.
#[derive(Error, Debug)]
pub enum ClaimexError {
    /// No template is registered or supplied for the document type.
    #[error("no extraction template for document type '{0}'")]
    TemplateNotFound(String),

    /// A template failed structural checks at registration.
    #[error("invalid template for '{document_type}': {reason}")]
    InvalidTemplate {
        document_type: String,
        reason: String,
    },

    /// Field-level extraction error.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// Post-processing error.
    #[error("post-processing error: {0}")]
    PostProcess(#[from] PostProcessError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while extracting a single field.
///
/// These never abort a document; the orchestrator records them as
/// medium-severity extraction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The matched text could not be converted to the field's semantic type.
    #[error("cannot convert '{value}' to {target}")]
    Conversion { value: String, target: String },

    /// A pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors raised by post-processing handlers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostProcessError {
    /// No handler is registered for the action.
    #[error("no handler registered for action '{0}'")]
    MissingHandler(String),

    /// The handler does not accept this kind of value.
    #[error("{action} cannot process {found} value")]
    UnsupportedValue { action: String, found: String },

    /// A rule parameter is missing or malformed.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Result type for the claimex library.
pub type Result<T> = std::result::Result<T, ClaimexError>;
