//! Unified error types for the Uniseg core.
//!
//! Conversion and export failures are data errors raised to the caller;
//! the core never renders them for end users.

use thiserror::Error;

// =============================================================================
// Api Errors
// =============================================================================

/// Errors produced by a live bot connection.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot is not connected.
    #[error("bot is not connected")]
    NotConnected,
    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The platform API returned an error.
    #[error("API error ({retcode}): {message}")]
    ApiError { retcode: i64, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// The connection does not offer this operation.
    #[error("operation not supported by this bot")]
    NotSupported,
    /// Failed to hand a request to the transport.
    #[error("failed to send request: {0}")]
    SendFailed(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

// =============================================================================
// Template Errors
// =============================================================================

/// Errors raised while interpolating a [`Template`](crate::Template).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A placeholder referenced an argument that was not supplied.
    #[error("missing template argument '{0}'")]
    MissingArgument(String),
    /// A placeholder carried a type hint nobody registered.
    #[error("unknown template hint '{0}'")]
    UnknownHint(String),
    /// A `{` was opened but never closed.
    #[error("unclosed placeholder at offset {0}")]
    Unclosed(usize),
    /// A lone `}` appeared outside of a placeholder.
    #[error("unmatched '}}' at offset {0}")]
    UnmatchedBrace(usize),
    /// A hint could not convert the supplied argument.
    #[error("hint '{hint}' cannot format argument: {reason}")]
    BadArgument { hint: String, reason: String },
}

// =============================================================================
// Uniseg Errors
// =============================================================================

/// Errors raised by conversion, export, styling and addressing.
#[derive(Debug, Clone, Error)]
pub enum UnisegError {
    /// The builder produced no usable segments.
    #[error("message has no meaningful content")]
    NullMessage,

    /// A segment cannot be serialized for the target platform.
    #[error("cannot serialize {kind} segment for platform '{platform}': {reason}")]
    SerializeFailed {
        /// Platform being exported to.
        platform: String,
        /// Type tag of the offending segment.
        kind: String,
        /// Why the export failed.
        reason: String,
    },

    /// A style range lies outside its text or is empty.
    #[error("invalid style range [{start}, {end}) for text of length {len}")]
    InvalidRange {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Length of the styled text in characters.
        len: usize,
    },

    /// No live connection matches the target.
    #[error("no bot available for target {0}")]
    TargetNotFound(String),

    /// Template interpolation failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The bot connection reported an error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A native payload could not be (de)serialized.
    #[error("json error: {0}")]
    Json(String),
}

impl UnisegError {
    /// Creates a serialize failure for a segment kind on a platform.
    pub fn serialize_failed(
        platform: impl Into<String>,
        kind: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SerializeFailed {
            platform: platform.into(),
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Creates the "no exporter registered" failure.
    pub fn unsupported(platform: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::serialize_failed(platform, tag, "no exporter registered")
    }

    /// Returns true for data-validation failures on inbound messages.
    pub fn is_null_message(&self) -> bool {
        matches!(self, Self::NullMessage)
    }

    /// Returns true if this error is a serialize failure.
    pub fn is_serialize_failed(&self) -> bool {
        matches!(self, Self::SerializeFailed { .. })
    }
}

impl From<serde_json::Error> for UnisegError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for conversion and addressing operations.
pub type UnisegResult<T> = Result<T, UnisegError>;

/// Result type for bot API calls.
pub type ApiResult<T> = Result<T, ApiError>;
