//! Error taxonomy shared by readers, collectors, the cache and the dispatcher.

use thiserror::Error;

/// Errors produced while acquiring or normalizing guest metrics.
///
/// Every variant carries owned strings so a single result can be cloned out to
/// all callers coalesced on one cache acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestmonError {
    /// A declared raw field was absent from the source data.
    #[error("missing field '{field}' in {origin}")]
    MissingField { origin: String, field: String },

    /// The statistic source or external process could not be used
    /// (I/O failure, non-zero exit, timeout).
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Source output did not have the expected shape.
    #[error("malformed output: {0}")]
    MalformedOutput(String),

    /// Caller-supplied guest identifier or instance is missing or invalid.
    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// The source returned no records for the requested guest.
    #[error("not found: {0}")]
    NotFound(String),

    /// Agent configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GuestmonError {
    /// Short, stable name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::MalformedOutput(_) => "malformed_output",
            Self::InvalidContext(_) => "invalid_context",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for GuestmonError {
    fn from(e: std::io::Error) -> Self {
        Self::SourceUnavailable(e.to_string())
    }
}

pub type GuestmonResult<T> = Result<T, GuestmonError>;
