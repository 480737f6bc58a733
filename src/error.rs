use thiserror::Error;

/// Boxed cause carried by store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by author validation and persistence.
#[derive(Debug, Error)]
pub enum AuthorError {
    /// Malformed, empty or insecure field value.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Value exceeds a length or size bound.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// Underlying persistence failure, including constraint violations.
    #[error("store error: {0}")]
    Store(#[source] BoxError),
}

impl AuthorError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }
}

pub type Result<T, E = AuthorError> = std::result::Result<T, E>;
