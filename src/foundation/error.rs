/// Convenience result type used across filterbench.
pub type FilterResult<T> = Result<T, FilterError>;

/// Error taxonomy for the backend contract and the sessions driving it.
///
/// Every variant is terminal for the call that produced it. Backends never retry internally and
/// the preview scheduler never retries a failed execution; it only suppresses superseded work,
/// which is an outcome and not an error.
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    /// `apply` was called on a backend with no live `configure`.
    #[error("backend not configured")]
    NotConfigured,

    /// The native pipeline produced no usable output for this invocation.
    #[error("resource acquisition failure: {0}")]
    ResourceAcquisition(String),

    /// A lifecycle rule was violated (double configure, busy session, poisoned lock).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid caller-provided values (control range, slot index, configuration).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FilterError {
    /// Build a [`FilterError::ResourceAcquisition`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceAcquisition(msg.into())
    }

    /// Build a [`FilterError::InvalidState`] value.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build a [`FilterError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
