//! Completion provider error types.

use thiserror::Error;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures that prevent a provider response from being read at all.
///
/// Answers that arrive but carry an error object are not errors at this level;
/// they decode to [`super::CompletionOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a readable response (DNS, TLS, timeout, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The HTTP client could not be constructed.
    #[error("building HTTP client: {0}")]
    Client(String),
}
