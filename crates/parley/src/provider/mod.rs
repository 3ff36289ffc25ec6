//! Completion provider integration.
//!
//! The relay talks to the provider through the [`CompletionProvider`] trait so
//! that tests can stub it. Whether a call is attempted at all is decided once
//! at startup by [`ProviderConfig::resolve`].

mod client;
mod error;
mod types;

use async_trait::async_trait;
use std::fmt;

pub use client::CompletionClient;
pub use error::{ProviderError, ProviderResult};
pub use types::{ChatTurn, CompletionOutcome, CompletionRequest, decode_completion};

/// Credential values shipped in sample configs that must never be sent upstream.
const PLACEHOLDER_KEYS: &[&str] = &["YOUR_API_KEY_HERE", "dummy_key_for_build"];

/// Minimal completion API abstraction for testability.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a reply for a single user message.
    ///
    /// Returns `Err` only when no response could be read; provider-side errors
    /// come back as [`CompletionOutcome::Rejected`].
    async fn complete(&self, api_key: &str, prompt: &str) -> ProviderResult<CompletionOutcome>;
}

/// Resolved provider credential.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    Configured { api_key: String },
    Unconfigured,
}

impl ProviderConfig {
    /// Resolve the configured key. Missing, blank, and placeholder keys are
    /// treated as unconfigured.
    pub fn resolve(api_key: Option<&str>) -> Self {
        match api_key.map(str::trim) {
            Some(key) if !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key) => Self::Configured {
                api_key: key.to_string(),
            },
            _ => Self::Unconfigured,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured { .. } => f
                .debug_struct("Configured")
                .field("api_key", &"<redacted>")
                .finish(),
            Self::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}
