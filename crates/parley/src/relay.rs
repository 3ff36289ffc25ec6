//! Relay service: turns one user message into a persisted exchange.
//!
//! Pipeline: validate → store user turn → ask provider → store assistant turn.
//! Provider failures never fail a submit; they are converted into assistant
//! text so the conversation log keeps working while the provider is down.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::StorageError;
use crate::history::{HistoryStore, Message, MessageRole};
use crate::provider::{CompletionOutcome, CompletionProvider, ProviderConfig};

/// Reply stored when no provider key is configured.
pub const PLACEHOLDER_REPLY: &str = "⚠️ Please add your Groq API key (set GROQ_API_KEY or provider.api_key in the config file). Get it FREE from: https://console.groq.com/keys";

/// Reply stored when the provider answers with something we cannot read.
pub const MALFORMED_REPLY: &str =
    "I received an unexpected response from the AI. Please try again.";

/// Errors surfaced by [`RelayService::submit`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// Caller input failed a precondition. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The history store failed. Earlier writes of the same submit are kept.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Both records written by one submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub user_message: Message,
    pub ai_message: Message,
}

/// Orchestrates a single user turn end to end.
pub struct RelayService {
    store: Arc<dyn HistoryStore>,
    provider: Arc<dyn CompletionProvider>,
    config: ProviderConfig,
}

impl RelayService {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        provider: Arc<dyn CompletionProvider>,
        config: ProviderConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Persist `message`, obtain a reply, persist the reply, return both.
    pub async fn submit(&self, message: &str) -> Result<Exchange, RelayError> {
        if message.trim().is_empty() {
            return Err(RelayError::Validation("Message cannot be empty".to_string()));
        }

        let user_message = self.store.append(MessageRole::User, message).await?;
        debug!(id = user_message.id, "stored user message");

        let reply = self.resolve_reply(message).await;

        let ai_message = self.store.append(MessageRole::Assistant, &reply).await?;
        debug!(id = ai_message.id, "stored assistant message");

        Ok(Exchange {
            user_message,
            ai_message,
        })
    }

    /// Obtain reply text. Never fails.
    async fn resolve_reply(&self, message: &str) -> String {
        let ProviderConfig::Configured { ref api_key } = self.config else {
            info!("no provider key configured, storing placeholder reply");
            return PLACEHOLDER_REPLY.to_string();
        };

        match self.provider.complete(api_key, message).await {
            Ok(CompletionOutcome::Success(text)) => text,
            Ok(CompletionOutcome::Rejected(error)) => {
                format!("API Error: {error}. Please check your API key.")
            }
            Ok(CompletionOutcome::Malformed) => MALFORMED_REPLY.to_string(),
            Err(e) => {
                warn!(error = %e, "completion provider request failed");
                format!("Error connecting to AI: {e}")
            }
        }
    }
}
