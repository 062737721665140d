//! Completion provider implementations

pub mod openai;

use crate::{Error, Message, Result};
use async_trait::async_trait;

/// Trait for single-turn chat-completion providers
///
/// Implementors only supply [`try_complete`](Self::try_complete). Callers
/// that treat every failure alike use [`complete`](Self::complete), which
/// never errors: a non-200 status, transport error, malformed body or empty
/// text all come back as `None`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one request and return the assistant text
    async fn try_complete(&self, messages: &[Message], model: &str) -> Result<String>;

    /// Send one request, collapsing every failure to `None`
    async fn complete(&self, messages: &[Message], model: &str) -> Option<String> {
        match self.try_complete(messages, model).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!(model, "completion returned empty content");
                None
            }
            Err(e) if e.is_auth() => {
                tracing::error!(model, error = %e, "API key was refused by the provider");
                None
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(model, error = %e, "could not reach the provider");
                None
            }
            Err(e) => {
                tracing::warn!(model, error = %e, "completion failed");
                None
            }
        }
    }
}

/// Get an API key from a provided value or the environment
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(Error::InvalidApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(fn() -> Result<String>);

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn try_complete(&self, _messages: &[Message], _model: &str) -> Result<String> {
            (self.0)()
        }
    }

    #[tokio::test]
    async fn test_complete_passes_text_through() {
        let provider = Canned(|| Ok("answer".into()));
        assert_eq!(
            provider.complete(&[Message::user("q")], "m").await.as_deref(),
            Some("answer")
        );
    }

    #[tokio::test]
    async fn test_complete_collapses_errors_and_empty_text() {
        let failing = Canned(|| Err(Error::EmptyContent));
        assert!(failing.complete(&[], "m").await.is_none());

        let empty = Canned(|| Ok(String::new()));
        assert!(empty.complete(&[], "m").await.is_none());
    }

    #[tokio::test]
    async fn test_complete_collapses_refused_key() {
        let refused = Canned(|| Err(Error::status(401, "invalid api key")));
        assert!(refused.try_complete(&[], "m").await.unwrap_err().is_auth());
        assert!(refused.complete(&[], "m").await.is_none());
    }

    #[test]
    fn test_get_api_key_prefers_provided() {
        let key = get_api_key(Some("sk-test"), "THINKER_TEST_UNSET_VAR").unwrap();
        assert_eq!(key, "sk-test");
    }

    #[test]
    fn test_get_api_key_missing() {
        let err = get_api_key(Some("  "), "THINKER_TEST_UNSET_VAR").unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey));
    }
}
