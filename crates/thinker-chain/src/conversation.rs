//! Conversation state: history, selected model, wit toggle, anti-forgery token.

use serde::{Deserialize, Serialize};
use thinker_ai::{Message, models::DEFAULT_MODEL};

use crate::error::{Error, Result};

/// System prompt of a brand new conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert coder. Please interpret code snippets accurately and provide detailed responses.";

/// Used only if a history somehow lacks its leading system message.
const FALLBACK_SYSTEM_PROMPT: &str = "Default system prompt.";

/// Everything persisted for one session.
///
/// `chat_history[0]` is always a system message. History only grows, except
/// for [`clear_history`](Self::clear_history) and
/// [`replace_system_prompt`](Self::replace_system_prompt), which reset it to
/// a single system message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StateRecord")]
pub struct ConversationState {
    chat_history: Vec<Message>,
    /// Model id sent with every turn
    pub selected_model: String,
    /// Whether every turn carries the wit instruction
    pub max_wit: bool,
    csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    carried_prompt: Option<String>,
}

/// On-disk shape, accepted leniently and repaired into a valid state.
#[derive(Deserialize)]
struct StateRecord {
    #[serde(default)]
    chat_history: Vec<Message>,
    #[serde(default)]
    selected_model: String,
    #[serde(default)]
    max_wit: bool,
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    carried_prompt: Option<String>,
}

impl From<StateRecord> for ConversationState {
    fn from(record: StateRecord) -> Self {
        let mut chat_history = record.chat_history;
        if !chat_history.first().is_some_and(Message::is_system) {
            tracing::warn!("stored history lacks a leading system message, restoring default");
            chat_history.insert(0, Message::system(DEFAULT_SYSTEM_PROMPT));
        }
        let selected_model = if record.selected_model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            record.selected_model
        };
        Self {
            chat_history,
            selected_model,
            max_wit: record.max_wit,
            csrf_token: record.csrf_token,
            carried_prompt: record.carried_prompt,
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_MODEL)
    }
}

impl ConversationState {
    /// Create a fresh state. The token is empty until a store rotates it.
    pub fn new(system_prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            chat_history: vec![Message::system(system_prompt)],
            selected_model: model.into(),
            max_wit: false,
            csrf_token: String::new(),
            carried_prompt: None,
        }
    }

    /// Get all messages
    pub fn history(&self) -> &[Message] {
        &self.chat_history
    }

    /// The stored system prompt (first history message)
    pub fn system_prompt(&self) -> &str {
        self.chat_history
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or(FALLBACK_SYSTEM_PROMPT)
    }

    /// Final prompt of the previous chain, if one was carried over
    pub fn carried_prompt(&self) -> Option<&str> {
        self.carried_prompt.as_deref()
    }

    /// Prompt the next chain starts from: the carried prompt if present,
    /// otherwise the stored system prompt.
    pub fn seed_prompt(&self) -> &str {
        self.carried_prompt().unwrap_or_else(|| self.system_prompt())
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Install a new anti-forgery token, returning the old one
    pub fn replace_token(&mut self, token: impl Into<String>) -> String {
        std::mem::replace(&mut self.csrf_token, token.into())
    }

    /// Reset history to just the current system prompt
    pub fn clear_history(&mut self) {
        let prompt = self.system_prompt().to_string();
        self.chat_history = vec![Message::system(prompt)];
        self.carried_prompt = None;
    }

    /// Reset history to a single new system prompt
    pub fn replace_system_prompt(&mut self, prompt: &str) -> Result<()> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::EmptySystemPrompt);
        }
        self.chat_history = vec![Message::system(prompt)];
        self.carried_prompt = None;
        Ok(())
    }

    /// Switch the model used for future turns
    pub fn select_model(&mut self, model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(Error::EmptyModel);
        }
        self.selected_model = model.to_string();
        self.carried_prompt = None;
        Ok(())
    }

    pub fn set_max_wit(&mut self, enabled: bool) {
        self.max_wit = enabled;
    }

    /// Flip the wit toggle, returning the new value
    pub fn toggle_wit(&mut self) -> bool {
        self.max_wit = !self.max_wit;
        self.max_wit
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.chat_history.push(message);
    }

    pub(crate) fn carry_prompt(&mut self, prompt: String) {
        self.carried_prompt = Some(prompt);
    }
}
