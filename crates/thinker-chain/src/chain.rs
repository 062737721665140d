//! The turn orchestrator.
//!
//! A chain makes up to `total_turns` dependent provider calls. Each call's
//! system prompt is rewritten from the previous call's response (see
//! [`crate::directive`]), so turns run strictly one after another. The first
//! failed call ends the chain; nothing is retried.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thinker_ai::{CompletionProvider, Message};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    conversation::ConversationState,
    directive::{self, DirectivePolicy, DirectiveSource},
    error::{Error, Result},
    events::ChainEvent,
    handle::ChainHandle,
    turn::TurnContext,
};

/// Fewest turns a submission may request
pub const MIN_TURNS: u32 = 1;
/// Most turns a submission may request
pub const MAX_TURNS: u32 = 10;

/// Clamp a requested turn count into `[MIN_TURNS, MAX_TURNS]`.
pub fn clamp_turns(requested: i64) -> u32 {
    requested.clamp(MIN_TURNS as i64, MAX_TURNS as i64) as u32
}

/// Chain configuration
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Longest wait for a single provider call
    pub turn_timeout: Duration,
    /// Longest wait for the whole chain, measured from its start
    pub chain_deadline: Duration,
    /// How much a response may rewrite the next turn's instructions
    pub directive_policy: DirectivePolicy,
    /// Store the final prompt so the next submission starts from it
    pub resume_from_directive: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(120),
            chain_deadline: Duration::from_secs(600),
            directive_policy: DirectivePolicy::Trust,
            resume_from_directive: false,
        }
    }
}

/// Why a turn produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Provider returned no usable content
    NoContent,
    /// The call exceeded the per-turn timeout
    TimedOut,
    /// The chain ran past its overall deadline
    DeadlineExceeded,
    /// The run was aborted through its handle
    Cancelled,
}

/// The turn that ended a chain early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnFailure {
    pub turn: u32,
    pub reason: FailureReason,
}

impl fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = match self.reason {
            FailureReason::NoContent => {
                "Could not get a response from the model. Check API key or connection."
            }
            FailureReason::TimedOut => "The model did not respond in time.",
            FailureReason::DeadlineExceeded => "The reasoning chain ran out of time.",
            FailureReason::Cancelled => "Cancelled.",
        };
        write!(f, "Error in Turn {}: {}", self.turn, detail)
    }
}

/// Result of one chain run
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    /// One message per executed turn: assistant replies, then at most one
    /// system error message
    pub messages: Vec<Message>,
    /// System prompt computed by the last successful turn (the initial
    /// prompt if none succeeded)
    pub final_system_prompt: String,
    pub turns_completed: u32,
    pub failure: Option<TurnFailure>,
}

impl ChainOutcome {
    pub fn is_aborted(&self) -> bool {
        self.failure.is_some()
    }
}

type DirectiveFilter = Arc<dyn Fn(String) -> Option<String> + Send + Sync>;

/// Runs self-steering reasoning chains against one provider
pub struct Chain {
    config: ChainConfig,
    provider: Arc<dyn CompletionProvider>,
    event_tx: broadcast::Sender<ChainEvent>,
    handle: ChainHandle,
    directive_filter: Option<DirectiveFilter>,
}

impl Chain {
    /// Create a new chain
    pub fn new(config: ChainConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            provider,
            event_tx,
            handle: ChainHandle::new(),
            directive_filter: None,
        }
    }

    /// Subscribe to chain events
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.event_tx.subscribe()
    }

    /// Get the chain config
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Set the directive policy
    pub fn set_directive_policy(&mut self, policy: DirectivePolicy) {
        self.config.directive_policy = policy;
    }

    /// Set a hook that sees every candidate prompt before it is applied.
    /// Returning `None` keeps the current prompt for the next turn.
    pub fn set_directive_filter(
        &mut self,
        f: impl Fn(String) -> Option<String> + Send + Sync + 'static,
    ) {
        self.directive_filter = Some(Arc::new(f));
    }

    /// Remove the directive filter hook.
    pub fn clear_directive_filter(&mut self) {
        self.directive_filter = None;
    }

    /// Get a cloneable handle for aborting a run from outside.
    pub fn handle(&self) -> ChainHandle {
        self.handle.clone()
    }

    /// Validate a submission, run the chain, and record it in `state`.
    ///
    /// The user message is appended before the first call; each executed
    /// turn's message is appended after the run.
    pub async fn submit(
        &self,
        state: &mut ConversationState,
        query: &str,
        requested_turns: i64,
    ) -> Result<ChainOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let total_turns = clamp_turns(requested_turns);

        state.append(Message::user(query));
        let seed = state.seed_prompt().to_string();
        let model = state.selected_model.clone();

        let outcome = self
            .run(query, total_turns, &seed, state.max_wit, &model)
            .await;

        for message in &outcome.messages {
            state.append(message.clone());
        }
        if self.config.resume_from_directive {
            state.carry_prompt(outcome.final_system_prompt.clone());
        }
        Ok(outcome)
    }

    /// Run one chain of up to `total_turns` sequential calls.
    pub async fn run(
        &self,
        query: &str,
        total_turns: u32,
        initial_system_prompt: &str,
        wit_enabled: bool,
        model: &str,
    ) -> ChainOutcome {
        let total_turns = total_turns.clamp(MIN_TURNS, MAX_TURNS);
        let cancel = self.handle.begin();
        let deadline = Instant::now() + self.config.chain_deadline;

        tracing::info!(total_turns, model, wit_enabled, "starting reasoning chain");
        let _ = self.event_tx.send(ChainEvent::ChainStart { total_turns });

        let mut current_prompt = initial_system_prompt.to_string();
        let mut previous_response = String::new();
        let mut messages = Vec::with_capacity(total_turns as usize);
        let mut turns_completed = 0;
        let mut failure = None;

        for turn in 1..=total_turns {
            let request = TurnContext {
                turn_number: turn,
                total_turns,
                original_query: query,
                previous_response: &previous_response,
                current_system_prompt: &current_prompt,
            }
            .messages(wit_enabled);

            let _ = self.event_tx.send(ChainEvent::TurnStart {
                turn,
                system_prompt: current_prompt.clone(),
            });

            match self.call_provider(&request, model, deadline, &cancel).await {
                Ok(response) => {
                    messages.push(Message::assistant(format!("Turn {}: {}", turn, response)));
                    let _ = self.event_tx.send(ChainEvent::TurnEnd {
                        turn,
                        response: response.clone(),
                    });

                    let (next_prompt, source) = self.next_prompt(&response, &current_prompt);
                    tracing::debug!(turn, ?source, "next system prompt decided");
                    let _ = self.event_tx.send(ChainEvent::DirectiveApplied {
                        turn,
                        prompt: next_prompt.clone(),
                        source,
                    });

                    current_prompt = next_prompt;
                    previous_response = response;
                    turns_completed += 1;
                }
                Err(reason) => {
                    let turn_failure = TurnFailure { turn, reason };
                    tracing::warn!(turn, ?reason, "turn failed, aborting chain");
                    messages.push(Message::system(turn_failure.to_string()));
                    let _ = self.event_tx.send(ChainEvent::TurnFailed { turn, reason });
                    failure = Some(turn_failure);
                    break;
                }
            }
        }

        self.handle.finish();
        let _ = self.event_tx.send(ChainEvent::ChainEnd {
            turns_completed,
            aborted: failure.is_some(),
        });

        ChainOutcome {
            messages,
            final_system_prompt: current_prompt,
            turns_completed,
            failure,
        }
    }

    /// Await one provider call, bounded by the turn timeout, the chain
    /// deadline and cancellation.
    async fn call_provider(
        &self,
        request: &[Message],
        model: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, FailureReason> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(FailureReason::DeadlineExceeded);
        }
        let (budget, on_expiry) = if remaining < self.config.turn_timeout {
            (remaining, FailureReason::DeadlineExceeded)
        } else {
            (self.config.turn_timeout, FailureReason::TimedOut)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FailureReason::Cancelled),
            result = tokio::time::timeout(budget, self.provider.complete(request, model)) => {
                match result {
                    Ok(Some(text)) => Ok(text),
                    Ok(None) => Err(FailureReason::NoContent),
                    Err(_) => Err(on_expiry),
                }
            }
        }
    }

    /// Decide the next system prompt from a response.
    ///
    /// A candidate left blank by the filter or by truncation is treated as a
    /// veto: the current prompt is kept.
    fn next_prompt(&self, response: &str, current: &str) -> (String, DirectiveSource) {
        let kept = || (current.to_string(), DirectiveSource::Kept);

        if self.config.directive_policy == DirectivePolicy::Ignore {
            return kept();
        }

        let (candidate, mut source) = match directive::extract(response) {
            Some(found) => (found.to_string(), DirectiveSource::Extracted),
            None => (response.to_string(), DirectiveSource::Fallback),
        };

        let candidate = match &self.directive_filter {
            Some(filter) => match filter(candidate.clone()) {
                Some(filtered) => {
                    if filtered != candidate {
                        source = DirectiveSource::Filtered;
                    }
                    filtered
                }
                None => return kept(),
            },
            None => candidate,
        };

        let candidate = match self.config.directive_policy {
            DirectivePolicy::Truncate(max) => directive::truncate_chars(&candidate, max).to_string(),
            _ => candidate,
        };

        if candidate.trim().is_empty() {
            tracing::debug!("blank directive candidate, keeping current prompt");
            return kept();
        }
        (candidate, source)
    }
}
