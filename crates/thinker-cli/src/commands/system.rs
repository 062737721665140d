//! /system command - show or replace the system prompt

use super::CommandResult;
use thinker_chain::ConversationState;

pub struct SystemCommand;

impl SystemCommand {
    pub fn execute(args: &str, state: &ConversationState) -> CommandResult {
        if !args.is_empty() {
            return CommandResult::ReplaceSystemPrompt(args.to_string());
        }

        let mut output = format!("System prompt:\n  {}", state.system_prompt());
        if let Some(carried) = state.carried_prompt() {
            output.push_str(&format!("\n\nNext message starts from:\n  {}", carried));
        }
        CommandResult::Message(output)
    }
}
