//! /session command - show session info

use super::CommandResult;
use thinker_ai::Role;
use thinker_chain::ConversationState;

pub struct SessionCommand;

impl SessionCommand {
    pub fn execute(session_id: &str, state: &ConversationState, turns: u32) -> CommandResult {
        let history = state.history();
        let count = |role: Role| history.iter().filter(|m| m.role == role).count();

        let mut output = String::from("Session Info\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        output.push_str(&format!("Session:    {}\n", session_id));
        output.push_str(&format!("Model:      {}\n", state.selected_model));
        output.push_str(&format!("Turns:      {}\n", turns));
        output.push_str(&format!(
            "Wit:        {}\n",
            if state.max_wit { "on" } else { "off" }
        ));
        output.push('\n');

        output.push_str(&format!("Messages:   {} total\n", history.len()));
        output.push_str(&format!(
            "            {} user, {} assistant, {} system\n",
            count(Role::User),
            count(Role::Assistant),
            count(Role::System)
        ));

        CommandResult::Message(output)
    }
}
