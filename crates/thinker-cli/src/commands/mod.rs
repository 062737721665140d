//! Slash commands for interactive mode

mod model;
mod session;
mod system;
mod wit;

pub use model::ModelCommand;
pub use session::SessionCommand;
pub use system::SystemCommand;
pub use wit::WitCommand;

use thinker_chain::{ConversationState, MAX_TURNS, MIN_TURNS, clamp_turns};

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Clear the conversation history
    Clear,
    /// Change the model
    ChangeModel(String),
    /// Replace the system prompt (and reset history)
    ReplaceSystemPrompt(String),
    /// Set the wit toggle, or flip it when `None`
    SetWit(Option<bool>),
    /// Set the turn count for following messages
    SetTurns(u32),
    /// Print the conversation history
    ShowHistory,
    /// Show a message to the user (not sent to the model)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(
    input: &str,
    state: &ConversationState,
    turns: u32,
    session_id: &str,
) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };
    let command = command.to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "model" | "m" => ModelCommand::execute(args, &state.selected_model),

        "system" | "sys" => SystemCommand::execute(args, state),

        "wit" | "w" => WitCommand::execute(args),

        "turns" | "n" => turns_command(args, turns),

        "history" => CommandResult::ShowHistory,

        "session" | "s" => SessionCommand::execute(session_id, state, turns),

        _ => CommandResult::Unknown(command),
    })
}

fn turns_command(args: &str, current: u32) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(format!(
            "Turns per message: {} (range {}-{})",
            current, MIN_TURNS, MAX_TURNS
        ));
    }
    match args.parse::<i64>() {
        Ok(n) => CommandResult::SetTurns(clamp_turns(n)),
        Err(_) => CommandResult::Message(format!(
            "Not a number: '{}'\nUsage: /turns <{}-{}>",
            args, MIN_TURNS, MAX_TURNS
        )),
    }
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /model, /m [name]      List models or switch to a model
  /system [prompt]       Show the system prompt, or replace it (clears history)
  /wit, /w [on|off]      Toggle the wit instruction
  /turns, /n [count]     Show or set reasoning turns per message (1-10)
  /history               Print the conversation history
  /session, /s           Show session info
  /clear, /c             Clear conversation history
  /quit, /exit, /q       Exit thinker

Examples:
  /model grok-4          Switch to Grok-4
  /turns 3               Let each message refine its own instructions three times
  /system You are terse. Start over with a new system prompt"#
        .to_string()
}
