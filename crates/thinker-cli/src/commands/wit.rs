//! /wit command - toggle the wit instruction

use super::CommandResult;

pub struct WitCommand;

impl WitCommand {
    pub fn execute(args: &str) -> CommandResult {
        match args.to_lowercase().as_str() {
            "" | "toggle" => CommandResult::SetWit(None),
            "on" | "true" | "1" | "yes" => CommandResult::SetWit(Some(true)),
            "off" | "false" | "0" | "no" => CommandResult::SetWit(Some(false)),
            _ => CommandResult::Message(format!("Unknown setting: '{}'\nUsage: /wit [on|off]", args)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(WitCommand::execute(""), CommandResult::SetWit(None));
        assert_eq!(WitCommand::execute("ON"), CommandResult::SetWit(Some(true)));
        assert_eq!(WitCommand::execute("off"), CommandResult::SetWit(Some(false)));
        assert!(matches!(WitCommand::execute("maybe"), CommandResult::Message(_)));
    }
}
