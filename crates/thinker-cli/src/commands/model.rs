//! /model command - list and switch models

use super::CommandResult;
use thinker_ai::models::{self, ModelInfo};

pub struct ModelCommand;

impl ModelCommand {
    /// Execute /model command - lists models if no args, or switches to matching model
    pub fn execute(args: &str, current_model: &str) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message(list_models(current_model, models::get_all_models()));
        }

        match models::find_model(args) {
            Some(model) => CommandResult::ChangeModel(model.id.to_string()),
            None => CommandResult::Message(format!(
                "No model found matching '{}'\nUse /model to list available models",
                args
            )),
        }
    }
}

fn list_models(current: &str, models: &[ModelInfo]) -> String {
    let mut output = String::from("Available models:\n\n");

    for model in models {
        let marker = if model.id == current { " *" } else { "" };
        output.push_str(&format!("  {:<12} {}{}\n", model.id, model.name, marker));
    }

    output.push_str("\nSwitch with: /model <name>");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_marks_current() {
        match ModelCommand::execute("", "grok-4") {
            CommandResult::Message(text) => {
                assert!(text.contains("grok-4       Grok-4 (New) *"));
                assert!(!text.contains("Grok 3 (Standard) *"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_switch_by_partial_name() {
        assert_eq!(
            ModelCommand::execute("mini", "grok-3"),
            CommandResult::ChangeModel("grok-3-mini".into())
        );
        assert!(matches!(
            ModelCommand::execute("gpt-4o", "grok-3"),
            CommandResult::Message(_)
        ));
    }
}
