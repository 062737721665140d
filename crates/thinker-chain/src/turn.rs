//! Per-turn request assembly: the meta-instruction and the message set.

use thinker_ai::Message;

/// Template appended to every turn. Placeholders are filled once per turn by
/// [`TurnContext::meta_instruction`].
pub const META_TEMPLATE: &str = "You are in a multi-turn reasoning chain powered by xAI Grok. \
Current turn: {TURN_NUM} of {TOTAL_TURNS}. \
Original query: \"{ORIGINAL_QUERY}\". \
Previous response (if any): \"{PREV_RESPONSE}\". \
Reason step-by-step about the query. \
At the end of your response, include a <system> tag with refined instructions for the next turn \
(e.g., to deepen analysis or correct errors). \
Example: <system>Focus on edge cases in the next reasoning step.</system>. \
Make the next instructions meta-aware and self-improving.";

/// Tone instruction added to every call while the wit toggle is on.
pub const WIT_INSTRUCTION: &str = "Respond with maximum wit and humor, like Grok from xAI.";

/// Everything needed to build one turn's request. Rebuilt every turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub turn_number: u32,
    pub total_turns: u32,
    /// The query as submitted; identical on every turn
    pub original_query: &'a str,
    /// Raw text of the previous turn, empty on turn 1
    pub previous_response: &'a str,
    pub current_system_prompt: &'a str,
}

impl TurnContext<'_> {
    /// Render [`META_TEMPLATE`] for this turn.
    ///
    /// Substitution is single-pass: placeholder-looking text inside the query
    /// or previous response is copied verbatim, never expanded.
    pub fn meta_instruction(&self) -> String {
        let mut out = String::with_capacity(
            META_TEMPLATE.len() + self.original_query.len() + self.previous_response.len(),
        );
        let mut rest = META_TEMPLATE;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            let end = tail.find('}');
            let value = end.and_then(|end| match &tail[1..end] {
                "TURN_NUM" => Some(self.turn_number.to_string()),
                "TOTAL_TURNS" => Some(self.total_turns.to_string()),
                "ORIGINAL_QUERY" => Some(self.original_query.to_string()),
                "PREV_RESPONSE" => Some(self.previous_response.to_string()),
                _ => None,
            });

            match (end, value) {
                (Some(end), Some(value)) => {
                    out.push_str(&value);
                    rest = &tail[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Message set for this turn, in fixed order: current system prompt,
    /// user query, meta-instruction, then the wit instruction if enabled.
    pub fn messages(&self, wit_enabled: bool) -> Vec<Message> {
        let mut messages = vec![
            Message::system(self.current_system_prompt),
            Message::user(self.original_query),
            Message::system(self.meta_instruction()),
        ];
        if wit_enabled {
            messages.push(Message::system(WIT_INSTRUCTION));
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinker_ai::Role;

    fn ctx<'a>(turn: u32, total: u32, query: &'a str, prev: &'a str) -> TurnContext<'a> {
        TurnContext {
            turn_number: turn,
            total_turns: total,
            original_query: query,
            previous_response: prev,
            current_system_prompt: "sys",
        }
    }

    #[test]
    fn test_meta_fills_all_placeholders() {
        let meta = ctx(2, 3, "Explain recursion", "turn one text").meta_instruction();
        assert!(meta.contains("Current turn: 2 of 3."));
        assert!(meta.contains("Original query: \"Explain recursion\"."));
        assert!(meta.contains("Previous response (if any): \"turn one text\"."));
        assert!(!meta.contains("{TURN_NUM}"));
        assert!(!meta.contains("{PREV_RESPONSE}"));
    }

    #[test]
    fn test_meta_first_turn_has_empty_previous() {
        let meta = ctx(1, 1, "q", "").meta_instruction();
        assert!(meta.contains("Previous response (if any): \"\"."));
    }

    #[test]
    fn test_meta_does_not_expand_placeholders_in_user_text() {
        let meta = ctx(1, 2, "what is {PREV_RESPONSE}?", "").meta_instruction();
        assert!(meta.contains("Original query: \"what is {PREV_RESPONSE}?\"."));
    }

    #[test]
    fn test_meta_names_the_provider() {
        let meta = ctx(1, 1, "q", "").meta_instruction();
        assert!(meta.starts_with("You are in a multi-turn reasoning chain powered by xAI Grok. Current turn: 1 of 1."));
    }

    #[test]
    fn test_meta_keeps_template_directive_example() {
        let meta = ctx(1, 1, "q", "").meta_instruction();
        assert!(meta.contains("<system>Focus on edge cases in the next reasoning step.</system>"));
    }

    #[test]
    fn test_messages_order_without_wit() {
        let messages = ctx(1, 1, "q", "").messages(false);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::System]);
        assert_eq!(messages[0].content, "sys");
        assert_eq!(messages[1].content, "q");
    }

    #[test]
    fn test_messages_wit_goes_last() {
        let messages = ctx(1, 1, "q", "").messages(true);
        assert_eq!(messages.len(), 4);
        assert!(messages[2].content.starts_with("You are in a multi-turn reasoning chain"));
        assert_eq!(messages[3], Message::system(WIT_INSTRUCTION));
    }
}
