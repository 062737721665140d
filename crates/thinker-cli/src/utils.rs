//! Shared utilities

use thinker_ai::Message;
use thinker_chain::DirectiveSource;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Format where the next system prompt came from, for display.
pub fn directive_source_str(source: DirectiveSource) -> &'static str {
    match source {
        DirectiveSource::Extracted => "from <system> block",
        DirectiveSource::Fallback => "whole response",
        DirectiveSource::Filtered => "rewritten by filter",
        DirectiveSource::Kept => "unchanged",
    }
}

/// Render a history as numbered `[role] text` lines, one message per line.
pub fn format_history(messages: &[Message], preview_chars: usize) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let preview = truncate_chars(&msg.content, preview_chars).replace('\n', " ");
            format!("  {}: [{}] {}", i, msg.role, preview)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
