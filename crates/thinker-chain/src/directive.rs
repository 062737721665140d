//! Directive extraction: finding the next-turn instruction in a response.
//!
//! A response may end with a block such as
//! `<system>Focus on edge cases next.</system>`. The inner text becomes the
//! system prompt of the following turn.

const OPEN_TAG: &str = "<system>";
const CLOSE_TAG: &str = "</system>";

/// Extract the first directive block from `text`.
///
/// Tags match ASCII case-insensitively, the inner content may span lines, and
/// the block ends at the first closing tag after the opening one. Returns
/// `None` when there is no complete block or when its trimmed content is
/// empty.
pub fn extract(text: &str) -> Option<&str> {
    let open = find_ignore_ascii_case(text, OPEN_TAG, 0)?;
    let inner_start = open + OPEN_TAG.len();
    let close = find_ignore_ascii_case(text, CLOSE_TAG, inner_start)?;

    let inner = text[inner_start..close].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Byte offset of the first ASCII case-insensitive match of `needle` at or
/// after `from`. `needle` must be ASCII, so every match starts on a char
/// boundary.
fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len())
        .find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// How far the chain lets a response rewrite the next turn's instructions.
///
/// Model output is trusted as-is under [`DirectivePolicy::Trust`]: whatever a
/// response puts in its directive block (or the whole response when there is
/// none) becomes the literal system prompt of the next call. This is prompt
/// injection by construction. The other variants constrain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectivePolicy {
    /// Apply directives (or the fallback response) unmodified
    #[default]
    Trust,
    /// Never rewrite; every turn uses the initial system prompt
    Ignore,
    /// Apply directives cut to at most this many characters
    Truncate(usize),
}

/// Where the next turn's system prompt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveSource {
    /// A directive block was found
    Extracted,
    /// No block; the full response was used
    Fallback,
    /// The directive filter rewrote the candidate
    Filtered,
    /// The current prompt was kept (policy, filter veto, or blank candidate)
    Kept,
}

/// Truncate a string to `max` characters on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_trims_inner_text() {
        assert_eq!(extract("...<system> X </system>..."), Some("X"));
    }

    #[test]
    fn test_extract_is_case_insensitive() {
        assert_eq!(extract("ok <SYSTEM>Go deeper</System>"), Some("Go deeper"));
        assert_eq!(extract("<sYsTeM>a</SYSTEM>"), Some("a"));
    }

    #[test]
    fn test_extract_spans_lines() {
        let text = "Reasoning...\n<system>\nLine one.\nLine two.\n</system>\n";
        assert_eq!(extract(text), Some("Line one.\nLine two."));
    }

    #[test]
    fn test_extract_is_non_greedy_and_takes_first() {
        let text = "<system>first</system> middle <system>second</system>";
        assert_eq!(extract(text), Some("first"));
    }

    #[test]
    fn test_extract_missing_or_unclosed() {
        assert_eq!(extract("no directive here"), None);
        assert_eq!(extract("<system>never closed"), None);
        assert_eq!(extract("</system> closed before <system>"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_extract_empty_block_is_none() {
        assert_eq!(extract("<system></system>"), None);
        assert_eq!(extract("<system>  \n\t </system>"), None);
    }

    #[test]
    fn test_extract_handles_multibyte_text() {
        let text = "Ünïcödé → <system>naïve café</system> ✓";
        assert_eq!(extract(text), Some("naïve café"));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "It's self-reference.<system>Give a concrete example.</system>";
        assert_eq!(extract(text), extract(text));
        assert_eq!(extract(text), Some("Give a concrete example."));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
