//! Title casing for BibTeX title fields.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Words kept lower-case unless they open or close the title.
const SMALL_WORDS: [&str; 21] = [
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "of", "on", "or", "the",
    "to", "v", "v.", "vs", "vs.", "via",
];

/// Title-case a string, leaving protected text alone.
///
/// Whitespace (including newlines) collapses to single spaces. Three kinds of
/// token pass through verbatim: LaTeX macro invocations (`\ce{LiMn2O4}`),
/// brace-protected groups (`{RuO2}` and multi-word `{...}` spans), and
/// all-caps acronyms. Small words stay lower-case in the middle of a title.
/// Applying the function to its own output changes nothing.
pub fn titlecase(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    let tokens = tokenize(&collapsed);
    let last = tokens.len().saturating_sub(1);

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            if token.starts_with('\\') || token.contains('{') || is_all_caps(token) {
                token.to_string()
            } else if i != 0 && i != last && SMALL_WORDS.contains(&token.to_lowercase().as_str()) {
                token.to_lowercase()
            } else if token.chars().any(char::is_uppercase) {
                // Mixed-case words like "McDonald" keep their spelling.
                token.to_string()
            } else {
                capitalize(token)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on spaces, but never inside a brace group, so `{Carbon Dioxide}`
/// stays one token.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0u32;
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&text[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cases_ordinary_words_and_keeps_small_words_low() {
        assert_eq!(titlecase("I am not a title"), "I Am Not a Title");
    }

    #[test]
    fn macro_invocations_pass_through() {
        assert_eq!(
            titlecase("evaluation of primary particles of \\ce{LiMn2O4}"),
            "Evaluation of Primary Particles of \\ce{LiMn2O4}"
        );
    }

    #[test]
    fn newlines_collapse_to_spaces() {
        assert_eq!(
            titlecase("evaluation of primary\nparticles of \\ce{LiMn2O4}"),
            "Evaluation of Primary Particles of \\ce{LiMn2O4}"
        );
    }

    #[test]
    fn brace_groups_are_protected() {
        assert_eq!(
            titlecase("the role of {RuO2} in {Carbon Dioxide} capture"),
            "The Role of {RuO2} in {Carbon Dioxide} Capture"
        );
    }

    #[test]
    fn acronyms_are_untouched() {
        assert_eq!(titlecase("NMR studies of water"), "NMR Studies of Water");
    }

    #[test]
    fn casing_is_idempotent() {
        let once = titlecase("evaluation of primary particles of \\ce{LiMn2O4}");
        assert_eq!(titlecase(&once), once);
    }

    #[test]
    fn first_and_last_small_words_are_capitalized() {
        assert_eq!(titlecase("the things we carry on"), "The Things We Carry On");
    }
}
