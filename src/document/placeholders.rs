//! `[placeholder]` extraction and variable-name normalization.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Longest token treated as a placeholder.
const MAX_PLACEHOLDER_LEN: usize = 64;

/// A `[token]` occurrence inside prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    /// Token text between the brackets, trimmed.
    pub name: String,
    /// Normalized matching key, see [`normalize_key`].
    pub key: String,
    /// 1-based file line.
    pub line: usize,
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\[\]\n]+)\]").expect("valid regex"))
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_\-]+").expect("valid regex"))
}

/// Normalizes a variable name for matching.
///
/// Strips surrounding backticks and brackets, lowercases, and collapses runs
/// of whitespace, `_` and `-` into a single `_`.
pub fn normalize_key(name: &str) -> String {
    let mut s = name.trim();
    loop {
        let stripped = s
            .trim_matches('`')
            .trim()
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .map(str::trim);
        match stripped {
            Some(inner) => s = inner,
            None => break,
        }
    }
    let s = s.trim_matches('`').trim().to_lowercase();
    separator_re().replace_all(&s, "_").trim_matches('_').to_string()
}

/// Returns true if a bracketed token looks like a fill-in placeholder.
fn is_placeholder_token(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() || token.chars().count() > MAX_PLACEHOLDER_LEN {
        return false;
    }
    // Footnotes, citations, ellipses.
    if token.starts_with('^') {
        return false;
    }
    if !token.chars().any(char::is_alphabetic) {
        return false;
    }
    // JSON arrays and template syntax.
    !token.contains(['"', '`', '{', '}'])
}

/// Returns true if `prefix` is a list item marker (`-`, `*`, `+`, `1.`, `1)`).
fn is_list_marker(prefix: &str) -> bool {
    let prefix = prefix.trim();
    match prefix {
        "-" | "*" | "+" => true,
        _ => prefix
            .strip_suffix(['.', ')'])
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
    }
}

/// Finds placeholders in `text`, whose first line is file line `first_line`.
///
/// Markdown links (`[text](url)`, `[text][ref]`) are skipped.
pub fn find_placeholders(text: &str, first_line: usize) -> Vec<Placeholder> {
    let mut found = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        for caps in bracket_re().captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            let next = line[whole.end()..].chars().next();
            let prev = line[..whole.start()].chars().next_back();
            if matches!(next, Some('(') | Some('[')) || matches!(prev, Some(']') | Some('!')) {
                continue;
            }
            let token = caps[1].trim();
            let is_checkbox =
                token.eq_ignore_ascii_case("x") && is_list_marker(&line[..whole.start()]);
            if is_checkbox || !is_placeholder_token(token) {
                continue;
            }
            found.push(Placeholder {
                name: token.to_string(),
                key: normalize_key(token),
                line: first_line + idx,
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        find_placeholders(text, 1)
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn test_basic_placeholders() {
        assert_eq!(
            names("Assess [initiative] for [target audience]."),
            vec!["initiative", "target audience"]
        );
    }

    #[test]
    fn test_skips_links_checkboxes_and_citations() {
        let text = "See [docs](./a.md) and [ref][1].\n- [ ] todo\n- [x] done\nSource [1] ![img](p.png)";
        assert!(names(text).is_empty());
    }

    #[test]
    fn test_single_letter_placeholders_outside_checkboxes() {
        assert_eq!(names("Compare [X] and [Y]."), vec!["X", "Y"]);
        assert_eq!(names("[x] marks the spot"), vec!["x"]);
        assert!(names("* [X] shipped\n2. [x] reviewed").is_empty());
    }

    #[test]
    fn test_skips_json_and_ellipsis() {
        assert!(names(r#"tags: ["a", "b"] and [...] and [{{name}}]"#).is_empty());
    }

    #[test]
    fn test_line_numbers() {
        let found = find_placeholders("first\nuse [topic]\n", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 11);
        assert_eq!(found[0].key, "topic");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("`[Target Audience]`"), "target_audience");
        assert_eq!(normalize_key("target-audience"), "target_audience");
        assert_eq!(normalize_key(" [ target_audience ] "), "target_audience");
        assert_eq!(normalize_key("TOPIC"), "topic");
    }

    #[test]
    fn test_overlong_token_is_prose() {
        let long = format!("[{}]", "a".repeat(65));
        assert!(names(&long).is_empty());
    }
}
