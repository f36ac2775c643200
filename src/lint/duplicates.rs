//! Library-wide duplicate detection.
//!
//! Prompt blocks are fingerprinted with SHA-256 over their text with runs of
//! whitespace collapsed, so reindented or rewrapped copies still match.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use super::{DiagnosticSink, LibraryCheck, LintContext, RuleId};
use crate::document::PromptDocument;

/// Hex SHA-256 of `text` with whitespace runs collapsed to one space.
/// Returns `None` for blank text.
pub fn prompt_fingerprint(text: &str) -> Option<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }
    Some(hex::encode(Sha256::digest(normalized.as_bytes())))
}

struct Occurrence<'a> {
    path: &'a str,
    line: usize,
}

/// Flags prompt blocks whose text repeats another block.
pub struct DuplicatePromptCheck;

impl LibraryCheck for DuplicatePromptCheck {
    fn name(&self) -> &'static str {
        "duplicate-prompt"
    }

    fn check(&self, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let mut groups: BTreeMap<String, Vec<Occurrence<'_>>> = BTreeMap::new();
        for doc in ctx.library.iter() {
            for block in doc.prompt_blocks() {
                if let Some(fingerprint) = prompt_fingerprint(&block.content) {
                    groups.entry(fingerprint).or_default().push(Occurrence {
                        path: &doc.path,
                        line: block.line,
                    });
                }
            }
        }

        for occurrences in groups.values().filter(|g| g.len() > 1) {
            let canonical = &occurrences[0];
            for (idx, occurrence) in occurrences.iter().enumerate().skip(1) {
                let message = if occurrence.path != canonical.path {
                    format!(
                        "prompt block is identical to the one in {} (line {})",
                        canonical.path, canonical.line
                    )
                } else {
                    let earlier = occurrences[..idx]
                        .iter()
                        .rev()
                        .find(|o| o.path == occurrence.path)
                        .map_or(canonical.line, |o| o.line);
                    format!("prompt block repeats the one at line {}", earlier)
                };
                sink.emit(
                    RuleId::DuplicatePrompt,
                    occurrence.path.to_string(),
                    Some(occurrence.line),
                    message,
                );
            }
        }
    }
}

/// Lowercased title with whitespace collapsed.
fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Line where the document's title is declared.
fn title_line(doc: &PromptDocument) -> Option<usize> {
    let from_frontmatter = doc.frontmatter_block.as_ref().and_then(|block| {
        ["title", "name", "shortTitle"]
            .iter()
            .find_map(|key| block.line_of_key(key))
    });
    from_frontmatter.or_else(|| doc.body.titles().next().map(|h| h.line))
}

/// Flags documents sharing a title with an earlier document.
pub struct DuplicateTitleCheck;

impl LibraryCheck for DuplicateTitleCheck {
    fn name(&self) -> &'static str {
        "duplicate-title-across-files"
    }

    fn check(&self, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let mut groups: BTreeMap<String, Vec<&PromptDocument>> = BTreeMap::new();
        for doc in ctx.library.iter().filter(|d| !d.is_index_page()) {
            if let Some(title) = doc.title() {
                let key = title_key(&title);
                if !key.is_empty() {
                    groups.entry(key).or_default().push(doc);
                }
            }
        }

        for docs in groups.values().filter(|g| g.len() > 1) {
            let first = docs[0];
            for doc in &docs[1..] {
                sink.emit(
                    RuleId::DuplicateTitleAcrossFiles,
                    doc.path.clone(),
                    title_line(doc),
                    format!(
                        "title '{}' is also used by {}",
                        doc.title().unwrap_or_default(),
                        first.path
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LintConfig, RuleSettings};
    use crate::library::PromptLibrary;
    use crate::report::Diagnostic;

    fn prompt_doc(path: &str, title: &str, prompt: &str) -> PromptDocument {
        PromptDocument::parse(
            path,
            format!(
                "---\ntitle: {}\n---\n# {}\n\n## Prompt\n\n```\n{}\n```\n",
                title, title, prompt
            ),
        )
    }

    fn run(check: &dyn LibraryCheck, docs: Vec<PromptDocument>) -> Vec<Diagnostic> {
        let library = PromptLibrary::from_documents(".", docs, Vec::<String>::new());
        let config = LintConfig::default();
        let ctx = LintContext {
            config: &config,
            library: &library,
        };
        let settings = RuleSettings::default();
        let mut sink = DiagnosticSink::new(&settings);
        check.check(&ctx, &mut sink);
        sink.into_diagnostics()
    }

    #[test]
    fn test_fingerprint_ignores_whitespace() {
        let a = prompt_fingerprint("Summarize   [topic]\nin  detail.");
        let b = prompt_fingerprint("  Summarize [topic] in detail.\n");
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(a.map(|f| f.len()), Some(64));
        assert_eq!(prompt_fingerprint(" \n\t"), None);
    }

    #[test]
    fn test_duplicate_prompt_across_files() {
        let diags = run(
            &DuplicatePromptCheck,
            vec![
                prompt_doc("prompts/b/copy.md", "Copy", "Review [document]."),
                prompt_doc("prompts/a/original.md", "Original", "Review   [document]."),
                prompt_doc("prompts/a/other.md", "Other", "Something else."),
            ],
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].path, "prompts/b/copy.md");
        assert_eq!(diags[0].rule, RuleId::DuplicatePrompt);
        assert!(diags[0].message.contains("prompts/a/original.md"));
    }

    #[test]
    fn test_repeated_block_within_file() {
        let content = "## Prompt\n\n```\nSame.\n```\n\n## Prompt Variant\n\n```\nSame.\n```\n";
        let diags = run(
            &DuplicatePromptCheck,
            vec![PromptDocument::parse("prompts/a.md", content)],
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, Some(9));
        assert!(diags[0].message.contains("line 3"));
    }

    #[test]
    fn test_duplicate_titles() {
        let diags = run(
            &DuplicateTitleCheck,
            vec![
                prompt_doc("prompts/a/gap.md", "Gap Analysis", "One."),
                prompt_doc("prompts/b/gap-analysis.md", "gap  analysis", "Two."),
                prompt_doc("prompts/c/other.md", "Other", "Three."),
                PromptDocument::parse("prompts/a/README.md", "# Gap Analysis\n"),
            ],
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].path, "prompts/b/gap-analysis.md");
        assert_eq!(diags[0].line, Some(2));
        assert!(diags[0].message.contains("prompts/a/gap.md"));
    }
}
