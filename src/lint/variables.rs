//! Placeholders in the prompt block against rows of the Variables table.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use super::{DiagnosticSink, DocumentCheck, LintContext, RuleId};
use crate::document::PromptDocument;

fn auto_generated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)auto-generated:\s*describe").expect("valid regex"))
}

/// Returns true if a Variables description is leftover generator output.
pub fn is_auto_generated_description(description: &str) -> bool {
    auto_generated_re().is_match(description)
}

/// Cross-checks placeholders and Variables rows.
pub struct VariablesCheck;

impl DocumentCheck for VariablesCheck {
    fn name(&self) -> &'static str {
        "variables"
    }

    fn check(&self, doc: &PromptDocument, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let variables = doc.variables();
        for variable in &variables {
            if is_auto_generated_description(&variable.description) {
                sink.emit(
                    RuleId::AutoGeneratedVariable,
                    doc.path.clone(),
                    Some(variable.line),
                    format!(
                        "variable '{}' still has an AUTO-GENERATED description",
                        variable.name
                    ),
                );
            }
        }

        if doc.prompt_blocks().is_empty() {
            if ctx.is_prompt_document(doc) {
                sink.emit(
                    RuleId::MissingPromptBlock,
                    doc.path.clone(),
                    None,
                    "no fenced prompt block under a '## Prompt' heading",
                );
            }
            return;
        }

        let placeholders = doc.placeholders();
        let declared: HashSet<&str> = variables.iter().map(|v| v.key.as_str()).collect();
        let used: HashSet<&str> = placeholders.iter().map(|p| p.key.as_str()).collect();
        let has_section = doc.has_variables_section();

        let mut reported = BTreeSet::new();
        for placeholder in &placeholders {
            if declared.contains(placeholder.key.as_str()) || !reported.insert(&placeholder.key) {
                continue;
            }
            let message = if has_section {
                format!(
                    "placeholder '[{}]' has no entry in the Variables table",
                    placeholder.name
                )
            } else {
                format!(
                    "placeholder '[{}]' is not described; the file has no Variables section",
                    placeholder.name
                )
            };
            sink.emit(
                RuleId::MissingVariable,
                doc.path.clone(),
                Some(placeholder.line),
                message,
            );
        }

        for variable in variables.iter().filter(|v| !used.contains(v.key.as_str())) {
            sink.emit(
                RuleId::UnusedVariable,
                doc.path.clone(),
                Some(variable.line),
                format!(
                    "variable '{}' does not appear in the prompt block",
                    variable.name
                ),
            );
        }
    }
}
