//! Document structure: frontmatter and heading duplication, file naming and
//! directory index pages.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use super::{DiagnosticSink, DocumentCheck, LibraryCheck, LintContext, RuleId};
use crate::document::{PromptDocument, INDEX_FILE_NAMES};

/// File stems exempt from the kebab-case rule.
const NAMING_EXEMPT_STEMS: &[&str] = &[
    "readme",
    "index",
    "_index",
    "changelog",
    "contributing",
    "license",
];

fn kebab_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid regex"))
}

/// Flags repeated frontmatter blocks, `# Title` headings and `## Section`
/// headings within one file.
pub struct StructureCheck;

impl DocumentCheck for StructureCheck {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn check(&self, doc: &PromptDocument, _ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let first_block = doc
            .frontmatter_block
            .as_ref()
            .or_else(|| doc.body.embedded_frontmatter.first());
        if let Some(first) = first_block {
            let skip = usize::from(doc.frontmatter_block.is_none());
            for extra in doc.body.embedded_frontmatter.iter().skip(skip) {
                sink.emit(
                    RuleId::MultipleFrontmatter,
                    doc.path.clone(),
                    Some(extra.start_line),
                    format!(
                        "additional frontmatter block (first block at line {})",
                        first.start_line
                    ),
                );
            }
        }

        let mut titles = doc.body.titles();
        if let Some(first) = titles.next() {
            for repeat in titles {
                sink.emit(
                    RuleId::DuplicateTitle,
                    doc.path.clone(),
                    Some(repeat.line),
                    format!(
                        "duplicate top-level heading '# {}' (first at line {})",
                        repeat.text, first.line
                    ),
                );
            }
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for heading in doc.body.headings.iter().filter(|h| h.level == 2) {
            let key = heading.text.trim().to_lowercase();
            match seen.get(&key) {
                Some(&first_line) => sink.emit(
                    RuleId::DuplicateSection,
                    doc.path.clone(),
                    Some(heading.line),
                    format!(
                        "section '## {}' repeats the one at line {}",
                        heading.text, first_line
                    ),
                ),
                None => {
                    seen.insert(key, heading.line);
                }
            }
        }
    }
}

/// Returns true if `file_name` is a kebab-case `.md` name or an exempt one.
pub fn is_conventional_file_name(file_name: &str) -> bool {
    let Some(stem) = file_name.strip_suffix(".md") else {
        return false;
    };
    NAMING_EXEMPT_STEMS.contains(&stem.to_lowercase().as_str()) || kebab_case_re().is_match(stem)
}

/// Flags file names that are not kebab-case `.md`.
pub struct FileNamingCheck;

impl DocumentCheck for FileNamingCheck {
    fn name(&self) -> &'static str {
        "file-naming"
    }

    fn check(&self, doc: &PromptDocument, _ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let file_name = doc.file_name();
        if !is_conventional_file_name(file_name) {
            sink.emit(
                RuleId::FileNaming,
                doc.path.clone(),
                None,
                format!("file name '{}' is not kebab-case .md", file_name),
            );
        }
    }
}

/// Flags prompt directories without an `index.md` or `README.md`.
pub struct MissingIndexCheck;

impl LibraryCheck for MissingIndexCheck {
    fn name(&self) -> &'static str {
        "missing-index"
    }

    fn check(&self, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let mut prompt_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in ctx.library.iter().filter(|d| ctx.is_prompt_document(d)) {
            *prompt_counts.entry(doc.directory()).or_default() += 1;
        }

        let indexed: BTreeSet<&str> = ctx
            .library
            .files()
            .filter_map(|path| {
                let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
                INDEX_FILE_NAMES
                    .contains(&name.to_lowercase().as_str())
                    .then_some(dir)
            })
            .collect();

        for (dir, count) in prompt_counts {
            if indexed.contains(dir) {
                continue;
            }
            sink.emit(
                RuleId::MissingIndex,
                format!("{}/", dir),
                None,
                format!(
                    "directory holds {} prompt(s) but has no index.md or README.md",
                    count
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LintConfig, RuleSettings};
    use crate::library::PromptLibrary;
    use crate::report::Diagnostic;

    fn run_doc(check: &dyn DocumentCheck, doc: &PromptDocument) -> Vec<Diagnostic> {
        let config = LintConfig::default();
        let library = PromptLibrary::default();
        let ctx = LintContext {
            config: &config,
            library: &library,
        };
        let settings = RuleSettings::default();
        let mut sink = DiagnosticSink::new(&settings);
        check.check(doc, &ctx, &mut sink);
        sink.into_diagnostics()
    }

    #[test]
    fn test_multiple_frontmatter() {
        let content = "---\ntitle: A\ndescription: d\ntype: how_to\n---\n# A\n\n---\ntitle: A again\ntype: how_to\n---\n\n## Prompt\n";
        let doc = PromptDocument::parse("prompts/a.md", content);
        let diags = run_doc(&StructureCheck, &doc);
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(diags[0].rule, RuleId::MultipleFrontmatter);
        assert_eq!(diags[0].line, Some(8));
        assert!(diags[0].message.contains("line 1"));
    }

    #[test]
    fn test_horizontal_rule_is_not_frontmatter() {
        let content = "---\ntitle: A\n---\n# A\n\nText\n\n---\n\nMore text\n";
        let doc = PromptDocument::parse("prompts/a.md", content);
        assert!(run_doc(&StructureCheck, &doc).is_empty());
    }

    #[test]
    fn test_duplicate_title_and_section() {
        let content = "# A\n\n## Tips\n\n# A\n\n## tips\n\n```\n# not a heading\n```\n";
        let doc = PromptDocument::parse("prompts/a.md", content);
        let diags = run_doc(&StructureCheck, &doc);
        let found: Vec<(RuleId, Option<usize>)> = diags.iter().map(|d| (d.rule, d.line)).collect();
        assert_eq!(
            found,
            vec![
                (RuleId::DuplicateTitle, Some(5)),
                (RuleId::DuplicateSection, Some(7)),
            ]
        );
    }

    #[test]
    fn test_file_names() {
        assert!(is_conventional_file_name("gap-analysis-expert.md"));
        assert!(is_conventional_file_name("m365-meeting-recap.md"));
        assert!(is_conventional_file_name("README.md"));
        assert!(is_conventional_file_name("CHANGELOG.md"));
        assert!(is_conventional_file_name("_index.md"));
        assert!(!is_conventional_file_name("Gap_Analysis.md"));
        assert!(!is_conventional_file_name("gap--analysis.md"));
        assert!(!is_conventional_file_name("notes.markdown"));

        let doc = PromptDocument::parse("prompts/My Prompt.md", "# x\n");
        let diags = run_doc(&FileNamingCheck, &doc);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, None);
    }

    #[test]
    fn test_missing_index() {
        let library = PromptLibrary::from_documents(
            ".",
            vec![
                PromptDocument::parse("prompts/analysis/a.md", "# A\n"),
                PromptDocument::parse("prompts/analysis/b.md", "# B\n"),
                PromptDocument::parse("prompts/writing/c.md", "# C\n"),
                PromptDocument::parse("prompts/writing/README.md", "# Writing\n"),
                PromptDocument::parse("docs/guide.md", "# Guide\n"),
            ],
            Vec::<String>::new(),
        );
        let config = LintConfig::default();
        let ctx = LintContext {
            config: &config,
            library: &library,
        };
        let settings = RuleSettings::default();
        let mut sink = DiagnosticSink::new(&settings);
        MissingIndexCheck.check(&ctx, &mut sink);
        let diags = sink.into_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].path, "prompts/analysis/");
        assert!(diags[0].message.contains("2 prompt(s)"));
    }
}
