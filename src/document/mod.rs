//! Prompt documents: Markdown files with YAML frontmatter.
//!
//! A prompt document is parsed in two passes. The leading frontmatter block is
//! split off and deserialized, then the body is scanned for the structure the
//! linter checks: headings, sections, the fenced prompt block, the Variables
//! table, and links.
//!
//! Parsing never fails. A frontmatter block that is not valid YAML is kept on
//! the document as `frontmatter_error` so it can be reported alongside every
//! other defect in the file. Known keys with an unusable value are dropped
//! into `shape_problems` and the rest of the frontmatter is kept.
//!
//! # Example
//!
//! ```ignore
//! use promptlint::document::PromptDocument;
//!
//! let doc = PromptDocument::parse("prompts/analysis/gap-analysis-expert.md", content);
//! for placeholder in doc.placeholders() {
//!     println!("{} at line {}", placeholder.name, placeholder.line);
//! }
//! ```

pub mod frontmatter;
pub mod markdown;
pub mod placeholders;

pub use frontmatter::{
    split_frontmatter, Frontmatter, FrontmatterBlock, FrontmatterFields, ShapeProblem,
};
pub use markdown::{parse_markdown, CodeBlock, Heading, Link, MarkdownBody, Section};
pub use placeholders::{find_placeholders, normalize_key, Placeholder};

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// File names treated as directory index pages.
pub const INDEX_FILE_NAMES: &[&str] = &["index.md", "readme.md", "_index.md"];

/// Section titles that hold the Variables table.
const VARIABLE_SECTION_PREFIXES: &[&str] = &["variables", "inputs", "placeholders"];

/// A row of the Variables table (or a bullet in a Variables list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableRow {
    /// Variable name as written, without backticks or brackets.
    pub name: String,
    pub key: String,
    pub description: String,
    pub line: usize,
}

/// A parsed Markdown file from the prompt library.
#[derive(Debug, Clone)]
pub struct PromptDocument {
    /// Path relative to the library root, `/`-separated.
    pub path: String,
    pub content: String,
    pub frontmatter_block: Option<FrontmatterBlock>,
    pub frontmatter: Option<Frontmatter>,
    pub frontmatter_error: Option<String>,
    /// Known keys dropped from `frontmatter` because of their value shape.
    pub shape_problems: Vec<ShapeProblem>,
    pub body: MarkdownBody,
}

fn variable_list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\**`?\[?([^\]`:*]+?)\]?`?\**\s*(?::|\s[-–—]\s)\s*(.*)$").expect("valid regex")
    })
}

impl PromptDocument {
    /// Parses `content` as the file at `path` (relative to the library root).
    pub fn parse(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        let content = content.into();

        let split = split_frontmatter(&content);
        let body = parse_markdown(split.body, split.body_line_offset);

        let (frontmatter, frontmatter_error, shape_problems) = match &split.frontmatter {
            Some(block) => match Frontmatter::parse_lenient(&block.raw) {
                Ok((fm, problems)) => (Some(fm), None, problems),
                Err(e) => (None, Some(e.to_string()), Vec::new()),
            },
            None => (None, None, Vec::new()),
        };

        let frontmatter_block = split.frontmatter;
        Self {
            path,
            content,
            frontmatter_block,
            frontmatter,
            frontmatter_error,
            shape_problems,
            body,
        }
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Directory part of the path, empty for files at the root.
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Name of the directory containing the file (the topic category).
    pub fn category(&self) -> Option<&str> {
        let dir = self.directory();
        if dir.is_empty() {
            None
        } else {
            dir.rsplit('/').next()
        }
    }

    /// Returns true for `index.md`, `README.md` and `_index.md`.
    pub fn is_index_page(&self) -> bool {
        INDEX_FILE_NAMES.contains(&self.file_name().to_lowercase().as_str())
    }

    /// Returns true if the document lives under the directory `root`.
    pub fn is_under(&self, root: &str) -> bool {
        let root = root.trim_matches('/');
        root.is_empty()
            || self
                .path
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Frontmatter fields, if the frontmatter parsed.
    pub fn fields(&self) -> Option<&FrontmatterFields> {
        self.frontmatter.as_ref().map(|fm| &fm.fields)
    }

    /// Display title: `title`, `name`, `shortTitle`, then the first H1.
    pub fn title(&self) -> Option<String> {
        self.fields()
            .and_then(|f| {
                [&f.title, &f.name, &f.short_title]
                    .into_iter()
                    .flatten()
                    .find(|s| !s.trim().is_empty())
                    .map(|s| s.trim().to_string())
            })
            .or_else(|| self.body.titles().next().map(|h| h.text.clone()))
    }

    /// Fenced blocks inside a `## Prompt` style section.
    pub fn prompt_blocks(&self) -> Vec<&CodeBlock> {
        self.body
            .code_blocks
            .iter()
            .filter(|b| b.section.as_deref().is_some_and(is_prompt_section))
            .collect()
    }

    /// Placeholders across all prompt blocks, in document order.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        self.prompt_blocks()
            .into_iter()
            .flat_map(|block| find_placeholders(&block.content, block.line + 1))
            .collect()
    }

    /// Returns true if the document has a Variables section.
    pub fn has_variables_section(&self) -> bool {
        self.body.sections_where(is_variables_section).next().is_some()
    }

    /// Rows of the Variables table.
    ///
    /// The first table in a Variables section wins. Without a table, bullets
    /// of the form `` - `[name]`: description `` are used.
    pub fn variables(&self) -> Vec<VariableRow> {
        let in_variables = |section: &Option<String>| {
            section.as_deref().is_some_and(is_variables_section)
        };

        if let Some(table) = self.body.tables.iter().find(|t| in_variables(&t.section)) {
            return table
                .rows
                .iter()
                .filter_map(|row| {
                    let raw_name = row.cells.first()?;
                    let name = clean_variable_name(raw_name);
                    if name.is_empty() {
                        return None;
                    }
                    Some(VariableRow {
                        key: normalize_key(&name),
                        name,
                        description: row.cells.get(1).cloned().unwrap_or_default(),
                        line: row.line,
                    })
                })
                .collect();
        }

        self.body
            .list_items
            .iter()
            .filter(|item| in_variables(&item.section))
            .filter_map(|item| {
                let caps = variable_list_item_re().captures(&item.text)?;
                let name = clean_variable_name(&caps[1]);
                if name.is_empty() {
                    return None;
                }
                Some(VariableRow {
                    key: normalize_key(&name),
                    name,
                    description: caps[2].trim().to_string(),
                    line: item.line,
                })
            })
            .collect()
    }

    /// Links in a "Related Prompts" section.
    pub fn related_links(&self) -> impl Iterator<Item = &Link> {
        self.body
            .links
            .iter()
            .filter(|l| l.section.as_deref().is_some_and(is_related_section))
    }
}

fn clean_variable_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '*')
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .to_string()
}

/// `Prompt`, `Prompt Text`, `The Prompt`; not `Related Prompts` or `Prompting Tips`.
pub fn is_prompt_section(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    let lower = lower.strip_prefix("the ").unwrap_or(&lower);
    lower
        .strip_prefix("prompt")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

pub fn is_variables_section(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    VARIABLE_SECTION_PREFIXES.iter().any(|p| lower.starts_with(p))
}

pub fn is_related_section(title: &str) -> bool {
    title.trim().to_lowercase().starts_with("related")
}
