//! Line-oriented Markdown body scanner.
//!
//! Extracts the structure the linter needs (headings, level-2 sections,
//! fenced code blocks, tables, list items, links) and any frontmatter-shaped
//! YAML blocks that appear after the leading one. This is not a CommonMark
//! parser; it follows the conventions prompt documents actually use.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;

use super::frontmatter::{is_open_delimiter, FrontmatterBlock, KNOWN_KEYS};

/// Maximum number of lines scanned when looking for the end of an
/// embedded frontmatter block.
const MAX_EMBEDDED_FRONTMATTER_LINES: usize = 80;

/// An ATX heading outside fenced code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub line: usize,
}

/// A level-2 section and its line span (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub line: usize,
    pub end_line: usize,
}

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    /// Info string after the opening fence (language tag).
    pub info: String,
    pub content: String,
    /// Line of the opening fence.
    pub line: usize,
    /// Title of the enclosing level-2 section.
    pub section: Option<String>,
}

/// A Markdown table: header cells plus body rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
    pub line: usize,
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub line: usize,
}

/// A `-` or `*` bullet item (text after the marker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub text: String,
    pub line: usize,
    pub section: Option<String>,
}

/// An inline `[text](target)` link or a `[label]: target` definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub target: String,
    pub line: usize,
    pub section: Option<String>,
}

/// Structure extracted from a Markdown body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarkdownBody {
    pub headings: Vec<Heading>,
    pub sections: Vec<Section>,
    pub code_blocks: Vec<CodeBlock>,
    pub tables: Vec<Table>,
    pub list_items: Vec<ListItem>,
    pub links: Vec<Link>,
    /// Frontmatter-shaped blocks found after the leading frontmatter.
    pub embedded_frontmatter: Vec<FrontmatterBlock>,
}

impl MarkdownBody {
    /// Level-1 headings.
    pub fn titles(&self) -> impl Iterator<Item = &Heading> {
        self.headings.iter().filter(|h| h.level == 1)
    }

    /// Sections whose title satisfies `pred`.
    pub fn sections_where<'a>(
        &'a self,
        pred: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections.iter().filter(move |s| pred(&s.title))
    }
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("valid regex"))
}

fn inline_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).expect("valid regex")
    })
}

fn link_definition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}\[([^\]]+)\]:\s*<?(\S+?)>?(?:\s+.*)?$").expect("valid regex"))
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("valid regex"))
}

fn yaml_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*\s*:").expect("valid regex"))
}

/// Strips the trailing closing sequence from an ATX heading (`## Title ##`).
fn clean_heading_text(text: &str) -> String {
    let trimmed = text.trim();
    let without_closing = trimmed.trim_end_matches('#');
    if without_closing.len() != trimmed.len()
        && (without_closing.is_empty() || without_closing.ends_with([' ', '\t']))
    {
        without_closing.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns (marker char, run length, info string) for an opening fence.
fn parse_fence_open(line: &str) -> Option<(char, usize, String)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = rest.chars().take_while(|c| *c == marker).count();
    if run < 3 {
        return None;
    }
    let info = rest[run..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some((marker, run, info.to_string()))
}

fn is_fence_close(line: &str, marker: char, min_run: usize) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let run = trimmed.chars().take_while(|c| *c == marker).count();
    run >= min_run && trimmed[run..].trim().is_empty()
}

/// Splits a table line into trimmed cells, honoring `\|` escapes.
pub(crate) fn split_table_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = if inner.ends_with('|') && !inner.ends_with("\\|") {
        &inner[..inner.len() - 1]
    } else {
        inner
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn is_table_separator(line: &str) -> bool {
    let cells = split_table_cells(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let c = cell.trim();
            !c.is_empty()
                && c.contains('-')
                && c.chars().all(|ch| ch == '-' || ch == ':' || ch == ' ')
        })
}

/// Removes inline code spans so that bracketed text inside them is ignored.
fn strip_code_spans(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_code = false;
    for c in line.chars() {
        if c == '`' {
            in_code = !in_code;
            out.push(' ');
        } else if in_code {
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Tries to read a frontmatter-shaped block whose opening delimiter is at
/// `lines[start]`. Returns the block and the index of its closing line.
fn embedded_frontmatter_at(
    lines: &[&str],
    start: usize,
    line_offset: usize,
) -> Option<(FrontmatterBlock, usize)> {
    let limit = (start + 1 + MAX_EMBEDDED_FRONTMATTER_LINES).min(lines.len());
    let close = (start + 1..limit).find(|&i| is_open_delimiter(lines[i]))?;
    let inner = &lines[start + 1..close];

    let first = inner.iter().find(|l| !l.trim().is_empty())?;
    if !yaml_key_re().is_match(first) {
        return None;
    }

    let raw: String = inner.iter().map(|l| format!("{}\n", l)).collect();
    let Ok(Value::Mapping(map)) = serde_yaml::from_str::<Value>(&raw) else {
        return None;
    };
    let has_known_key = map
        .keys()
        .filter_map(Value::as_str)
        .any(|k| KNOWN_KEYS.contains(&k));
    if !has_known_key {
        return None;
    }

    Some((
        FrontmatterBlock {
            raw,
            start_line: line_offset + start + 1,
            end_line: line_offset + close + 1,
        },
        close,
    ))
}

struct OpenFence {
    marker: char,
    run: usize,
    info: String,
    line: usize,
    content: String,
}

struct TableBuilder {
    header: Vec<String>,
    rows: Vec<TableRow>,
    line: usize,
    separator_seen: bool,
}

/// Scans `body`; `line_offset` is the number of file lines preceding it.
pub fn parse_markdown(body: &str, line_offset: usize) -> MarkdownBody {
    let lines: Vec<&str> = body
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut out = MarkdownBody::default();
    let mut fence: Option<OpenFence> = None;
    let mut table: Option<TableBuilder> = None;
    let mut section: Option<Section> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let line_no = line_offset + i + 1;
        let current_section = section.as_ref().map(|s| s.title.clone());

        if let Some(open) = fence.as_mut() {
            if is_fence_close(line, open.marker, open.run) {
                if let Some(open) = fence.take() {
                    out.code_blocks.push(CodeBlock {
                        info: open.info,
                        content: open.content,
                        line: open.line,
                        section: current_section,
                    });
                }
            } else {
                open.content.push_str(line);
                open.content.push('\n');
            }
            i += 1;
            continue;
        }

        let is_table_line = line.trim_start().starts_with('|');
        if !is_table_line {
            if let Some(t) = table.take() {
                finish_table(&mut out, t, current_section.clone());
            }
        }

        if let Some((marker, run, info)) = parse_fence_open(line) {
            fence = Some(OpenFence {
                marker,
                run,
                info,
                line: line_no,
                content: String::new(),
            });
            i += 1;
            continue;
        }

        if is_open_delimiter(line) {
            if let Some((block, close)) = embedded_frontmatter_at(&lines, i, line_offset) {
                out.embedded_frontmatter.push(block);
                i = close + 1;
                continue;
            }
        }

        if let Some(caps) = heading_re().captures(line) {
            let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
            let text = clean_heading_text(caps.get(2).map_or("", |m| m.as_str()));
            if level <= 2 {
                if let Some(mut s) = section.take() {
                    s.end_line = line_no - 1;
                    out.sections.push(s);
                }
            }
            if level == 2 {
                section = Some(Section {
                    title: text.clone(),
                    line: line_no,
                    end_line: line_no,
                });
            }
            out.headings.push(Heading {
                level,
                text,
                line: line_no,
            });
            i += 1;
            continue;
        }

        if is_table_line {
            match table.as_mut() {
                None => {
                    table = Some(TableBuilder {
                        header: split_table_cells(line),
                        rows: Vec::new(),
                        line: line_no,
                        separator_seen: false,
                    })
                }
                Some(t) if !t.separator_seen && is_table_separator(line) => {
                    t.separator_seen = true;
                }
                Some(t) => t.rows.push(TableRow {
                    cells: split_table_cells(line),
                    line: line_no,
                }),
            }
        }

        if let Some(caps) = list_item_re().captures(line) {
            out.list_items.push(ListItem {
                text: caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
                line: line_no,
                section: current_section.clone(),
            });
        }

        let scrubbed = strip_code_spans(line);
        if let Some(caps) = link_definition_re().captures(&scrubbed) {
            out.links.push(Link {
                text: caps[1].to_string(),
                target: caps[2].to_string(),
                line: line_no,
                section: current_section.clone(),
            });
        } else {
            for caps in inline_link_re().captures_iter(&scrubbed) {
                out.links.push(Link {
                    text: caps[1].to_string(),
                    target: caps[2].to_string(),
                    line: line_no,
                    section: current_section.clone(),
                });
            }
        }

        i += 1;
    }

    let last_line = line_offset + lines.len();
    let current_section = section.as_ref().map(|s| s.title.clone());
    if let Some(t) = table.take() {
        finish_table(&mut out, t, current_section.clone());
    }
    // An unterminated fence runs to the end of the document.
    if let Some(open) = fence.take() {
        out.code_blocks.push(CodeBlock {
            info: open.info,
            content: open.content,
            line: open.line,
            section: current_section,
        });
    }
    if let Some(mut s) = section.take() {
        s.end_line = last_line;
        out.sections.push(s);
    }

    out
}

fn finish_table(out: &mut MarkdownBody, builder: TableBuilder, section: Option<String>) {
    // Without a separator row this is just a line starting with a pipe.
    if !builder.separator_seen {
        return;
    }
    out.tables.push(Table {
        header: builder.header,
        rows: builder.rows,
        line: builder.line,
        section,
    });
}
