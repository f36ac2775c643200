//! Cross-reference resolution.
//!
//! Related Prompts links are checked by default; `check_all_links` extends
//! the check to every link in the body. Targets resolve against the library
//! file set, so links to images or other non-Markdown files work too.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use super::{DiagnosticSink, DocumentCheck, LintContext, RuleId};
use crate::document::{Link, PromptDocument};

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid regex"))
}

/// Outcome of resolving a link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    /// A URL with a scheme (`https:`, `mailto:`) or a protocol-relative URL.
    External,
    /// An in-page `#anchor`.
    Anchor,
    /// The library-relative path of the file the link points at.
    Resolved(String),
    /// Nothing exists at the normalized path.
    Missing(String),
    /// The target climbs above the library root.
    EscapesRoot,
}

/// Resolves `target` as written in a document in directory `from_dir`.
///
/// `exists` answers whether a library-relative path exists. A target
/// resolves if any of `p`, `p.md`, `p/index.md` or `p/README.md` exists.
pub fn resolve_link(from_dir: &str, target: &str, exists: impl Fn(&str) -> bool) -> LinkResolution {
    let target = target.trim();
    if target.is_empty() || target.starts_with('#') {
        return LinkResolution::Anchor;
    }
    if target.starts_with("//") || scheme_re().is_match(target) {
        return LinkResolution::External;
    }

    let path = target.split(['#', '?']).next().unwrap_or_default();
    if path.is_empty() {
        return LinkResolution::Anchor;
    }
    let path = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));

    let mut segments: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        from_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return LinkResolution::EscapesRoot;
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    let candidates = if joined.is_empty() {
        vec!["index.md".to_string(), "README.md".to_string()]
    } else {
        vec![
            joined.clone(),
            format!("{}.md", joined),
            format!("{}/index.md", joined),
            format!("{}/README.md", joined),
        ]
    };

    match candidates.into_iter().find(|c| exists(c)) {
        Some(found) => LinkResolution::Resolved(found),
        None => LinkResolution::Missing(joined),
    }
}

/// Reports link targets that do not exist.
pub struct LinkCheck;

impl LinkCheck {
    fn check_link(&self, doc: &PromptDocument, link: &Link, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let resolution = resolve_link(doc.directory(), &link.target, |p| ctx.library.contains_file(p));
        let message = match resolution {
            LinkResolution::Missing(path) => format!(
                "link '{}' points to '{}', which does not exist",
                link.target, path
            ),
            LinkResolution::EscapesRoot => format!(
                "link '{}' points outside the library root",
                link.target
            ),
            _ => return,
        };
        sink.emit(RuleId::BrokenLink, doc.path.clone(), Some(link.line), message);
    }
}

impl DocumentCheck for LinkCheck {
    fn name(&self) -> &'static str {
        "links"
    }

    fn check(&self, doc: &PromptDocument, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        if ctx.config.check_all_links {
            for link in &doc.body.links {
                self.check_link(doc, link, ctx, sink);
            }
        } else {
            for link in doc.related_links() {
                self.check_link(doc, link, ctx, sink);
            }
        }
    }
}
