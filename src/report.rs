//! Diagnostics and lint reports.
//!
//! A [`LintReport`] is the complete result of one run: every diagnostic,
//! sorted by location, plus per-severity and per-rule counts. It renders as
//! compiler-style text or as JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lint::RuleId;

/// Severity of a diagnostic. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// One reported documentation defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: RuleId,
    pub severity: Severity,
    /// Path relative to the library root.
    pub path: String,
    /// 1-based line, when the defect has a location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: ", self.path, line)?,
            None => write!(f, "{}: ", self.path)?,
        }
        write!(f, "{}[{}]: {}", self.severity, self.rule, self.message)
    }
}

/// Counts per severity and per rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub by_rule: BTreeMap<String, usize>,
}

/// Result of linting a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintReport {
    pub root: String,
    pub files_checked: usize,
    pub summary: ReportSummary,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    /// Builds a report, sorting diagnostics by (path, line, rule).
    pub fn new(root: impl Into<String>, files_checked: usize, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.line.unwrap_or(0).cmp(&b.line.unwrap_or(0)))
                .then(a.rule.cmp(&b.rule))
                .then(a.message.cmp(&b.message))
        });

        let mut summary = ReportSummary::default();
        for d in &diagnostics {
            match d.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
            *summary.by_rule.entry(d.rule.as_str().to_string()).or_insert(0) += 1;
        }

        Self {
            root: root.into(),
            files_checked,
            summary,
            diagnostics,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Returns true if the run passes the gate.
    pub fn passes(&self, deny_warnings: bool) -> bool {
        !self.has_errors() && !(deny_warnings && self.summary.warnings > 0)
    }

    /// Diagnostics produced by `rule`.
    pub fn for_rule(&self, rule: RuleId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.rule == rule)
    }

    /// Diagnostics reported against `path`.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.path == path)
    }

    /// Compiler-style text: one line per diagnostic, then a summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for d in &self.diagnostics {
            out.push_str(&d.to_string());
            out.push('\n');
        }
        if !self.diagnostics.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "Checked {} file{}: {} error{}, {} warning{}, {} info\n",
            self.files_checked,
            plural(self.files_checked),
            self.summary.errors,
            plural(self.summary.errors),
            self.summary.warnings,
            plural(self.summary.warnings),
            self.summary.infos,
        ));
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
