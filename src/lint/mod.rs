//! Prompt-library linting.
//!
//! The [`Linter`] runs two kinds of checks over a loaded [`PromptLibrary`]:
//! per-document checks ([`DocumentCheck`]) that look at one file at a time,
//! and library-wide checks ([`LibraryCheck`]) that compare files with each
//! other. Every check reports through a [`DiagnosticSink`], which applies the
//! configured severity of each rule and drops disabled ones.
//!
//! # Example
//!
//! ```ignore
//! use promptlint::config::LintConfig;
//! use promptlint::lint::Linter;
//!
//! let config = LintConfig::load(root, None)?;
//! let report = Linter::new(config)?.lint_path(root).await?;
//! println!("{}", report.render_text());
//! ```

pub mod conflicts;
pub mod duplicates;
pub mod frontmatter;
pub mod links;
pub mod rules;
pub mod structure;
pub mod variables;

pub use rules::RuleId;

use std::path::Path;

use tracing::{debug, info};

use crate::config::{LintConfig, RuleSettings};
use crate::document::PromptDocument;
use crate::error::{ConfigError, LibraryError};
use crate::library::{LoadOptions, PromptLibrary};
use crate::report::{Diagnostic, LintReport};

/// Shared state handed to every check.
pub struct LintContext<'a> {
    pub config: &'a LintConfig,
    pub library: &'a PromptLibrary,
}

impl LintContext<'_> {
    /// Returns true if `doc` sits under one of the configured prompt roots.
    pub fn is_prompt_document(&self, doc: &PromptDocument) -> bool {
        !doc.is_index_page() && self.config.prompt_roots.iter().any(|r| doc.is_under(r))
    }
}

/// Collects diagnostics, applying per-rule severity settings.
pub struct DiagnosticSink<'a> {
    settings: &'a RuleSettings,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DiagnosticSink<'a> {
    pub fn new(settings: &'a RuleSettings) -> Self {
        Self {
            settings,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        self.settings.is_enabled(rule)
    }

    /// Records a diagnostic unless `rule` is off.
    pub fn emit(
        &mut self,
        rule: RuleId,
        path: impl Into<String>,
        line: Option<usize>,
        message: impl Into<String>,
    ) {
        if let Some(severity) = self.settings.severity(rule) {
            self.diagnostics.push(Diagnostic {
                rule,
                severity,
                path: path.into(),
                line,
                message: message.into(),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// A check over a single document.
pub trait DocumentCheck: Send + Sync {
    /// Short name used in debug logs.
    fn name(&self) -> &'static str;

    fn check(&self, doc: &PromptDocument, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>);
}

/// A check comparing documents across the library.
pub trait LibraryCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>);
}

/// Runs all checks over a prompt library.
pub struct Linter {
    config: LintConfig,
    settings: RuleSettings,
    document_checks: Vec<Box<dyn DocumentCheck>>,
    library_checks: Vec<Box<dyn LibraryCheck>>,
}

impl Linter {
    /// Creates a linter with the built-in checks.
    pub fn new(config: LintConfig) -> Result<Self, ConfigError> {
        let settings = config.rule_settings()?;
        Ok(Self {
            config,
            settings,
            document_checks: vec![
                Box::new(frontmatter::FrontmatterCheck),
                Box::new(conflicts::MergeConflictCheck),
                Box::new(structure::StructureCheck),
                Box::new(structure::FileNamingCheck),
                Box::new(variables::VariablesCheck),
                Box::new(links::LinkCheck),
            ],
            library_checks: vec![
                Box::new(duplicates::DuplicatePromptCheck),
                Box::new(duplicates::DuplicateTitleCheck),
                Box::new(structure::MissingIndexCheck),
            ],
        })
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Adds a document check after the built-in ones.
    pub fn with_document_check(mut self, check: Box<dyn DocumentCheck>) -> Self {
        self.document_checks.push(check);
        self
    }

    /// Adds a library check after the built-in ones.
    pub fn with_library_check(mut self, check: Box<dyn LibraryCheck>) -> Self {
        self.library_checks.push(check);
        self
    }

    /// Loads the library at `root` and lints it.
    pub async fn lint_path(&self, root: impl AsRef<Path>) -> Result<LintReport, LibraryError> {
        let options = LoadOptions {
            exclude: self.config.exclude.clone(),
            concurrency: self.config.concurrency,
        };
        let library = PromptLibrary::load(root, &options).await?;
        Ok(self.lint(&library))
    }

    /// Lints an already-loaded library.
    pub fn lint(&self, library: &PromptLibrary) -> LintReport {
        let ctx = LintContext {
            config: &self.config,
            library,
        };
        let mut sink = DiagnosticSink::new(&self.settings);

        for failure in library.read_failures() {
            sink.emit(
                RuleId::IoError,
                failure.path.clone(),
                None,
                format!("could not read file: {}", failure.message),
            );
        }

        for doc in library.iter() {
            for check in &self.document_checks {
                let before = sink.len();
                check.check(doc, &ctx, &mut sink);
                debug!(
                    check = check.name(),
                    path = %doc.path,
                    found = sink.len() - before,
                    "Document check finished"
                );
            }
        }

        for check in &self.library_checks {
            let before = sink.len();
            check.check(&ctx, &mut sink);
            debug!(
                check = check.name(),
                found = sink.len() - before,
                "Library check finished"
            );
        }

        let files_checked = library.len() + library.read_failures().len();
        let report = LintReport::new(
            library.root().display().to_string(),
            files_checked,
            sink.into_diagnostics(),
        );
        info!(
            files = report.files_checked,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            infos = report.summary.infos,
            "Lint finished"
        );
        report
    }
}
