//! promptlint: a linter for Markdown prompt libraries.
//!
//! A prompt library is a directory of Markdown documents, each with YAML
//! frontmatter, a fenced prompt block full of `[placeholders]`, a Variables
//! table describing them, and Related Prompts links. This crate loads such a
//! library and reports documentation defects: malformed or duplicated
//! frontmatter, undescribed placeholders, broken cross-references,
//! duplicated headings and prompts, and leftover merge-conflict markers.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod library;
pub mod lint;
pub mod report;

pub use config::LintConfig;
pub use document::PromptDocument;
pub use error::{ConfigError, DocumentError, LibraryError};
pub use library::PromptLibrary;
pub use lint::{Linter, RuleId};
pub use report::{Diagnostic, LintReport, Severity};
