//! Rule catalog: stable ids, default severities and descriptions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::report::Severity;

/// Every check the linter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    MissingFrontmatter,
    InvalidFrontmatter,
    MissingRequiredKey,
    InvalidFieldValue,
    MultipleFrontmatter,
    MergeConflict,
    DuplicateTitle,
    DuplicateSection,
    MissingVariable,
    UnusedVariable,
    AutoGeneratedVariable,
    MissingPromptBlock,
    BrokenLink,
    FileNaming,
    DuplicatePrompt,
    DuplicateTitleAcrossFiles,
    MissingIndex,
    IoError,
}

impl RuleId {
    /// Returns all rules in catalog order.
    pub fn all() -> Vec<RuleId> {
        vec![
            RuleId::MissingFrontmatter,
            RuleId::InvalidFrontmatter,
            RuleId::MissingRequiredKey,
            RuleId::InvalidFieldValue,
            RuleId::MultipleFrontmatter,
            RuleId::MergeConflict,
            RuleId::DuplicateTitle,
            RuleId::DuplicateSection,
            RuleId::MissingVariable,
            RuleId::UnusedVariable,
            RuleId::AutoGeneratedVariable,
            RuleId::MissingPromptBlock,
            RuleId::BrokenLink,
            RuleId::FileNaming,
            RuleId::DuplicatePrompt,
            RuleId::DuplicateTitleAcrossFiles,
            RuleId::MissingIndex,
            RuleId::IoError,
        ]
    }

    /// Stable kebab-case identifier used in config files and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::MissingFrontmatter => "missing-frontmatter",
            RuleId::InvalidFrontmatter => "invalid-frontmatter",
            RuleId::MissingRequiredKey => "missing-required-key",
            RuleId::InvalidFieldValue => "invalid-field-value",
            RuleId::MultipleFrontmatter => "multiple-frontmatter",
            RuleId::MergeConflict => "merge-conflict",
            RuleId::DuplicateTitle => "duplicate-title",
            RuleId::DuplicateSection => "duplicate-section",
            RuleId::MissingVariable => "missing-variable",
            RuleId::UnusedVariable => "unused-variable",
            RuleId::AutoGeneratedVariable => "auto-generated-variable",
            RuleId::MissingPromptBlock => "missing-prompt-block",
            RuleId::BrokenLink => "broken-link",
            RuleId::FileNaming => "file-naming",
            RuleId::DuplicatePrompt => "duplicate-prompt",
            RuleId::DuplicateTitleAcrossFiles => "duplicate-title-across-files",
            RuleId::MissingIndex => "missing-index",
            RuleId::IoError => "io-error",
        }
    }

    /// Severity used when the config does not override it.
    pub fn default_severity(&self) -> Severity {
        match self {
            RuleId::MissingFrontmatter
            | RuleId::InvalidFrontmatter
            | RuleId::MissingRequiredKey
            | RuleId::MultipleFrontmatter
            | RuleId::MergeConflict
            | RuleId::DuplicateTitle
            | RuleId::MissingVariable
            | RuleId::BrokenLink
            | RuleId::IoError => Severity::Error,
            RuleId::InvalidFieldValue
            | RuleId::DuplicateSection
            | RuleId::UnusedVariable
            | RuleId::AutoGeneratedVariable
            | RuleId::MissingPromptBlock
            | RuleId::FileNaming
            | RuleId::DuplicatePrompt => Severity::Warning,
            RuleId::DuplicateTitleAcrossFiles | RuleId::MissingIndex => Severity::Info,
        }
    }

    /// One-line description for `promptlint rules`.
    pub fn description(&self) -> &'static str {
        match self {
            RuleId::MissingFrontmatter => "File has no YAML frontmatter block",
            RuleId::InvalidFrontmatter => "Frontmatter is not valid YAML or not a mapping",
            RuleId::MissingRequiredKey => {
                "Frontmatter lacks a mandatory key (title/name, description/intro, type)"
            }
            RuleId::InvalidFieldValue => {
                "A frontmatter value is outside its vocabulary or format (type, difficulty, reviewStatus, dataClassification, version, date, effectivenessScore)"
            }
            RuleId::MultipleFrontmatter => "File contains more than one frontmatter block",
            RuleId::MergeConflict => "File contains unresolved version-control conflict markers",
            RuleId::DuplicateTitle => "File has more than one top-level `# Title` heading",
            RuleId::DuplicateSection => "The same `## Section` heading appears more than once",
            RuleId::MissingVariable => {
                "A [placeholder] in the prompt block has no row in the Variables table"
            }
            RuleId::UnusedVariable => "A Variables row matches no placeholder in the prompt block",
            RuleId::AutoGeneratedVariable => {
                "A Variables row still carries an AUTO-GENERATED placeholder description"
            }
            RuleId::MissingPromptBlock => "A prompt document has no fenced block under `## Prompt`",
            RuleId::BrokenLink => "A Related Prompts link points to a file that does not exist",
            RuleId::FileNaming => "File name is not kebab-case `.md`",
            RuleId::DuplicatePrompt => "Prompt text is identical to another prompt block",
            RuleId::DuplicateTitleAcrossFiles => "Another file has the same title",
            RuleId::MissingIndex => "A prompt directory has no index.md or README.md",
            RuleId::IoError => "File could not be read",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        RuleId::all()
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| s.to_string())
    }
}
