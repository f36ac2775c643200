//! CLI command definitions for promptlint.

use crate::config::LintConfig;
use crate::document::PromptDocument;
use crate::library::{LoadOptions, PromptLibrary};
use crate::lint::{Linter, RuleId};
use crate::report::Severity;
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Exit status when the library passes.
pub const EXIT_PASSED: u8 = 0;

/// Exit status when the lint gate fails.
pub const EXIT_GATE_FAILED: u8 = 1;

/// Linter for Markdown prompt libraries.
#[derive(Parser)]
#[command(name = "promptlint")]
#[command(about = "Lint a Markdown prompt library")]
#[command(version)]
#[command(
    long_about = "promptlint checks a directory of Markdown prompt documents: YAML frontmatter, placeholder variables, Related Prompts links, duplicated content and leftover merge-conflict markers.\n\nExit status is 0 when the library passes, 1 when it has errors (or warnings under --deny-warnings) and 2 when the run itself fails.\n\nExample usage:\n  promptlint check ./library --format json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Lint every Markdown file under a library root.
    #[command(alias = "lint")]
    Check(CheckArgs),

    /// List prompt documents with their metadata.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show every rule with its default severity.
    Rules(RulesArgs),
}

/// Report format for `promptlint check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments for `promptlint check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Library root directory.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Report format.
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Fail on warnings as well as errors.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Config file (default: promptlint.yaml in the root, if present).
    #[arg(short = 'c', long, env = "PROMPTLINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Turn a rule off. May be repeated.
    #[arg(short = 'd', long = "disable", value_name = "RULE")]
    pub disable: Vec<String>,

    /// Check every link, not only those under Related Prompts.
    #[arg(long)]
    pub all_links: bool,

    /// Maximum number of files read at once.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for `promptlint list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Library root directory.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Only documents in this category directory.
    #[arg(long)]
    pub category: Option<String>,

    /// Only documents targeting this platform.
    #[arg(long)]
    pub platform: Option<String>,

    /// Only documents for this audience.
    #[arg(long)]
    pub audience: Option<String>,

    /// Only documents with this review status.
    #[arg(long)]
    pub status: Option<String>,

    /// Config file (default: promptlint.yaml in the root, if present).
    #[arg(short = 'c', long, env = "PROMPTLINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output JSON instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `promptlint rules`.
#[derive(Parser, Debug)]
pub struct RulesArgs {
    /// Output JSON instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<ExitCode> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// Returns the process exit status for a completed run; an `Err` means the
/// run itself failed (bad root, bad config).
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    execute(cli).await.map(ExitCode::from)
}

/// Runs the parsed command and returns its numeric exit status.
pub async fn execute(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Check(args) => run_check_command(args).await,
        Commands::List(args) => run_list_command(args).await,
        Commands::Rules(args) => run_rules_command(args),
    }
}

// ============================================================================
// Check
// ============================================================================

/// Loads the config for `root` and applies command-line overrides.
fn build_config(root: &Path, explicit: Option<&Path>, args: Option<&CheckArgs>) -> anyhow::Result<LintConfig> {
    let mut config = LintConfig::load(root, explicit)
        .with_context(|| format!("Failed to load configuration for {}", root.display()))?;

    if let Some(args) = args {
        config.disable_rules(args.disable.iter().cloned());
        if args.all_links {
            config.check_all_links = true;
        }
        if let Some(concurrency) = args.concurrency {
            config.concurrency = concurrency;
        }
        config.validate().context("Invalid command-line options")?;
    }
    Ok(config)
}

async fn run_check_command(args: CheckArgs) -> anyhow::Result<u8> {
    let config = build_config(&args.root, args.config.as_deref(), Some(&args))?;
    let linter = Linter::new(config).context("Invalid rule configuration")?;

    let report = linter
        .lint_path(&args.root)
        .await
        .with_context(|| format!("Failed to lint {}", args.root.display()))?;

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Failed to serialize report")?
        ),
    }

    if report.passes(args.deny_warnings) {
        Ok(EXIT_PASSED)
    } else {
        info!(
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            deny_warnings = args.deny_warnings,
            "Lint gate failed"
        );
        Ok(EXIT_GATE_FAILED)
    }
}

// ============================================================================
// List
// ============================================================================

/// One row of `promptlint list`.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub path: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub category: Option<String>,
    pub platforms: Vec<String>,
    #[serde(rename = "reviewStatus")]
    pub review_status: Option<String>,
    pub prompt_blocks: usize,
    pub variables: usize,
}

impl ListEntry {
    pub fn from_document(doc: &PromptDocument) -> Self {
        let fields = doc.fields();
        Self {
            path: doc.path.clone(),
            title: doc.title(),
            doc_type: fields.and_then(|f| f.doc_type.clone()),
            category: doc.category().map(str::to_string),
            platforms: fields.map(|f| f.platforms.clone()).unwrap_or_default(),
            review_status: fields.and_then(|f| f.review_status.clone()),
            prompt_blocks: doc.prompt_blocks().len(),
            variables: doc.variables().len(),
        }
    }
}

/// Keeps only the documents that also appear in `subset`.
fn retain_in<'a>(docs: &mut Vec<&'a PromptDocument>, subset: Vec<&'a PromptDocument>) {
    let keep: HashSet<&str> = subset.iter().map(|d| d.path.as_str()).collect();
    docs.retain(|d| keep.contains(d.path.as_str()));
}

/// Applies the `list` filters to a loaded library.
pub fn select_documents<'a>(library: &'a PromptLibrary, args: &ListArgs) -> Vec<&'a PromptDocument> {
    let mut docs: Vec<&PromptDocument> = library.iter().filter(|d| !d.is_index_page()).collect();
    if let Some(category) = &args.category {
        retain_in(&mut docs, library.by_category(category));
    }
    if let Some(platform) = &args.platform {
        retain_in(&mut docs, library.by_platform(platform));
    }
    if let Some(audience) = &args.audience {
        retain_in(&mut docs, library.by_audience(audience));
    }
    if let Some(status) = &args.status {
        retain_in(&mut docs, library.by_review_status(status));
    }
    docs
}

async fn run_list_command(args: ListArgs) -> anyhow::Result<u8> {
    let config = build_config(&args.root, args.config.as_deref(), None)?;
    let options = LoadOptions {
        exclude: config.exclude.clone(),
        concurrency: config.concurrency,
    };
    let library = PromptLibrary::load(&args.root, &options)
        .await
        .with_context(|| format!("Failed to load library at {}", args.root.display()))?;

    let entries: Vec<ListEntry> = select_documents(&library, &args)
        .into_iter()
        .map(ListEntry::from_document)
        .collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize listing")?
        );
        return Ok(EXIT_PASSED);
    }

    for entry in &entries {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            entry.path,
            entry.title.as_deref().unwrap_or("-"),
            entry.doc_type.as_deref().unwrap_or("-"),
            if entry.platforms.is_empty() {
                "-".to_string()
            } else {
                entry.platforms.join(",")
            },
            entry.review_status.as_deref().unwrap_or("-"),
        );
    }
    println!("{} document(s)", entries.len());
    Ok(EXIT_PASSED)
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct RuleEntry {
    id: RuleId,
    default_severity: Severity,
    description: &'static str,
}

fn rule_entries() -> Vec<RuleEntry> {
    RuleId::all()
        .into_iter()
        .map(|rule| RuleEntry {
            id: rule,
            default_severity: rule.default_severity(),
            description: rule.description(),
        })
        .collect()
}

fn run_rules_command(args: RulesArgs) -> anyhow::Result<u8> {
    let entries = rule_entries();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize rules")?
        );
    } else {
        let width = entries
            .iter()
            .map(|e| e.id.as_str().len())
            .max()
            .unwrap_or(0);
        for entry in &entries {
            println!(
                "{:<width$}  {:<7}  {}",
                entry.id.as_str(),
                entry.default_severity.to_string(),
                entry.description,
                width = width
            );
        }
    }
    Ok(EXIT_PASSED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_check_command_parsing() {
        let args = vec![
            "promptlint",
            "check",
            "./library",
            "--format",
            "json",
            "--deny-warnings",
            "--disable",
            "file-naming",
            "-d",
            "missing-index",
            "--all-links",
            "--concurrency",
            "8",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.root, PathBuf::from("./library"));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(args.deny_warnings);
                assert_eq!(args.disable, vec!["file-naming", "missing-index"]);
                assert!(args.all_links);
                assert_eq!(args.concurrency, Some(8));
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_check_defaults_and_alias() {
        let cli = Cli::try_parse_from(["promptlint", "lint", "-l", "debug"]).expect("should parse");
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.root, PathBuf::from("."));
                assert_eq!(args.format, OutputFormat::Text);
                assert!(!args.deny_warnings);
                assert!(args.disable.is_empty());
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_list_command_parsing() {
        let cli = Cli::try_parse_from([
            "promptlint",
            "ls",
            "lib",
            "--platform",
            "claude",
            "--status",
            "approved",
            "-j",
        ])
        .expect("should parse");
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.platform.as_deref(), Some("claude"));
                assert_eq!(args.status.as_deref(), Some("approved"));
                assert!(args.json);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(Cli::try_parse_from(["promptlint", "check", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_rule_entries_cover_all_rules() {
        let entries = rule_entries();
        assert_eq!(entries.len(), RuleId::all().len());
        let json = serde_json::to_string(&entries).expect("serialization should succeed");
        assert!(json.contains("\"id\":\"merge-conflict\""));
        assert!(json.contains("\"default_severity\":\"error\""));
    }

    #[test]
    fn test_select_documents_filters() {
        let library = PromptLibrary::from_documents(
            ".",
            vec![
                PromptDocument::parse(
                    "prompts/analysis/gap-analysis-expert.md",
                    "---\ntitle: Gap\ntype: how_to\nplatforms: [claude]\nreviewStatus: approved\n---\n",
                ),
                PromptDocument::parse(
                    "prompts/analysis/swot.md",
                    "---\ntitle: SWOT\nplatforms: [chatgpt]\nreviewStatus: approved\n---\n",
                ),
                PromptDocument::parse("prompts/analysis/README.md", "# Analysis\n"),
            ],
            Vec::<String>::new(),
        );
        let args = ListArgs {
            root: PathBuf::from("."),
            category: Some("analysis".to_string()),
            platform: Some("claude".to_string()),
            audience: None,
            status: Some("approved".to_string()),
            config: None,
            json: false,
        };
        let docs = select_documents(&library, &args);
        assert_eq!(docs.len(), 1);

        let entry = ListEntry::from_document(docs[0]);
        assert_eq!(entry.title.as_deref(), Some("Gap"));
        assert_eq!(entry.doc_type.as_deref(), Some("how_to"));
        assert_eq!(entry.category.as_deref(), Some("analysis"));
        let json = serde_json::to_string(&entry).expect("serialization should succeed");
        assert!(json.contains("\"type\":\"how_to\""));
        assert!(json.contains("\"reviewStatus\":\"approved\""));
    }

    #[tokio::test]
    async fn test_check_exit_codes() {
        let dir = tempdir().expect("failed to create temp dir");
        let prompts = dir.path().join("prompts");
        fs::create_dir_all(&prompts).expect("failed to create dirs");
        fs::write(prompts.join("README.md"), "# Prompts\n").expect("write");
        fs::write(
            prompts.join("draft.md"),
            "---\ntitle: Draft\ndescription: d\ntype: how_to\n---\n# Draft\n\n## Prompt\n\n```\nWrite [topic].\n```\n",
        )
        .expect("write");

        let root = dir.path().to_str().expect("utf-8 path").to_string();
        let check = |extra: &[&str]| {
            let mut argv = vec!["promptlint".to_string(), "check".to_string(), root.clone()];
            argv.extend(extra.iter().map(|s| s.to_string()));
            Cli::try_parse_from(argv).expect("should parse")
        };

        let code = execute(check(&[])).await.expect("run should succeed");
        assert_eq!(code, EXIT_GATE_FAILED);

        let code = execute(check(&["--disable", "missing-variable"]))
            .await
            .expect("run should succeed");
        assert_eq!(code, EXIT_PASSED);

        let result = execute(check(&["--disable", "no-such-rule"])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_check_missing_root_is_an_error() {
        let dir = tempdir().expect("failed to create temp dir");
        let missing = dir.path().join("missing");
        let cli = Cli::try_parse_from([
            "promptlint",
            "check",
            missing.to_str().expect("utf-8 path"),
        ])
        .expect("should parse");
        assert!(execute(cli).await.is_err());
    }
}
