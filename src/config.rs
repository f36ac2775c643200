//! Linter configuration.
//!
//! Configuration is layered: built-in defaults, then a YAML file
//! (`promptlint.yaml` or `.promptlint.yaml` in the library root, or an
//! explicit `--config` path), then `PROMPTLINT_*` environment variables, then
//! command-line flags applied by the CLI.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::lint::RuleId;
use crate::report::Severity;

/// Config file names searched for in the library root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["promptlint.yaml", ".promptlint.yaml", "promptlint.yml"];

/// Level assigned to a rule in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Off,
    Info,
    Warning,
    Error,
}

impl RuleLevel {
    fn severity(self) -> Option<Severity> {
        match self {
            RuleLevel::Off => None,
            RuleLevel::Info => Some(Severity::Info),
            RuleLevel::Warning => Some(Severity::Warning),
            RuleLevel::Error => Some(Severity::Error),
        }
    }
}

/// A mandatory frontmatter key, or a set of interchangeable keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequiredKey {
    One(String),
    AnyOf(Vec<String>),
}

impl RequiredKey {
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            RequiredKey::One(key) => vec![key.as_str()],
            RequiredKey::AnyOf(keys) => keys.iter().map(String::as_str).collect(),
        }
    }
}

/// Configuration for a lint run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Mandatory frontmatter keys.
    pub required_keys: Vec<RequiredKey>,
    /// Directories (relative to the root) whose Markdown files are prompts.
    pub prompt_roots: Vec<String>,
    /// Path prefixes (relative to the root) to skip.
    pub exclude: Vec<String>,
    /// Check every link, not only those under Related Prompts.
    pub check_all_links: bool,
    /// Require frontmatter on index.md and README.md pages too.
    pub require_frontmatter_on_index: bool,
    /// Inclusive bounds for `effectivenessScore`.
    pub effectiveness_score_range: [f64; 2],
    /// Maximum number of files read concurrently.
    pub concurrency: usize,
    /// Per-rule level overrides keyed by rule id.
    pub rules: BTreeMap<String, RuleLevel>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            required_keys: vec![
                RequiredKey::AnyOf(vec!["title".to_string(), "name".to_string()]),
                RequiredKey::AnyOf(vec!["description".to_string(), "intro".to_string()]),
                RequiredKey::One("type".to_string()),
            ],
            prompt_roots: vec!["prompts".to_string()],
            exclude: Vec::new(),
            check_all_links: false,
            require_frontmatter_on_index: false,
            effectiveness_score_range: [0.0, 5.0],
            concurrency: default_concurrency(),
            rules: BTreeMap::new(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl LintConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Finds the config file for `root`, or uses `explicit` if given.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    /// Loads the config for `root`: file (if any), then environment overrides.
    ///
    /// The result is validated.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match Self::discover(root, explicit) {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `PROMPTLINT_CONCURRENCY`: Maximum concurrent file reads
    /// - `PROMPTLINT_CHECK_ALL_LINKS`: Check every link (true/false)
    /// - `PROMPTLINT_DISABLE`: Comma-separated rule ids to turn off
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_env_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(val) = lookup("PROMPTLINT_CONCURRENCY") {
            self.concurrency = parse_env_value(&val, "PROMPTLINT_CONCURRENCY")?;
        }

        if let Some(val) = lookup("PROMPTLINT_CHECK_ALL_LINKS") {
            self.check_all_links = parse_env_bool(&val, "PROMPTLINT_CHECK_ALL_LINKS")?;
        }

        if let Some(val) = lookup("PROMPTLINT_DISABLE") {
            for rule in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                self.rules.insert(rule.to_string(), RuleLevel::Off);
            }
        }

        Ok(self)
    }

    /// Turns the given rules off.
    pub fn disable_rules<I, S>(&mut self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for rule in rules {
            self.rules.insert(rule.into(), RuleLevel::Off);
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let [min, max] = self.effectiveness_score_range;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::InvalidValue {
                key: "effectiveness_score_range".to_string(),
                message: format!("[{}, {}] is not a valid range", min, max),
            });
        }

        if self
            .required_keys
            .iter()
            .any(|k| k.alternatives().iter().all(|a| a.trim().is_empty()))
        {
            return Err(ConfigError::ValidationFailed(
                "required_keys entries must name at least one key".to_string(),
            ));
        }

        self.rule_settings().map(|_| ())
    }

    /// Resolves the effective severity of every rule.
    pub fn rule_settings(&self) -> Result<RuleSettings, ConfigError> {
        let mut levels: HashMap<RuleId, Option<Severity>> = RuleId::all()
            .into_iter()
            .map(|r| (r, Some(r.default_severity())))
            .collect();

        for (name, level) in &self.rules {
            let rule: RuleId = name
                .parse()
                .map_err(|_| ConfigError::UnknownRule(name.clone()))?;
            levels.insert(rule, level.severity());
        }

        Ok(RuleSettings { levels })
    }
}

/// Effective severity per rule; `None` means the rule is off.
#[derive(Debug, Clone)]
pub struct RuleSettings {
    levels: HashMap<RuleId, Option<Severity>>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            levels: RuleId::all()
                .into_iter()
                .map(|r| (r, Some(r.default_severity())))
                .collect(),
        }
    }
}

impl RuleSettings {
    pub fn severity(&self, rule: RuleId) -> Option<Severity> {
        self.levels
            .get(&rule)
            .copied()
            .unwrap_or(Some(rule.default_severity()))
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        self.severity(rule).is_some()
    }
}

/// Parses an environment variable value into the specified type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// Parses a boolean environment variable value.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = LintConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prompt_roots, vec!["prompts"]);
        assert_eq!(config.required_keys.len(), 3);
        assert_eq!(
            config.required_keys[0].alternatives(),
            vec!["title", "name"]
        );
    }

    #[test]
    fn test_from_file_with_rule_overrides() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("promptlint.yaml");
        std::fs::write(
            &path,
            r#"
required_keys:
  - title
  - [description, intro]
prompt_roots: [prompts, concepts]
check_all_links: true
rules:
  file-naming: off
  duplicate-prompt: error
"#,
        )
        .expect("failed to write config");

        let config = LintConfig::from_file(&path).expect("failed to load");
        assert_eq!(config.required_keys[0], RequiredKey::One("title".to_string()));
        assert!(config.check_all_links);
        assert_eq!(config.effectiveness_score_range, [0.0, 5.0]);

        let settings = config.rule_settings().expect("valid rules");
        assert!(!settings.is_enabled(RuleId::FileNaming));
        assert_eq!(settings.severity(RuleId::DuplicatePrompt), Some(Severity::Error));
        assert_eq!(settings.severity(RuleId::BrokenLink), Some(Severity::Error));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("promptlint.yaml");
        std::fs::write(&path, "no_such_option: 1\n").expect("failed to write config");
        assert!(matches!(
            LintConfig::from_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_unknown_rule_rejected() {
        let mut config = LintConfig::default();
        config.rules.insert("no-such-rule".to_string(), RuleLevel::Off);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownRule(name)) if name == "no-such-rule"
        ));
    }

    #[test]
    fn test_inverted_score_range_rejected() {
        let config = LintConfig {
            effectiveness_score_range: [5.0, 1.0],
            ..LintConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = LintConfig::default()
            .apply_env_with(env(&[
                ("PROMPTLINT_CONCURRENCY", "3"),
                ("PROMPTLINT_CHECK_ALL_LINKS", "yes"),
                ("PROMPTLINT_DISABLE", "file-naming, missing-index"),
            ]))
            .expect("env applies");
        assert_eq!(config.concurrency, 3);
        assert!(config.check_all_links);
        let settings = config.rule_settings().expect("valid rules");
        assert!(!settings.is_enabled(RuleId::FileNaming));
        assert!(!settings.is_enabled(RuleId::MissingIndex));
    }

    #[test]
    fn test_env_invalid_value() {
        let result =
            LintConfig::default().apply_env_with(env(&[("PROMPTLINT_CONCURRENCY", "many")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_discovers_config_in_root() {
        let dir = tempdir().expect("failed to create temp dir");
        std::fs::write(dir.path().join(".promptlint.yaml"), "concurrency: 2\n")
            .expect("failed to write config");
        let found = LintConfig::discover(dir.path(), None).expect("config discovered");
        assert!(found.ends_with(".promptlint.yaml"));
        let config = LintConfig::from_file(&found).expect("loads");
        assert_eq!(config.concurrency, 2);
    }
}
