//! YAML frontmatter splitting and schema.
//!
//! A frontmatter block is the YAML text between a leading `---` line and the
//! next `---` (or `...`) line. Field values are kept as strings and lists of
//! strings; vocabulary and format checks live in the linter so that a
//! malformed value is reported instead of rejecting the whole block.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::DocumentError;

/// Keys this crate understands. Anything else is preserved in `extra`.
pub const KNOWN_KEYS: &[&str] = &[
    "title",
    "shortTitle",
    "intro",
    "description",
    "name",
    "type",
    "difficulty",
    "audience",
    "platforms",
    "platform",
    "topics",
    "tags",
    "author",
    "version",
    "date",
    "governance_tags",
    "governanceTags",
    "dataClassification",
    "data_classification",
    "reviewStatus",
    "review_status",
    "effectivenessScore",
    "effectiveness_score",
];

/// Raw frontmatter text with its location in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrontmatterBlock {
    /// YAML between the delimiters.
    pub raw: String,
    /// 1-based line of the opening delimiter.
    pub start_line: usize,
    /// 1-based line of the closing delimiter.
    pub end_line: usize,
}

impl FrontmatterBlock {
    /// Returns the file line on which `key` is declared, if it is a top-level key.
    pub fn line_of_key(&self, key: &str) -> Option<usize> {
        self.raw.lines().enumerate().find_map(|(idx, line)| {
            let rest = line.strip_prefix(key)?;
            if rest.trim_start().starts_with(':') {
                Some(self.start_line + 1 + idx)
            } else {
                None
            }
        })
    }
}

/// Result of splitting a file into its leading frontmatter and the body.
#[derive(Debug, Clone)]
pub struct SplitDocument<'a> {
    pub frontmatter: Option<FrontmatterBlock>,
    pub body: &'a str,
    /// Number of file lines preceding `body`.
    pub body_line_offset: usize,
}

/// Returns true if `line` is a frontmatter delimiter (`---`).
pub(crate) fn is_open_delimiter(line: &str) -> bool {
    line.trim_end() == "---"
}

fn is_close_delimiter(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "---" || trimmed == "..."
}

/// Splits the leading frontmatter block off `content`.
///
/// A byte-order mark and blank lines before the opening delimiter are
/// tolerated. An opening delimiter without a closing one is treated as
/// ordinary Markdown and yields no frontmatter.
pub fn split_frontmatter(content: &str) -> SplitDocument<'_> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let no_frontmatter = SplitDocument {
        frontmatter: None,
        body: content,
        body_line_offset: 0,
    };

    let mut offset = 0usize;
    let mut lines = content.split_inclusive('\n').enumerate();

    let mut open_idx = None;
    for (idx, line) in lines.by_ref() {
        offset += line.len();
        if line.trim().is_empty() {
            continue;
        }
        if is_open_delimiter(line.trim_end_matches(['\n', '\r'])) {
            open_idx = Some(idx);
        }
        break;
    }
    let Some(open_idx) = open_idx else {
        return no_frontmatter;
    };

    let yaml_start = offset;
    for (idx, line) in lines {
        let stripped = line.trim_end_matches(['\n', '\r']);
        if is_close_delimiter(stripped) {
            let raw = content[yaml_start..offset].to_string();
            let body_start = offset + line.len();
            return SplitDocument {
                frontmatter: Some(FrontmatterBlock {
                    raw,
                    start_line: open_idx + 1,
                    end_line: idx + 1,
                }),
                body: &content[body_start..],
                body_line_offset: idx + 1,
            };
        }
        offset += line.len();
    }

    no_frontmatter
}

/// Typed view of the frontmatter fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontmatterFields {
    #[serde(default, deserialize_with = "scalar_string")]
    pub title: Option<String>,
    #[serde(default, rename = "shortTitle", deserialize_with = "scalar_string")]
    pub short_title: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub intro: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "scalar_string")]
    pub doc_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub audience: Vec<String>,
    #[serde(default, alias = "platform", deserialize_with = "string_list")]
    pub platforms: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub topics: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub date: Option<String>,
    #[serde(default, alias = "governanceTags", deserialize_with = "string_list")]
    pub governance_tags: Vec<String>,
    #[serde(
        default,
        rename = "dataClassification",
        alias = "data_classification",
        deserialize_with = "scalar_string"
    )]
    pub data_classification: Option<String>,
    #[serde(
        default,
        rename = "reviewStatus",
        alias = "review_status",
        deserialize_with = "scalar_string"
    )]
    pub review_status: Option<String>,
    #[serde(
        default,
        rename = "effectivenessScore",
        alias = "effectiveness_score",
        deserialize_with = "scalar_string"
    )]
    pub effectiveness_score: Option<String>,
}

/// A known key whose value cannot be read as a scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeProblem {
    pub field: String,
    pub message: String,
}

impl From<ShapeProblem> for DocumentError {
    fn from(problem: ShapeProblem) -> Self {
        DocumentError::FieldShape {
            field: problem.field,
            message: problem.message,
        }
    }
}

/// Parsed frontmatter: typed fields plus the raw mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub fields: FrontmatterFields,
    /// Top-level mapping, minus any key reported as a [`ShapeProblem`].
    pub raw: Mapping,
}

impl Frontmatter {
    /// Parses a YAML frontmatter body, rejecting any field with a bad shape.
    ///
    /// An empty block parses as an empty mapping. Duplicate keys, which
    /// appear when two blocks are concatenated, are YAML errors.
    pub fn parse(yaml: &str) -> Result<Self, DocumentError> {
        let (frontmatter, mut problems) = Self::parse_lenient(yaml)?;
        if problems.is_empty() {
            Ok(frontmatter)
        } else {
            Err(problems.swap_remove(0).into())
        }
    }

    /// Parses a YAML frontmatter body, dropping fields with a bad shape.
    ///
    /// Only YAML syntax errors and non-mapping documents fail. A known key
    /// whose value has the wrong shape is removed from the mapping and
    /// returned as a [`ShapeProblem`], so the remaining fields stay usable
    /// and the removed key reads as absent.
    pub fn parse_lenient(yaml: &str) -> Result<(Self, Vec<ShapeProblem>), DocumentError> {
        let value: Value = if yaml.trim().is_empty() {
            Value::Mapping(Mapping::new())
        } else {
            serde_yaml::from_str(yaml)?
        };

        let mut raw = match value {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            other => return Err(DocumentError::NotAMapping(value_kind(&other).to_string())),
        };

        let problems = shape_problems(&raw);
        for problem in &problems {
            raw.remove(problem.field.as_str());
        }

        let fields = FrontmatterFields::deserialize(Value::Mapping(raw.clone())).map_err(|e| {
            DocumentError::FieldShape {
                field: "frontmatter".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok((Self { fields, raw }, problems))
    }

    /// Returns true if `key` is present with a non-empty value.
    pub fn has_value(&self, key: &str) -> bool {
        match self.raw.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Sequence(items)) => !items.is_empty(),
            Some(Value::Mapping(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// Keys not in [`KNOWN_KEYS`].
    pub fn extra(&self) -> BTreeMap<String, Value> {
        self.raw
            .iter()
            .filter_map(|(k, v)| {
                let key = k.as_str()?;
                if KNOWN_KEYS.contains(&key) {
                    None
                } else {
                    Some((key.to_string(), v.clone()))
                }
            })
            .collect()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Keys whose value is a list of scalars (or one comma-separated scalar).
const LIST_KEYS: &[&str] = &[
    "audience",
    "platforms",
    "platform",
    "topics",
    "tags",
    "governance_tags",
    "governanceTags",
];

/// Finds known keys whose value shape the typed view cannot hold.
fn shape_problems(raw: &Mapping) -> Vec<ShapeProblem> {
    raw.iter()
        .filter_map(|(key, value)| {
            let key = key.as_str()?;
            if !KNOWN_KEYS.contains(&key) || matches!(value, Value::Null) {
                return None;
            }
            let message = match value {
                Value::Sequence(items) if LIST_KEYS.contains(&key) => items
                    .iter()
                    .find(|item| scalar_to_string(item).is_none())
                    .map(|item| format!("list items must be scalars, found {}", value_kind(item))),
                other if scalar_to_string(other).is_none() => Some(format!(
                    "expected {}, found {}",
                    if LIST_KEYS.contains(&key) {
                        "a list or a scalar"
                    } else {
                        "a scalar"
                    },
                    value_kind(other)
                )),
                _ => None,
            }?;
            Some(ShapeProblem {
                field: key.to_string(),
                message,
            })
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(&value).map(Some).ok_or_else(|| {
            de::Error::custom(format!("expected a scalar, found {}", value_kind(&value)))
        }),
    }
}

/// Accepts a list of scalars, or a single comma-separated scalar.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar_to_string(item).ok_or_else(|| {
                    de::Error::custom(format!(
                        "list items must be scalars, found {}",
                        value_kind(item)
                    ))
                })
            })
            .collect(),
        Some(value) => {
            let joined = scalar_to_string(&value).ok_or_else(|| {
                de::Error::custom(format!(
                    "expected a list or a scalar, found {}",
                    value_kind(&value)
                ))
            })?;
            Ok(joined
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect())
        }
    }
}
