//! Frontmatter presence, mandatory keys and field vocabularies.

use chrono::{DateTime, NaiveDate};

use super::{DiagnosticSink, DocumentCheck, LintContext, RuleId};
use crate::document::{FrontmatterBlock, FrontmatterFields, PromptDocument};
use crate::error::DocumentError;

/// Accepted `type` values.
const DOC_TYPES: &[&str] = &["how_to", "reference", "conceptual", "tutorial", "quickstart"];

const DIFFICULTIES: &[&str] = &["beginner", "intermediate", "advanced"];

const REVIEW_STATUSES: &[&str] = &["draft", "in_review", "approved", "deprecated"];

const DATA_CLASSIFICATIONS: &[&str] = &["public", "internal", "confidential", "restricted"];

/// Lowercases and maps `-` and spaces to `_` so `how-to` matches `how_to`.
fn normalize_vocab(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Accepts `X`, `X.Y` and `X.Y.Z` with an optional leading `v` and an
/// optional pre-release or build suffix.
pub fn is_semverish(version: &str) -> bool {
    let v = version.trim();
    let v = v.strip_prefix(['v', 'V']).unwrap_or(v);
    let core_end = v.find(['-', '+']).unwrap_or(v.len());
    let (core, suffix) = v.split_at(core_end);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return false;
    }
    let mut padded = parts.clone();
    while padded.len() < 3 {
        padded.push("0");
    }
    semver::Version::parse(&format!("{}{}", padded.join("."), suffix)).is_ok()
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn is_valid_date(date: &str) -> bool {
    let d = date.trim();
    NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(d).is_ok()
}

/// Checks frontmatter presence, YAML validity, mandatory keys and values.
pub struct FrontmatterCheck;

impl DocumentCheck for FrontmatterCheck {
    fn name(&self) -> &'static str {
        "frontmatter"
    }

    fn check(&self, doc: &PromptDocument, ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        let Some(block) = &doc.frontmatter_block else {
            if !doc.is_index_page() || ctx.config.require_frontmatter_on_index {
                sink.emit(
                    RuleId::MissingFrontmatter,
                    doc.path.clone(),
                    Some(1),
                    "file has no YAML frontmatter block",
                );
            }
            return;
        };

        if let Some(error) = &doc.frontmatter_error {
            sink.emit(
                RuleId::InvalidFrontmatter,
                doc.path.clone(),
                Some(block.start_line),
                error.clone(),
            );
            return;
        }

        let Some(frontmatter) = &doc.frontmatter else {
            return;
        };

        // An unusable mandatory key with no usable alternative is reported as missing below.
        let counts_as_missing = |field: &str| {
            ctx.config.required_keys.iter().any(|r| {
                let alternatives = r.alternatives();
                alternatives.contains(&field)
                    && !alternatives.iter().any(|key| frontmatter.has_value(key))
            })
        };
        for problem in &doc.shape_problems {
            if counts_as_missing(&problem.field) {
                continue;
            }
            sink.emit(
                RuleId::InvalidFieldValue,
                doc.path.clone(),
                block.line_of_key(&problem.field).or(Some(block.start_line)),
                DocumentError::from(problem.clone()).to_string(),
            );
        }

        for required in &ctx.config.required_keys {
            let alternatives = required.alternatives();
            if alternatives.iter().any(|key| frontmatter.has_value(key)) {
                continue;
            }
            let mut message = match alternatives.as_slice() {
                [only] => format!("missing required frontmatter key '{}'", only),
                [first, rest @ ..] => format!(
                    "missing required frontmatter key '{}' (or {})",
                    first,
                    rest.iter()
                        .map(|k| format!("'{}'", k))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                [] => continue,
            };
            let unusable = doc
                .shape_problems
                .iter()
                .find(|p| alternatives.contains(&p.field.as_str()));
            let line = match unusable {
                Some(problem) => {
                    message.push_str(&format!(
                        "; '{}' is present but {}",
                        problem.field, problem.message
                    ));
                    block.line_of_key(&problem.field).or(Some(block.start_line))
                }
                None => Some(block.start_line),
            };
            sink.emit(RuleId::MissingRequiredKey, doc.path.clone(), line, message);
        }

        if sink.is_enabled(RuleId::InvalidFieldValue) {
            check_field_values(doc, block, &frontmatter.fields, ctx, sink);
        }
    }
}

fn check_field_values(
    doc: &PromptDocument,
    block: &FrontmatterBlock,
    fields: &FrontmatterFields,
    ctx: &LintContext<'_>,
    sink: &mut DiagnosticSink<'_>,
) {
    let line_of = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| block.line_of_key(k))
            .or(Some(block.start_line))
    };

    let vocabularies: [(&[&str], &str, &Option<String>, &[&str]); 4] = [
        (&["type"], "type", &fields.doc_type, DOC_TYPES),
        (&["difficulty"], "difficulty", &fields.difficulty, DIFFICULTIES),
        (
            &["reviewStatus", "review_status"],
            "reviewStatus",
            &fields.review_status,
            REVIEW_STATUSES,
        ),
        (
            &["dataClassification", "data_classification"],
            "dataClassification",
            &fields.data_classification,
            DATA_CLASSIFICATIONS,
        ),
    ];

    for (keys, label, value, allowed) in vocabularies {
        let Some(value) = value else { continue };
        if !allowed.contains(&normalize_vocab(value).as_str()) {
            sink.emit(
                RuleId::InvalidFieldValue,
                doc.path.clone(),
                line_of(keys),
                format!(
                    "{} '{}' is not one of: {}",
                    label,
                    value,
                    allowed.join(", ")
                ),
            );
        }
    }

    if let Some(version) = &fields.version {
        if !is_semverish(version) {
            sink.emit(
                RuleId::InvalidFieldValue,
                doc.path.clone(),
                line_of(&["version"]),
                format!("version '{}' is not a semantic version (X.Y.Z)", version),
            );
        }
    }

    if let Some(date) = &fields.date {
        if !is_valid_date(date) {
            sink.emit(
                RuleId::InvalidFieldValue,
                doc.path.clone(),
                line_of(&["date"]),
                format!("date '{}' is not a YYYY-MM-DD date", date),
            );
        }
    }

    if let Some(score) = &fields.effectiveness_score {
        let [min, max] = ctx.config.effectiveness_score_range;
        let keys = &["effectivenessScore", "effectiveness_score"];
        match score.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= min && value <= max => {}
            Ok(value) => sink.emit(
                RuleId::InvalidFieldValue,
                doc.path.clone(),
                line_of(keys),
                format!(
                    "effectivenessScore {} is outside the range [{}, {}]",
                    value, min, max
                ),
            ),
            Err(_) => sink.emit(
                RuleId::InvalidFieldValue,
                doc.path.clone(),
                line_of(keys),
                format!("effectivenessScore '{}' is not a number", score),
            ),
        }
    }
}
