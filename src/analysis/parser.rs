//! Decoding of the vision model's reply into an [`AnalysisResult`].
//!
//! The reply must be a JSON object with the five fields named in
//! [`REQUIRED_FIELDS`], optionally wrapped in a markdown code fence.
//! Anything else is a [`ParseError`]; no field is ever defaulted.

use super::types::{AnalysisResult, CategoryBucket, CategoryLabel, ComponentDistribution};
use crate::error::ParseError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const FIELD_SUMMARY: &str = "component_summary";
pub const FIELD_DISTRIBUTION: &str = "component_distribution";
pub const FIELD_SWARM_ACTION: &str = "swarm_action";
pub const FIELD_SORTER_DECISION: &str = "sorter_decision";
pub const FIELD_REASONING: &str = "reasoning";

pub const REQUIRED_FIELDS: [&str; 5] = [
    FIELD_SUMMARY,
    FIELD_DISTRIBUTION,
    FIELD_SWARM_ACTION,
    FIELD_SORTER_DECISION,
    FIELD_REASONING,
];

const FENCE: &str = "```";

/// Parse a raw model reply
pub fn parse(raw: &str) -> Result<AnalysisResult, ParseError> {
    let body = strip_code_fence(raw);
    debug!("Parsing analysis reply ({} bytes after fence strip)", body.len());

    let value: Value = serde_json::from_str(body).map_err(|e| {
        warn!("Analysis reply is not JSON: {}", e);
        ParseError::InvalidJson {
            details: e.to_string(),
        }
    })?;

    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    for key in object.keys() {
        if !REQUIRED_FIELDS.contains(&key.as_str()) {
            debug!("Ignoring unexpected field '{}' in analysis reply", key);
        }
    }

    let summary = required_string(object, FIELD_SUMMARY)?;
    let distribution = required_distribution(object)?;
    let swarm_action = required_string(object, FIELD_SWARM_ACTION)?;
    let sorter_decision = required_string(object, FIELD_SORTER_DECISION)?;
    let reasoning = required_string(object, FIELD_REASONING)?;

    for label in distribution.unknown_labels() {
        debug!("Passing through non-schema category '{}'", label);
    }

    Ok(AnalysisResult::new(
        summary,
        distribution,
        swarm_action,
        sorter_decision,
        reasoning,
    ))
}

/// Remove a leading fence (with optional language tag) and a trailing fence.
///
/// Each side is handled independently so a reply with only one marker is
/// still accepted. Unfenced text is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        // The tag may be followed by a newline or sit directly against the payload
        let tag_end = rest.find(|c: char| !is_tag_char(c)).unwrap_or(rest.len());
        let after_tag = &rest[tag_end..];
        let body = after_tag.trim_start();
        let tagged = tag_end > 0
            && (after_tag.starts_with(['\n', '\r'])
                || body.is_empty()
                || body.starts_with(['{', '['])
                || body.starts_with(FENCE));

        text = if tagged { body } else { rest.trim_start() };
    }

    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ParseError> {
    object.get(field).ok_or(ParseError::MissingField { field })
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, ParseError> {
    required(object, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ParseError::WrongType {
            field: field.to_string(),
            expected: "a string",
        })
}

fn required_distribution(object: &Map<String, Value>) -> Result<ComponentDistribution, ParseError> {
    let buckets = required(object, FIELD_DISTRIBUTION)?
        .as_object()
        .ok_or_else(|| ParseError::WrongType {
            field: FIELD_DISTRIBUTION.to_string(),
            expected: "an object of category arrays",
        })?;

    let mut parsed = Vec::with_capacity(buckets.len());
    for (label, items) in buckets {
        let field = format!("{}.{}", FIELD_DISTRIBUTION, label);
        let items = items.as_array().ok_or_else(|| ParseError::WrongType {
            field: field.clone(),
            expected: "an array of strings",
        })?;

        let components = items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(ParseError::WrongType {
                field,
                expected: "an array of strings",
            })?;

        parsed.push(CategoryBucket {
            label: CategoryLabel::parse(label),
            components,
        });
    }

    Ok(ComponentDistribution::from_buckets(parsed))
}
