use serde_json::{Map, Value};
use sleuth_core::{contract, DiagnosisResult};

use crate::error::ParseError;

/// Coerce raw model output into a validated diagnosis.
///
/// Tries the (fence-stripped) text as a whole first, then falls back to the
/// outermost `{...}` span for replies that wrap the JSON in prose. Both paths
/// go through the same required-field check.
pub fn normalize(raw: &str) -> Result<DiagnosisResult, ParseError> {
    let cleaned = strip_code_fence(raw);

    let direct = serde_json::from_str::<Value>(cleaned)
        .map_err(ParseError::InvalidJson)
        .and_then(into_diagnosis);
    let err = match direct {
        Ok(result) => return Ok(result),
        Err(e) => e,
    };

    tracing::warn!(
        error = %err,
        "failed to parse model reply directly, attempting to extract JSON object"
    );

    let candidate = extract_json_object(cleaned).ok_or(ParseError::NoJsonObject)?;
    let value: Value = serde_json::from_str(candidate).map_err(ParseError::InvalidJson)?;
    into_diagnosis(value)
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` marker and a trailing ```` ``` ````.
fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = strip_json_tag(rest).trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

fn strip_json_tag(s: &str) -> &str {
    match s.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &s[4..],
        _ => s,
    }
}

/// Greedy first-`{` to last-`}` span.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn into_diagnosis(value: Value) -> Result<DiagnosisResult, ParseError> {
    let Some(obj) = value.as_object() else {
        return Err(ParseError::NoJsonObject);
    };

    let missing = missing_fields(obj);
    if !missing.is_empty() {
        return Err(ParseError::MissingFields(missing));
    }

    serde_json::from_value(value).map_err(ParseError::InvalidField)
}

fn missing_fields(obj: &Map<String, Value>) -> Vec<&'static str> {
    contract::REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !is_present(field, obj.get(*field)))
        .collect()
}

fn is_present(field: &str, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(v) if field == "confidence_score" => v.is_number(),
        Some(Value::String(s)) => !s.trim().is_empty(),
        // Wrong types are reported by the typed deserialization.
        Some(_) => true,
    }
}
