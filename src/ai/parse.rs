use serde_json::Value;

use crate::error::{AppError, Result};

/// Best-effort JSON extraction from model output.
///
/// The model is asked to answer with bare JSON but routinely wraps it in
/// prose, markdown fences, or over-escaped quoting. Normalize whitespace,
/// undo escaped quotes, then parse whatever sits between the first `{` and
/// the last `}`. Deliberately lenient: tightening this rejects otherwise
/// usable responses.
pub fn parse_json_string(content: &str) -> Result<Value> {
    let sanitized = content
        .replace('\n', " ")
        .replace('\t', " ")
        .replace("\\'", "'")
        .replace("\\\"", "\"");

    let start = sanitized.find('{');
    let end = sanitized.rfind('}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&sanitized[start..=end])
            .map_err(|e| AppError::UnparsableContent(e.to_string())),
        _ => Err(AppError::UnparsableContent(
            "no JSON object found in content".to_string(),
        )),
    }
}

/// Pull the `summary` field out of a `{"summary": "..."}` style answer.
pub fn extract_summary(content: &str) -> Result<String> {
    let value = parse_json_string(content)?;
    value
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::UnparsableContent("missing summary field".to_string()))
}

/// Pull the `tags` list out of a `{"tags": [...]}` style answer.
pub fn extract_tags(content: &str) -> Result<Vec<String>> {
    let value = parse_json_string(content)?;
    value
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .ok_or_else(|| AppError::UnparsableContent("missing tags field".to_string()))
}
