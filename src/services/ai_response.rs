use serde_json::Value;

pub(crate) fn message_content(body: &Value) -> Option<&str> {
    body.get("choices")?.get(0)?.get("message")?.get("content")?.as_str()
}

/// Models occasionally wrap JSON in markdown fences despite instructions.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}
