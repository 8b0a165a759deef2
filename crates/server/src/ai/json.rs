//! Pulling JSON objects out of chatty model replies

/// Extract a JSON object from text that might contain markdown code blocks
/// or a sentence of preamble.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    // Direct JSON object
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    // Wrapped in ```json ... ```
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }

    // Wrapped in ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }

    // Outermost braces anywhere in the text
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Parse the first JSON object in `text`.
pub fn parse_json_object<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let candidate = extract_json_object(text)?;
    serde_json::from_str(candidate).ok()
}
