//! Lenient extraction of a JSON object from model output.

use serde_json::Value;

/// Parse a JSON object out of `text`.
///
/// Tries, in order: the trimmed text as-is; the text with a leading
/// ```` ```json ```` / ```` ``` ```` fence and trailing fence removed; the
/// first balanced `{...}` span. The result must be a JSON object.
pub fn extract_json(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();

    let mut last_err = match parse_object(trimmed) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    let unfenced = strip_fences(trimmed);
    if unfenced != trimmed {
        match parse_object(unfenced) {
            Ok(v) => return Ok(v),
            Err(e) => last_err = e,
        }
    }

    if let Some(span) = first_object_span(unfenced) {
        match parse_object(span) {
            Ok(v) => return Ok(v),
            Err(e) => last_err = e,
        }
    }

    Err(last_err)
}

fn parse_object(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(v @ Value::Object(_)) => Ok(v),
        Ok(other) => Err(format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn strip_fences(text: &str) -> &str {
    let mut s = text;
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// First `{` through its matching `}`, ignoring braces inside string
/// literals. `None` if no opening brace or the object never closes.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
