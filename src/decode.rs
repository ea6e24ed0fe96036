//! Tolerant mapping from model JSON onto the typed model.
//!
//! Nothing here fails. Missing or mistyped fields become the documented
//! default: empty list, empty string, or `None`. The one exception is a
//! factor with no usable `text`: it is dropped from its list rather than
//! kept as an empty factor, since it has nothing to report or align.

use serde_json::Value;

use crate::models::{ComparisonItem, StrategicPair, SwotItem};

/// String field of an object; non-strings render as their JSON text,
/// `null` and missing keys as `""`.
pub fn str_field(v: &Value, key: &str) -> String {
    opt_str(v, key).unwrap_or_default()
}

/// Optional string field; `null`, missing and empty values are `None`.
pub fn opt_str(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `[{text, reasoning}]` under `key`. A bare string element is taken as
/// the text with empty reasoning; elements without text are dropped.
pub fn items(v: &Value, key: &str) -> Vec<SwotItem> {
    array(v, key)
        .iter()
        .filter_map(|el| match el {
            Value::String(s) if !s.trim().is_empty() => Some(SwotItem::new(s.clone(), "")),
            Value::Object(_) => {
                let text = str_field(el, "text");
                if text.is_empty() {
                    None
                } else {
                    Some(SwotItem::new(text, str_field(el, "reasoning")))
                }
            }
            _ => None,
        })
        .collect()
}

/// `[{factor1, factor2, strategy, risk?}]` under `key`. `risk` is read
/// only when `with_risk` is set.
pub fn pairs(v: &Value, key: &str, with_risk: bool) -> Vec<StrategicPair> {
    array(v, key)
        .iter()
        .filter(|el| el.is_object())
        .map(|el| StrategicPair {
            factor1: str_field(el, "factor1"),
            factor2: str_field(el, "factor2"),
            strategy: str_field(el, "strategy"),
            risk: if with_risk { opt_str(el, "risk") } else { None },
        })
        .collect()
}

/// Non-empty strings under `key`, in order.
pub fn string_list(v: &Value, key: &str) -> Vec<String> {
    array(v, key)
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `[{old_text?, new_text?, change_type, reasoning, category}]` under `key`.
pub fn comparison_items(v: &Value, key: &str) -> Vec<ComparisonItem> {
    array(v, key)
        .iter()
        .filter(|el| el.is_object())
        .map(|el| ComparisonItem {
            old_text: opt_str(el, "old_text"),
            new_text: opt_str(el, "new_text"),
            change_type: str_field(el, "change_type"),
            reasoning: str_field(el, "reasoning"),
            category: str_field(el, "category"),
        })
        .collect()
}
