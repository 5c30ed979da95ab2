//! Response normalisation: recover a JSON object from raw LLM job output.
//!
//! Models asked for "JSON only" still wrap it in prose, in ```` ```json ````
//! fences, or the job service nests it under `content` / `output` /
//! `result`. This is a best-effort heuristic extractor, not a parser: after
//! unwrapping and fence stripping it takes everything from the first `{` to
//! the last `}` and parses that. Prose that itself contains braces defeats
//! it.
//!
//! [`JsonExtractor`] is the seam for a stricter strategy; the job client only
//! ever talks to the trait.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Envelope keys checked, in priority order, for a nested textual payload.
const PAYLOAD_KEYS: [&str; 3] = ["content", "output", "result"];

/// Top-level keys that mark a mapping as already-final output.
const REPORT_KEYS: [&str; 2] = ["header_info", "meta"];

/// Turns a raw job result into a parsed JSON value.
pub trait JsonExtractor: Send + Sync {
    fn extract(&self, raw: &Value) -> Option<Value>;
}

/// The first-`{` / last-`}` heuristic described in the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct BraceScanExtractor;

impl JsonExtractor for BraceScanExtractor {
    fn extract(&self, raw: &Value) -> Option<Value> {
        normalize(raw)
    }
}

/// Recover a JSON value from `raw`, or `None` if nothing parses.
pub fn normalize(raw: &Value) -> Option<Value> {
    let text = match raw {
        Value::Object(map) => {
            let nested = PAYLOAD_KEYS
                .iter()
                .filter_map(|k| map.get(*k))
                .find(|v| is_truthy(v));
            match nested {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None if REPORT_KEYS.iter().any(|k| map.contains_key(*k)) => {
                    return Some(raw.clone());
                }
                None => raw.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };

    extract_json_text(&text)
}

/// Strip code fences and parse the outermost brace-delimited region of `text`.
pub fn extract_json_text(text: &str) -> Option<Value> {
    let stripped = strip_code_fences(text);

    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str(&stripped[start..=end]) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Brace-delimited region is not valid JSON: {e}");
            None
        }
    }
}

static RE_CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*").unwrap());

fn strip_code_fences(text: &str) -> String {
    RE_CODE_FENCE.replace_all(text, "").into_owned()
}

/// Emptiness as the job service means it: null, `""`, `false`, `0`, `[]`
/// and `{}` all count as "not there".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_in_prose() {
        let raw = json!("Sure! ```json\n{\"a\":1}\n``` thanks");
        assert_eq!(normalize(&raw), Some(json!({"a": 1})));
    }

    #[test]
    fn bare_fence_without_language_tag() {
        let raw = json!("```\n{\"b\": [1, 2]}\n```");
        assert_eq!(normalize(&raw), Some(json!({"b": [1, 2]})));
    }

    #[test]
    fn no_braces_is_none() {
        assert_eq!(normalize(&json!("no braces here")), None);
    }

    #[test]
    fn invalid_json_region_is_none() {
        assert_eq!(normalize(&json!("{not json}")), None);
    }

    #[test]
    fn closing_brace_before_opening_is_none() {
        assert_eq!(normalize(&json!("} oops {")), None);
    }

    #[test]
    fn nested_payload_keys_in_priority_order() {
        let raw = json!({
            "content": "",
            "output": "result: {\"from\": \"output\"}",
            "result": "{\"from\": \"result\"}"
        });
        assert_eq!(normalize(&raw), Some(json!({"from": "output"})));
    }

    #[test]
    fn nested_object_payload_is_serialised_then_parsed() {
        let raw = json!({"result": {"header_info": {"title": "T"}}});
        assert_eq!(normalize(&raw), Some(json!({"header_info": {"title": "T"}})));
    }

    #[test]
    fn final_mapping_is_returned_as_is() {
        let raw = json!({"header_info": {"title": "T"}, "body_content": []});
        assert_eq!(normalize(&raw), Some(raw.clone()));

        let meta = json!({"meta": {"institution": "Goldman Sachs"}});
        assert_eq!(normalize(&meta), Some(meta.clone()));
    }

    #[test]
    fn unrelated_mapping_round_trips_through_text() {
        let raw = json!({"x": 1});
        assert_eq!(normalize(&raw), Some(json!({"x": 1})));
    }

    #[test]
    fn null_is_none() {
        assert_eq!(normalize(&Value::Null), None);
    }

    #[test]
    fn outermost_region_spans_nested_objects() {
        let raw = json!("prefix {\"a\": {\"b\": 2}} suffix");
        assert_eq!(normalize(&raw), Some(json!({"a": {"b": 2}})));
    }

    #[test]
    fn trait_object_delegates() {
        let extractor: Box<dyn JsonExtractor> = Box::new(BraceScanExtractor);
        assert_eq!(extractor.extract(&json!("{\"ok\": true}")), Some(json!({"ok": true})));
    }
}
