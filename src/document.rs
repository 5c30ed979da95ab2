//! The report document produced by the LLM pipeline and consumed by the
//! renderer, plus the result type handed back to callers.
//!
//! The model's JSON is only loosely structured: field names drift between
//! `category` and `Category`, scalars sometimes arrive as numbers, and
//! `body_content` occasionally comes back as one newline-separated string.
//! [`ReportDocument::from_value`] absorbs that drift once so the renderer can
//! work with a fixed shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Header / footer block: field name to scalar value.
pub type FieldMap = Map<String, Value>;

/// A report as returned by the editor pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Title block fields (`category`, `date`, `title`, ...), all optional.
    #[serde(default)]
    pub header_info: FieldMap,

    /// Body paragraphs; each may contain `**...**` highlighted spans.
    #[serde(default)]
    pub body_content: Vec<String>,

    /// Closing fields (`stock`, `rating`, `price_target`).
    #[serde(default)]
    pub footer_info: FieldMap,
}

impl ReportDocument {
    /// Build a document from the normalized editor output.
    ///
    /// Missing blocks become empty; a string `body_content` is split on
    /// newlines with blank lines dropped; non-string paragraphs are rendered
    /// through their JSON text.
    pub fn from_value(value: &Value) -> Self {
        let header_info = value
            .get("header_info")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let footer_info = value
            .get("footer_info")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let body_content = match value.get("body_content") {
            Some(Value::String(s)) => s
                .split('\n')
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => items.iter().map(scalar_text).collect(),
            _ => Vec::new(),
        };

        Self {
            header_info,
            body_content,
            footer_info,
        }
    }
}

/// Look up the first candidate key that is present and non-null.
///
/// Returns the value's text (strings verbatim, other scalars through their
/// JSON form). `None` when no candidate is present.
pub fn lookup_field(map: &FieldMap, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !v.is_null())
        .map(scalar_text)
}

/// Text form of a JSON value as it should appear in the document.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A finished report on disk.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    /// Download name, e.g. `Equity_Charlotte_GS_report1.docx`.
    pub file_name: String,
    /// Where the `.docx` was written.
    pub path: PathBuf,
    /// The document as rendered (after date stamping and header scrubbing).
    pub document: ReportDocument,
}
