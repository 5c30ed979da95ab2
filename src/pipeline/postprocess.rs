//! Post-processing between the editor pass and the renderer.
//!
//! Three deterministic fix-ups the model cannot be trusted with:
//!
//! 1. Weekly Fund Flow headers are scrubbed down to the fields that report
//!    type actually carries, whatever the model filled in.
//! 2. The header date is overwritten with today's date.
//! 3. The download file name is derived from the user, the bank and the
//!    source file.
//!
//! Every function takes the date explicitly so the rules stay pure.

use crate::config::ReportCategory;
use crate::document::{FieldMap, ReportDocument};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Header fields a Weekly Fund Flow report keeps (compared lowercase).
const FUND_FLOW_HEADER_KEYS: [&str; 6] = ["title", "summary", "body_content", "date", "from", "language"];

/// Acronym used for fund-flow reports when the extraction names no bank.
const FUND_FLOW_DEFAULT_BANK: &str = "GS";

/// Header date format.
pub const HEADER_DATE_FORMAT: &str = "%Y/%m/%d";

/// Blank every header field a fund-flow report must not carry.
pub fn scrub_fund_flow_header(header: &mut FieldMap) {
    for (key, value) in header.iter_mut() {
        if !FUND_FLOW_HEADER_KEYS.contains(&key.to_lowercase().as_str()) {
            *value = Value::String(String::new());
        }
    }
}

/// Overwrite the header date with `today`, regardless of what the model sent.
///
/// Every key spelled `date` in any case is replaced and a lowercase `date`
/// is always present afterwards.
pub fn stamp_date(header: &mut FieldMap, today: NaiveDate) {
    let stamp = Value::String(today.format(HEADER_DATE_FORMAT).to_string());
    for (key, value) in header.iter_mut() {
        if key.eq_ignore_ascii_case("date") {
            *value = stamp.clone();
        }
    }
    header.insert("date".to_string(), stamp);
}

/// Apply the category's header rules and the date stamp to `doc`.
pub fn finalize_document(doc: &mut ReportDocument, category: ReportCategory, today: NaiveDate) {
    if category.is_fund_flow() {
        scrub_fund_flow_header(&mut doc.header_info);
    }
    stamp_date(&mut doc.header_info, today);
}

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());

/// Map an institution name to the acronym used in file names.
///
/// A fixed table covers the usual banks; anything else falls back to its
/// first word with non-word characters removed. The table is intentionally
/// approximate.
pub fn bank_acronym(full_name: &str) -> String {
    let Some(first_word) = full_name.split_whitespace().next() else {
        return "Unknown".to_string();
    };

    let upper = full_name.to_uppercase();
    let table: [(&[&str], &str); 8] = [
        (&["J.P. MORGAN", "JPMORGAN"], "JPM"),
        (&["GOLDMAN"], "GS"),
        (&["MORGAN STANLEY"], "MS"),
        (&["DEUTSCHE"], "DB"),
        (&["CITIC"], "CITICS"),
        (&["AMERICA", "BOFA"], "BofA"),
        (&["UBS"], "UBS"),
        (&["HSBC"], "HSBC"),
    ];
    for (needles, acronym) in table {
        if needles.iter().any(|n| upper.contains(n)) {
            return acronym.to_string();
        }
    }

    RE_NON_WORD.replace_all(first_word, "").into_owned()
}

/// `meta.institution` from the analyst pass output, if any.
pub fn institution_of(analyst_output: &Value) -> Option<&str> {
    analyst_output
        .get("meta")
        .and_then(|m| m.get("institution"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Build the download file name for a finished report.
///
/// * Weekly Fund Flow: `WeeklyFlow_{user}_{bank}_{YYYYMMDD}.docx`
/// * otherwise: `{category}_{user}_{bank}_{source stem}.docx`
///
/// In both, spaces become `_` and slashes become `-`.
pub fn report_file_name(
    category: ReportCategory,
    user_name: &str,
    institution: Option<&str>,
    source_file_name: &str,
    today: NaiveDate,
) -> String {
    let name = if category.is_fund_flow() {
        let bank = institution
            .map(bank_acronym)
            .unwrap_or_else(|| FUND_FLOW_DEFAULT_BANK.to_string());
        format!(
            "WeeklyFlow_{}_{}_{}.docx",
            user_name,
            bank,
            today.format("%Y%m%d")
        )
    } else {
        let bank = bank_acronym(institution.unwrap_or("Unknown"));
        let stem = file_stem(source_file_name);
        format!("{}_{}_{}_{}.docx", category.label(), user_name, bank, stem)
    };
    name.replace(' ', "_").replace('/', "-")
}

/// File name without its last extension (`report1.pdf` → `report1`).
fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}
