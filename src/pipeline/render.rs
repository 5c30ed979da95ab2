//! Document layout: [`ReportDocument`] → an inspectable [`Layout`].
//!
//! Rendering happens in two steps. This module decides *what* goes on the
//! page (which header lines, which runs are highlighted, whether there is a
//! footer or a cover image); [`crate::pipeline::encode`] then serialises that
//! layout to `.docx`. No Word types appear in this module.
//!
//! The two report layouts differ only in data, collected in one
//! [`StyleProfile`] per [`RenderStyle`]:
//!
//! | Setting          | Standard          | Fund flow            |
//! |------------------|-------------------|----------------------|
//! | base size        | 11 pt             | 12 pt                |
//! | space before     | 12 pt             | 6 pt                 |
//! | line spacing     | 1.07              | 1.0                  |
//! | header labels    | bold, non-empty only | plain, every label |
//! | subtitle line    | yes               | no                   |
//! | plain body runs  | black             | uncoloured           |
//! | blank paragraphs | kept              | skipped              |
//! | footer           | yes               | no                   |

use crate::config::RenderStyle;
use crate::document::{lookup_field, ReportDocument};
use crate::error::ReportError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Accent colour for highlighted spans and the footer, RGB(192, 0, 0).
pub const ACCENT_COLOR: &str = "C00000";

/// Literal line that separates the header block from the body.
pub const CONTENT_MARKER: &str = "#Content#";

/// Prefix of the subtitle line under the content marker.
pub const WSH_PREFIX: &str = "Wall Street Highlights-";

/// Space above the cover image: 24 pt in twips.
pub const IMAGE_SPACING_BEFORE: u16 = 480;

/// One header line: the printed label and the keys that may carry its value,
/// checked in order.
#[derive(Debug, Clone, Copy)]
pub struct HeaderField {
    pub label: &'static str,
    pub keys: &'static [&'static str],
}

const fn field(label: &'static str, keys: &'static [&'static str]) -> HeaderField {
    HeaderField { label, keys }
}

/// Everything that differs between the two layouts.
#[derive(Debug)]
pub struct StyleProfile {
    /// Base font size in half-points.
    pub font_half_points: usize,
    /// Paragraph spacing above, in twips.
    pub spacing_before: u16,
    /// Paragraph spacing below, in twips.
    pub spacing_after: u16,
    /// Line spacing in 240ths of a line (240 = single).
    pub line: u16,
    pub header_fields: &'static [HeaderField],
    /// Emit `#Label# ` even when the value is empty.
    pub emit_empty_header: bool,
    /// Header lines and the content marker are bold.
    pub bold_header: bool,
    /// Follow the content marker with `Wall Street Highlights-<category>`.
    pub wsh_subtitle: bool,
    /// Colour of non-highlighted body text; `None` leaves it unset.
    pub plain_run_color: Option<&'static str>,
    /// Drop body paragraphs that are only whitespace.
    pub skip_blank_paragraphs: bool,
    pub include_footer: bool,
}

const STANDARD_HEADER: &[HeaderField] = &[
    field("Category", &["category", "Category"]),
    field("Date", &["date", "Date"]),
    field("Title", &["title", "Title"]),
    field("Summary", &["summary", "Summary"]),
    field("Tags", &["tags", "Tags"]),
    field("Stock", &["stock", "Stock"]),
    field("Stock Rating", &["rating", "stock_rating", "Stock Rating"]),
    field("12m Price Target", &["price_target", "12m Price Target"]),
];

const FUND_FLOW_HEADER: &[HeaderField] = &[
    field("Category", &["category", "Category"]),
    field("Date", &["date", "Date"]),
    field("Title", &["title", "Title"]),
    field("Summary", &["summary", "Summary"]),
    field("From", &["from", "From"]),
    field("Tags", &["tags", "Tags"]),
    field(
        "Recommend Expire Time",
        &["recommend_expire_time", "Recommend Expire Time"],
    ),
    field("Language", &["language", "Language"]),
    field("Stock", &["stock", "Stock"]),
    field("Stock Rating", &["rating", "stock_rating", "Stock Rating"]),
    field("12m Price Target", &["price_target", "12m Price Target"]),
    field(
        "Related Stock List",
        &["related_stock_list", "Related Stock List"],
    ),
    field(
        "Related Stock Rating",
        &["related_stock_rating", "Related Stock Rating"],
    ),
];

const FOOTER_FIELDS: &[HeaderField] = &[
    field("Stock", &["stock", "Stock"]),
    field("Stock Rating", &["rating", "stock_rating", "Stock Rating"]),
    field("12m Price Target", &["price_target", "12m Price Target"]),
];

static STANDARD_PROFILE: StyleProfile = StyleProfile {
    font_half_points: 22,
    spacing_before: 240,
    spacing_after: 0,
    line: 257,
    header_fields: STANDARD_HEADER,
    emit_empty_header: false,
    bold_header: true,
    wsh_subtitle: true,
    plain_run_color: Some("000000"),
    skip_blank_paragraphs: false,
    include_footer: true,
};

static FUND_FLOW_PROFILE: StyleProfile = StyleProfile {
    font_half_points: 24,
    spacing_before: 120,
    spacing_after: 0,
    line: 240,
    header_fields: FUND_FLOW_HEADER,
    emit_empty_header: true,
    bold_header: false,
    wsh_subtitle: false,
    plain_run_color: None,
    skip_blank_paragraphs: true,
    include_footer: false,
};

impl RenderStyle {
    pub fn profile(self) -> &'static StyleProfile {
        match self {
            RenderStyle::Standard => &STANDARD_PROFILE,
            RenderStyle::FundFlow => &FUND_FLOW_PROFILE,
        }
    }
}

/// Caller-side choices for one render call.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub style: RenderStyle,
    /// Category printed in the subtitle line; falls back to the header.
    pub category_override: Option<String>,
    /// Cover image appended at the end. Missing files are ignored.
    pub image: Option<PathBuf>,
}

// ── Layout model ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Justify,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    /// Hex RGB without `#`; `None` keeps the document default.
    pub color: Option<&'static str>,
}

impl TextRun {
    fn new(text: impl Into<String>, bold: bool, color: Option<&'static str>) -> Self {
        Self {
            text: text.into(),
            bold,
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph { runs: Vec<TextRun>, align: Alignment },
    Image { path: PathBuf, align: Alignment },
}

impl Block {
    /// Concatenated run text; empty for images.
    pub fn text(&self) -> String {
        match self {
            Block::Paragraph { runs, .. } => runs.iter().map(|r| r.text.as_str()).collect(),
            Block::Image { .. } => String::new(),
        }
    }
}

/// A document ready to be serialised.
#[derive(Debug, Clone)]
pub struct Layout {
    pub style: RenderStyle,
    pub blocks: Vec<Block>,
}

impl Layout {
    pub fn profile(&self) -> &'static StyleProfile {
        self.style.profile()
    }

    pub fn images(&self) -> impl Iterator<Item = &Path> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image { path, .. } => Some(path.as_path()),
            Block::Paragraph { .. } => None,
        })
    }
}

// ── Layout rules ─────────────────────────────────────────────────────────

/// Lay out `doc` according to `options.style`.
pub fn layout(doc: &ReportDocument, options: &RenderOptions) -> Layout {
    let profile = options.style.profile();
    let mut blocks = Vec::new();

    for f in profile.header_fields {
        let value = lookup_field(&doc.header_info, f.keys).unwrap_or_default();
        if value.is_empty() && !profile.emit_empty_header {
            continue;
        }
        blocks.push(Block::Paragraph {
            runs: vec![
                TextRun::new(format!("#{}# ", f.label), profile.bold_header, None),
                TextRun::new(value, profile.bold_header, None),
            ],
            align: Alignment::Left,
        });
    }

    blocks.push(Block::Paragraph {
        runs: vec![TextRun::new(CONTENT_MARKER, profile.bold_header, None)],
        align: Alignment::Left,
    });

    if profile.wsh_subtitle {
        let category = subtitle_category(doc, options.category_override.as_deref());
        if !category.is_empty() {
            blocks.push(Block::Paragraph {
                runs: vec![TextRun::new(
                    format!("{WSH_PREFIX}{category}"),
                    profile.bold_header,
                    None,
                )],
                align: Alignment::Left,
            });
        }
    }

    for paragraph in &doc.body_content {
        if profile.skip_blank_paragraphs && paragraph.trim().is_empty() {
            continue;
        }
        blocks.push(Block::Paragraph {
            runs: highlight_runs(paragraph, profile.plain_run_color),
            align: Alignment::Justify,
        });
    }

    if profile.include_footer {
        for f in FOOTER_FIELDS {
            let Some(value) = lookup_field(&doc.footer_info, f.keys) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            blocks.push(Block::Paragraph {
                runs: vec![TextRun::new(
                    format!("{}: {}", f.label, value),
                    true,
                    Some(ACCENT_COLOR),
                )],
                align: Alignment::Left,
            });
        }
    }

    match options.image.as_deref() {
        Some(path) if path.is_file() => {
            debug!("Appending cover image {}", path.display());
            blocks.push(Block::Image {
                path: path.to_path_buf(),
                align: Alignment::Center,
            });
        }
        Some(path) => debug!("Cover image {} not found, skipping", path.display()),
        None => {}
    }

    Layout {
        style: options.style,
        blocks,
    }
}

/// Lay out `doc` and write it to `path` as `.docx`.
pub fn render(doc: &ReportDocument, path: &Path, options: &RenderOptions) -> Result<(), ReportError> {
    let layout = layout(doc, options);
    crate::pipeline::encode::write_docx(&layout, path)
}

fn subtitle_category(doc: &ReportDocument, category_override: Option<&str>) -> String {
    if let Some(category) = category_override.map(str::trim).filter(|c| !c.is_empty()) {
        return category.to_string();
    }
    let header = lookup_field(&doc.header_info, &["category", "Category"]).unwrap_or_default();
    header
        .strip_prefix(WSH_PREFIX)
        .unwrap_or(&header)
        .trim()
        .to_string()
}

static RE_HIGHLIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

/// Split a body paragraph on `**...**` into plain and accent runs.
///
/// Empty segments are dropped, so a paragraph that is entirely highlighted
/// yields one run and an empty paragraph yields none.
pub fn highlight_runs(text: &str, plain_color: Option<&'static str>) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut last = 0;

    for caps in RE_HIGHLIGHT.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            runs.push(TextRun::new(&text[last..whole.start()], false, plain_color));
        }
        if !inner.as_str().is_empty() {
            runs.push(TextRun::new(inner.as_str(), false, Some(ACCENT_COLOR)));
        }
        last = whole.end();
    }
    if last < text.len() {
        runs.push(TextRun::new(&text[last..], false, plain_color));
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> ReportDocument {
        ReportDocument::from_value(&v)
    }

    fn texts(layout: &Layout) -> Vec<String> {
        layout.blocks.iter().map(Block::text).collect()
    }

    fn standard() -> RenderOptions {
        RenderOptions::default()
    }

    fn fund_flow() -> RenderOptions {
        RenderOptions {
            style: RenderStyle::FundFlow,
            ..Default::default()
        }
    }

    #[test]
    fn highlight_splits_into_three_runs() {
        let runs = highlight_runs("Intro. **JPM expect growth.** More text.", Some("000000"));
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text, "Intro. ");
        assert_eq!(runs[0].color, Some("000000"));
        assert_eq!(runs[1].text, "JPM expect growth.");
        assert_eq!(runs[1].color, Some(ACCENT_COLOR));
        assert!(!runs[1].bold);
        assert_eq!(runs[2].text, " More text.");
    }

    #[test]
    fn highlight_edge_cases() {
        let runs = highlight_runs("**all red**", None);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].color, Some(ACCENT_COLOR));

        assert!(highlight_runs("", None).is_empty());
        assert!(highlight_runs("****", None).is_empty());

        let runs = highlight_runs("no markers", None);
        assert_eq!(runs, vec![TextRun::new("no markers", false, None)]);

        // Unbalanced markers stay literal.
        let runs = highlight_runs("a **b", None);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "a **b");
    }

    #[test]
    fn standard_layout_order() {
        let d = doc(json!({
            "header_info": {
                "category": "Wall Street Highlights-Equity",
                "date": "2026/03/09",
                "title": "GS: Tencent(700.HK)",
                "summary": "",
                "rating": "Buy"
            },
            "body_content": ["One **GS expect growth.**", "Two"],
            "footer_info": {"stock": "700.HK", "rating": "Buy", "price_target": ""}
        }));
        let l = layout(&d, &standard());
        assert_eq!(
            texts(&l),
            vec![
                "#Category# Wall Street Highlights-Equity",
                "#Date# 2026/03/09",
                "#Title# GS: Tencent(700.HK)",
                "#Stock Rating# Buy",
                "#Content#",
                "Wall Street Highlights-Equity",
                "One GS expect growth.",
                "Two",
                "Stock: 700.HK",
                "Stock Rating: Buy",
            ]
        );
    }

    #[test]
    fn standard_header_is_bold_and_left_aligned() {
        let l = layout(&doc(json!({"header_info": {"title": "T"}})), &standard());
        let Block::Paragraph { runs, align } = &l.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(*align, Alignment::Left);
        assert!(runs.iter().all(|r| r.bold));
    }

    #[test]
    fn empty_header_value_omitted_in_standard_mode() {
        let l = layout(&doc(json!({"header_info": {"title": "", "tags": null}})), &standard());
        assert!(!texts(&l).iter().any(|t| t.starts_with("#Title#")));
        assert!(!texts(&l).iter().any(|t| t.starts_with("#Tags#")));
    }

    #[test]
    fn empty_header_value_emitted_in_fund_flow_mode() {
        let l = layout(&doc(json!({"header_info": {"Title": "T", "Stock": ""}})), &fund_flow());
        let t = texts(&l);
        assert_eq!(t[0], "#Category# ");
        assert!(t.contains(&"#Title# T".to_string()));
        assert!(t.contains(&"#Stock# ".to_string()));
        assert_eq!(
            t.iter().filter(|s| s.starts_with('#') && *s != CONTENT_MARKER).count(),
            FUND_FLOW_HEADER.len()
        );
    }

    #[test]
    fn fund_flow_header_lines_are_not_bold() {
        let d = doc(json!({"header_info": {"Title": "T", "Summary": "S", "From": "CIO Office"}}));
        let l = layout(&d, &fund_flow());
        let header = &l.blocks[..FUND_FLOW_HEADER.len()];
        for block in header {
            let Block::Paragraph { runs, .. } = block else {
                panic!("expected paragraph");
            };
            assert!(block.text().starts_with('#'));
            assert!(runs.iter().all(|r| !r.bold), "bold run in {:?}", block.text());
        }
    }

    #[test]
    fn fund_flow_has_no_subtitle_no_footer_and_plain_marker() {
        let d = doc(json!({
            "header_info": {"Category": "Wall Street Highlights-Flows"},
            "body_content": ["A", "   ", "B **up**"],
            "footer_info": {"stock": "700.HK"}
        }));
        let l = layout(&d, &fund_flow());
        let t = texts(&l);
        let marker = t.iter().position(|s| s == CONTENT_MARKER).unwrap();
        assert_eq!(&t[marker + 1..], &["A".to_string(), "B up".to_string()]);

        let Block::Paragraph { runs, .. } = &l.blocks[marker] else {
            panic!("expected paragraph");
        };
        assert!(!runs[0].bold);

        let Block::Paragraph { runs, .. } = &l.blocks[marker + 2] else {
            panic!("expected paragraph");
        };
        assert_eq!(runs[0].color, None);
        assert_eq!(runs[1].color, Some(ACCENT_COLOR));
    }

    #[test]
    fn standard_keeps_blank_paragraphs() {
        let d = ReportDocument {
            body_content: vec!["A".into(), "".into(), "B".into()],
            ..Default::default()
        };
        let l = layout(&d, &standard());
        let body: Vec<_> = l
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::Paragraph { align: Alignment::Justify, .. }))
            .collect();
        assert_eq!(body.len(), 3);
        assert_eq!(body[1].text(), "");
    }

    #[test]
    fn subtitle_prefers_override() {
        let d = doc(json!({"header_info": {"category": "Wall Street Highlights-Macro"}}));
        let opts = RenderOptions {
            category_override: Some("FX&Commodity".into()),
            ..Default::default()
        };
        assert!(texts(&layout(&d, &opts)).contains(&"Wall Street Highlights-FX&Commodity".to_string()));
        assert!(texts(&layout(&d, &standard())).contains(&"Wall Street Highlights-Macro".to_string()));
    }

    #[test]
    fn subtitle_omitted_without_category() {
        let l = layout(&ReportDocument::default(), &standard());
        assert_eq!(texts(&l), vec![CONTENT_MARKER]);
    }

    #[test]
    fn footer_is_bold_accent() {
        let d = doc(json!({"footer_info": {"price_target": 101.5}}));
        let l = layout(&d, &standard());
        let last = l.blocks.last().unwrap();
        assert_eq!(last.text(), "12m Price Target: 101.5");
        let Block::Paragraph { runs, .. } = last else {
            panic!("expected paragraph");
        };
        assert!(runs[0].bold);
        assert_eq!(runs[0].color, Some(ACCENT_COLOR));
    }

    #[test]
    fn missing_image_is_skipped() {
        let opts = RenderOptions {
            image: Some(PathBuf::from("/definitely/not/here.png")),
            ..Default::default()
        };
        let l = layout(&ReportDocument::default(), &opts);
        assert_eq!(l.images().count(), 0);
        assert_eq!(layout(&ReportDocument::default(), &standard()).images().count(), 0);
    }

    #[test]
    fn existing_image_is_last_block() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let opts = RenderOptions {
            image: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let d = doc(json!({"body_content": ["x"], "footer_info": {"stock": "S"}}));
        let l = layout(&d, &opts);
        assert_eq!(l.images().count(), 1);
        assert!(matches!(
            l.blocks.last(),
            Some(Block::Image {
                align: Alignment::Center,
                ..
            })
        ));
    }

    #[test]
    fn profiles_differ_where_expected() {
        let s = RenderStyle::Standard.profile();
        let f = RenderStyle::FundFlow.profile();
        assert_eq!(s.font_half_points, 22);
        assert_eq!(f.font_half_points, 24);
        assert_eq!(s.spacing_before, 240);
        assert_eq!(f.spacing_before, 120);
        assert!(s.include_footer && !f.include_footer);
    }
}
