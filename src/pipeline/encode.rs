//! Layout serialisation: [`Layout`] → `.docx` on disk.
//!
//! The document is written to a temporary file next to the target and
//! renamed into place, so a failed render never leaves a truncated `.docx`
//! behind.
//!
//! Cover images are decoded and re-encoded as PNG before they reach the
//! document. An image that cannot be decoded is skipped with a warning
//! instead of failing the whole report.

use crate::error::ReportError;
use crate::pipeline::render::{Alignment, Block, Layout, StyleProfile, TextRun, IMAGE_SPACING_BEFORE};
use docx_rs::{AlignmentType, Docx, LineSpacing, LineSpacingType, Paragraph, Pic, Run, RunFonts};
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Latin font of the whole document.
pub const LATIN_FONT: &str = "DengXian";

/// East Asian font of the whole document.
pub const EAST_ASIA_FONT: &str = "Microsoft YaHei";

/// Cover image width: 6 inches in EMU.
pub const IMAGE_WIDTH_EMU: u32 = 5_486_400;

/// Serialise `layout` and write it to `path`.
pub fn write_docx(layout: &Layout, path: &Path) -> Result<(), ReportError> {
    let fail = |detail: String| ReportError::RenderFailed {
        path: path.to_path_buf(),
        detail,
    };

    let docx = build_docx(layout);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| fail(format!("cannot create temporary file: {e}")))?;

    docx.build()
        .pack(tmp.as_file_mut())
        .map_err(|e| fail(e.to_string()))?;

    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;

    info!("Report written to {}", path.display());
    Ok(())
}

/// Build the in-memory Word document for `layout`.
pub fn build_docx(layout: &Layout) -> Docx {
    let profile = layout.profile();
    let mut docx = Docx::new()
        .default_fonts(
            RunFonts::new()
                .ascii(LATIN_FONT)
                .hi_ansi(LATIN_FONT)
                .east_asia(EAST_ASIA_FONT),
        )
        .default_size(profile.font_half_points);

    for block in &layout.blocks {
        match block {
            Block::Paragraph { runs, align } => {
                docx = docx.add_paragraph(paragraph(runs, *align, profile));
            }
            Block::Image { path, align } => match image_paragraph(path, *align) {
                Some(p) => docx = docx.add_paragraph(p),
                None => warn!("Cover image {} could not be decoded, skipping", path.display()),
            },
        }
    }

    docx
}

fn paragraph(runs: &[TextRun], align: Alignment, profile: &StyleProfile) -> Paragraph {
    let spacing = LineSpacing::new()
        .before(profile.spacing_before.into())
        .after(profile.spacing_after.into())
        .line(profile.line.into())
        .line_rule(LineSpacingType::Auto);

    runs.iter().fold(
        Paragraph::new().align(alignment(align)).line_spacing(spacing),
        |p, r| p.add_run(run(r)),
    )
}

fn run(r: &TextRun) -> Run {
    let mut run = Run::new().add_text(&r.text);
    if r.bold {
        run = run.bold();
    }
    if let Some(color) = r.color {
        run = run.color(color);
    }
    run
}

fn alignment(align: Alignment) -> AlignmentType {
    match align {
        Alignment::Left => AlignmentType::Left,
        Alignment::Justify => AlignmentType::Both,
        Alignment::Center => AlignmentType::Center,
    }
}

fn image_paragraph(path: &Path, align: Alignment) -> Option<Paragraph> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            debug!("Cannot read {}: {e}", path.display());
            return None;
        }
    };
    let img = image::load_from_memory(&bytes).ok()?;
    let (width_emu, height_emu) = scaled_size(&img)?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .ok()?;

    let pic = Pic::new(&png).size(width_emu, height_emu);
    Some(
        Paragraph::new()
            .align(alignment(align))
            .line_spacing(LineSpacing::new().before(IMAGE_SPACING_BEFORE.into()))
            .add_run(Run::new().add_image(pic)),
    )
}

/// Fixed width, height scaled to keep the aspect ratio.
fn scaled_size(img: &DynamicImage) -> Option<(u32, u32)> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return None;
    }
    let height = u64::from(IMAGE_WIDTH_EMU) * u64::from(h) / u64::from(w);
    Some((IMAGE_WIDTH_EMU, u32::try_from(height).ok()?))
}
