//! Vertical right-to-left inscription layout.

use crate::color::RgbColor;
use crate::draw;
use crate::error::{CalligraphyResult, check_dimensions};
use crate::fonts::GlyphSource;
use crate::surface::Layer;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One character cell; `(x, y)` is the cell's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphPlacement {
    pub ch: char,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Drops punctuation and whitespace; the remaining characters are written.
pub fn poem_chars(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_whitespace() && !is_punctuation(*c))
        .collect()
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '，' | '。'
                | '、'
                | '；'
                | '：'
                | '？'
                | '！'
                | '「'
                | '」'
                | '『'
                | '』'
                | '《'
                | '》'
                | '（'
                | '）'
                | '“'
                | '”'
                | '‘'
                | '’'
                | '·'
                | '…'
                | '—'
        )
}

/// Columns run top to bottom, the first column at the right edge of `area`.
/// `rows == 0` fits as many cells as the area height allows. Characters that
/// do not fit are dropped with a warning.
pub fn vertical_columns(
    chars: &[char],
    area: &TextArea,
    cell: f32,
    rows: usize,
) -> Vec<GlyphPlacement> {
    if cell <= 0.0 || chars.is_empty() {
        return Vec::new();
    }
    let fit_rows = (area.height / cell).floor() as usize;
    let rows = if rows == 0 { fit_rows } else { rows.min(fit_rows) };
    let columns = (area.width / cell).floor() as usize;
    if rows == 0 || columns == 0 {
        warn!(cell, ?area, "text area smaller than one cell");
        return Vec::new();
    }

    let capacity = rows * columns;
    if chars.len() > capacity {
        warn!(
            dropped = chars.len() - capacity,
            "text area full, truncating inscription"
        );
    }
    let right = area.x + area.width;
    chars
        .iter()
        .take(capacity)
        .enumerate()
        .map(|(i, &ch)| {
            let col = i / rows;
            let row = i % rows;
            GlyphPlacement {
                ch,
                x: right - cell * (col + 1) as f32,
                y: area.y + cell * row as f32,
                size: cell,
            }
        })
        .collect()
}

/// Renders placements into a transparent layer covering the whole artwork,
/// each glyph centred in its cell.
pub fn render_inscription(
    width: u32,
    height: u32,
    placements: &[GlyphPlacement],
    glyphs: &dyn GlyphSource,
    color: RgbColor,
) -> CalligraphyResult<Layer> {
    check_dimensions(width, height)?;
    let mut layer = Layer::blank(width, height, (0, 0))?;
    let mut missing = 0usize;
    for p in placements {
        let bitmap = match glyphs.rasterize(p.ch, p.size * 0.9) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => continue,
            Err(err) => {
                warn!(%err, ch = %p.ch, "glyph skipped");
                missing += 1;
                continue;
            }
        };
        let gx = p.x + (p.size - bitmap.width as f32) / 2.0;
        let gy = p.y + (p.size - bitmap.height as f32) / 2.0 + bitmap.baseline_shift;
        draw::blit_glyph(
            &mut layer,
            &bitmap,
            gx.round() as i32,
            gy.round() as i32,
            color,
            1.0,
        );
    }
    debug!(glyphs = placements.len(), missing, "inscription rendered");
    Ok(layer)
}
