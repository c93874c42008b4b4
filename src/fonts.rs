use crate::config::FontSlot;
use crate::error::{CalligraphyError, CalligraphyResult};
use fontdue::Font;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 8-bit coverage of a single rasterized glyph, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
    /// Downward correction (px) applied when the glyph is centred in a cell.
    /// Supplied by the font's metrics, zero for glyphs that already centre.
    pub baseline_shift: f32,
}

impl GlyphBitmap {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            coverage: Vec::new(),
            baseline_shift: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Rotates about the bitmap centre, expanding to fit (bilinear sampling).
    pub fn rotated(&self, degrees: f32) -> Self {
        if self.is_empty() || degrees.abs() < f32::EPSILON {
            return self.clone();
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (w, h) = (self.width as f32, self.height as f32);
        let new_w = (w * cos.abs() + h * sin.abs()).ceil() as usize;
        let new_h = (w * sin.abs() + h * cos.abs()).ceil() as usize;
        let (scx, scy) = (w / 2.0, h / 2.0);
        let (dcx, dcy) = (new_w as f32 / 2.0, new_h as f32 / 2.0);

        let mut coverage = vec![0u8; new_w * new_h];
        for y in 0..new_h {
            for x in 0..new_w {
                let dx = x as f32 + 0.5 - dcx;
                let dy = y as f32 + 0.5 - dcy;
                // inverse rotation back into source space
                let sx = dx * cos + dy * sin + scx - 0.5;
                let sy = -dx * sin + dy * cos + scy - 0.5;
                coverage[y * new_w + x] = self.sample(sx, sy);
            }
        }
        Self {
            width: new_w,
            height: new_h,
            coverage,
            baseline_shift: self.baseline_shift,
        }
    }

    fn at(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0.0;
        }
        f32::from(self.coverage[y as usize * self.width + x as usize])
    }

    fn sample(&self, x: f32, y: f32) -> u8 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as i32, y0 as i32);
        let top = self.at(xi, yi) * (1.0 - fx) + self.at(xi + 1, yi) * fx;
        let bottom = self.at(xi, yi + 1) * (1.0 - fx) + self.at(xi + 1, yi + 1) * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    }
}

/// The text-rendering collaborator: turns a character into glyph coverage.
pub trait GlyphSource {
    fn name(&self) -> &str;

    fn has_glyph(&self, ch: char) -> bool;

    fn rasterize(&self, ch: char, px: f32) -> CalligraphyResult<GlyphBitmap>;
}

#[derive(Debug, Clone)]
pub struct LoadedFont {
    pub slot: FontSlot,
    pub font: Font,
    pub path: PathBuf,
}

impl LoadedFont {
    pub fn load(fonts_root: &Path, slot: &FontSlot) -> CalligraphyResult<Self> {
        let path = fonts_root.join(&slot.name);
        let data = fs::read(&path)
            .map_err(|err| CalligraphyError::font(format!("{}: {}", path.display(), err)))?;
        let font = Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|err| CalligraphyError::font(format!("{}: {}", slot.name, err)))?;
        Ok(Self {
            slot: slot.clone(),
            font,
            path,
        })
    }
}

impl GlyphSource for LoadedFont {
    fn name(&self) -> &str {
        &self.slot.name
    }

    fn has_glyph(&self, ch: char) -> bool {
        self.font.lookup_glyph_index(ch) != 0
    }

    fn rasterize(&self, ch: char, px: f32) -> CalligraphyResult<GlyphBitmap> {
        if !self.has_glyph(ch) {
            return Err(CalligraphyError::font(format!(
                "'{}' has no glyph for '{}'",
                self.slot.name, ch
            )));
        }
        let (metrics, coverage) = self.font.rasterize(ch, px);
        Ok(GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            coverage,
            baseline_shift: self.slot.baseline_shift * px,
        })
    }
}

/// Ordered font stack with a built-in fallback so rendering never stops on
/// a missing font file or glyph.
#[derive(Debug)]
pub struct FontManager {
    pub fonts: Vec<LoadedFont>,
    placeholder: PlaceholderGlyphs,
}

impl FontManager {
    /// Loads every slot it can; unavailable fonts are reported and skipped.
    pub fn new(fonts_root: &Path, slots: &[FontSlot]) -> Self {
        let mut fonts = Vec::with_capacity(slots.len());
        for slot in slots {
            match LoadedFont::load(fonts_root, slot) {
                Ok(font) => {
                    debug!(font = %font.path.display(), "font loaded");
                    fonts.push(font);
                }
                Err(err) => warn!(%err, "skipping font slot {}", slot.id),
            }
        }
        if fonts.is_empty() {
            warn!("no fonts available, glyphs will use placeholder shapes");
        }
        Self {
            fonts,
            placeholder: PlaceholderGlyphs,
        }
    }

    pub fn pick(&self, ch: char) -> &dyn GlyphSource {
        self.fonts
            .iter()
            .find(|f| f.has_glyph(ch))
            .map(|f| f as &dyn GlyphSource)
            .unwrap_or(&self.placeholder)
    }
}

impl GlyphSource for FontManager {
    fn name(&self) -> &str {
        self.fonts
            .first()
            .map(|f| f.slot.name.as_str())
            .unwrap_or(self.placeholder.name())
    }

    fn has_glyph(&self, _ch: char) -> bool {
        true
    }

    fn rasterize(&self, ch: char, px: f32) -> CalligraphyResult<GlyphBitmap> {
        self.pick(ch).rasterize(ch, px)
    }
}

/// Deterministic blocky stand-in glyphs: a frame plus a few strokes chosen
/// from the code point. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGlyphs;

impl GlyphSource for PlaceholderGlyphs {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn has_glyph(&self, ch: char) -> bool {
        !ch.is_whitespace()
    }

    fn rasterize(&self, ch: char, px: f32) -> CalligraphyResult<GlyphBitmap> {
        if !self.has_glyph(ch) {
            return Ok(GlyphBitmap::empty());
        }
        let side = (px * 0.8).round().max(4.0) as usize;
        let stroke = (side / 8).max(1);
        let code = ch as u32;
        let mut coverage = vec![0u8; side * side];
        let mut fill = |x0: usize, y0: usize, x1: usize, y1: usize| {
            for y in y0..y1.min(side) {
                for x in x0..x1.min(side) {
                    coverage[y * side + x] = 255;
                }
            }
        };
        fill(0, 0, side, stroke);
        fill(0, side - stroke, side, side);
        fill(0, 0, stroke, side);
        fill(side - stroke, 0, side, side);
        let mid = side / 2 - stroke / 2;
        if code & 1 == 1 {
            fill(0, mid, side, mid + stroke);
        }
        if code & 2 == 2 {
            fill(mid, 0, mid + stroke, side);
        }
        if code & 4 == 4 {
            fill(side / 4, side / 4, side / 4 + stroke, side - side / 4);
        }
        Ok(GlyphBitmap {
            width: side,
            height: side,
            coverage,
            baseline_shift: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_draws_a_frame() {
        let glyph = PlaceholderGlyphs.rasterize('永', 40.0).unwrap();
        assert_eq!(glyph.width, 32);
        assert_eq!(glyph.height, 32);
        assert_eq!(glyph.coverage[0], 255);
        assert_eq!(glyph.coverage[32 * 32 - 1], 255);
        assert!(PlaceholderGlyphs.rasterize(' ', 40.0).unwrap().is_empty());
    }

    #[test]
    fn missing_fonts_fall_back_to_placeholder() {
        let slot = FontSlot {
            id: 1,
            name: "does-not-exist.ttf".into(),
            baseline_shift: 0.0,
        };
        assert!(matches!(
            LoadedFont::load(Path::new("/nonexistent"), &slot),
            Err(CalligraphyError::FontUnavailable(_))
        ));
        let manager = FontManager::new(Path::new("/nonexistent"), &[slot]);
        assert!(manager.fonts.is_empty());
        assert_eq!(manager.name(), "placeholder");
        let glyph = manager.rasterize('印', 30.0).unwrap();
        assert!(!glyph.is_empty());
    }

    #[test]
    fn rotation_expands_and_keeps_ink() {
        let glyph = PlaceholderGlyphs.rasterize('山', 40.0).unwrap();
        let turned = glyph.rotated(45.0);
        assert!(turned.width > glyph.width);
        assert!(turned.height > glyph.height);
        let ink = |g: &GlyphBitmap| g.coverage.iter().map(|&c| u32::from(c)).sum::<u32>();
        let (a, b) = (ink(&glyph) as f32, ink(&turned) as f32);
        assert!((a - b).abs() / a < 0.15);
        assert_eq!(glyph.rotated(0.0), glyph);
    }
}
