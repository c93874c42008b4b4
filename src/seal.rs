//! 印章: self-contained seal layers, composited later like any other layer.

use crate::color::{RgbColor, is_ink};
use crate::draw;
use crate::error::{CalligraphyError, CalligraphyResult};
use crate::fonts::{GlyphBitmap, GlyphSource};
use crate::surface::{Layer, Surface, lerp_u8};
use image::RgbaImage;
use rand::Rng;
use serde::Serialize;
use std::f32::consts::PI;
use tracing::{debug, instrument};

/// Gap between the square body and its outer frame.
const FRAME_GAP: u32 = 4;
const FRAME_WIDTH: f32 = 3.0;
const RING_WIDTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SealLayout {
    /// Bordered square, four glyphs in a 2×2 grid.
    SquareGrid,
    /// Round seal with four glyphs at `compact_ratio` of the radius from the
    /// centre, diagonally.
    CircleGrid { compact_ratio: f32, ornament: bool },
    /// Round seal with any number of glyphs evenly spaced on a ring.
    Ring { radius_fraction: f32 },
}

impl SealLayout {
    pub fn name(&self) -> &'static str {
        match self {
            SealLayout::SquareGrid => "square",
            SealLayout::CircleGrid { .. } => "circle",
            SealLayout::Ring { .. } => "ring",
        }
    }

    fn accepts(&self, count: usize) -> Result<(), usize> {
        match self {
            SealLayout::SquareGrid | SealLayout::CircleGrid { .. } if count != 4 => Err(4),
            SealLayout::Ring { .. } if count == 0 => Err(1),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SealSpec {
    glyphs: Vec<char>,
    layout: SealLayout,
    /// Top-left of the seal body on the artwork.
    pub anchor: (i32, i32),
    /// Side of the square body, or diameter of a round one.
    pub size: u32,
    pub fill: RgbColor,
    pub border: RgbColor,
    pub glyph_color: RgbColor,
    pub aging: Option<f32>,
    /// Fill opacity for a light stamp over existing writing.
    pub penetration: Option<f32>,
    /// Carve tilt in degrees, applied alternately clockwise and counter-clockwise.
    pub tilt: f32,
}

impl SealSpec {
    pub fn new(
        text: &str,
        layout: SealLayout,
        anchor: (i32, i32),
        size: u32,
    ) -> CalligraphyResult<Self> {
        let glyphs: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if let Err(expected) = layout.accepts(glyphs.len()) {
            return Err(CalligraphyError::glyph_count(
                layout.name(),
                expected,
                glyphs.len(),
            ));
        }
        if size < 8 {
            return Err(CalligraphyError::dimensions(size, size));
        }
        Ok(Self {
            glyphs,
            layout,
            anchor,
            size,
            fill: RgbColor::SEAL_FILL,
            border: RgbColor::SEAL_BORDER,
            glyph_color: RgbColor::WHITE,
            aging: None,
            penetration: None,
            tilt: 0.0,
        })
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn layout(&self) -> SealLayout {
        self.layout
    }

    pub fn with_aging(mut self, intensity: f32) -> Self {
        self.aging = Some(intensity.clamp(0.0, 1.0));
        self
    }

    pub fn with_penetration(mut self, opacity: f32) -> Self {
        self.penetration = Some(opacity.clamp(0.0, 1.0));
        self
    }

    pub fn with_tilt(mut self, degrees: f32) -> Self {
        self.tilt = degrees;
        self
    }

    fn tilt_for(&self, index: usize) -> f32 {
        if index % 2 == 0 { -self.tilt } else { self.tilt }
    }
}

#[instrument(skip(spec, glyphs, rng), fields(layout = spec.layout.name(), size = spec.size))]
pub fn render_seal(
    spec: &SealSpec,
    glyphs: &dyn GlyphSource,
    rng: &mut impl Rng,
) -> CalligraphyResult<Layer> {
    let fill_alpha = spec.penetration.unwrap_or(1.0);
    let mut layer = match spec.layout {
        SealLayout::SquareGrid => square_grid(spec, glyphs, fill_alpha)?,
        SealLayout::CircleGrid {
            compact_ratio,
            ornament,
        } => circle_grid(spec, glyphs, fill_alpha, compact_ratio, ornament)?,
        SealLayout::Ring { radius_fraction } => ring(spec, glyphs, fill_alpha, radius_fraction)?,
    };
    if let Some(intensity) = spec.aging {
        age_seal(&mut layer, intensity, rng);
    }
    debug!(anchor = ?layer.anchor, "seal rendered");
    Ok(layer)
}

fn square_grid(
    spec: &SealSpec,
    glyphs: &dyn GlyphSource,
    fill_alpha: f32,
) -> CalligraphyResult<Layer> {
    let side = spec.size + 2 * FRAME_GAP;
    let gap = FRAME_GAP as i32;
    let mut layer = Layer::blank(side, side, (spec.anchor.0 - gap, spec.anchor.1 - gap))?;
    draw::outline_rect(
        &mut layer,
        0.0,
        0.0,
        side as f32,
        side as f32,
        FRAME_WIDTH,
        spec.border,
    );
    let body = FRAME_GAP as f32;
    draw::fill_rect(
        &mut layer,
        body,
        body,
        body + spec.size as f32,
        body + spec.size as f32,
        spec.fill,
        fill_alpha,
    );

    let cell = spec.size as f32 / 2.0;
    let px = (spec.size / 3) as f32;
    for (i, &ch) in spec.glyphs.iter().enumerate() {
        let col = (i % 2) as f32;
        let row = (i / 2) as f32;
        let cx = body + cell * col + cell / 2.0;
        let cy = body + cell * row + cell / 2.0;
        place_glyph(&mut layer, glyphs, ch, px, (cx, cy), spec.tilt_for(i), spec.glyph_color)?;
    }
    Ok(layer)
}

/// Body disc plus outer ring; returns the layer and the body centre.
fn round_body(spec: &SealSpec, fill_alpha: f32) -> CalligraphyResult<(Layer, f32)> {
    let side = spec.size + 2 * RING_WIDTH;
    let pad = RING_WIDTH as i32;
    let mut layer = Layer::blank(side, side, (spec.anchor.0 - pad, spec.anchor.1 - pad))?;
    let c = side as f32 / 2.0;
    let r = spec.size as f32 / 2.0;
    draw::ring(
        &mut layer,
        c,
        c,
        r + RING_WIDTH as f32,
        RING_WIDTH as f32,
        spec.border,
    );
    let rr = r * r;
    for y in 0..side {
        for x in 0..side {
            let dx = x as f32 - c;
            let dy = y as f32 - c;
            if dx * dx + dy * dy <= rr {
                layer.blend_pixel(x as i32, y as i32, spec.fill, fill_alpha);
            }
        }
    }
    Ok((layer, c))
}

fn circle_grid(
    spec: &SealSpec,
    glyphs: &dyn GlyphSource,
    fill_alpha: f32,
    compact_ratio: f32,
    ornament: bool,
) -> CalligraphyResult<Layer> {
    let (mut layer, c) = round_body(spec, fill_alpha)?;
    let offset = spec.size as f32 / 2.0 * compact_ratio.clamp(0.0, 1.0);
    let px = (spec.size / 4) as f32;
    let corners = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];
    for (i, (&ch, (sx, sy))) in spec.glyphs.iter().zip(corners).enumerate() {
        let center = (c + sx * offset, c + sy * offset);
        place_glyph(&mut layer, glyphs, ch, px, center, spec.tilt_for(i), spec.glyph_color)?;
    }
    if ornament {
        draw::fill_disc(&mut layer, c, c, (spec.size / 10) as f32, spec.border);
    }
    Ok(layer)
}

fn ring(
    spec: &SealSpec,
    glyphs: &dyn GlyphSource,
    fill_alpha: f32,
    radius_fraction: f32,
) -> CalligraphyResult<Layer> {
    let (mut layer, c) = round_body(spec, fill_alpha)?;
    let n = spec.glyphs.len();
    let px = (spec.size / 6) as f32;
    let radius = spec.size as f32 / 2.0 * radius_fraction.clamp(0.0, 1.0);
    for (i, &ch) in spec.glyphs.iter().enumerate() {
        // 从正上方起，顺时针
        let angle = 2.0 * PI * i as f32 / n as f32 - PI / 2.0;
        let center = (c + radius * angle.cos(), c + radius * angle.sin());
        place_glyph(&mut layer, glyphs, ch, px, center, spec.tilt_for(i), spec.glyph_color)?;
    }
    Ok(layer)
}

/// Centres a glyph on `center`, shifted down by the font's baseline correction.
fn place_glyph(
    layer: &mut Layer,
    glyphs: &dyn GlyphSource,
    ch: char,
    px: f32,
    center: (f32, f32),
    tilt: f32,
    color: RgbColor,
) -> CalligraphyResult<()> {
    let bitmap: GlyphBitmap = glyphs.rasterize(ch, px)?.rotated(tilt);
    if bitmap.is_empty() {
        return Ok(());
    }
    let x = (center.0 - bitmap.width as f32 / 2.0).round() as i32;
    let y = (center.1 - bitmap.height as f32 / 2.0 + bitmap.baseline_shift).round() as i32;
    draw::blit_glyph(layer, &bitmap, x, y, color, 1.0);
    Ok(())
}

/// 做旧: uneven ink on the stamp. Only pixels already part of the seal change.
pub fn age_seal(layer: &mut Layer, intensity: f32, rng: &mut impl Rng) {
    let p = f64::from(intensity.clamp(0.0, 1.0));
    if p <= 0.0 {
        return;
    }
    for px in layer.image.pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        if rng.random_bool(p) {
            let v = rng.random_range(-20i16..=20);
            for c in 0..3 {
                px[c] = (i16::from(px[c]) + v).clamp(0, 255) as u8;
            }
        }
        if rng.random_bool(p / 2.0) {
            px[3] = px[3].saturating_sub(rng.random_range(0..=30));
        }
    }
}

/// Lets dark writing beneath a translucent stamp read through it: seal
/// pixels over ink move toward the underlying color by `1 - opacity`.
pub fn blend_underlying(layer: &mut Layer, underlying: &RgbaImage, opacity: f32) {
    let show = 1.0 - opacity.clamp(0.0, 1.0);
    if show <= 0.0 {
        return;
    }
    let (ax, ay) = layer.anchor;
    for (lx, ly, px) in layer.image.enumerate_pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        let (x, y) = (ax + lx as i32, ay + ly as i32);
        if x < 0 || y < 0 {
            continue;
        }
        let Some(under) = underlying.get_pixel_checked(x as u32, y as u32) else {
            continue;
        };
        if !is_ink(under) {
            continue;
        }
        for c in 0..3 {
            px[c] = lerp_u8(px[c], under[c], show);
        }
    }
}
