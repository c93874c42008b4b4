//! Pixel surfaces shared by every stage of the artwork pipeline.
//!
//! Alpha safety is carried by the types: [`Canvas`] (opaque paper) and
//! [`Layer`] (fresh transparent buffer) implement [`Surface`] and may be drawn
//! on directly. [`MaskedCanvas`] carries a torn-edge alpha channel and has no
//! drawing entry points: content reaches it through [`MaskedCanvas::composite`],
//! [`MaskedCanvas::paint_rgb`] (alpha snapshot and restore) or
//! [`MaskedCanvas::bleed`].

use crate::bleed::{self, BleedParams};
use crate::color::RgbColor;
use crate::composite;
use crate::error::{CalligraphyError, CalligraphyResult, check_dimensions};
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use rand::Rng;

/// Anything drawing primitives may write into without destroying alpha.
pub trait Surface {
    fn dimensions(&self) -> (u32, u32);

    /// Blends `color` at coverage `alpha` (0..=1) onto the pixel; out of
    /// bounds coordinates are ignored.
    fn blend_pixel(&mut self, x: i32, y: i32, color: RgbColor, alpha: f32);

    fn contains(&self, x: i32, y: i32) -> bool {
        let (w, h) = self.dimensions();
        x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h
    }
}

/// Opaque RGB paper with no alpha channel yet.
#[derive(Debug, Clone)]
pub struct Canvas {
    img: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: RgbColor) -> CalligraphyResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            img: RgbImage::from_pixel(width, height, fill.rgb()),
        })
    }

    pub fn from_image(img: RgbImage) -> CalligraphyResult<Self> {
        check_dimensions(img.width(), img.height())?;
        Ok(Self { img })
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.img
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.img
    }

    pub fn into_image(self) -> RgbImage {
        self.img
    }

    pub fn pixel(&self, x: u32, y: u32) -> RgbColor {
        let Rgb([r, g, b]) = *self.img.get_pixel(x, y);
        RgbColor::new(r, g, b)
    }

    /// Over-blends a layer onto the opaque paper, clipped to its footprint.
    pub fn overlay(&mut self, layer: &Layer) {
        let (x0, y0, _, _) = layer.footprint();
        for (lx, ly, px) in layer.image.enumerate_pixels() {
            let Rgba([r, g, b, a]) = *px;
            if a == 0 {
                continue;
            }
            self.blend_pixel(
                x0 + lx as i32,
                y0 + ly as i32,
                RgbColor::new(r, g, b),
                f32::from(a) / 255.0,
            );
        }
    }

    /// Attaches `mask` as the alpha channel. This is the only way a surface
    /// acquires a non-trivial alpha.
    pub fn apply_mask(self, mask: &Mask) -> CalligraphyResult<MaskedCanvas> {
        if mask.dimensions() != self.img.dimensions() {
            return Err(CalligraphyError::dimensions(mask.width(), mask.height()));
        }
        let (w, h) = self.img.dimensions();
        let rgba = RgbaImage::from_fn(w, h, |x, y| {
            let Rgb([r, g, b]) = *self.img.get_pixel(x, y);
            Rgba([r, g, b, mask.value(x, y)])
        });
        Ok(MaskedCanvas { img: rgba })
    }
}

impl Surface for Canvas {
    fn dimensions(&self) -> (u32, u32) {
        self.img.dimensions()
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: RgbColor, alpha: f32) {
        if !self.contains(x, y) {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let px = self.img.get_pixel_mut(x as u32, y as u32);
        let src = [color.r, color.g, color.b];
        for c in 0..3 {
            px[c] = lerp_u8(px[c], src[c], a);
        }
    }
}

/// Transparent RGBA buffer positioned on the artwork by its top-left anchor.
#[derive(Debug, Clone)]
pub struct Layer {
    pub image: RgbaImage,
    pub anchor: (i32, i32),
}

impl Layer {
    pub fn blank(width: u32, height: u32, anchor: (i32, i32)) -> CalligraphyResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::new(width, height),
            anchor,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Half-open artwork-space rectangle `(x0, y0, x1, y1)` covered by the layer.
    pub fn footprint(&self) -> (i32, i32, i32, i32) {
        let (x, y) = self.anchor;
        (
            x,
            y,
            x + self.image.width() as i32,
            y + self.image.height() as i32,
        )
    }

    /// Pixel under artwork coordinate `(x, y)`, if the layer covers it.
    pub fn pixel_at(&self, x: i32, y: i32) -> Option<&Rgba<u8>> {
        let lx = x - self.anchor.0;
        let ly = y - self.anchor.1;
        if lx < 0 || ly < 0 {
            return None;
        }
        self.image.get_pixel_checked(lx as u32, ly as u32)
    }
}

impl Surface for Layer {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: RgbColor, alpha: f32) {
        if !self.contains(x, y) {
            return;
        }
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        if a == 0 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        *px = composite::over(*px, color.rgba(a));
    }
}

/// Single-channel coverage: 255 is fully inside the paper, 0 fully outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(GrayImage);

impl Mask {
    pub const INCLUDED: u8 = 128;

    pub fn new(width: u32, height: u32) -> CalligraphyResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self(GrayImage::new(width, height)))
    }

    pub fn from_image(img: GrayImage) -> CalligraphyResult<Self> {
        check_dimensions(img.width(), img.height())?;
        Ok(Self(img))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn image(&self) -> &GrayImage {
        &self.0
    }

    pub fn image_mut(&mut self) -> &mut GrayImage {
        &mut self.0
    }

    pub fn into_image(self) -> GrayImage {
        self.0
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y).0[0]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.0.put_pixel(x, y, Luma([value]));
    }

    pub fn is_included(&self, x: u32, y: u32) -> bool {
        self.value(x, y) >= Self::INCLUDED
    }

    /// Included pixels with an excluded 4-neighbour (or on the image border).
    pub fn is_boundary(&self, x: u32, y: u32) -> bool {
        if !self.is_included(x, y) {
            return false;
        }
        let (w, h) = self.dimensions();
        if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
            return true;
        }
        !self.is_included(x - 1, y)
            || !self.is_included(x + 1, y)
            || !self.is_included(x, y - 1)
            || !self.is_included(x, y + 1)
    }

    pub fn boundary_pixel_count(&self) -> usize {
        let (w, h) = self.dimensions();
        (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_boundary(x, y))
            .count()
    }

    /// Inclusive bounding box `(min_x, min_y, max_x, max_y)` of included pixels.
    pub fn included_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, px) in self.0.enumerate_pixels() {
            if px.0[0] < Self::INCLUDED {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }
}

/// Paper carrying an established alpha channel. Never drawn on directly.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedCanvas {
    img: RgbaImage,
}

impl MaskedCanvas {
    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.img
    }

    pub fn into_image(self) -> RgbaImage {
        self.img
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.img.get_pixel(x, y).0[3]
    }

    /// Over-composites `layers` in order; see [`composite::composite`].
    pub fn composite(self, layers: impl IntoIterator<Item = Layer>) -> Self {
        Self {
            img: composite::composite(&self.img, layers),
        }
    }

    /// Lets `paint` draw on the RGB channels, then reattaches the alpha
    /// snapshot taken beforehand.
    pub fn paint_rgb(self, paint: impl FnOnce(&mut Canvas)) -> Self {
        let (w, h) = self.img.dimensions();
        let alpha: Vec<u8> = self.img.pixels().map(|px| px.0[3]).collect();
        let rgb = RgbImage::from_fn(w, h, |x, y| {
            let Rgba([r, g, b, _]) = *self.img.get_pixel(x, y);
            Rgb([r, g, b])
        });
        let mut canvas = Canvas { img: rgb };
        paint(&mut canvas);
        let img = RgbaImage::from_fn(w, h, |x, y| {
            let Rgb([r, g, b]) = *canvas.img.get_pixel(x, y);
            Rgba([r, g, b, alpha[(y * w + x) as usize]])
        });
        Self { img }
    }

    /// Ink diffusion pass; the paper's alpha is carried over untouched.
    pub fn bleed(self, params: &BleedParams, rng: &mut impl Rng) -> Self {
        let mut out = bleed::apply_bleed(&self.img, params, rng);
        for (dst, src) in out.pixels_mut().zip(self.img.pixels()) {
            dst.0[3] = src.0[3];
        }
        Self { img: out }
    }
}

pub(crate) fn lerp_u8(from: u8, to: u8, t: f32) -> u8 {
    let v = from as f32 + (to as f32 - from as f32) * t;
    v.round().clamp(0.0, 255.0) as u8
}
