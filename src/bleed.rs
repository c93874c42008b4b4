//! Ink diffusion (洇墨): darkening spreads from glyph strokes into the
//! surrounding paper through a separate overlay, so the paper's own pixels
//! and alpha are never painted directly.

use crate::blur::{Axis, box_gray, gaussian_gray};
use crate::color::{INK_THRESHOLD, luma};
use crate::composite::over;
use crate::error::CalligraphyError;
use image::{GrayImage, Rgba, RgbaImage};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::f32::consts::PI;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Anisotropic spread: displacement scale per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionalBias {
    pub horizontal: f32,
    pub vertical: f32,
}

impl DirectionalBias {
    /// Ink soaking downward more than sideways.
    pub const GRAVITY: Self = Self {
        horizontal: 0.7,
        vertical: 1.5,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BleedParams {
    /// 0 leaves the image untouched, 1 is the strongest supported bleed.
    pub intensity: f32,
    pub bias: Option<DirectionalBias>,
    /// Copy original ink pixels back after compositing.
    pub preserve_glyphs: bool,
    /// Darker ink emits more and stronger droplets.
    pub pressure_sensitive: bool,
    /// Fraction (0..=1) of one percent of pixels tried for paper speckles.
    pub speckle_density: f32,
    /// Ink pixels are sampled every `stride` pixels in both axes.
    pub stride: u32,
}

impl BleedParams {
    pub fn new(intensity: f32) -> Self {
        Self {
            intensity,
            bias: None,
            preserve_glyphs: true,
            pressure_sensitive: false,
            speckle_density: 0.0,
            stride: 2,
        }
    }

    pub fn with_bias(mut self, bias: DirectionalBias) -> Self {
        self.bias = Some(bias);
        self
    }

    pub fn preset(preset: BleedPreset) -> Self {
        let (intensity, gravity, pressure, preserve, speckle) = match preset {
            BleedPreset::Traditional => (0.3, true, true, true, 0.2),
            BleedPreset::Artistic => (0.7, false, false, false, 0.5),
            BleedPreset::Realistic => (0.5, true, true, true, 0.3),
            BleedPreset::Subtle => (0.2, true, true, true, 0.1),
        };
        Self {
            intensity,
            bias: gravity.then_some(DirectionalBias::GRAVITY),
            preserve_glyphs: preserve,
            pressure_sensitive: pressure,
            speckle_density: speckle,
            stride: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleedPreset {
    /// light vertical soak, glyphs kept crisp
    Traditional,
    /// strong isotropic spread, no glyph protection
    Artistic,
    Realistic,
    Subtle,
}

impl FromStr for BleedPreset {
    type Err = CalligraphyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traditional" => Ok(BleedPreset::Traditional),
            "artistic" => Ok(BleedPreset::Artistic),
            "realistic" => Ok(BleedPreset::Realistic),
            "subtle" => Ok(BleedPreset::Subtle),
            other => Err(CalligraphyError::config(format!(
                "unknown bleed preset '{}'",
                other
            ))),
        }
    }
}

/// Per-call constants derived from intensity.
struct Strength {
    intensity: f32,
    droplets: u32,
    max_distance: u32,
    peak_alpha: f32,
    band: f32,
    ceiling: f32,
}

impl Strength {
    fn new(intensity: f32) -> Self {
        let peak_alpha = 30.0 + 120.0 * intensity;
        Self {
            intensity,
            droplets: 1 + (4.0 * intensity).round() as u32,
            max_distance: 1 + (5.0 * intensity).round() as u32,
            peak_alpha,
            band: 0.2 + 0.4 * intensity,
            ceiling: (2.0 * peak_alpha).min(255.0),
        }
    }
}

/// Returns a copy of `image` with ink diffused into neighbouring paper.
#[instrument(skip(image, rng), fields(width = image.width(), height = image.height()))]
pub fn apply_bleed(image: &RgbaImage, params: &BleedParams, rng: &mut impl Rng) -> RgbaImage {
    let intensity = if params.intensity.is_finite() {
        params.intensity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if intensity <= 0.0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let lum: Vec<u8> = image
        .as_raw()
        .par_chunks_exact(4)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    let ink: Vec<bool> = lum.par_iter().map(|&l| l < INK_THRESHOLD).collect();
    if !ink.iter().any(|&i| i) {
        debug!("no ink pixels, bleed skipped");
        return image.clone();
    }

    let strength = Strength::new(intensity);
    let (hx, vy) = params
        .bias
        .map(|b| (b.horizontal, b.vertical))
        .unwrap_or((1.0, 1.0));
    let mut acc = vec![0f32; (w * h) as usize];
    let mut sources = 0usize;
    let stride = params.stride.max(1) as usize;

    for y in (0..h).step_by(stride) {
        for x in (0..w).step_by(stride) {
            let idx = (y * w + x) as usize;
            if !ink[idx] {
                continue;
            }
            let pressure = if params.pressure_sensitive {
                f32::from(INK_THRESHOLD - lum[idx]) / f32::from(INK_THRESHOLD)
            } else {
                1.0
            };
            if params.pressure_sensitive && pressure < 0.3 && rng.random_bool(0.5) {
                continue;
            }
            sources += 1;
            let droplets = if params.pressure_sensitive {
                ((strength.droplets as f32 * pressure).round() as u32).max(1)
            } else {
                strength.droplets
            };
            for _ in 0..droplets {
                let angle = rng.random_range(0.0..2.0 * PI);
                let d = rng.random_range(1..=strength.max_distance);
                let nx = x as f32 + d as f32 * angle.cos() * hx;
                let ny = y as f32 + d as f32 * angle.sin() * vy;
                let falloff = 1.0 - (d - 1) as f32 / strength.max_distance as f32;
                let jitter = 1.0 + rng.random_range(-0.5..=0.5) * strength.band;
                let mut alpha = strength.peak_alpha * falloff * jitter;
                if params.pressure_sensitive {
                    alpha *= 0.5 + 0.5 * pressure;
                }
                let radius = if rng.random_bool(f64::from(strength.intensity)) {
                    2
                } else {
                    1
                };
                stamp(
                    &mut acc,
                    &ink,
                    (w, h),
                    (nx.round() as i32, ny.round() as i32),
                    radius,
                    alpha / 3.0,
                    strength.ceiling,
                );
            }
        }
    }

    let overlay = GrayImage::from_fn(w, h, |x, y| {
        image::Luma([acc[(y * w + x) as usize].round().clamp(0.0, 255.0) as u8])
    });
    let overlay = match params.bias {
        None => gaussian_gray(&overlay, 0.5 + intensity),
        Some(bias) => {
            let axis = if bias.vertical >= bias.horizontal {
                Axis::Vertical
            } else {
                Axis::Horizontal
            };
            box_gray(&gaussian_gray(&overlay, 0.3), 2, axis)
        }
    };

    let mut out = image.clone();
    out.par_chunks_exact_mut(4)
        .zip(overlay.as_raw().par_iter())
        .for_each(|(px, &a)| {
            if a == 0 {
                return;
            }
            // darken colour only; coverage stays with the paper
            let mixed = over(Rgba([px[0], px[1], px[2], 255]), Rgba([0, 0, 0, a]));
            px[..3].copy_from_slice(&mixed.0[..3]);
        });

    if params.speckle_density > 0.0 {
        add_speckles(&mut out, params.speckle_density.min(1.0), intensity, rng);
    }

    if params.preserve_glyphs {
        for ((dst, src), &is_ink) in out.pixels_mut().zip(image.pixels()).zip(&ink) {
            if is_ink {
                *dst = *src;
            }
        }
    }

    debug!(sources, intensity, "ink bleed applied");
    out
}

/// Soft disk of darkening onto paper pixels only.
fn stamp(
    acc: &mut [f32],
    ink: &[bool],
    (w, h): (u32, u32),
    (cx, cy): (i32, i32),
    radius: i32,
    alpha: f32,
    ceiling: f32,
) {
    let reach = radius as f32 + 1.0;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (px, py) = (cx + dx, cy + dy);
            if px < 0 || py < 0 || px as u32 >= w || py as u32 >= h {
                continue;
            }
            let idx = (py as u32 * w + px as u32) as usize;
            if ink[idx] {
                continue;
            }
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            acc[idx] = (acc[idx] + alpha * (1.0 - d / reach)).min(ceiling);
        }
    }
}

/// 纸面噪点: a few light pixels darkened a little.
fn add_speckles(img: &mut RgbaImage, density: f32, intensity: f32, rng: &mut impl Rng) {
    let (w, h) = img.dimensions();
    let count = (w as f32 * h as f32 * density * 0.01) as usize;
    let max_darken = ((25.0 * intensity) as u8).max(5);
    for _ in 0..count {
        let x = rng.random_range(0..w);
        let y = rng.random_range(0..h);
        let px = img.get_pixel_mut(x, y);
        let mean = (u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2])) / 3;
        if mean <= 180 || !rng.random_bool(0.3) {
            continue;
        }
        let amount = rng.random_range(5..=max_darken);
        for c in 0..3 {
            px[c] = px[c].saturating_sub(amount);
        }
    }
}
