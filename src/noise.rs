//! Stochastic mark fields used to build paper textures. Every generator
//! returns a fresh transparent [`Layer`] the size of the paper; randomness is
//! drawn only from the caller's stream.

use crate::color::RgbColor;
use crate::draw;
use crate::error::{CalligraphyResult, check_dimensions};
use crate::surface::{Layer, Surface};
use rand::Rng;
use std::f32::consts::PI;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnglePolicy {
    Uniform,
    /// Angles cluster around `axis` (or `axis + PI`) within `spread` radians.
    Grain { axis: f32, spread: f32 },
}

impl AnglePolicy {
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        match *self {
            AnglePolicy::Uniform => rng.random_range(0.0..2.0 * PI),
            AnglePolicy::Grain { axis, spread } => {
                let spread = spread.abs();
                let offset = if spread > 0.0 {
                    rng.random_range(-spread..=spread)
                } else {
                    0.0
                };
                let flip = if rng.random_bool(0.5) { PI } else { 0.0 };
                axis + offset + flip
            }
        }
    }
}

/// Per-channel darkening drawn independently from `rgb`, with the blue
/// channel optionally using its own (usually narrower) range.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorJitter {
    pub rgb: RangeInclusive<u8>,
    pub blue: Option<RangeInclusive<u8>>,
}

impl ColorJitter {
    pub fn uniform(rgb: RangeInclusive<u8>) -> Self {
        Self { rgb, blue: None }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> [u8; 3] {
        let blue = self.blue.as_ref().unwrap_or(&self.rgb);
        [
            rng.random_range(self.rgb.clone()),
            rng.random_range(self.rgb.clone()),
            rng.random_range(blue.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeParams {
    pub count: usize,
    pub length: RangeInclusive<u32>,
    pub angle: AnglePolicy,
    pub jitter: ColorJitter,
    /// Dab radius range; strokes are chains of dabs, not hard lines.
    pub dab_radius: RangeInclusive<f32>,
    pub dab_step: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeckleParams {
    pub count: usize,
    pub radius: RangeInclusive<u32>,
    pub jitter: ColorJitter,
    /// Probability that a pixel inside a blotch is painted (1.0 = solid).
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkParams {
    pub count: usize,
    pub vertices: RangeInclusive<u32>,
    pub max_dx: i32,
    pub max_dy: i32,
    pub jitter: ColorJitter,
}

/// `count` short fiber strokes, each in a single jittered tone of `base`.
pub fn generate_stroke_field(
    width: u32,
    height: u32,
    params: &StrokeParams,
    base: RgbColor,
    rng: &mut impl Rng,
) -> CalligraphyResult<Layer> {
    check_dimensions(width, height)?;
    let mut layer = Layer::blank(width, height, (0, 0))?;
    for _ in 0..params.count {
        let x = rng.random_range(0..=width) as f32;
        let y = rng.random_range(0..=height) as f32;
        let len = rng.random_range(params.length.clone()) as f32;
        let angle = params.angle.sample(rng);
        let color = base.darken(params.jitter.sample(rng));
        let to = (x + len * angle.cos(), y + len * angle.sin());
        let radius = params.dab_radius.clone();
        draw::dab_line(
            &mut layer,
            (x, y),
            to,
            params.dab_step,
            || {
                if radius.start() < radius.end() {
                    rng.random_range(radius.clone())
                } else {
                    *radius.start()
                }
            },
            color,
            1.0,
        );
    }
    Ok(layer)
}

/// Isolated round blotches, optionally only partially filled.
pub fn generate_speckle_field(
    width: u32,
    height: u32,
    params: &SpeckleParams,
    base: RgbColor,
    rng: &mut impl Rng,
) -> CalligraphyResult<Layer> {
    check_dimensions(width, height)?;
    let mut layer = Layer::blank(width, height, (0, 0))?;
    let coverage = params.coverage.clamp(0.0, 1.0);
    for _ in 0..params.count {
        let cx = rng.random_range(0..width) as i32;
        let cy = rng.random_range(0..height) as i32;
        let r = rng.random_range(params.radius.clone()) as i32;
        let color = base.darken(params.jitter.sample(rng));
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                if coverage < 1.0 && !rng.random_bool(coverage) {
                    continue;
                }
                layer.blend_pixel(cx + dx, cy + dy, color, 1.0);
            }
        }
    }
    Ok(layer)
}

/// Meandering polylines with a fresh tone per pixel, stamped as small
/// crosses; reads as hide grain rather than paper fiber.
pub fn generate_walk_field(
    width: u32,
    height: u32,
    params: &WalkParams,
    base: RgbColor,
    rng: &mut impl Rng,
) -> CalligraphyResult<Layer> {
    check_dimensions(width, height)?;
    let mut layer = Layer::blank(width, height, (0, 0))?;
    for _ in 0..params.count {
        let mut cur = (
            rng.random_range(0..=width) as i32,
            rng.random_range(0..=height) as i32,
        );
        let vertices = rng.random_range(params.vertices.clone());
        for _ in 0..vertices {
            let next = (
                cur.0 + rng.random_range(-params.max_dx..=params.max_dx),
                cur.1 + rng.random_range(-params.max_dy..=params.max_dy),
            );
            let steps = (next.0 - cur.0).abs().max((next.1 - cur.1).abs());
            for j in 0..steps {
                let t = j as f32 / steps as f32;
                let x = cur.0 + (t * (next.0 - cur.0) as f32) as i32;
                let y = cur.1 + (t * (next.1 - cur.1) as f32) as i32;
                if !layer.contains(x, y) {
                    continue;
                }
                let color = base.darken(params.jitter.sample(rng));
                for d in -1..=1 {
                    layer.blend_pixel(x + d, y, color, 1.0);
                    layer.blend_pixel(x, y + d, color, 1.0);
                }
            }
            cur = next;
        }
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fibers(count: usize, angle: AnglePolicy) -> StrokeParams {
        StrokeParams {
            count,
            length: 20..=40,
            angle,
            jitter: ColorJitter::uniform(5..=15),
            dab_radius: 0.8..=1.6,
            dab_step: 2.0,
        }
    }

    fn painted(layer: &Layer) -> usize {
        layer.image.pixels().filter(|p| p.0[3] > 0).count()
    }

    #[test]
    fn stroke_field_darkens_base() {
        let base = RgbColor::new(242, 232, 212);
        let mut rng = StdRng::seed_from_u64(1);
        let layer =
            generate_stroke_field(120, 80, &fibers(30, AnglePolicy::Uniform), base, &mut rng)
                .unwrap();
        assert!(painted(&layer) > 200);
        for px in layer.image.pixels().filter(|p| p.0[3] == 255) {
            assert!(px.0[0] <= 242 - 5 && px.0[0] >= 242 - 15);
        }
    }

    #[test]
    fn zero_dimensions_fail() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = fibers(1, AnglePolicy::Uniform);
        assert!(generate_stroke_field(0, 10, &params, RgbColor::WHITE, &mut rng).is_err());
        let speckles = SpeckleParams {
            count: 1,
            radius: 1..=2,
            jitter: ColorJitter::uniform(10..=25),
            coverage: 1.0,
        };
        assert!(generate_speckle_field(10, 0, &speckles, RgbColor::WHITE, &mut rng).is_err());
    }

    #[test]
    fn same_seed_same_field() {
        let params = fibers(25, AnglePolicy::Uniform);
        let a = generate_stroke_field(
            64,
            64,
            &params,
            RgbColor::WHITE,
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();
        let b = generate_stroke_field(
            64,
            64,
            &params,
            RgbColor::WHITE,
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();
        assert_eq!(a.image, b.image);
    }

    #[test]
    fn horizontal_grain_stays_flat() {
        let mut rng = StdRng::seed_from_u64(4);
        let policy = AnglePolicy::Grain {
            axis: 0.0,
            spread: 0.1,
        };
        for _ in 0..200 {
            let a = policy.sample(&mut rng);
            assert!(a.sin().abs() < 0.11);
        }
    }

    #[test]
    fn speckles_respect_coverage() {
        let params = |coverage| SpeckleParams {
            count: 40,
            radius: 3..=4,
            jitter: ColorJitter::uniform(10..=25),
            coverage,
        };
        let base = RgbColor::new(250, 245, 230);
        let full = generate_speckle_field(
            100,
            100,
            &params(1.0),
            base,
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();
        let sparse = generate_speckle_field(
            100,
            100,
            &params(0.3),
            base,
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();
        assert!(painted(&sparse) < painted(&full));
    }

    #[test]
    fn walks_leave_marks() {
        let params = WalkParams {
            count: 10,
            vertices: 3..=8,
            max_dx: 20,
            max_dy: 10,
            jitter: ColorJitter {
                rgb: 10..=25,
                blue: Some(8..=20),
            },
        };
        let layer = generate_walk_field(
            80,
            80,
            &params,
            RgbColor::new(250, 245, 230),
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        assert!(painted(&layer) > 20);
    }
}
