//! Torn paper boundary masks.

use crate::blur::gaussian_gray;
use crate::draw::polygon_spans;
use crate::error::{CalligraphyResult, check_dimensions};
use crate::surface::Mask;
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, PI};
use tracing::{debug, instrument};

/// (frequency, amplitude per unit roughness, phase) over the sample index.
const WAVES: [(f32, f32, f32); 3] = [(0.02, 8.0, 0.0), (0.1, 4.0, 1.0), (0.5, 2.0, 2.0)];
const JITTER: f32 = 3.0;
/// Largest off-edge displacement per unit roughness.
pub const MAX_EXCURSION: f32 = 8.0 + 4.0 + 2.0 + JITTER;
const SAMPLE_SPACING: f32 = 15.0;
const MIN_SAMPLES: usize = 20;
const FIBER_MAX_LEN: u32 = 6;
const FIBER_FADE: i32 = 40;

/// Inset of the unperturbed rectangle; wide enough that no perturbed point
/// reaches the image border, but never past the middle of the short side.
pub fn margin(width: u32, height: u32, roughness: f32) -> f32 {
    let short = width.min(height) as f32;
    let inset = (short * 0.03).max(roughness * MAX_EXCURSION + 2.0);
    inset.min((short / 2.0 - 1.0).max(0.0))
}

/// Builds an irregular alpha mask: 255 inside the torn sheet, 0 outside,
/// with soft fibrous transitions along the tear.
#[instrument(skip(rng))]
pub fn generate_torn_mask(
    width: u32,
    height: u32,
    roughness: f32,
    rng: &mut impl Rng,
) -> CalligraphyResult<Mask> {
    check_dimensions(width, height)?;
    let roughness = if roughness.is_finite() {
        roughness.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let outline = torn_outline(width, height, roughness, rng);
    let mut mask = Mask::new(width, height)?;
    polygon_spans(&outline, width, height, |y, x0, x1| {
        for x in x0..x1 {
            mask.set(x, y, 255);
        }
    });

    let fibers = add_fibers(&mut mask, (0.4 * roughness).clamp(0.0, 0.4), rng);
    let mask = Mask::from_image(gaussian_gray(mask.image(), 0.5))?;
    debug!(
        points = outline.len(),
        fibers,
        boundary = mask.boundary_pixel_count(),
        "torn mask generated"
    );
    Ok(mask)
}

fn torn_outline(width: u32, height: u32, roughness: f32, rng: &mut impl Rng) -> Vec<(f32, f32)> {
    let m = margin(width, height, roughness);
    let (w, h) = (width as f32, height as f32);
    let corners = [(m, m), (w - m, m), (w - m, h - m), (m, h - m)];

    let mut points = Vec::new();
    for i in 0..4 {
        let (sx, sy) = corners[i];
        let (ex, ey) = corners[(i + 1) % 4];
        let horizontal = (sy - ey).abs() < f32::EPSILON;
        let len = ((ex - sx).powi(2) + (ey - sy).powi(2)).sqrt();
        let segments = MIN_SAMPLES.max((len / SAMPLE_SPACING) as usize);
        for s in 0..=segments {
            let t = s as f32 / segments as f32;
            let mut offset = 0.0;
            for (freq, amp, phase) in WAVES {
                offset += (s as f32 * freq + phase).sin() * amp * roughness;
            }
            offset += rng.random_range(-1.0..=1.0f32) * JITTER * roughness;
            let x = sx + t * (ex - sx);
            let y = sy + t * (ey - sy);
            let p = if horizontal {
                (x, y + offset)
            } else {
                (x + offset, y)
            };
            points.push((p.0.clamp(0.0, w - 1.0), p.1.clamp(0.0, h - 1.0)));
        }
    }
    points
}

/// 纤维: short runs pushed outward from boundary pixels. Returns how many
/// fibers were drawn.
fn add_fibers(mask: &mut Mask, probability: f32, rng: &mut impl Rng) -> usize {
    if probability <= 0.0 {
        return 0;
    }
    let (w, h) = mask.dimensions();
    let mut boundary = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if mask.is_boundary(x, y) {
                boundary.push((x, y, outward_angle(mask, x, y)));
            }
        }
    }

    let mut drawn = 0;
    for (x, y, normal) in boundary {
        if !rng.random_bool(f64::from(probability)) {
            continue;
        }
        let angle = normal + rng.random_range(-FRAC_PI_2..=FRAC_PI_2);
        let len = rng.random_range(1..=FIBER_MAX_LEN);
        let (sin, cos) = angle.sin_cos();
        // step 0 is the boundary pixel itself
        for step in 1..=len {
            let fx = (x as f32 + step as f32 * cos).round() as i32;
            let fy = (y as f32 + step as f32 * sin).round() as i32;
            if fx < 0 || fy < 0 || fx as u32 >= w || fy as u32 >= h {
                break;
            }
            let alpha = 255 - FIBER_FADE * step as i32;
            if alpha <= 0 {
                break;
            }
            let (fx, fy) = (fx as u32, fy as u32);
            let cur = mask.value(fx, fy);
            mask.set(fx, fy, cur.max(alpha as u8));
        }
        drawn += 1;
    }
    drawn
}

/// Mean direction toward excluded 4-neighbours.
fn outward_angle(mask: &Mask, x: u32, y: u32) -> f32 {
    let (w, h) = mask.dimensions();
    let mut nx = 0.0f32;
    let mut ny = 0.0f32;
    for (dx, dy) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
        let qx = x as i32 + dx;
        let qy = y as i32 + dy;
        let outside = qx < 0
            || qy < 0
            || qx as u32 >= w
            || qy as u32 >= h
            || !mask.is_included(qx as u32, qy as u32);
        if outside {
            nx += dx as f32;
            ny += dy as f32;
        }
    }
    if nx == 0.0 && ny == 0.0 {
        return 0.0;
    }
    ny.atan2(nx).rem_euclid(2.0 * PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalligraphyError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_roughness_is_the_inset_rectangle() {
        let mut rng = StdRng::seed_from_u64(5);
        let mask = generate_torn_mask(400, 300, 0.0, &mut rng).unwrap();
        let m = margin(400, 300, 0.0);
        assert!((m - 9.0).abs() < 1e-3);
        let (x0, y0, x1, y1) = mask.included_bounds().unwrap();
        let close = |a: u32, b: f32| (a as f32 - b).abs() <= 2.0;
        assert!(close(x0, m), "x0 {x0}");
        assert!(close(y0, m), "y0 {y0}");
        assert!(close(x1, 400.0 - m - 1.0), "x1 {x1}");
        assert!(close(y1, 300.0 - m - 1.0), "y1 {y1}");
        assert_eq!(mask.value(200, 150), 255);
        assert_eq!(mask.value(0, 0), 0);
    }

    #[test]
    fn perimeter_grows_with_roughness() {
        let perimeter = |r: f32| {
            let mut rng = StdRng::seed_from_u64(21);
            generate_torn_mask(400, 400, r, &mut rng)
                .unwrap()
                .boundary_pixel_count()
        };
        let (smooth, torn, ragged) = (perimeter(0.0), perimeter(0.3), perimeter(0.8));
        assert!(smooth < torn, "{smooth} !< {torn}");
        assert!(torn < ragged, "{torn} !< {ragged}");
    }

    #[test]
    fn rough_edges_stay_inside_the_image() {
        let mut rng = StdRng::seed_from_u64(2);
        let mask = generate_torn_mask(120, 90, 1.0, &mut rng).unwrap();
        for x in 0..120 {
            assert!(!mask.is_included(x, 0));
            assert!(!mask.is_included(x, 89));
        }
        let partial = mask
            .image()
            .pixels()
            .filter(|p| p.0[0] > 0 && p.0[0] < 255)
            .count();
        assert!(partial > 0);
    }

    #[test]
    fn degenerate_sizes_fail() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            generate_torn_mask(0, 10, 0.5, &mut rng),
            Err(CalligraphyError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn fibers_start_outside_the_sheet() {
        let mut mask = Mask::new(30, 30).unwrap();
        for y in 0..30 {
            for x in 0..15 {
                mask.set(x, y, 255);
            }
        }
        let mut rng = StdRng::seed_from_u64(12);
        let drawn = add_fibers(&mut mask, 1.0, &mut rng);
        assert!(drawn > 0);
        let mut outside = 0;
        for y in 1..29 {
            for x in 15..30 {
                let v = mask.value(x, y);
                if v > 0 {
                    outside += 1;
                    assert!(v <= 255 - FIBER_FADE as u8, "({x},{y}) = {v}");
                    assert!(x <= 14 + FIBER_MAX_LEN, "fiber too long at x={x}");
                }
            }
        }
        assert!(outside > 0);
        // a single step already leaves the sheet
        assert!((1..29).any(|y| mask.value(15, y) > 0));
    }

    #[test]
    fn small_sheets_keep_a_centred_inset() {
        for (w, h, r) in [(5, 5, 0.0), (30, 2, 1.0), (12, 40, 1.0), (8, 300, 0.5)] {
            let m = margin(w, h, r);
            assert!(m <= (w.min(h) as f32 / 2.0 - 1.0).max(0.0), "{w}x{h}: {m}");
        }
        let mut rng = StdRng::seed_from_u64(6);
        let mask = generate_torn_mask(5, 5, 0.0, &mut rng).unwrap();
        let (x0, y0, x1, y1) = mask.included_bounds().unwrap();
        assert!(x0 <= 2 && x1 >= 2 && y0 <= 2 && y1 >= 2);
        assert!(x1 > x0 && y1 > y0, "{x0},{y0},{x1},{y1}");
    }

    #[test]
    fn outward_points_away_from_the_sheet() {
        let mut mask = Mask::new(5, 5).unwrap();
        for y in 0..5 {
            for x in 2..5 {
                mask.set(x, y, 255);
            }
        }
        let angle = outward_angle(&mask, 2, 2);
        assert!((angle - PI).abs() < 1e-5);
    }
}
