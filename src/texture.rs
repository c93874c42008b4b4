use crate::blur::gaussian_gray;
use crate::color::RgbColor;
use crate::error::{CalligraphyError, CalligraphyResult, check_dimensions};
use crate::noise::{
    AnglePolicy, ColorJitter, SpeckleParams, StrokeParams, WalkParams, generate_speckle_field,
    generate_stroke_field, generate_walk_field,
};
use crate::surface::{Canvas, Surface, lerp_u8};
use image::{GrayImage, Luma};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialProfile {
    /// 生宣: long fibers, speckles, uneven sheen
    Xuan,
    /// 熟宣: short fibers, fine grain
    Rice,
    /// 皮纸: leathery grain with stains
    Parchment,
}

impl MaterialProfile {
    pub fn name(self) -> &'static str {
        match self {
            MaterialProfile::Xuan => "xuan",
            MaterialProfile::Rice => "rice",
            MaterialProfile::Parchment => "parchment",
        }
    }

    pub fn base_color(self) -> RgbColor {
        match self {
            MaterialProfile::Xuan => RgbColor::new(242, 232, 212),
            MaterialProfile::Rice => RgbColor::new(248, 240, 225),
            MaterialProfile::Parchment => RgbColor::new(250, 245, 230),
        }
    }
}

impl FromStr for MaterialProfile {
    type Err = CalligraphyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xuan" | "fibrous" | "rough" => Ok(MaterialProfile::Xuan),
            "rice" | "smooth" | "fine" => Ok(MaterialProfile::Rice),
            "parchment" | "leathery" | "aged" => Ok(MaterialProfile::Parchment),
            _ => Err(CalligraphyError::UnsupportedMaterialProfile(s.to_string())),
        }
    }
}

impl fmt::Display for MaterialProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds an opaque paper surface for `profile`.
#[instrument(skip(rng))]
pub fn synthesize(
    width: u32,
    height: u32,
    profile: MaterialProfile,
    rng: &mut impl Rng,
) -> CalligraphyResult<Canvas> {
    check_dimensions(width, height)?;
    let base = profile.base_color();
    let mut canvas = Canvas::new(width, height, base)?;
    let area = width as usize * height as usize;

    match profile {
        MaterialProfile::Xuan => {
            let fibers = StrokeParams {
                count: area / 400,
                length: 30..=150,
                angle: AnglePolicy::Uniform,
                jitter: ColorJitter::uniform(5..=15),
                dab_radius: 1.0..=2.0,
                dab_step: 2.0,
            };
            canvas.overlay(&generate_stroke_field(width, height, &fibers, base, rng)?);
            let speckles = SpeckleParams {
                count: area / 800,
                radius: 1..=4,
                jitter: ColorJitter::uniform(10..=25),
                coverage: 1.0,
            };
            canvas.overlay(&generate_speckle_field(width, height, &speckles, base, rng)?);
            apply_highlight(&mut canvas, base, rng);
        }
        MaterialProfile::Rice => {
            let fibers = StrokeParams {
                count: area / 400,
                length: 10..=60,
                angle: AnglePolicy::Uniform,
                jitter: ColorJitter::uniform(5..=12),
                dab_radius: 0.5..=0.5,
                dab_step: 1.0,
            };
            canvas.overlay(&generate_stroke_field(width, height, &fibers, base, rng)?);
            apply_grain(&mut canvas, 3, 1.0, rng);
            apply_blooms(&mut canvas, area / 4000, RgbColor::new(253, 248, 238), rng);
            apply_highlight(&mut canvas, base, rng);
        }
        MaterialProfile::Parchment => {
            let grain = WalkParams {
                count: area / 300,
                vertices: 3..=8,
                max_dx: 20,
                max_dy: 10,
                jitter: ColorJitter {
                    rgb: 10..=25,
                    blue: Some(8..=20),
                },
            };
            canvas.overlay(&generate_walk_field(width, height, &grain, base, rng)?);
            let stains = SpeckleParams {
                count: area / 800,
                radius: 3..=10,
                jitter: ColorJitter::uniform(8..=20),
                coverage: 0.6,
            };
            canvas.overlay(&generate_speckle_field(width, height, &stains, base, rng)?);
            apply_roughness(&mut canvas, area / 100, RgbColor::new(240, 235, 220), rng);
        }
    }

    debug!(profile = %profile, width, height, "paper texture synthesized");
    Ok(canvas)
}

/// Yellowing spots over an existing sheet; `intensity` in 0..=1.
pub fn age_paper(canvas: &mut Canvas, intensity: f32, rng: &mut impl Rng) {
    let intensity = intensity.clamp(0.0, 1.0);
    let spots = (25.0 * intensity) as usize;
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    for _ in 0..spots {
        let cx = rng.random_range(0..w);
        let cy = rng.random_range(0..h);
        let r = rng.random_range(2..=8);
        let img = canvas.image_mut();
        for y in (cy - r).max(0)..(cy + r).min(h) {
            for x in (cx - r).max(0)..(cx + r).min(w) {
                let d = (((x - cx).pow(2) + (y - cy).pow(2)) as f32).sqrt();
                if d >= r as f32 {
                    continue;
                }
                let fade = 1.0 - d / r as f32 * 0.1;
                let px = img.get_pixel_mut(x as u32, y as u32);
                px[0] = (f32::from(px[0]) * fade) as u8;
                px[1] = (f32::from(px[1]) * fade * 0.98) as u8;
                px[2] = (f32::from(px[2]) * fade * 0.95) as u8;
            }
        }
    }
}

/// 光泽: sheet undulation. A lighting field starts fully lit; each bump
/// fades from lit at its centre to unlit at its rim. After a wide blur the
/// field mixes the texture (lit) with a flat tint 10 levels below `base`
/// (unlit), so only the bump rims darken.
fn apply_highlight(canvas: &mut Canvas, base: RgbColor, rng: &mut impl Rng) {
    let (w, h) = (canvas.width(), canvas.height());
    let mut field = GrayImage::from_pixel(w, h, Luma([255]));
    let count = (w / 10).max(1);
    for _ in 0..count {
        let cx = rng.random_range(0..w) as f32;
        let cy = rng.random_range(0..h) as f32;
        let r = rng.random_range(50.0..=200.0f32);
        let x0 = (cx - r).max(0.0) as u32;
        let x1 = ((cx + r).ceil() as u32).min(w);
        let y0 = (cy - r).max(0.0) as u32;
        let y1 = ((cy + r).ceil() as u32).min(h);
        for y in y0..y1 {
            for x in x0..x1 {
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                if d >= r {
                    continue;
                }
                // later bumps paint over earlier ones
                field.put_pixel(x, y, Luma([(255.0 * (1.0 - d / r)) as u8]));
            }
        }
    }
    let field = gaussian_gray(&field, 20.0);

    let tint = base.darken([10, 10, 10]);
    let tint = [tint.r, tint.g, tint.b];
    for (x, y, px) in canvas.image_mut().enumerate_pixels_mut() {
        let t = f32::from(field.get_pixel(x, y).0[0]) / 255.0;
        for c in 0..3 {
            px[c] = lerp_u8(tint[c], px[c], t);
        }
    }
}

/// Per-pixel ±`amplitude` luminance grain, softened by a Gaussian blur.
fn apply_grain(canvas: &mut Canvas, amplitude: u8, sigma: f32, rng: &mut impl Rng) {
    let (w, h) = (canvas.width(), canvas.height());
    let amp = i16::from(amplitude);
    let noise = GrayImage::from_fn(w, h, |_, _| {
        Luma([(128 + rng.random_range(-amp..=amp)) as u8])
    });
    let noise = gaussian_gray(&noise, sigma);
    for (x, y, px) in canvas.image_mut().enumerate_pixels_mut() {
        let delta = i16::from(noise.get_pixel(x, y).0[0]) - 128;
        for c in 0..3 {
            px[c] = (i16::from(px[c]) + delta).clamp(0, 255) as u8;
        }
    }
}

/// Large faint patches where the sheet looks more even.
fn apply_blooms(canvas: &mut Canvas, count: usize, tint: RgbColor, rng: &mut impl Rng) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    for _ in 0..count.max(1) {
        let cx = rng.random_range(0..w);
        let cy = rng.random_range(0..h);
        let r = rng.random_range(20..=60);
        for y in (cy - r).max(0)..(cy + r).min(h) {
            for x in (cx - r).max(0)..(cx + r).min(w) {
                let d = (((x - cx).pow(2) + (y - cy).pow(2)) as f32).sqrt();
                if d < r as f32 {
                    canvas.blend_pixel(x, y, tint, 0.3 * (1.0 - d / r as f32));
                }
            }
        }
    }
}

/// 粗糙感: sparse random impulses, blurred, pulling the sheet toward `tint`.
fn apply_roughness(canvas: &mut Canvas, count: usize, tint: RgbColor, rng: &mut impl Rng) {
    let (w, h) = (canvas.width(), canvas.height());
    let mut field = GrayImage::new(w, h);
    for _ in 0..count {
        let x = rng.random_range(0..w);
        let y = rng.random_range(0..h);
        field.put_pixel(x, y, Luma([rng.random_range(100..=255)]));
    }
    let field = gaussian_gray(&field, 2.0);
    for (x, y, px) in canvas.image_mut().enumerate_pixels_mut() {
        let t = f32::from(field.get_pixel(x, y).0[0]) / 255.0;
        if t <= 0.0 {
            continue;
        }
        let target = [tint.r, tint.g, tint.b];
        for c in 0..3 {
            px[c] = lerp_u8(px[c], target[c], (t * 4.0).min(1.0) * 0.5);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn mean_rgb(canvas: &Canvas) -> [f64; 3] {
        let n = f64::from(canvas.width() * canvas.height());
        let mut acc = [0f64; 3];
        for px in canvas.image().pixels() {
            for c in 0..3 {
                acc[c] += f64::from(px[c]);
            }
        }
        acc.map(|v| v / n)
    }

    #[test]
    fn profile_names_and_aliases() {
        assert_eq!(
            "Fibrous".parse::<MaterialProfile>().unwrap(),
            MaterialProfile::Xuan
        );
        assert_eq!(
            "smooth".parse::<MaterialProfile>().unwrap(),
            MaterialProfile::Rice
        );
        assert_eq!(
            "leathery".parse::<MaterialProfile>().unwrap(),
            MaterialProfile::Parchment
        );
        assert!(matches!(
            "silk".parse::<MaterialProfile>(),
            Err(CalligraphyError::UnsupportedMaterialProfile(name)) if name == "silk"
        ));
        assert_eq!(MaterialProfile::Rice.to_string(), "rice");
    }

    #[test]
    fn every_profile_stays_near_its_base() {
        for profile in [
            MaterialProfile::Xuan,
            MaterialProfile::Rice,
            MaterialProfile::Parchment,
        ] {
            let mut rng = StdRng::seed_from_u64(11);
            let canvas = synthesize(160, 120, profile, &mut rng).unwrap();
            let base = profile.base_color();
            let mean = mean_rgb(&canvas);
            for (c, want) in mean.iter().zip([base.r, base.g, base.b]) {
                assert!(
                    (c - f64::from(want)).abs() < 25.0,
                    "{profile}: {c} vs {want}"
                );
            }
            let distinct: std::collections::HashSet<_> = canvas.image().pixels().collect();
            assert!(distinct.len() > 10, "{profile} should not be flat");
        }
    }

    #[test]
    fn seeded_synthesis_is_reproducible() {
        let a = synthesize(80, 60, MaterialProfile::Xuan, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = synthesize(80, 60, MaterialProfile::Xuan, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a.image(), b.image());
    }

    #[test]
    fn zero_area_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            synthesize(0, 50, MaterialProfile::Rice, &mut rng),
            Err(CalligraphyError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn highlight_leaves_unlit_paper_alone() {
        // narrow and tall: two bumps cannot cover the whole sheet
        let base = MaterialProfile::Xuan.base_color();
        let fresh = Canvas::new(20, 2000, base).unwrap();
        let mut lit = fresh.clone();
        apply_highlight(&mut lit, base, &mut StdRng::seed_from_u64(4));
        let mut untouched = 0;
        let mut darkened = 0;
        for (a, b) in lit.image().pixels().zip(fresh.image().pixels()) {
            for c in 0..3 {
                assert!(a[c] <= b[c] && b[c] - a[c] <= 10);
            }
            if a == b {
                untouched += 1;
            } else {
                darkened += 1;
            }
        }
        assert!(untouched > 20 * 200, "{untouched} untouched");
        assert!(darkened > 0);
    }

    #[test]
    fn aging_only_darkens() {
        let mut rng = StdRng::seed_from_u64(8);
        let fresh = Canvas::new(60, 60, RgbColor::new(250, 245, 235)).unwrap();
        let mut aged = fresh.clone();
        age_paper(&mut aged, 1.0, &mut rng);
        let mut changed = 0;
        for (a, b) in aged.image().pixels().zip(fresh.image().pixels()) {
            assert!(a[0] <= b[0] && a[1] <= b[1] && a[2] <= b[2]);
            if a != b {
                changed += 1;
                // blue drops the most, so spots turn yellow
                assert!(b[2] - a[2] >= b[0] - a[0]);
            }
        }
        assert!(changed > 0);
        let mut untouched = fresh.clone();
        age_paper(&mut untouched, 0.0, &mut rng);
        assert_eq!(untouched.image(), fresh.image());
    }
}
