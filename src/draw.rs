use crate::color::RgbColor;
use crate::fonts::GlyphBitmap;
use crate::surface::Surface;

/// Anti-aliased disc; coverage falls off across the last pixel of the rim.
pub fn dab<S: Surface>(img: &mut S, cx: f32, cy: f32, r: f32, color: RgbColor, alpha: f32) {
    let (w, h) = img.dimensions();
    if r <= 0.0 || alpha <= 0.0 {
        return;
    }
    let min_x = (cx - r - 1.0).floor().max(0.0) as i32;
    let max_x = (cx + r + 1.0).ceil().min(w as f32 - 1.0) as i32;
    let min_y = (cy - r - 1.0).floor().max(0.0) as i32;
    let max_y = (cy + r + 1.0).ceil().min(h as f32 - 1.0) as i32;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            let coverage = (r + 0.5 - d).clamp(0.0, 1.0);
            if coverage > 0.0 {
                img.blend_pixel(x, y, color, alpha * coverage);
            }
        }
    }
}

/// Hard-edged disc, matching an ellipse fill of radius `r`.
pub fn fill_disc<S: Surface>(img: &mut S, cx: f32, cy: f32, r: f32, color: RgbColor) {
    let (w, h) = img.dimensions();
    let r2 = r * r;
    let min_x = (cx - r).floor().max(0.0) as i32;
    let max_x = (cx + r).ceil().min(w as f32 - 1.0) as i32;
    let min_y = (cy - r).floor().max(0.0) as i32;
    let max_y = (cy + r).ceil().min(h as f32 - 1.0) as i32;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r2 {
                img.blend_pixel(x, y, color, 1.0);
            }
        }
    }
}

/// Annulus between `r - width` and `r`.
pub fn ring<S: Surface>(img: &mut S, cx: f32, cy: f32, r: f32, width: f32, color: RgbColor) {
    let (w, h) = img.dimensions();
    let inner = (r - width).max(0.0);
    let (r2, i2) = (r * r, inner * inner);
    let min_x = (cx - r).floor().max(0.0) as i32;
    let max_x = (cx + r).ceil().min(w as f32 - 1.0) as i32;
    let min_y = (cy - r).floor().max(0.0) as i32;
    let max_y = (cy + r).ceil().min(h as f32 - 1.0) as i32;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 <= r2 && d2 >= i2 {
                img.blend_pixel(x, y, color, 1.0);
            }
        }
    }
}

pub fn fill_rect<S: Surface>(
    img: &mut S,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    color: RgbColor,
    alpha: f32,
) {
    let (min_x, max_x) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    let (min_y, max_y) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    let (w, h) = img.dimensions();
    let mut y = min_y.max(0.0) as u32;
    while (y as f32) < max_y && y < h {
        let mut x = min_x.max(0.0) as u32;
        while (x as f32) < max_x && x < w {
            img.blend_pixel(x as i32, y as i32, color, alpha);
            x += 1;
        }
        y += 1;
    }
}

/// Rectangle border of `width` pixels drawn inward from the given bounds.
pub fn outline_rect<S: Surface>(
    img: &mut S,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    width: f32,
    color: RgbColor,
) {
    fill_rect(img, x1, y1, x2, y1 + width, color, 1.0);
    fill_rect(img, x1, y2 - width, x2, y2, color, 1.0);
    fill_rect(img, x1, y1 + width, x1 + width, y2 - width, color, 1.0);
    fill_rect(img, x2 - width, y1 + width, x2, y2 - width, color, 1.0);
}

/// Line rendered as a sequence of dabs every `step` pixels.
pub fn dab_line<S: Surface>(
    img: &mut S,
    from: (f32, f32),
    to: (f32, f32),
    step: f32,
    mut radius_at: impl FnMut() -> f32,
    color: RgbColor,
    alpha: f32,
) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = (dx * dx + dy * dy).sqrt();
    let steps = (len / step.max(0.5)).floor() as usize;
    for i in 0..=steps {
        let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
        dab(img, from.0 + dx * t, from.1 + dy * t, radius_at(), color, alpha);
    }
}

/// Even-odd scanline fill of a closed polygon, sampled at pixel centres.
/// Calls `span(y, x_start, x_end_exclusive)` for every covered run.
pub fn polygon_spans(
    points: &[(f32, f32)],
    width: u32,
    height: u32,
    mut span: impl FnMut(u32, u32, u32),
) {
    if points.len() < 3 {
        return;
    }
    let mut xs: Vec<f32> = Vec::with_capacity(8);
    for y in 0..height {
        let sy = y as f32 + 0.5;
        xs.clear();
        for (i, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(i + 1) % points.len()];
            if (y0 <= sy && y1 > sy) || (y1 <= sy && y0 > sy) {
                let t = (sy - y0) / (y1 - y0);
                xs.push(x0 + t * (x1 - x0));
            }
        }
        xs.sort_by(|a, b| a.total_cmp(b));
        for pair in xs.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0) as u32;
            let end = ((pair[1] - 0.5).floor() + 1.0).clamp(0.0, width as f32) as u32;
            if start < end {
                span(y, start, end);
            }
        }
    }
}

/// Paints a glyph coverage bitmap with its top-left corner at `(x, y)`.
pub fn blit_glyph<S: Surface>(
    img: &mut S,
    glyph: &GlyphBitmap,
    x: i32,
    y: i32,
    color: RgbColor,
    opacity: f32,
) {
    for gy in 0..glyph.height {
        for gx in 0..glyph.width {
            let cov = glyph.coverage[gy * glyph.width + gx];
            if cov == 0 {
                continue;
            }
            img.blend_pixel(
                x + gx as i32,
                y + gy as i32,
                color,
                opacity * f32::from(cov) / 255.0,
            );
        }
    }
}
