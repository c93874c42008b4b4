use crate::surface::Layer;
use image::{Rgba, RgbaImage};
use tracing::debug;

/// Straight (non-premultiplied) source-over for 8-bit RGBA.
pub fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }
    let da = u32::from(dst[3]);
    // out_a = sa + da * (1 - sa), all in 0..=255 fixed point
    let dw = mul_div255(da, 255 - sa);
    let out_a = sa + dw;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * sa + u32::from(dst[i]) * dw;
        out[i] = ((num + out_a / 2) / out_a).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    Rgba(out)
}

/// Over-composites `layers` onto a copy of `base`, in order.
///
/// Each layer is clipped to the base and only touches pixels inside its own
/// footprint, so alpha outside every layer is returned bit-for-bit. With no
/// layers the result equals `base`.
pub fn composite(base: &RgbaImage, layers: impl IntoIterator<Item = Layer>) -> RgbaImage {
    let mut out = base.clone();
    for layer in layers {
        blend_layer(&mut out, &layer);
    }
    out
}

fn blend_layer(dst: &mut RgbaImage, layer: &Layer) {
    let (w, h) = dst.dimensions();
    let (x0, y0, x1, y1) = layer.footprint();
    let cx0 = x0.max(0);
    let cy0 = y0.max(0);
    let cx1 = x1.min(w as i32);
    let cy1 = y1.min(h as i32);
    if cx0 >= cx1 || cy0 >= cy1 {
        debug!(anchor = ?layer.anchor, "layer lies entirely outside the artwork");
        return;
    }
    for y in cy0..cy1 {
        for x in cx0..cx1 {
            let src = *layer
                .image
                .get_pixel((x - x0) as u32, (y - y0) as u32);
            if src[3] == 0 {
                continue;
            }
            let d = dst.get_pixel_mut(x as u32, y as u32);
            *d = over(*d, src);
        }
    }
}

fn mul_div255(x: u32, y: u32) -> u32 {
    (x * y + 127) / 255
}
