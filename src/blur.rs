//! Separable blurs over single-channel fields (masks, alpha overlays,
//! lighting fields). Rows are processed in parallel; every output pixel is a
//! pure function of the input, so results do not depend on scheduling.

use image::GrayImage;
use rayon::prelude::*;

/// Gaussian blur with standard deviation `sigma`, clamping at the borders.
pub fn gaussian_gray(src: &GrayImage, sigma: f32) -> GrayImage {
    if !sigma.is_finite() || sigma <= 0.0 {
        return src.clone();
    }
    let kernel = gaussian_kernel_q16(sigma);
    let (w, h) = src.dimensions();
    let tmp = horizontal_pass(src.as_raw(), w, h, &kernel);
    let out = vertical_pass(&tmp, w, h, &kernel);
    GrayImage::from_raw(w, h, out).unwrap_or_else(|| src.clone())
}

/// Box blur along one axis only; `radius` pixels each side.
pub fn box_gray(src: &GrayImage, radius: u32, axis: Axis) -> GrayImage {
    if radius == 0 {
        return src.clone();
    }
    let taps = (2 * radius + 1) as u64;
    let weight = (65536 + taps / 2) / taps;
    let mut kernel = vec![weight as u32; taps as usize];
    // keep the kernel summing to exactly 1.0 in Q16
    let total: u64 = kernel.iter().map(|&k| u64::from(k)).sum();
    let mid = kernel.len() / 2;
    kernel[mid] = (i64::from(kernel[mid]) + 65536 - total as i64) as u32;

    let (w, h) = src.dimensions();
    let out = match axis {
        Axis::Horizontal => horizontal_pass(src.as_raw(), w, h, &kernel),
        Axis::Vertical => vertical_pass(src.as_raw(), w, h, &kernel),
    };
    GrayImage::from_raw(w, h, out).unwrap_or_else(|| src.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

fn gaussian_kernel_q16(sigma: f32) -> Vec<u32> {
    let r = (sigma * 3.0).ceil().max(1.0) as i32;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

fn horizontal_pass(src: &[u8], width: u32, height: u32, k: &[u32]) -> Vec<u8> {
    let radius = (k.len() / 2) as i32;
    let w = width as usize;
    let mut dst = vec![0u8; w * height as usize];
    dst.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let line = &src[y * w..(y + 1) * w];
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x as i32 + ki as i32 - radius).clamp(0, w as i32 - 1) as usize;
                acc += u64::from(kw) * u64::from(line[sx]);
            }
            *out = q16_to_u8(acc);
        }
    });
    dst
}

fn vertical_pass(src: &[u8], width: u32, height: u32, k: &[u32]) -> Vec<u8> {
    let radius = (k.len() / 2) as i32;
    let w = width as usize;
    let h = height as i32;
    let mut dst = vec![0u8; w * height as usize];
    dst.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1) as usize;
                acc += u64::from(kw) * u64::from(src[sy * w + x]);
            }
            *out = q16_to_u8(acc);
        }
    });
    dst
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}
