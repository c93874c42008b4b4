use anyhow::{Result, anyhow};
use image::{Rgb, Rgba};
use serde::Serialize;

/// Pixels darker than this (0..=255 luma) count as ink.
pub const INK_THRESHOLD: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const INK: Self = Self::new(17, 17, 17);
    pub const SEAL_FILL: Self = Self::new(180, 30, 30);
    pub const SEAL_BORDER: Self = Self::new(150, 20, 20);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("empty color value"));
        }
        if let Some(hex) = raw.strip_prefix('#') {
            return parse_hex(hex);
        }
        match raw.to_ascii_lowercase().as_str() {
            "black" => Ok(Self::new(0, 0, 0)),
            "ink" => Ok(Self::INK),
            "white" => Ok(Self::WHITE),
            "red" => Ok(Self::new(255, 0, 0)),
            "darkred" => Ok(Self::new(139, 0, 0)),
            "cinnabar" | "seal" => Ok(Self::SEAL_FILL),
            "xuan" => Ok(Self::new(242, 232, 212)),
            "lightyellow" => Ok(Self::new(255, 255, 224)),
            "gray" | "grey" => Ok(Self::new(128, 128, 128)),
            "darkgray" | "darkgrey" => Ok(Self::new(64, 64, 64)),
            other => Err(anyhow!("unsupported color '{}'", other)),
        }
    }

    pub fn rgb(self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }

    pub fn rgba(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }

    /// Subtracts `delta` from every channel, saturating at zero.
    pub fn darken(self, delta: [u8; 3]) -> Self {
        Self::new(
            self.r.saturating_sub(delta[0]),
            self.g.saturating_sub(delta[1]),
            self.b.saturating_sub(delta[2]),
        )
    }

    pub fn luma(self) -> u8 {
        luma(self.r, self.g, self.b)
    }
}

/// ITU-R 601 luma, rounded to nearest.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

pub fn is_ink(px: &Rgba<u8>) -> bool {
    luma(px[0], px[1], px[2]) < INK_THRESHOLD
}

fn parse_hex(hex: &str) -> Result<RgbColor> {
    if !hex.is_ascii() {
        return Err(anyhow!("invalid hex color '#{}'", hex));
    }
    let chars: Vec<char> = hex.chars().collect();
    match chars.len() {
        3 => {
            let r = parse_hex_component(chars[0])?;
            let g = parse_hex_component(chars[1])?;
            let b = parse_hex_component(chars[2])?;
            Ok(RgbColor::new(r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16)?;
            let g = u8::from_str_radix(&hex[2..4], 16)?;
            let b = u8::from_str_radix(&hex[4..6], 16)?;
            Ok(RgbColor::new(r, g, b))
        }
        _ => Err(anyhow!("invalid hex color '#{}'", hex)),
    }
}

fn parse_hex_component(ch: char) -> Result<u8> {
    let s = format!("{ch}{ch}");
    Ok(u8::from_str_radix(&s, 16)?)
}
