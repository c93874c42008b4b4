use crate::bleed::BleedParams;
use crate::layout::GlyphPlacement;
use crate::seal::SealSpec;
use crate::texture::MaterialProfile;
use anyhow::{Result, anyhow};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// What the pipeline decided to draw, in drawing order.
#[derive(Debug, Clone, Serialize)]
pub struct ArtworkPlan {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub material: MaterialProfile,
    pub roughness: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_aging: Option<f32>,
    pub placements: Vec<GlyphPlacement>,
    /// 款识 cells, drawn after the main text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inscriptions: Vec<GlyphPlacement>,
    pub seals: Vec<SealSpec>,
    pub bleed: BleedParams,
}

impl ArtworkPlan {
    pub fn write_debug_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.width as f32, self.height as f32);
        for p in self.placements.iter().chain(&self.inscriptions) {
            if p.x < 0.0 || p.y < 0.0 || p.x + p.size > w || p.y + p.size > h {
                return Err(anyhow!(
                    "glyph '{}' at ({}, {}) size {} falls outside the {}x{} paper",
                    p.ch,
                    p.x,
                    p.y,
                    p.size,
                    self.width,
                    self.height
                ));
            }
        }
        for (i, seal) in self.seals.iter().enumerate() {
            let (x, y) = seal.anchor;
            let size = seal.size as i64;
            if i64::from(x) + size <= 0
                || i64::from(y) + size <= 0
                || i64::from(x) >= i64::from(self.width)
                || i64::from(y) >= i64::from(self.height)
            {
                return Err(anyhow!(
                    "seal {} at ({}, {}) does not touch the paper",
                    i + 1,
                    x,
                    y
                ));
            }
        }
        Ok(())
    }
}
