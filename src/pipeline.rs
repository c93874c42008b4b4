//! End-to-end artwork rendering: paper, torn edge, writing, 款识, seals, bleed.

use crate::config::ArtworkConfig;
use crate::edge::generate_torn_mask;
use crate::error::{CalligraphyError, CalligraphyResult};
use crate::fonts::GlyphSource;
use crate::inscription::place_inscriptions;
use crate::layout::{poem_chars, render_inscription, vertical_columns};
use crate::plan::ArtworkPlan;
use crate::seal::{blend_underlying, render_seal};
use crate::surface::MaskedCanvas;
use crate::texture::{age_paper, synthesize};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, instrument};

#[derive(Debug, Default)]
pub struct ArtworkPipeline;

impl ArtworkPipeline {
    /// Renders `config` with a single RNG stream seeded from `seed`, so the
    /// same seed reproduces the same artwork.
    #[instrument(skip(self, config, glyphs), fields(material = %config.material))]
    pub fn render(
        &self,
        config: &ArtworkConfig,
        glyphs: &dyn GlyphSource,
        seed: u64,
    ) -> CalligraphyResult<(MaskedCanvas, ArtworkPlan)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (w, h) = (config.width, config.height);

        let mut paper = synthesize(w, h, config.material, &mut rng)?;
        let paper_aging = (config.paper_aging > 0.0).then_some(config.paper_aging);
        if let Some(intensity) = paper_aging {
            age_paper(&mut paper, intensity, &mut rng);
        }

        let mask = generate_torn_mask(w, h, config.roughness, &mut rng)?;
        let mut artwork = paper.apply_mask(&mask)?;

        let chars = poem_chars(&config.text.content);
        let placements = vertical_columns(
            &chars,
            &config.text.area,
            config.text.size,
            config.text.rows,
        );
        if !placements.is_empty() {
            let text = render_inscription(w, h, &placements, glyphs, config.text.color)?;
            artwork = artwork.composite([text]);
        }

        let mut inscriptions = Vec::new();
        if let Some(spec) = &config.inscription {
            inscriptions = place_inscriptions(spec, w, h);
            if !inscriptions.is_empty() {
                let layer = render_inscription(w, h, &inscriptions, glyphs, spec.color)?;
                artwork = artwork.composite([layer]);
            }
        }

        for spec in &config.seals {
            let mut seal = render_seal(spec, glyphs, &mut rng)?;
            if let Some(opacity) = spec.penetration {
                blend_underlying(&mut seal, artwork.image(), opacity);
            }
            artwork = artwork.composite([seal]);
        }

        if config.bleed.intensity > 0.0 {
            artwork = artwork.bleed(&config.bleed, &mut rng);
        }

        let plan = ArtworkPlan {
            width: w,
            height: h,
            seed,
            material: config.material,
            roughness: config.roughness,
            paper_aging,
            placements,
            inscriptions,
            seals: config.seals.clone(),
            bleed: config.bleed.clone(),
        };
        plan.validate().map_err(CalligraphyError::Other)?;
        info!(
            glyphs = plan.placements.len(),
            inscriptions = plan.inscriptions.len(),
            seals = plan.seals.len(),
            "artwork rendered"
        );
        Ok((artwork, plan))
    }
}
