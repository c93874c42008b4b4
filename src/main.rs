mod args;

use anyhow::{Context, Result, bail};
use args::Cli;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use xuanzhi::ArtworkPipeline;
use xuanzhi::config::ArtworkConfig;
use xuanzhi::fonts::FontManager;
use xuanzhi::texture::MaterialProfile;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            ensure_exists(path, "artwork configuration")?;
            ArtworkConfig::load(path)?
        }
        None => {
            info!("no --config given, rendering the demo artwork");
            ArtworkConfig::demo()?
        }
    };
    if let Some(material) = &cli.material {
        config.material = material.parse::<MaterialProfile>()?;
    }
    if let Some(roughness) = cli.roughness {
        config.roughness = roughness;
    }
    if let Some(intensity) = cli.bleed {
        config.bleed.intensity = intensity;
    }
    config.validate()?;

    if !cli.fonts_root.is_dir() && !config.fonts.is_empty() {
        warn!(dir = %cli.fonts_root.display(), "fonts directory not found");
    }
    let fonts = FontManager::new(&cli.fonts_root, &config.fonts);

    let seed = cli.seed.or(config.seed).unwrap_or_else(rand::random);
    info!(seed, material = %config.material, "rendering {}x{}", config.width, config.height);
    let (artwork, plan) = ArtworkPipeline.render(&config, &fonts, seed)?;

    if let Some(path) = &cli.debug_plan {
        if let Err(err) = plan.write_debug_json(path) {
            warn!(%err, "failed to write plan debug JSON ({})", path.display());
        } else {
            info!("artwork plan debug JSON written to {}", path.display());
        }
    }

    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    artwork
        .into_image()
        .save(&cli.output)
        .with_context(|| format!("write artwork {}", cli.output.display()))?;
    info!("artwork saved to {}", cli.output.display());
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn ensure_exists(path: &Path, label: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} not found: {}", label, path.display());
    }
    Ok(())
}
