use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version)]
#[command(about = "Render synthetic calligraphy on procedurally textured paper")]
pub struct Cli {
    /// Artwork configuration (.cfg). The built-in demo is used when omitted.
    #[arg(short = 'c', long = "config", value_name = "CFG_PATH")]
    pub config: Option<PathBuf>,

    /// Output image (PNG keeps the torn-edge transparency)
    #[arg(short = 'o', long = "output", value_name = "PATH", default_value = "artwork.png")]
    pub output: PathBuf,

    /// Fonts directory (holds the files named by font1..font5)
    #[arg(long = "fonts-dir", value_name = "PATH", default_value = "fonts")]
    pub fonts_root: PathBuf,

    /// RNG seed; overrides `seed` in the config
    #[arg(short = 's', long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// 纸张: xuan, rice or parchment (aliases accepted)
    #[arg(short = 'm', long = "material", value_name = "PROFILE")]
    pub material: Option<String>,

    /// Torn edge roughness in [0, 1]
    #[arg(short = 'r', long = "roughness", value_name = "R")]
    pub roughness: Option<f32>,

    /// Ink bleed intensity in [0, 1]; 0 disables bleeding
    #[arg(short = 'b', long = "bleed", value_name = "I")]
    pub bleed: Option<f32>,

    /// Export the computed ArtworkPlan as JSON for debugging
    #[arg(long = "debug-plan", value_name = "JSON_PATH")]
    pub debug_plan: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
