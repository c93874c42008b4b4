//! 宣纸: procedural paper, torn edges, seals and ink bleed for synthetic
//! calligraphy artwork.

pub mod bleed;
pub mod blur;
pub mod color;
pub mod composite;
pub mod config;
pub mod draw;
pub mod edge;
pub mod error;
pub mod fonts;
pub mod inscription;
pub mod layout;
pub mod noise;
pub mod pipeline;
pub mod plan;
pub mod seal;
pub mod surface;
pub mod texture;

pub use error::{CalligraphyError, CalligraphyResult};
pub use pipeline::ArtworkPipeline;
