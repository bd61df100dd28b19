//! Core library for optimizing Tiled maps.
//!
//! - Deduplication: every distinct tile the map references gets one new id, in first-seen order
//! - Packing: tiles are packed into square atlas chunks of at most `(atlas_size / tile_size)²` tiles
//! - Rewriting: layer GIDs are remapped in place, flip flags preserved; the tileset list is replaced by the chunks
//! - Animations are kept inside one chunk so frame ids stay chunk-local
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use tiled_optimizer_core::{MapDocument, OptimizerConfig, optimize_map};
//! # fn main() -> anyhow::Result<()> {
//! let map = MapDocument::from_json_str(&std::fs::read_to_string("map.json")?)?;
//! let images = map
//!     .tilesets
//!     .iter()
//!     .map(|ts| ImageReader::open(&ts.image)?.decode())
//!     .collect::<Result<Vec<_>, _>>()?;
//! let cfg = OptimizerConfig { atlas_size: 1024, ..Default::default() };
//! let out = optimize_map(map, images, cfg)?;
//! println!("atlases: {}", out.atlases.len());
//! # Ok(()) }
//! ```

pub mod animation;
pub mod chunk;
pub mod compositing;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod geometry;
pub mod gid;
pub mod model;
pub mod pipeline;
pub mod walker;

pub use chunk::{ChunkManager, ChunkState, OutputAtlas, PendingTile};
pub use compositing::{ImageOps, Placement, RgbaOps};
pub use config::*;
pub use dedup::{DedupEntry, Deduplicator, SourceTileset};
pub use error::*;
pub use export::*;
pub use gid::{FlipFlags, TileRef};
pub use model::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `tiled_optimizer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::chunk::OutputAtlas;
    pub use crate::compositing::{ImageOps, RgbaOps};
    pub use crate::config::{LogLevel, OptimizerConfig, OptimizerConfigBuilder};
    pub use crate::dedup::SourceTileset;
    pub use crate::gid::{FlipFlags, TileRef};
    pub use crate::model::{
        AnimationFrame, Layer, LayerData, MapDocument, OptimizeStats, Property, Rect, TileRecord,
        Tileset,
    };
    pub use crate::{OptimizeOutput, Optimizer, optimize_map, optimize_map_buffers};
}
