use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Tileset {name} not compatible: tiles are {width}x{height}, expected {expected}x{expected}")]
    IncompatibleTileset {
        name: String,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("{field} property is undefined on {tileset} tileset")]
    MissingGeometry { tileset: String, field: &'static str },
    #[error("Tile region {x},{y} {w}x{h} is outside the {width}x{height} source image")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },
    #[error("Tile reference {0} is outside the 32-bit flipped id range")]
    ReferenceRange(u64),
    #[error("Animation of tile {parent} cannot stay in one chunk with frame {frame}: {reason}")]
    CrossChunkAnimation {
        parent: u32,
        frame: u32,
        reason: &'static str,
    },
    #[error("Chunk {index} is full ({capacity} tiles)")]
    ChunkOverflow { index: usize, capacity: usize },
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
