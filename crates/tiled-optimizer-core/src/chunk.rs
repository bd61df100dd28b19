//! Atlas chunks: accumulate deduplicated tiles until a chunk is full, then
//! render it into one square atlas image.

use crate::compositing::{ImageOps, Placement};
use crate::config::OptimizerConfig;
use crate::dedup::SourceTileset;
use crate::error::{OptimizerError, Result};
use crate::model::{AnimationFrame, Rect, TileRecord, Tileset};
use image::RgbaImage;
use serde_json::Map;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A tile waiting to be cut out of its source image when the chunk flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTile {
    /// Unflipped global id in the source map.
    pub base: u32,
    /// Index of the owning source tileset.
    pub source: usize,
    pub region: Rect,
}

/// The chunk currently being filled.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based sequence number; also names the atlas image.
    pub index: usize,
    /// Global id of the first tile in this chunk.
    pub firstgid: u32,
    pending: Vec<PendingTile>,
    records: Vec<Option<TileRecord>>,
}

impl Chunk {
    fn new(index: usize, firstgid: u32) -> Self {
        Self {
            index,
            firstgid,
            pending: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[PendingTile] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Lifecycle of the current chunk.
///
/// `Empty` → `Accumulating` on the first append, `Accumulating` → `Flushing`
/// while rendering, then back to `Empty`.
#[derive(Debug, Clone)]
pub enum ChunkState {
    Empty,
    Accumulating(Chunk),
    Flushing,
}

/// A rendered chunk: its tileset record and atlas pixels.
#[derive(Debug, Clone)]
pub struct OutputAtlas {
    pub name: String,
    pub tileset: Tileset,
    pub rgba: RgbaImage,
}

pub struct ChunkManager {
    capacity: usize,
    tile_size: u32,
    state: ChunkState,
    emitted: Vec<OutputAtlas>,
    created: usize,
}

impl ChunkManager {
    pub fn new(cfg: &OptimizerConfig) -> Self {
        Self {
            capacity: cfg.capacity(),
            tile_size: cfg.tile_size,
            state: ChunkState::Empty,
            emitted: Vec::new(),
            created: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> &ChunkState {
        &self.state
    }

    /// Number of tiles waiting in the current chunk.
    pub fn pending_len(&self) -> usize {
        match &self.state {
            ChunkState::Accumulating(chunk) => chunk.len(),
            _ => 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.pending_len() >= self.capacity
    }

    /// Whether `count` more tiles fit in the current chunk.
    pub fn has_room_for(&self, count: usize) -> bool {
        self.pending_len() + count <= self.capacity
    }

    /// Index of the chunk the next appended tile lands in.
    pub fn current_index(&self) -> usize {
        match &self.state {
            ChunkState::Accumulating(chunk) => chunk.index,
            _ => self.created + 1,
        }
    }

    /// Chunks rendered so far, in creation order.
    pub fn emitted(&self) -> &[OutputAtlas] {
        &self.emitted
    }

    /// Appends a tile with global id `global`; returns `(chunk index, local id)`.
    ///
    /// The caller makes room first; appending to a full chunk is an error.
    pub fn append(&mut self, tile: PendingTile, global: u32) -> Result<(usize, u32)> {
        if matches!(self.state, ChunkState::Empty) {
            self.created += 1;
            self.state = ChunkState::Accumulating(Chunk::new(self.created, global));
        }
        let capacity = self.capacity;
        match &mut self.state {
            ChunkState::Accumulating(chunk) => {
                if chunk.len() >= capacity {
                    return Err(OptimizerError::ChunkOverflow {
                        index: chunk.index,
                        capacity,
                    });
                }
                let local = chunk.len() as u32;
                chunk.pending.push(tile);
                chunk.records.push(None);
                Ok((chunk.index, local))
            }
            _ => Err(OptimizerError::ChunkOverflow {
                index: self.created,
                capacity,
            }),
        }
    }

    /// Output record of the tile at `local` in the current chunk, created on demand.
    pub fn record_mut(&mut self, local: u32) -> Option<&mut TileRecord> {
        match &mut self.state {
            ChunkState::Accumulating(chunk) => {
                let slot = chunk.records.get_mut(local as usize)?;
                Some(slot.get_or_insert_with(|| TileRecord {
                    id: local,
                    ..Default::default()
                }))
            }
            _ => None,
        }
    }

    /// Appends an animation frame to the output record of tile `local`.
    pub fn push_frame(&mut self, local: u32, frame: AnimationFrame) {
        if let Some(record) = self.record_mut(local) {
            record.animation.get_or_insert_with(Vec::new).push(frame);
        }
    }

    /// Renders the current chunk and starts a fresh one. No-op when empty.
    pub fn flush<O: ImageOps>(
        &mut self,
        sources: &[SourceTileset],
        ops: &O,
        cfg: &OptimizerConfig,
    ) -> Result<()> {
        let chunk = match std::mem::replace(&mut self.state, ChunkState::Flushing) {
            ChunkState::Accumulating(chunk) if !chunk.is_empty() => chunk,
            _ => {
                self.state = ChunkState::Empty;
                return Ok(());
            }
        };
        let name = cfg.atlas_name(chunk.index);
        if cfg.logs() {
            info!(atlas = %name, tiles = chunk.len(), "rendering chunk");
        }

        let count = chunk.len() as u32;
        let columns = grid_columns(count);
        let size = columns * self.tile_size;
        let mut canvas = ops.blank(size, size);
        if cfg.verbose() {
            debug!(size, columns, "empty atlas allocated");
        }

        let tiles = extract_all(&chunk.pending, sources, ops, cfg.parallel)?;
        if cfg.verbose() {
            debug!(count = tiles.len(), "tiles extracted");
        }

        let placements: Vec<Placement<'_>> = tiles
            .iter()
            .enumerate()
            .map(|(i, image)| Placement {
                image,
                x: (i as u32 % columns) * self.tile_size,
                y: (i as u32 / columns) * self.tile_size,
            })
            .collect();
        ops.composite(&mut canvas, &placements)?;

        let records: Vec<TileRecord> = chunk.records.into_iter().flatten().collect();
        let tileset = Tileset {
            name: format!("Chunk {}", chunk.index),
            image: name.clone(),
            firstgid: Some(chunk.firstgid),
            tilecount: Some(count),
            columns,
            imagewidth: Some(size),
            imageheight: Some(size),
            margin: 0,
            spacing: 0,
            tilewidth: self.tile_size,
            tileheight: self.tile_size,
            properties: Some(Vec::new()),
            tiles: Some(records),
            extra: Map::new(),
        };
        self.emitted.push(OutputAtlas {
            name,
            tileset,
            rgba: canvas,
        });
        self.state = ChunkState::Empty;
        Ok(())
    }

    /// Consumes the manager, returning every rendered chunk.
    /// Tiles still pending are dropped; flush first.
    pub fn into_emitted(self) -> Vec<OutputAtlas> {
        self.emitted
    }
}

/// Smallest `c` with `c * c >= count` (at least 1).
pub fn grid_columns(count: u32) -> u32 {
    let mut c = (count as f64).sqrt().ceil() as u32;
    while (c as u64) * (c as u64) < count as u64 {
        c += 1;
    }
    while c > 1 && ((c - 1) as u64) * ((c - 1) as u64) >= count as u64 {
        c -= 1;
    }
    c.max(1)
}

fn extract_all<O: ImageOps>(
    pending: &[PendingTile],
    sources: &[SourceTileset],
    ops: &O,
    parallel: bool,
) -> Result<Vec<RgbaImage>> {
    let extract = |tile: &PendingTile| -> Result<RgbaImage> {
        let source = sources
            .get(tile.source)
            .ok_or_else(|| OptimizerError::MissingGeometry {
                tileset: format!("#{}", tile.source),
                field: "image",
            })?;
        ops.extract(&source.image, tile.region)
    };

    #[cfg(feature = "parallel")]
    {
        if parallel {
            return pending.par_iter().map(extract).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    pending.iter().map(extract).collect()
}
