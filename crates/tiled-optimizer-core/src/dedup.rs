use crate::animation;
use crate::chunk::{ChunkManager, PendingTile};
use crate::config::OptimizerConfig;
use crate::error::{OptimizerError, Result};
use crate::geometry::tile_region;
use crate::gid::MAX_BASE_ID;
use crate::model::{AnimationFrame, Property, Tileset};
use image::RgbaImage;
use std::collections::HashMap;
use tracing::warn;

/// A source tileset together with its decoded image.
#[derive(Debug, Clone)]
pub struct SourceTileset {
    pub tileset: Tileset,
    pub image: RgbaImage,
}

impl SourceTileset {
    pub fn new(tileset: Tileset, image: RgbaImage) -> Self {
        Self { tileset, image }
    }
}

/// Where a deduplicated tile ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupEntry {
    /// New global id, used in the rewritten map.
    pub global: u32,
    /// Chunk (1-based) holding the tile.
    pub chunk: usize,
    /// Position of the tile inside its chunk.
    pub local: u32,
}

/// A tile seen for the first time, plus the animation still to resolve.
#[derive(Debug, Clone)]
pub(crate) struct NewTile {
    pub entry: DedupEntry,
    pub firstgid: u32,
    pub animation: Option<Vec<AnimationFrame>>,
}

/// Base id → new id mapping with a monotonic id counter.
///
/// Ids are handed out 1, 2, 3, … in first-seen order and never reused,
/// independently of chunk boundaries.
#[derive(Debug, Default)]
pub struct Deduplicator {
    entries: HashMap<u32, DedupEntry>,
    last_global: u32,
    unresolved: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, base: u32) -> Option<DedupEntry> {
        self.entries.get(&base).copied()
    }

    pub fn contains(&self, base: u32) -> bool {
        self.entries.contains_key(&base)
    }

    /// Number of distinct tiles deduplicated so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// References that pointed at no known tileset.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    /// Counts a reference that resolves to no tile; it is written back as 0.
    pub(crate) fn mark_unresolved(&mut self, base: u32, cfg: &OptimizerConfig) {
        self.unresolved += 1;
        if cfg.logs() {
            warn!(
                tile = base,
                "tile is owned by no tileset (corrupted layer?); replaced by an empty tile"
            );
        }
    }

    /// Index of the source tileset owning `base`, if any.
    pub fn owner(sources: &[SourceTileset], base: u32) -> Result<Option<usize>> {
        for (idx, source) in sources.iter().enumerate() {
            let ts = &source.tileset;
            for (value, field) in [(ts.firstgid, "firstgid"), (ts.tilecount, "tilecount")] {
                if value.is_none() {
                    return Err(OptimizerError::MissingGeometry {
                        tileset: ts.name.clone(),
                        field,
                    });
                }
            }
            if ts.owns(base) {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// New id for `base`, packing the tile (and its animation frames) into the
    /// current chunk on first sight. `None` when no tileset owns `base`.
    ///
    /// The caller must have made room in the current chunk beforehand.
    pub fn resolve(
        &mut self,
        base: u32,
        sources: &[SourceTileset],
        chunks: &mut ChunkManager,
        cfg: &OptimizerConfig,
    ) -> Result<Option<DedupEntry>> {
        if let Some(entry) = self.get(base) {
            return Ok(Some(entry));
        }
        let Some(new_tile) = self.insert_new(base, sources, chunks, cfg)? else {
            return Ok(None);
        };
        let entry = new_tile.entry;
        if new_tile.animation.is_some() {
            animation::resolve_frames(self, base, new_tile, sources, chunks, cfg)?;
        }
        Ok(Some(entry))
    }

    /// Assigns the next id to an unseen `base`, queues its extraction and
    /// copies its properties. Animation frames are returned, not resolved.
    pub(crate) fn insert_new(
        &mut self,
        base: u32,
        sources: &[SourceTileset],
        chunks: &mut ChunkManager,
        cfg: &OptimizerConfig,
    ) -> Result<Option<NewTile>> {
        debug_assert!(!self.contains(base));
        let Some(source_idx) = Self::owner(sources, base)? else {
            self.mark_unresolved(base, cfg);
            return Ok(None);
        };
        let tileset = &sources[source_idx].tileset;
        let firstgid = tileset.firstgid.unwrap_or_default();
        let region = tile_region(tileset, base, cfg.tile_size)?;

        let global = self.last_global + 1;
        if global > MAX_BASE_ID {
            return Err(OptimizerError::ReferenceRange(global as u64));
        }
        let (chunk, local) = chunks.append(
            PendingTile {
                base,
                source: source_idx,
                region,
            },
            global,
        )?;
        self.last_global = global;
        let entry = DedupEntry {
            global,
            chunk,
            local,
        };
        self.entries.insert(base, entry);

        let tile = tileset.tile(base - firstgid);
        let mut properties: Vec<Property> = tileset.properties.clone().unwrap_or_default();
        if let Some(props) = tile.and_then(|t| t.properties.as_ref()) {
            properties.extend(props.iter().cloned());
        }
        let animation = tile
            .and_then(|t| t.animation.clone())
            .filter(|frames| !frames.is_empty());

        if !properties.is_empty() || animation.is_some() {
            if let Some(record) = chunks.record_mut(local) {
                if !properties.is_empty() {
                    record.properties = Some(properties);
                }
                if animation.is_some() {
                    record.animation = Some(Vec::new());
                }
            }
        }

        Ok(Some(NewTile {
            entry,
            firstgid,
            animation,
        }))
    }
}
