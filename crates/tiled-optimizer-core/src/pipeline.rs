use crate::animation;
use crate::chunk::{ChunkManager, OutputAtlas};
use crate::compositing::{ImageOps, RgbaOps};
use crate::config::OptimizerConfig;
use crate::dedup::{Deduplicator, SourceTileset};
use crate::error::{OptimizerError, Result};
use crate::gid::TileRef;
use crate::model::{MapDocument, OptimizeStats};
use crate::walker::rewrite_tile_layers;
use image::DynamicImage;
use tracing::{info, instrument};

/// Output of an optimization run: the rewritten map and one atlas per chunk.
pub struct OptimizeOutput {
    pub map: MapDocument,
    pub atlases: Vec<OutputAtlas>,
    pub stats: OptimizeStats,
}

impl OptimizeOutput {
    /// PNG bytes per atlas, keyed by atlas file name, in chunk order.
    pub fn encode_atlases(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.encode_atlases_with(&RgbaOps)
    }

    pub fn encode_atlases_with<O: ImageOps>(&self, ops: &O) -> Result<Vec<(String, Vec<u8>)>> {
        self.atlases
            .iter()
            .map(|a| Ok((a.name.clone(), ops.encode_png(&a.rgba)?)))
            .collect()
    }
}

/// One optimization run. Owns the dedup map, the id counter and the current
/// chunk; [`Optimizer::run`] consumes it, so state never leaks between runs.
pub struct Optimizer<O: ImageOps = RgbaOps> {
    cfg: OptimizerConfig,
    sources: Vec<SourceTileset>,
    dedup: Deduplicator,
    chunks: ChunkManager,
    ops: O,
    references: usize,
}

impl Optimizer<RgbaOps> {
    pub fn new(sources: Vec<SourceTileset>, cfg: OptimizerConfig) -> Result<Self> {
        Self::with_ops(sources, cfg, RgbaOps)
    }
}

impl<O: ImageOps> Optimizer<O> {
    /// Validates the configuration and checks that every source tileset uses
    /// the configured tile size.
    pub fn with_ops(sources: Vec<SourceTileset>, cfg: OptimizerConfig, ops: O) -> Result<Self> {
        cfg.validate()?;
        for source in &sources {
            let ts = &source.tileset;
            if ts.tilewidth != cfg.tile_size || ts.tileheight != cfg.tile_size {
                return Err(OptimizerError::IncompatibleTileset {
                    name: ts.name.clone(),
                    width: ts.tilewidth,
                    height: ts.tileheight,
                    expected: cfg.tile_size,
                });
            }
        }
        let chunks = ChunkManager::new(&cfg);
        Ok(Self {
            cfg,
            sources,
            dedup: Deduplicator::new(),
            chunks,
            ops,
            references: 0,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.cfg
    }

    /// Rewrites `map` in place and renders the atlases.
    pub fn run(mut self, mut map: MapDocument) -> Result<OptimizeOutput> {
        if self.cfg.logs() {
            info!(tilesets = self.sources.len(), "start tiles optimization");
        }

        rewrite_tile_layers(&mut map.layers, &mut |raw| self.rewrite(raw))?;

        if self.cfg.keep_named_tiles {
            self.pack_named_tiles()?;
        }

        self.assemble(map)
    }

    /// New value for one nonzero layer cell.
    fn rewrite(&mut self, raw: u64) -> Result<u64> {
        let tile = TileRef::decode(raw)?;
        self.references += 1;
        // flag bits without a base id point at nothing
        if tile.is_empty() {
            self.dedup.mark_unresolved(tile.base, &self.cfg);
            return Ok(0);
        }
        match self.place(tile.base)? {
            Some(global) => tile.with_base(global).encode(),
            None => Ok(0),
        }
    }

    /// Makes room for `base`, then deduplicates it.
    fn place(&mut self, base: u32) -> Result<Option<u32>> {
        animation::reserve(
            &self.dedup,
            base,
            &self.sources,
            &mut self.chunks,
            &self.ops,
            &self.cfg,
        )?;
        let entry = self
            .dedup
            .resolve(base, &self.sources, &mut self.chunks, &self.cfg)?;
        Ok(entry.map(|e| e.global))
    }

    /// Packs source tiles carrying a `name` property, even when no layer uses
    /// them, so they stay addressable by name in the optimized map.
    fn pack_named_tiles(&mut self) -> Result<()> {
        let mut named: Vec<u32> = Vec::new();
        for source in &self.sources {
            let ts = &source.tileset;
            let Some(tiles) = ts.tiles.as_ref() else {
                continue;
            };
            let firstgid = ts.firstgid.ok_or_else(|| OptimizerError::MissingGeometry {
                tileset: ts.name.clone(),
                field: "firstgid",
            })?;
            named.extend(
                tiles
                    .iter()
                    .filter(|t| t.has_property("name"))
                    .filter_map(|t| firstgid.checked_add(t.id)),
            );
        }
        for base in named {
            if !self.dedup.contains(base) {
                self.place(base)?;
            }
        }
        Ok(())
    }

    /// Final flush; the emitted chunks replace the map's tileset list.
    fn assemble(mut self, mut map: MapDocument) -> Result<OptimizeOutput> {
        self.chunks.flush(&self.sources, &self.ops, &self.cfg)?;
        let atlases = self.chunks.into_emitted();
        map.tilesets = atlases.iter().map(|a| a.tileset.clone()).collect();

        let stats = OptimizeStats {
            source_tilesets: self.sources.len(),
            references: self.references,
            unique_tiles: self.dedup.len(),
            unresolved: self.dedup.unresolved(),
            atlases: atlases.len(),
            atlas_area: atlases
                .iter()
                .map(|a| (a.rgba.width() as u64) * (a.rgba.height() as u64))
                .sum(),
            source_area: self
                .sources
                .iter()
                .map(|s| (s.image.width() as u64) * (s.image.height() as u64))
                .sum(),
        };
        if self.cfg.logs() {
            info!(
                atlases = stats.atlases,
                tiles = stats.unique_tiles,
                "tiles optimization has been done"
            );
        }
        Ok(OptimizeOutput {
            map,
            atlases,
            stats,
        })
    }
}

/// Optimizes `map` given one decoded image per entry of `map.tilesets`, in order.
///
/// Notes:
/// - Tile ids are assigned in first-seen order while walking the layers, so the
///   result is deterministic.
/// - `parallel` extracts the tiles of a chunk in parallel when the feature is enabled.
#[instrument(skip_all)]
pub fn optimize_map(
    map: MapDocument,
    images: Vec<DynamicImage>,
    cfg: OptimizerConfig,
) -> Result<OptimizeOutput> {
    let sources = pair_sources(&map, images.into_iter().map(|img| img.to_rgba8()).collect())?;
    Optimizer::new(sources, cfg)?.run(map)
}

/// Like [`optimize_map`], decoding each tileset image from encoded bytes.
pub fn optimize_map_buffers(
    map: MapDocument,
    buffers: &[Vec<u8>],
    cfg: OptimizerConfig,
) -> Result<OptimizeOutput> {
    let ops = RgbaOps;
    let images = buffers
        .iter()
        .map(|bytes| ops.decode(bytes))
        .collect::<Result<Vec<_>>>()?;
    let sources = pair_sources(&map, images)?;
    Optimizer::with_ops(sources, cfg, ops)?.run(map)
}

fn pair_sources(map: &MapDocument, images: Vec<image::RgbaImage>) -> Result<Vec<SourceTileset>> {
    if images.len() != map.tilesets.len() {
        return Err(OptimizerError::InvalidConfig(format!(
            "{} tileset images given for {} tilesets",
            images.len(),
            map.tilesets.len()
        )));
    }
    Ok(map
        .tilesets
        .iter()
        .cloned()
        .zip(images)
        .map(|(tileset, image)| SourceTileset::new(tileset, image))
        .collect())
}
