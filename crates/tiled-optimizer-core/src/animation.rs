//! Animation frames may point at tiles of any source tileset, and those tiles
//! may be animated themselves. Frames are remapped to chunk-local ids, so an
//! animated tile and all of its frames must share one chunk.
//!
//! Before a new tile is packed, [`reserve`] counts the unseen tiles its
//! animation pulls in and flushes the current chunk early when they would not
//! fit. Resolution then walks the frames with an explicit worklist.

use crate::chunk::ChunkManager;
use crate::compositing::ImageOps;
use crate::config::OptimizerConfig;
use crate::dedup::{Deduplicator, NewTile, SourceTileset};
use crate::error::{OptimizerError, Result};
use crate::model::AnimationFrame;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Number of not yet deduplicated tiles needed to pack `base`: the tile
/// itself plus every unseen tile reachable through animation frames.
/// Tiles owned by no tileset are not counted.
pub fn closure_demand(dedup: &Deduplicator, sources: &[SourceTileset], base: u32) -> Result<usize> {
    let mut seen: HashSet<u32> = HashSet::new();
    let mut stack = vec![base];
    let mut demand = 0;
    while let Some(current) = stack.pop() {
        if !seen.insert(current) || dedup.contains(current) {
            continue;
        }
        let Some(idx) = Deduplicator::owner(sources, current)? else {
            continue;
        };
        demand += 1;
        let tileset = &sources[idx].tileset;
        let firstgid = tileset.firstgid.unwrap_or_default();
        if let Some(frames) = tileset
            .tile(current - firstgid)
            .and_then(|t| t.animation.as_ref())
        {
            stack.extend(frames.iter().filter_map(|f| firstgid.checked_add(f.tileid)));
        }
    }
    Ok(demand)
}

/// Makes room in the current chunk for `base` and its animation closure,
/// flushing early if needed.
///
/// Fails with [`OptimizerError::CrossChunkAnimation`] when the closure is
/// larger than a whole chunk.
pub fn reserve<O: ImageOps>(
    dedup: &Deduplicator,
    base: u32,
    sources: &[SourceTileset],
    chunks: &mut ChunkManager,
    ops: &O,
    cfg: &OptimizerConfig,
) -> Result<()> {
    if dedup.contains(base) {
        return Ok(());
    }
    let demand = closure_demand(dedup, sources, base)?;
    if demand > chunks.capacity() {
        return Err(OptimizerError::CrossChunkAnimation {
            parent: base,
            frame: base,
            reason: "the animation needs more tiles than one chunk holds",
        });
    }
    if !chunks.has_room_for(demand) {
        if cfg.verbose() && demand > 1 {
            debug!(tile = base, demand, "flushing early to keep an animation in one chunk");
        }
        chunks.flush(sources, ops, cfg)?;
    }
    Ok(())
}

/// Resolves the animation frames of a freshly packed tile, and of every
/// animated frame it pulls in, writing chunk-local frame ids into the output
/// records.
pub(crate) fn resolve_frames(
    dedup: &mut Deduplicator,
    base: u32,
    tile: NewTile,
    sources: &[SourceTileset],
    chunks: &mut ChunkManager,
    cfg: &OptimizerConfig,
) -> Result<()> {
    let mut work: VecDeque<(u32, NewTile)> = VecDeque::from([(base, tile)]);
    while let Some((parent_base, parent)) = work.pop_front() {
        let Some(frames) = parent.animation else {
            continue;
        };
        for frame in frames {
            let Some(frame_base) = parent.firstgid.checked_add(frame.tileid) else {
                continue;
            };
            let entry = match dedup.get(frame_base) {
                Some(entry) => entry,
                None => {
                    if chunks.is_full() {
                        return Err(OptimizerError::CrossChunkAnimation {
                            parent: parent_base,
                            frame: frame_base,
                            reason: "packing the frame would flush the chunk holding its tile",
                        });
                    }
                    match dedup.insert_new(frame_base, sources, chunks, cfg)? {
                        Some(new_tile) => {
                            let entry = new_tile.entry;
                            if new_tile.animation.is_some() {
                                work.push_back((frame_base, new_tile));
                            }
                            entry
                        }
                        None => continue,
                    }
                }
            };
            if entry.chunk != parent.entry.chunk {
                return Err(OptimizerError::CrossChunkAnimation {
                    parent: parent_base,
                    frame: frame_base,
                    reason: "the frame is already packed in another chunk",
                });
            }
            chunks.push_frame(
                parent.entry.local,
                AnimationFrame {
                    duration: frame.duration,
                    tileid: entry.local,
                },
            );
        }
    }
    Ok(())
}
