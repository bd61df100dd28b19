#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use tiled_optimizer_core::prelude::*;

/// Color painted into every pixel of tile `index` (0-based) of a source tileset.
pub fn tile_color(seed: u8, index: u32) -> Rgba<u8> {
    let n = index + 1;
    Rgba([seed, (n & 0xff) as u8, ((n >> 8) & 0xff) as u8, 255])
}

/// Source tileset of `columns` x `rows` tiles, each filled with `tile_color(seed, i)`.
pub fn source(name: &str, firstgid: u32, columns: u32, rows: u32, tile: u32, seed: u8) -> SourceTileset {
    source_spaced(name, firstgid, columns, rows, tile, seed, 0, 0)
}

#[allow(clippy::too_many_arguments)]
pub fn source_spaced(
    name: &str,
    firstgid: u32,
    columns: u32,
    rows: u32,
    tile: u32,
    seed: u8,
    margin: u32,
    spacing: u32,
) -> SourceTileset {
    let width = 2 * margin + columns * tile + columns.saturating_sub(1) * spacing;
    let height = 2 * margin + rows * tile + rows.saturating_sub(1) * spacing;
    let mut image = RgbaImage::new(width, height);
    for i in 0..columns * rows {
        let left = margin + (i % columns) * (tile + spacing);
        let top = margin + (i / columns) * (tile + spacing);
        for y in 0..tile {
            for x in 0..tile {
                image.put_pixel(left + x, top + y, tile_color(seed, i));
            }
        }
    }
    let tileset = Tileset {
        name: name.into(),
        image: format!("{name}.png"),
        firstgid: Some(firstgid),
        tilecount: Some(columns * rows),
        columns,
        imagewidth: Some(width),
        imageheight: Some(height),
        margin,
        spacing,
        tilewidth: tile,
        tileheight: tile,
        ..Default::default()
    };
    SourceTileset::new(tileset, image)
}

pub fn map_with(layers: Vec<Layer>, sources: &[SourceTileset]) -> MapDocument {
    MapDocument {
        kind: "map".into(),
        tilewidth: 32,
        tileheight: 32,
        layers,
        tilesets: sources.iter().map(|s| s.tileset.clone()).collect(),
        ..Default::default()
    }
}

pub fn cfg(tile: u32, atlas: u32) -> OptimizerConfig {
    OptimizerConfig::builder()
        .tile_size(tile)
        .atlas_size(atlas)
        .log_level(LogLevel::Silent)
        .build()
}

pub fn run(layers: Vec<Layer>, sources: Vec<SourceTileset>, cfg: OptimizerConfig) -> OptimizeOutput {
    let map = map_with(layers, &sources);
    Optimizer::new(sources, cfg)
        .expect("optimizer")
        .run(map)
        .expect("run")
}

/// Tile data of the `idx`-th top-level layer.
pub fn layer_data(map: &MapDocument, idx: usize) -> Vec<u64> {
    match map.layers[idx].data.as_ref() {
        Some(LayerData::Tiles(data)) => data.clone(),
        other => panic!("layer {idx} has no tile array: {other:?}"),
    }
}

/// Top-left pixel of chunk-local tile `local` in an atlas.
pub fn atlas_pixel(atlas: &OutputAtlas, local: u32) -> Rgba<u8> {
    let ts = &atlas.tileset;
    let columns = ts.columns;
    let x = (local % columns) * ts.tilewidth;
    let y = (local / columns) * ts.tileheight;
    *atlas.rgba.get_pixel(x, y)
}

/// Atlas holding global id `gid`, and the tile's local id inside it.
pub fn locate(out: &OptimizeOutput, gid: u32) -> (&OutputAtlas, u32) {
    for atlas in &out.atlases {
        let first = atlas.tileset.firstgid.expect("firstgid");
        let count = atlas.tileset.tilecount.expect("tilecount");
        if gid >= first && gid < first + count {
            return (atlas, gid - first);
        }
    }
    panic!("gid {gid} is in no atlas");
}
