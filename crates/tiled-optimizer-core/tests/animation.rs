mod common;

use common::*;
use tiled_optimizer_core::animation::closure_demand;
use tiled_optimizer_core::error::OptimizerError;
use tiled_optimizer_core::prelude::*;
use tiled_optimizer_core::Deduplicator;

fn frames(tileids: &[u32], duration: u32) -> Vec<AnimationFrame> {
    tileids
        .iter()
        .map(|&tileid| AnimationFrame { duration, tileid })
        .collect()
}

fn animated(id: u32, tileids: &[u32]) -> TileRecord {
    TileRecord {
        id,
        animation: Some(frames(tileids, 100)),
        ..Default::default()
    }
}

/// 4x4 tileset at firstgid 1 with the given tile records.
fn water(records: Vec<TileRecord>) -> SourceTileset {
    let mut src = source("water", 1, 4, 4, 32, 1);
    src.tileset.tiles = Some(records);
    src
}

fn animation_of(atlas: &OutputAtlas, local: u32) -> Vec<AnimationFrame> {
    atlas
        .tileset
        .tiles
        .as_ref()
        .and_then(|tiles| tiles.iter().find(|t| t.id == local))
        .and_then(|t| t.animation.clone())
        .unwrap_or_default()
}

#[test]
fn frames_are_packed_with_their_tile() {
    let src = water(vec![animated(0, &[4, 5])]);
    let out = run(vec![Layer::tiles(vec![1])], vec![src], cfg(32, 512));

    assert_eq!(layer_data(&out.map, 0), vec![1]);
    let atlas = &out.atlases[0];
    assert_eq!(atlas.tileset.tilecount, Some(3));
    assert_eq!(animation_of(atlas, 0), frames(&[1, 2], 100));
    assert_eq!(atlas_pixel(atlas, 1), tile_color(1, 4));
    assert_eq!(atlas_pixel(atlas, 2), tile_color(1, 5));
}

#[test]
fn frames_reuse_tiles_already_in_the_chunk() {
    let src = water(vec![animated(0, &[4, 5])]);
    // base 6 (tileid 5) is seen before the animated tile
    let out = run(vec![Layer::tiles(vec![6, 1])], vec![src], cfg(32, 512));

    assert_eq!(layer_data(&out.map, 0), vec![1, 2]);
    let atlas = &out.atlases[0];
    assert_eq!(atlas.tileset.tilecount, Some(3));
    assert_eq!(animation_of(atlas, 1), frames(&[2, 0], 100));
}

#[test]
fn frames_may_come_from_another_tileset() {
    let mut first = water(Vec::new());
    first.tileset.tiles = Some(vec![TileRecord {
        id: 0,
        animation: Some(vec![
            AnimationFrame { duration: 50, tileid: 16 },
            AnimationFrame { duration: 75, tileid: 0 },
        ]),
        ..Default::default()
    }]);
    let second = source("lava", 17, 2, 2, 32, 2);
    let out = run(vec![Layer::tiles(vec![1])], vec![first, second], cfg(32, 512));

    let atlas = &out.atlases[0];
    assert_eq!(
        animation_of(atlas, 0),
        vec![
            AnimationFrame { duration: 50, tileid: 1 },
            AnimationFrame { duration: 75, tileid: 0 },
        ]
    );
    assert_eq!(atlas_pixel(atlas, 1), tile_color(2, 0));
}

#[test]
fn animated_frames_are_followed_through_cycles() {
    let src = water(vec![
        animated(0, &[1]),
        animated(1, &[2]),
        animated(2, &[0]),
    ]);
    let out = run(vec![Layer::tiles(vec![1])], vec![src], cfg(32, 512));

    let atlas = &out.atlases[0];
    assert_eq!(atlas.tileset.tilecount, Some(3));
    assert_eq!(animation_of(atlas, 0), frames(&[1], 100));
    assert_eq!(animation_of(atlas, 1), frames(&[2], 100));
    assert_eq!(animation_of(atlas, 2), frames(&[0], 100));
}

#[test]
fn chunk_is_flushed_early_to_keep_an_animation_together() {
    let src = water(vec![animated(0, &[4, 5])]);
    // 4 tiles per chunk; three plain tiles leave no room for a 3-tile animation
    let out = run(
        vec![Layer::tiles(vec![10, 11, 12, 1])],
        vec![src],
        cfg(32, 64),
    );

    assert_eq!(layer_data(&out.map, 0), vec![1, 2, 3, 4]);
    assert_eq!(out.atlases.len(), 2);
    assert_eq!(out.atlases[0].tileset.tilecount, Some(3));
    assert_eq!(out.atlases[0].tileset.firstgid, Some(1));

    let second = &out.atlases[1];
    assert_eq!(second.tileset.firstgid, Some(4));
    assert_eq!(second.tileset.tilecount, Some(3));
    assert_eq!(animation_of(second, 0), frames(&[1, 2], 100));
    assert_eq!(atlas_pixel(second, 0), tile_color(1, 0));
}

#[test]
fn animation_larger_than_a_chunk_fails() {
    let src = water(vec![animated(0, &[1, 2, 3, 4, 5])]);
    let map = map_with(vec![Layer::tiles(vec![1])], std::slice::from_ref(&src));
    let result = Optimizer::new(vec![src], cfg(32, 64))
        .expect("optimizer")
        .run(map);
    assert!(matches!(
        result,
        Err(OptimizerError::CrossChunkAnimation { parent: 1, .. })
    ));
}

#[test]
fn frame_packed_in_an_earlier_chunk_fails() {
    let src = water(vec![animated(0, &[4, 5])]);
    // base 5 lands in chunk 1; the animated tile is pushed to chunk 2
    let map = map_with(
        vec![Layer::tiles(vec![5, 10, 11, 12, 1])],
        std::slice::from_ref(&src),
    );
    let result = Optimizer::new(vec![src], cfg(32, 64))
        .expect("optimizer")
        .run(map);
    match result {
        Err(OptimizerError::CrossChunkAnimation { parent, frame, .. }) => {
            assert_eq!(parent, 1);
            assert_eq!(frame, 5);
        }
        Err(other) => panic!("expected CrossChunkAnimation, got {other:?}"),
        Ok(_) => panic!("expected CrossChunkAnimation"),
    }
}

#[test]
fn unowned_frames_are_dropped() {
    let src = water(vec![animated(0, &[4, 1000])]);
    let out = run(vec![Layer::tiles(vec![1])], vec![src], cfg(32, 512));

    let atlas = &out.atlases[0];
    assert_eq!(atlas.tileset.tilecount, Some(2));
    assert_eq!(animation_of(atlas, 0), frames(&[1], 100));
    assert_eq!(out.stats.unresolved, 1);
}

#[test]
fn closure_demand_counts_unseen_owned_tiles() {
    let src = water(vec![
        animated(0, &[1, 2, 1000]),
        animated(2, &[3, 0]),
    ]);
    let sources = vec![src];
    let dedup = Deduplicator::new();
    // bases 1, 2, 3, 4; base 1001 is owned by nothing
    assert_eq!(closure_demand(&dedup, &sources, 1).expect("demand"), 4);
    assert_eq!(closure_demand(&dedup, &sources, 3).expect("demand"), 4);
    assert_eq!(closure_demand(&dedup, &sources, 9).expect("demand"), 1);
    assert_eq!(closure_demand(&dedup, &sources, 1000).expect("demand"), 0);
}
