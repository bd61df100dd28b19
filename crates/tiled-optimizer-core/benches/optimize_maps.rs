use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use image::RgbaImage;
use std::hint::black_box;
use tiled_optimizer_core::prelude::*;

const TILE: u32 = 16;

fn tileset(columns: u32, rows: u32) -> SourceTileset {
    let image = RgbaImage::from_fn(columns * TILE, rows * TILE, |x, y| {
        let i = (y / TILE) * columns + x / TILE;
        image::Rgba([(i & 0xff) as u8, (i >> 8) as u8, 0, 255])
    });
    let ts = Tileset {
        name: "bench".into(),
        image: "bench.png".into(),
        firstgid: Some(1),
        tilecount: Some(columns * rows),
        columns,
        imagewidth: Some(columns * TILE),
        imageheight: Some(rows * TILE),
        tilewidth: TILE,
        tileheight: TILE,
        ..Default::default()
    };
    SourceTileset::new(ts, image)
}

fn generate_map(cells: usize, tiles: u32) -> MapDocument {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let data = (0..cells)
        .map(|_| {
            let base = rng.gen_range(0..=tiles) as u64;
            let flags = rng.gen_range(0..8u64) << 29;
            if base == 0 { 0 } else { base + flags }
        })
        .collect();
    MapDocument {
        kind: "map".into(),
        tilewidth: TILE,
        tileheight: TILE,
        layers: vec![Layer::tiles(data)],
        ..Default::default()
    }
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize_maps");
    let source = tileset(32, 32);

    for cells in [1_000usize, 10_000, 50_000] {
        let mut map = generate_map(cells, 1024);
        map.tilesets = vec![source.tileset.clone()];
        group.throughput(Throughput::Elements(cells as u64));

        for atlas in [256u32, 1024] {
            group.bench_with_input(
                BenchmarkId::new(format!("atlas_{atlas}"), cells),
                &map,
                |b, map| {
                    b.iter(|| {
                        let cfg = OptimizerConfig::builder()
                            .tile_size(TILE)
                            .atlas_size(atlas)
                            .log_level(LogLevel::Silent)
                            .build();
                        let out = Optimizer::new(vec![source.clone()], cfg)
                            .and_then(|o| o.run(map.clone()));
                        black_box(out)
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
