use criterion::{Criterion, black_box, criterion_group, criterion_main};

use carve_chunk::populate_density_cache;
use carve_mesh_cpu::{CornerSource, build_chunk_mesh};
use carve_world::{ChunkCoord, NoiseTerrain, NoiseTerrainParams, WorldConfig};

fn bench_build_chunk_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_chunk_mesh");
    let cfg = WorldConfig {
        cells_per_axis: 16,
        cell_size: 1.0,
        ..WorldConfig::default()
    };
    let field = NoiseTerrain::new(0xC0FFEE_i32, NoiseTerrainParams::default());
    let coord = ChunkCoord::new(0, 0, 0);
    group.bench_function("noise_16cubed_cached", |b| {
        b.iter(|| {
            let mut cache = populate_density_cache(&cfg, coord, &field);
            let mesh = build_chunk_mesh(
                &cfg,
                coord,
                CornerSource::Cached {
                    cache: &mut cache,
                    field: &field,
                },
            );
            black_box(mesh);
        })
    });
    group.bench_function("noise_16cubed_uncached", |b| {
        b.iter(|| {
            let mesh = build_chunk_mesh(&cfg, coord, CornerSource::Field(&field));
            black_box(mesh);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build_chunk_mesh);
criterion_main!(benches);
