use carve_chunk::populate_density_cache;
use carve_io::{PersistError, WorldSave, flatten, load_world, save_world, unflatten};
use carve_world::{ChunkCoord, FlatGround, NoiseTerrain, NoiseTerrainParams, WorldConfig};

fn cfg() -> WorldConfig {
    WorldConfig {
        cells_per_axis: 4,
        cell_size: 0.5,
        threshold: 0.0,
        chunks_x: 2,
        chunks_y: 2,
        chunks_z: 2,
        ..WorldConfig::default()
    }
}

#[test]
fn flatten_unflatten_round_trip() {
    let cfg = cfg();
    let field = NoiseTerrain::new(99, NoiseTerrainParams::default());
    let coord = ChunkCoord::new(1, 0, 1);
    let cache = populate_density_cache(&cfg, coord, &field);
    let save = save_world(&cfg, &[(coord, &cache)]).unwrap();
    let restored = unflatten(&cfg, &save.chunks[0]).unwrap();
    // Bit-identical samples, same linear layout.
    assert_eq!(restored.values(), cache.values());
    assert_eq!(restored, cache);
}

#[test]
fn toml_round_trip_preserves_samples() {
    let cfg = cfg();
    let field = FlatGround::new(1.0, 0.7);
    let coord = ChunkCoord::new(0, 1, 0);
    let cache = populate_density_cache(&cfg, coord, &field);
    let save = save_world(&cfg, &[(coord, &cache)]).unwrap();
    let txt = toml::to_string(&save).unwrap();
    let parsed: WorldSave = toml::from_str(&txt).unwrap();
    let loaded = load_world(&cfg, &parsed).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].0, coord);
    assert_eq!(loaded[0].1.values(), cache.values());
}

#[test]
fn mismatched_params_fail_fast() {
    let cfg = cfg();
    let field = FlatGround::default();
    let coord = ChunkCoord::new(0, 0, 0);
    let cache = populate_density_cache(&cfg, coord, &field);
    let save = save_world(&cfg, &[(coord, &cache)]).unwrap();

    let mut wrong = cfg.clone();
    wrong.cells_per_axis += 1;
    match load_world(&wrong, &save) {
        Err(PersistError::ConfigMismatch { field }) => assert_eq!(field, "cells_per_axis"),
        other => panic!("expected config mismatch, got {other:?}"),
    }

    let mut wrong = cfg.clone();
    wrong.cell_size *= 2.0;
    assert!(matches!(
        load_world(&wrong, &save),
        Err(PersistError::ConfigMismatch { field: "cell_size" })
    ));
}

#[test]
fn out_of_bounds_chunk_fails_load() {
    let cfg = cfg();
    let field = FlatGround::default();
    let coord = ChunkCoord::new(0, 0, 0);
    let cache = populate_density_cache(&cfg, coord, &field);
    let mut save = save_world(&cfg, &[(coord, &cache)]).unwrap();
    save.chunks[0].coord = ChunkCoord::new(9, 0, 0);
    assert!(matches!(
        load_world(&cfg, &save),
        Err(PersistError::OutOfBounds { .. })
    ));
}

#[test]
fn truncated_densities_fail_load() {
    let cfg = cfg();
    let field = FlatGround::default();
    let coord = ChunkCoord::new(0, 0, 0);
    let cache = populate_density_cache(&cfg, coord, &field);
    let mut save = save_world(&cfg, &[(coord, &cache)]).unwrap();
    save.chunks[0].densities.pop();
    assert!(matches!(
        load_world(&cfg, &save),
        Err(PersistError::BadChunkLength { .. })
    ));
}

#[test]
fn unpopulated_cache_refuses_to_flatten() {
    let cfg = cfg();
    let cache = carve_chunk::DensityCache::new(cfg.samples_per_axis());
    assert!(matches!(
        flatten(&cache, ChunkCoord::new(0, 0, 0)),
        Err(PersistError::Unpopulated { .. })
    ));
}
