use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use carve::{
    ChunkCoord, DensityField, FlatGround, NoiseTerrain, NoiseTerrainParams, NullSink, TerrainGrid,
    WorldConfig, load_config_from_path, load_world_from_path, save_world_to_path,
};

/// Headless terrain generator: meshes every chunk of the configured world,
/// fixes seams, and optionally round-trips the density caches through disk.
#[derive(Parser, Debug)]
#[command(name = "carve", about = "chunked marching-cubes terrain generator")]
struct Args {
    /// World configuration TOML; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Noise terrain seed.
    #[arg(long, default_value_t = 1337)]
    seed: i32,
    /// Use the flat ground field instead of noise terrain.
    #[arg(long)]
    flat: bool,
    /// Seed chunk densities from a saved world before meshing.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Write chunk densities here after meshing.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => WorldConfig::default(),
    };
    let field: Arc<dyn DensityField> = if args.flat {
        Arc::new(FlatGround::default())
    } else {
        Arc::new(NoiseTerrain::new(args.seed, NoiseTerrainParams::default()))
    };
    log::info!(
        "world {}x{}x{} chunks, {} cells per axis",
        cfg.chunks_x,
        cfg.chunks_y,
        cfg.chunks_z,
        cfg.cells_per_axis
    );

    let mut grid = TerrainGrid::new(cfg.clone(), field, Box::new(NullSink));

    if let Some(path) = &args.load {
        for (coord, cache) in load_world_from_path(path, &cfg)? {
            grid.insert_cache(coord, cache);
        }
    }

    for cz in 0..cfg.chunks_z as i32 {
        for cy in 0..cfg.chunks_y as i32 {
            for cx in 0..cfg.chunks_x as i32 {
                grid.request_remesh(ChunkCoord::new(cx, cy, cz), true);
            }
        }
    }
    while grid.has_pending_work() {
        if grid.update(64) == 0 {
            thread::sleep(Duration::from_millis(2));
        }
    }
    grid.fix_seams();

    let mut vertices = 0usize;
    let mut triangles = 0usize;
    for cz in 0..cfg.chunks_z as i32 {
        for cy in 0..cfg.chunks_y as i32 {
            for cx in 0..cfg.chunks_x as i32 {
                if let Some(mesh) = grid
                    .chunk(ChunkCoord::new(cx, cy, cz))
                    .and_then(|r| r.mesh.as_ref())
                {
                    vertices += mesh.vertex_count();
                    triangles += mesh.triangle_count();
                }
            }
        }
    }
    log::info!("meshed {} vertices, {} triangles", vertices, triangles);

    if let Some(path) = &args.save {
        save_world_to_path(path, &cfg, &grid.populated_chunks())?;
    }
    Ok(())
}
