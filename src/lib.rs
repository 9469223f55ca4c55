//! Chunked marching-cubes terrain: the grid that ties density fields,
//! per-chunk caches, background meshing, and sculpting together.
#![forbid(unsafe_code)]

mod grid;
mod sink;

pub use grid::{ChunkRecord, TerrainGrid};
pub use sink::{MeshSink, NullSink};

pub use carve_chunk::{Axis, ChunkOccupancy, DensityCache, populate_density_cache};
pub use carve_edit::{Brush, BrushShape, affected_chunks, apply_brush_to_cache};
pub use carve_geom::{Aabb, Vec3};
pub use carve_io::{
    ChunkSave, PersistError, SaveParams, WorldSave, load_world, load_world_from_path, save_world,
    save_world_to_path,
};
pub use carve_mesh_cpu::{ChunkMeshData, CornerSource, build_chunk_mesh, weld_vertices};
pub use carve_runtime::{BuildJob, JobOut, Runtime};
pub use carve_world::{
    ChunkCoord, ConstantField, DensityField, FlatGround, NoiseTerrain, NoiseTerrainParams,
    WorldConfig, load_config_from_path,
};
