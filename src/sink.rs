use carve_mesh_cpu::ChunkMeshData;
use carve_world::ChunkCoord;

/// Receives finished chunk meshes and visibility changes.
///
/// Implemented by the host rendering layer and injected into the grid; the
/// grid never looks the renderer up itself. Meshes arrive in chunk-local
/// space; the host places them at the chunk origin.
pub trait MeshSink {
    fn update_mesh(&mut self, coord: ChunkCoord, mesh: &ChunkMeshData);
    fn set_visible(&mut self, coord: ChunkCoord, visible: bool);
}

/// Discards everything. Useful headless and in tests.
#[derive(Default)]
pub struct NullSink;

impl MeshSink for NullSink {
    fn update_mesh(&mut self, _coord: ChunkCoord, _mesh: &ChunkMeshData) {}
    fn set_visible(&mut self, _coord: ChunkCoord, _visible: bool) {}
}
