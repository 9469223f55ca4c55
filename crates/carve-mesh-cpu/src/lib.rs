//! CPU marching cubes mesher for density chunks.
#![forbid(unsafe_code)]

mod build;
mod cell;
mod mesh;
pub mod tables;
mod weld;

pub use build::{CornerSource, build_chunk_mesh};
pub use cell::MarchedCube;
pub use mesh::ChunkMeshData;
pub use weld::weld_vertices;
