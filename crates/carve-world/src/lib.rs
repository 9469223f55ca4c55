//! World sizing, configuration, and density field sampling.
#![forbid(unsafe_code)]

mod chunk_coord;
mod config;
mod field;

pub use chunk_coord::ChunkCoord;
pub use config::{WorldConfig, load_config_from_path};
pub use field::{ConstantField, DensityField, FlatGround, NoiseTerrain, NoiseTerrainParams};
