use std::error::Error;
use std::fs;
use std::path::Path;

use carve_geom::Vec3;
use serde::{Deserialize, Serialize};

use crate::ChunkCoord;

/// World-level parameters, read once at init time.
///
/// Changing `cells_per_axis` or `cell_size` after chunks exist invalidates
/// every cached density array; the io layer rejects saves made under a
/// different parameter set for the same reason.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Cells marched per chunk axis; the density cache holds one extra
    /// sample layer per axis.
    #[serde(default = "default_cells_per_axis")]
    pub cells_per_axis: usize,
    /// Edge length of one marched cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// Densities below this value count as outside the solid.
    #[serde(default)]
    pub threshold: f32,
    #[serde(default = "default_world_chunks")]
    pub chunks_x: usize,
    #[serde(default = "default_world_chunks")]
    pub chunks_y: usize,
    #[serde(default = "default_world_chunks")]
    pub chunks_z: usize,
    /// Cache density samples per chunk instead of re-querying the field.
    #[serde(default = "default_true")]
    pub cache_densities: bool,
    /// Interpolate edge crossings; midpoints when false.
    #[serde(default = "default_true")]
    pub interpolate: bool,
    #[serde(default)]
    pub merge_vertices: bool,
    #[serde(default = "default_merge_distance")]
    pub merge_distance: f32,
}

fn default_cells_per_axis() -> usize {
    16
}
fn default_cell_size() -> f32 {
    1.0
}
fn default_world_chunks() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_merge_distance() -> f32 {
    0.001
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cells_per_axis: default_cells_per_axis(),
            cell_size: default_cell_size(),
            threshold: 0.0,
            chunks_x: default_world_chunks(),
            chunks_y: default_world_chunks(),
            chunks_z: default_world_chunks(),
            cache_densities: true,
            interpolate: true,
            merge_vertices: false,
            merge_distance: default_merge_distance(),
        }
    }
}

impl WorldConfig {
    /// Density samples per chunk axis (one more than cells).
    #[inline]
    pub fn samples_per_axis(&self) -> usize {
        self.cells_per_axis + 1
    }

    /// World-space edge length of one chunk.
    #[inline]
    pub fn chunk_span(&self) -> f32 {
        self.cells_per_axis as f32 * self.cell_size
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks_x * self.chunks_y * self.chunks_z
    }

    #[inline]
    pub fn in_bounds(&self, coord: ChunkCoord) -> bool {
        coord.cx >= 0
            && coord.cy >= 0
            && coord.cz >= 0
            && (coord.cx as usize) < self.chunks_x
            && (coord.cy as usize) < self.chunks_y
            && (coord.cz as usize) < self.chunks_z
    }

    /// World-space position of the chunk's minimum corner.
    #[inline]
    pub fn chunk_origin(&self, coord: ChunkCoord) -> Vec3 {
        let span = self.chunk_span();
        Vec3::new(
            coord.cx as f32 * span,
            coord.cy as f32 * span,
            coord.cz as f32 * span,
        )
    }

    /// Chunk whose cell volume contains the world point.
    #[inline]
    pub fn chunk_containing(&self, p: Vec3) -> ChunkCoord {
        let span = self.chunk_span();
        ChunkCoord::new(
            (p.x / span).floor() as i32,
            (p.y / span).floor() as i32,
            (p.z / span).floor() as i32,
        )
    }
}

/// Loads a `WorldConfig` from a TOML file; missing fields take defaults.
pub fn load_config_from_path(path: &Path) -> Result<WorldConfig, Box<dyn Error>> {
    let txt = fs::read_to_string(path)?;
    let cfg: WorldConfig = toml::from_str(&txt)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: WorldConfig = toml::from_str("cells_per_axis = 8\nthreshold = 0.5\n").unwrap();
        assert_eq!(cfg.cells_per_axis, 8);
        assert_eq!(cfg.samples_per_axis(), 9);
        assert!(cfg.cache_densities);
        assert!(cfg.interpolate);
        assert_eq!(cfg.threshold, 0.5);
    }

    #[test]
    fn chunk_origin_and_containing_agree() {
        let cfg = WorldConfig {
            cells_per_axis: 4,
            cell_size: 0.5,
            ..WorldConfig::default()
        };
        let coord = ChunkCoord::new(2, 1, 3);
        let origin = cfg.chunk_origin(coord);
        // A point strictly inside the chunk maps back to it.
        let inside = origin + Vec3::splat(cfg.chunk_span() * 0.5);
        assert_eq!(cfg.chunk_containing(inside), coord);
    }

    #[test]
    fn bounds_reject_negative_and_overflow() {
        let cfg = WorldConfig::default();
        assert!(cfg.in_bounds(ChunkCoord::new(0, 0, 0)));
        assert!(!cfg.in_bounds(ChunkCoord::new(-1, 0, 0)));
        assert!(!cfg.in_bounds(ChunkCoord::new(cfg.chunks_x as i32, 0, 0)));
    }
}
