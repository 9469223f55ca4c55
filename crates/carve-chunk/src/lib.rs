//! Per-chunk density sample storage.
#![forbid(unsafe_code)]

use carve_geom::Vec3;
use carve_world::{ChunkCoord, DensityField, WorldConfig};

/// A world axis, used when copying boundary sample layers between chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit chunk-coordinate step toward the lower neighbor on this axis.
    #[inline]
    pub fn lower_offset(self) -> (i32, i32, i32) {
        match self {
            Axis::X => (-1, 0, 0),
            Axis::Y => (0, -1, 0),
            Axis::Z => (0, 0, -1),
        }
    }
}

/// Cube of `dim³` density samples owned by one chunk.
///
/// Samples fill lazily from the density field the first time a cell corner
/// needs them; an index seeded by seam repair (or a load from disk) is never
/// recomputed. Layout is `x + y*dim + z*dim*dim`, the same linear order the
/// io layer persists.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityCache {
    dim: usize,
    values: Vec<f32>,
    filled: Vec<bool>,
}

impl DensityCache {
    pub fn new(dim: usize) -> Self {
        let n = dim * dim * dim;
        Self {
            dim,
            values: vec![0.0; n],
            filled: vec![false; n],
        }
    }

    /// Rebuilds a cache from a complete linear sample array.
    /// Returns `None` when the array length does not match `dim³`.
    pub fn from_values(dim: usize, values: Vec<f32>) -> Option<Self> {
        if values.len() != dim * dim * dim {
            return None;
        }
        let filled = vec![true; values.len()];
        Some(Self {
            dim,
            values,
            filled,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dim + z * self.dim * self.dim
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        let i = self.idx(x, y, z);
        if self.filled[i] {
            Some(self.values[i])
        } else {
            None
        }
    }

    /// Overwrites one sample, marking it filled.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: f32) {
        let i = self.idx(x, y, z);
        self.values[i] = v;
        self.filled[i] = true;
    }

    /// Returns the cached sample, filling it from the field on first touch.
    #[inline]
    pub fn sample_or_fill(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        pos: Vec3,
        field: &dyn DensityField,
    ) -> f32 {
        let i = self.idx(x, y, z);
        if self.filled[i] {
            return self.values[i];
        }
        let v = field.density(pos);
        self.values[i] = v;
        self.filled[i] = true;
        v
    }

    #[inline]
    pub fn is_fully_populated(&self) -> bool {
        self.filled.iter().all(|f| *f)
    }

    /// Fills every sample not yet seeded.
    pub fn populate(&mut self, field: &dyn DensityField, origin: Vec3, cell_size: f32) {
        for z in 0..self.dim {
            for y in 0..self.dim {
                for x in 0..self.dim {
                    let p = origin + Vec3::new(x as f32, y as f32, z as f32) * cell_size;
                    self.sample_or_fill(x, y, z, p, field);
                }
            }
        }
    }

    /// Raw linear samples. Only meaningful once fully populated.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Adds `delta(sample_index, sample_pos)` to every sample.
    /// Returns whether any sample actually changed.
    pub fn apply_delta(
        &mut self,
        origin: Vec3,
        cell_size: f32,
        mut delta: impl FnMut(Vec3) -> f32,
    ) -> bool {
        let mut changed = false;
        for z in 0..self.dim {
            for y in 0..self.dim {
                for x in 0..self.dim {
                    let d = delta(origin + Vec3::new(x as f32, y as f32, z as f32) * cell_size);
                    if d != 0.0 {
                        let i = self.idx(x, y, z);
                        self.values[i] += d;
                        self.filled[i] = true;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Copies out the maximum-index sample layer perpendicular to `axis`.
    pub fn max_layer(&self, axis: Axis) -> Vec<f32> {
        let d = self.dim;
        let mut out = Vec::with_capacity(d * d);
        for b in 0..d {
            for a in 0..d {
                let (x, y, z) = match axis {
                    Axis::X => (d - 1, a, b),
                    Axis::Y => (a, d - 1, b),
                    Axis::Z => (a, b, d - 1),
                };
                out.push(self.values[self.idx(x, y, z)]);
            }
        }
        out
    }

    /// Overwrites the minimum-index sample layer perpendicular to `axis`
    /// with `layer` as produced by [`max_layer`](Self::max_layer).
    pub fn overwrite_min_layer(&mut self, axis: Axis, layer: &[f32]) {
        let d = self.dim;
        debug_assert_eq!(layer.len(), d * d);
        for b in 0..d {
            for a in 0..d {
                let (x, y, z) = match axis {
                    Axis::X => (0, a, b),
                    Axis::Y => (a, 0, b),
                    Axis::Z => (a, b, 0),
                };
                self.set(x, y, z, layer[b * d + a]);
            }
        }
    }

    /// Extracts the minimum-index layer, for seam comparison.
    pub fn min_layer(&self, axis: Axis) -> Vec<f32> {
        let d = self.dim;
        let mut out = Vec::with_capacity(d * d);
        for b in 0..d {
            for a in 0..d {
                let (x, y, z) = match axis {
                    Axis::X => (0, a, b),
                    Axis::Y => (a, 0, b),
                    Axis::Z => (a, b, 0),
                };
                out.push(self.values[self.idx(x, y, z)]);
            }
        }
        out
    }

    /// Whether the populated samples cross the threshold anywhere.
    pub fn occupancy(&self, threshold: f32) -> ChunkOccupancy {
        if !self.is_fully_populated() {
            return ChunkOccupancy::Populated;
        }
        let below = self.values[0] < threshold;
        if self.values.iter().all(|v| (*v < threshold) == below) {
            ChunkOccupancy::Empty
        } else {
            ChunkOccupancy::Populated
        }
    }
}

/// Whether a chunk's density volume crosses the surface at all.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkOccupancy {
    Empty,
    Populated,
}

impl ChunkOccupancy {
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, ChunkOccupancy::Empty)
    }
}

/// Builds a fully populated cache for `coord` straight from the field.
pub fn populate_density_cache(
    cfg: &WorldConfig,
    coord: ChunkCoord,
    field: &dyn DensityField,
) -> DensityCache {
    let mut cache = DensityCache::new(cfg.samples_per_axis());
    cache.populate(field, cfg.chunk_origin(coord), cfg.cell_size);
    cache
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_world::{ConstantField, FlatGround};

    #[test]
    fn sample_or_fill_is_write_once() {
        let mut cache = DensityCache::new(3);
        let field = ConstantField(2.0);
        let v = cache.sample_or_fill(1, 1, 1, Vec3::ZERO, &field);
        assert_eq!(v, 2.0);
        // Seeded values win over later field reads.
        cache.set(0, 0, 0, 9.0);
        let other = ConstantField(-5.0);
        assert_eq!(cache.sample_or_fill(0, 0, 0, Vec3::ZERO, &other), 9.0);
        assert_eq!(cache.sample_or_fill(1, 1, 1, Vec3::ZERO, &other), 2.0);
    }

    #[test]
    fn layer_copy_round_trips() {
        let cfg = WorldConfig {
            cells_per_axis: 3,
            ..WorldConfig::default()
        };
        let field = FlatGround::default();
        let a = populate_density_cache(&cfg, ChunkCoord::new(0, 0, 0), &field);
        let mut b = populate_density_cache(&cfg, ChunkCoord::new(1, 0, 0), &field);
        let layer = a.max_layer(Axis::X);
        b.overwrite_min_layer(Axis::X, &layer);
        assert_eq!(b.min_layer(Axis::X), layer);
    }

    #[test]
    fn occupancy_empty_for_uniform_sign() {
        let cfg = WorldConfig {
            cells_per_axis: 2,
            ..WorldConfig::default()
        };
        let below = populate_density_cache(&cfg, ChunkCoord::new(0, 0, 0), &ConstantField(-1.0));
        assert!(below.occupancy(0.0).is_empty());
        let above = populate_density_cache(&cfg, ChunkCoord::new(0, 0, 0), &ConstantField(1.0));
        assert!(above.occupancy(0.0).is_empty());
        // Ground plane through a chunk straddling y=0 crosses the surface.
        let field = FlatGround::default();
        let mut cross = DensityCache::new(cfg.samples_per_axis());
        cross.populate(&field, Vec3::new(0.0, -1.0, 0.0), cfg.cell_size);
        assert!(!cross.occupancy(0.0).is_empty());
    }
}
