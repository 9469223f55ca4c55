use carve_geom::Vec3;

use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS};

/// One evaluated grid cell: 8 corner positions (chunk-local) and densities.
///
/// Transient; rebuilt for every cell on every remesh, never stored.
#[derive(Clone, Copy, Debug)]
pub struct MarchedCube {
    pub positions: [Vec3; 8],
    pub densities: [f32; 8],
}

impl MarchedCube {
    /// Builds the cell from its local origin and per-corner densities
    /// supplied by `corner_density(grid_x, grid_y, grid_z, world_pos)`.
    ///
    /// Corner ordering follows [`CORNER_OFFSETS`], which the triangulation
    /// table depends on.
    pub fn evaluate(
        cell: (usize, usize, usize),
        world_origin: Vec3,
        cell_size: f32,
        mut corner_density: impl FnMut(usize, usize, usize, Vec3) -> f32,
    ) -> Self {
        let (cx, cy, cz) = cell;
        let mut positions = [Vec3::ZERO; 8];
        let mut densities = [0.0f32; 8];
        for (i, off) in CORNER_OFFSETS.iter().enumerate() {
            let gx = cx + off[0];
            let gy = cy + off[1];
            let gz = cz + off[2];
            let local = Vec3::new(gx as f32, gy as f32, gz as f32) * cell_size;
            positions[i] = local;
            densities[i] = corner_density(gx, gy, gz, world_origin + local);
        }
        Self {
            positions,
            densities,
        }
    }

    /// Case index: bit `i` set when corner `i` is strictly below threshold.
    #[inline]
    pub fn case_index(&self, threshold: f32) -> u8 {
        let mut case = 0u8;
        for (i, d) in self.densities.iter().enumerate() {
            if *d < threshold {
                case |= 1 << i;
            }
        }
        case
    }

    /// Surface crossing point on the given edge, chunk-local.
    ///
    /// Interpolated at `t = inv_lerp(d0, d1, threshold)` clamped to [0,1];
    /// midpoint when interpolation is off or the densities are equal (the
    /// latter guards the division by zero).
    #[inline]
    pub fn edge_point(&self, edge: usize, interpolate: bool, threshold: f32) -> Vec3 {
        let [c0, c1] = EDGE_CORNERS[edge];
        let d0 = self.densities[c0];
        let d1 = self.densities[c1];
        let t = if !interpolate || d0 == d1 {
            0.5
        } else {
            ((threshold - d0) / (d1 - d0)).clamp(0.0, 1.0)
        };
        self.positions[c0].lerp(self.positions[c1], t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_cell() -> MarchedCube {
        // Unit cell spanning y in [0,1] of the field d = -y.
        MarchedCube::evaluate((0, 0, 0), Vec3::ZERO, 1.0, |_, gy, _, _| -(gy as f32))
    }

    #[test]
    fn case_bits_follow_threshold() {
        let cube = ground_cell();
        // Corners at y=1 (indices 2,3,6,7 in table order) are below 0.
        assert_eq!(cube.case_index(0.0), 0b1100_1100);
        // With a threshold below every sample nothing is outside.
        assert_eq!(cube.case_index(-2.0), 0);
        // And above every sample, all 8 bits set.
        assert_eq!(cube.case_index(1.0), 0xFF);
    }

    #[test]
    fn edge_point_interpolates_and_clamps() {
        let cube = ground_cell();
        // Edge 3 connects corners 3 (y=1, d=-1) and 0 (y=0, d=0).
        let p = cube.edge_point(3, true, -0.25);
        assert!((p.y - 0.25).abs() < 1e-6);
        // Threshold outside the density range clamps to the far endpoint.
        let p = cube.edge_point(3, true, 5.0);
        assert!(p.y.abs() < 1e-6);
        let p = cube.edge_point(3, true, -5.0);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn equal_densities_fall_back_to_midpoint() {
        let cube = MarchedCube::evaluate((0, 0, 0), Vec3::ZERO, 2.0, |_, _, _, _| 1.0);
        // Edge 0 connects corners 0 and 1 along x.
        let p = cube.edge_point(0, true, 1.0);
        assert!((p.x - 1.0).abs() < 1e-6);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn midpoint_mode_ignores_densities() {
        let cube = ground_cell();
        let p = cube.edge_point(3, false, 0.0);
        assert!((p.y - 0.5).abs() < 1e-6);
    }
}
