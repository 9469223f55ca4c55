use carve_chunk::DensityCache;
use carve_geom::Vec3;
use carve_world::{ChunkCoord, DensityField, WorldConfig};

use crate::cell::MarchedCube;
use crate::mesh::ChunkMeshData;
use crate::tables::{EDGE_TABLE, TRI_TABLE};
use crate::weld::weld_vertices;

/// Where cell corners read their densities from.
pub enum CornerSource<'a> {
    /// Query the field for every corner, no caching.
    Field(&'a dyn DensityField),
    /// Read from the chunk's cache, filling unseeded samples from the field
    /// on first touch. Seam-seeded samples are never recomputed.
    Cached {
        cache: &'a mut DensityCache,
        field: &'a dyn DensityField,
    },
}

impl CornerSource<'_> {
    #[inline]
    fn corner_density(&mut self, gx: usize, gy: usize, gz: usize, pos: Vec3) -> f32 {
        match self {
            CornerSource::Field(field) => field.density(pos),
            CornerSource::Cached { cache, field } => cache.sample_or_fill(gx, gy, gz, pos, *field),
        }
    }
}

/// Marches every cell of the chunk and assembles one mesh.
///
/// Cells are visited in fixed x-then-y-then-z order; the order only affects
/// vertex numbering, never the surface, since fragments are concatenated
/// with indices re-based by the running vertex count. After assembly the
/// whole index buffer is reversed as an explicit post-step: the downstream
/// renderer's front-face rule expects the opposite winding from the raw
/// table order. Welding runs last when enabled.
///
/// Output invariants: index count is a multiple of 3, every index is in
/// range, and a chunk without surface crossings yields an empty mesh.
pub fn build_chunk_mesh(
    cfg: &WorldConfig,
    coord: ChunkCoord,
    mut source: CornerSource<'_>,
) -> ChunkMeshData {
    let mut mesh = ChunkMeshData::default();
    let n = cfg.cells_per_axis;
    let world_origin = cfg.chunk_origin(coord);

    // A fully populated cache that never crosses the threshold cannot emit
    // a triangle from any cell; skip the march outright.
    if let CornerSource::Cached { cache, .. } = &source {
        if cache.is_fully_populated() && cache.occupancy(cfg.threshold).is_empty() {
            return mesh;
        }
    }

    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let cube =
                    MarchedCube::evaluate((x, y, z), world_origin, cfg.cell_size, |gx, gy, gz, p| {
                        source.corner_density(gx, gy, gz, p)
                    });
                let case = cube.case_index(cfg.threshold) as usize;
                if EDGE_TABLE[case] == 0 {
                    continue;
                }
                let mut edge_points = [Vec3::ZERO; 12];
                for (e, point) in edge_points.iter_mut().enumerate() {
                    if EDGE_TABLE[case] & (1 << e) != 0 {
                        *point = cube.edge_point(e, cfg.interpolate, cfg.threshold);
                    }
                }
                let row = &TRI_TABLE[case];
                let mut i = 0;
                while row[i] != -1 {
                    mesh.push_triangle(
                        edge_points[row[i] as usize],
                        edge_points[row[i + 1] as usize],
                        edge_points[row[i + 2] as usize],
                    );
                    i += 3;
                }
            }
        }
    }

    // Winding post-step, see above.
    mesh.indices.reverse();

    if cfg.merge_vertices {
        weld_vertices(&mut mesh, cfg.merge_distance);
    }

    log::trace!(
        "meshed chunk ({},{},{}): {} verts, {} tris",
        coord.cx,
        coord.cy,
        coord.cz,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    mesh
}
