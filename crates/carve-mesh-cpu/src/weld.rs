use carve_geom::Vec3;

use crate::mesh::ChunkMeshData;

/// Collapses every vertex within `merge_distance` of an earlier vertex onto
/// the earlier one and remaps triangle indices to the survivors.
///
/// O(V²) in the chunk's vertex count, which is bounded by the fixed cell
/// grid size; welding never reaches across chunks. A non-positive
/// `merge_distance` disables welding entirely (rather than merging
/// everything or spinning on zero-length comparisons).
pub fn weld_vertices(mesh: &mut ChunkMeshData, merge_distance: f32) {
    if merge_distance <= 0.0 || mesh.vertices.is_empty() {
        return;
    }
    let mut kept: Vec<Vec3> = Vec::new();
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());
    for v in &mesh.vertices {
        match kept.iter().position(|k| k.distance(*v) <= merge_distance) {
            Some(j) => remap.push(j as u32),
            None => {
                kept.push(*v);
                remap.push((kept.len() - 1) as u32);
            }
        }
    }
    for idx in &mut mesh.indices {
        *idx = remap[*idx as usize];
    }
    mesh.vertices = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_pair() -> ChunkMeshData {
        let mut m = ChunkMeshData::default();
        // Two triangles sharing an edge, but with near-duplicate vertices.
        m.push_triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        m.push_triangle(
            Vec3::new(1.0, 0.0, 1e-4),
            Vec3::new(0.0, 1.0, -1e-4),
            Vec3::new(1.0, 1.0, 0.0),
        );
        m
    }

    #[test]
    fn welds_near_duplicates() {
        let mut m = tri_pair();
        weld_vertices(&mut m, 1e-3);
        assert_eq!(m.vertex_count(), 4);
        assert_eq!(m.triangle_count(), 2);
        for i in &m.indices {
            assert!((*i as usize) < m.vertex_count());
        }
    }

    #[test]
    fn weld_is_idempotent() {
        let mut once = tri_pair();
        weld_vertices(&mut once, 1e-3);
        let mut twice = once.clone();
        weld_vertices(&mut twice, 1e-3);
        assert_eq!(once, twice);
    }

    #[test]
    fn non_positive_distance_disables_welding() {
        let mut m = tri_pair();
        let before = m.clone();
        weld_vertices(&mut m, 0.0);
        assert_eq!(m, before);
        weld_vertices(&mut m, -1.0);
        assert_eq!(m, before);
    }
}
