use carve_geom::Vec3;

/// Triangle mesh for one chunk, vertices in chunk-local space.
///
/// Built fresh on every remesh and handed to the consumer whole, so the
/// previous mesh is replaced atomically from its point of view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMeshData {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl ChunkMeshData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends one triangle as three fresh vertices.
    #[inline]
    pub fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let base = self.vertices.len() as u32;
        self.vertices.push(a);
        self.vertices.push(b);
        self.vertices.push(c);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
}
