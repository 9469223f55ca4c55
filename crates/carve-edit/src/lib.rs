//! Density sculpting brushes.
#![forbid(unsafe_code)]

use carve_chunk::DensityCache;
use carve_geom::{Aabb, Vec3};
use carve_world::{ChunkCoord, WorldConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushShape {
    Sphere,
    Cube,
}

/// A localized density delta around a world-space center point.
#[derive(Clone, Copy, Debug)]
pub struct Brush {
    pub center: Vec3,
    pub radius: f32,
    pub strength: f32,
    pub shape: BrushShape,
    /// Carve instead of build: negates the applied delta.
    pub invert: bool,
}

impl Brush {
    pub fn new(center: Vec3, radius: f32, strength: f32, shape: BrushShape) -> Self {
        Self {
            center,
            radius,
            strength,
            shape,
            invert: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    /// Density delta contributed at a sample position. Zero outside the
    /// brush radius; falls off linearly toward the rim.
    #[inline]
    pub fn delta_at(&self, p: Vec3) -> f32 {
        let dist = match self.shape {
            BrushShape::Sphere => self.center.distance(p),
            // Chebyshev distance gives the cube the same linear rim falloff.
            BrushShape::Cube => {
                let d = p - self.center;
                d.x.abs().max(d.y.abs()).max(d.z.abs())
            }
        };
        let fall = (self.radius - dist).max(0.0) * self.strength;
        if self.invert { -fall } else { fall }
    }

    /// World-space bounds of the brush's influence.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_radius(self.center, self.radius)
    }
}

/// Adds the brush delta to every sample of the chunk's cache, including its
/// boundary layers. Returns whether any sample changed; the cache must be
/// remeshed (and seams re-fixed) when it did.
pub fn apply_brush_to_cache(
    cache: &mut DensityCache,
    cfg: &WorldConfig,
    coord: ChunkCoord,
    brush: &Brush,
) -> bool {
    let origin = cfg.chunk_origin(coord);
    cache.apply_delta(origin, cfg.cell_size, |p| brush.delta_at(p))
}

/// In-bounds chunks whose cached sample volume intersects the brush.
///
/// A brush spanning a chunk boundary must be applied to every chunk here;
/// each chunk owns its own copy of the shared boundary samples.
pub fn affected_chunks(cfg: &WorldConfig, brush: &Brush) -> Vec<ChunkCoord> {
    let span = cfg.chunk_span();
    let b = brush.bounds();
    let lo = (
        (b.min.x / span).floor() as i32,
        (b.min.y / span).floor() as i32,
        (b.min.z / span).floor() as i32,
    );
    let hi = (
        (b.max.x / span).floor() as i32,
        (b.max.y / span).floor() as i32,
        (b.max.z / span).floor() as i32,
    );
    let mut out = Vec::new();
    for cz in lo.2..=hi.2 {
        for cy in lo.1..=hi.1 {
            for cx in lo.0..=hi.0 {
                let coord = ChunkCoord::new(cx, cy, cz);
                if cfg.in_bounds(coord) {
                    out.push(coord);
                }
            }
        }
    }
    out
}
