use carve_geom::Vec3;
use fastnoise_lite::{CellularDistanceFunction, CellularReturnType, FastNoiseLite, NoiseType};

/// Scalar density at a world point. Positive side of `threshold` is solid.
///
/// Implementations must be pure and callable concurrently from worker
/// threads without shared mutable state.
pub trait DensityField: Send + Sync {
    fn density(&self, p: Vec3) -> f32;
}

/// Uniform density everywhere. Mostly useful in tests.
#[derive(Clone, Copy, Debug)]
pub struct ConstantField(pub f32);

impl DensityField for ConstantField {
    #[inline]
    fn density(&self, _p: Vec3) -> f32 {
        self.0
    }
}

/// Flat ground plane: density falls off linearly with height.
#[derive(Clone, Copy, Debug)]
pub struct FlatGround {
    pub height: f32,
    pub offset: f32,
}

impl FlatGround {
    pub const fn new(height: f32, offset: f32) -> Self {
        Self { height, offset }
    }
}

impl Default for FlatGround {
    fn default() -> Self {
        Self {
            height: 1.0,
            offset: 0.0,
        }
    }
}

impl DensityField for FlatGround {
    #[inline]
    fn density(&self, p: Vec3) -> f32 {
        -p.y * self.height + self.offset
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NoiseTerrainParams {
    /// Horizontal stretch applied to x/z before sampling.
    pub scale: f32,
    pub noise_scale: f32,
    pub noise_scale2: f32,
    /// Simplex contribution strength.
    pub height: f32,
    /// Cellular carve-out strength.
    pub height2: f32,
    /// Ground plane steepness.
    pub height3: f32,
    pub offset: f32,
}

impl Default for NoiseTerrainParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            noise_scale: 0.05,
            noise_scale2: 0.03,
            height: 8.0,
            height2: 4.0,
            height3: 1.0,
            offset: 8.0,
        }
    }
}

/// Ground plane combined with 3D simplex noise and a cellular carve term.
pub struct NoiseTerrain {
    params: NoiseTerrainParams,
    simplex: FastNoiseLite,
    cellular: FastNoiseLite,
}

impl NoiseTerrain {
    pub fn new(seed: i32, params: NoiseTerrainParams) -> Self {
        let mut simplex = FastNoiseLite::with_seed(seed);
        simplex.set_noise_type(Some(NoiseType::OpenSimplex2));
        simplex.set_frequency(Some(1.0));
        let mut cellular = FastNoiseLite::with_seed(seed ^ 0x5f3_7a1);
        cellular.set_noise_type(Some(NoiseType::Cellular));
        cellular.set_cellular_distance_function(Some(CellularDistanceFunction::Euclidean));
        cellular.set_cellular_return_type(Some(CellularReturnType::Distance));
        cellular.set_frequency(Some(1.0));
        Self {
            params,
            simplex,
            cellular,
        }
    }
}

impl DensityField for NoiseTerrain {
    fn density(&self, p: Vec3) -> f32 {
        let pr = &self.params;
        let p = Vec3::new(p.x * pr.scale, p.y, p.z * pr.scale);
        let ground = -p.y * pr.height3 + pr.offset;
        let s = p * pr.noise_scale;
        let hills = self.simplex.get_noise_3d(s.x, s.y, s.z) * pr.height;
        let c = p * pr.noise_scale2;
        let caves = (self.cellular.get_noise_3d(c.x, c.y, c.z) - 0.5) * pr.height2;
        ground + hills - caves
    }
}
