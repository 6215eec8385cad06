//! The ground the roads sit on, and the population density that steers highways. Both are
//! consumed read-only through small traits, so anything from a flat plane to a sampled heightmap
//! can plug in.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};

use geom::{Angle, Pt2D};

/// Central differences step, in meters.
const SLOPE_SAMPLE_DIST: f64 = 1.0;

/// A point on the terrain surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    pub pt: Pt2D,
    pub height: f64,
    /// Unit normal as (x, y, z) with y pointing up.
    pub normal: [f64; 3],
}

pub trait Terrain {
    fn height_at(&self, x: f64, z: f64) -> f64;

    fn surface_point(&self, x: f64, z: f64) -> SurfacePoint {
        let d = SLOPE_SAMPLE_DIST;
        let dx = self.height_at(x + d, z) - self.height_at(x - d, z);
        let dz = self.height_at(x, z + d) - self.height_at(x, z - d);
        let normal = [-dx, 2.0 * d, -dz];
        let len = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        SurfacePoint {
            pt: Pt2D::new(x, z),
            height: self.height_at(x, z),
            normal: [normal[0] / len, normal[1] / len, normal[2] / len],
        }
    }
}

pub struct FlatTerrain {
    pub height: f64,
}

impl Terrain for FlatTerrain {
    fn height_at(&self, _: f64, _: f64) -> f64 {
        self.height
    }
}

/// Fractal OpenSimplex2 hills.
pub struct NoiseTerrain {
    noise: FastNoiseLite,
    amplitude: f64,
}

impl NoiseTerrain {
    pub fn new(seed: i32, amplitude: f64, frequency: f32) -> NoiseTerrain {
        NoiseTerrain {
            noise: fbm_noise(seed, frequency),
            amplitude,
        }
    }
}

impl Terrain for NoiseTerrain {
    fn height_at(&self, x: f64, z: f64) -> f64 {
        // The noise is roughly in [-1, 1]
        let raw = self.noise.get_noise_2d(x as f32, z as f32) as f64;
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0) * self.amplitude
    }
}

/// How many people want to live somewhere, in [0, 1]. Highways climb towards denser areas.
pub trait DensityField {
    fn value_at(&self, u: f64, v: f64) -> f64;

    /// The direction in which density increases fastest, or `None` on a plateau.
    fn slope_at(&self, u: f64, v: f64) -> Option<Angle> {
        let d = SLOPE_SAMPLE_DIST;
        let du = self.value_at(u + d, v) - self.value_at(u - d, v);
        let dv = self.value_at(u, v + d) - self.value_at(u, v - d);
        if du.abs() < 1e-9 && dv.abs() < 1e-9 {
            return None;
        }
        Some(Angle::new_rads(dv.atan2(du)))
    }
}

pub struct UniformDensity {
    pub value: f64,
}

impl DensityField for UniformDensity {
    fn value_at(&self, _: f64, _: f64) -> f64 {
        self.value
    }
}

/// Density falling off linearly from a few city centers.
pub struct RadialDensity {
    pub centers: Vec<Pt2D>,
    /// Density reaches 0 this far from a center.
    pub radius: f64,
}

impl DensityField for RadialDensity {
    fn value_at(&self, u: f64, v: f64) -> f64 {
        let pt = Pt2D::new(u, v);
        self.centers
            .iter()
            .map(|c| (1.0 - c.dist_to(pt) / self.radius).max(0.0))
            .fold(0.0, f64::max)
    }
}

pub struct NoiseDensity {
    noise: FastNoiseLite,
}

impl NoiseDensity {
    pub fn new(seed: i32, frequency: f32) -> NoiseDensity {
        NoiseDensity {
            noise: fbm_noise(seed, frequency),
        }
    }
}

impl DensityField for NoiseDensity {
    fn value_at(&self, u: f64, v: f64) -> f64 {
        let raw = self.noise.get_noise_2d(u as f32, v as f32) as f64;
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

fn fbm_noise(seed: i32, frequency: f32) -> FastNoiseLite {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(frequency));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(4));
    noise.set_fractal_gain(Some(0.5));
    noise.set_fractal_lacunarity(Some(2.0));
    noise
}
