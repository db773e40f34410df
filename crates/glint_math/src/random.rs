//! Sampling helpers driven by an explicit random number generator.
//!
//! Every function takes the generator as a parameter so a render can be
//! reproduced exactly from its seed.

use crate::Vec3;
use rand::{Rng, RngCore};

/// Uniform random number in [0, 1).
#[inline]
pub fn gen_f64(rng: &mut dyn RngCore) -> f64 {
    rng.gen::<f64>()
}

/// Uniform random number in [min, max).
#[inline]
pub fn gen_range(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    min + (max - min) * gen_f64(rng)
}

/// Random vector with each component uniform in [min, max).
pub fn random_vec3(rng: &mut dyn RngCore, min: f64, max: f64) -> Vec3 {
    Vec3::new(
        gen_range(rng, min, max),
        gen_range(rng, min, max),
        gen_range(rng, min, max),
    )
}

/// Generate a random unit vector uniformly distributed on the unit sphere.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    // Rejection sampling inside the unit ball, then project onto the surface
    loop {
        let p = random_vec3(rng, -1.0, 1.0);
        let len_sq = p.length_squared();
        if 1e-160 < len_sq && len_sq <= 1.0 {
            return p / len_sq.sqrt();
        }
    }
}

/// Sample a random point in the unit disk (z = 0).
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(gen_range(rng, -1.0, 1.0), gen_range(rng, -1.0, 1.0), 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Sample a random point in the square [-0.5, 0.5] x [-0.5, 0.5] (z = 0).
pub fn sample_square(rng: &mut dyn RngCore) -> Vec3 {
    Vec3::new(gen_f64(rng) - 0.5, gen_f64(rng) - 0.5, 0.0)
}
