//! Vector helpers shared by the scattering models.

use crate::Vec3;

const NEAR_ZERO_EPSILON: f64 = 1e-8;

/// True if every component of `v` is close to zero.
#[inline]
pub fn near_zero(v: Vec3) -> bool {
    v.x.abs() < NEAR_ZERO_EPSILON && v.y.abs() < NEAR_ZERO_EPSILON && v.z.abs() < NEAR_ZERO_EPSILON
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with the given normal.
///
/// `etai_over_etat` is the ratio of refractive indices on the incident and
/// transmitted sides.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f64) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}
