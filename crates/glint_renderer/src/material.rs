//! Materials describing how light scatters off surfaces.

use crate::{hittable::HitRecord, Ray, SceneError};
use glint_math::random::{gen_f64, random_unit_vector};
use glint_math::{near_zero, reflect, refract, Vec3};
use rand::RngCore;

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// Outcome of a successful scatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterResult {
    /// Per-channel fraction of light carried by the scattered ray
    pub attenuation: Color,
    /// The outgoing ray
    pub scattered: Ray,
}

/// Surface material.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Lambertian(Lambertian),
    Metal(Metal),
    Dielectric(Dielectric),
}

impl Material {
    /// Scatter an incoming ray.
    ///
    /// Returns `None` if the ray is absorbed.
    pub fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        match self {
            Material::Lambertian(m) => Some(m.scatter(rec, rng)),
            Material::Metal(m) => m.scatter(ray_in, rec, rng),
            Material::Dielectric(m) => Some(m.scatter(ray_in, rec, rng)),
        }
    }
}

impl From<Lambertian> for Material {
    fn from(m: Lambertian) -> Self {
        Material::Lambertian(m)
    }
}

impl From<Metal> for Material {
    fn from(m: Metal) -> Self {
        Material::Metal(m)
    }
}

impl From<Dielectric> for Material {
    fn from(m: Dielectric) -> Self {
        Material::Dielectric(m)
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    ///
    /// Channels are clamped to [0, 1].
    pub fn new(albedo: Color) -> Self {
        Self {
            albedo: albedo.clamp(Color::ZERO, Color::ONE),
        }
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }

    fn scatter(&self, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        let mut scatter_direction = rec.normal + random_unit_vector(rng);

        // Catch degenerate scatter direction
        if near_zero(scatter_direction) {
            scatter_direction = rec.normal;
        }

        ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, scatter_direction),
        }
    }
}

/// Metal (specular) material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metal {
    albedo: Color,
    fuzz: f64,
}

impl Metal {
    /// Create a new Metal material.
    ///
    /// - `albedo`: The color of the metal, clamped to [0, 1]
    /// - `fuzz`: Roughness, 0.0 = perfect mirror, 1.0 = very rough
    pub fn new(albedo: Color, fuzz: f64) -> Self {
        Self {
            albedo: albedo.clamp(Color::ZERO, Color::ONE),
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }

    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }

    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let reflected = reflect(ray_in.direction(), rec.normal);
        // Fuzz is scaled against a unit reflection; a perfect mirror keeps `d - 2(d·n)n`
        let scattered_dir = if self.fuzz > 0.0 {
            reflected.normalize() + self.fuzz * random_unit_vector(rng)
        } else {
            reflected
        };

        // Fuzzed below the surface: absorbed
        if scattered_dir.dot(rec.normal) <= 0.0 {
            return None;
        }

        Some(ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, scattered_dir),
        })
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dielectric {
    /// Index of refraction relative to the enclosing medium
    ior: f64,
}

impl Dielectric {
    /// Create a new Dielectric material.
    ///
    /// - `ior`: Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub fn new(ior: f64) -> Result<Self, SceneError> {
        if !(ior > 0.0 && ior.is_finite()) {
            return Err(SceneError::InvalidIor(ior));
        }
        Ok(Self { ior })
    }

    pub fn ior(&self) -> f64 {
        self.ior
    }

    /// Schlick's approximation for reflectance
    pub fn reflectance(cosine: f64, refraction_ratio: f64) -> f64 {
        let r0 = ((1.0 - refraction_ratio) / (1.0 + refraction_ratio)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
    }

    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        let refraction_ratio = if rec.front_face {
            1.0 / self.ior
        } else {
            self.ior
        };

        let unit_direction = ray_in.direction().normalize();
        let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        // Total internal reflection
        let cannot_refract = refraction_ratio * sin_theta > 1.0;

        let direction = if cannot_refract
            || Self::reflectance(cos_theta, refraction_ratio) > gen_f64(rng)
        {
            reflect(unit_direction, rec.normal)
        } else {
            refract(unit_direction, rec.normal, refraction_ratio)
        };

        ScatterResult {
            attenuation: Color::ONE,
            scattered: Ray::new(rec.p, direction),
        }
    }
}
