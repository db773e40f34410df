//! Sphere primitive for ray tracing.

use crate::{hittable::HitRecord, Material, Ray, SceneError};
use glint_math::{Interval, Point3};
use std::sync::Arc;

/// A sphere primitive.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    material: Arc<Material>,
}

impl Sphere {
    /// Create a new sphere.
    ///
    /// The radius must be positive; materials are shared between spheres.
    pub fn new(center: Point3, radius: f64, material: Arc<Material>) -> Result<Self, SceneError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SceneError::NonPositiveRadius(radius));
        }

        Ok(Self {
            center,
            radius,
            material,
        })
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Near root first, then far root
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(HitRecord::new(ray, root, outward_normal, &self.material))
    }
}
