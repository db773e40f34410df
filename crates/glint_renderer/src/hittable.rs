//! Hittable surfaces and HitRecord for ray-object intersection.

use crate::{Material, Ray, Sphere};
use glint_math::{Interval, Point3, Vec3};

/// Record of a ray-object intersection.
#[derive(Debug, Clone)]
pub struct HitRecord<'a> {
    /// Point of intersection
    pub p: Point3,
    /// Unit surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Material at the intersection point
    pub material: &'a Material,
    /// Parameter t where the intersection occurs
    pub t: f64,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl<'a> HitRecord<'a> {
    /// Build a record from an outward normal, orienting it against the ray.
    pub fn new(ray: &Ray, t: f64, outward_normal: Vec3, material: &'a Material) -> Self {
        let mut rec = Self {
            p: ray.at(t),
            normal: outward_normal,
            material,
            t,
            front_face: true,
        };
        rec.set_face_normal(ray, outward_normal);
        rec
    }

    /// Set the face normal based on ray direction and outward normal.
    ///
    /// `outward_normal` must be unit length. The stored normal always points
    /// against the ray, so `front_face` records which side was hit.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        // If the ray and normal point in the same direction, we're inside
        self.front_face = ray.direction().dot(outward_normal) < 0.0;

        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// A surface that can be hit by rays.
#[derive(Debug, Clone)]
pub enum Hittable {
    Sphere(Sphere),
    List(HittableList),
}

impl Hittable {
    /// Test if a ray hits this surface with t strictly inside `ray_t`.
    ///
    /// Pure query; returns the nearest hit, if any.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        match self {
            Hittable::Sphere(sphere) => sphere.hit(ray, ray_t),
            Hittable::List(list) => list.hit(ray, ray_t),
        }
    }
}

impl From<Sphere> for Hittable {
    fn from(sphere: Sphere) -> Self {
        Hittable::Sphere(sphere)
    }
}

impl From<HittableList> for Hittable {
    fn from(list: HittableList) -> Self {
        Hittable::List(list)
    }
}

/// A list of hittable objects.
#[derive(Debug, Clone, Default)]
pub struct HittableList {
    objects: Vec<Hittable>,
}

impl HittableList {
    /// Create a new empty hittable list.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Add an object to the list.
    pub fn add(&mut self, object: impl Into<Hittable>) {
        self.objects.push(object.into());
    }

    /// Get the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over the members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Hittable> {
        self.objects.iter()
    }

    /// Closest hit among all members.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        let mut closest = None;
        let mut closest_so_far = ray_t.max;

        for object in &self.objects {
            if let Some(rec) = object.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = rec.t;
                closest = Some(rec);
            }
        }

        closest
    }
}

impl FromIterator<Hittable> for HittableList {
    fn from_iter<I: IntoIterator<Item = Hittable>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}
