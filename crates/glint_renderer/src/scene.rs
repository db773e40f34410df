//! Scene descriptions and the built-in demo world.
//!
//! A scene is a table of named materials plus a list of shapes that refer to
//! them by name. Building it shares one `Arc<Material>` per name across all
//! shapes using it.

use crate::{
    CameraConfig, Color, Dielectric, Hittable, HittableList, Lambertian, Material, Metal,
    SceneError, Sphere,
};
use glint_math::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Material parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialDesc {
    Lambertian { albedo: Color },
    Metal { albedo: Color, fuzz: f64 },
    Dielectric { ior: f64 },
}

impl MaterialDesc {
    pub fn build(&self) -> Result<Material, SceneError> {
        Ok(match *self {
            MaterialDesc::Lambertian { albedo } => Lambertian::new(albedo).into(),
            MaterialDesc::Metal { albedo, fuzz } => Metal::new(albedo, fuzz).into(),
            MaterialDesc::Dielectric { ior } => Dielectric::new(ior)?.into(),
        })
    }
}

/// Shape parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDesc {
    Sphere { center: Point3, radius: f64 },
}

/// A shape and the name of its material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDesc {
    pub shape: ShapeDesc,
    pub material: String,
}

/// A complete scene, optionally with a camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub camera: Option<CameraConfig>,
    pub materials: BTreeMap<String, MaterialDesc>,
    pub objects: Vec<ObjectDesc>,
}

impl SceneDescription {
    /// Parse a scene from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a scene from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        log::info!("Loading scene from: {:?}", path);
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Register a material under `name`.
    pub fn material(mut self, name: &str, material: MaterialDesc) -> Self {
        self.materials.insert(name.to_string(), material);
        self
    }

    /// Add a sphere using the material called `material`.
    pub fn sphere(mut self, center: Point3, radius: f64, material: &str) -> Self {
        self.objects.push(ObjectDesc {
            shape: ShapeDesc::Sphere { center, radius },
            material: material.to_string(),
        });
        self
    }

    /// Build the scene into a flat hittable list.
    pub fn build(&self) -> Result<Hittable, SceneError> {
        let materials: BTreeMap<&str, Arc<Material>> = self
            .materials
            .iter()
            .map(|(name, desc)| Ok((name.as_str(), Arc::new(desc.build()?))))
            .collect::<Result<_, SceneError>>()?;

        let mut world = HittableList::new();
        for object in &self.objects {
            let material = materials
                .get(object.material.as_str())
                .ok_or_else(|| SceneError::UnknownMaterial(object.material.clone()))?;

            match object.shape {
                ShapeDesc::Sphere { center, radius } => {
                    world.add(Sphere::new(center, radius, material.clone())?);
                }
            }
        }

        for (name, material) in &materials {
            if Arc::strong_count(material) == 1 {
                log::warn!("Material {:?} is not used by any object", name);
            }
        }

        log::info!(
            "Built scene with {} objects and {} materials",
            world.len(),
            materials.len()
        );
        Ok(world.into())
    }

    /// The default demo world: a glass sphere ringed by diffuse, metal and
    /// glass spheres on a large ground sphere.
    pub fn demo() -> Self {
        let diffuse = |r, g, b| MaterialDesc::Lambertian { albedo: Color::new(r, g, b) };
        let metal = |r, g, b, fuzz| MaterialDesc::Metal { albedo: Color::new(r, g, b), fuzz };
        let glass = |ior| MaterialDesc::Dielectric { ior };

        SceneDescription::default()
            .material("ground", diffuse(0.5, 0.5, 0.5))
            .sphere(Point3::new(0.0, -1000.0, 0.0), 1000.0, "ground")
            // Central glass sphere
            .material("glass", glass(1.5))
            .sphere(Point3::new(0.0, 1.0, 0.0), 1.0, "glass")
            // Diffuse ring on the axes
            .material("red", diffuse(0.7, 0.2, 0.2))
            .sphere(Point3::new(-5.0, 1.0, 0.0), 1.0, "red")
            .material("blue", diffuse(0.2, 0.2, 0.7))
            .sphere(Point3::new(5.0, 1.0, 0.0), 1.0, "blue")
            .material("green", diffuse(0.2, 0.7, 0.2))
            .sphere(Point3::new(0.0, 1.0, -5.0), 1.0, "green")
            .material("yellow", diffuse(0.7, 0.7, 0.2))
            .sphere(Point3::new(0.0, 1.0, 5.0), 1.0, "yellow")
            // Metals on the diagonals
            .material("gold", metal(0.8, 0.6, 0.2, 0.0))
            .sphere(Point3::new(-3.5, 1.0, -3.5), 1.0, "gold")
            .material("silver", metal(0.8, 0.8, 0.9, 0.1))
            .sphere(Point3::new(3.5, 1.0, 3.5), 1.0, "silver")
            .material("copper", metal(0.7, 0.4, 0.3, 0.2))
            .sphere(Point3::new(-3.5, 1.0, 3.5), 1.0, "copper")
            .material("chrome", metal(0.9, 0.9, 0.9, 0.0))
            .sphere(Point3::new(3.5, 1.0, -3.5), 1.0, "chrome")
            // Small spheres
            .material("purple", diffuse(0.6, 0.2, 0.6))
            .sphere(Point3::new(-2.0, 0.5, -2.0), 0.5, "purple")
            .material("orange", diffuse(0.8, 0.4, 0.1))
            .sphere(Point3::new(2.0, 0.5, 2.0), 0.5, "orange")
            .material("cyan", diffuse(0.2, 0.6, 0.6))
            .sphere(Point3::new(-2.0, 0.5, 2.0), 0.5, "cyan")
            .material("pink", diffuse(0.8, 0.4, 0.6))
            .sphere(Point3::new(2.0, 0.5, -2.0), 0.5, "pink")
            // Elevated
            .material("white", diffuse(0.9, 0.9, 0.9))
            .sphere(Point3::new(-1.0, 2.0, -1.0), 0.3, "white")
            .material("black", diffuse(0.1, 0.1, 0.1))
            .sphere(Point3::new(1.0, 2.0, 1.0), 0.3, "black")
            // More glass
            .material("glass_low", glass(1.3))
            .sphere(Point3::new(-6.0, 0.7, -2.0), 0.7, "glass_low")
            .material("glass_high", glass(1.8))
            .sphere(Point3::new(6.0, 0.7, 2.0), 0.7, "glass_high")
            // Distant background
            .material("distant_metal", metal(0.5, 0.5, 0.7, 0.3))
            .sphere(Point3::new(-10.0, 1.5, -8.0), 1.5, "distant_metal")
            .material("distant_diffuse", diffuse(0.4, 0.6, 0.4))
            .sphere(Point3::new(8.0, 1.2, -10.0), 1.2, "distant_diffuse")
    }
}
