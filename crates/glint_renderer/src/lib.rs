//! Glint renderer - recursive Monte Carlo path tracing.
//!
//! Renders a flat list of spheres with diffuse, metal and glass materials
//! into an RGB8 buffer on a single background worker. The worker reports
//! progress, honours cancellation and tells the display side when the buffer
//! is worth re-reading.

mod camera;
mod controller;
mod error;
mod frame;
mod hittable;
mod material;
mod renderer;
mod scene;
mod sphere;

pub use camera::{Camera, CameraConfig, FeatureToggles};
pub use controller::{RenderController, RenderState};
pub use error::{ConfigError, RenderError, SceneError};
pub use frame::{AtomicProgress, FrameBuffer, Snapshot};
pub use hittable::{HitRecord, Hittable, HittableList};
pub use material::{Color, Dielectric, Lambertian, Material, Metal, ScatterResult};
pub use renderer::{
    color_to_rgb, linear_to_gamma, ray_color, render_pixel, RayStats, RenderOutcome,
    RenderReport,
};
pub use scene::{MaterialDesc, ObjectDesc, SceneDescription, ShapeDesc};
pub use sphere::Sphere;

/// Re-export the math types from glint_math
pub use glint_math::{Interval, Point3, Ray, Vec3};
