// Re-export glam for convenience
pub use glam;

/// Double-precision vector used for points, directions and linear colors.
pub type Vec3 = glam::DVec3;
/// A position in world space.
pub type Point3 = glam::DVec3;

// Glint math types
mod interval;
mod ray;
mod vector;
pub mod random;

pub use interval::Interval;
pub use ray::Ray;
pub use vector::{near_zero, reflect, refract};
