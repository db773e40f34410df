//! Error types for configuration, scene construction and worker startup.

use thiserror::Error;

/// Rejected camera configuration.
///
/// Raised by [`crate::Camera::new`] and [`crate::Camera::configure`] so a bad
/// value never reaches the render loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Image width must be at least 1 pixel")]
    ZeroImageWidth,

    #[error("Aspect ratio must be positive and finite, got {0}")]
    InvalidAspectRatio(f64),

    #[error("Image of {width}x{height} exceeds the {max} pixel limit")]
    ImageTooLarge { width: u32, height: u64, max: u64 },

    #[error("Samples per pixel must be at least 1")]
    ZeroSamples,

    #[error("Max depth must be at least 1")]
    ZeroMaxDepth,

    #[error("Vertical field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f64),

    #[error("Focus distance must be positive and finite, got {0}")]
    InvalidFocusDistance(f64),

    #[error("Defocus angle must be finite, got {0}")]
    InvalidDefocusAngle(f64),

    #[error("look_from and look_at are the same point")]
    DegenerateView,

    #[error("Up vector is zero or parallel to the view direction")]
    DegenerateUp,
}

/// Errors that can occur while loading or building a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sphere radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("Index of refraction must be positive and finite, got {0}")]
    InvalidIor(f64),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Invalid camera in scene: {0}")]
    Camera(#[from] ConfigError),
}

/// Errors raised when starting a background render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to spawn render worker: {0}")]
    Spawn(#[from] std::io::Error),
}
