//! Camera configuration and ray generation.

use crate::{ConfigError, Ray};
use glint_math::random::{random_in_unit_disk, sample_square};
use glint_math::{Point3, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Largest frame, in pixels, a configuration may ask for (768 MiB of RGB8).
pub const MAX_PIXELS: u64 = 1 << 28;

/// Quality/performance switches for the shading model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Jitter samples inside each pixel and take `samples_per_pixel` of them
    pub antialiasing: bool,
    /// Evaluate material scattering at all (off renders every hit black)
    pub shadows: bool,
    pub reflections: bool,
    pub refractions: bool,
}

impl FeatureToggles {
    /// Whether scattered rays are traced recursively.
    ///
    /// With both reflections and refractions off, hits fall back to a fixed
    /// directional-light term instead.
    pub fn recursive(&self) -> bool {
        self.reflections || self.refractions
    }
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            antialiasing: true,
            shadows: true,
            reflections: true,
            refractions: true,
        }
    }
}

/// User-facing camera and render settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    // Image settings
    pub aspect_ratio: f64,
    pub image_width: u32,
    pub samples_per_pixel: u32,
    pub max_depth: u32,

    // Camera positioning
    pub look_from: Point3,
    pub look_at: Point3,
    pub vup: Vec3,

    // Lens settings
    pub vfov: f64,          // Vertical field of view in degrees
    pub defocus_angle: f64, // Variation angle of rays through each pixel
    pub focus_dist: f64,    // Distance from camera to plane of perfect focus

    pub features: FeatureToggles,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: 16.0 / 9.0,
            image_width: 400,
            samples_per_pixel: 10,
            max_depth: 10,
            look_from: Point3::new(13.0, 2.0, 3.0),
            look_at: Point3::ZERO,
            vup: Vec3::Y,
            vfov: 20.0,
            defocus_angle: 0.6,
            focus_dist: 10.0,
            features: FeatureToggles::default(),
        }
    }
}

impl CameraConfig {
    /// Set image width and aspect ratio (height is derived).
    pub fn with_resolution(mut self, width: u32, aspect_ratio: f64) -> Self {
        self.image_width = width;
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set quality settings.
    pub fn with_quality(mut self, samples: u32, max_depth: u32) -> Self {
        self.samples_per_pixel = samples;
        self.max_depth = max_depth;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Point3, look_at: Point3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f64, defocus_angle: f64, focus_dist: f64) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self
    }

    pub fn with_features(mut self, features: FeatureToggles) -> Self {
        self.features = features;
        self
    }

    /// Image height for this width and aspect ratio, never below 1.
    ///
    /// Only meaningful for a configuration that passes [`Self::validate`],
    /// which rejects heights that do not fit the pixel budget.
    pub fn image_height(&self) -> u32 {
        self.derived_height().min(u32::MAX as f64) as u32
    }

    fn derived_height(&self) -> f64 {
        (self.image_width as f64 / self.aspect_ratio).floor().max(1.0)
    }

    /// Check every value the viewport derivation depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_width == 0 {
            return Err(ConfigError::ZeroImageWidth);
        }
        if !(self.aspect_ratio > 0.0 && self.aspect_ratio.is_finite()) {
            return Err(ConfigError::InvalidAspectRatio(self.aspect_ratio));
        }
        let height = self.derived_height();
        if self.image_width as f64 * height > MAX_PIXELS as f64 {
            return Err(ConfigError::ImageTooLarge {
                width: self.image_width,
                height: height as u64,
                max: MAX_PIXELS,
            });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(ConfigError::InvalidFov(self.vfov));
        }
        if !(self.focus_dist > 0.0 && self.focus_dist.is_finite()) {
            return Err(ConfigError::InvalidFocusDistance(self.focus_dist));
        }
        if !self.defocus_angle.is_finite() {
            return Err(ConfigError::InvalidDefocusAngle(self.defocus_angle));
        }

        let view = self.look_from - self.look_at;
        if view.length_squared() == 0.0 || !view.is_finite() {
            return Err(ConfigError::DegenerateView);
        }
        if !self.vup.is_finite()
            || self.vup.normalize_or_zero().cross(view.normalize()).length_squared() < 1e-12
        {
            return Err(ConfigError::DegenerateUp);
        }

        Ok(())
    }
}

/// Camera for generating rays into the scene.
///
/// Holds a validated [`CameraConfig`] and the viewport geometry derived from
/// it. The geometry is recomputed on every [`Camera::configure`].
#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,

    // Cached computed values (set by initialize())
    image_height: u32,
    center: Point3,
    pixel00_loc: Point3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    defocus_disk_u: Vec3,
    defocus_disk_v: Vec3,
}

impl Camera {
    /// Create a camera from a configuration.
    pub fn new(config: CameraConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut camera = Self {
            config,
            image_height: 1,
            center: Point3::ZERO,
            pixel00_loc: Point3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            defocus_disk_u: Vec3::ZERO,
            defocus_disk_v: Vec3::ZERO,
        };
        camera.initialize();
        Ok(camera)
    }

    /// Replace the configuration and rederive the viewport.
    ///
    /// On error the previous configuration stays in effect.
    pub fn configure(&mut self, config: CameraConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.initialize();
        Ok(())
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn features(&self) -> FeatureToggles {
        self.config.features
    }

    pub fn image_width(&self) -> u32 {
        self.config.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    /// Samples actually taken per pixel: one when antialiasing is off.
    pub fn effective_samples(&self) -> u32 {
        if self.config.features.antialiasing {
            self.config.samples_per_pixel
        } else {
            1
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    fn initialize(&mut self) {
        let config = self.config;
        self.image_height = config.image_height();
        self.center = config.look_from;

        // Calculate viewport dimensions
        let theta = config.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * config.focus_dist;
        let viewport_width =
            viewport_height * (config.image_width as f64 / self.image_height as f64);

        // Calculate camera basis vectors
        self.w = (config.look_from - config.look_at).normalize();
        self.u = config.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        // Calculate viewport vectors
        let viewport_u = viewport_width * self.u;
        let viewport_v = -viewport_height * self.v;

        // Calculate pixel delta vectors
        self.pixel_delta_u = viewport_u / config.image_width as f64;
        self.pixel_delta_v = viewport_v / self.image_height as f64;

        // Calculate upper left pixel location
        let viewport_upper_left =
            self.center - config.focus_dist * self.w - viewport_u / 2.0 - viewport_v / 2.0;

        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);

        // Calculate defocus disk basis vectors
        let defocus_radius = config.focus_dist * (config.defocus_angle / 2.0).to_radians().tan();
        self.defocus_disk_u = self.u * defocus_radius;
        self.defocus_disk_v = self.v * defocus_radius;
    }

    /// Generate a ray for pixel (i, j).
    ///
    /// Jittered inside the pixel when antialiasing is on, through the pixel
    /// center otherwise. Originates on the defocus disk when lens blur is on.
    pub fn get_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let offset = if self.config.features.antialiasing {
            sample_square(rng)
        } else {
            Vec3::ZERO
        };

        let pixel_sample = self.pixel00_loc
            + ((i as f64) + offset.x) * self.pixel_delta_u
            + ((j as f64) + offset.y) * self.pixel_delta_v;

        let ray_origin = if self.config.defocus_angle <= 0.0 {
            self.center
        } else {
            self.defocus_disk_sample(rng)
        };

        Ray::new(ray_origin, pixel_sample - ray_origin)
    }

    /// Sample a point on the defocus disk.
    fn defocus_disk_sample(&self, rng: &mut dyn RngCore) -> Point3 {
        let p = random_in_unit_disk(rng);
        self.center + p.x * self.defocus_disk_u + p.y * self.defocus_disk_v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pinhole(width: u32, aspect: f64) -> CameraConfig {
        CameraConfig::default()
            .with_resolution(width, aspect)
            .with_position(Point3::ZERO, Point3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, 0.0, 1.0)
    }

    #[test]
    fn test_camera_initialize() {
        let camera = Camera::new(pinhole(800, 4.0 / 3.0)).unwrap();

        assert_eq!(camera.image_height(), 600);
        assert_eq!(camera.center, Point3::ZERO);
        assert!((camera.w - Vec3::Z).length() < 1e-12);
        assert!((camera.u - Vec3::X).length() < 1e-12);
        assert!((camera.v - Vec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_viewport_geometry() {
        // vfov 90 at focus 1: viewport is 2 units tall
        let camera = Camera::new(pinhole(200, 2.0)).unwrap();

        assert_eq!(camera.image_height(), 100);
        assert!((camera.pixel_delta_u - Vec3::new(0.02, 0.0, 0.0)).length() < 1e-12);
        assert!((camera.pixel_delta_v - Vec3::new(0.0, -0.02, 0.0)).length() < 1e-12);
        // Half a pixel in from the upper-left corner (-2, 1, -1)
        assert!((camera.pixel00_loc - Point3::new(-1.99, 0.99, -1.0)).length() < 1e-12);
    }

    #[test]
    fn test_image_height_floors_to_one() {
        let camera = Camera::new(pinhole(10, 100.0)).unwrap();
        assert_eq!(camera.image_height(), 1);

        assert_eq!(pinhole(400, 16.0 / 9.0).image_height(), 225);
    }

    #[test]
    fn test_pinhole_ray_without_antialiasing() {
        let mut config = pinhole(100, 1.0);
        config.features.antialiasing = false;
        let camera = Camera::new(config).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let a = camera.get_ray(50, 50, &mut rng);
        let b = camera.get_ray(50, 50, &mut rng);

        // Deterministic: through the pixel center from the camera center
        assert_eq!(a, b);
        assert_eq!(a.origin(), Point3::ZERO);
        assert!(a.direction().z < 0.0);
    }

    #[test]
    fn test_antialiased_rays_stay_in_pixel() {
        let camera = Camera::new(pinhole(100, 1.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let center = camera.pixel00_loc + 10.0 * camera.pixel_delta_u + 20.0 * camera.pixel_delta_v;
        for _ in 0..100 {
            let ray = camera.get_ray(10, 20, &mut rng);
            let offset = ray.at(1.0) - center;
            assert!(offset.x.abs() <= 0.5 * camera.pixel_delta_u.x.abs() + 1e-12);
            assert!(offset.y.abs() <= 0.5 * camera.pixel_delta_v.y.abs() + 1e-12);
        }
    }

    #[test]
    fn test_defocus_rays_start_on_disk() {
        let config = pinhole(100, 1.0).with_lens(90.0, 10.0, 2.0);
        let camera = Camera::new(config).unwrap();
        let radius = 2.0 * (5.0f64).to_radians().tan();

        let mut rng = StdRng::seed_from_u64(1);
        let mut moved = false;
        for _ in 0..100 {
            let ray = camera.get_ray(50, 50, &mut rng);
            assert!(ray.origin().length() <= radius + 1e-12);
            assert_eq!(ray.origin().z, 0.0);
            moved |= ray.origin() != Point3::ZERO;
        }
        assert!(moved);
    }

    #[test]
    fn test_rejects_degenerate_config() {
        let base = pinhole(100, 1.0);

        assert_eq!(
            Camera::new(base.with_resolution(0, 1.0)).unwrap_err(),
            ConfigError::ZeroImageWidth
        );
        assert_eq!(
            Camera::new(base.with_resolution(100, 0.0)).unwrap_err(),
            ConfigError::InvalidAspectRatio(0.0)
        );
        assert_eq!(
            Camera::new(base.with_quality(0, 10)).unwrap_err(),
            ConfigError::ZeroSamples
        );
        assert_eq!(
            Camera::new(base.with_quality(10, 0)).unwrap_err(),
            ConfigError::ZeroMaxDepth
        );
        assert_eq!(
            Camera::new(base.with_lens(180.0, 0.0, 1.0)).unwrap_err(),
            ConfigError::InvalidFov(180.0)
        );
        assert_eq!(
            Camera::new(base.with_lens(90.0, 0.0, 0.0)).unwrap_err(),
            ConfigError::InvalidFocusDistance(0.0)
        );
        assert_eq!(
            Camera::new(base.with_position(Point3::ONE, Point3::ONE, Vec3::Y)).unwrap_err(),
            ConfigError::DegenerateView
        );
        assert_eq!(
            Camera::new(base.with_position(Point3::ZERO, Point3::new(0.0, -5.0, 0.0), Vec3::Y))
                .unwrap_err(),
            ConfigError::DegenerateUp
        );
    }

    #[test]
    fn test_rejects_oversized_image() {
        // A tiny aspect ratio would otherwise derive a height of u32::MAX
        let err = Camera::new(pinhole(400, 1e-12)).unwrap_err();
        assert!(matches!(err, ConfigError::ImageTooLarge { width: 400, .. }));

        let err = Camera::new(pinhole(u32::MAX, 1.0)).unwrap_err();
        assert!(matches!(err, ConfigError::ImageTooLarge { .. }));

        // Exactly at the limit is fine
        let config = pinhole(1 << 14, 1.0);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.image_height(), 1 << 14);
    }

    #[test]
    fn test_short_view_vector_is_valid() {
        let config = pinhole(10, 1.0).with_position(
            Point3::ZERO,
            Point3::new(1e-7, 0.0, 0.0),
            Vec3::Y,
        );
        let camera = Camera::new(config).unwrap();
        assert!((camera.w - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-12);
        assert!(camera.u.is_finite());
    }

    #[test]
    fn test_rejects_non_finite_up() {
        for vup in [Vec3::new(f64::NAN, 1.0, 0.0), Vec3::new(0.0, f64::INFINITY, 0.0)] {
            let config = pinhole(10, 1.0).with_position(Point3::ZERO, Point3::NEG_Z, vup);
            assert_eq!(Camera::new(config).unwrap_err(), ConfigError::DegenerateUp);
        }
    }

    #[test]
    fn test_configure_rederives_geometry() {
        let mut camera = Camera::new(pinhole(100, 1.0)).unwrap();
        camera.configure(pinhole(300, 3.0)).unwrap();

        assert_eq!(camera.image_width(), 300);
        assert_eq!(camera.image_height(), 100);

        // A rejected configuration leaves the camera untouched
        assert!(camera.configure(pinhole(0, 1.0)).is_err());
        assert_eq!(camera.image_width(), 300);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: CameraConfig =
            serde_json::from_str(r#"{ "image_width": 64, "features": { "shadows": false } }"#).unwrap();

        assert_eq!(config.image_width, 64);
        assert_eq!(config.samples_per_pixel, CameraConfig::default().samples_per_pixel);
        assert!(!config.features.shadows);
        assert!(config.features.antialiasing);
    }
}
