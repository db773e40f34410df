//! Core path tracing renderer.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with configurable depth
//! - Feature toggles trading quality for speed
//! - Gamma correction and 8-bit quantization
//! - A cancellable, progress-reporting render loop

use crate::{Camera, Color, FeatureToggles, FrameBuffer, Hittable, Ray};
use glint_math::{Interval, Vec3};
use rand::RngCore;
use std::time::{Duration, Instant};

/// Hits closer than this are ignored to avoid shadow acne.
const MIN_HIT_DISTANCE: f64 = 0.001;

/// Raise the update flag at least this often while pixels are landing.
const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Ambient and diffuse weights of the non-recursive shading fallback.
const AMBIENT: f64 = 0.3;
const DIFFUSE: f64 = 0.7;

/// Counters collected while resolving rays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayStats {
    /// Rays tested against the scene
    pub rays: u64,
    /// Rays that hit a surface
    pub hits: u64,
    /// Successful material scatters
    pub scatters: u64,
    /// Hits absorbed by their material
    pub absorbed: u64,
}

/// How a render ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Cancelled,
}

/// Summary returned by [`Camera::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub outcome: RenderOutcome,
    pub completed_pixels: u64,
    pub total_pixels: u64,
    pub stats: RayStats,
}

/// Compute the color seen by a ray.
///
/// Recursion is bounded by `depth`; running out of depth returns black.
pub fn ray_color(
    ray: &Ray,
    depth: u32,
    world: &Hittable,
    features: &FeatureToggles,
    rng: &mut dyn RngCore,
    stats: &mut RayStats,
) -> Color {
    if depth == 0 {
        return Color::ZERO;
    }

    stats.rays += 1;

    let Some(rec) = world.hit(ray, Interval::new(MIN_HIT_DISTANCE, f64::INFINITY)) else {
        return sky_gradient(ray);
    };
    stats.hits += 1;

    if !features.shadows {
        return Color::ZERO;
    }

    let Some(result) = rec.material.scatter(ray, &rec, rng) else {
        stats.absorbed += 1;
        return Color::ZERO;
    };
    stats.scatters += 1;

    if features.recursive() {
        result.attenuation * ray_color(&result.scattered, depth - 1, world, features, rng, stats)
    } else {
        result.attenuation * local_shading(rec.normal)
    }
}

/// Ambient plus diffuse term from a fixed directional light.
fn local_shading(normal: Vec3) -> f64 {
    let light_dir = Vec3::ONE.normalize();
    let light_intensity = normal.dot(light_dir).max(0.0);
    AMBIENT + DIFFUSE * light_intensity
}

/// Compute sky gradient background.
fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f64) -> f64 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-corrected 8-bit RGB.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    const INTENSITY: Interval = Interval::new(0.000, 0.999);
    let quantize = |c: f64| (256.0 * INTENSITY.clamp(linear_to_gamma(c))) as u8;
    [quantize(color.x), quantize(color.y), quantize(color.z)]
}

/// Render a single pixel, averaging its samples.
///
/// Returns `None` if cancellation was observed before all samples finished.
pub fn render_pixel(
    camera: &Camera,
    world: &Hittable,
    x: u32,
    y: u32,
    frame: &FrameBuffer,
    rng: &mut dyn RngCore,
    stats: &mut RayStats,
) -> Option<Color> {
    let features = camera.features();
    let samples = camera.effective_samples();
    let mut pixel_color = Color::ZERO;

    for _ in 0..samples {
        if frame.is_cancelled() {
            return None;
        }
        let ray = camera.get_ray(x, y, rng);
        pixel_color += ray_color(&ray, camera.max_depth(), world, &features, rng, stats);
    }

    Some(pixel_color / samples as f64)
}

/// Decides when the render loop raises the frame's update flag.
///
/// Raises after [`UPDATE_INTERVAL`], after every 1% of the image, on the last
/// pixel, and at the end of every `max(1, height / 20)`-th row.
#[derive(Debug, Clone)]
struct UpdateThrottle {
    total_pixels: u64,
    pixel_step: u64,
    row_step: u32,
    pixels_since_update: u64,
    last_update: Instant,
    unreported: bool,
}

impl UpdateThrottle {
    fn new(width: u32, height: u32, start: Instant) -> Self {
        let total_pixels = width as u64 * height as u64;
        Self {
            total_pixels,
            pixel_step: (total_pixels / 100).max(1),
            row_step: (height / 20).max(1),
            pixels_since_update: 0,
            last_update: start,
            unreported: false,
        }
    }

    /// Record a finished pixel. Returns true when the display should re-read.
    fn pixel_done(&mut self, completed_pixels: u64, now: Instant) -> bool {
        self.pixels_since_update += 1;
        if now.duration_since(self.last_update) >= UPDATE_INTERVAL
            || self.pixels_since_update >= self.pixel_step
            || completed_pixels == self.total_pixels
        {
            self.pixels_since_update = 0;
            self.last_update = now;
            self.unreported = false;
            true
        } else {
            self.unreported = true;
            false
        }
    }

    fn row_done(&mut self, row: u32) -> bool {
        if row % self.row_step == 0 {
            self.unreported = false;
            true
        } else {
            false
        }
    }

    /// Whether pixels landed since the flag was last raised.
    fn has_unreported(&self) -> bool {
        self.unreported
    }
}

impl Camera {
    /// Render the scene into `frame`.
    ///
    /// Resizes and clears the buffer, then fills it row by row. Cancellation
    /// is polled before every row, pixel and sample; a cancelled render leaves
    /// the pixels already written untouched and never writes a partial pixel.
    ///
    /// Only one render may write to a given frame at a time; starting renders
    /// through [`crate::RenderController`] guarantees that.
    pub fn render(&self, world: &Hittable, frame: &FrameBuffer, rng: &mut dyn RngCore) -> RenderReport {
        let width = self.image_width();
        let height = self.image_height();

        frame.resize_and_clear(width, height);
        frame.set_progress(0.0);

        let total_pixels = width as u64 * height as u64;
        let mut throttle = UpdateThrottle::new(width, height, Instant::now());

        let mut completed_pixels = 0u64;
        let mut last_reported_percent = 0u64;
        let mut stats = RayStats::default();

        log::info!(
            "Rendering {}x{} with {} samples per pixel...",
            width,
            height,
            self.effective_samples()
        );

        'rows: for j in 0..height {
            if frame.is_cancelled() {
                break;
            }

            for i in 0..width {
                if frame.is_cancelled() {
                    break 'rows;
                }

                let Some(color) = render_pixel(self, world, i, j, frame, rng, &mut stats) else {
                    break 'rows;
                };
                frame.write_pixel(i, j, color_to_rgb(color));

                completed_pixels += 1;
                frame.set_progress(completed_pixels as f32 / total_pixels as f32);

                if throttle.pixel_done(completed_pixels, Instant::now()) {
                    frame.notify_update();

                    let percent = completed_pixels * 100 / total_pixels;
                    if percent >= last_reported_percent + 10 {
                        log::info!("Progress: {}%", percent);
                        last_reported_percent = percent;
                    }
                }
            }

            if throttle.row_done(j) {
                frame.notify_update();
            }
        }

        // Pixels written since the last throttled raise are still unseen
        if throttle.has_unreported() {
            frame.notify_update();
        }

        let outcome = if completed_pixels == total_pixels {
            log::info!("Render completed: {} pixels", completed_pixels);
            RenderOutcome::Completed
        } else {
            log::info!("Render stopped at {}/{} pixels", completed_pixels, total_pixels);
            RenderOutcome::Cancelled
        };
        log::debug!(
            "Traced {} rays: {} hits, {} scatters, {} absorbed",
            stats.rays,
            stats.hits,
            stats.scatters,
            stats.absorbed
        );

        RenderReport {
            outcome,
            completed_pixels,
            total_pixels,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraConfig, HittableList, Lambertian, Material, Metal, Sphere};
    use glint_math::Point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn two_sphere_world() -> Hittable {
        let ground = Arc::new(Material::from(Lambertian::new(Color::splat(0.5))));
        let red = Arc::new(Material::from(Lambertian::new(Color::new(0.7, 0.2, 0.2))));

        let mut world = HittableList::new();
        world.add(Sphere::new(Point3::new(0.0, -100.5, -1.0), 100.0, ground).unwrap());
        world.add(Sphere::new(Point3::new(0.0, 0.0, -1.0), 0.5, red).unwrap());
        world.into()
    }

    fn small_camera(width: u32) -> CameraConfig {
        CameraConfig::default()
            .with_resolution(width, 16.0 / 9.0)
            .with_position(Point3::ZERO, Point3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, 0.0, 1.0)
    }

    #[test]
    fn test_sky_gradient() {
        let up_color = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::Y));
        let down_color = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::NEG_Y));
        let horizon = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::X * 5.0));

        assert!((up_color - Color::new(0.5, 0.7, 1.0)).length() < 1e-12);
        assert!((down_color - Color::ONE).length() < 1e-12);
        assert!((horizon - Color::new(0.75, 0.85, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_miss_returns_background() {
        let world: Hittable = HittableList::new().into();
        let mut rng = StdRng::seed_from_u64(0);
        let mut stats = RayStats::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, 0.4, -1.0));

        let color = ray_color(&ray, 10, &world, &FeatureToggles::default(), &mut rng, &mut stats);
        assert_eq!(color, sky_gradient(&ray));
        assert_eq!(stats.rays, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_depth_exhaustion_is_black() {
        let world = two_sphere_world();
        let mut rng = StdRng::seed_from_u64(0);
        let mut stats = RayStats::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);

        let color = ray_color(&ray, 0, &world, &FeatureToggles::default(), &mut rng, &mut stats);
        assert_eq!(color, Color::ZERO);
        assert_eq!(stats.rays, 0);
    }

    #[test]
    fn test_shadows_disabled_hits_are_black() {
        let world = two_sphere_world();
        let mut rng = StdRng::seed_from_u64(0);
        let mut stats = RayStats::default();
        let features = FeatureToggles {
            shadows: false,
            ..FeatureToggles::default()
        };

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let color = ray_color(&ray, 10, &world, &features, &mut rng, &mut stats);
        assert_eq!(color, Color::ZERO);
        assert_eq!(stats.scatters, 0);
    }

    #[test]
    fn test_local_shading_without_recursion() {
        let world = two_sphere_world();
        let features = FeatureToggles {
            reflections: false,
            refractions: false,
            ..FeatureToggles::default()
        };

        let mut rng = StdRng::seed_from_u64(0);
        for dir in [
            Vec3::NEG_Z,
            Vec3::new(0.2, 0.2, -1.0),
            Vec3::new(-0.1, -0.3, -1.0),
            Vec3::new(0.0, -1.0, -0.2),
        ] {
            let ray = Ray::new(Vec3::ZERO, dir);
            let rec = world
                .hit(&ray, Interval::new(MIN_HIT_DISTANCE, f64::INFINITY))
                .expect("ray should hit");
            let albedo = match rec.material {
                Material::Lambertian(m) => m.albedo(),
                other => panic!("unexpected material {:?}", other),
            };
            let light = Vec3::ONE.normalize();
            let expected = albedo * (0.3 + 0.7 * rec.normal.dot(light).max(0.0));

            let mut stats = RayStats::default();
            let color = ray_color(&ray, 50, &world, &features, &mut rng, &mut stats);

            assert!((color - expected).length() < 1e-12);
            // Exactly one ray traced: no recursive scatter evaluation
            assert_eq!(stats.rays, 1);
            assert_eq!(stats.scatters, 1);
        }
    }

    #[test]
    fn test_reflections_alone_keep_recursion() {
        // Enclosed in a mirror sphere the ray bounces until depth runs out
        let mirror = Arc::new(Material::from(Metal::new(Color::ONE, 0.0)));
        let world: Hittable = Sphere::new(Point3::ZERO, 10.0, mirror).unwrap().into();
        let features = FeatureToggles {
            refractions: false,
            ..FeatureToggles::default()
        };

        let mut rng = StdRng::seed_from_u64(0);
        let mut stats = RayStats::default();
        let color = ray_color(&Ray::new(Vec3::ZERO, Vec3::X), 5, &world, &features, &mut rng, &mut stats);

        assert_eq!(color, Color::ZERO);
        assert_eq!(stats.rays, 5);
        assert_eq!(stats.scatters, 5);
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 1e-12);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 1e-12);

        let mut previous = linear_to_gamma(0.0);
        for i in 1..=100 {
            let current = linear_to_gamma(i as f64 / 100.0);
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_color_to_rgb() {
        assert_eq!(color_to_rgb(Color::ZERO), [0, 0, 0]);
        assert_eq!(color_to_rgb(Color::ONE), [255, 255, 255]);
        assert_eq!(color_to_rgb(Color::splat(4.0)), [255, 255, 255]);
        assert_eq!(color_to_rgb(Color::new(0.25, -1.0, 1.0)), [128, 0, 255]);
    }

    #[test]
    fn test_seeded_render_is_deterministic() {
        let world = two_sphere_world();
        let mut config = small_camera(20).with_quality(1, 1);
        config.features.antialiasing = false;
        let camera = Camera::new(config).unwrap();
        assert_eq!(camera.image_height(), 11);

        let render_once = || {
            let frame = FrameBuffer::new();
            let mut rng = StdRng::seed_from_u64(2024);
            let report = camera.render(&world, &frame, &mut rng);
            assert_eq!(report.outcome, RenderOutcome::Completed);
            assert_eq!(report.completed_pixels, 220);
            assert_eq!(frame.progress(), 1.0);
            assert!(frame.update_pending());
            frame.snapshot()
        };

        let first = render_once();
        let second = render_once();
        assert_eq!(first.pixels.len(), 20 * 11 * 3);
        assert_eq!(first, second);

        // Sky is lit; with one bounce of depth every surface hit is black
        assert_ne!(first.pixel(0, 0), [0, 0, 0]);
        assert_eq!(first.pixel(10, 5), [0, 0, 0]);
    }

    #[test]
    fn test_antialiased_render_is_deterministic_per_seed() {
        let world = two_sphere_world();
        let camera = Camera::new(small_camera(16).with_quality(4, 5)).unwrap();

        let render_with = |seed: u64| {
            let frame = FrameBuffer::new();
            camera.render(&world, &frame, &mut StdRng::seed_from_u64(seed));
            frame.snapshot()
        };

        assert_eq!(render_with(7), render_with(7));
    }

    #[test]
    fn test_cancel_before_start_writes_nothing() {
        let world = two_sphere_world();
        let camera = Camera::new(small_camera(32)).unwrap();
        let frame = FrameBuffer::new();
        frame.request_cancel();

        let report = camera.render(&world, &frame, &mut StdRng::seed_from_u64(1));

        assert_eq!(report.outcome, RenderOutcome::Cancelled);
        assert_eq!(report.completed_pixels, 0);
        assert_eq!(frame.progress(), 0.0);
        assert!(frame.snapshot().pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_cancel_after_first_scanline() {
        let world = Arc::new(two_sphere_world());
        let camera = Camera::new(small_camera(400).with_quality(50, 20)).unwrap();
        let width = camera.image_width() as u64;
        let frame = Arc::new(FrameBuffer::new());

        let worker = {
            let world = world.clone();
            let frame = frame.clone();
            let camera = camera.clone();
            std::thread::spawn(move || {
                camera.render(&world, &frame, &mut StdRng::seed_from_u64(3))
            })
        };

        let first_row = width as f32 / (width * camera.image_height() as u64) as f32;
        while frame.progress() < first_row && !worker.is_finished() {
            std::thread::yield_now();
        }
        frame.request_cancel();
        let report = worker.join().unwrap();

        assert_eq!(report.outcome, RenderOutcome::Cancelled);
        assert!(report.completed_pixels >= width);
        assert!(report.completed_pixels < report.total_pixels);
        assert!(frame.progress() < 1.0);
        assert_eq!(
            frame.progress(),
            report.completed_pixels as f32 / report.total_pixels as f32
        );

        let snapshot = frame.snapshot();
        // The first row is sky and fully written
        for x in 0..camera.image_width() {
            assert_ne!(snapshot.pixel(x, 0), [0, 0, 0]);
        }
        // Nothing past the last completed pixel was touched
        let written = report.completed_pixels as usize * 3;
        assert!(snapshot.pixels[written..].iter().all(|&b| b == 0));

        // No further writes once render has returned
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(frame.snapshot(), snapshot);
    }

    #[test]
    fn test_throttle_raises_every_percent() {
        // 1000 pixels: one raise per 10
        let start = Instant::now();
        let mut throttle = UpdateThrottle::new(100, 10, start);

        let raised: Vec<u64> = (1..=35).filter(|&k| throttle.pixel_done(k, start)).collect();
        assert_eq!(raised, vec![10, 20, 30]);
    }

    #[test]
    fn test_throttle_raises_after_interval() {
        let start = Instant::now();
        let mut throttle = UpdateThrottle::new(1000, 1000, start);

        assert!(!throttle.pixel_done(1, start + Duration::from_millis(50)));
        assert!(throttle.pixel_done(2, start + UPDATE_INTERVAL));
        // Interval restarts from the last raise
        assert!(!throttle.pixel_done(3, start + Duration::from_millis(150)));
        assert!(throttle.pixel_done(4, start + Duration::from_millis(200)));
    }

    #[test]
    fn test_throttle_raises_on_last_pixel() {
        let start = Instant::now();
        let mut throttle = UpdateThrottle::new(100, 10, start);

        assert!(!throttle.pixel_done(1, start));
        assert!(throttle.has_unreported());
        assert!(throttle.pixel_done(1000, start));
        assert!(!throttle.has_unreported());
    }

    #[test]
    fn test_throttle_row_cadence() {
        let start = Instant::now();
        let mut throttle = UpdateThrottle::new(10, 100, start);
        let rows: Vec<u32> = (0..12).filter(|&j| throttle.row_done(j)).collect();
        assert_eq!(rows, vec![0, 5, 10]);

        // Short images raise after every row
        let mut short = UpdateThrottle::new(10, 7, start);
        assert!((0..7).all(|j| short.row_done(j)));

        // A row raise covers pixels that did not trigger on their own
        assert!(!throttle.pixel_done(1, start));
        assert!(throttle.has_unreported());
        assert!(throttle.row_done(15));
        assert!(!throttle.has_unreported());
    }
}
