use anyhow::{Context, Result};
use clap::Parser;
use glint_renderer::{
    Camera, CameraConfig, RenderController, RenderState, SceneDescription, Snapshot,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

mod ppm;

/// How often the consumer loop checks the frame.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Headless path tracer: renders a scene and writes a PPM.
#[derive(Parser, Debug)]
#[command(name = "glint", version, about)]
struct Args {
    /// Scene description (JSON). Renders the built-in demo scene if omitted.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, default_value = "output.ppm")]
    output: PathBuf,

    /// Image width in pixels (height follows the aspect ratio)
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    samples: Option<u32>,

    #[arg(long)]
    max_depth: Option<u32>,

    /// Seed for the render's random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long)]
    no_antialiasing: bool,

    #[arg(long)]
    no_shadows: bool,

    #[arg(long)]
    no_reflections: bool,

    #[arg(long)]
    no_refractions: bool,

    /// Cancel once this fraction of pixels (0-1) is done
    #[arg(long)]
    cancel_after: Option<f32>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the scene's camera.
    fn camera_config(&self, base: CameraConfig) -> CameraConfig {
        let mut config = base;
        if let Some(width) = self.width {
            config.image_width = width;
        }
        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        config.features.antialiasing &= !self.no_antialiasing;
        config.features.shadows &= !self.no_shadows;
        config.features.reflections &= !self.no_reflections;
        config.features.refractions &= !self.no_refractions;
        config
    }
}

/// Follow a running render until its worker exits.
///
/// Stands in for a display loop: re-reads the buffer whenever the worker
/// flags new content and cancels once progress reaches `cancel_after`.
/// Returns the final state and the buffer as the worker left it.
fn watch(controller: &mut RenderController, cancel_after: Option<f32>) -> (RenderState, Snapshot) {
    let frame = controller.frame();
    let mut refreshes = 0u32;
    while controller.is_running() {
        thread::sleep(POLL_INTERVAL);

        if frame.take_update() {
            let display = frame.snapshot();
            refreshes += 1;
            log::debug!(
                "Refreshed {}x{} display at {:.1}%",
                display.width,
                display.height,
                frame.progress() * 100.0
            );
        }

        if let Some(limit) = cancel_after {
            if frame.progress() >= limit && !frame.is_cancelled() {
                log::info!("Progress passed {:.0}%, cancelling", limit * 100.0);
                controller.cancel();
            }
        }
    }

    let state = controller.wait();
    log::debug!("{} display refreshes", refreshes);
    (state, frame.snapshot())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    log::info!("Starting Glint");

    let description = match &args.scene {
        Some(path) => SceneDescription::load(path)
            .with_context(|| format!("Failed to load scene {}", path.display()))?,
        None => SceneDescription::demo(),
    };
    let world = Arc::new(description.build().context("Failed to build scene")?);

    let config = args.camera_config(description.camera.unwrap_or_default());
    let camera = Camera::new(config).context("Invalid camera configuration")?;

    let mut controller = RenderController::new();
    let start = Instant::now();
    controller.start(camera, world, args.seed)?;

    let (state, image) = watch(&mut controller, args.cancel_after);
    log::info!("Render {:?} after {:.1}s", state, start.elapsed().as_secs_f32());

    if state == RenderState::Failed {
        anyhow::bail!("Render worker failed");
    }

    ppm::save_ppm(&image, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Image exported to {}", args.output.display());

    Ok(())
}
