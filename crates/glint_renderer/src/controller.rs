//! Background render worker.
//!
//! Runs at most one render at a time on a dedicated thread. Starting a new
//! render cancels and joins the previous one first.

use crate::{Camera, FrameBuffer, Hittable, RenderError, RenderOutcome, RenderReport};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lifecycle of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Running,
    Completed,
    Cancelled,
    /// The worker panicked
    Failed,
}

impl RenderState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RenderState::Completed | RenderState::Cancelled | RenderState::Failed
        )
    }
}

/// Owns the render worker and the frame it writes into.
pub struct RenderController {
    frame: Arc<FrameBuffer>,
    state: Arc<Mutex<RenderState>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RenderController {
    pub fn new() -> Self {
        Self::with_frame(Arc::new(FrameBuffer::new()))
    }

    /// Use an existing frame, e.g. one a display surface already holds.
    pub fn with_frame(frame: Arc<FrameBuffer>) -> Self {
        Self {
            frame,
            state: Arc::new(Mutex::new(RenderState::Idle)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// The frame the worker renders into.
    pub fn frame(&self) -> Arc<FrameBuffer> {
        self.frame.clone()
    }

    pub fn state(&self) -> RenderState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> f32 {
        self.frame.progress()
    }

    /// Start rendering `world` on a fresh worker.
    ///
    /// Any render in flight is cancelled and joined before the new one begins.
    pub fn start(&mut self, camera: Camera, world: Arc<Hittable>, seed: u64) -> Result<(), RenderError> {
        log::info!(
            "Starting render: {}x{} with {} samples (seed {})",
            camera.image_width(),
            camera.image_height(),
            camera.effective_samples(),
            seed
        );

        self.spawn(move |frame| {
            let mut rng = StdRng::seed_from_u64(seed);
            camera.render(&world, frame, &mut rng)
        })
    }

    /// Run `render` on a new worker thread and record how it ended.
    ///
    /// A panic inside `render` leaves the controller `Failed` and ready for
    /// the next start.
    fn spawn<F>(&mut self, render: F) -> Result<(), RenderError>
    where
        F: FnOnce(&FrameBuffer) -> RenderReport + Send + 'static,
    {
        if self.worker.is_some() {
            log::info!("Stopping previous render before restart");
            self.cancel();
            self.join();
        }

        self.frame.reset_signals();
        *self.state.lock() = RenderState::Running;
        self.running.store(true, Ordering::Release);

        let frame = self.frame.clone();
        let state = self.state.clone();
        let running = self.running.clone();

        let spawned = thread::Builder::new()
            .name("glint-render".into())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| render(&frame)));

                let final_state = match result {
                    Ok(report) => match report.outcome {
                        RenderOutcome::Completed => {
                            frame.set_progress(1.0);
                            frame.notify_update();
                            RenderState::Completed
                        }
                        RenderOutcome::Cancelled => {
                            log::info!("Render stopped by user");
                            RenderState::Cancelled
                        }
                    },
                    Err(payload) => {
                        log::error!("Render error: {}", panic_message(payload.as_ref()));
                        RenderState::Failed
                    }
                };

                *state.lock() = final_state;
                running.store(false, Ordering::Release);
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                *self.state.lock() = RenderState::Failed;
                self.running.store(false, Ordering::Release);
                Err(RenderError::Spawn(err))
            }
        }
    }

    /// Signal the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        if self.is_running() {
            log::debug!("Cancelling render");
        }
        self.frame.request_cancel();
    }

    /// Block until the current worker exits and return the final state.
    pub fn wait(&mut self) -> RenderState {
        self.join();
        self.state()
    }

    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            // Panics are caught inside the worker, so join only fails if the
            // bookkeeping after catch_unwind itself panicked.
            if handle.join().is_err() {
                *self.state.lock() = RenderState::Failed;
                self.running.store(false, Ordering::Release);
            }
        }
    }
}

impl Default for RenderController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderController {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
