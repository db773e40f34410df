//! Pixel buffer shared between the render worker and the display side.
//!
//! The buffer sits behind a mutex. Progress, cancellation and the
//! update-pending flag are independent atomics so none of them needs the lock.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// An `f32` stored in an `AtomicU32`.
#[derive(Debug, Default)]
pub struct AtomicProgress(AtomicU32);

impl AtomicProgress {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// A copy of the buffer taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    /// Interleaved RGB8, row-major, top row first
    pub pixels: Vec<u8>,
}

impl Snapshot {
    /// RGB triple at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    /// One row of interleaved RGB bytes.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = (self.width * 3) as usize;
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }
}

#[derive(Debug, Default)]
struct Pixels {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Output raster plus the three render signals.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pixels: Mutex<Pixels>,
    progress: AtomicProgress,
    cancel: AtomicBool,
    update_pending: AtomicBool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to `width * height` pixels and clear to black in one locked step.
    pub fn resize_and_clear(&self, width: u32, height: u32) {
        let mut pixels = self.pixels.lock();
        let len = width as usize * height as usize * 3;
        pixels.width = width;
        pixels.height = height;
        pixels.data.clear();
        pixels.data.resize(len, 0);
    }

    /// Write one pixel under the lock.
    pub fn write_pixel(&self, x: u32, y: u32, rgb: [u8; 3]) {
        let mut pixels = self.pixels.lock();
        let idx = (y as usize * pixels.width as usize + x as usize) * 3;
        pixels.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Copy the buffer out under the lock.
    pub fn snapshot(&self) -> Snapshot {
        let pixels = self.pixels.lock();
        Snapshot {
            width: pixels.width,
            height: pixels.height,
            pixels: pixels.data.clone(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let pixels = self.pixels.lock();
        (pixels.width, pixels.height)
    }

    /// Fraction of pixels written by the current render, in [0, 1].
    pub fn progress(&self) -> f32 {
        self.progress.load()
    }

    pub fn set_progress(&self, value: f32) {
        self.progress.store(value);
    }

    /// Ask the worker to stop at its next checkpoint.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Mark the buffer as worth re-displaying.
    pub fn notify_update(&self) {
        self.update_pending.store(true, Ordering::Release);
    }

    pub fn update_pending(&self) -> bool {
        self.update_pending.load(Ordering::Acquire)
    }

    /// Consume the update-pending flag; true if it was set.
    pub fn take_update(&self) -> bool {
        self.update_pending.swap(false, Ordering::AcqRel)
    }

    /// Clear all three signals before a new render starts.
    pub fn reset_signals(&self) {
        self.progress.store(0.0);
        self.cancel.store(false, Ordering::Release);
        self.update_pending.store(false, Ordering::Release);
    }
}
