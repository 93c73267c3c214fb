//! Explicit audio context handle and the device seam.
//!
//! There is no ambient global context: an [`AudioContext`] is constructed by
//! the host and cloned into every component that needs the audio clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::graph::{render_shared, SharedRenderer};
use super::lock_or_recover;
use crate::error::{DisposalError, InitializationError};

#[derive(Debug)]
struct ClockInner {
    sample_rate: u32,
    frames: AtomicU64,
}

/// Cheap-to-clone handle on the sample clock.
///
/// The clock only advances when the device renders audio, so
/// `current_time()` is the sample-accurate audio-rate time, independent of
/// the control loop.
#[derive(Clone, Debug)]
pub struct AudioContext {
    inner: Arc<ClockInner>,
}

impl AudioContext {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                sample_rate: sample_rate.max(1),
                frames: AtomicU64::new(0),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    /// Index of the next frame the device will render.
    pub fn current_frame(&self) -> u64 {
        self.inner.frames.load(Ordering::Acquire)
    }

    /// Audio clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_frame() as f64 / self.inner.sample_rate as f64
    }

    /// Nearest frame index for an absolute time in seconds (negative → 0).
    pub fn time_to_frame(&self, time_sec: f64) -> u64 {
        if !time_sec.is_finite() || time_sec <= 0.0 {
            return 0;
        }
        (time_sec * self.inner.sample_rate as f64).round() as u64
    }

    pub fn seconds_to_frames(&self, seconds: f32) -> u64 {
        (seconds.max(0.0) * self.inner.sample_rate as f32).round() as u64
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.inner.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

/// Output hardware (or a stand-in) that pulls audio from the renderer.
///
/// `start` must begin invoking the renderer from the device's own clock;
/// `stop` must guarantee the renderer is no longer called once it returns.
pub trait AudioDevice {
    fn start(&mut self, renderer: SharedRenderer) -> Result<(), InitializationError>;
    fn stop(&mut self) -> Result<(), DisposalError>;
}

#[derive(Default)]
struct OfflineState {
    renderer: Option<SharedRenderer>,
    blocked: Option<String>,
    fail_on_stop: bool,
}

/// Device that renders only when asked, for tests and headless hosts.
///
/// Clones share state, so a caller can keep one handle while the graph owns
/// another and pull audio with [`OfflineDevice::render`].
#[derive(Clone, Default)]
pub struct OfflineDevice {
    inner: Arc<Mutex<OfflineState>>,
}

impl OfflineDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses to start, as a browser does before a user gesture.
    pub fn blocked(reason: &str) -> Self {
        let device = Self::default();
        lock_or_recover(&device.inner).blocked = Some(reason.to_string());
        device
    }

    pub fn unblock(&self) {
        lock_or_recover(&self.inner).blocked = None;
    }

    /// Make the next `stop` report a failure (after it has stopped).
    pub fn fail_on_stop(&self, fail: bool) {
        lock_or_recover(&self.inner).fail_on_stop = fail;
    }

    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.inner).renderer.is_some()
    }

    /// Render `frames` mono samples. Silence (and no clock movement) when stopped.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        let renderer = lock_or_recover(&self.inner).renderer.clone();
        if let Some(renderer) = renderer {
            render_shared(&renderer, frames, |i, s| out[i] = s);
        }
        out
    }
}

impl AudioDevice for OfflineDevice {
    fn start(&mut self, renderer: SharedRenderer) -> Result<(), InitializationError> {
        let mut state = lock_or_recover(&self.inner);
        if let Some(reason) = &state.blocked {
            return Err(InitializationError::Blocked(reason.clone()));
        }
        state.renderer = Some(renderer);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DisposalError> {
        let mut state = lock_or_recover(&self.inner);
        state.renderer = None;
        if state.fail_on_stop {
            return Err(DisposalError::Device("offline device stop failure".into()));
        }
        Ok(())
    }
}
