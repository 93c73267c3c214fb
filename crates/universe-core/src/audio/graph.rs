//! The synthesis graph: voice pool → filter → reverb → delay → gain → destination.
//!
//! Control-side code talks to [`AudioSynthesisGraph`]; the device callback
//! talks to the [`Renderer`] behind a shared mutex. The control side only
//! takes that lock briefly to copy scalars or arm a voice.

use std::sync::{Arc, Mutex};

use super::analyzer::AnalyserTap;
use super::context::{AudioContext, AudioDevice};
use super::lock_or_recover;
use super::nodes::{AudioNode, BiquadFilter, Destination, FeedbackDelay, MasterGain, Reverb, Voice};
use super::topology::Topology;
use crate::constants::*;
use crate::error::{ConfigError, DisposalError, InitializationError};
use crate::mapping::{AudioParameterValues, AudioTarget};
use crate::music::{NoteEvent, Waveform};

/// Static configuration for the graph, validated once by `UniverseConfig`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioConfig {
    pub voices: usize,
    pub waveform: Waveform,
    pub attack_sec: f32,
    pub release_sec: f32,
    pub master_gain: f32,
    pub reverb_decay: f32,
    pub max_delay_sec: f32,
    pub fft_size: usize,
    pub smoothing_sec: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            voices: DEFAULT_VOICE_COUNT,
            waveform: Waveform::Triangle,
            attack_sec: DEFAULT_ATTACK_SEC,
            release_sec: DEFAULT_RELEASE_SEC,
            master_gain: DEFAULT_MASTER_GAIN,
            reverb_decay: DEFAULT_REVERB_DECAY,
            max_delay_sec: DEFAULT_MAX_DELAY_SEC,
            fft_size: DEFAULT_FFT_SIZE,
            smoothing_sec: DEFAULT_SMOOTHING_SEC,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(ConfigError::InvalidFftSize(self.fft_size));
        }
        let values = [
            ("attack_sec", self.attack_sec),
            ("release_sec", self.release_sec),
            ("master_gain", self.master_gain),
            ("reverb_decay", self.reverb_decay),
            ("max_delay_sec", self.max_delay_sec),
            ("smoothing_sec", self.smoothing_sec),
        ];
        for (name, v) in values {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::InvalidAudioValue(name));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphState {
    Uninitialized,
    Initialized,
    Disposed,
}

pub type SharedRenderer = Arc<Mutex<Renderer>>;

/// Audio-thread half of the graph. Owns every node.
pub struct Renderer {
    ctx: AudioContext,
    voices: Vec<Voice>,
    filter: BiquadFilter,
    reverb: Reverb,
    delay: FeedbackDelay,
    gain: MasterGain,
    destination: Destination,
    tap: AnalyserTap,
    released: bool,
}

impl Renderer {
    fn new(ctx: &AudioContext, config: &AudioConfig, tap: AnalyserTap) -> Self {
        let sr = ctx.sample_rate() as f32;
        let smoothing = config.smoothing_sec;
        Self {
            ctx: ctx.clone(),
            voices: (0..config.voices)
                .map(|i| Voice::new(i, config.waveform, sr, config.attack_sec, config.release_sec))
                .collect(),
            filter: BiquadFilter::new(sr, smoothing),
            reverb: Reverb::new(sr, config.reverb_decay, smoothing),
            delay: FeedbackDelay::new(sr, config.max_delay_sec, smoothing),
            gain: MasterGain::new(config.master_gain, smoothing, sr),
            destination: Destination::default(),
            tap,
            released: false,
        }
    }

    /// Render `frames` mono samples, handing each to `write(frame_index, sample)`,
    /// then advance the context clock.
    pub fn render_frames(&mut self, frames: usize, mut write: impl FnMut(usize, f32)) {
        if self.released {
            for i in 0..frames {
                write(i, 0.0);
            }
            return;
        }
        let start = self.ctx.current_frame();
        let mut tap = lock_or_recover(self.tap.ring());
        for i in 0..frames {
            let frame = start + i as u64;
            let mut s = 0.0;
            for voice in &mut self.voices {
                s += voice.process(frame);
            }
            s = self.filter.process(s);
            s = self.reverb.process(s);
            s = self.delay.process(s);
            s = self.gain.process(s);
            tap.push(s);
            write(i, s);
        }
        drop(tap);
        self.ctx.advance(frames as u64);
    }

    fn apply(&mut self, values: &AudioParameterValues) {
        for (target, value) in values.iter() {
            match target {
                AudioTarget::Frequency => {} // consumed control-side by the sequencer
                AudioTarget::FilterCutoff => self.filter.cutoff_mut().set_target(value),
                AudioTarget::FilterResonance => self.filter.q_mut().set_target(value),
                AudioTarget::ReverbMix => self.reverb.mix_mut().set_target(value),
                AudioTarget::DelayFeedback => self.delay.feedback_mut().set_target(value),
                AudioTarget::DelayTime => self.delay.time_mut().set_target(value),
                AudioTarget::MasterGain => self.gain.gain_mut().set_target(value),
            }
        }
    }

    fn snap_parameters(&mut self) {
        self.filter.snap();
        self.reverb.mix_mut().snap();
        self.delay.time_mut().snap();
        self.delay.feedback_mut().snap();
        self.gain.gain_mut().snap();
    }

    /// Arm a voice: an idle one if available, otherwise steal the earliest started.
    fn schedule(&mut self, start_frame: u64, hold_frames: u64, frequency_hz: f32, velocity: f32) -> bool {
        let idx = self
            .voices
            .iter()
            .position(|v| v.is_idle())
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.start_frame().unwrap_or(0))
                    .map(|(i, _)| i)
            });
        match idx {
            Some(i) => {
                self.voices[i].schedule(start_frame, hold_frames, frequency_hz, velocity);
                true
            }
            None => false,
        }
    }

    fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_idle()).count()
    }

    fn cancel_all(&mut self) {
        for voice in &mut self.voices {
            voice.cancel();
        }
    }

    /// Release every node, continuing past individual failures.
    fn release_all(&mut self) -> Vec<DisposalError> {
        let mut failures = Vec::new();
        let mut nodes: Vec<&mut dyn AudioNode> = Vec::with_capacity(self.voices.len() + 5);
        for voice in &mut self.voices {
            nodes.push(voice);
        }
        nodes.push(&mut self.filter);
        nodes.push(&mut self.reverb);
        nodes.push(&mut self.delay);
        nodes.push(&mut self.gain);
        nodes.push(&mut self.destination);
        for node in nodes {
            if let Err(e) = node.release() {
                log::error!("[audio] {e}");
                failures.push(e);
            }
        }
        self.released = true;
        failures
    }
}

/// Lock `shared` and render `frames` samples into `write`.
///
/// Entry point for device callbacks.
pub fn render_shared(shared: &SharedRenderer, frames: usize, write: impl FnMut(usize, f32)) {
    lock_or_recover(shared).render_frames(frames, write);
}

/// Control-side owner of the synthesis graph and its lifecycle.
pub struct AudioSynthesisGraph {
    ctx: AudioContext,
    device: Box<dyn AudioDevice>,
    config: AudioConfig,
    state: GraphState,
    renderer: Option<SharedRenderer>,
    topology: Option<Topology>,
    tap: AnalyserTap,
    applied: AudioParameterValues,
}

impl AudioSynthesisGraph {
    pub fn new(ctx: AudioContext, device: Box<dyn AudioDevice>, config: AudioConfig) -> Self {
        let tap = AnalyserTap::new(config.fft_size);
        Self {
            ctx,
            device,
            config,
            state: GraphState::Uninitialized,
            renderer: None,
            topology: None,
            tap,
            applied: AudioParameterValues::default(),
        }
    }

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == GraphState::Initialized
    }

    /// Handle on the post-gain signal for analysis. Read-only.
    pub fn analyser_tap(&self) -> AnalyserTap {
        self.tap.clone()
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Number of live nodes (0 unless initialized).
    pub fn node_count(&self) -> usize {
        self.topology.as_ref().map_or(0, Topology::len)
    }

    /// Base pitch the sequencer transposes from.
    pub fn base_frequency(&self) -> f32 {
        self.applied
            .get(AudioTarget::Frequency)
            .unwrap_or(DEFAULT_BASE_FREQUENCY_HZ)
    }

    pub fn applied_parameters(&self) -> AudioParameterValues {
        self.applied
    }

    pub fn active_voices(&self) -> usize {
        match &self.renderer {
            Some(r) => lock_or_recover(r).active_voices(),
            None => 0,
        }
    }

    /// Build the nodes, validate the wiring and start the device.
    ///
    /// On failure the graph stays `Uninitialized` and the call can be retried.
    pub fn initialize(&mut self) -> Result<(), InitializationError> {
        match self.state {
            GraphState::Disposed => return Err(InitializationError::Disposed),
            GraphState::Initialized => return Ok(()),
            GraphState::Uninitialized => {}
        }

        let topology = Topology::synth_chain(self.config.voices);
        topology.validate()?;

        let mut renderer = Renderer::new(&self.ctx, &self.config, self.tap.clone());
        renderer.apply(&self.applied);
        renderer.snap_parameters();
        let renderer = Arc::new(Mutex::new(renderer));

        if let Err(e) = self.device.start(Arc::clone(&renderer)) {
            log::warn!("[audio] initialization failed: {e}");
            return Err(e);
        }

        log::info!(
            "[audio] graph initialized: {} nodes, {} voices @ {} Hz",
            topology.len(),
            self.config.voices,
            self.ctx.sample_rate()
        );
        self.renderer = Some(renderer);
        self.topology = Some(topology);
        self.state = GraphState::Initialized;
        Ok(())
    }

    /// Push mapped values to the live nodes.
    ///
    /// Values are remembered even before initialization so the first
    /// `initialize` starts from them. Returns whether live nodes were updated.
    pub fn apply_parameters(&mut self, values: &AudioParameterValues) -> bool {
        for (target, value) in values.iter() {
            self.applied.set(target, value);
        }
        match &self.renderer {
            Some(r) if self.state == GraphState::Initialized => {
                lock_or_recover(r).apply(values);
                true
            }
            _ => false,
        }
    }

    /// Schedule a voice attack at `event.start_time_sec` and its release
    /// `duration_sec` later, on the audio clock.
    ///
    /// Events already in the past start on the next rendered frame. Returns
    /// false when the graph is not initialized or the event is malformed.
    pub fn trigger_note(&mut self, event: &NoteEvent) -> bool {
        let Some(renderer) = &self.renderer else {
            log::debug!("[audio] dropping note: graph not initialized");
            return false;
        };
        if !event.frequency_hz.is_finite()
            || event.frequency_hz <= 0.0
            || !event.velocity.is_finite()
            || !event.duration_sec.is_finite()
        {
            log::warn!("[audio] dropping malformed note {event:?}");
            return false;
        }
        let start = self
            .ctx
            .time_to_frame(event.start_time_sec)
            .max(self.ctx.current_frame());
        let hold = self.ctx.seconds_to_frames(event.duration_sec);
        lock_or_recover(renderer).schedule(start, hold, event.frequency_hz, event.velocity)
    }

    /// Stop the device, cancel scheduled notes and release every node.
    ///
    /// Individual failures are logged and returned; they never stop the rest
    /// of the disposal. Calling it again is a no-op.
    pub fn dispose(&mut self) -> Vec<DisposalError> {
        let mut failures = Vec::new();
        match self.state {
            GraphState::Disposed => return failures,
            GraphState::Uninitialized => {
                self.state = GraphState::Disposed;
                return failures;
            }
            GraphState::Initialized => {}
        }

        if let Err(e) = self.device.stop() {
            log::error!("[audio] {e}");
            failures.push(e);
        }
        if let Some(renderer) = self.renderer.take() {
            let mut r = lock_or_recover(&renderer);
            r.cancel_all();
            failures.extend(r.release_all());
        }
        self.tap.clear();
        self.topology = None;
        self.state = GraphState::Disposed;
        log::info!("[audio] graph disposed ({} failures)", failures.len());
        failures
    }
}

impl Drop for AudioSynthesisGraph {
    fn drop(&mut self) {
        self.dispose();
    }
}
