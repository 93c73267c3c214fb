//! Audio-processing nodes owned by the synthesis graph.
//!
//! Every node preallocates its buffers at construction; nothing in a
//! `process` call allocates.

use std::f32::consts::{PI, TAU};

use crate::constants::*;
use crate::error::DisposalError;
use crate::music::Waveform;

/// Lifecycle shared by every node in the graph.
pub trait AudioNode: Send {
    fn name(&self) -> &str;
    /// Clear internal state (phases, delay lines) without releasing buffers.
    fn reset(&mut self);
    /// Free owned resources. A node may only be released once.
    fn release(&mut self) -> Result<(), DisposalError>;
}

fn already_released(name: &str) -> DisposalError {
    DisposalError::Node {
        node: name.to_string(),
        reason: "already released".into(),
    }
}

/// One-pole parameter glide so control-rate jumps do not click.
#[derive(Clone, Copy, Debug)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
}

impl SmoothedParam {
    pub fn new(value: f32, smoothing_sec: f32, sample_rate: f32) -> Self {
        let samples = smoothing_sec * sample_rate;
        let coeff = if samples > 1.0 {
            1.0 - (-1.0 / samples).exp()
        } else {
            1.0
        };
        Self {
            current: value,
            target: value,
            coeff,
        }
    }

    #[inline]
    pub fn set_target(&mut self, value: f32) {
        if value.is_finite() {
            self.target = value;
        }
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.coeff;
        self.current
    }

    /// Jump straight to the target (used before the stream starts).
    pub fn snap(&mut self) {
        self.current = self.target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}

// ---------------- Voices ----------------

#[derive(Clone, Copy, Debug)]
struct ScheduledNote {
    start_frame: u64,
    hold_frames: u64,
    phase_inc: f32,
    amplitude: f32,
}

/// Oscillator with a linear attack/release envelope, triggered on exact frames.
pub struct Voice {
    name: String,
    waveform: Waveform,
    sample_rate: f32,
    attack_frames: u64,
    release_frames: u64,
    phase: f32,
    note: Option<ScheduledNote>,
    released: bool,
}

const VOICE_LEVEL: f32 = 0.4;

impl Voice {
    pub fn new(index: usize, waveform: Waveform, sample_rate: f32, attack: f32, release: f32) -> Self {
        Self {
            name: format!("voice-{index}"),
            waveform,
            sample_rate,
            attack_frames: ((attack * sample_rate) as u64).max(1),
            release_frames: ((release * sample_rate) as u64).max(1),
            phase: 0.0,
            note: None,
            released: false,
        }
    }

    /// Arm the voice for a note starting at `start_frame`.
    pub fn schedule(&mut self, start_frame: u64, hold_frames: u64, frequency_hz: f32, velocity: f32) {
        self.phase = 0.0;
        self.note = Some(ScheduledNote {
            start_frame,
            hold_frames: hold_frames.max(1),
            phase_inc: TAU * frequency_hz / self.sample_rate,
            amplitude: velocity.clamp(0.0, 1.0) * VOICE_LEVEL,
        });
    }

    pub fn cancel(&mut self) {
        self.note = None;
    }

    pub fn is_idle(&self) -> bool {
        self.note.is_none()
    }

    /// Frame the current note starts on; `None` when idle.
    pub fn start_frame(&self) -> Option<u64> {
        self.note.map(|n| n.start_frame)
    }

    #[inline]
    pub fn process(&mut self, frame: u64) -> f32 {
        let Some(note) = self.note else { return 0.0 };
        if frame < note.start_frame {
            return 0.0;
        }
        let n = frame - note.start_frame;
        let env = if n < note.hold_frames {
            (n as f32 / self.attack_frames as f32).min(1.0)
        } else {
            let r = n - note.hold_frames;
            if r >= self.release_frames {
                self.note = None;
                return 0.0;
            }
            let peak = (note.hold_frames as f32 / self.attack_frames as f32).min(1.0);
            peak * (1.0 - r as f32 / self.release_frames as f32)
        };
        let out = render_wave_sample(self.phase, self.waveform) * note.amplitude * env;
        self.phase += note.phase_inc;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        out
    }
}

impl AudioNode for Voice {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.note = None;
    }

    fn release(&mut self) -> Result<(), DisposalError> {
        if self.released {
            return Err(already_released(&self.name));
        }
        self.reset();
        self.released = true;
        Ok(())
    }
}

pub fn render_wave_sample(phase: f32, wave: Waveform) -> f32 {
    match wave {
        Waveform::Sine => phase.sin(),
        Waveform::Square => {
            if phase < PI {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Saw => {
            // Map phase 0..2PI to -1..1
            let t = phase / TAU;
            2.0 * (t - t.floor()) - 1.0
        }
        Waveform::Triangle => {
            let t = phase / TAU;
            4.0 * ((t - t.floor()) - 0.5).abs() - 1.0
        }
    }
}

// ---------------- Filter ----------------

/// RBJ low-pass biquad with smoothed cutoff and resonance.
pub struct BiquadFilter {
    sample_rate: f32,
    cutoff: SmoothedParam,
    q: SmoothedParam,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
    counter: u32,
    released: bool,
}

impl BiquadFilter {
    pub fn new(sample_rate: f32, smoothing_sec: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            cutoff: SmoothedParam::new(DEFAULT_FILTER_CUTOFF_HZ, smoothing_sec, sample_rate),
            q: SmoothedParam::new(DEFAULT_FILTER_Q, smoothing_sec, sample_rate),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            counter: 0,
            released: false,
        };
        filter.update_coefficients(DEFAULT_FILTER_CUTOFF_HZ, DEFAULT_FILTER_Q);
        filter
    }

    pub fn cutoff_mut(&mut self) -> &mut SmoothedParam {
        &mut self.cutoff
    }

    pub fn q_mut(&mut self) -> &mut SmoothedParam {
        &mut self.q
    }

    pub fn snap(&mut self) {
        self.cutoff.snap();
        self.q.snap();
        self.update_coefficients(self.cutoff.current(), self.q.current());
    }

    fn update_coefficients(&mut self, cutoff_hz: f32, q: f32) {
        let cutoff = cutoff_hz.clamp(20.0, self.sample_rate * 0.45);
        let q = q.max(0.1);
        let w0 = TAU * cutoff / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        self.b0 = (1.0 - cos_w0) * 0.5 / a0;
        self.b1 = (1.0 - cos_w0) / a0;
        self.b2 = self.b0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let cutoff = self.cutoff.next();
        let q = self.q.next();
        if self.counter == 0 {
            self.update_coefficients(cutoff, q);
        }
        self.counter = (self.counter + 1) % FILTER_UPDATE_INTERVAL;

        let y = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

impl AudioNode for BiquadFilter {
    fn name(&self) -> &str {
        "filter"
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    fn release(&mut self) -> Result<(), DisposalError> {
        if self.released {
            return Err(already_released(self.name()));
        }
        self.reset();
        self.released = true;
        Ok(())
    }
}

// ---------------- Reverb ----------------

// Freeverb tunings at 44.1 kHz, rescaled to the context rate
const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNINGS: [usize; 2] = [556, 441];
const COMB_INPUT_GAIN: f32 = 0.08;
const REVERB_DAMPING: f32 = 0.3;

struct Comb {
    buf: Vec<f32>,
    idx: usize,
    filter_state: f32,
}

impl Comb {
    #[inline]
    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let out = self.buf[self.idx];
        self.filter_state = out * (1.0 - REVERB_DAMPING) + self.filter_state * REVERB_DAMPING;
        self.buf[self.idx] = input + self.filter_state * feedback;
        self.idx = (self.idx + 1) % self.buf.len();
        out
    }
}

struct Allpass {
    buf: Vec<f32>,
    idx: usize,
}

impl Allpass {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buf[self.idx];
        let out = delayed - input;
        self.buf[self.idx] = input + delayed * 0.5;
        self.idx = (self.idx + 1) % self.buf.len();
        out
    }
}

/// Schroeder reverb (parallel combs into series allpasses) with a wet/dry mix.
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    decay: f32,
    mix: SmoothedParam,
    released: bool,
}

impl Reverb {
    pub fn new(sample_rate: f32, decay: f32, smoothing_sec: f32) -> Self {
        let scale = sample_rate / 44_100.0;
        let scaled = |len: usize| ((len as f32 * scale) as usize).max(1);
        Self {
            combs: COMB_TUNINGS
                .iter()
                .map(|&len| Comb {
                    buf: vec![0.0; scaled(len)],
                    idx: 0,
                    filter_state: 0.0,
                })
                .collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|&len| Allpass {
                    buf: vec![0.0; scaled(len)],
                    idx: 0,
                })
                .collect(),
            decay: decay.clamp(0.0, 0.98),
            mix: SmoothedParam::new(DEFAULT_REVERB_MIX, smoothing_sec, sample_rate),
            released: false,
        }
    }

    pub fn mix_mut(&mut self) -> &mut SmoothedParam {
        &mut self.mix
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mix = self.mix.next().clamp(0.0, 1.0);
        if self.released {
            return input;
        }
        let mut wet = 0.0;
        for comb in &mut self.combs {
            wet += comb.process(input * COMB_INPUT_GAIN, self.decay);
        }
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        input * (1.0 - mix) + wet * mix
    }
}

impl AudioNode for Reverb {
    fn name(&self) -> &str {
        "reverb"
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.buf.fill(0.0);
            comb.filter_state = 0.0;
        }
        for allpass in &mut self.allpasses {
            allpass.buf.fill(0.0);
        }
    }

    fn release(&mut self) -> Result<(), DisposalError> {
        if self.released {
            return Err(already_released(self.name()));
        }
        self.combs = Vec::new();
        self.allpasses = Vec::new();
        self.released = true;
        Ok(())
    }
}

// ---------------- Delay ----------------

/// Feedback delay with a low-pass tone stage inside the loop.
pub struct FeedbackDelay {
    sample_rate: f32,
    buf: Vec<f32>,
    write_idx: usize,
    time_sec: SmoothedParam,
    feedback: SmoothedParam,
    wet: f32,
    tone_coeff: f32,
    tone_state: f32,
    released: bool,
}

impl FeedbackDelay {
    pub fn new(sample_rate: f32, max_delay_sec: f32, smoothing_sec: f32) -> Self {
        let len = (sample_rate * max_delay_sec.max(0.01)).ceil() as usize + 4;
        Self {
            sample_rate,
            buf: vec![0.0; len],
            write_idx: 0,
            time_sec: SmoothedParam::new(DEFAULT_DELAY_TIME_SEC, smoothing_sec, sample_rate),
            feedback: SmoothedParam::new(DEFAULT_DELAY_FEEDBACK, smoothing_sec, sample_rate),
            wet: DEFAULT_DELAY_WET,
            tone_coeff: 1.0 - (-TAU * DELAY_TONE_HZ / sample_rate).exp(),
            tone_state: 0.0,
            released: false,
        }
    }

    pub fn time_mut(&mut self) -> &mut SmoothedParam {
        &mut self.time_sec
    }

    pub fn feedback_mut(&mut self) -> &mut SmoothedParam {
        &mut self.feedback
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let time = self.time_sec.next();
        let feedback = self.feedback.next().clamp(0.0, 0.95);
        if self.released {
            return input;
        }
        let max_delay = (self.buf.len() - 3) as f32;
        let delay_samples = (time * self.sample_rate).clamp(1.0, max_delay);
        let tap = read_tap(&self.buf, self.write_idx, delay_samples);
        self.tone_state += (tap - self.tone_state) * self.tone_coeff;
        self.buf[self.write_idx] = input + self.tone_state * feedback;
        self.write_idx = (self.write_idx + 1) % self.buf.len();
        input + self.tone_state * self.wet
    }
}

impl AudioNode for FeedbackDelay {
    fn name(&self) -> &str {
        "delay"
    }

    fn reset(&mut self) {
        self.buf.fill(0.0);
        self.tone_state = 0.0;
        self.write_idx = 0;
    }

    fn release(&mut self) -> Result<(), DisposalError> {
        if self.released {
            return Err(already_released(self.name()));
        }
        self.buf = Vec::new();
        self.released = true;
        Ok(())
    }
}

/// Linear-interpolated read `delay_samples` behind `write_idx`.
fn read_tap(buffer: &[f32], write_idx: usize, delay_samples: f32) -> f32 {
    let len = buffer.len();
    let pos = (write_idx as f32 - delay_samples).rem_euclid(len as f32);
    let idx0 = (pos.floor() as usize) % len;
    let idx1 = (idx0 + 1) % len;
    let frac = pos - pos.floor();
    buffer[idx0] + (buffer[idx1] - buffer[idx0]) * frac
}

// ---------------- Gain / destination ----------------

/// Master gain with a tanh soft clip.
pub struct MasterGain {
    gain: SmoothedParam,
    released: bool,
}

impl MasterGain {
    pub fn new(gain: f32, smoothing_sec: f32, sample_rate: f32) -> Self {
        Self {
            gain: SmoothedParam::new(gain, smoothing_sec, sample_rate),
            released: false,
        }
    }

    pub fn gain_mut(&mut self) -> &mut SmoothedParam {
        &mut self.gain
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let g = self.gain.next();
        if self.released {
            return 0.0;
        }
        (input * g).tanh()
    }
}

impl AudioNode for MasterGain {
    fn name(&self) -> &str {
        "gain"
    }

    fn reset(&mut self) {
        self.gain.snap();
    }

    fn release(&mut self) -> Result<(), DisposalError> {
        if self.released {
            return Err(already_released(self.name()));
        }
        self.released = true;
        Ok(())
    }
}

/// Sink of the graph; the renderer hands its input to the device buffer.
#[derive(Default)]
pub struct Destination {
    released: bool,
}

impl AudioNode for Destination {
    fn name(&self) -> &str {
        "destination"
    }

    fn reset(&mut self) {}

    fn release(&mut self) -> Result<(), DisposalError> {
        if self.released {
            return Err(already_released(self.name()));
        }
        self.released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothed_param_converges_on_target() {
        let mut p = SmoothedParam::new(0.0, 0.01, 1000.0);
        p.set_target(1.0);
        for _ in 0..200 {
            p.next();
        }
        assert!((p.current() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn smoothed_param_ignores_non_finite_targets() {
        let mut p = SmoothedParam::new(0.5, 0.01, 1000.0);
        p.set_target(f32::NAN);
        assert_eq!(p.target(), 0.5);
    }

    #[test]
    fn wave_shapes_stay_in_unit_range() {
        for wave in [Waveform::Sine, Waveform::Square, Waveform::Saw, Waveform::Triangle] {
            for i in 0..64 {
                let phase = i as f32 / 64.0 * TAU;
                let s = render_wave_sample(phase, wave);
                assert!((-1.0..=1.0).contains(&s), "{wave:?} out of range at {phase}: {s}");
            }
        }
    }

    #[test]
    fn voice_is_silent_before_start_and_goes_idle_after_release() {
        let mut v = Voice::new(0, Waveform::Sine, 1000.0, 0.01, 0.01);
        v.schedule(10, 20, 100.0, 1.0);
        for frame in 0..10 {
            assert_eq!(v.process(frame), 0.0);
        }
        let sounding: f32 = (10..30).map(|f| v.process(f).abs()).sum();
        assert!(sounding > 0.0);
        for frame in 30..60 {
            v.process(frame);
        }
        assert!(v.is_idle());
    }

    #[test]
    fn release_twice_reports_error() {
        let mut d = Destination::default();
        assert!(d.release().is_ok());
        assert!(d.release().is_err());
    }

    #[test]
    fn read_tap_interpolates_between_samples() {
        let buf = [0.0, 1.0, 2.0, 3.0];
        // write at 3, one and a half samples back lands between idx 1 and 2
        let v = read_tap(&buf, 3, 1.5);
        assert!((v - 1.5).abs() < 1e-6);
    }
}
