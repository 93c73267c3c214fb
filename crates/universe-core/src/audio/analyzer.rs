//! Frequency and time-domain analysis of the graph output.
//!
//! The renderer writes every output sample into an [`AnalyserTap`] ring after
//! the master gain. The analyzer only ever copies out of the ring, so polling
//! it at any rate cannot affect the signal path.

use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use super::graph::AudioSynthesisGraph;
use super::lock_or_recover;
use crate::constants::*;

pub(crate) struct TapRing {
    buf: Vec<f32>,
    write: usize,
    filled: usize,
}

impl TapRing {
    #[inline]
    pub(crate) fn push(&mut self, sample: f32) {
        self.buf[self.write] = sample;
        self.write = (self.write + 1) % self.buf.len();
        self.filled = (self.filled + 1).min(self.buf.len());
    }

    /// Copy the most recent samples into `out` oldest-first, zero-padding the front.
    fn copy_latest(&self, out: &mut [f32]) {
        let len = self.buf.len();
        let n = out.len().min(self.filled);
        let pad = out.len() - n;
        out[..pad].fill(0.0);
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            let idx = (self.write + len - n + i) % len;
            *slot = self.buf[idx];
        }
    }
}

/// Shared ring buffer holding the latest output samples.
#[derive(Clone)]
pub struct AnalyserTap {
    ring: Arc<Mutex<TapRing>>,
}

impl AnalyserTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(TapRing {
                buf: vec![0.0; capacity.max(1)],
                write: 0,
                filled: 0,
            })),
        }
    }

    pub(crate) fn ring(&self) -> &Mutex<TapRing> {
        &self.ring
    }

    pub fn capacity(&self) -> usize {
        lock_or_recover(&self.ring).buf.len()
    }

    /// Detached tap preloaded with `samples`, for analysing a signal that
    /// does not come from a graph.
    pub fn from_samples(capacity: usize, samples: &[f32]) -> Self {
        let tap = Self::new(capacity);
        tap.write(samples);
        tap
    }

    pub(crate) fn write(&self, samples: &[f32]) {
        let mut ring = lock_or_recover(&self.ring);
        for &s in samples {
            ring.push(s);
        }
    }

    pub fn latest(&self, out: &mut [f32]) {
        lock_or_recover(&self.ring).copy_latest(out);
    }

    pub(crate) fn clear(&self) {
        let mut ring = lock_or_recover(&self.ring);
        ring.buf.fill(0.0);
        ring.write = 0;
        ring.filled = 0;
    }
}

/// Average spectral magnitude in three fixed bands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrequencyBands {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

pub struct AudioAnalyzer {
    tap: AnalyserTap,
    sample_rate: f32,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    window_sum: f32,
    frame: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl AudioAnalyzer {
    /// Attach to a graph's output tap.
    pub fn new(graph: &AudioSynthesisGraph) -> Self {
        Self::with_tap(graph.analyser_tap(), graph.context().sample_rate())
    }

    /// Analyse an arbitrary tap; the FFT size is the tap capacity.
    pub fn with_tap(tap: AnalyserTap, sample_rate: u32) -> Self {
        let size = tap.capacity();
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        // Hann window
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 - 0.5 * (TAU * i as f32 / size as f32).cos())
            .collect();
        let window_sum = window.iter().sum::<f32>().max(f32::EPSILON);
        Self {
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            magnitudes: vec![0.0; size / 2 + 1],
            frame: vec![0.0; size],
            tap,
            sample_rate: sample_rate.max(1) as f32,
            fft,
            window,
            window_sum,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate / self.fft_size() as f32
    }

    /// Average magnitude over bass (20–250 Hz), mid (250–2000 Hz) and treble
    /// (2–16 kHz). Recomputed from the latest samples on every call.
    pub fn frequency_bands(&mut self) -> FrequencyBands {
        self.analyse();
        FrequencyBands {
            bass: self.band_average(BASS_BAND_HZ),
            mid: self.band_average(MID_BAND_HZ),
            treble: self.band_average(TREBLE_BAND_HZ),
        }
    }

    /// Per-bin magnitudes (linear, a full-scale sine reads ≈ 1 at its bin).
    pub fn frequency_data(&mut self, out: &mut [f32]) {
        self.analyse();
        let n = out.len().min(self.magnitudes.len());
        out[..n].copy_from_slice(&self.magnitudes[..n]);
        out[n..].fill(0.0);
    }

    /// Latest time-domain samples, oldest first.
    pub fn waveform(&self, out: &mut [f32]) {
        self.tap.latest(out);
    }

    /// Root-mean-square level of the latest analysis frame.
    pub fn rms(&mut self) -> f32 {
        self.tap.latest(&mut self.frame);
        let sum: f32 = self.frame.iter().map(|s| s * s).sum();
        (sum / self.frame.len() as f32).sqrt()
    }

    fn analyse(&mut self) {
        self.tap.latest(&mut self.frame);
        for ((dst, s), w) in self.input.iter_mut().zip(&self.frame).zip(&self.window) {
            *dst = s * w;
        }
        if let Err(e) = self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            log::warn!("[analyzer] fft failed: {e}");
            self.magnitudes.fill(0.0);
            return;
        }
        let norm = 2.0 / self.window_sum;
        for (m, c) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *m = c.norm() * norm;
        }
    }

    fn band_average(&self, (lo, hi): (f32, f32)) -> f32 {
        let hi = hi.min(self.sample_rate * 0.5);
        if lo >= hi {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut count = 0;
        for (i, m) in self.magnitudes.iter().enumerate() {
            let f = self.bin_frequency(i);
            if f >= lo && f < hi {
                sum += m;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}
