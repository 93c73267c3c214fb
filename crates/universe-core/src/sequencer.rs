use smallvec::SmallVec;

use crate::audio::{AudioContext, AudioSynthesisGraph};
use crate::constants::*;
use crate::error::ConfigError;
use crate::music::{transpose_hz, Note, NoteEvent, C_MAJOR_PENTATONIC};

/// Tempo and scheduling configuration for the transport.
///
/// - `bpm` / `steps_per_beat` give the step duration (2 steps per beat = eighth notes)
/// - `lookahead_sec` is how far ahead of the audio clock each tick schedules
/// - `start_delay_sec` is the gap between `start` and the first step
/// - `max_catch_up_steps` bounds how many late steps are replayed after a stall
#[derive(Clone, Debug, PartialEq)]
pub struct SequencerConfig {
    pub bpm: f32,
    pub steps_per_beat: u32,
    pub lookahead_sec: f64,
    pub start_delay_sec: f64,
    pub max_catch_up_steps: u32,
    pub notes: Vec<Note>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            steps_per_beat: DEFAULT_STEPS_PER_BEAT,
            lookahead_sec: DEFAULT_LOOKAHEAD_SEC,
            start_delay_sec: DEFAULT_START_DELAY_SEC,
            max_catch_up_steps: DEFAULT_MAX_CATCH_UP_STEPS,
            notes: C_MAJOR_PENTATONIC
                .iter()
                .map(|&degree| Note::new(degree, 0.7))
                .collect(),
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps_per_beat == 0 {
            return Err(ConfigError::InvalidStepsPerBeat);
        }
        if !tempo_is_playable(self.bpm, self.steps_per_beat) {
            return Err(ConfigError::InvalidTempo(self.bpm));
        }
        Ok(())
    }

    pub fn step_duration_seconds(&self) -> f64 {
        step_duration(self.bpm, self.steps_per_beat)
    }
}

fn step_duration(bpm: f32, steps_per_beat: u32) -> f64 {
    60.0 / bpm as f64 / steps_per_beat.max(1) as f64
}

/// Finite, positive, and no faster than `MIN_STEP_DURATION_SEC` per step.
fn tempo_is_playable(bpm: f32, steps_per_beat: u32) -> bool {
    bpm.is_finite() && bpm > 0.0 && step_duration(bpm, steps_per_beat) >= MIN_STEP_DURATION_SEC
}

/// Snapshot of the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct SequencerState {
    /// Index of the next step to be scheduled.
    pub current_step: usize,
    pub step_duration_seconds: f64,
    pub notes: Vec<Note>,
    pub transport_running: bool,
}

/// Step sequencer running on the audio clock.
///
/// The control loop calls [`Sequencer::tick`] at whatever rate it runs; each
/// call schedules every step that starts before `now + lookahead` at that
/// step's exact audio time, so note timing does not depend on frame timing.
pub struct Sequencer {
    config: SequencerConfig,
    state: SequencerState,
    next_step_time: f64,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        let state = SequencerState {
            current_step: 0,
            step_duration_seconds: config.step_duration_seconds(),
            notes: config.notes.clone(),
            transport_running: false,
        };
        Self {
            config,
            state,
            next_step_time: 0.0,
        }
    }

    /// Start the transport from step 0, `start_delay_sec` after the current audio time.
    pub fn start(&mut self, ctx: &AudioContext) {
        self.state.current_step = 0;
        self.next_step_time = ctx.current_time() + self.config.start_delay_sec;
        self.state.transport_running = true;
        log::info!(
            "[seq] transport started at {:.3}s, step {:.3}s",
            self.next_step_time,
            self.state.step_duration_seconds
        );
    }

    pub fn stop(&mut self) {
        if self.state.transport_running {
            log::info!("[seq] transport stopped at step {}", self.state.current_step);
        }
        self.state.transport_running = false;
    }

    pub fn is_running(&self) -> bool {
        self.state.transport_running
    }

    pub fn state(&self) -> SequencerState {
        self.state.clone()
    }

    /// Audio time of the next step to be scheduled.
    pub fn next_step_time(&self) -> f64 {
        self.next_step_time
    }

    /// Change tempo; takes effect from the next unscheduled step.
    pub fn set_bpm(&mut self, bpm: f32) {
        if !tempo_is_playable(bpm, self.config.steps_per_beat) {
            log::warn!("[seq] ignoring invalid bpm {bpm}");
            return;
        }
        self.config.bpm = bpm;
        self.state.step_duration_seconds = self.config.step_duration_seconds();
    }

    pub fn set_notes(&mut self, notes: Vec<Note>) {
        self.state.current_step = if notes.is_empty() {
            0
        } else {
            self.state.current_step % notes.len()
        };
        self.state.notes = notes;
    }

    /// Schedule all steps falling inside the lookahead window.
    ///
    /// Returns the events handed to the graph (rests are skipped).
    pub fn tick(&mut self, graph: &mut AudioSynthesisGraph) -> SmallVec<[NoteEvent; 4]> {
        let mut out = SmallVec::new();
        if !self.state.transport_running {
            return out;
        }
        let step = self.state.step_duration_seconds;
        let now = graph.context().current_time();

        let behind = ((now - self.next_step_time) / step).floor();
        if behind > self.config.max_catch_up_steps as f64 {
            let skipped = behind as usize;
            log::warn!("[seq] control loop stalled, skipping {skipped} steps");
            self.advance_steps(skipped);
            self.next_step_time += skipped as f64 * step;
        }

        let horizon = now + self.config.lookahead_sec;
        let mut scheduled = 0;
        while self.next_step_time < horizon {
            if scheduled == MAX_STEPS_PER_TICK {
                log::warn!("[seq] {MAX_STEPS_PER_TICK} steps in one tick, deferring the rest");
                break;
            }
            scheduled += 1;
            let at = self.next_step_time.max(now);
            if let Some(note) = self.state.notes.get(self.state.current_step).copied() {
                if !note.is_rest() {
                    let event = NoteEvent {
                        frequency_hz: transpose_hz(graph.base_frequency(), note.semitones),
                        velocity: note.velocity,
                        start_time_sec: at,
                        duration_sec: (step * note.gate.clamp(0.0, 1.0) as f64) as f32,
                    };
                    if graph.trigger_note(&event) {
                        out.push(event);
                    }
                }
            }
            self.advance_steps(1);
            self.next_step_time += step;
        }
        out
    }

    fn advance_steps(&mut self, n: usize) {
        let len = self.state.notes.len();
        if len > 0 {
            self.state.current_step = (self.state.current_step + n) % len;
        }
    }
}
