use rand::prelude::*;

/// Basic oscillator shape used by synth voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

/// A scheduled voice attack/release produced by the sequencer (or any caller).
///
/// Fields:
/// - `frequency_hz`: target pitch in Hertz
/// - `velocity`: normalized loudness 0..1 (mapped to the envelope peak)
/// - `start_time_sec`: absolute start time on the audio context clock
/// - `duration_sec`: time from attack start to release start
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoteEvent {
    pub frequency_hz: f32,
    pub velocity: f32,
    pub start_time_sec: f64,
    pub duration_sec: f32,
}

/// One sequencer step.
///
/// - `semitones`: offset from the mapped base frequency
/// - `velocity`: loudness 0..1; zero makes the step a rest
/// - `gate`: note length as a fraction of the step duration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub semitones: i32,
    pub velocity: f32,
    pub gate: f32,
}

impl Note {
    pub fn new(semitones: i32, velocity: f32) -> Self {
        Self {
            semitones,
            velocity,
            gate: 0.8,
        }
    }

    pub fn rest() -> Self {
        Self {
            semitones: 0,
            velocity: 0.0,
            gate: 0.0,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.velocity <= 0.0
    }
}

/// Default five-note scale.
pub const C_MAJOR_PENTATONIC: &[i32] = &[0, 2, 4, 7, 9, 12];

/// Diatonic modes (relative semitone degrees)
pub const IONIAN: &[i32] = &[0, 2, 4, 5, 7, 9, 11, 12]; // major
pub const DORIAN: &[i32] = &[0, 2, 3, 5, 7, 9, 10, 12];
pub const PHRYGIAN: &[i32] = &[0, 1, 3, 5, 7, 8, 10, 12];
pub const LYDIAN: &[i32] = &[0, 2, 4, 6, 7, 9, 11, 12];
pub const MIXOLYDIAN: &[i32] = &[0, 2, 4, 5, 7, 9, 10, 12];
pub const AEOLIAN: &[i32] = &[0, 2, 3, 5, 7, 8, 10, 12]; // natural minor
pub const LOCRIAN: &[i32] = &[0, 1, 3, 5, 6, 8, 10, 12];

/// Probability that a generated step sounds instead of resting.
const PATTERN_TRIGGER_PROBABILITY: f32 = 0.6;

/// Build a probabilistic pattern of `steps` notes drawn from `scale`.
///
/// Same seed, same pattern.
pub fn generate_pattern(scale: &[i32], steps: usize, seed: u64) -> Vec<Note> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..steps)
        .map(|_| {
            if rng.gen::<f32>() < PATTERN_TRIGGER_PROBABILITY {
                let degree = *scale.choose(&mut rng).unwrap_or(&0);
                let vel = 0.4 + rng.gen::<f32>() * 0.6;
                let gate = 0.5 + rng.gen::<f32>() * 0.4;
                Note {
                    semitones: degree,
                    velocity: vel,
                    gate,
                }
            } else {
                Note::rest()
            }
        })
        .collect()
}

/// Convert a MIDI note number to Hertz (A4=440 Hz).
///
/// Monotonic and exhibits octave symmetry: +12 semitones doubles the frequency.
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}

/// Transpose `base_hz` by `semitones` (equal temperament).
pub fn transpose_hz(base_hz: f32, semitones: i32) -> f32 {
    base_hz * (2.0_f32).powf(semitones as f32 / 12.0)
}
