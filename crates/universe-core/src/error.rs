//! Error taxonomy for the core.
//!
//! Physics parameters are clamped and never produce errors. Everything here is
//! recoverable: callers retry with corrected input or a working device.

use thiserror::Error;

use crate::fields::FieldId;

/// Malformed input coming from an explicit UI action (force fields, mapping tables).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("force field radius must be finite and > 0, got {0}")]
    InvalidRadius(f32),
    #[error("force field strength must be finite, got {0}")]
    NonFiniteStrength(f32),
    #[error("force field position must be finite, got ({0}, {1})")]
    NonFinitePosition(f32, f32),
    #[error("force field angle must be finite, got {0}")]
    NonFiniteAngle(f32),
    #[error("no force field with id {0}")]
    UnknownField(FieldId),
    #[error("mapping domain requires finite min < max, got [{0}, {1}]")]
    InvalidDomain(f32, f32),
    #[error("mapping range requires finite min < max, got [{0}, {1}]")]
    InvalidRange(f32, f32),
}

/// The audio graph could not reach the `Initialized` state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitializationError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("audio start blocked by platform policy: {0}")]
    Blocked(String),
    #[error("failed to start audio stream: {0}")]
    Stream(String),
    #[error("invalid node topology: {0}")]
    InvalidTopology(String),
    #[error("audio graph has been disposed")]
    Disposed,
}

/// A single resource failed to release. Disposal continues regardless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisposalError {
    #[error("node `{node}` failed to release: {reason}")]
    Node { node: String, reason: String },
    #[error("audio device failed to stop: {0}")]
    Device(String),
}

/// Rejected `UniverseConfig`, reported once at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("simulation bounds must have positive, finite size")]
    InvalidBounds,
    #[error("audio graph needs at least one voice")]
    NoVoices,
    #[error("fft size must be a power of two >= 32, got {0}")]
    InvalidFftSize(usize),
    #[error("tempo must be finite, > 0 bpm and give steps of at least 10 ms, got {0}")]
    InvalidTempo(f32),
    #[error("steps per beat must be > 0")]
    InvalidStepsPerBeat,
    #[error("audio config value `{0}` must be finite and >= 0")]
    InvalidAudioValue(&'static str),
}
