//! Physics → audio parameter mapping.
//!
//! Everything here is pure: `map_all` reads a parameter snapshot and a table
//! and returns target values without touching any audio state, so it can be
//! tested without a device.

use crate::error::ValidationError;
use crate::params::{PhysicsField, PhysicsParameters};

/// Audio-side parameter a mapping entry drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioTarget {
    /// Base pitch the sequencer transposes notes from (Hz).
    Frequency,
    FilterCutoff,
    FilterResonance,
    ReverbMix,
    DelayFeedback,
    DelayTime,
    MasterGain,
}

impl AudioTarget {
    pub const COUNT: usize = 7;
    pub const ALL: [AudioTarget; AudioTarget::COUNT] = [
        AudioTarget::Frequency,
        AudioTarget::FilterCutoff,
        AudioTarget::FilterResonance,
        AudioTarget::ReverbMix,
        AudioTarget::DelayFeedback,
        AudioTarget::DelayTime,
        AudioTarget::MasterGain,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            AudioTarget::Frequency => "frequency",
            AudioTarget::FilterCutoff => "filter_cutoff",
            AudioTarget::FilterResonance => "filter_resonance",
            AudioTarget::ReverbMix => "reverb_mix",
            AudioTarget::DelayFeedback => "delay_feedback",
            AudioTarget::DelayTime => "delay_time",
            AudioTarget::MasterGain => "master_gain",
        }
    }
}

/// Fixed-size map from [`AudioTarget`] to a value; unmapped targets are `None`.
///
/// `Copy` so it can cross from the control loop to the audio graph without
/// allocating.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioParameterValues {
    values: [Option<f32>; AudioTarget::COUNT],
}

impl AudioParameterValues {
    pub fn get(&self, target: AudioTarget) -> Option<f32> {
        self.values[target.index()]
    }

    pub fn set(&mut self, target: AudioTarget, value: f32) {
        self.values[target.index()] = Some(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (AudioTarget, f32)> + '_ {
        AudioTarget::ALL
            .iter()
            .filter_map(|t| self.get(*t).map(|v| (*t, v)))
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Linear transform from one physics field's domain onto an audio target's range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioParameterMapping {
    source: PhysicsField,
    target: AudioTarget,
    domain: (f32, f32),
    range: (f32, f32),
}

impl AudioParameterMapping {
    /// Both `domain` and `range` must be finite with `min < max`.
    pub fn new(
        source: PhysicsField,
        target: AudioTarget,
        domain: (f32, f32),
        range: (f32, f32),
    ) -> Result<Self, ValidationError> {
        if !is_ordered(domain) {
            return Err(ValidationError::InvalidDomain(domain.0, domain.1));
        }
        if !is_ordered(range) {
            return Err(ValidationError::InvalidRange(range.0, range.1));
        }
        Ok(Self {
            source,
            target,
            domain,
            range,
        })
    }

    pub fn source(&self) -> PhysicsField {
        self.source
    }

    pub fn target(&self) -> AudioTarget {
        self.target
    }

    pub fn domain(&self) -> (f32, f32) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    /// Map a source value. The input is clamped into the domain first (NaN
    /// reads as the domain minimum) and the output is clamped into the range.
    pub fn apply(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let x = if value.is_nan() { d0 } else { value.clamp(d0, d1) };
        rescale(x, (d0, d1), (r0, r1))
    }

    /// Inverse transform: the domain value that maps onto `value`.
    pub fn invert(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let y = if value.is_nan() { r0 } else { value.clamp(r0, r1) };
        rescale(y, (r0, r1), (d0, d1))
    }
}

/// Linear map from one ordered span onto another. Worked in f64 so spans
/// as wide as `[-f32::MAX, f32::MAX]` do not overflow.
fn rescale(value: f32, (a0, a1): (f32, f32), (b0, b1): (f32, f32)) -> f32 {
    let (a0, a1, b0, b1) = (a0 as f64, a1 as f64, b0 as f64, b1 as f64);
    let t = (value as f64 - a0) / (a1 - a0);
    let y = b0 + t * (b1 - b0);
    if y.is_finite() {
        y.clamp(b0, b1) as f32
    } else {
        b0 as f32
    }
}

fn is_ordered((min, max): (f32, f32)) -> bool {
    min.is_finite() && max.is_finite() && min < max
}

/// Declarative mapping table.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingTable {
    entries: Vec<AudioParameterMapping>,
}

impl MappingTable {
    pub fn new(entries: Vec<AudioParameterMapping>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AudioParameterMapping] {
        &self.entries
    }

    pub fn find(&self, target: AudioTarget) -> Option<&AudioParameterMapping> {
        self.entries.iter().find(|m| m.target == target)
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        use AudioTarget as T;
        use PhysicsField as F;
        // (source, target, domain, range)
        let rows = [
            (F::Gravity, T::Frequency, (0.0, 20.0), (200.0, 800.0)),
            (F::Density, T::FilterCutoff, (0.1, 10.0), (300.0, 8000.0)),
            (F::Friction, T::FilterResonance, (0.0, 1.0), (0.7, 12.0)),
            (F::Elasticity, T::ReverbMix, (0.0, 1.0), (0.05, 0.8)),
            (F::AirResistance, T::DelayFeedback, (0.0, 1.0), (0.05, 0.75)),
            (F::TimeScale, T::DelayTime, (0.1, 3.0), (0.08, 0.9)),
        ];
        let entries = rows
            .into_iter()
            .filter_map(|(source, target, domain, range)| {
                AudioParameterMapping::new(source, target, domain, range).ok()
            })
            .collect();
        Self { entries }
    }
}

/// Translate a physics snapshot into audio target values.
///
/// Deterministic and side-effect free. When several entries share a target the
/// last one wins.
pub fn map_all(params: &PhysicsParameters, table: &MappingTable) -> AudioParameterValues {
    let mut out = AudioParameterValues::default();
    for mapping in &table.entries {
        out.set(mapping.target, mapping.apply(params.get(mapping.source)));
    }
    out
}
