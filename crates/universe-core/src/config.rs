use crate::audio::AudioConfig;
use crate::error::ConfigError;
use crate::params::PhysicsParameters;
use crate::particles::Bounds;
use crate::sequencer::SequencerConfig;

/// Everything needed to build a [`crate::Universe`].
///
/// Physics parameters are clamped rather than rejected; the rest is checked
/// once by [`UniverseConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct UniverseConfig {
    pub bounds: Bounds,
    pub physics: PhysicsParameters,
    pub audio: AudioConfig,
    pub sequencer: SequencerConfig,
    /// Seed for spawn velocities and colours.
    pub seed: u64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            physics: PhysicsParameters::default(),
            audio: AudioConfig::default(),
            sequencer: SequencerConfig::default(),
            seed: 0x5eed,
        }
    }
}

impl UniverseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bounds.is_valid() {
            return Err(ConfigError::InvalidBounds);
        }
        self.audio.validate()?;
        self.sequencer.validate()?;
        Ok(())
    }
}
