pub mod audio;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod fields;
pub mod mapping;
pub mod music;
pub mod params;
pub mod particles;
pub mod sequencer;
pub mod universe;

pub use audio::{
    AnalyserTap, AudioAnalyzer, AudioConfig, AudioContext, AudioDevice, AudioSynthesisGraph,
    FrequencyBands, GraphState, OfflineDevice,
};
pub use config::*;
pub use error::*;
pub use events::*;
pub use fields::*;
pub use mapping::*;
pub use music::*;
pub use params::*;
pub use particles::*;
pub use sequencer::*;
pub use universe::*;
