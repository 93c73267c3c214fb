//! The facade hosts talk to: owns every component and wires them together.

use std::time::Duration;

use smallvec::SmallVec;

use crate::audio::{
    AudioAnalyzer, AudioContext, AudioDevice, AudioSynthesisGraph, FrequencyBands, GraphState,
};
use crate::config::UniverseConfig;
use crate::error::{ConfigError, DisposalError, InitializationError, ValidationError};
use crate::events::{EventBus, Subscription, UniverseEvent};
use crate::fields::{FieldId, ForceField, ForceFieldRegistry, ForceFieldSpec, ForceFieldUpdate};
use crate::mapping::{map_all, AudioParameterValues, MappingTable};
use crate::music::NoteEvent;
use crate::params::{PhysicsParameters, PhysicsParametersUpdate};
use crate::particles::{Particle, ParticleInstance, ParticleSimulator};
use crate::sequencer::Sequencer;

/// What one control-rate tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Particles removed by this step.
    pub removed: usize,
    /// Notes handed to the graph by the sequencer.
    pub notes: SmallVec<[NoteEvent; 4]>,
}

pub struct Universe {
    config: UniverseConfig,
    params: PhysicsParameters,
    fields: ForceFieldRegistry,
    simulator: ParticleSimulator,
    mapping: MappingTable,
    mapped: AudioParameterValues,
    graph: AudioSynthesisGraph,
    sequencer: Sequencer,
    analyzer: AudioAnalyzer,
    events: EventBus,
}

impl Universe {
    /// Validate `config` and build every component. Audio stays silent
    /// until [`Universe::initialize_audio`] succeeds.
    pub fn new(
        config: UniverseConfig,
        ctx: AudioContext,
        device: Box<dyn AudioDevice>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let params = config.physics.clamped();
        let mapping = MappingTable::default();
        let mapped = map_all(&params, &mapping);
        let mut graph = AudioSynthesisGraph::new(ctx, device, config.audio.clone());
        graph.apply_parameters(&mapped);
        let analyzer = AudioAnalyzer::new(&graph);
        log::info!(
            "[universe] created: bounds {}..{}, seed {}",
            config.bounds.min,
            config.bounds.max,
            config.seed
        );
        Ok(Self {
            params,
            fields: ForceFieldRegistry::new(),
            simulator: ParticleSimulator::new(config.bounds, config.seed),
            mapping,
            mapped,
            graph,
            sequencer: Sequencer::new(config.sequencer.clone()),
            analyzer,
            events: EventBus::new(),
            config,
        })
    }

    /// Replace the mapping table and push the re-mapped values to the graph.
    pub fn with_mapping(mut self, mapping: MappingTable) -> Self {
        self.mapping = mapping;
        self.remap();
        self
    }

    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    pub fn parameters(&self) -> PhysicsParameters {
        self.params
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    /// Audio values derived from the current parameters.
    pub fn mapped_values(&self) -> AudioParameterValues {
        self.mapped
    }

    /// Merge `update` into the parameters (clamped), re-map them to audio and
    /// notify subscribers. Returns the resulting parameters.
    pub fn update_parameters(&mut self, update: PhysicsParametersUpdate) -> PhysicsParameters {
        let next = self.params.merge(&update);
        if next == self.params {
            return next;
        }
        self.params = next;
        self.remap();
        self.events
            .emit(&UniverseEvent::ParametersChanged(self.params));
        self.params
    }

    fn remap(&mut self) {
        self.mapped = map_all(&self.params, &self.mapping);
        self.graph.apply_parameters(&self.mapped);
    }

    pub fn spawn_particle(&mut self, x: f32, y: f32, vx: Option<f32>, vy: Option<f32>) -> Option<Particle> {
        let particle = self.simulator.spawn(x, y, vx, vy, &self.params)?;
        self.events
            .emit(&UniverseEvent::ParticleSpawned(particle.id));
        Some(particle)
    }

    pub fn add_force_field(&mut self, spec: ForceFieldSpec) -> Result<FieldId, ValidationError> {
        self.fields.add(spec)
    }

    pub fn remove_force_field(&mut self, id: FieldId) -> Result<ForceField, ValidationError> {
        self.fields.remove(id)
    }

    pub fn update_force_field(
        &mut self,
        id: FieldId,
        update: ForceFieldUpdate,
    ) -> Result<ForceField, ValidationError> {
        self.fields.update(id, update)
    }

    pub fn force_fields(&self) -> &[ForceField] {
        self.fields.list()
    }

    pub fn particle_count(&self) -> usize {
        self.simulator.len()
    }

    pub fn particle_snapshot(&self) -> Vec<Particle> {
        self.simulator.snapshot()
    }

    pub fn particle_instances(&self) -> Vec<ParticleInstance> {
        self.simulator.instances()
    }

    pub fn frequency_bands(&mut self) -> FrequencyBands {
        self.analyzer.frequency_bands()
    }

    pub fn analyzer_mut(&mut self) -> &mut AudioAnalyzer {
        &mut self.analyzer
    }

    pub fn graph(&self) -> &AudioSynthesisGraph {
        &self.graph
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.sequencer
    }

    pub fn audio_state(&self) -> GraphState {
        self.graph.state()
    }

    /// Start audio output with the current mapped values already in place.
    ///
    /// May fail (e.g. blocked before a user gesture); the universe keeps
    /// running silently and the call can be retried.
    pub fn initialize_audio(&mut self) -> Result<(), InitializationError> {
        let before = self.graph.state();
        self.graph.apply_parameters(&self.mapped);
        self.graph.initialize()?;
        if before != self.graph.state() {
            self.events
                .emit(&UniverseEvent::AudioStateChanged(self.graph.state()));
        }
        Ok(())
    }

    pub fn start_transport(&mut self) {
        self.sequencer.start(self.graph.context());
    }

    pub fn stop_transport(&mut self) {
        self.sequencer.stop();
    }

    /// Control-rate entry point: step the simulation with a snapshot of the
    /// force fields, then let the sequencer schedule ahead on the audio clock.
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        let fields = self.fields.snapshot();
        let removed = self
            .simulator
            .step(dt.as_secs_f32(), &self.params, &fields);
        let notes = if self.graph.is_initialized() {
            self.sequencer.tick(&mut self.graph)
        } else {
            SmallVec::new()
        };
        TickReport { removed, notes }
    }

    /// Stop the transport and tear down audio. Safe to call more than once.
    pub fn dispose(&mut self) -> Vec<DisposalError> {
        self.sequencer.stop();
        let before = self.graph.state();
        let failures = self.graph.dispose();
        if before != GraphState::Disposed {
            self.events
                .emit(&UniverseEvent::AudioStateChanged(GraphState::Disposed));
        }
        failures
    }

    /// Register a change listener; dropping the returned handle unsubscribes.
    pub fn subscribe(&self, callback: impl FnMut(&UniverseEvent) + 'static) -> Subscription {
        self.events.subscribe(callback)
    }
}
