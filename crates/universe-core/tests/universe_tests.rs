use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use universe_core::*;

fn make_universe() -> (Universe, OfflineDevice) {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = OfflineDevice::new();
    let universe = Universe::new(
        UniverseConfig::default(),
        AudioContext::new(48_000),
        Box::new(device.clone()),
    )
    .expect("default config is valid");
    (universe, device)
}

fn record_events(universe: &Universe) -> (Rc<RefCell<Vec<UniverseEvent>>>, Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let sub = universe.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));
    (seen, sub)
}

#[test]
fn invalid_config_is_rejected_once_at_construction() {
    let config = UniverseConfig {
        bounds: Bounds::new(10.0, 10.0, 5.0, 50.0),
        ..UniverseConfig::default()
    };
    let result = Universe::new(config, AudioContext::new(48_000), Box::new(OfflineDevice::new()));
    assert!(matches!(result, Err(ConfigError::InvalidBounds)));
}

#[test]
fn parameter_updates_remap_and_notify() {
    let (mut universe, _device) = make_universe();
    let (seen, _sub) = record_events(&universe);

    let params = universe.update_parameters(PhysicsParametersUpdate {
        gravity: Some(20.0),
        ..Default::default()
    });
    assert_eq!(params.gravity, 20.0);
    assert_eq!(universe.parameters().friction, PhysicsParameters::default().friction);
    let freq = universe.mapped_values().get(AudioTarget::Frequency).unwrap();
    assert!((freq - 800.0).abs() < 1e-3);
    assert!((universe.graph().base_frequency() - 800.0).abs() < 1e-3);
    assert_eq!(
        seen.borrow().as_slice(),
        &[UniverseEvent::ParametersChanged(params)]
    );

    // unchanged values do not re-notify
    universe.update_parameters(PhysicsParametersUpdate {
        gravity: Some(20.0),
        ..Default::default()
    });
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn dropping_subscription_stops_callbacks() {
    let (mut universe, _device) = make_universe();
    let (seen, sub) = record_events(&universe);
    universe.spawn_particle(100.0, 100.0, None, None).unwrap();
    assert_eq!(seen.borrow().len(), 1);
    drop(sub);
    universe.spawn_particle(120.0, 100.0, None, None).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn callback_may_drop_its_own_subscription() {
    let (mut universe, _device) = make_universe();
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let calls = Rc::new(RefCell::new(0));
    let (slot_in, calls_in) = (Rc::clone(&slot), Rc::clone(&calls));
    let sub = universe.subscribe(move |_| {
        *calls_in.borrow_mut() += 1;
        slot_in.borrow_mut().take();
    });
    *slot.borrow_mut() = Some(sub);
    universe.spawn_particle(100.0, 100.0, None, None);
    universe.spawn_particle(110.0, 100.0, None, None);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn blocked_audio_keeps_simulation_running_and_can_retry() {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = OfflineDevice::blocked("autoplay policy");
    let mut universe = Universe::new(
        UniverseConfig::default(),
        AudioContext::new(48_000),
        Box::new(device.clone()),
    )
    .unwrap();
    let (seen, _sub) = record_events(&universe);

    assert!(universe.initialize_audio().is_err());
    assert_eq!(universe.audio_state(), GraphState::Uninitialized);
    universe.spawn_particle(400.0, 300.0, Some(0.0), Some(0.0));
    universe.start_transport();
    let report = universe.tick(Duration::from_millis(16));
    assert!(report.notes.is_empty());
    assert_eq!(universe.particle_count(), 1);

    device.unblock();
    universe.initialize_audio().unwrap();
    assert_eq!(universe.audio_state(), GraphState::Initialized);
    assert!(seen
        .borrow()
        .contains(&UniverseEvent::AudioStateChanged(GraphState::Initialized)));
}

#[test]
fn tick_steps_particles_and_sequences_notes() {
    let (mut universe, device) = make_universe();
    universe.initialize_audio().unwrap();
    universe
        .add_force_field(ForceFieldSpec::vortex(400.0, 300.0, 200.0, 100.0))
        .unwrap();
    universe.spawn_particle(400.0, 250.0, Some(0.0), Some(0.0));
    universe.start_transport();

    let mut notes = 0;
    for _ in 0..60 {
        notes += universe.tick(Duration::from_millis(16)).notes.len();
        device.render(768);
    }
    assert!(notes > 0, "transport produced no notes");
    assert_eq!(universe.particle_count(), 1);
    let p = &universe.particle_snapshot()[0];
    assert!(p.position.x != 400.0, "vortex did not move the particle");
    assert_eq!(universe.particle_instances().len(), 1);
    assert!(universe.frequency_bands().bass.is_finite());
}

#[test]
fn force_field_edits_go_through_validation() {
    let (mut universe, _device) = make_universe();
    let id = universe
        .add_force_field(ForceFieldSpec::radial(10.0, 10.0, 30.0, 5.0))
        .unwrap();
    assert!(universe
        .update_force_field(
            id,
            ForceFieldUpdate {
                radius: Some(f32::NAN),
                ..Default::default()
            }
        )
        .is_err());
    assert_eq!(universe.force_fields()[0].radius, 30.0);
    universe.remove_force_field(id).unwrap();
    assert!(universe.force_fields().is_empty());
    assert!(universe.remove_force_field(id).is_err());
}

#[test]
fn dispose_twice_leaves_no_nodes() {
    let (mut universe, device) = make_universe();
    let (seen, _sub) = record_events(&universe);
    universe.initialize_audio().unwrap();
    universe.start_transport();
    assert!(universe.dispose().is_empty());
    assert!(universe.dispose().is_empty());
    assert_eq!(universe.graph().node_count(), 0);
    assert!(!universe.sequencer().is_running());
    assert!(!device.is_running());
    let disposed = seen
        .borrow()
        .iter()
        .filter(|e| **e == UniverseEvent::AudioStateChanged(GraphState::Disposed))
        .count();
    assert_eq!(disposed, 1);
    assert_eq!(universe.initialize_audio(), Err(InitializationError::Disposed));
}

#[test]
fn custom_mapping_table_is_applied() {
    let (universe, _device) = make_universe();
    let table = MappingTable::new(vec![AudioParameterMapping::new(
        PhysicsField::Elasticity,
        AudioTarget::MasterGain,
        (0.0, 1.0),
        (0.0, 0.5),
    )
    .unwrap()]);
    let universe = universe.with_mapping(table);
    let values = universe.mapped_values();
    assert_eq!(values.len(), 1);
    assert!((values.get(AudioTarget::MasterGain).unwrap() - 0.4).abs() < 1e-6);
}
