use universe_core::*;

fn edge_inputs() -> Vec<f32> {
    let mut values = vec![
        f32::NAN,
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::MAX,
        f32::MIN,
        -1e9,
        1e9,
        0.0,
        -0.0,
    ];
    for i in -200..=200 {
        values.push(i as f32 * 0.25);
    }
    values
}

#[test]
fn mapped_values_stay_inside_range_for_any_input() {
    let mut mappings = MappingTable::default().entries().to_vec();
    for (domain, range) in [
        ((0.0, 20.0), (-f32::MAX, f32::MAX)),
        ((-f32::MAX, f32::MAX), (0.0, 1.0)),
        ((-f32::MAX, f32::MAX), (-f32::MAX, f32::MAX)),
        ((0.0, f32::MIN_POSITIVE), (1.0, 2.0)),
    ] {
        mappings.push(
            AudioParameterMapping::new(PhysicsField::Gravity, AudioTarget::MasterGain, domain, range)
                .unwrap(),
        );
    }
    for mapping in &mappings {
        let (lo, hi) = mapping.range();
        for v in edge_inputs() {
            let out = mapping.apply(v);
            assert!(
                out.is_finite() && out >= lo && out <= hi,
                "{:?} mapped {v} to {out}, outside [{lo}, {hi}]",
                mapping.target()
            );
        }
    }
}

#[test]
fn default_gravity_mapping_endpoints() {
    let table = MappingTable::default();
    let m = table.find(AudioTarget::Frequency).unwrap();
    assert_eq!(m.source(), PhysicsField::Gravity);
    assert!((m.apply(0.0) - 200.0).abs() < 1e-3);
    assert!((m.apply(20.0) - 800.0).abs() < 1e-3);
    assert!((m.apply(10.0) - 500.0).abs() < 1e-3);
    // clamped into the domain first
    assert!((m.apply(-50.0) - 200.0).abs() < 1e-3);
    assert!((m.apply(75.0) - 800.0).abs() < 1e-3);
}

#[test]
fn invert_recovers_domain_value() {
    let table = MappingTable::default();
    let m = table.find(AudioTarget::FilterCutoff).unwrap();
    let x = 3.7;
    assert!((m.invert(m.apply(x)) - x).abs() < 1e-3);
}

#[test]
fn degenerate_domain_or_range_is_rejected() {
    assert_eq!(
        AudioParameterMapping::new(
            PhysicsField::Gravity,
            AudioTarget::Frequency,
            (5.0, 5.0),
            (0.0, 1.0)
        ),
        Err(ValidationError::InvalidDomain(5.0, 5.0))
    );
    assert!(matches!(
        AudioParameterMapping::new(
            PhysicsField::Gravity,
            AudioTarget::Frequency,
            (0.0, 1.0),
            (f32::NAN, 1.0)
        ),
        Err(ValidationError::InvalidRange(..))
    ));
}

#[test]
fn map_all_is_pure_and_covers_default_targets() {
    let params = PhysicsParameters::default();
    let table = MappingTable::default();
    let a = map_all(&params, &table);
    let b = map_all(&params, &table);
    assert_eq!(a, b);
    for target in [
        AudioTarget::Frequency,
        AudioTarget::FilterCutoff,
        AudioTarget::FilterResonance,
        AudioTarget::ReverbMix,
        AudioTarget::DelayFeedback,
        AudioTarget::DelayTime,
    ] {
        assert!(a.get(target).is_some(), "{} not mapped", target.name());
    }
    assert_eq!(a.get(AudioTarget::MasterGain), None);
    assert_eq!(a.len(), 6);
}

#[test]
fn custom_table_last_entry_wins() {
    let table = MappingTable::new(vec![
        AudioParameterMapping::new(
            PhysicsField::Gravity,
            AudioTarget::MasterGain,
            (0.0, 20.0),
            (0.0, 0.5),
        )
        .unwrap(),
        AudioParameterMapping::new(
            PhysicsField::Elasticity,
            AudioTarget::MasterGain,
            (0.0, 1.0),
            (0.0, 1.0),
        )
        .unwrap(),
    ]);
    let params = PhysicsParameters::default();
    let values = map_all(&params, &table);
    assert_eq!(values.get(AudioTarget::MasterGain), Some(params.elasticity));
}

#[test]
fn midi_and_transpose_agree_on_octaves() {
    let a4 = midi_to_hz(69.0);
    assert!((a4 - 440.0).abs() < 1e-4);
    assert!((transpose_hz(a4, 12) - 880.0).abs() < 1e-3);
    assert!((transpose_hz(a4, -12) - 220.0).abs() < 1e-3);
}

#[test]
fn generated_patterns_are_seeded_and_in_scale() {
    let a = generate_pattern(DORIAN, 32, 42);
    let b = generate_pattern(DORIAN, 32, 42);
    assert_eq!(a, b);
    assert_eq!(a.len(), 32);
    for note in &a {
        if !note.is_rest() {
            assert!(DORIAN.contains(&note.semitones));
            assert!(note.velocity > 0.0 && note.velocity <= 1.0);
        }
    }
    assert!(a.iter().any(|n| !n.is_rest()));
}

#[test]
fn every_mode_yields_in_scale_patterns() {
    let modes: [(&str, &[i32]); 7] = [
        ("ionian", IONIAN),
        ("dorian", DORIAN),
        ("phrygian", PHRYGIAN),
        ("lydian", LYDIAN),
        ("mixolydian", MIXOLYDIAN),
        ("aeolian", AEOLIAN),
        ("locrian", LOCRIAN),
    ];
    for (seed, (name, scale)) in modes.into_iter().enumerate() {
        assert_eq!(scale.len(), 8, "{name}");
        assert_eq!((scale[0], scale[7]), (0, 12), "{name} spans one octave");
        let pattern = generate_pattern(scale, 64, seed as u64);
        let sounding: Vec<_> = pattern.iter().filter(|n| !n.is_rest()).collect();
        assert!(!sounding.is_empty(), "{name}");
        assert!(
            sounding.iter().all(|n| scale.contains(&n.semitones)),
            "{name} produced an out-of-scale degree"
        );
    }
}
