// Integration tests for the particle simulator and parameter merging.

use glam::Vec2;
use universe_core::constants::*;
use universe_core::*;

fn params_with(update: PhysicsParametersUpdate) -> PhysicsParameters {
    PhysicsParameters::default().merge(&update)
}

fn wide_bounds() -> Bounds {
    Bounds::new(-1000.0, -1000.0, 1000.0, 1000.0)
}

#[test]
fn ballistic_step_matches_semi_implicit_euler() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(9.81),
        air_resistance: Some(0.0),
        friction: Some(0.0),
        elasticity: Some(1.0),
        ..Default::default()
    });
    let mut sim = ParticleSimulator::new(wide_bounds(), 1);
    sim.spawn(100.0, 100.0, Some(0.0), Some(-150.0), &params)
        .expect("spawn");
    sim.step(1.0, &params, &[]);
    let p = &sim.snapshot()[0];
    assert!((p.position.y - -40.19).abs() < 0.1, "y = {}", p.position.y);
    assert!((p.position.x - 100.0).abs() < 1e-4);
}

#[test]
fn step_is_deterministic() {
    let params = PhysicsParameters::default();
    let mut fields = ForceFieldRegistry::new();
    fields
        .add(ForceFieldSpec::vortex(400.0, 300.0, 200.0, 50.0))
        .unwrap();
    fields
        .add(ForceFieldSpec::radial(200.0, 400.0, 150.0, -80.0).with_falloff(Falloff::Inverse))
        .unwrap();

    let mut a = ParticleSimulator::new(Bounds::default(), 7);
    for i in 0..20 {
        a.spawn(100.0 + i as f32 * 30.0, 200.0, None, None, &params);
    }
    let mut b = ParticleSimulator::new(Bounds::default(), 99);
    for p in a.snapshot() {
        b.spawn(
            p.position.x,
            p.position.y,
            Some(p.velocity.x),
            Some(p.velocity.y),
            &params,
        );
    }
    for _ in 0..120 {
        a.step(1.0 / 60.0, &params, fields.list());
        b.step(1.0 / 60.0, &params, fields.list());
    }
    let (sa, sb) = (a.snapshot(), b.snapshot());
    assert_eq!(sa.len(), sb.len());
    for (pa, pb) in sa.iter().zip(&sb) {
        assert_eq!(pa.position, pb.position);
        assert_eq!(pa.velocity, pb.velocity);
    }
}

#[test]
fn particle_at_exact_lifetime_survives_one_more_step() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(0.0),
        particle_lifetime: Some(1.0),
        ..Default::default()
    });
    let mut sim = ParticleSimulator::new(Bounds::default(), 3);
    sim.spawn(400.0, 300.0, Some(0.0), Some(0.0), &params)
        .unwrap();
    assert_eq!(sim.step(0.5, &params, &[]), 0);
    assert_eq!(sim.step(0.5, &params, &[]), 0);
    assert_eq!(sim.len(), 1, "age == lifetime must survive");
    assert_eq!(sim.step(0.5, &params, &[]), 1);
    assert!(sim.is_empty());
}

#[test]
fn spawn_respects_max_particles() {
    let params = params_with(PhysicsParametersUpdate {
        max_particles: Some(5),
        ..Default::default()
    });
    let mut sim = ParticleSimulator::new(Bounds::default(), 11);
    for i in 0..5 {
        assert!(
            sim.spawn(100.0 + i as f32, 100.0, None, None, &params).is_some(),
            "spawn {i} should succeed"
        );
    }
    assert!(sim.spawn(200.0, 100.0, None, None, &params).is_none());
    assert_eq!(sim.len(), 5);
}

#[test]
fn vortex_pushes_perpendicular_to_radius() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(0.0),
        air_resistance: Some(0.0),
        ..Default::default()
    });
    let mut fields = ForceFieldRegistry::new();
    fields
        .add(ForceFieldSpec::vortex(0.0, 0.0, 50.0, 10.0))
        .unwrap();
    let mut sim = ParticleSimulator::new(wide_bounds(), 5);
    sim.spawn(10.0, 0.0, Some(0.0), Some(0.0), &params)
        .unwrap();
    sim.step(0.1, &params, fields.list());
    let v = sim.snapshot()[0].velocity;
    assert!(v.dot(Vec2::X).abs() < 1e-6, "radial component {}", v.x);
    assert!(v.y > 0.0);
}

#[test]
fn floor_bounce_reflects_with_elasticity() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(0.0),
        air_resistance: Some(0.0),
        elasticity: Some(0.5),
        ..Default::default()
    });
    let mut sim = ParticleSimulator::new(Bounds::default(), 2);
    sim.spawn(400.0, 590.0, Some(0.0), Some(100.0), &params)
        .unwrap();
    sim.step(0.1, &params, &[]);
    let p = &sim.snapshot()[0];
    assert!(p.position.y + p.radius <= 600.0 + 1e-4);
    assert!((p.velocity.y - -50.0).abs() < 1e-3, "vy = {}", p.velocity.y);
}

#[test]
fn floor_contact_applies_friction_to_tangential_velocity() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(0.0),
        air_resistance: Some(0.0),
        friction: Some(0.5),
        elasticity: Some(0.5),
        ..Default::default()
    });
    let mut sim = ParticleSimulator::new(Bounds::default(), 2);
    sim.spawn(400.0, 590.0, Some(100.0), Some(100.0), &params)
        .unwrap();
    sim.step(0.1, &params, &[]);
    let p = &sim.snapshot()[0];
    assert!((p.velocity.x - 50.0).abs() < 1e-3, "vx = {}", p.velocity.x);
    assert!((p.velocity.y - -50.0).abs() < 1e-3, "vy = {}", p.velocity.y);
}

#[test]
fn side_walls_reflect_with_elasticity() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(0.0),
        air_resistance: Some(0.0),
        elasticity: Some(0.8),
        ..Default::default()
    });
    let bounds = Bounds::default();
    let mut sim = ParticleSimulator::new(bounds, 3);
    sim.spawn(bounds.max.x - 10.0, 300.0, Some(100.0), Some(0.0), &params)
        .unwrap();
    sim.spawn(bounds.min.x + 10.0, 300.0, Some(-100.0), Some(0.0), &params)
        .unwrap();
    sim.step(0.2, &params, &[]);
    let snap = sim.snapshot();
    let (right, left) = (&snap[0], &snap[1]);
    assert!((right.velocity.x - -80.0).abs() < 1e-3, "vx = {}", right.velocity.x);
    assert!((right.position.x - (bounds.max.x - right.radius)).abs() < 1e-4);
    assert!((left.velocity.x - 80.0).abs() < 1e-3, "vx = {}", left.velocity.x);
    assert!((left.position.x - (bounds.min.x + left.radius)).abs() < 1e-4);
    // friction only acts on floor contact
    assert_eq!(right.velocity.y, 0.0);
}

#[test]
fn particles_leaving_the_open_top_are_removed() {
    let params = params_with(PhysicsParametersUpdate {
        gravity: Some(0.0),
        ..Default::default()
    });
    let mut sim = ParticleSimulator::new(Bounds::default(), 4);
    sim.spawn(400.0, 10.0, Some(0.0), Some(-200.0), &params)
        .unwrap();
    let removed = sim.step(0.1, &params, &[]);
    assert_eq!(removed, 1);
    assert!(sim.is_empty());
}

#[test]
fn non_finite_spawn_is_rejected_and_state_stays_finite() {
    let params = PhysicsParameters::default();
    let mut sim = ParticleSimulator::new(Bounds::default(), 8);
    assert!(sim.spawn(f32::NAN, 10.0, None, None, &params).is_none());
    assert!(sim.spawn(10.0, 10.0, Some(f32::INFINITY), None, &params).is_none());
    for i in 0..50 {
        sim.spawn(50.0 + i as f32 * 10.0, 300.0, None, None, &params);
    }
    for _ in 0..600 {
        sim.step(1.0 / 60.0, &params, &[]);
        for p in sim.snapshot() {
            assert!(p.position.is_finite() && p.velocity.is_finite());
        }
    }
}

#[test]
fn omitted_velocities_fall_in_spawn_ranges() {
    let params = PhysicsParameters::default();
    let mut sim = ParticleSimulator::new(Bounds::default(), 21);
    for _ in 0..100 {
        let p = sim.spawn(400.0, 300.0, None, None, &params).unwrap();
        assert!(p.velocity.x >= SPAWN_VX_RANGE.0 && p.velocity.x <= SPAWN_VX_RANGE.1);
        assert!(p.velocity.y >= SPAWN_VY_RANGE.0 && p.velocity.y <= SPAWN_VY_RANGE.1);
        assert_eq!(p.radius, params.particle_size);
    }
}

#[test]
fn snapshot_is_detached_from_simulator() {
    let params = PhysicsParameters::default();
    let mut sim = ParticleSimulator::new(Bounds::default(), 1);
    sim.spawn(100.0, 100.0, Some(1.0), Some(1.0), &params);
    let mut snap = sim.snapshot();
    snap[0].position = Vec2::new(-5.0, -5.0);
    assert_eq!(sim.snapshot()[0].position, Vec2::new(100.0, 100.0));
    let instances = sim.instances();
    assert_eq!(instances[0].position, [100.0, 100.0]);
    assert_eq!(bytemuck::cast_slice::<_, u8>(&instances).len(), 32);
}

#[test]
fn merge_clamps_and_keeps_unspecified_fields() {
    let base = params_with(PhysicsParametersUpdate {
        friction: Some(0.3),
        ..Default::default()
    });
    let merged = base.merge(&PhysicsParametersUpdate {
        gravity: Some(1e6),
        particle_lifetime: Some(-4.0),
        density: Some(f32::NAN),
        ..Default::default()
    });
    assert_eq!(merged.gravity, GRAVITY_BOUNDS.1);
    assert_eq!(merged.particle_lifetime, PARTICLE_LIFETIME_BOUNDS.0);
    assert_eq!(merged.density, base.density, "NaN must be ignored");
    assert_eq!(merged.friction, 0.3);
    assert_eq!(merged.elasticity, base.elasticity);
}
