//! 2D particle simulation driven by the universe's physics parameters.
//!
//! `step` is a pure function of `(particles, fields, params, dt)`: the only
//! randomness lives in `spawn`, where omitted velocities and colours are drawn
//! from a seeded RNG.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::prelude::*;

use crate::constants::*;
use crate::fields::ForceField;
use crate::params::PhysicsParameters;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub color: [f32; 4],
    /// Simulation time (seconds) at which the particle was spawned.
    pub created_at: f64,
}

impl Particle {
    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }

    fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Per-particle record laid out for GPU instance buffers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    pub radius: f32,
    pub age: f32,
    pub color: [f32; 4],
}

/// Axis-aligned simulation area in screen space (+y points down, toward the floor).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::from(DEFAULT_BOUNDS_SIZE),
        }
    }
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max.cmpgt(self.min).all()
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

pub struct ParticleSimulator {
    particles: Vec<Particle>,
    bounds: Bounds,
    rng: StdRng,
    next_id: u64,
    time: f64,
}

impl ParticleSimulator {
    pub fn new(bounds: Bounds, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            bounds,
            rng: StdRng::seed_from_u64(seed),
            next_id: 0,
            time: 0.0,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Simulation clock in seconds (sum of every `dt` passed to `step`).
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Spawn a particle at `(x, y)`.
    ///
    /// Returns `None` when the population is already at `max_particles` or the
    /// coordinates are not finite. Omitted velocity components are randomized.
    pub fn spawn(
        &mut self,
        x: f32,
        y: f32,
        vx: Option<f32>,
        vy: Option<f32>,
        params: &PhysicsParameters,
    ) -> Option<Particle> {
        if self.particles.len() >= params.max_particles {
            log::debug!(
                "[sim] spawn rejected: {} particles at cap {}",
                self.particles.len(),
                params.max_particles
            );
            return None;
        }
        let position = Vec2::new(x, y);
        let velocity = Vec2::new(
            vx.unwrap_or_else(|| self.rng.gen_range(SPAWN_VX_RANGE.0..=SPAWN_VX_RANGE.1)),
            vy.unwrap_or_else(|| self.rng.gen_range(SPAWN_VY_RANGE.0..=SPAWN_VY_RANGE.1)),
        );
        if !position.is_finite() || !velocity.is_finite() {
            log::warn!("[sim] spawn rejected: non-finite state {position} {velocity}");
            return None;
        }
        let color = *PARTICLE_PALETTE
            .choose(&mut self.rng)
            .unwrap_or(&PARTICLE_PALETTE[0]);
        let particle = Particle {
            id: ParticleId(self.next_id),
            position,
            velocity,
            radius: params.particle_size,
            color,
            created_at: self.time,
        };
        self.next_id += 1;
        self.particles.push(particle.clone());
        Some(particle)
    }

    /// Advance every particle by `dt` seconds. Returns how many were removed.
    pub fn step(&mut self, dt: f32, params: &PhysicsParameters, fields: &[ForceField]) -> usize {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("[sim] ignoring step with dt = {dt}");
            return 0;
        }
        self.time += dt as f64;

        let drag = (1.0 - params.air_resistance * dt).max(0.0);
        let inv_density = 1.0 / params.density.max(DENSITY_BOUNDS.0);
        let bounds = self.bounds;

        for p in &mut self.particles {
            // Semi-implicit Euler: velocity first, then position with the new velocity
            p.velocity.y += params.gravity * dt;
            p.velocity *= drag;
            for field in fields {
                if let Some(force) = field.force_at(p.position) {
                    p.velocity += force * dt * inv_density;
                }
            }
            p.position += p.velocity * dt * params.time_scale;
            resolve_collisions(p, &bounds, params);
        }

        let now = self.time;
        let lifetime = params.particle_lifetime as f64;
        let before = self.particles.len();
        self.particles
            .retain(|p| p.is_finite() && p.age(now) <= lifetime && bounds.contains(p.position));
        let removed = before - self.particles.len();
        if removed > 0 {
            log::trace!("[sim] removed {removed} particles at t={now:.3}");
        }
        removed
    }

    /// Owned copy of the live particles; mutating it has no effect on the simulator.
    pub fn snapshot(&self) -> Vec<Particle> {
        self.particles.clone()
    }

    pub fn instances(&self) -> Vec<ParticleInstance> {
        self.particles
            .iter()
            .map(|p| ParticleInstance {
                position: p.position.to_array(),
                radius: p.radius,
                age: p.age(self.time) as f32,
                color: p.color,
            })
            .collect()
    }
}

/// Reflect off the floor and side walls. The top edge is open.
fn resolve_collisions(p: &mut Particle, bounds: &Bounds, params: &PhysicsParameters) {
    if !p.is_finite() {
        return;
    }
    let r = p.radius;
    if p.position.y + r > bounds.max.y {
        p.position.y = bounds.max.y - r;
        p.velocity.y = -p.velocity.y.abs() * params.elasticity;
        p.velocity.x *= 1.0 - params.friction;
    }
    if p.position.x - r < bounds.min.x {
        p.position.x = bounds.min.x + r;
        p.velocity.x = p.velocity.x.abs() * params.elasticity;
    } else if p.position.x + r > bounds.max.x {
        p.position.x = bounds.max.x - r;
        p.velocity.x = -p.velocity.x.abs() * params.elasticity;
    }
}
