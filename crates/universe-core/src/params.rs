use crate::constants::*;

/// Immutable per-tick snapshot of the universe's physical parameters.
///
/// Values are always inside the sane bounds declared in `constants.rs`; the
/// only way to change them is [`PhysicsParameters::merge`], which clamps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsParameters {
    pub gravity: f32,
    pub friction: f32,
    pub elasticity: f32,
    pub air_resistance: f32,
    pub density: f32,
    pub time_scale: f32,
    pub particle_size: f32,
    pub max_particles: usize,
    pub particle_lifetime: f32,
}

impl Default for PhysicsParameters {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            friction: 0.1,
            elasticity: 0.8,
            air_resistance: 0.01,
            density: 1.0,
            time_scale: 1.0,
            particle_size: 5.0,
            max_particles: 500,
            particle_lifetime: 10.0,
        }
    }
}

/// Partial update; `None` fields keep their last-known-good value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicsParametersUpdate {
    pub gravity: Option<f32>,
    pub friction: Option<f32>,
    pub elasticity: Option<f32>,
    pub air_resistance: Option<f32>,
    pub density: Option<f32>,
    pub time_scale: Option<f32>,
    pub particle_size: Option<f32>,
    pub max_particles: Option<usize>,
    pub particle_lifetime: Option<f32>,
}

/// Names a scalar field of [`PhysicsParameters`], used as a mapping source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicsField {
    Gravity,
    Friction,
    Elasticity,
    AirResistance,
    Density,
    TimeScale,
    ParticleSize,
    MaxParticles,
    ParticleLifetime,
}

impl PhysicsField {
    pub const ALL: [PhysicsField; 9] = [
        PhysicsField::Gravity,
        PhysicsField::Friction,
        PhysicsField::Elasticity,
        PhysicsField::AirResistance,
        PhysicsField::Density,
        PhysicsField::TimeScale,
        PhysicsField::ParticleSize,
        PhysicsField::MaxParticles,
        PhysicsField::ParticleLifetime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PhysicsField::Gravity => "gravity",
            PhysicsField::Friction => "friction",
            PhysicsField::Elasticity => "elasticity",
            PhysicsField::AirResistance => "air_resistance",
            PhysicsField::Density => "density",
            PhysicsField::TimeScale => "time_scale",
            PhysicsField::ParticleSize => "particle_size",
            PhysicsField::MaxParticles => "max_particles",
            PhysicsField::ParticleLifetime => "particle_lifetime",
        }
    }
}

impl PhysicsParameters {
    /// Read a field as a scalar.
    pub fn get(&self, field: PhysicsField) -> f32 {
        match field {
            PhysicsField::Gravity => self.gravity,
            PhysicsField::Friction => self.friction,
            PhysicsField::Elasticity => self.elasticity,
            PhysicsField::AirResistance => self.air_resistance,
            PhysicsField::Density => self.density,
            PhysicsField::TimeScale => self.time_scale,
            PhysicsField::ParticleSize => self.particle_size,
            PhysicsField::MaxParticles => self.max_particles as f32,
            PhysicsField::ParticleLifetime => self.particle_lifetime,
        }
    }

    /// Return `self` with every field forced into its sane bounds.
    ///
    /// Non-finite values fall back to the defaults.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            gravity: clamp_or(self.gravity, GRAVITY_BOUNDS, defaults.gravity),
            friction: clamp_or(self.friction, FRICTION_BOUNDS, defaults.friction),
            elasticity: clamp_or(self.elasticity, ELASTICITY_BOUNDS, defaults.elasticity),
            air_resistance: clamp_or(
                self.air_resistance,
                AIR_RESISTANCE_BOUNDS,
                defaults.air_resistance,
            ),
            density: clamp_or(self.density, DENSITY_BOUNDS, defaults.density),
            time_scale: clamp_or(self.time_scale, TIME_SCALE_BOUNDS, defaults.time_scale),
            particle_size: clamp_or(
                self.particle_size,
                PARTICLE_SIZE_BOUNDS,
                defaults.particle_size,
            ),
            max_particles: self
                .max_particles
                .clamp(MAX_PARTICLES_BOUNDS.0, MAX_PARTICLES_BOUNDS.1),
            particle_lifetime: clamp_or(
                self.particle_lifetime,
                PARTICLE_LIFETIME_BOUNDS,
                defaults.particle_lifetime,
            ),
        }
    }

    /// Merge a partial update into this snapshot.
    ///
    /// Out-of-bounds values are clamped to the nearest bound. Non-finite
    /// values are ignored and the previous value is kept.
    pub fn merge(&self, update: &PhysicsParametersUpdate) -> Self {
        let mut next = *self;
        merge_field(&mut next.gravity, update.gravity, GRAVITY_BOUNDS, "gravity");
        merge_field(&mut next.friction, update.friction, FRICTION_BOUNDS, "friction");
        merge_field(
            &mut next.elasticity,
            update.elasticity,
            ELASTICITY_BOUNDS,
            "elasticity",
        );
        merge_field(
            &mut next.air_resistance,
            update.air_resistance,
            AIR_RESISTANCE_BOUNDS,
            "air_resistance",
        );
        merge_field(&mut next.density, update.density, DENSITY_BOUNDS, "density");
        merge_field(
            &mut next.time_scale,
            update.time_scale,
            TIME_SCALE_BOUNDS,
            "time_scale",
        );
        merge_field(
            &mut next.particle_size,
            update.particle_size,
            PARTICLE_SIZE_BOUNDS,
            "particle_size",
        );
        if let Some(max) = update.max_particles {
            next.max_particles = max.clamp(MAX_PARTICLES_BOUNDS.0, MAX_PARTICLES_BOUNDS.1);
        }
        merge_field(
            &mut next.particle_lifetime,
            update.particle_lifetime,
            PARTICLE_LIFETIME_BOUNDS,
            "particle_lifetime",
        );
        next
    }
}

fn merge_field(slot: &mut f32, value: Option<f32>, bounds: (f32, f32), name: &str) {
    let Some(v) = value else { return };
    if !v.is_finite() {
        log::warn!("[params] ignoring non-finite {name} = {v}");
        return;
    }
    let clamped = v.clamp(bounds.0, bounds.1);
    if clamped != v {
        log::debug!("[params] clamped {name} {v} -> {clamped}");
    }
    *slot = clamped;
}

#[inline]
fn clamp_or(value: f32, bounds: (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(bounds.0, bounds.1)
    } else {
        fallback
    }
}
