//! Force fields and their registry.
//!
//! Fields are created and edited by the UI collaborator and read by the
//! particle simulator. Unlike physics parameters, field definitions are
//! validated strictly: a bad field is a UI bug, not creative input.

use glam::Vec2;
use std::fmt;

use crate::error::ValidationError;

/// Stable identifier of a registered field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceFieldKind {
    /// Pushes along the vector from the field centre to the particle.
    Radial,
    /// Pushes along a fixed `angle` (radians).
    Directional,
    /// Pushes perpendicular to the radius vector, producing rotation.
    Vortex,
}

/// How influence decays with distance from the field centre.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Falloff {
    Linear,
    Inverse,
    InverseSquare,
}

impl Falloff {
    pub fn evaluate(self, distance: f32, radius: f32) -> f32 {
        match self {
            Falloff::Linear => 1.0 - distance / radius,
            Falloff::Inverse => 1.0 / (distance + 1.0),
            Falloff::InverseSquare => 1.0 / (distance * distance + 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceField {
    pub id: FieldId,
    pub kind: ForceFieldKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub strength: f32,
    pub falloff: Falloff,
    pub angle: f32,
}

/// Definition used to register a field; the registry assigns the id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceFieldSpec {
    pub kind: ForceFieldKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub strength: f32,
    pub falloff: Falloff,
    pub angle: f32,
}

impl ForceFieldSpec {
    pub fn radial(x: f32, y: f32, radius: f32, strength: f32) -> Self {
        Self {
            kind: ForceFieldKind::Radial,
            x,
            y,
            radius,
            strength,
            falloff: Falloff::Linear,
            angle: 0.0,
        }
    }

    pub fn vortex(x: f32, y: f32, radius: f32, strength: f32) -> Self {
        Self {
            kind: ForceFieldKind::Vortex,
            ..Self::radial(x, y, radius, strength)
        }
    }

    pub fn directional(x: f32, y: f32, radius: f32, strength: f32, angle: f32) -> Self {
        Self {
            kind: ForceFieldKind::Directional,
            angle,
            ..Self::radial(x, y, radius, strength)
        }
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }
}

/// Partial edit of a registered field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceFieldUpdate {
    pub kind: Option<ForceFieldKind>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub radius: Option<f32>,
    pub strength: Option<f32>,
    pub falloff: Option<Falloff>,
    pub angle: Option<f32>,
}

impl ForceField {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Push (per second, before density scaling) felt by a particle at `position`.
    ///
    /// `None` when the particle is outside the field. A particle exactly at the
    /// centre of a radial or vortex field has no defined direction and gets
    /// `Vec2::ZERO`.
    pub fn force_at(&self, position: Vec2) -> Option<Vec2> {
        let delta = position - self.center();
        let distance = delta.length();
        if distance > self.radius {
            return None;
        }
        let scale = self.falloff.evaluate(distance, self.radius) * self.strength;
        let direction = match self.kind {
            ForceFieldKind::Directional => Vec2::new(self.angle.cos(), self.angle.sin()),
            ForceFieldKind::Radial if distance > 0.0 => delta / distance,
            ForceFieldKind::Vortex if distance > 0.0 => Vec2::new(-delta.y, delta.x) / distance,
            _ => Vec2::ZERO,
        };
        Some(direction * scale)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ValidationError::InvalidRadius(self.radius));
        }
        if !self.strength.is_finite() {
            return Err(ValidationError::NonFiniteStrength(self.strength));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ValidationError::NonFinitePosition(self.x, self.y));
        }
        if !self.angle.is_finite() {
            return Err(ValidationError::NonFiniteAngle(self.angle));
        }
        Ok(())
    }
}

/// Owns the active force fields.
#[derive(Debug, Default)]
pub struct ForceFieldRegistry {
    fields: Vec<ForceField>,
    next_id: u64,
}

impl ForceFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a field, returning its id.
    pub fn add(&mut self, spec: ForceFieldSpec) -> Result<FieldId, ValidationError> {
        let id = FieldId(self.next_id);
        let field = ForceField {
            id,
            kind: spec.kind,
            x: spec.x,
            y: spec.y,
            radius: spec.radius,
            strength: spec.strength,
            falloff: spec.falloff,
            angle: spec.angle,
        };
        field.validate()?;
        self.next_id += 1;
        self.fields.push(field);
        log::debug!("[fields] added {:?} field {id}", field.kind);
        Ok(id)
    }

    pub fn remove(&mut self, id: FieldId) -> Result<ForceField, ValidationError> {
        let idx = self.index_of(id)?;
        log::debug!("[fields] removed field {id}");
        Ok(self.fields.remove(idx))
    }

    /// Apply a partial edit. The merged field is validated before it replaces
    /// the stored one, so a rejected update leaves the field untouched.
    pub fn update(
        &mut self,
        id: FieldId,
        update: ForceFieldUpdate,
    ) -> Result<ForceField, ValidationError> {
        let idx = self.index_of(id)?;
        let current = self.fields[idx];
        let next = ForceField {
            id,
            kind: update.kind.unwrap_or(current.kind),
            x: update.x.unwrap_or(current.x),
            y: update.y.unwrap_or(current.y),
            radius: update.radius.unwrap_or(current.radius),
            strength: update.strength.unwrap_or(current.strength),
            falloff: update.falloff.unwrap_or(current.falloff),
            angle: update.angle.unwrap_or(current.angle),
        };
        next.validate()?;
        self.fields[idx] = next;
        Ok(next)
    }

    pub fn get(&self, id: FieldId) -> Option<&ForceField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Read-only view in insertion order.
    pub fn list(&self) -> &[ForceField] {
        &self.fields
    }

    /// Owned copy, taken by the simulator at the start of each step.
    pub fn snapshot(&self) -> Vec<ForceField> {
        self.fields.clone()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn index_of(&self, id: FieldId) -> Result<usize, ValidationError> {
        self.fields
            .iter()
            .position(|f| f.id == id)
            .ok_or(ValidationError::UnknownField(id))
    }
}
