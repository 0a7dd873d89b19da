//! External force fields: rules that add to (never read back) a particle's
//! `force` each step, independent of any pairwise interaction.
//!
//! A field only ever writes `force`; [`RestrictedParticleRef`] enforces that
//! by handing out a private delta accumulator rather than a reference into
//! the store, and the rest of a field's declared mask is read-only.

use crate::math::{Box3, Vec3};
use crate::particle::{FieldMask, ParticleView, UserData};
use crate::system::SystemContext;

/// A mask-restricted view of one particle passed to [`Field::apply`]: every
/// field named in [`Field::fields`] is readable, and `force` accumulates
/// through [`RestrictedParticleRef::add_force`] rather than being writable
/// directly.
pub struct RestrictedParticleRef<U: UserData> {
    view: ParticleView<U>,
    delta: Vec3,
}

impl<U: UserData> RestrictedParticleRef<U> {
    fn new(view: ParticleView<U>) -> Self {
        Self { view, delta: Vec3::ZERO }
    }

    pub fn position(&self) -> Vec3 {
        self.view.position()
    }

    pub fn velocity(&self) -> Vec3 {
        self.view.velocity()
    }

    pub fn mass(&self) -> f64 {
        self.view.mass()
    }

    pub fn user_data(&self) -> U {
        self.view.user_data()
    }

    pub fn add_force(&mut self, delta: Vec3) {
        self.delta += delta;
    }

    pub fn into_delta(self) -> Vec3 {
        self.delta
    }
}

/// An external field contributing to every (or a region-restricted subset
/// of) particle's force each step.
///
/// `init`/`update` default to no-ops; most fields only need `apply`.
pub trait Field<U: UserData>: Send + Sync {
    /// Fields readable from [`RestrictedParticleRef`] during `apply`. `force`
    /// is always implicitly available through `add_force` and need not be
    /// named here.
    fn fields(&self) -> FieldMask {
        FieldMask::NONE
    }

    fn init(&mut self, _ctx: &SystemContext) {}

    fn update(&mut self, _ctx: &SystemContext) {}

    fn apply(&self, particle: &mut RestrictedParticleRef<U>);
}

/// Runs `field` against a single particle view, returning the accumulated
/// force delta. Used by [`crate::system::System::apply_force_fields`].
pub fn dispatch_apply<U: UserData>(field: &dyn Field<U>, view: ParticleView<U>) -> Vec3 {
    let mut restricted = RestrictedParticleRef::new(view);
    field.apply(&mut restricted);
    restricted.into_delta()
}

/// A constant force applied to every particle unconditionally, e.g. gravity.
pub struct UniformField {
    force: Vec3,
}

impl UniformField {
    pub fn new(force: Vec3) -> Self {
        Self { force }
    }
}

impl<U: UserData> Field<U> for UniformField {
    fn apply(&self, particle: &mut RestrictedParticleRef<U>) {
        particle.add_force(self.force);
    }
}

/// A constant force applied only to particles inside `region`, and only
/// while the simulation clock sits in `[start_time, stop_time)`.
pub struct LocalForceField {
    force: Vec3,
    region: Box3,
    start_time: f64,
    stop_time: f64,
    active: bool,
}

impl LocalForceField {
    pub fn new(force: Vec3, region: Box3, start_time: f64, stop_time: f64) -> Self {
        Self {
            force,
            region,
            start_time,
            stop_time,
            active: start_time == 0.0,
        }
    }
}

impl<U: UserData> Field<U> for LocalForceField {
    fn fields(&self) -> FieldMask {
        FieldMask::POSITION
    }

    fn update(&mut self, ctx: &SystemContext) {
        self.active = ctx.time() >= self.start_time && ctx.time() < self.stop_time;
    }

    fn apply(&self, particle: &mut RestrictedParticleRef<U>) {
        if self.active && self.region.contains(particle.position()) {
            particle.add_force(self.force);
        }
    }
}
