//! Environment assembly: turns a user's declared particles, interactions,
//! boundaries and domain into the dense, validated inputs a
//! [`crate::system::System`] is constructed from.
//!
//! This is the one place in the crate that deals in the user's *own*
//! identifiers (`u64` ids and types); everywhere else operates on the dense
//! `0..n` space assigned here.

pub mod generators;

pub use generators::{ParticleCuboid, ParticleEllipsoid};

use rustc_hash::FxHashMap;

use crate::boundary::{Boundary, BoundaryTable, Face, WallForce};
use crate::container::PeriodicFlags;
use crate::error::{BuildError, BuildResult};
use crate::field::Field;
use crate::force::force_table::{IdInteraction, TypeInteraction};
use crate::force::{self, Force, ForceTable, InteractionSchema};
use crate::math::{Box3, Vec3};
use crate::particle::{ParticleId, ParticleRecord, ParticleState, ParticleType, UserData};

/// A particle before dense id/type assignment: what a generator or a direct
/// `add_particle` call produces.
#[derive(Debug, Clone, Copy)]
pub struct ParticleSpec<U: UserData> {
    pub user_id: Option<u64>,
    pub user_type: u64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f64,
    pub state: ParticleState,
    pub user_data: U,
}

impl<U: UserData> ParticleSpec<U> {
    pub fn new(user_type: u64, position: Vec3, mass: f64) -> Self {
        Self {
            user_id: None,
            user_type,
            position,
            velocity: Vec3::ZERO,
            mass,
            state: ParticleState::ALIVE,
            user_data: U::default(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.user_id = Some(id);
        self
    }

    pub fn with_velocity(mut self, v: Vec3) -> Self {
        self.velocity = v;
        self
    }

    pub fn with_state(mut self, s: ParticleState) -> Self {
        self.state = s;
        self
    }

    pub fn with_user_data(mut self, u: U) -> Self {
        self.user_data = u;
        self
    }
}

/// Where a declared [`Force`] applies, in the user's own id/type space.
#[derive(Debug, Clone, Copy)]
pub enum InteractionScope {
    /// Diagonal entry: `force` between two particles of type `t`. Every
    /// type that appears in an off-diagonal [`InteractionScope::BetweenTypes`]
    /// must also carry a `ToType` entry, or mixing has nothing to mix from.
    ToType(u64),
    BetweenTypes(u64, u64),
    BetweenIds(u64, u64),
}

/// Explicit domain bounds, or a bounding-box fit with margins.
///
/// `Auto`'s margins combine by taking the larger resulting extent on each
/// axis when both are given; either may be omitted for a zero margin on
/// that measure.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum Domain {
    Fixed { origin: Vec3, extent: Vec3 },
    Auto { margin_abs: Option<Vec3>, margin_fac: Option<f64> },
}

impl Default for Domain {
    fn default() -> Self {
        Domain::Auto { margin_abs: None, margin_fac: None }
    }
}

/// Flags and schema the caller needs to construct whichever
/// [`crate::container::Container`] it wants, over the particles/domain this
/// environment produced.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContainerCreateInfo {
    pub periodic: PeriodicFlags,
    pub infinite_domain: bool,
    pub force_schema: InteractionSchema,
}

/// Everything [`Environment::build`] produces: dense particle records ready
/// for any [`crate::particle::ParticleStore`], the resolved domain, and the
/// immutable tables a [`crate::system::System`] is built from.
pub struct BuiltInputs<U: UserData, W: WallForce> {
    pub particles: Vec<ParticleRecord<U>>,
    pub type_map: FxHashMap<u64, ParticleType>,
    pub id_map: FxHashMap<u64, ParticleId>,
    pub simulation_box: Box3,
    pub boundary_table: BoundaryTable<W>,
    pub force_table: ForceTable,
    pub create_info: ContainerCreateInfo,
    pub fields: Vec<Box<dyn Field<U>>>,
}

/// Fluent assembly of an [`Environment`]; dimensions (2D/3D) are the
/// caller's concern via [`crate::system::System::new`], not this builder's.
pub struct Environment<U: UserData, W: WallForce = crate::boundary::ExponentialWall> {
    particles: Vec<ParticleSpec<U>>,
    type_interactions: Vec<TypeInteraction>,
    id_interactions: Vec<IdInteraction>,
    boundaries: [Boundary<W>; 6],
    domain: Domain,
    infinite_domain: bool,
    fields: Vec<Box<dyn Field<U>>>,
}

impl<U: UserData, W: WallForce> Default for Environment<U, W> {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
            type_interactions: Vec::new(),
            id_interactions: Vec::new(),
            boundaries: [Boundary::Open; 6],
            domain: Domain::default(),
            infinite_domain: false,
            fields: Vec::new(),
        }
    }
}

impl<U: UserData, W: WallForce> Environment<U, W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_particle(mut self, spec: ParticleSpec<U>) -> Self {
        self.particles.push(spec);
        self
    }

    pub fn add_particles(mut self, specs: impl IntoIterator<Item = ParticleSpec<U>>) -> Self {
        self.particles.extend(specs);
        self
    }

    pub fn add_cuboid(mut self, cuboid: &ParticleCuboid<U>) -> BuildResult<Self> {
        self.particles.extend(cuboid.to_particles()?);
        Ok(self)
    }

    pub fn add_ellipsoid(mut self, ellipsoid: &ParticleEllipsoid<U>) -> BuildResult<Self> {
        self.particles.extend(ellipsoid.to_particles()?);
        Ok(self)
    }

    pub fn with_interaction(mut self, force: Force, scope: InteractionScope) -> Self {
        match scope {
            InteractionScope::ToType(t) => self.type_interactions.push(TypeInteraction { type1: t, type2: t, force }),
            InteractionScope::BetweenTypes(t1, t2) => {
                self.type_interactions.push(TypeInteraction { type1: t1, type2: t2, force })
            }
            InteractionScope::BetweenIds(i1, i2) => self.id_interactions.push(IdInteraction { id1: i1, id2: i2, force }),
        }
        self
    }

    pub fn with_boundary(mut self, face: Face, boundary: Boundary<W>) -> Self {
        self.boundaries[face.as_index()] = boundary;
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn infinite_domain(mut self) -> Self {
        self.infinite_domain = true;
        self
    }

    pub fn with_field(mut self, field: impl Field<U> + 'static) -> Self {
        self.fields.push(Box::new(field));
        self
    }

    pub fn build(self) -> BuildResult<BuiltInputs<U, W>> {
        let mut seen_ids = std::collections::HashSet::new();
        for spec in &self.particles {
            if let Some(uid) = spec.user_id {
                if !seen_ids.insert(uid) {
                    return Err(BuildError::DuplicateId(uid));
                }
            }
        }

        let mut id_map: FxHashMap<u64, ParticleId> = FxHashMap::default();
        for (idx, spec) in self.particles.iter().enumerate() {
            if let Some(uid) = spec.user_id {
                id_map.insert(uid, idx as ParticleId);
            }
        }

        let mut type_map: FxHashMap<u64, ParticleType> = FxHashMap::default();
        let mut next_type: ParticleType = 0;
        for spec in &self.particles {
            type_map.entry(spec.user_type).or_insert_with(|| {
                let t = next_type;
                next_type += 1;
                t
            });
        }

        let particles: Vec<ParticleRecord<U>> = self
            .particles
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let mut record = ParticleRecord::new(idx as ParticleId, type_map[&spec.user_type], spec.position, spec.mass, spec.user_data);
                record.velocity = spec.velocity;
                record.state = spec.state;
                record
            })
            .collect();

        let simulation_box = resolve_domain(self.infinite_domain, self.domain, &particles);

        if !self.infinite_domain {
            for r in &particles {
                if !simulation_box.contains(r.position) {
                    return Err(BuildError::ParticleOutsideDomain(r.position.to_array()));
                }
            }
        }

        for axis in 0..3 {
            let minus = self.boundaries[axis * 2].topology();
            let plus = self.boundaries[axis * 2 + 1].topology();
            if minus.couples_axis != plus.couples_axis {
                return Err(BuildError::UncoupledPeriodicAxis(axis));
            }
        }
        let periodic = PeriodicFlags {
            x: self.boundaries[0].topology().force_wrap,
            y: self.boundaries[2].topology().force_wrap,
            z: self.boundaries[4].topology().force_wrap,
        };

        let max_cutoff = self
            .type_interactions
            .iter()
            .map(|t| t.force.cutoff())
            .filter(|c| *c > 0.0 && *c < force::NO_CUTOFF)
            .fold(0.0_f64, f64::max);
        if !self.infinite_domain && max_cutoff > 0.0 {
            for axis in 0..3 {
                let extent = simulation_box.extent_axis(axis);
                if max_cutoff > extent {
                    return Err(BuildError::DomainTooSmall { axis, extent, cutoff: max_cutoff });
                }
            }
        }

        let force_table = ForceTable::build(self.type_interactions, self.id_interactions, &type_map, &id_map)?;
        let force_schema = force_table.generate_schema();
        let boundary_table = BoundaryTable::build(self.boundaries, &simulation_box);

        log::info!(
            "environment built: {} particles, {} types, {} ids, domain extent {:?}",
            particles.len(),
            type_map.len(),
            id_map.len(),
            simulation_box.extent
        );

        Ok(BuiltInputs {
            particles,
            type_map,
            id_map,
            simulation_box,
            boundary_table,
            force_table,
            create_info: ContainerCreateInfo { periodic, infinite_domain: self.infinite_domain, force_schema },
            fields: self.fields,
        })
    }
}

fn resolve_domain<U: UserData>(infinite: bool, domain: Domain, particles: &[ParticleRecord<U>]) -> Box3 {
    if infinite {
        return Box3::new(Vec3::splat(f64::NEG_INFINITY), Vec3::splat(f64::INFINITY));
    }

    match domain {
        Domain::Fixed { origin, extent } => Box3::new(origin, origin + extent),
        Domain::Auto { margin_abs, margin_fac } => {
            let (mut bmin, mut bmax) = if particles.is_empty() {
                (Vec3::ZERO, Vec3::ZERO)
            } else {
                let mut bmin = Vec3::splat(f64::INFINITY);
                let mut bmax = Vec3::splat(f64::NEG_INFINITY);
                for r in particles {
                    bmin = bmin.min(r.position);
                    bmax = bmax.max(r.position);
                }
                (bmin, bmax)
            };

            let bbox_extent = bmax - bmin;
            let axis_margin = |extent_axis: f64, abs: Option<f64>, fac: Option<f64>| -> f64 {
                let from_abs = abs.unwrap_or(0.0);
                let from_fac = fac.map(|f| f * extent_axis).unwrap_or(0.0);
                from_abs.max(from_fac)
            };
            let margin = Vec3::new(
                axis_margin(bbox_extent.x, margin_abs.map(|v| v.x), margin_fac),
                axis_margin(bbox_extent.y, margin_abs.map(|v| v.y), margin_fac),
                axis_margin(bbox_extent.z, margin_abs.map(|v| v.z), margin_fac),
            );
            bmin -= margin;
            bmax += margin;
            Box3::new(bmin, bmax)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::NoUserData;

    #[test]
    fn duplicate_user_id_fails_build() {
        let env: Environment<NoUserData> = Environment::new()
            .add_particle(ParticleSpec::new(0, Vec3::ZERO, 1.0).with_id(1))
            .add_particle(ParticleSpec::new(0, Vec3::new(1.0, 0.0, 0.0), 1.0).with_id(1))
            .with_interaction(Force::lennard_jones(1.0, 1.0, Some(2.0)), InteractionScope::ToType(0))
            .with_domain(Domain::Fixed { origin: Vec3::ZERO, extent: Vec3::splat(10.0) });
        assert!(matches!(env.build(), Err(BuildError::DuplicateId(1))));
    }

    #[test]
    fn auto_domain_takes_larger_of_abs_and_fac_margin() {
        let env: Environment<NoUserData> = Environment::new()
            .add_particle(ParticleSpec::new(0, Vec3::ZERO, 1.0))
            .add_particle(ParticleSpec::new(0, Vec3::new(10.0, 0.0, 0.0), 1.0))
            .with_interaction(Force::NoForce, InteractionScope::ToType(0))
            .with_domain(Domain::Auto { margin_abs: Some(Vec3::splat(1.0)), margin_fac: Some(0.5) });
        let built = env.build().unwrap();
        // bbox extent on x is 10.0; margin_fac gives 5.0, margin_abs gives 1.0 -> 5.0 wins.
        assert!((built.simulation_box.min.x - (-5.0)).abs() < 1e-9);
        assert!((built.simulation_box.max.x - 15.0).abs() < 1e-9);
    }

    #[test]
    fn uncoupled_periodic_axis_is_a_build_error_not_just_debug_assert() {
        let env: Environment<NoUserData> = Environment::new()
            .add_particle(ParticleSpec::new(0, Vec3::splat(5.0), 1.0))
            .with_interaction(Force::NoForce, InteractionScope::ToType(0))
            .with_domain(Domain::Fixed { origin: Vec3::ZERO, extent: Vec3::splat(10.0) })
            .with_boundary(Face::XMinus, Boundary::Periodic);
        assert!(matches!(env.build(), Err(BuildError::UncoupledPeriodicAxis(0))));
    }

    #[test]
    fn particle_outside_domain_fails_build() {
        let env: Environment<NoUserData> = Environment::new()
            .add_particle(ParticleSpec::new(0, Vec3::splat(20.0), 1.0))
            .with_interaction(Force::NoForce, InteractionScope::ToType(0))
            .with_domain(Domain::Fixed { origin: Vec3::ZERO, extent: Vec3::splat(10.0) });
        assert!(matches!(env.build(), Err(BuildError::ParticleOutsideDomain(_))));
    }
}
