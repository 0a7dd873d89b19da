//! The step driver: owns the container, the immutable force/boundary
//! tables, and the mutable collections of fields/controllers, and exposes
//! the one-shot physics operations an [`crate::integrator::Integrator`]
//! composes into a time step.

use crate::boundary::{Boundary, BoundaryTable, WallForce, ALL_FACES};
use crate::container::{Bcp, Container};
use crate::controller::{Controller, TriggerContext};
use crate::field::{dispatch_apply, Field};
use crate::force::ForceTable;
use crate::math::{index_axis, Box3, Vec3};
use crate::particle::{ParticleId, ParticleState, ParticleStore, UserData};

/// Read-only per-step context handed to fields and controllers: just enough
/// state (`time`, `step`) for a `Trigger`/`update` hook to make a decision
/// without borrowing the whole [`System`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemContext {
    time: f64,
    step: u64,
    /// Number of domain axes with nonzero extent; used by controllers (e.g.
    /// the thermostat's degrees-of-freedom count) that must behave
    /// correctly in a 1D or 2D simulation.
    dimensions: u8,
}

impl SystemContext {
    pub fn new(time: f64, step: u64, dimensions: u8) -> Self {
        Self { time, step, dimensions }
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[inline]
    pub fn dimensions(&self) -> u8 {
        self.dimensions
    }
}

/// Particles a field or pairwise kernel may touch: everything but a
/// particle already marked dead.
const EXERTING_OR_MOVABLE: ParticleState = ParticleState::from_bits_truncate(
    ParticleState::ALIVE.bits() | ParticleState::PASSIVE.bits() | ParticleState::STATIONARY.bits(),
);

/// Evaluates one pairwise interaction and applies a Newton-3 force update.
/// `bcp` has already resolved whichever periodic wrap this batch carries.
fn evaluate_pair<S: ParticleStore<U>, U: UserData>(store: &mut S, force_table: &ForceTable, bcp: &Bcp, i: usize, j: usize) {
    let ti = store.type_of(i);
    let tj = store.type_of(j);
    force_table.dispatch(ti, tj, |force| {
        let dr = bcp.apply(store.position(j) - store.position(i));
        let r2 = dr.length_squared();
        let cutoff = force.cutoff();
        if cutoff > 0.0 && r2 > cutoff * cutoff {
            return;
        }
        let charge_a = store.user_data(i).charge();
        let charge_b = store.user_data(j).charge();
        let f = force.eval(dr, store.mass(i), store.mass(j), charge_a, charge_b);
        store.add_force(i, f);
        store.add_force(j, -f);
    });
}

/// Topology (id-pair) forces are never periodic-wrapped: a declared bond
/// between two specific particles uses their raw displacement.
fn evaluate_id_pair<S: ParticleStore<U>, U: UserData>(store: &mut S, force_table: &ForceTable, i: usize, j: usize, id1: ParticleId, id2: ParticleId) {
    force_table.dispatch_id(id1, id2, |force| {
        let dr = store.position(j) - store.position(i);
        let r2 = dr.length_squared();
        let cutoff = force.cutoff();
        if cutoff > 0.0 && r2 > cutoff * cutoff {
            return;
        }
        let charge_a = store.user_data(i).charge();
        let charge_b = store.user_data(j).charge();
        let f = force.eval(dr, store.mass(i), store.mass(j), charge_a, charge_b);
        store.add_force(i, f);
        store.add_force(j, -f);
    });
}

/// Owns a [`Container`] plus the immutable force/boundary tables and the
/// mutable collections of fields/controllers that act on it each step.
pub struct System<C: Container<U>, W: WallForce, U: UserData> {
    domain: Box3,
    container: C,
    force_table: ForceTable,
    boundary_table: BoundaryTable<W>,
    fields: Vec<Box<dyn Field<U>>>,
    controllers: Vec<Box<dyn Controller<C::Store, U>>>,
    time: f64,
    step: u64,
    dimensions: u8,
}

impl<C: Container<U>, W: WallForce, U: UserData> System<C, W, U> {
    pub fn new(domain: Box3, container: C, force_table: ForceTable, boundary_table: BoundaryTable<W>, dimensions: u8) -> Self {
        Self {
            domain,
            container,
            force_table,
            boundary_table,
            fields: Vec::new(),
            controllers: Vec::new(),
            time: 0.0,
            step: 0,
            dimensions,
        }
    }

    pub fn add_field(&mut self, field: impl Field<U> + 'static) -> &mut Self {
        self.fields.push(Box::new(field));
        self
    }

    pub fn add_controller(&mut self, controller: impl Controller<C::Store, U> + 'static) -> &mut Self {
        self.controllers.push(Box::new(controller));
        self
    }

    pub fn domain(&self) -> &Box3 {
        &self.domain
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn force_table(&self) -> &ForceTable {
        &self.force_table
    }

    pub fn boundary_table(&self) -> &BoundaryTable<W> {
        &self.boundary_table
    }

    pub fn context(&self) -> SystemContext {
        SystemContext::new(self.time, self.step, self.dimensions)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Runs every field's and controller's `init` hook once, ahead of the
    /// first step. Kept separate from `new` so fields/controllers can be
    /// attached incrementally via [`Self::add_field`]/[`Self::add_controller`]
    /// first.
    pub fn init_components(&mut self) {
        let ctx = self.context();
        for field in &mut self.fields {
            field.init(&ctx);
        }
        for controller in &mut self.controllers {
            controller.init(&ctx, self.container.store_mut());
        }
    }

    /// Advances the simulation clock; called by an integrator once it has
    /// finished a full step (all substeps, for a multi-stage integrator).
    pub fn advance_clock(&mut self, dt: f64) {
        self.time += dt;
        self.step += 1;
    }

    /// Zeros every particle's force, then walks every interaction batch the
    /// container emits (pairwise, cutoff-checked, Newton-3) followed by
    /// every topology (id-pair) batch.
    ///
    /// Batches are materialized into an owned `Vec` before the pairwise
    /// sweep: the container only emits batches through `&self` (a batch
    /// describes index ranges, it doesn't borrow the store), while applying
    /// one needs `&mut` access to the store. Collecting first keeps that
    /// split without `unsafe` — one `Vec<Batch>`/`Vec<TopologyBatch>`
    /// allocation per call, not per pair.
    pub fn update_forces(&mut self) {
        let n = self.container.store().len();
        for i in 0..n {
            self.container.store_mut().set_force(i, Vec3::ZERO);
        }

        let mut batches: Vec<crate::container::Batch> = Vec::new();
        self.container.for_each_interaction_batch(|b| batches.push(b.clone()));

        for batch in &batches {
            for chunk in &batch.chunks {
                match chunk {
                    crate::container::BatchAtom::Range(r) => {
                        for i in r.clone() {
                            for j in (i + 1)..r.end {
                                evaluate_pair(self.container.store_mut(), &self.force_table, &batch.bcp, i, j);
                            }
                        }
                    }
                    crate::container::BatchAtom::RangePair(r1, r2) => {
                        for i in r1.clone() {
                            for j in r2.clone() {
                                evaluate_pair(self.container.store_mut(), &self.force_table, &batch.bcp, i, j);
                            }
                        }
                    }
                }
            }
        }

        let mut topology: Vec<crate::container::TopologyBatch> = Vec::new();
        self.container.for_each_topology_batch(|b| topology.push(b.clone()));

        for tb in &topology {
            for &(id1, id2) in &tb.pairs {
                let (i, j) = match (self.container.store().id_to_index(id1), self.container.store().id_to_index(id2)) {
                    (Some(i), Some(j)) => (i, j),
                    _ => continue,
                };
                evaluate_id_pair(self.container.store_mut(), &self.force_table, i, j, id1, id2);
            }
        }
    }

    /// For each face, gathers the particles in its compiled region, runs
    /// the exit-check for outside-half-space faces (`thickness < 0`) to
    /// disambiguate which face a corner-crossing particle actually exited
    /// through, then dispatches the boundary's `apply`.
    pub fn apply_boundary_conditions(&mut self) {
        let domain = self.domain;
        let mut any_moved = false;

        for face in ALL_FACES {
            let compiled = self.boundary_table.get(face);
            let region = compiled.region;
            let topology = compiled.topology;
            let boundary = compiled.boundary;

            let indices = self.container.collect_indices_in_region(&region);
            for i in indices {
                let (position, old_position) = {
                    let store = self.container.store();
                    (store.position(i), store.old_position(i))
                };

                if topology.thickness < 0.0 {
                    let ax = face.axis();
                    let diff_ax = index_axis(position, ax) - index_axis(old_position, ax);
                    if diff_ax == 0.0 {
                        continue;
                    }
                    let wall = if face.is_plus() { domain.max_axis(ax) } else { domain.min_axis(ax) };
                    let t = (wall - index_axis(old_position, ax)) / diff_ax;
                    let intersection = old_position + t * (position - old_position);
                    let (a1, a2) = face.non_face_axes();
                    let in_rect = domain.min_axis(a1) <= index_axis(intersection, a1)
                        && index_axis(intersection, a1) <= domain.max_axis(a1)
                        && domain.min_axis(a2) <= index_axis(intersection, a2)
                        && index_axis(intersection, a2) <= domain.max_axis(a2);
                    if !in_rect {
                        continue;
                    }
                }

                let store = self.container.store_mut();
                let mut position = store.position(i);
                let mut velocity = store.velocity(i);
                let mut force = store.force(i);
                let old_position = store.old_position(i);
                boundary.apply(&mut position, &mut velocity, old_position, &mut force, &domain, face);
                store.set_position(i, position);
                store.set_velocity(i, velocity);
                store.set_force(i, force);
                if matches!(boundary, Boundary::Absorb) {
                    store.set_state(i, ParticleState::DEAD);
                }
                if topology.may_change_particle_position {
                    any_moved = true;
                }
            }
        }

        if any_moved {
            self.container.notify_moved();
        }
    }

    /// Accumulates every registered field's contribution into `force`, for
    /// every particle able to move or exert force.
    pub fn apply_force_fields(&mut self) {
        if self.fields.is_empty() {
            return;
        }
        let n = self.container.store().len();
        for i in 0..n {
            if !self.container.store().state(i).intersects(EXERTING_OR_MOVABLE) {
                continue;
            }
            let mut delta = Vec3::ZERO;
            for field in &self.fields {
                let view = self.container.store().view(i, field.fields());
                delta += dispatch_apply(field.as_ref(), view);
            }
            self.container.store_mut().add_force(i, delta);
        }
    }

    /// Checks each controller's trigger against the current step/time and
    /// invokes `apply` on every one that fires.
    pub fn apply_controllers(&mut self) {
        let ctx = self.context();
        let trigger_ctx = TriggerContext::from(&ctx);
        for controller in &mut self.controllers {
            if controller.trigger().fires(trigger_ctx) {
                controller.apply(&ctx, self.container.store_mut());
            }
        }
    }

    /// Runs every field's per-step `update` hook, then every controller's
    /// triggered `apply`. Integrators call this once per step, after the
    /// force kernel, ahead of the clock advance.
    pub fn update_all_components(&mut self) {
        let ctx = self.context();
        for field in &mut self.fields {
            field.update(&ctx);
        }
        self.apply_controllers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::ExponentialWall;
    use crate::container::{DirectSum, PeriodicFlags};
    use crate::force::force_table::TypeInteraction;
    use crate::force::{Force, ForceTable, InteractionSchema};
    use crate::particle::{AoSStore, NoUserData, ParticleRecord};

    fn empty_schema() -> InteractionSchema {
        InteractionSchema {
            types: vec![0],
            ids: vec![],
            type_interaction_matrix: vec![0],
            id_interaction_matrix: vec![],
            interactions: vec![],
        }
    }

    fn force_table_single(force: Force) -> ForceTable {
        let mut type_map = rustc_hash::FxHashMap::default();
        type_map.insert(0u64, 0u16);
        ForceTable::build(
            vec![TypeInteraction { type1: 0, type2: 0, force }],
            vec![],
            &type_map,
            &rustc_hash::FxHashMap::default(),
        )
        .unwrap()
    }

    fn boundary_table_open(domain: &Box3) -> BoundaryTable<ExponentialWall> {
        BoundaryTable::build([crate::boundary::Boundary::Open; 6], domain)
    }

    #[test]
    fn lennard_jones_at_minimum_yields_zero_force() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let store = AoSStore::build(vec![
            ParticleRecord::new(0, 0, Vec3::ZERO, 1.0, NoUserData),
            ParticleRecord::new(1, 0, Vec3::new(2f64.powf(1.0 / 6.0), 0.0, 0.0), 1.0, NoUserData),
        ]);
        let ds = DirectSum::build(store, &domain, PeriodicFlags::default(), &empty_schema());
        let force_table = force_table_single(Force::lennard_jones(1.0, 1.0, Some(3.0)));
        let boundary_table = boundary_table_open(&domain);

        let mut system = System::new(domain, ds, force_table, boundary_table, 3);
        system.update_forces();

        let f0 = system.container().store().force(0);
        let f1 = system.container().store().force(1);
        assert!(f0.length() < 1e-9);
        assert!(f1.length() < 1e-9);
    }

    #[test]
    fn harmonic_chain_across_periodic_boundary_uses_minimum_image() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let store = AoSStore::build(vec![
            ParticleRecord::new(0, 0, Vec3::new(0.5, 5.0, 5.0), 1.0, NoUserData),
            ParticleRecord::new(1, 0, Vec3::new(9.5, 5.0, 5.0), 1.0, NoUserData),
        ]);
        let periodic = PeriodicFlags { x: true, y: false, z: false };
        let ds = DirectSum::build(store, &domain, periodic, &empty_schema());
        let force_table = force_table_single(Force::harmonic(1.0, 0.0, 2.0));
        let boundary_table = boundary_table_open(&domain);

        let mut system = System::new(domain, ds, force_table, boundary_table, 3);
        system.update_forces();

        let f0 = system.container().store().force(0);
        let f1 = system.container().store().force(1);
        assert!((f0.x - 1.0).abs() < 1e-9, "A.force.x was {}", f0.x);
        assert!((f1.x + 1.0).abs() < 1e-9, "B.force.x was {}", f1.x);
    }

    #[test]
    fn absorb_marks_corner_exit_dead_exactly_once() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let mut particle = ParticleRecord::new(0, 0, Vec3::new(10.2, 10.2, 5.0), 1.0, NoUserData);
        particle.old_position = Vec3::new(9.8, 9.8, 5.0);
        let store = AoSStore::build(vec![particle]);
        let ds = DirectSum::build(store, &domain, PeriodicFlags::default(), &empty_schema());
        let force_table = force_table_single(Force::NoForce);
        let boundary_table = BoundaryTable::build([crate::boundary::Boundary::Absorb; 6], &domain);

        let mut system = System::new(domain, ds, force_table, boundary_table, 3);
        system.apply_boundary_conditions();

        assert_eq!(system.container().store().state(0), ParticleState::DEAD);
    }
}
