//! Particle storage: the `ParticleStore` trait and its three interchangeable
//! layouts (AoS, SoA, AoSoA).
//!
//! The source models per-field access through a `FieldMask` template
//! parameter so that unused fields compile away entirely. Rust's type system
//! can reach the same destination only through heavy const-generic/macro
//! machinery disproportionate to this crate's scope (see DESIGN.md), so the
//! field mask here is carried at runtime and enforced with `debug_assert!`
//! rather than erased at compile time. The trait itself — one method per
//! field, default-provided `record`/`view`/`for_each_particle` built on top —
//! is unaffected by that choice and reads the same regardless of layout.

pub mod layout;
pub mod record;
pub mod state;

pub use layout::aos::AoSStore;
pub use layout::aosoa::AoSoAStore;
pub use layout::soa::SoAStore;
pub use record::{NoUserData, ParticleId, ParticleRecord, ParticleType, UserData};
pub use state::{FieldMask, ParticleState};

use crate::math::Vec3;

/// A snapshot of the fields named in `mask`; fields outside the mask still
/// hold a value (there is no uninitialized state to model) but reading them
/// is a contract violation, caught by `debug_assert!` in debug builds.
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<U: UserData> {
    mask: FieldMask,
    record: ParticleRecord<U>,
}

impl<U: UserData> ParticleView<U> {
    pub fn new(mask: FieldMask, record: ParticleRecord<U>) -> Self {
        Self { mask, record }
    }

    pub fn mask(&self) -> FieldMask {
        self.mask
    }

    pub fn id(&self) -> ParticleId {
        debug_assert!(self.mask.contains(FieldMask::ID));
        self.record.id
    }

    pub fn type_(&self) -> ParticleType {
        debug_assert!(self.mask.contains(FieldMask::TYPE));
        self.record.type_
    }

    pub fn position(&self) -> Vec3 {
        debug_assert!(self.mask.contains(FieldMask::POSITION));
        self.record.position
    }

    pub fn velocity(&self) -> Vec3 {
        debug_assert!(self.mask.contains(FieldMask::VELOCITY));
        self.record.velocity
    }

    pub fn force(&self) -> Vec3 {
        debug_assert!(self.mask.contains(FieldMask::FORCE));
        self.record.force
    }

    pub fn old_position(&self) -> Vec3 {
        debug_assert!(self.mask.contains(FieldMask::OLD_POSITION));
        self.record.old_position
    }

    pub fn mass(&self) -> f64 {
        debug_assert!(self.mask.contains(FieldMask::MASS));
        self.record.mass
    }

    pub fn state(&self) -> ParticleState {
        debug_assert!(self.mask.contains(FieldMask::STATE));
        self.record.state
    }

    pub fn user_data(&self) -> U {
        debug_assert!(self.mask.contains(FieldMask::USER_DATA));
        self.record.user_data
    }
}

/// Storage backend for a fixed-size population of particles.
///
/// Implementors own the layout (array-of-structs, struct-of-arrays, or
/// chunked array-of-structs-of-arrays); callers interact only through this
/// trait, so a container can be built generically over any of the three.
pub trait ParticleStore<U: UserData> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` if `id` was never assigned (ids are dense but a store may be
    /// queried with a stale id after particles are removed — removal is out
    /// of scope for this core, so in practice this is always `Some`).
    fn id_to_index(&self, id: ParticleId) -> Option<usize>;
    fn index_to_id(&self, index: usize) -> ParticleId;

    fn position(&self, index: usize) -> Vec3;
    fn velocity(&self, index: usize) -> Vec3;
    fn force(&self, index: usize) -> Vec3;
    fn old_position(&self, index: usize) -> Vec3;
    fn mass(&self, index: usize) -> f64;
    fn state(&self, index: usize) -> ParticleState;
    fn type_of(&self, index: usize) -> ParticleType;
    fn user_data(&self, index: usize) -> U;

    fn set_position(&mut self, index: usize, v: Vec3);
    fn set_velocity(&mut self, index: usize, v: Vec3);
    fn set_force(&mut self, index: usize, v: Vec3);
    fn set_old_position(&mut self, index: usize, v: Vec3);
    fn set_state(&mut self, index: usize, s: ParticleState);
    fn set_user_data(&mut self, index: usize, u: U);

    #[inline]
    fn add_force(&mut self, index: usize, delta: Vec3) {
        let f = self.force(index);
        self.set_force(index, f + delta);
    }

    /// Reindex storage in place so that `new[i] == old[permutation[i]]`;
    /// `permutation` must be a bijection on `0..len()`. Used by
    /// [`crate::container::linked_cells::LinkedCells`] to sort particles by
    /// cell for locality.
    fn reorder_storage(&mut self, permutation: &[usize]);

    fn record(&self, index: usize) -> ParticleRecord<U> {
        ParticleRecord {
            id: self.index_to_id(index),
            type_: self.type_of(index),
            position: self.position(index),
            velocity: self.velocity(index),
            force: self.force(index),
            old_position: self.old_position(index),
            mass: self.mass(index),
            state: self.state(index),
            user_data: self.user_data(index),
        }
    }

    fn view(&self, index: usize, mask: FieldMask) -> ParticleView<U> {
        ParticleView::new(mask, self.record(index))
    }

    /// Identical to [`ParticleStore::view`]; named separately to mirror the
    /// source's `restricted_at` (a mask-checked accessor, as opposed to the
    /// unchecked `at`).
    fn restricted_at(&self, index: usize, mask: FieldMask) -> ParticleView<U> {
        self.view(index, mask)
    }

    /// Visit every particle whose state intersects `filter`, in storage order.
    fn for_each_particle<F: FnMut(usize, ParticleRecord<U>)>(&self, filter: ParticleState, mut f: F) {
        for i in 0..self.len() {
            if self.state(i).intersects(filter) {
                f(i, self.record(i));
            }
        }
    }
}
