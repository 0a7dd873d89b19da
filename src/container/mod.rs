//! Containers wrap a [`ParticleStore`] and emit *interaction batches*: index
//! ranges (or cell-pair chunks) over which pairwise forces must be
//! evaluated, each carrying a boundary-coordinate-projector (BCP) for
//! periodic minimum-image correction.

pub mod cell_ordering;
pub mod direct_sum;
pub mod linked_cells;

pub use cell_ordering::{CellOrdering, Identity, Morton};
pub use direct_sum::DirectSum;
pub use linked_cells::LinkedCells;

use std::ops::Range;

use crate::force::InteractionSchema;
use crate::math::{Box3, Vec3};
use crate::particle::{ParticleId, ParticleStore, UserData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSymmetry {
    /// Pairs drawn from a single index range; only `i < j` is visited.
    Symmetric,
    /// Pairs drawn from the Cartesian product of two disjoint ranges.
    Asymmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Run on the calling thread; the caller owns any parallelism.
    None,
    /// Parallelize over particle indices within each chunk.
    InnerLoop,
    /// Parallelize over the chunk list itself.
    Chunks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Plain `+=`; valid only when no two concurrently-executing chunks can
    /// touch the same particle.
    Serial,
    /// Fetch-and-add; required whenever concurrent writes to the same
    /// particle are possible.
    Atomic,
}

/// One atom of work within a [`Batch`]: either a single range (symmetric,
/// `i < j` within it) or a pair of disjoint ranges (asymmetric, full
/// product).
#[derive(Debug, Clone)]
pub enum BatchAtom {
    Range(Range<usize>),
    RangePair(Range<usize>, Range<usize>),
}

/// Boundary-coordinate-projector: corrects a raw `r_ab` displacement for
/// periodic wrap before a force law ever sees it.
#[derive(Debug, Clone, Copy)]
pub enum Bcp {
    Identity,
    MinimumImage { extent: Vec3, px: bool, py: bool, pz: bool },
    /// Exact per-cell-pair shift, already known from the wrap computed when
    /// the pair was registered — cheaper than re-deriving it per pair via
    /// `round()`.
    Shift(Vec3),
}

impl Bcp {
    #[inline]
    pub fn apply(&self, dr: Vec3) -> Vec3 {
        match *self {
            Bcp::Identity => dr,
            Bcp::MinimumImage { extent, px, py, pz } => crate::math::minimum_image(dr, extent, px, py, pz),
            Bcp::Shift(shift) => dr + shift,
        }
    }
}

/// A group of chunks sharing symmetry/policy/BCP, produced by a container
/// for one `(type1, type2)` pair (or, in the simplified type-agnostic
/// grouping used here, for one locality group — see DESIGN.md).
#[derive(Debug, Clone)]
pub struct Batch {
    pub symmetry: BatchSymmetry,
    pub parallel_policy: ParallelPolicy,
    pub update_policy: UpdatePolicy,
    pub bcp: Bcp,
    pub chunks: Vec<BatchAtom>,
}

/// A force declared between two specific particle ids, carried as a
/// pre-resolved pair list so the per-step kernel can look the particles up
/// by id without re-scanning the schema.
#[derive(Debug, Clone)]
pub struct TopologyBatch {
    pub id1: ParticleId,
    pub id2: ParticleId,
    pub pairs: Vec<(ParticleId, ParticleId)>,
}

/// Derives the id-pair topology batches shared by every container
/// implementation: one batch per schema entry that has at least one
/// registered id pair.
pub fn topology_batches_from_schema(schema: &InteractionSchema) -> Vec<TopologyBatch> {
    schema
        .interactions
        .iter()
        .filter(|prop| prop.is_active && !prop.used_by_ids.is_empty())
        .map(|prop| TopologyBatch {
            id1: prop.used_by_ids[0].0,
            id2: prop.used_by_ids[0].1,
            pairs: prop.used_by_ids.clone(),
        })
        .collect()
}

pub trait Container<U: UserData> {
    type Store: ParticleStore<U>;

    fn store(&self) -> &Self::Store;
    fn store_mut(&mut self) -> &mut Self::Store;

    /// Re-derives spatial structure (cell binning, sorted order) from the
    /// particles' current positions. A no-op for [`DirectSum`].
    fn rebuild_structure(&mut self);

    fn for_each_interaction_batch(&self, f: impl FnMut(&Batch));
    fn for_each_topology_batch(&self, f: impl FnMut(&TopologyBatch));

    /// Indices of every non-`DEAD` particle whose position lies in `region`.
    fn collect_indices_in_region(&self, region: &Box3) -> Vec<usize>;

    /// Called after `apply_boundary_conditions` if any face's topology
    /// flagged `may_change_particle_position`. Both containers in this crate
    /// fully rebuild their structure at the top of every integrator step
    /// regardless, so this is bookkeeping-only and defaults to a no-op.
    fn notify_moved(&mut self) {}
}

/// Periodicity flags derived from the boundary table: an axis is periodic
/// iff both its faces are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PeriodicFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl PeriodicFlags {
    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }
}
