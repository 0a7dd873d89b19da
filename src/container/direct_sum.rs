//! All-to-all container: every particle interacts with every other.
//!
//! The source splits direct-sum batches by type pair as a hot-path
//! optimization (sorting storage by type first). This port emits a single
//! domain-spanning symmetric batch instead; [`crate::system::System`]
//! dispatches the force table per visited pair regardless of batch
//! granularity, so the two are behaviorally identical — only the grouping
//! of work differs. See DESIGN.md.

use crate::container::{Batch, BatchAtom, BatchSymmetry, Bcp, Container, ParallelPolicy, TopologyBatch, UpdatePolicy};
use crate::math::Box3;
use crate::particle::{ParticleState, ParticleStore, UserData};

pub struct DirectSum<S, U> {
    store: S,
    periodic: crate::container::PeriodicFlags,
    domain_extent: crate::math::Vec3,
    topology_batches: Vec<TopologyBatch>,
    _marker: std::marker::PhantomData<U>,
}

impl<S: ParticleStore<U>, U: UserData> DirectSum<S, U> {
    pub fn build(
        store: S,
        domain: &Box3,
        periodic: crate::container::PeriodicFlags,
        schema: &crate::force::InteractionSchema,
    ) -> Self {
        log::info!("direct-sum container built over {} particles", store.len());
        Self {
            store,
            periodic,
            domain_extent: domain.extent,
            topology_batches: crate::container::topology_batches_from_schema(schema),
            _marker: std::marker::PhantomData,
        }
    }

    fn bcp(&self) -> Bcp {
        if self.periodic.any() {
            Bcp::MinimumImage {
                extent: self.domain_extent,
                px: self.periodic.x,
                py: self.periodic.y,
                pz: self.periodic.z,
            }
        } else {
            Bcp::Identity
        }
    }
}

impl<S: ParticleStore<U>, U: UserData> Container<U> for DirectSum<S, U> {
    type Store = S;

    fn store(&self) -> &S {
        &self.store
    }

    fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// DirectSum has no spatial structure to rebuild.
    fn rebuild_structure(&mut self) {}

    fn for_each_interaction_batch(&self, mut f: impl FnMut(&Batch)) {
        if self.store.len() < 2 {
            return;
        }
        let batch = Batch {
            symmetry: BatchSymmetry::Symmetric,
            parallel_policy: ParallelPolicy::InnerLoop,
            update_policy: UpdatePolicy::Serial,
            bcp: self.bcp(),
            chunks: vec![BatchAtom::Range(0..self.store.len())],
        };
        f(&batch);
    }

    fn for_each_topology_batch(&self, mut f: impl FnMut(&TopologyBatch)) {
        for batch in &self.topology_batches {
            f(batch);
        }
    }

    fn collect_indices_in_region(&self, region: &Box3) -> Vec<usize> {
        let mut indices = Vec::new();
        for i in 0..self.store.len() {
            if self.store.state(i) != ParticleState::DEAD && region.contains(self.store.position(i)) {
                indices.push(i);
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::particle::{AoSStore, NoUserData, ParticleRecord};

    fn schema() -> crate::force::InteractionSchema {
        crate::force::InteractionSchema {
            types: vec![0],
            ids: vec![],
            type_interaction_matrix: vec![0],
            id_interaction_matrix: vec![],
            interactions: vec![],
        }
    }

    #[test]
    fn emits_one_batch_spanning_all_particles() {
        let store = AoSStore::build(vec![
            ParticleRecord::new(0, 0, Vec3::ZERO, 1.0, NoUserData),
            ParticleRecord::new(1, 0, Vec3::new(1.0, 0.0, 0.0), 1.0, NoUserData),
        ]);
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let ds = DirectSum::build(store, &domain, crate::container::PeriodicFlags::default(), &schema());

        let mut count = 0;
        ds.for_each_interaction_batch(|batch| {
            count += 1;
            match &batch.chunks[0] {
                BatchAtom::Range(r) => assert_eq!(r.len(), 2),
                _ => panic!("expected a single range"),
            }
        });
        assert_eq!(count, 1);
    }
}
