//! Chunked array-of-structs-of-arrays storage.
//!
//! Particles are grouped into fixed-size `ParticleChunk<U, N>`s, each
//! holding `N` parallel field arrays; the last chunk is padded with
//! [`ParticleRecord::sentinel`] entries so every chunk is full-width for a
//! SIMD-width kernel without a remainder branch. `N` must be a power of two
//! and at least 8 (`8 * 8 bytes = 64 bytes`, one AVX-512 register / cache
//! line) — checked per monomorphization with `static_assertions::const_assert!`
//! rather than a runtime assert, since the bound only depends on `N`, not on
//! any value only known after construction.

use crate::math::Vec3;
use crate::particle::{ParticleId, ParticleRecord, ParticleState, ParticleStore, ParticleType, UserData};
use static_assertions::const_assert;

pub const DEFAULT_CHUNK_SIZE: usize = 8;

#[derive(Clone)]
pub struct ParticleChunk<U: UserData, const N: usize> {
    pub position: [Vec3; N],
    pub velocity: [Vec3; N],
    pub force: [Vec3; N],
    pub old_position: [Vec3; N],
    pub mass: [f64; N],
    pub state: [ParticleState; N],
    pub type_: [ParticleType; N],
    pub id: [ParticleId; N],
    pub user_data: [U; N],
}

impl<U: UserData, const N: usize> ParticleChunk<U, N> {
    const_assert!(N.is_power_of_two() && N >= 8);

    fn filled_with_sentinel() -> Self {
        let sentinel = ParticleRecord::<U>::sentinel();
        Self {
            position: [sentinel.position; N],
            velocity: [sentinel.velocity; N],
            force: [sentinel.force; N],
            old_position: [sentinel.old_position; N],
            mass: [sentinel.mass; N],
            state: [sentinel.state; N],
            type_: [sentinel.type_; N],
            id: [sentinel.id; N],
            user_data: [sentinel.user_data; N],
        }
    }

    fn set(&mut self, lane: usize, p: ParticleRecord<U>) {
        self.position[lane] = p.position;
        self.velocity[lane] = p.velocity;
        self.force[lane] = p.force;
        self.old_position[lane] = p.old_position;
        self.mass[lane] = p.mass;
        self.state[lane] = p.state;
        self.type_[lane] = p.type_;
        self.id[lane] = p.id;
        self.user_data[lane] = p.user_data;
    }
}

pub struct AoSoAStore<U: UserData, const N: usize = DEFAULT_CHUNK_SIZE> {
    chunks: Vec<ParticleChunk<U, N>>,
    len: usize,
    id_to_index_map: Vec<u32>,
}

impl<U: UserData, const N: usize> AoSoAStore<U, N> {
    pub fn build(particles: Vec<ParticleRecord<U>>) -> Self {
        let len = particles.len();
        let n_chunks = len.div_ceil(N);
        let mut chunks = vec![ParticleChunk::<U, N>::filled_with_sentinel(); n_chunks];
        let mut id_to_index_map = vec![0u32; len];

        for (i, p) in particles.into_iter().enumerate() {
            id_to_index_map[p.id as usize] = i as u32;
            chunks[i / N].set(i % N, p);
        }

        Self {
            chunks,
            len,
            id_to_index_map,
        }
    }

    #[inline]
    fn loc(index: usize) -> (usize, usize) {
        (index / N, index % N)
    }
}

impl<U: UserData, const N: usize> ParticleStore<U> for AoSoAStore<U, N> {
    fn len(&self) -> usize {
        self.len
    }

    fn id_to_index(&self, id: ParticleId) -> Option<usize> {
        self.id_to_index_map.get(id as usize).map(|&i| i as usize)
    }

    fn index_to_id(&self, index: usize) -> ParticleId {
        let (c, l) = Self::loc(index);
        self.chunks[c].id[l]
    }

    fn position(&self, index: usize) -> Vec3 {
        let (c, l) = Self::loc(index);
        self.chunks[c].position[l]
    }

    fn velocity(&self, index: usize) -> Vec3 {
        let (c, l) = Self::loc(index);
        self.chunks[c].velocity[l]
    }

    fn force(&self, index: usize) -> Vec3 {
        let (c, l) = Self::loc(index);
        self.chunks[c].force[l]
    }

    fn old_position(&self, index: usize) -> Vec3 {
        let (c, l) = Self::loc(index);
        self.chunks[c].old_position[l]
    }

    fn mass(&self, index: usize) -> f64 {
        let (c, l) = Self::loc(index);
        self.chunks[c].mass[l]
    }

    fn state(&self, index: usize) -> ParticleState {
        let (c, l) = Self::loc(index);
        self.chunks[c].state[l]
    }

    fn type_of(&self, index: usize) -> ParticleType {
        let (c, l) = Self::loc(index);
        self.chunks[c].type_[l]
    }

    fn user_data(&self, index: usize) -> U {
        let (c, l) = Self::loc(index);
        self.chunks[c].user_data[l]
    }

    fn set_position(&mut self, index: usize, v: Vec3) {
        let (c, l) = Self::loc(index);
        self.chunks[c].position[l] = v;
    }

    fn set_velocity(&mut self, index: usize, v: Vec3) {
        let (c, l) = Self::loc(index);
        self.chunks[c].velocity[l] = v;
    }

    fn set_force(&mut self, index: usize, v: Vec3) {
        let (c, l) = Self::loc(index);
        self.chunks[c].force[l] = v;
    }

    fn set_old_position(&mut self, index: usize, v: Vec3) {
        let (c, l) = Self::loc(index);
        self.chunks[c].old_position[l] = v;
    }

    fn set_state(&mut self, index: usize, s: ParticleState) {
        let (c, l) = Self::loc(index);
        self.chunks[c].state[l] = s;
    }

    fn set_user_data(&mut self, index: usize, u: U) {
        let (c, l) = Self::loc(index);
        self.chunks[c].user_data[l] = u;
    }

    /// Packs particles densely across the whole store (`new_index` is a
    /// contiguous `0..len` position, not padded per bin), then overwrites
    /// `chunks` in place at that dense position. A caller binning by cell
    /// (e.g. [`crate::container::linked_cells::LinkedCells`]) gets exact
    /// `[bin_start..bin_end]` ranges out of this, not chunk-aligned ones —
    /// there is no per-bin sentinel padding here, so a bin boundary can fall
    /// mid-chunk. That's fine for a scalar kernel sweeping those ranges
    /// directly; it does mean the blocked, chunk-aligned per-cell batch
    /// layout is not implemented on top of this store.
    fn reorder_storage(&mut self, permutation: &[usize]) {
        debug_assert_eq!(permutation.len(), self.len);
        let records: Vec<ParticleRecord<U>> = permutation.iter().map(|&old| self.record(old)).collect();
        for (new_index, record) in records.into_iter().enumerate() {
            self.id_to_index_map[record.id as usize] = new_index as u32;
            let (c, l) = Self::loc(new_index);
            self.chunks[c].set(l, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::NoUserData;

    fn particle(id: u32, x: f64) -> ParticleRecord {
        ParticleRecord::new(id, 0, Vec3::new(x, 0.0, 0.0), 1.0, NoUserData)
    }

    #[test]
    fn pads_final_chunk_with_invalid_sentinels() {
        let store: AoSoAStore<NoUserData, 8> = AoSoAStore::build(vec![particle(0, 0.0), particle(1, 1.0)]);
        assert_eq!(store.chunks.len(), 1);
        assert!(store.chunks[0].state[2].contains(ParticleState::INVALID));
        assert!(store.chunks[0].position[2].x.is_infinite());
    }

    #[test]
    fn reorder_preserves_values_across_chunk_boundary() {
        let particles: Vec<_> = (0..10).map(|i| particle(i, i as f64)).collect();
        let mut store: AoSoAStore<NoUserData, 8> = AoSoAStore::build(particles);
        let mut perm: Vec<usize> = (0..10).collect();
        perm.reverse();
        store.reorder_storage(&perm);
        assert_eq!(store.position(0).x, 9.0);
        assert_eq!(store.position(9).x, 0.0);
    }
}
