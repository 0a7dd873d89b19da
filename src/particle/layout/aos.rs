//! Array-of-structs storage: one contiguous `Vec<ParticleRecord<U>>`.
//!
//! Simplest layout, best locality when a kernel touches most fields of a
//! particle at once (e.g. the integrator); worst locality for a kernel that
//! touches one field across many particles.

use crate::math::Vec3;
use crate::particle::{ParticleId, ParticleRecord, ParticleState, ParticleStore, ParticleType, UserData};

pub struct AoSStore<U: UserData> {
    particles: Vec<ParticleRecord<U>>,
    /// Dense id -> index map; ids are assigned 0..n at build time.
    id_to_index_map: Vec<u32>,
}

impl<U: UserData> AoSStore<U> {
    pub fn build(particles: Vec<ParticleRecord<U>>) -> Self {
        let mut id_to_index_map = vec![0u32; particles.len()];
        for (i, p) in particles.iter().enumerate() {
            id_to_index_map[p.id as usize] = i as u32;
        }
        Self {
            particles,
            id_to_index_map,
        }
    }

    pub fn particles(&self) -> &[ParticleRecord<U>] {
        &self.particles
    }
}

impl<U: UserData> ParticleStore<U> for AoSStore<U> {
    fn len(&self) -> usize {
        self.particles.len()
    }

    fn id_to_index(&self, id: ParticleId) -> Option<usize> {
        self.id_to_index_map.get(id as usize).map(|&i| i as usize)
    }

    fn index_to_id(&self, index: usize) -> ParticleId {
        self.particles[index].id
    }

    fn position(&self, index: usize) -> Vec3 {
        self.particles[index].position
    }

    fn velocity(&self, index: usize) -> Vec3 {
        self.particles[index].velocity
    }

    fn force(&self, index: usize) -> Vec3 {
        self.particles[index].force
    }

    fn old_position(&self, index: usize) -> Vec3 {
        self.particles[index].old_position
    }

    fn mass(&self, index: usize) -> f64 {
        self.particles[index].mass
    }

    fn state(&self, index: usize) -> ParticleState {
        self.particles[index].state
    }

    fn type_of(&self, index: usize) -> ParticleType {
        self.particles[index].type_
    }

    fn user_data(&self, index: usize) -> U {
        self.particles[index].user_data
    }

    fn set_position(&mut self, index: usize, v: Vec3) {
        self.particles[index].position = v;
    }

    fn set_velocity(&mut self, index: usize, v: Vec3) {
        self.particles[index].velocity = v;
    }

    fn set_force(&mut self, index: usize, v: Vec3) {
        self.particles[index].force = v;
    }

    fn set_old_position(&mut self, index: usize, v: Vec3) {
        self.particles[index].old_position = v;
    }

    fn set_state(&mut self, index: usize, s: ParticleState) {
        self.particles[index].state = s;
    }

    fn set_user_data(&mut self, index: usize, u: U) {
        self.particles[index].user_data = u;
    }

    fn reorder_storage(&mut self, permutation: &[usize]) {
        debug_assert_eq!(permutation.len(), self.particles.len());
        let reordered: Vec<ParticleRecord<U>> = permutation.iter().map(|&old| self.particles[old]).collect();
        self.particles = reordered;
        for (new_index, p) in self.particles.iter().enumerate() {
            self.id_to_index_map[p.id as usize] = new_index as u32;
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
    fn reorder_keeps_id_index_consistent() {
        let mut store = AoSStore::build(vec![particle(0, 0.0), particle(1, 1.0), particle(2, 2.0)]);
        store.reorder_storage(&[2, 0, 1]);
        assert_eq!(store.position(0).x, 2.0);
        for id in 0..3 {
            let idx = store.id_to_index(id).unwrap();
            assert_eq!(store.index_to_id(idx), id);
        }
    }
}
