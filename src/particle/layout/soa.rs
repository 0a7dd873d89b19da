//! Struct-of-arrays storage: one `Vec<T>` per field.
//!
//! The source splits each vector field further into per-component (`x`/`y`/
//! `z`) arrays for raw SIMD lanes; here `Vec3` is `glam::DVec3`, already a
//! packed SIMD type with autovectorizing arithmetic, so splitting it further
//! would only fight `glam`'s own vectorization without a compile-time
//! specialized kernel to exploit the narrower layout. This SoA is field-level
//! rather than scalar-component-level — see DESIGN.md.

use crate::math::Vec3;
use crate::particle::{ParticleId, ParticleRecord, ParticleState, ParticleStore, ParticleType, UserData};

pub struct SoAStore<U: UserData> {
    position: Vec<Vec3>,
    velocity: Vec<Vec3>,
    force: Vec<Vec3>,
    old_position: Vec<Vec3>,
    mass: Vec<f64>,
    state: Vec<ParticleState>,
    type_: Vec<ParticleType>,
    id: Vec<ParticleId>,
    user_data: Vec<U>,
    id_to_index_map: Vec<u32>,
}

impl<U: UserData> SoAStore<U> {
    pub fn build(particles: Vec<ParticleRecord<U>>) -> Self {
        let n = particles.len();
        let mut store = Self {
            position: Vec::with_capacity(n),
            velocity: Vec::with_capacity(n),
            force: Vec::with_capacity(n),
            old_position: Vec::with_capacity(n),
            mass: Vec::with_capacity(n),
            state: Vec::with_capacity(n),
            type_: Vec::with_capacity(n),
            id: Vec::with_capacity(n),
            user_data: Vec::with_capacity(n),
            id_to_index_map: vec![0u32; n],
        };
        for (i, p) in particles.into_iter().enumerate() {
            store.id_to_index_map[p.id as usize] = i as u32;
            store.position.push(p.position);
            store.velocity.push(p.velocity);
            store.force.push(p.force);
            store.old_position.push(p.old_position);
            store.mass.push(p.mass);
            store.state.push(p.state);
            store.type_.push(p.type_);
            store.id.push(p.id);
            store.user_data.push(p.user_data);
        }
        store
    }
}

impl<U: UserData> ParticleStore<U> for SoAStore<U> {
    fn len(&self) -> usize {
        self.position.len()
    }

    fn id_to_index(&self, id: ParticleId) -> Option<usize> {
        self.id_to_index_map.get(id as usize).map(|&i| i as usize)
    }

    fn index_to_id(&self, index: usize) -> ParticleId {
        self.id[index]
    }

    fn position(&self, index: usize) -> Vec3 {
        self.position[index]
    }

    fn velocity(&self, index: usize) -> Vec3 {
        self.velocity[index]
    }

    fn force(&self, index: usize) -> Vec3 {
        self.force[index]
    }

    fn old_position(&self, index: usize) -> Vec3 {
        self.old_position[index]
    }

    fn mass(&self, index: usize) -> f64 {
        self.mass[index]
    }

    fn state(&self, index: usize) -> ParticleState {
        self.state[index]
    }

    fn type_of(&self, index: usize) -> ParticleType {
        self.type_[index]
    }

    fn user_data(&self, index: usize) -> U {
        self.user_data[index]
    }

    fn set_position(&mut self, index: usize, v: Vec3) {
        self.position[index] = v;
    }

    fn set_velocity(&mut self, index: usize, v: Vec3) {
        self.velocity[index] = v;
    }

    fn set_force(&mut self, index: usize, v: Vec3) {
        self.force[index] = v;
    }

    fn set_old_position(&mut self, index: usize, v: Vec3) {
        self.old_position[index] = v;
    }

    fn set_state(&mut self, index: usize, s: ParticleState) {
        self.state[index] = s;
    }

    fn set_user_data(&mut self, index: usize, u: U) {
        self.user_data[index] = u;
    }

    fn reorder_storage(&mut self, permutation: &[usize]) {
        let n = self.len();
        debug_assert_eq!(permutation.len(), n);

        macro_rules! gather {
            ($field:ident) => {
                self.$field = permutation.iter().map(|&old| self.$field[old]).collect();
            };
        }
        gather!(position);
        gather!(velocity);
        gather!(force);
        gather!(old_position);
        gather!(mass);
        gather!(state);
        gather!(type_);
        gather!(id);
        gather!(user_data);

        for (new_index, &id) in self.id.iter().enumerate() {
            self.id_to_index_map[id as usize] = new_index as u32;
        }
    }
}
