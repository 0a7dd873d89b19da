//! Dense (type,type) and (id,id) force lookup tables, built once per
//! environment and immutable thereafter.

use rustc_hash::FxHashMap;

use crate::error::{BuildError, BuildResult};
use crate::force::Force;
use crate::particle::{ParticleId, ParticleType};

/// A force declared between two user types, before remapping onto the
/// dense `0..n_types` implementation type space.
pub struct TypeInteraction {
    pub type1: u64,
    pub type2: u64,
    pub force: Force,
}

/// A force declared between two specific particles, before remapping onto
/// the dense `0..n_ids` implementation id space.
pub struct IdInteraction {
    pub id1: u64,
    pub id2: u64,
    pub force: Force,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InteractionProp {
    pub cutoff: f64,
    pub is_active: bool,
    pub used_by_types: Vec<(ParticleType, ParticleType)>,
    pub used_by_ids: Vec<(ParticleId, ParticleId)>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InteractionSchema {
    pub types: Vec<ParticleType>,
    pub ids: Vec<ParticleId>,
    /// `i * types.len() + j -> index into interactions`.
    pub type_interaction_matrix: Vec<usize>,
    /// `i * ids.len() + j -> index into interactions`.
    pub id_interaction_matrix: Vec<usize>,
    pub interactions: Vec<InteractionProp>,
}

/// Dense lookup from (type,type) and (id,id) pairs to a resolved [`Force`].
///
/// Built once from the user's declared interactions and the builder's
/// user-id/user-type -> dense-index maps; every cell is populated with a
/// concrete law (`Force::NoForce` is a legal, explicit value) by the time
/// construction finishes — `Option<Force>` is used only as the
/// under-construction placeholder (the source's transient `ForceSentinel`).
pub struct ForceTable {
    type_forces: Vec<Force>,
    id_forces: Vec<Force>,
    n_types: usize,
    n_ids: usize,
}

impl ForceTable {
    pub fn build(
        type_interactions: Vec<TypeInteraction>,
        id_interactions: Vec<IdInteraction>,
        usr_types_to_impl_types: &FxHashMap<u64, ParticleType>,
        usr_ids_to_impl_ids: &FxHashMap<u64, ParticleId>,
    ) -> BuildResult<Self> {
        let (type_forces, n_types) = build_type_forces(&type_interactions, usr_types_to_impl_types)?;
        let (id_forces, n_ids) = build_id_forces(&id_interactions, usr_ids_to_impl_ids)?;

        log::info!(
            "force table built: {n_types} particle types, {n_ids} id-pair overrides, {} cells",
            type_forces.len() + id_forces.len()
        );

        let table = Self {
            type_forces,
            id_forces,
            n_types,
            n_ids,
        };
        table.validate();
        Ok(table)
    }

    fn validate(&self) {
        if cfg!(debug_assertions) {
            for i in 0..self.n_ids {
                debug_assert!(
                    matches!(self.id_forces[self.id_index(i, i)], Force::NoForce),
                    "self-interaction id force should be NoForce, never used on the hot path"
                );
            }
        }
    }

    #[inline]
    fn type_index(&self, a: usize, b: usize) -> usize {
        self.n_types * a + b
    }

    #[inline]
    fn id_index(&self, a: usize, b: usize) -> usize {
        self.n_ids * a + b
    }

    pub fn get_type_force(&self, a: ParticleType, b: ParticleType) -> &Force {
        &self.type_forces[self.type_index(a as usize, b as usize)]
    }

    pub fn get_id_force(&self, a: ParticleId, b: ParticleId) -> &Force {
        &self.id_forces[self.id_index(a as usize, b as usize)]
    }

    pub fn has_id_force(&self, a: ParticleId, b: ParticleId) -> bool {
        (a as usize) < self.n_ids && (b as usize) < self.n_ids
    }

    /// Visits the resolved force for `(t1, t2)` unless it is `NoForce`
    /// (zero-cost no-op, matching the source's sentinel-skipping dispatch).
    pub fn dispatch(&self, t1: ParticleType, t2: ParticleType, mut func: impl FnMut(&Force)) {
        let force = self.get_type_force(t1, t2);
        if !matches!(force, Force::NoForce) {
            func(force);
        }
    }

    pub fn dispatch_id(&self, id1: ParticleId, id2: ParticleId, mut func: impl FnMut(&Force)) {
        let force = self.get_id_force(id1, id2);
        if !matches!(force, Force::NoForce) {
            func(force);
        }
    }

    /// Deduplicate every populated cell by [`Force::equals`] and attribute
    /// each (type,type)/(id,id) pair that shares a force to one schema entry.
    pub fn generate_schema(&self) -> InteractionSchema {
        let types: Vec<ParticleType> = (0..self.n_types as ParticleType).collect();
        let ids: Vec<ParticleId> = (0..self.n_ids as ParticleId).collect();

        let mut all_forces: Vec<&Force> = Vec::with_capacity(self.type_forces.len() + self.id_forces.len());
        all_forces.extend(self.type_forces.iter());
        all_forces.extend(self.id_forces.iter());

        let mut all_props: Vec<InteractionProp> = all_forces
            .iter()
            .map(|f| InteractionProp {
                cutoff: f.cutoff(),
                is_active: !matches!(f, Force::NoForce),
                ..Default::default()
            })
            .collect();

        for i in 0..self.n_types {
            for j in 0..self.n_types {
                all_props[self.type_index(i, j)]
                    .used_by_types
                    .push((i as ParticleType, j as ParticleType));
            }
        }
        for i in 0..self.n_ids {
            for j in (i + 1)..self.n_ids {
                let idx = self.type_forces.len() + self.id_index(i, j);
                all_props[idx].used_by_ids.push((i as ParticleId, j as ParticleId));
            }
        }

        let mut remapping = vec![0usize; all_forces.len()];
        let mut unique_forces: Vec<&Force> = Vec::new();
        let mut unique_props: Vec<InteractionProp> = Vec::new();

        for (i, force) in all_forces.iter().enumerate() {
            if let Some(found) = unique_forces.iter().position(|uf| uf.equals(force)) {
                let current = std::mem::take(&mut all_props[i]);
                unique_props[found].used_by_types.extend(current.used_by_types);
                unique_props[found].used_by_ids.extend(current.used_by_ids);
                remapping[i] = found;
            } else {
                remapping[i] = unique_forces.len();
                unique_forces.push(force);
                unique_props.push(std::mem::take(&mut all_props[i]));
            }
        }

        let type_interaction_matrix = remapping[..self.n_types * self.n_types].to_vec();
        let id_interaction_matrix = remapping[self.n_types * self.n_types..].to_vec();

        log::info!(
            "interaction schema: {} unique forces over {} type cells, {} id cells",
            unique_props.len(),
            type_interaction_matrix.len(),
            id_interaction_matrix.len()
        );

        InteractionSchema {
            types,
            ids,
            type_interaction_matrix,
            id_interaction_matrix,
            interactions: unique_props,
        }
    }
}

fn build_type_forces(
    interactions: &[TypeInteraction],
    type_map: &FxHashMap<u64, ParticleType>,
) -> BuildResult<(Vec<Force>, usize)> {
    let mut particle_types = std::collections::HashSet::new();
    for x in interactions {
        particle_types.insert(*type_map.get(&x.type1).ok_or(BuildError::UnknownType(x.type1))?);
        particle_types.insert(*type_map.get(&x.type2).ok_or(BuildError::UnknownType(x.type2))?);
    }
    let n_types = particle_types.len().max(
        type_map
            .values()
            .max()
            .map(|&m| m as usize + 1)
            .unwrap_or(0),
    );

    let mut cells: Vec<Option<Force>> = vec![None; n_types * n_types];
    let index = |a: usize, b: usize| n_types * a + b;

    for x in interactions {
        let a = type_map[&x.type1] as usize;
        let b = type_map[&x.type2] as usize;
        cells[index(a, b)] = Some(x.force);
        cells[index(b, a)] = Some(x.force);
    }

    for a in 0..n_types {
        for b in 0..n_types {
            if a == b || cells[index(a, b)].is_some() {
                continue;
            }
            let (fa, fb) = (cells[index(a, a)], cells[index(b, b)]);
            match (fa, fb) {
                (Some(fa), Some(fb)) => {
                    let mixed = fa.mix(&fb).ok_or(BuildError::IncompatibleMixing(a as u64, b as u64))?;
                    cells[index(a, b)] = Some(mixed);
                    cells[index(b, a)] = Some(mixed);
                }
                _ => return Err(BuildError::IncompatibleMixing(a as u64, b as u64)),
            }
        }
    }

    let resolved: Vec<Force> = cells
        .into_iter()
        .map(|c| c.unwrap_or(Force::NoForce))
        .collect();
    Ok((resolved, n_types))
}

fn build_id_forces(
    interactions: &[IdInteraction],
    id_map: &FxHashMap<u64, ParticleId>,
) -> BuildResult<(Vec<Force>, usize)> {
    let mut ids = std::collections::HashSet::new();
    for x in interactions {
        ids.insert(*id_map.get(&x.id1).ok_or(BuildError::UnknownId(x.id1))?);
        ids.insert(*id_map.get(&x.id2).ok_or(BuildError::UnknownId(x.id2))?);
    }
    let n_ids = ids.len().max(id_map.values().max().map(|&m| m as usize + 1).unwrap_or(0));

    let mut cells: Vec<Force> = vec![Force::NoForce; n_ids * n_ids];
    let index = |a: usize, b: usize| n_ids * a + b;

    for x in interactions {
        if x.id1 == x.id2 {
            return Err(BuildError::SelfIdInteraction(x.id1));
        }
        let a = id_map[&x.id1] as usize;
        let b = id_map[&x.id2] as usize;
        cells[index(a, b)] = x.force;
        cells[index(b, a)] = x.force;
    }

    for i in 0..n_ids {
        cells[index(i, i)] = Force::NoForce;
    }

    Ok((cells, n_ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(u64, u32)]) -> FxHashMap<u64, u32> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn missing_diagonal_interaction_fails_construction() {
        let type_map = map(&[(10, 0), (20, 1)]);
        let interactions = vec![TypeInteraction {
            type1: 10,
            type2: 10,
            force: Force::lennard_jones(1.0, 1.0, None),
        }];
        let result = ForceTable::build(interactions, vec![], &type_map, &FxHashMap::default());
        assert!(result.is_err());
    }

    #[test]
    fn mixes_missing_off_diagonal_from_diagonals() {
        let type_map = map(&[(10, 0), (20, 1)]);
        let interactions = vec![
            TypeInteraction { type1: 10, type2: 10, force: Force::lennard_jones(1.0, 1.0, Some(2.0)) },
            TypeInteraction { type1: 20, type2: 20, force: Force::lennard_jones(4.0, 3.0, Some(8.0)) },
        ];
        let table = ForceTable::build(interactions, vec![], &type_map, &FxHashMap::default()).unwrap();
        match table.get_type_force(0, 1) {
            Force::LennardJones { epsilon, .. } => assert!((epsilon - 2.0).abs() < 1e-12),
            _ => panic!("expected mixed LennardJones"),
        }
    }

    #[test]
    fn id_force_self_interaction_is_no_force() {
        let id_map = map(&[(0, 0), (1, 1)]);
        let interactions = vec![IdInteraction {
            id1: 0,
            id2: 1,
            force: Force::harmonic(1.0, 0.0, 2.0),
        }];
        let table = ForceTable::build(vec![], interactions, &FxHashMap::default(), &id_map).unwrap();
        assert!(matches!(table.get_id_force(0, 0), Force::NoForce));
        assert!(!matches!(table.get_id_force(0, 1), Force::NoForce));
    }

    #[test]
    fn generate_schema_dedups_identical_forces() {
        let type_map = map(&[(10, 0), (20, 1)]);
        let interactions = vec![
            TypeInteraction { type1: 10, type2: 10, force: Force::lennard_jones(1.0, 1.0, Some(2.0)) },
            TypeInteraction { type1: 20, type2: 20, force: Force::lennard_jones(1.0, 1.0, Some(2.0)) },
        ];
        let table = ForceTable::build(interactions, vec![], &type_map, &FxHashMap::default()).unwrap();
        let schema = table.generate_schema();
        // (0,0) and (1,1) carry identical LJ params -> same schema entry.
        let cell00 = schema.type_interaction_matrix[0];
        let cell11 = schema.type_interaction_matrix[3];
        assert_eq!(cell00, cell11);
    }
}
