//! Cell-linked-list container: bins particles into a uniform grid sized to
//! the largest active force cutoff, then only visits cell pairs within a
//! half-sphere stencil of that cutoff.
//!
//! Binning sorts the underlying [`crate::particle::ParticleStore`] in place
//! via [`ParticleStore::reorder_storage`] every time [`LinkedCells::rebuild_structure`]
//! runs, using a prefix-sum counting sort with a scratch permutation buffer
//! (the source's ping-pong double-buffered storage, minus the second
//! physical copy — `reorder_storage` already does the swap internally).

use crate::container::{
    Batch, BatchAtom, BatchSymmetry, Bcp, CellOrdering, Container, Identity, ParallelPolicy, TopologyBatch, UpdatePolicy,
};
use crate::error::{BuildError, BuildResult};
use crate::force::InteractionSchema;
use crate::math::{Box3, Vec3};
use crate::particle::{ParticleState, ParticleStore, UserData};

#[derive(Debug, Clone, Copy)]
struct CellPair {
    c1: usize,
    c2: usize,
}

#[derive(Debug, Clone, Copy)]
struct WrappedCellPair {
    c1: usize,
    c2: usize,
    shift: Vec3,
}

pub struct LinkedCells<S, U, O: CellOrdering = Identity> {
    store: S,
    domain_min: Vec3,
    domain_extent: Vec3,
    periodic: crate::container::PeriodicFlags,

    cell_size: Vec3,
    inv_cell_size: Vec3,
    cells_per_axis: (u32, u32, u32),
    n_grid_cells: usize,
    /// Sentinel bin for particles a caller-supplied position places outside
    /// the grid (e.g. a field/controller nudged it past the domain before
    /// the next boundary pass ran).
    outside_cell_id: usize,
    n_cells: usize,
    global_cutoff: f64,

    /// Start index of each cell's particles in the sorted store, length
    /// `n_cells + 1` (last entry is the total particle count).
    bin_start: Vec<usize>,
    ordering: O,

    neighbor_cell_pairs: Vec<CellPair>,
    wrapped_cell_pairs: Vec<WrappedCellPair>,
    topology_batches: Vec<TopologyBatch>,

    _marker: std::marker::PhantomData<U>,
}

impl<S: ParticleStore<U>, U: UserData> LinkedCells<S, U, Identity> {
    pub fn build(
        store: S,
        domain: &Box3,
        periodic: crate::container::PeriodicFlags,
        schema: &InteractionSchema,
    ) -> BuildResult<Self> {
        Self::build_with_ordering(store, domain, periodic, schema, Identity)
    }
}

impl<S: ParticleStore<U>, U: UserData, O: CellOrdering> LinkedCells<S, U, O> {
    pub fn build_with_ordering(
        mut store: S,
        domain: &Box3,
        periodic: crate::container::PeriodicFlags,
        schema: &InteractionSchema,
        ordering: O,
    ) -> BuildResult<Self> {
        if !domain.extent.x.is_finite() || !domain.extent.y.is_finite() || !domain.extent.z.is_finite() {
            return Err(BuildError::InfiniteDomainUnsupported);
        }

        let max_cutoff = schema
            .interactions
            .iter()
            .filter(|i| i.is_active && !i.used_by_types.is_empty())
            .map(|i| i.cutoff)
            .fold(0.0_f64, f64::max);

        let min_extent = domain.extent.min_element();
        let effective_cutoff = if max_cutoff <= 0.0 || max_cutoff > min_extent {
            log::warn!("clamping linked-cells cutoff to half the smallest domain extent ({min_extent})");
            min_extent / 2.0
        } else {
            max_cutoff
        };
        if effective_cutoff <= 0.0 {
            return Err(BuildError::DomainTooSmall { axis: 0, extent: min_extent, cutoff: max_cutoff });
        }

        let num = |extent: f64| -> u32 { (1.0_f64).max((extent / effective_cutoff).floor()) as u32 };
        let cells_per_axis = (num(domain.extent.x), num(domain.extent.y), num(domain.extent.z));
        let cell_size = Vec3::new(
            domain.extent.x / cells_per_axis.0 as f64,
            domain.extent.y / cells_per_axis.1 as f64,
            domain.extent.z / cells_per_axis.2 as f64,
        );
        let inv_cell_size = Vec3::new(
            if cell_size.x > 0.0 { 1.0 / cell_size.x } else { 0.0 },
            if cell_size.y > 0.0 { 1.0 / cell_size.y } else { 0.0 },
            if cell_size.z > 0.0 { 1.0 / cell_size.z } else { 0.0 },
        );

        let n_grid_cells = (cells_per_axis.0 as usize) * (cells_per_axis.1 as usize) * (cells_per_axis.2 as usize);
        let n_cells = n_grid_cells + 1;
        let ordering = ordering.for_grid(cells_per_axis);

        let mut linked_cells = Self {
            store,
            domain_min: domain.min,
            domain_extent: domain.extent,
            periodic,
            cell_size,
            inv_cell_size,
            cells_per_axis,
            n_grid_cells,
            outside_cell_id: n_grid_cells,
            n_cells,
            global_cutoff: effective_cutoff,
            bin_start: vec![0; n_cells + 1],
            ordering,
            neighbor_cell_pairs: Vec::new(),
            wrapped_cell_pairs: Vec::new(),
            topology_batches: crate::container::topology_batches_from_schema(schema),
            _marker: std::marker::PhantomData,
        };

        linked_cells.compute_cell_pairs();
        linked_cells.rebuild_structure();

        log::info!(
            "linked cells built: {:?} grid, cell size {:?}, cutoff {}, {} neighbor pairs, {} wrapped pairs",
            linked_cells.cells_per_axis,
            linked_cells.cell_size,
            linked_cells.global_cutoff,
            linked_cells.neighbor_cell_pairs.len(),
            linked_cells.wrapped_cell_pairs.len(),
        );

        Ok(linked_cells)
    }

    fn cell_index_from_position(&self, position: Vec3) -> usize {
        let rel = position - self.domain_min;
        let (nx, ny, nz) = self.cells_per_axis;

        let axis_cell = |v: f64, inv_size: f64, n: u32| -> Option<u32> {
            if v < 0.0 {
                return None;
            }
            let idx = (v * inv_size).floor() as i64;
            if idx < 0 || idx as u32 >= n {
                None
            } else {
                Some(idx as u32)
            }
        };

        match (
            axis_cell(rel.x, self.inv_cell_size.x, nx),
            axis_cell(rel.y, self.inv_cell_size.y, ny),
            axis_cell(rel.z, self.inv_cell_size.z, nz),
        ) {
            (Some(x), Some(y), Some(z)) => self.ordering.index(x, y, z),
            _ => self.outside_cell_id,
        }
    }

    fn compute_cell_pairs(&mut self) {
        let cutoff = self.global_cutoff;
        let cutoff_sq = cutoff * cutoff;
        let nx_range = (cutoff * self.inv_cell_size.x).ceil() as i32;
        let ny_range = (cutoff * self.inv_cell_size.y).ceil() as i32;
        let nz_range = (cutoff * self.inv_cell_size.z).ceil() as i32;

        let mut stencil: Vec<(i32, i32, i32)> = Vec::new();
        for z in 0..=nz_range {
            for y in -ny_range..=ny_range {
                for x in -nx_range..=nx_range {
                    if (z, y, x) <= (0, 0, 0) {
                        continue;
                    }
                    let dx = if x.abs() > 1 { (x.abs() - 1) as f64 * self.cell_size.x } else { 0.0 };
                    let dy = if y.abs() > 1 { (y.abs() - 1) as f64 * self.cell_size.y } else { 0.0 };
                    let dz = if z.abs() > 1 { (z.abs() - 1) as f64 * self.cell_size.z } else { 0.0 };
                    if dx * dx + dy * dy + dz * dz <= cutoff_sq {
                        stencil.push((x, y, z));
                    }
                }
            }
        }

        let (nx, ny, nz) = self.cells_per_axis;
        let try_wrap = |n: &mut i32, shift: &mut f64, dim: u32, extent: f64, periodic_axis: bool| -> bool {
            if !periodic_axis {
                return false;
            }
            if *n < 0 {
                *n += dim as i32;
                *shift = -extent;
                true
            } else if *n >= dim as i32 {
                *n -= dim as i32;
                *shift = extent;
                true
            } else {
                false
            }
        };

        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    for &(dx, dy, dz) in &stencil {
                        let mut nxp = x as i32 + dx;
                        let mut nyp = y as i32 + dy;
                        let mut nzp = z as i32 + dz;
                        let mut shift = Vec3::ZERO;

                        let wx = try_wrap(&mut nxp, &mut shift.x, nx, self.domain_extent.x, self.periodic.x);
                        let wy = try_wrap(&mut nyp, &mut shift.y, ny, self.domain_extent.y, self.periodic.y);
                        let wz = try_wrap(&mut nzp, &mut shift.z, nz, self.domain_extent.z, self.periodic.z);

                        if nxp < 0 || nyp < 0 || nzp < 0 || nxp >= nx as i32 || nyp >= ny as i32 || nzp >= nz as i32 {
                            continue;
                        }

                        let c1 = self.ordering.index(x, y, z);
                        let c2 = self.ordering.index(nxp as u32, nyp as u32, nzp as u32);

                        if wx || wy || wz {
                            self.wrapped_cell_pairs.push(WrappedCellPair { c1, c2, shift });
                        } else {
                            self.neighbor_cell_pairs.push(CellPair { c1, c2 });
                        }
                    }
                }
            }
        }
    }

    #[inline]
    fn bin_range(&self, cell: usize) -> std::ops::Range<usize> {
        self.bin_start[cell]..self.bin_start[cell + 1]
    }

    /// Cells touched by `region`, including the outside-grid sentinel
    /// whenever the region escapes the domain on any axis.
    fn get_cells_in_region(&self, region: &Box3) -> Vec<usize> {
        let mut cells = Vec::new();
        let escapes = region.min.x < self.domain_min.x
            || region.min.y < self.domain_min.y
            || region.min.z < self.domain_min.z
            || region.max.x > self.domain_min.x + self.domain_extent.x
            || region.max.y > self.domain_min.y + self.domain_extent.y
            || region.max.z > self.domain_min.z + self.domain_extent.z;

        let clamp_axis = |lo: f64, hi: f64, inv_size: f64, n: u32| -> (u32, u32) {
            let lo = lo.max(0.0);
            let hi = hi.max(0.0);
            let ilo = ((lo * inv_size).floor() as i64).clamp(0, n as i64 - 1) as u32;
            let ihi = ((hi * inv_size).floor() as i64).clamp(0, n as i64 - 1) as u32;
            (ilo, ihi)
        };

        let (nx, ny, nz) = self.cells_per_axis;
        let (xlo, xhi) = clamp_axis(region.min.x - self.domain_min.x, region.max.x - self.domain_min.x, self.inv_cell_size.x, nx);
        let (ylo, yhi) = clamp_axis(region.min.y - self.domain_min.y, region.max.y - self.domain_min.y, self.inv_cell_size.y, ny);
        let (zlo, zhi) = clamp_axis(region.min.z - self.domain_min.z, region.max.z - self.domain_min.z, self.inv_cell_size.z, nz);

        for z in zlo..=zhi {
            for y in ylo..=yhi {
                for x in xlo..=xhi {
                    cells.push(self.ordering.index(x, y, z));
                }
            }
        }
        if escapes {
            cells.push(self.outside_cell_id);
        }
        cells
    }
}

impl<S: ParticleStore<U>, U: UserData, O: CellOrdering> Container<U> for LinkedCells<S, U, O> {
    type Store = S;

    fn store(&self) -> &S {
        &self.store
    }

    fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn rebuild_structure(&mut self) {
        let n = self.store.len();
        let mut counts = vec![0usize; self.n_cells];
        let mut cell_of = vec![0usize; n];

        for i in 0..n {
            let cid = self.cell_index_from_position(self.store.position(i));
            cell_of[i] = cid;
            counts[cid] += 1;
        }

        self.bin_start.clear();
        self.bin_start.resize(self.n_cells + 1, 0);
        let mut running = 0usize;
        for (cid, count) in counts.iter().enumerate() {
            self.bin_start[cid] = running;
            running += count;
        }
        self.bin_start[self.n_cells] = running;

        let mut write_ptr = self.bin_start.clone();
        let mut permutation = vec![0usize; n];
        for i in 0..n {
            let cid = cell_of[i];
            let dst = write_ptr[cid];
            write_ptr[cid] += 1;
            permutation[dst] = i;
        }

        // Dense permutation, not padded to a chunk boundary per bin — an
        // AoSoA store's bins can end mid-chunk. `bin_range` below gives
        // exact per-bin ranges either way, so the scalar batch emission
        // here is correct; see `AoSoAStore::reorder_storage`'s doc comment.
        self.store.reorder_storage(&permutation);
    }

    fn for_each_interaction_batch(&self, mut f: impl FnMut(&Batch)) {
        let intra_chunks: Vec<BatchAtom> = (0..self.n_cells)
            .filter(|&c| self.bin_range(c).len() >= 2)
            .map(|c| BatchAtom::Range(self.bin_range(c)))
            .collect();
        if !intra_chunks.is_empty() {
            f(&Batch {
                symmetry: BatchSymmetry::Symmetric,
                parallel_policy: ParallelPolicy::Chunks,
                update_policy: UpdatePolicy::Serial,
                bcp: Bcp::Identity,
                chunks: intra_chunks,
            });
        }

        let neighbor_chunks: Vec<BatchAtom> = self
            .neighbor_cell_pairs
            .iter()
            .filter(|p| !self.bin_range(p.c1).is_empty() && !self.bin_range(p.c2).is_empty())
            .map(|p| BatchAtom::RangePair(self.bin_range(p.c1), self.bin_range(p.c2)))
            .collect();
        if !neighbor_chunks.is_empty() {
            f(&Batch {
                symmetry: BatchSymmetry::Asymmetric,
                parallel_policy: ParallelPolicy::Chunks,
                update_policy: UpdatePolicy::Serial,
                bcp: Bcp::Identity,
                chunks: neighbor_chunks,
            });
        }

        for pair in &self.wrapped_cell_pairs {
            if self.bin_range(pair.c1).is_empty() || self.bin_range(pair.c2).is_empty() {
                continue;
            }
            f(&Batch {
                symmetry: BatchSymmetry::Asymmetric,
                parallel_policy: ParallelPolicy::None,
                update_policy: UpdatePolicy::Serial,
                bcp: Bcp::Shift(pair.shift),
                chunks: vec![BatchAtom::RangePair(self.bin_range(pair.c1), self.bin_range(pair.c2))],
            });
        }
    }

    fn for_each_topology_batch(&self, mut f: impl FnMut(&TopologyBatch)) {
        for batch in &self.topology_batches {
            f(batch);
        }
    }

    fn collect_indices_in_region(&self, region: &Box3) -> Vec<usize> {
        let mut indices = Vec::new();
        for cid in self.get_cells_in_region(region) {
            for i in self.bin_range(cid) {
                if self.store.state(i) != ParticleState::DEAD && region.contains(self.store.position(i)) {
                    indices.push(i);
                }
            }
        }
        indices
    }
}
