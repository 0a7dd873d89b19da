//! Per-face compiled boundary records: six [`Boundary`]s plus the region of
//! space (inside-slab or outside-half-space) each one governs.

use crate::boundary::{Boundary, Face, Topology, WallForce, ALL_FACES};
use crate::math::{Box3, Vec3};

pub struct CompiledBoundary<W: WallForce> {
    pub boundary: Boundary<W>,
    pub region: Box3,
    pub face: Face,
    pub topology: Topology,
}

/// Computes the slab (thickness >= 0, inside the domain) or half-space
/// (thickness < 0, outside the domain) that `boundary` governs on `face`.
///
/// Mirrors the source's `compile_boundary`: inside regions are clamped to
/// `[0, extent_axis]` so an oversized thickness never produces an inverted
/// box; outside regions use a quarter-of-max sentinel rather than true
/// infinity so two outside regions' bounds never overflow when summed.
pub fn compile_boundary<W: WallForce>(boundary: Boundary<W>, simulation_box: &Box3, face: Face) -> CompiledBoundary<W> {
    const NEG_INF: f64 = f64::MIN / 4.0;
    const POS_INF: f64 = f64::MAX / 4.0;

    let ax = face.axis();
    let plus = face.is_plus();
    let topology = boundary.topology();
    let thickness = topology.thickness;

    let (min, max) = if thickness >= 0.0 {
        let mut min = simulation_box.min;
        let mut max = simulation_box.max;
        let d = thickness.clamp(0.0, simulation_box.extent_axis(ax));
        if plus {
            let new_min = crate::math::index_axis(max, ax) - d;
            crate::math::set_axis(&mut min, ax, new_min);
        } else {
            let new_max = crate::math::index_axis(min, ax) + d;
            crate::math::set_axis(&mut max, ax, new_max);
        }
        (min, max)
    } else if plus {
        let mut min = Vec3::splat(NEG_INF);
        let max = Vec3::splat(POS_INF);
        crate::math::set_axis(&mut min, ax, crate::math::index_axis(simulation_box.max, ax));
        (min, max)
    } else {
        let min = Vec3::splat(NEG_INF);
        let mut max = Vec3::splat(POS_INF / 2.0);
        crate::math::set_axis(&mut max, ax, crate::math::index_axis(simulation_box.min, ax));
        (min, max)
    };

    CompiledBoundary {
        boundary,
        region: Box3::new(min, max),
        face,
        topology,
    }
}

/// The six compiled boundaries of a domain, one per [`Face`].
pub struct BoundaryTable<W: WallForce> {
    table: [CompiledBoundary<W>; 6],
}

impl<W: WallForce> BoundaryTable<W> {
    pub fn build(boundaries: [Boundary<W>; 6], simulation_box: &Box3) -> Self {
        let table = std::array::from_fn(|i| compile_boundary(boundaries[i], simulation_box, ALL_FACES[i]));
        let built = Self { table };
        built.validate_axis_coupling();
        log::info!("boundary table compiled for domain extent {:?}", simulation_box.extent);
        built
    }

    fn validate_axis_coupling(&self) {
        for axis in 0..3 {
            let minus = &self.table[axis * 2];
            let plus = &self.table[axis * 2 + 1];
            debug_assert_eq!(
                minus.topology.couples_axis, plus.topology.couples_axis,
                "opposite faces on axis {axis} disagree on axis coupling"
            );
        }
    }

    pub fn get(&self, face: Face) -> &CompiledBoundary<W> {
        &self.table[face.as_index()]
    }

    pub fn periodic_axis(&self, axis: usize) -> bool {
        self.table[axis * 2].topology.force_wrap
    }
}

impl<W: WallForce> std::ops::Index<Face> for BoundaryTable<W> {
    type Output = CompiledBoundary<W>;

    fn index(&self, face: Face) -> &CompiledBoundary<W> {
        self.get(face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::ExponentialWall;

    #[test]
    fn inside_region_is_clamped_to_domain() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let wall = ExponentialWall { amplitude: 1.0, decay_length: 1.0, cutoff: 100.0 };
        let compiled = compile_boundary(Boundary::Repulsive { force: wall, simulate_halo: false }, &domain, Face::XPlus);
        assert!((compiled.region.min.x - 0.0).abs() < 1e-9);
        assert!((compiled.region.max.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn outside_region_extends_past_domain() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let compiled: CompiledBoundary<ExponentialWall> = compile_boundary(Boundary::Periodic, &domain, Face::XPlus);
        assert!(compiled.region.min.x >= 10.0);
    }

    #[test]
    fn uncoupled_periodic_axis_trips_debug_assert() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let boundaries = [
            Boundary::Periodic,
            Boundary::Open,
            Boundary::Open,
            Boundary::Open,
            Boundary::Open,
            Boundary::Open,
        ];
        let result = std::panic::catch_unwind(|| BoundaryTable::build(boundaries, &domain));
        if cfg!(debug_assertions) {
            assert!(result.is_err());
        }
    }
}
