//! Boundary conditions applied to particles that cross a domain face.

pub mod boundary_table;

pub use boundary_table::{BoundaryTable, CompiledBoundary};

use crate::math::{Box3, Vec3};
use crate::particle::FieldMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    XMinus = 0,
    XPlus = 1,
    YMinus = 2,
    YPlus = 3,
    ZMinus = 4,
    ZPlus = 5,
}

pub const ALL_FACES: [Face; 6] = [
    Face::XMinus,
    Face::XPlus,
    Face::YMinus,
    Face::YPlus,
    Face::ZMinus,
    Face::ZPlus,
];

impl Face {
    #[inline]
    pub fn as_index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn axis(self) -> usize {
        self.as_index() / 2
    }

    #[inline]
    pub fn is_plus(self) -> bool {
        self.as_index() % 2 != 0
    }

    /// The two axes not normal to this face, in the order the source uses
    /// for tangential bookkeeping (`{1,2}`, `{0,2}`, `{1,0}`).
    pub fn non_face_axes(self) -> (usize, usize) {
        match self.axis() {
            0 => (1, 2),
            1 => (0, 2),
            2 => (1, 0),
            _ => unreachable!(),
        }
    }
}

/// Structural flags that tell the container/driver how to treat a face,
/// independent of what the boundary actually does to a particle.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Topology {
    /// `>= 0`: region lies inside the domain (reflective, repulsive).
    /// `< 0`: region lies outside the domain (absorbing, periodic, open).
    pub thickness: f64,
    /// Opposite faces on this axis must agree (both periodic, or neither).
    pub couples_axis: bool,
    /// Container must enable minimum-image / ghost-cell dispatch on this axis.
    pub force_wrap: bool,
    /// The container's particle-movement bookkeeping must be notified after
    /// `apply` runs.
    pub may_change_particle_position: bool,
}

/// A wall-force law used by [`Boundary::Repulsive`]: returns a scalar
/// inward-push magnitude from a scalar distance-to-wall, distinct from the
/// pairwise [`crate::force::Force`] (which returns a vector from two
/// particle views).
pub trait WallForce: Copy {
    fn apply(&self, distance: f64) -> f64;
    fn cutoff(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialWall {
    pub amplitude: f64,
    pub decay_length: f64,
    pub cutoff: f64,
}

impl WallForce for ExponentialWall {
    fn apply(&self, distance: f64) -> f64 {
        if distance > self.cutoff {
            0.0
        } else {
            self.amplitude * (-distance / self.decay_length).exp()
        }
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawWall {
    pub amplitude: f64,
    pub exponent: f64,
    pub cutoff: f64,
}

impl WallForce for PowerLawWall {
    fn apply(&self, distance: f64) -> f64 {
        if distance > self.cutoff {
            0.0
        } else {
            self.amplitude / distance.powf(self.exponent)
        }
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Boundary<W: WallForce = ExponentialWall> {
    Open,
    Absorb,
    Reflective,
    Periodic,
    Repulsive { force: W, simulate_halo: bool },
}

impl<W: WallForce> Boundary<W> {
    pub fn topology(&self) -> Topology {
        match self {
            Boundary::Open => Topology {
                thickness: -1.0,
                couples_axis: false,
                force_wrap: false,
                may_change_particle_position: false,
            },
            Boundary::Absorb => Topology {
                thickness: -1.0,
                couples_axis: false,
                force_wrap: false,
                may_change_particle_position: false,
            },
            Boundary::Reflective => Topology {
                thickness: -1.0,
                couples_axis: false,
                force_wrap: false,
                may_change_particle_position: true,
            },
            Boundary::Periodic => Topology {
                thickness: -1.0,
                couples_axis: true,
                force_wrap: true,
                may_change_particle_position: true,
            },
            Boundary::Repulsive { force, .. } => Topology {
                thickness: force.cutoff(),
                couples_axis: false,
                force_wrap: false,
                may_change_particle_position: false,
            },
        }
    }

    pub fn fields(&self) -> FieldMask {
        match self {
            Boundary::Open | Boundary::Absorb => FieldMask::NONE,
            Boundary::Reflective => FieldMask::POSITION | FieldMask::OLD_POSITION | FieldMask::VELOCITY,
            Boundary::Periodic => FieldMask::POSITION,
            Boundary::Repulsive { .. } => FieldMask::POSITION | FieldMask::FORCE | FieldMask::OLD_POSITION,
        }
    }

    /// Mutates `position`/`velocity`/`force` in place to apply this boundary
    /// to a particle that has crossed `face` of `domain_box`.
    pub fn apply(
        &self,
        position: &mut Vec3,
        velocity: &mut Vec3,
        old_position: Vec3,
        force: &mut Vec3,
        domain_box: &Box3,
        face: Face,
    ) {
        let ax = face.axis();
        let plus = face.is_plus();

        match self {
            Boundary::Open => {}
            Boundary::Absorb => {
                // Marking DEAD is the System's job (it owns particle state);
                // this boundary's only contract-visible effect is that flag.
            }
            Boundary::Reflective => {
                let diff = *position - old_position;
                let mut diff_reflected = diff;
                crate::math::set_axis(&mut diff_reflected, ax, -crate::math::index_axis(diff, ax));

                let wall = if plus {
                    crate::math::index_axis(domain_box.max, ax)
                } else {
                    crate::math::index_axis(domain_box.min, ax)
                };
                let old_ax = crate::math::index_axis(old_position, ax);
                let diff_ax = crate::math::index_axis(diff, ax);
                let t = (wall - old_ax) / diff_ax;

                *position = old_position + t * diff + (1.0 - t) * diff_reflected;
                let v_ax = -crate::math::index_axis(*velocity, ax);
                crate::math::set_axis(velocity, ax, v_ax);

                debug_assert!(
                    crate::math::index_axis(*position, ax) >= crate::math::index_axis(domain_box.min, ax)
                        && crate::math::index_axis(*position, ax) <= crate::math::index_axis(domain_box.max, ax),
                    "reflected particle left the domain on its own reflected axis"
                );
            }
            Boundary::Periodic => {
                let sign = if plus { -1.0 } else { 1.0 };
                let extent_ax = domain_box.extent_axis(ax);
                let p_ax = crate::math::index_axis(*position, ax) + sign * extent_ax;
                crate::math::set_axis(position, ax, p_ax);
            }
            Boundary::Repulsive { force: wall, simulate_halo } => {
                let wall_position = if plus {
                    crate::math::index_axis(domain_box.max, ax)
                } else {
                    crate::math::index_axis(domain_box.min, ax)
                };
                let mut distance = (wall_position - crate::math::index_axis(*position, ax)).abs();
                if *simulate_halo {
                    distance *= 2.0;
                }
                let magnitude = wall.apply(distance);
                let direction = if plus { -1.0 } else { 1.0 };
                let f_ax = crate::math::index_axis(*force, ax) + direction * magnitude;
                crate::math::set_axis(force, ax, f_ax);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_teleports_by_extent() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let mut position = Vec3::new(10.0, 5.0, 5.0);
        let mut velocity = Vec3::ZERO;
        let mut force = Vec3::ZERO;
        let b: Boundary = Boundary::Periodic;
        b.apply(&mut position, &mut velocity, position, &mut force, &domain, Face::XPlus);
        assert!((position.x - 0.0).abs() < 1e-12);
    }

    #[test]
    fn reflective_negates_normal_velocity() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let old_position = Vec3::new(9.5, 5.0, 5.0);
        let mut position = Vec3::new(10.5, 5.0, 5.0);
        let mut velocity = Vec3::new(1.0, 0.0, 0.0);
        let mut force = Vec3::ZERO;
        let b: Boundary = Boundary::Reflective;
        b.apply(&mut position, &mut velocity, old_position, &mut force, &domain, Face::XPlus);
        assert!(velocity.x < 0.0);
        assert!(position.x <= 10.0 + 1e-9);
    }

    #[test]
    fn repulsive_pushes_inward() {
        let domain = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        let position = Vec3::new(9.8, 5.0, 5.0);
        let mut velocity = Vec3::ZERO;
        let mut force = Vec3::ZERO;
        let wall = ExponentialWall { amplitude: 10.0, decay_length: 1.0, cutoff: 2.0 };
        let b = Boundary::Repulsive { force: wall, simulate_halo: false };
        let mut p = position;
        b.apply(&mut p, &mut velocity, position, &mut force, &domain, Face::XPlus);
        assert!(force.x < 0.0);
    }
}
