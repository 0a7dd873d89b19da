//! Pairwise force laws and the dense type/id force lookup table.
//!
//! The source dispatches over `std::variant<ForceSentinel, Fs..., NoForce>`
//! so that unused laws monomorphize away. Rust's enums give us the same
//! "closed set, no vtable, no heap" dispatch directly — `ForceSentinel` is
//! not carried as a variant here, it only exists transiently as `None` while
//! [`force_table::ForceTable`] is being built (see DESIGN.md).

pub mod force_table;

pub use force_table::{ForceTable, InteractionProp, InteractionSchema};

use crate::math::Vec3;
use crate::particle::{FieldMask, UserData};

/// A cutoff large enough that its square still fits comfortably under
/// `f64::MAX`, used as the "no cutoff" sentinel distance.
pub const NO_CUTOFF: f64 = 1.0e150;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Force {
    LennardJones {
        epsilon: f64,
        sigma: f64,
        cutoff: f64,
    },
    Harmonic {
        k: f64,
        r0: f64,
        cutoff: f64,
    },
    PowerLaw {
        g: f64,
        exponent: i32,
        cutoff: f64,
    },
    Coulomb {
        k: f64,
        cutoff: f64,
    },
    NoForce,
}

impl Force {
    pub fn lennard_jones(epsilon: f64, sigma: f64, cutoff: Option<f64>) -> Self {
        Force::LennardJones {
            epsilon,
            sigma,
            cutoff: cutoff.unwrap_or(3.0 * sigma),
        }
    }

    pub fn harmonic(k: f64, r0: f64, cutoff: f64) -> Self {
        Force::Harmonic { k, r0, cutoff }
    }

    pub fn power_law(g: f64, exponent: i32, cutoff: f64) -> Self {
        Force::PowerLaw { g, exponent, cutoff }
    }

    pub fn coulomb(k: f64, cutoff: f64) -> Self {
        Force::Coulomb { k, cutoff }
    }

    pub fn cutoff(&self) -> f64 {
        match *self {
            Force::LennardJones { cutoff, .. } => cutoff,
            Force::Harmonic { cutoff, .. } => cutoff,
            Force::PowerLaw { cutoff, .. } => cutoff,
            Force::Coulomb { cutoff, .. } => cutoff,
            Force::NoForce => NO_CUTOFF,
        }
    }

    pub fn has_cutoff(&self) -> bool {
        self.cutoff() < NO_CUTOFF
    }

    /// Fields this law reads beyond position, which every law gets for free
    /// via `r_ab`. `PowerLaw` reads mass directly off the record; `Coulomb`
    /// reads `user_data.charge()`, surfaced via `USER_DATA`.
    pub fn fields(&self) -> FieldMask {
        match self {
            Force::PowerLaw { .. } => FieldMask::MASS,
            Force::Coulomb { .. } => FieldMask::USER_DATA,
            _ => FieldMask::NONE,
        }
    }

    /// Evaluate the force `a` exerts on `b`, given the minimum-image
    /// displacement `r = b.position - a.position` and the two particles'
    /// mass/charge (mass and charge are always threaded through regardless
    /// of whether this particular law reads them — cheap relative to the
    /// pair loop itself, and keeps the signature uniform across variants).
    pub fn eval(&self, r: Vec3, mass_a: f64, mass_b: f64, charge_a: f64, charge_b: f64) -> Vec3 {
        let r2 = r.length_squared();
        if r2 == 0.0 {
            return Vec3::ZERO;
        }
        match *self {
            Force::LennardJones { epsilon, sigma, cutoff } => {
                if r2 > cutoff * cutoff {
                    return Vec3::ZERO;
                }
                let inv_r2 = 1.0 / r2;
                let sigma2 = sigma * sigma;
                let sigma_r2 = sigma2 * inv_r2;
                let sigma_r6 = sigma_r2 * sigma_r2 * sigma_r2;
                let sigma_r12 = sigma_r6 * sigma_r6;
                let magnitude = 24.0 * epsilon * inv_r2 * (2.0 * sigma_r12 - sigma_r6);
                -magnitude * r
            }
            Force::Harmonic { k, r0, cutoff } => {
                if cutoff > 0.0 && r2 > cutoff * cutoff {
                    return Vec3::ZERO;
                }
                let dist = r2.sqrt();
                let magnitude = -k * (dist - r0);
                magnitude * (r / dist)
            }
            Force::PowerLaw { g, exponent, cutoff } => {
                if cutoff > 0.0 && r2 > cutoff * cutoff {
                    return Vec3::ZERO;
                }
                let inv_r = 1.0 / r2.sqrt();
                let inv_pow = inv_r.powi(exponent + 1);
                let magnitude = g * mass_a * mass_b * inv_pow;
                magnitude * r
            }
            Force::Coulomb { k, cutoff } => {
                if cutoff > 0.0 && r2 > cutoff * cutoff {
                    return Vec3::ZERO;
                }
                let inv_r = 1.0 / r2.sqrt();
                let inv_r3 = inv_r * inv_r * inv_r;
                let magnitude = k * charge_a * charge_b * inv_r3;
                magnitude * r
            }
            Force::NoForce => Vec3::ZERO,
        }
    }

    /// Same-family mixing (Lorentz–Berthelot for LJ, arithmetic mean
    /// elsewhere); `None` if the two variants are not the same family.
    pub fn mix(&self, other: &Force) -> Option<Force> {
        match (self, other) {
            (
                Force::LennardJones { epsilon: e1, sigma: s1, cutoff: c1 },
                Force::LennardJones { epsilon: e2, sigma: s2, cutoff: c2 },
            ) => Some(Force::LennardJones {
                epsilon: (e1 * e2).sqrt(),
                sigma: 0.5 * (s1 + s2),
                cutoff: (c1 * c2).sqrt(),
            }),
            (Force::Harmonic { .. }, Force::Harmonic { .. }) if self == other => Some(*self),
            (
                Force::PowerLaw { g: g1, exponent: x1, cutoff: c1 },
                Force::PowerLaw { g: g2, exponent: x2, cutoff: c2 },
            ) if x1 == x2 => Some(Force::PowerLaw {
                g: 0.5 * (g1 + g2),
                exponent: *x1,
                cutoff: 0.5 * (c1 + c2),
            }),
            (Force::Coulomb { k: k1, cutoff: c1 }, Force::Coulomb { k: k2, cutoff: c2 }) => Some(Force::Coulomb {
                k: 0.5 * (k1 + k2),
                cutoff: 0.5 * (c1 + c2),
            }),
            (Force::NoForce, Force::NoForce) => Some(Force::NoForce),
            _ => None,
        }
    }

    /// Structural equality including parameters, used by
    /// [`force_table::ForceTable::generate_schema`] to dedup interaction
    /// entries.
    pub fn equals(&self, other: &Force) -> bool {
        self == other
    }
}

/// Reads a charged user-data payload's net charge, falling back to zero for
/// any type that doesn't override [`UserData::charge`].
#[inline]
pub fn charge_of<U: UserData>(u: &U) -> f64 {
    u.charge()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lennard_jones_zero_force_at_minimum() {
        let f = Force::lennard_jones(1.0, 1.0, Some(3.0));
        let r_min = 2f64.powf(1.0 / 6.0);
        let force = f.eval(Vec3::new(r_min, 0.0, 0.0), 1.0, 1.0, 0.0, 0.0);
        assert!(force.length() < 1e-9);
    }

    #[test]
    fn lennard_jones_mix_uses_lorentz_berthelot() {
        let a = Force::lennard_jones(1.0, 1.0, Some(2.0));
        let b = Force::lennard_jones(4.0, 3.0, Some(8.0));
        let mixed = a.mix(&b).unwrap();
        match mixed {
            Force::LennardJones { epsilon, sigma, cutoff } => {
                assert!((epsilon - 2.0).abs() < 1e-12);
                assert!((sigma - 2.0).abs() < 1e-12);
                assert!((cutoff - 4.0).abs() < 1e-12);
            }
            _ => panic!("expected LennardJones"),
        }
    }

    #[test]
    fn harmonic_pulls_inward_past_rest_length() {
        let f = Force::harmonic(1.0, 0.0, 2.0);
        let force = f.eval(Vec3::new(1.0, 0.0, 0.0), 1.0, 1.0, 0.0, 0.0);
        assert!(force.x < 0.0);
    }

    #[test]
    fn mixing_across_families_fails() {
        let lj = Force::lennard_jones(1.0, 1.0, None);
        let harm = Force::harmonic(1.0, 0.0, 2.0);
        assert!(lj.mix(&harm).is_none());
    }
}
