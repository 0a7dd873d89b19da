//! Shared vector and domain-box math.
//!
//! `Vec3` is `glam::DVec3` under the hood — the engine's particle state is
//! `f64` (matching spec's `vec3<f64>`), so we alias rather than wrap to keep
//! `glam`'s operator overloads and SIMD-friendly layout.

pub type Vec3 = glam::DVec3;

/// Axis-aligned domain box: `min <= max` on every axis, half-open containment.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Box3 {
    pub min: Vec3,
    pub max: Vec3,
    pub extent: Vec3,
}

impl Box3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self {
            min,
            max,
            extent: max - min,
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.extent.x * self.extent.y * self.extent.z
    }

    /// `None` iff the boxes are separated on at least one axis.
    pub fn intersection(&self, other: &Box3) -> Option<Box3> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min.x > max.x || min.y > max.y || min.z > max.z {
            None
        } else {
            Some(Box3::new(min, max))
        }
    }

    pub fn extent_axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.extent.x,
            1 => self.extent.y,
            2 => self.extent.z,
            _ => unreachable!("axis must be 0, 1 or 2"),
        }
    }

    pub fn min_axis(&self, axis: usize) -> f64 {
        index_axis(self.min, axis)
    }

    pub fn max_axis(&self, axis: usize) -> f64 {
        index_axis(self.max, axis)
    }
}

#[inline]
pub fn index_axis(v: Vec3, axis: usize) -> f64 {
    match axis {
        0 => v.x,
        1 => v.y,
        2 => v.z,
        _ => unreachable!("axis must be 0, 1 or 2"),
    }
}

#[inline]
pub fn set_axis(v: &mut Vec3, axis: usize, value: f64) {
    match axis {
        0 => v.x = value,
        1 => v.y = value,
        2 => v.z = value,
        _ => unreachable!("axis must be 0, 1 or 2"),
    }
}

/// Minimum-image displacement correction: `dr - L * round(dr / L)` on
/// whichever axes are flagged periodic; identity on the rest.
#[inline]
pub fn minimum_image(dr: Vec3, extent: Vec3, px: bool, py: bool, pz: bool) -> Vec3 {
    let mut r = dr;
    if px && extent.x > 0.0 {
        r.x -= extent.x * (r.x / extent.x).round();
    }
    if py && extent.y > 0.0 {
        r.y -= extent.y * (r.y / extent.y).round();
    }
    if pz && extent.z > 0.0 {
        r.z -= extent.z * (r.z / extent.z).round();
    }
    r
}

/// Samples a random velocity from a `dimensions`-dimensional Maxwell-Boltzmann
/// distribution with standard deviation `sigma` per axis, via Box-Muller.
/// Axes beyond `dimensions` (a 2D or 1D simulation) are left at zero.
pub fn maxwell_boltzmann_velocity(sigma: f64, dimensions: u8, rng: &mut impl rand::Rng) -> Vec3 {
    let mut normal_pair = || -> (f64, f64) {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let r = (-2.0 * u1.ln()).sqrt();
        (r * u2.cos(), r * u2.sin())
    };

    let (n0, n1) = normal_pair();
    let (n2, _) = normal_pair();
    let raw = Vec3::new(n0, n1, n2) * sigma;

    match dimensions {
        0 => Vec3::ZERO,
        1 => Vec3::new(raw.x, 0.0, 0.0),
        2 => Vec3::new(raw.x, raw.y, 0.0),
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_contains_is_inclusive() {
        let b = Box3::new(Vec3::ZERO, Vec3::splat(10.0));
        assert!(b.contains(Vec3::ZERO));
        assert!(b.contains(Vec3::splat(10.0)));
        assert!(!b.contains(Vec3::new(10.1, 5.0, 5.0)));
    }

    #[test]
    fn intersection_none_when_separated() {
        let a = Box3::new(Vec3::ZERO, Vec3::splat(1.0));
        let b = Box3::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn minimum_image_is_idempotent() {
        let extent = Vec3::splat(10.0);
        for x in [-12.3, -5.0, 0.0, 4.9, 5.0, 5.1, 23.7] {
            let r = Vec3::new(x, x * 0.5, -x);
            let once = minimum_image(r, extent, true, true, true);
            let twice = minimum_image(once, extent, true, true, true);
            assert!((once - twice).length() < 1e-12);
        }
    }

    #[test]
    fn maxwell_boltzmann_respects_dimensionality() {
        let mut rng = rand::thread_rng();
        let v2d = maxwell_boltzmann_velocity(1.0, 2, &mut rng);
        assert_eq!(v2d.z, 0.0);
        let v1d = maxwell_boltzmann_velocity(1.0, 1, &mut rng);
        assert_eq!(v1d.y, 0.0);
        assert_eq!(v1d.z, 0.0);
    }

    #[test]
    fn minimum_image_picks_shorter_path() {
        let extent = Vec3::splat(10.0);
        let r = minimum_image(Vec3::new(9.0, 0.0, 0.0), extent, true, false, false);
        assert!((r.x - (-1.0)).abs() < 1e-12);
    }
}
