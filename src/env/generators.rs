//! Fluent particle-lattice generators: expand to a flat list of
//! [`super::ParticleSpec`]s, same shape as `ParticleCuboid`/`ParticleSphere`
//! in the original engine's `env` layer but returning a `BuildResult`
//! instead of throwing on a zero spacing.

use std::sync::Arc;

use crate::error::{BuildError, BuildResult};
use crate::math::Vec3;
use crate::particle::{ParticleState, UserData};

use super::ParticleSpec;

type ThermalVelocity = Arc<dyn Fn(Vec3) -> Vec3 + Send + Sync>;

/// A regular lattice of particles filling a box, `count.0 * count.1 * count.2`
/// strong, spaced `spacing` apart on every axis starting at `origin`.
pub struct ParticleCuboid<U: UserData> {
    origin: Vec3,
    mean_velocity: Vec3,
    count: (u32, u32, u32),
    spacing: f64,
    mass: f64,
    user_type: u64,
    user_data: U,
    thermal_velocity: Option<ThermalVelocity>,
    state: ParticleState,
}

impl<U: UserData> Default for ParticleCuboid<U> {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            mean_velocity: Vec3::ZERO,
            count: (1, 1, 1),
            spacing: 0.0,
            mass: 1.0,
            user_type: 0,
            user_data: U::default(),
            thermal_velocity: None,
            state: ParticleState::ALIVE,
        }
    }
}

impl<U: UserData> ParticleCuboid<U> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn velocity(mut self, v: Vec3) -> Self {
        self.mean_velocity = v;
        self
    }

    pub fn count(mut self, x: u32, y: u32, z: u32) -> Self {
        self.count = (x, y, z);
        self
    }

    pub fn spacing(mut self, d: f64) -> Self {
        self.spacing = d;
        self
    }

    pub fn mass(mut self, m: f64) -> Self {
        self.mass = m;
        self
    }

    pub fn particle_type(mut self, t: u64) -> Self {
        self.user_type = t;
        self
    }

    pub fn user_data(mut self, u: U) -> Self {
        self.user_data = u;
        self
    }

    pub fn thermal_velocity(mut self, f: impl Fn(Vec3) -> Vec3 + Send + Sync + 'static) -> Self {
        self.thermal_velocity = Some(Arc::new(f));
        self
    }

    pub fn state(mut self, s: ParticleState) -> Self {
        self.state = s;
        self
    }

    pub fn to_particles(&self) -> BuildResult<Vec<ParticleSpec<U>>> {
        if self.spacing == 0.0 {
            return Err(BuildError::ZeroSpacing);
        }

        let (nx, ny, nz) = self.count;
        let mut particles = Vec::with_capacity((nx as usize) * (ny as usize) * (nz as usize));
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let position = self.origin + Vec3::new(x as f64, y as f64, z as f64) * self.spacing;
                    let mut velocity = self.mean_velocity;
                    if let Some(tv) = &self.thermal_velocity {
                        velocity += tv(position);
                    }
                    particles.push(ParticleSpec {
                        user_id: None,
                        user_type: self.user_type,
                        position,
                        velocity,
                        mass: self.mass,
                        state: self.state,
                        user_data: self.user_data,
                    });
                }
            }
        }
        Ok(particles)
    }
}

/// An ellipsoidal blob of particles on the same lattice as
/// [`ParticleCuboid`], clipped to `x^2/rx^2 + y^2/ry^2 + z^2/rz^2 < 1`
/// around `center`. Radii below `spacing` are clamped up to `spacing` so a
/// degenerate (sub-lattice-spacing) radius still yields at least the center
/// particle's shell.
pub struct ParticleEllipsoid<U: UserData> {
    center: Vec3,
    mean_velocity: Vec3,
    radii: Vec3,
    spacing: f64,
    mass: f64,
    user_type: u64,
    user_data: U,
    thermal_velocity: Option<ThermalVelocity>,
    state: ParticleState,
}

impl<U: UserData> Default for ParticleEllipsoid<U> {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            mean_velocity: Vec3::ZERO,
            radii: Vec3::ZERO,
            spacing: 0.0,
            mass: 1.0,
            user_type: 0,
            user_data: U::default(),
            thermal_velocity: None,
            state: ParticleState::ALIVE,
        }
    }
}

impl<U: UserData> ParticleEllipsoid<U> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    pub fn velocity(mut self, v: Vec3) -> Self {
        self.mean_velocity = v;
        self
    }

    pub fn radii(mut self, r: Vec3) -> Self {
        self.radii = r;
        self
    }

    /// Convenience for a true sphere: same radius on all three axes.
    pub fn radius(mut self, r: f64) -> Self {
        self.radii = Vec3::splat(r);
        self
    }

    pub fn spacing(mut self, d: f64) -> Self {
        self.spacing = d;
        self
    }

    pub fn mass(mut self, m: f64) -> Self {
        self.mass = m;
        self
    }

    pub fn particle_type(mut self, t: u64) -> Self {
        self.user_type = t;
        self
    }

    pub fn user_data(mut self, u: U) -> Self {
        self.user_data = u;
        self
    }

    pub fn thermal_velocity(mut self, f: impl Fn(Vec3) -> Vec3 + Send + Sync + 'static) -> Self {
        self.thermal_velocity = Some(Arc::new(f));
        self
    }

    pub fn state(mut self, s: ParticleState) -> Self {
        self.state = s;
        self
    }

    pub fn to_particles(&self) -> BuildResult<Vec<ParticleSpec<U>>> {
        if self.spacing == 0.0 {
            return Err(BuildError::ZeroSpacing);
        }

        let eff_radii = Vec3::new(
            self.radii.x.max(self.spacing),
            self.radii.y.max(self.spacing),
            self.radii.z.max(self.spacing),
        );

        let nx = (eff_radii.x / self.spacing) as i64;
        let ny = (eff_radii.y / self.spacing) as i64;
        let nz = (eff_radii.z / self.spacing) as i64;

        let mut particles = Vec::new();
        for x in -nx..nx {
            for y in -ny..ny {
                for z in -nz..nz {
                    let offset = Vec3::new(x as f64, y as f64, z as f64) * self.spacing;
                    let normalized = (offset.x * offset.x) / (eff_radii.x * eff_radii.x)
                        + (offset.y * offset.y) / (eff_radii.y * eff_radii.y)
                        + (offset.z * offset.z) / (eff_radii.z * eff_radii.z);
                    if normalized >= 1.0 {
                        continue;
                    }

                    let position = self.center + offset;
                    let mut velocity = self.mean_velocity;
                    if let Some(tv) = &self.thermal_velocity {
                        velocity += tv(position);
                    }
                    particles.push(ParticleSpec {
                        user_id: None,
                        user_type: self.user_type,
                        position,
                        velocity,
                        mass: self.mass,
                        state: self.state,
                        user_data: self.user_data,
                    });
                }
            }
        }
        Ok(particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::NoUserData;

    #[test]
    fn cuboid_rejects_zero_spacing() {
        let cuboid: ParticleCuboid<NoUserData> = ParticleCuboid::new().count(2, 2, 2);
        assert!(matches!(cuboid.to_particles(), Err(BuildError::ZeroSpacing)));
    }

    #[test]
    fn cuboid_produces_count_product_particles() {
        let cuboid: ParticleCuboid<NoUserData> = ParticleCuboid::new().count(2, 3, 4).spacing(1.0);
        let particles = cuboid.to_particles().unwrap();
        assert_eq!(particles.len(), 2 * 3 * 4);
    }

    #[test]
    fn sphere_excludes_corner_of_bounding_cube() {
        let sphere: ParticleEllipsoid<NoUserData> = ParticleEllipsoid::new().radius(3.0).spacing(1.0);
        let particles = sphere.to_particles().unwrap();
        let corner = Vec3::splat(3.0);
        assert!(particles.iter().all(|p| (p.position - corner).length() > 1e-9));
    }
}
