//! Time-step orchestration. An [`Integrator`] is a thin loop over
//! [`System`] operations plus monitor hooks; the physics itself lives in
//! the system/container/force-table triangle.

use crate::container::Container;
use crate::particle::{ParticleState, UserData};
use crate::system::System;

/// Particles this crate's integrators drift and kick: alive or passive
/// (passive moves but doesn't exert force), never stationary or dead.
const INTEGRATED: ParticleState =
    ParticleState::from_bits_truncate(ParticleState::ALIVE.bits() | ParticleState::PASSIVE.bits());

pub trait Integrator<C: Container<U>, W: crate::boundary::WallForce, U: UserData> {
    /// Advances the system by one full step of size `dt`.
    fn step(&mut self, system: &mut System<C, W, U>, dt: f64);
}

/// Canonical two-stage (half-kick / drift / half-kick) symplectic
/// integrator. Matches spec.md §2's dataflow exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityVerlet;

impl VelocityVerlet {
    /// `v += 0.5 * dt * f / m; x += dt * v` for every integrated particle,
    /// saving the pre-drift position as `old_position` for boundary exit
    /// disambiguation.
    fn half_kick_and_drift<C: Container<U>, U: UserData>(store: &mut C::Store, dt: f64)
    where
        C: Container<U>,
    {
        for i in 0..store.len() {
            if !store.state(i).intersects(INTEGRATED) {
                continue;
            }
            let old_position = store.position(i);
            let accel = store.force(i) / store.mass(i);
            let velocity = store.velocity(i) + 0.5 * dt * accel;
            store.set_old_position(i, old_position);
            store.set_velocity(i, velocity);
            store.set_position(i, old_position + dt * velocity);
        }
    }

    fn half_kick<U: UserData>(store: &mut impl crate::particle::ParticleStore<U>, dt: f64) {
        for i in 0..store.len() {
            if !store.state(i).intersects(INTEGRATED) {
                continue;
            }
            let accel = store.force(i) / store.mass(i);
            let velocity = store.velocity(i) + 0.5 * dt * accel;
            store.set_velocity(i, velocity);
        }
    }
}

impl<C: Container<U>, W: crate::boundary::WallForce, U: UserData> Integrator<C, W, U> for VelocityVerlet {
    fn step(&mut self, system: &mut System<C, W, U>, dt: f64) {
        Self::half_kick_and_drift::<C, U>(system.container_mut().store_mut(), dt);

        system.container_mut().rebuild_structure();
        system.apply_boundary_conditions();
        system.update_forces();
        system.apply_force_fields();

        Self::half_kick::<U>(system.container_mut().store_mut(), dt);

        system.update_all_components();
        system.advance_clock(dt);
    }
}

/// Fourth-order symplectic composition of four Velocity-Verlet-shaped
/// substeps, using the standard Yoshida (1990) coefficients:
/// `w1 = 1 / (2 - 2^(1/3))`, `w0 = 1 - 2*w1`.
pub struct Yoshida4 {
    drift: [f64; 4],
    kick: [f64; 3],
}

impl Yoshida4 {
    pub fn new() -> Self {
        let w1 = 1.0 / (2.0 - 2f64.powf(1.0 / 3.0));
        let w0 = 1.0 - 2.0 * w1;
        Self {
            drift: [w1 / 2.0, (w0 + w1) / 2.0, (w0 + w1) / 2.0, w1 / 2.0],
            kick: [w1, w0, w1],
        }
    }

    fn drift_substep<U: UserData>(store: &mut impl crate::particle::ParticleStore<U>, c: f64, dt: f64) {
        for i in 0..store.len() {
            if !store.state(i).intersects(INTEGRATED) {
                continue;
            }
            let old_position = store.position(i);
            let velocity = store.velocity(i);
            store.set_old_position(i, old_position);
            store.set_position(i, old_position + c * velocity * dt);
        }
    }

    fn kick_substep<U: UserData>(store: &mut impl crate::particle::ParticleStore<U>, d: f64, dt: f64) {
        for i in 0..store.len() {
            if !store.state(i).intersects(INTEGRATED) {
                continue;
            }
            let accel = store.force(i) / store.mass(i);
            let velocity = store.velocity(i) + d * accel * dt;
            store.set_velocity(i, velocity);
        }
    }
}

impl Default for Yoshida4 {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Container<U>, W: crate::boundary::WallForce, U: UserData> Integrator<C, W, U> for Yoshida4 {
    fn step(&mut self, system: &mut System<C, W, U>, dt: f64) {
        for substep in 0..4 {
            Self::drift_substep::<U>(system.container_mut().store_mut(), self.drift[substep], dt);
            system.container_mut().rebuild_structure();
            system.apply_boundary_conditions();
            system.update_forces();
            system.apply_force_fields();
            if substep < 3 {
                Self::kick_substep::<U>(system.container_mut().store_mut(), self.kick[substep], dt);
            }
        }
        system.update_all_components();
        system.advance_clock(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yoshida4_coefficients_sum_to_one_drift_and_zero_net_kick_asymmetry() {
        let y = Yoshida4::new();
        let drift_sum: f64 = y.drift.iter().sum();
        assert!((drift_sum - 1.0).abs() < 1e-12);
        let kick_sum: f64 = y.kick.iter().sum();
        assert!((kick_sum - 1.0).abs() < 1e-12);
    }
}
