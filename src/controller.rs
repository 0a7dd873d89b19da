//! Periodic actions run on a schedule independent of the force kernel, e.g.
//! a thermostat. A [`Controller`] gets direct read/write access to the whole
//! store (unlike [`crate::field::Field`], which only ever adds to `force`),
//! gated by a composable [`Trigger`].

use std::sync::Arc;

use crate::math::Vec3;
use crate::particle::{FieldMask, ParticleStore, UserData};
use crate::system::SystemContext;

#[derive(Debug, Clone, Copy)]
pub struct TriggerContext {
    pub step: u64,
    pub time: f64,
}

impl From<&SystemContext> for TriggerContext {
    fn from(ctx: &SystemContext) -> Self {
        Self { step: ctx.step(), time: ctx.time() }
    }
}

/// A boolean predicate over step/time, composable with `&`, `|`, `!`.
#[derive(Clone)]
pub struct Trigger(Arc<dyn Fn(TriggerContext) -> bool + Send + Sync>);

impl Trigger {
    pub fn new(f: impl Fn(TriggerContext) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn fires(&self, ctx: TriggerContext) -> bool {
        (self.0)(ctx)
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Fires every `k`-th step, offset by `offset` (`offset < k`).
    pub fn every(k: u64, offset: u64) -> Self {
        Self::new(move |ctx| k > 0 && ctx.step % k == offset % k)
    }

    pub fn at_step(k: u64) -> Self {
        Self::new(move |ctx| ctx.step == k)
    }

    pub fn after(k: u64) -> Self {
        Self::new(move |ctx| ctx.step >= k)
    }

    /// Fires for `step` in `[a, b)`.
    pub fn between(a: u64, b: u64) -> Self {
        Self::new(move |ctx| ctx.step >= a && ctx.step < b)
    }

    pub fn after_time(t: f64) -> Self {
        Self::new(move |ctx| ctx.time >= t)
    }

    /// Fires once per `dt` of simulated time. Tested against a small
    /// relative tolerance rather than tracking the previous firing time, so
    /// it stays a pure function of `ctx` — this can double-fire or skip a
    /// firing if the per-step `dt` doesn't divide evenly into the period.
    pub fn periodically(dt: f64) -> Self {
        Self::new(move |ctx| {
            if dt <= 0.0 {
                return false;
            }
            let phase = ctx.time.rem_euclid(dt);
            let tolerance = dt * 1e-6;
            phase < tolerance || (dt - phase) < tolerance
        })
    }
}

impl std::ops::BitAnd for Trigger {
    type Output = Trigger;
    fn bitand(self, rhs: Trigger) -> Trigger {
        Trigger::new(move |ctx| self.fires(ctx) && rhs.fires(ctx))
    }
}

impl std::ops::BitOr for Trigger {
    type Output = Trigger;
    fn bitor(self, rhs: Trigger) -> Trigger {
        Trigger::new(move |ctx| self.fires(ctx) || rhs.fires(ctx))
    }
}

impl std::ops::Not for Trigger {
    type Output = Trigger;
    fn not(self) -> Trigger {
        Trigger::new(move |ctx| !self.fires(ctx))
    }
}

/// A periodic action over the whole particle store, gated by a [`Trigger`].
pub trait Controller<S: ParticleStore<U>, U: UserData>: Send + Sync {
    fn trigger(&self) -> &Trigger;

    fn init(&mut self, _ctx: &SystemContext, _store: &mut S) {}

    fn apply(&mut self, ctx: &SystemContext, store: &mut S);
}

const TEMPERATURE_NOT_SET: f64 = -1.0;

/// Rescales velocities toward a target temperature, clamping the per-call
/// change to `max_temp_change` and preserving the population's
/// center-of-mass velocity. Ported from the source's `VelocityScalingThermostat`.
pub struct VelocityScalingThermostat {
    trigger: Trigger,
    init_temp: f64,
    target_temp: f64,
    max_temp_change: f64,
    rng: rand::rngs::StdRng,
}

impl VelocityScalingThermostat {
    pub fn new(init_temp: f64, target_temp: f64, max_temp_change: f64, trigger: Trigger) -> Self {
        Self {
            trigger,
            init_temp,
            target_temp,
            max_temp_change,
            rng: rand::SeedableRng::from_entropy(),
        }
    }

    pub fn target_only(target_temp: f64, max_temp_change: f64, trigger: Trigger) -> Self {
        Self::new(TEMPERATURE_NOT_SET, target_temp, max_temp_change, trigger)
    }

    /// Deterministic constructor for tests: fixes the Maxwell-Boltzmann RNG seed.
    pub fn with_seed(init_temp: f64, target_temp: f64, max_temp_change: f64, trigger: Trigger, seed: u64) -> Self {
        Self {
            trigger,
            init_temp,
            target_temp,
            max_temp_change,
            rng: rand::SeedableRng::seed_from_u64(seed),
        }
    }

    fn average_velocity<S: ParticleStore<U>, U: UserData>(store: &S) -> Vec3 {
        if store.is_empty() {
            return Vec3::ZERO;
        }
        let sum = (0..store.len()).fold(Vec3::ZERO, |acc, i| acc + store.velocity(i));
        sum / store.len() as f64
    }

    fn temperature<S: ParticleStore<U>, U: UserData>(store: &S, avg_v: Vec3, dimensions: u8) -> f64 {
        if dimensions == 0 || store.is_empty() {
            return 0.0;
        }
        let kinetic: f64 = (0..store.len())
            .map(|i| {
                let dv = store.velocity(i) - avg_v;
                store.mass(i) * dv.length_squared()
            })
            .sum();
        let dof = dimensions as f64 * store.len() as f64;
        kinetic / dof
    }

    fn scale_thermal_velocities<S: ParticleStore<U>, U: UserData>(store: &mut S, factor: f64, avg_v: Vec3) {
        for i in 0..store.len() {
            let v = store.velocity(i);
            store.set_velocity(i, avg_v + factor * (v - avg_v));
        }
    }
}

impl<S: ParticleStore<U>, U: UserData> Controller<S, U> for VelocityScalingThermostat {
    fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    fn init(&mut self, ctx: &SystemContext, store: &mut S) {
        debug_assert!(store.len() > 1, "thermostat needs at least two particles to define a meaningful temperature");
        if self.init_temp == TEMPERATURE_NOT_SET {
            return;
        }
        let dims = ctx.dimensions();
        for i in 0..store.len() {
            let sigma = (self.init_temp / store.mass(i)).sqrt();
            let v = crate::math::maxwell_boltzmann_velocity(sigma, dims, &mut self.rng);
            store.set_velocity(i, v);
        }
    }

    fn apply(&mut self, ctx: &SystemContext, store: &mut S) {
        debug_assert!(store.len() > 1, "thermostat needs at least two particles to define a meaningful temperature");
        if self.target_temp == TEMPERATURE_NOT_SET {
            return;
        }

        let dims = ctx.dimensions();
        let avg_v = Self::average_velocity::<S, U>(store);
        let current_t = Self::temperature::<S, U>(store, avg_v, dims);
        let diff = self.target_temp - current_t;
        let new_t = current_t + diff.clamp(-self.max_temp_change, self.max_temp_change);
        if (new_t - current_t).abs() < 1e-12 {
            return;
        }

        if current_t < 1e-12 {
            for i in 0..store.len() {
                let sigma = (new_t / store.mass(i)).sqrt();
                let v = avg_v + crate::math::maxwell_boltzmann_velocity(sigma, dims, &mut self.rng);
                store.set_velocity(i, v);
            }
        } else {
            let factor = (new_t / current_t).sqrt();
            Self::scale_thermal_velocities::<S, U>(store, factor, avg_v);
        }
    }
}

/// Fields a thermostat reads from each particle: used to document the mask
/// a caller driving `init`/`apply` through a masked view would need.
pub const THERMOSTAT_FIELDS: FieldMask = FieldMask::from_bits_truncate(FieldMask::VELOCITY.bits() | FieldMask::MASS.bits());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{AoSStore, NoUserData, ParticleRecord};

    fn store_with_velocities(velocities: &[Vec3]) -> AoSStore<NoUserData> {
        let particles = velocities
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut p = ParticleRecord::new(i as u32, 0, Vec3::ZERO, 1.0, NoUserData);
                p.velocity = v;
                p
            })
            .collect();
        AoSStore::build(particles)
    }

    #[test]
    fn trigger_composition() {
        let t = Trigger::every(2, 0) & Trigger::after(4);
        assert!(!t.fires(TriggerContext { step: 2, time: 0.0 }));
        assert!(t.fires(TriggerContext { step: 4, time: 0.0 }));
        assert!(!t.fires(TriggerContext { step: 5, time: 0.0 }));

        let either = Trigger::at_step(1) | Trigger::at_step(3);
        assert!(either.fires(TriggerContext { step: 3, time: 0.0 }));
        assert!(!either.fires(TriggerContext { step: 2, time: 0.0 }));

        let inverted = !Trigger::never();
        assert!(inverted.fires(TriggerContext { step: 0, time: 0.0 }));
    }

    #[test]
    fn thermostat_scales_toward_target_preserving_com_velocity() {
        let mut store = store_with_velocities(&[Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)]);
        let mut thermostat = VelocityScalingThermostat::with_seed(
            TEMPERATURE_NOT_SET,
            10.0,
            f64::MAX / 4.0,
            Trigger::always(),
            42,
        );
        let ctx = SystemContext::new(0.0, 0, 3);
        let com_before = VelocityScalingThermostat::average_velocity::<_, NoUserData>(&store);

        thermostat.apply(&ctx, &mut store);

        let com_after = VelocityScalingThermostat::average_velocity::<_, NoUserData>(&store);
        assert!((com_before - com_after).length() < 1e-9);

        let new_t = VelocityScalingThermostat::temperature::<_, NoUserData>(&store, com_after, 3);
        assert!((new_t - 10.0).abs() < 1e-6);
    }

    #[test]
    fn thermostat_respects_max_temp_change_clamp() {
        let mut store = store_with_velocities(&[Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)]);
        let before_t = VelocityScalingThermostat::temperature::<_, NoUserData>(&store, Vec3::ZERO, 3);

        let mut thermostat =
            VelocityScalingThermostat::with_seed(TEMPERATURE_NOT_SET, 1000.0, 0.01, Trigger::always(), 7);
        let ctx = SystemContext::new(0.0, 0, 3);
        thermostat.apply(&ctx, &mut store);

        let after_t = VelocityScalingThermostat::temperature::<_, NoUserData>(&store, Vec3::ZERO, 3);
        assert!((after_t - before_t).abs() <= 0.01 + 1e-9);
    }
}
