//! Read-only observation hooks run on a [`crate::controller::Trigger`]
//! schedule. Monitors never mutate the store — no concrete I/O monitor
//! (file/snapshot writer) is part of this core; see DESIGN.md.

use crate::controller::Trigger;
use crate::particle::{ParticleStore, UserData};
use crate::system::SystemContext;

/// A read-only observer invoked on its own [`Trigger`] schedule.
///
/// `before_step` and `finalize` default to no-ops; most monitors only need
/// `record`.
pub trait Monitor<S: ParticleStore<U>, U: UserData>: Send + Sync {
    fn trigger(&self) -> &Trigger;

    /// Called once before the run starts, given the run's timestep,
    /// [start, end) time window and expected step count.
    fn init(&mut self, _dt: f64, _t_start: f64, _t_end: f64, _steps: u64) {}

    fn before_step(&mut self, _ctx: &SystemContext, _store: &S) {}

    fn record(&mut self, ctx: &SystemContext, store: &S);

    fn finalize(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{AoSStore, NoUserData, ParticleRecord};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingMonitor {
        trigger: Trigger,
        records: AtomicU64,
    }

    impl Monitor<AoSStore<NoUserData>, NoUserData> for CountingMonitor {
        fn trigger(&self) -> &Trigger {
            &self.trigger
        }

        fn record(&mut self, _ctx: &SystemContext, _store: &AoSStore<NoUserData>) {
            self.records.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn monitor_trigger_gates_recording() {
        let mut monitor = CountingMonitor { trigger: Trigger::every(2, 0), records: AtomicU64::new(0) };
        let store = AoSStore::build(vec![ParticleRecord::new(0, 0, crate::math::Vec3::ZERO, 1.0, NoUserData)]);

        for step in 0..6u64 {
            let ctx = SystemContext::new(step as f64, step, 3);
            if monitor.trigger().fires(crate::controller::TriggerContext::from(&ctx)) {
                monitor.record(&ctx, &store);
            }
        }
        assert_eq!(monitor.records.load(Ordering::Relaxed), 3);
    }
}
