//! Error types for construction-time and run-time-fallible operations.
//!
//! Per-step physics (force evaluation, integration) never returns `Result`:
//! invariant violations there are `debug_assert!`s that the builder is
//! supposed to make unreachable in a correctly constructed [`crate::system::System`].

use thiserror::Error;

/// Errors raised while assembling an environment into a runnable system.
///
/// All of these are fatal: the core is never entered if a `BuildError` is
/// returned, matching the "construction errors" / "configuration errors"
/// taxonomy in the engine's error-handling design.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate user particle id: {0}")]
    DuplicateId(u64),

    #[error("id-interaction references identical particle on both sides: {0}")]
    SelfIdInteraction(u64),

    #[error("id-interaction references unknown user id: {0}")]
    UnknownId(u64),

    #[error("type-interaction references unknown user type: {0}")]
    UnknownType(u64),

    #[error("domain extent on axis {axis} ({extent}) is too small for cutoff {cutoff}")]
    DomainTooSmall {
        axis: usize,
        extent: f64,
        cutoff: f64,
    },

    #[error("cannot mix forces of different families for type pair ({0}, {1})")]
    IncompatibleMixing(u64, u64),

    #[error("opposite faces on axis {0} disagree on periodicity (couples_axis requires both or neither)")]
    UncoupledPeriodicAxis(usize),

    #[error("LinkedCells does not support an infinite domain")]
    InfiniteDomainUnsupported,

    #[error("generator requested zero-distance spacing")]
    ZeroSpacing,

    #[error("particle position {0:?} lies outside the domain and infinite_domain was not requested")]
    ParticleOutsideDomain([f64; 3]),
}

/// Run-time errors that are fallible even in a correctly built system
/// (as opposed to `debug_assert!`-only invariant checks).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot divide domain of extent {0:?} into cells: extent has a non-positive axis")]
    DegenerateDomain([f64; 3]),

    #[error("integrator requires dt > 0, got {0}")]
    NonPositiveTimestep(f64),

    #[error("neither duration nor step count was specified for the integrator run")]
    UnspecifiedRunLength,
}

pub type BuildResult<T> = Result<T, BuildError>;
pub type EngineResult<T> = Result<T, EngineError>;
