//! molflow — a molecular-dynamics / N-body simulation core.
//!
//! An [`env::Environment`] assembles particles, interactions and boundaries
//! into validated [`env::BuiltInputs`]; those feed a chosen
//! [`particle::ParticleStore`] layout and [`container::Container`], wrapped
//! in a [`system::System`] and driven one step at a time by an
//! [`integrator::Integrator`]. See `DESIGN.md` for how each module grounds
//! in the engine this crate grew out of.

pub mod boundary;
pub mod container;
pub mod controller;
pub mod env;
pub mod error;
pub mod field;
pub mod force;
pub mod integrator;
pub mod math;
pub mod monitor;
pub mod particle;
pub mod system;

pub use boundary::{Boundary, BoundaryTable, ExponentialWall, Face, PowerLawWall, WallForce};
pub use container::{Container, DirectSum, LinkedCells};
pub use controller::{Controller, Trigger};
pub use env::{BuiltInputs, ContainerCreateInfo, Domain, Environment, InteractionScope, ParticleCuboid, ParticleEllipsoid, ParticleSpec};
pub use error::{BuildError, BuildResult, EngineError, EngineResult};
pub use field::Field;
pub use force::{Force, ForceTable};
pub use integrator::{Integrator, VelocityVerlet, Yoshida4};
pub use math::{Box3, Vec3};
pub use monitor::Monitor;
pub use particle::{AoSStore, AoSoAStore, NoUserData, ParticleId, ParticleRecord, ParticleState, ParticleStore, ParticleType, SoAStore, UserData};
pub use system::{System, SystemContext};
