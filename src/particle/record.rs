//! Canonical per-particle state (spec.md §3 `ParticleRecord`).

use crate::math::Vec3;
use crate::particle::state::ParticleState;

/// Marker for user-supplied per-particle payloads: trivially copyable,
/// default-constructible, no drop glue — the Rust analogue of the source's
/// `IsUserData` concept (`std::default_initializable` + trivially copyable).
///
/// `charge` defaults to zero so any payload type can implement this trait
/// with an empty `impl` block; `Force::Coulomb` is the only caller that
/// reads a non-zero value.
pub trait UserData: Copy + Default + Send + Sync + 'static {
    fn charge(&self) -> f64 {
        0.0
    }
}

/// Sentinel payload for simulations that carry no extra per-particle data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoUserData;

impl UserData for NoUserData {}

/// Dense particle identifier, assigned at build time.
pub type ParticleId = u32;
/// Dense particle type, assigned at build time.
pub type ParticleType = u16;

#[derive(Debug, Clone, Copy)]
pub struct ParticleRecord<U: UserData = NoUserData> {
    pub id: ParticleId,
    pub type_: ParticleType,
    pub position: Vec3,
    pub velocity: Vec3,
    pub force: Vec3,
    pub old_position: Vec3,
    pub mass: f64,
    pub state: ParticleState,
    pub user_data: U,
}

impl<U: UserData> ParticleRecord<U> {
    pub fn new(id: ParticleId, type_: ParticleType, position: Vec3, mass: f64, user_data: U) -> Self {
        Self {
            id,
            type_,
            position,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            old_position: position,
            mass,
            state: ParticleState::ALIVE,
            user_data,
        }
    }

    /// Sentinel record used to pad chunked (AoSoA) storage holes. Never
    /// observed by a physics kernel: `position = +inf` makes the cutoff
    /// check (`r^2 > cutoff^2`) reject any pair touching it without any
    /// explicit lane masking.
    pub fn sentinel() -> Self {
        Self {
            id: ParticleId::MAX,
            type_: 0,
            position: Vec3::splat(f64::INFINITY),
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            old_position: Vec3::splat(f64::INFINITY),
            mass: 1.0,
            state: ParticleState::INVALID,
            user_data: U::default(),
        }
    }

    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.state.contains(ParticleState::INVALID)
    }
}
