//! Particle lifecycle flags and the field-selection bitset.

use bitflags::bitflags;

bitflags! {
    /// One-way-mostly lifecycle state of a particle.
    ///
    /// `ALIVE -> DEAD` is the only state transition a physics operation may
    /// perform; `PASSIVE`/`STATIONARY` are static classifications fixed at
    /// build time. `INVALID` only ever appears in chunked (AoSoA) storage
    /// holes and must never be observed by a physics kernel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct ParticleState: u8 {
        /// Moves, exerts and experiences forces.
        const ALIVE      = 1 << 0;
        /// Inactive; no movement or interaction.
        const DEAD       = 1 << 1;
        /// Moves, experiences forces, but exerts none.
        const PASSIVE    = 1 << 2;
        /// Exerts forces but does not move or respond.
        const STATIONARY = 1 << 3;
        /// Sentinel marking a storage hole in a chunked layout.
        const INVALID    = 1 << 7;

        /// Particles that can exert force on others.
        const EXERTING = Self::ALIVE.bits() | Self::STATIONARY.bits();
        /// Particles that can move (whether or not they exert force).
        const MOVABLE  = Self::ALIVE.bits() | Self::PASSIVE.bits();
        /// Matches every non-invalid state.
        const ALL = 0b0111_1111;
    }
}

impl Default for ParticleState {
    fn default() -> Self {
        ParticleState::ALIVE
    }
}

bitflags! {
    /// Compile-time-intended field selector for views/refs into the particle
    /// store. Declared by every `Force`/`Boundary`/`Field`/`Controller` as
    /// the fields it touches; used to size `InteractionProp`-adjacent
    /// metadata and to document (and, in debug builds, assert) access
    /// contracts. See DESIGN.md for why this is a runtime bitset rather than
    /// a const-generic-specialized view type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldMask: u16 {
        const POSITION      = 1 << 0;
        const VELOCITY      = 1 << 1;
        const FORCE         = 1 << 2;
        const OLD_POSITION  = 1 << 3;
        const MASS          = 1 << 4;
        const STATE         = 1 << 5;
        const TYPE          = 1 << 6;
        const ID            = 1 << 7;
        const USER_DATA     = 1 << 8;
        const NONE = 0;
        const ALL = (1 << 9) - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movable_excludes_stationary() {
        assert!(!ParticleState::MOVABLE.contains(ParticleState::STATIONARY));
        assert!(ParticleState::MOVABLE.contains(ParticleState::ALIVE));
        assert!(ParticleState::MOVABLE.contains(ParticleState::PASSIVE));
    }

    #[test]
    fn all_excludes_invalid() {
        assert!(!ParticleState::ALL.contains(ParticleState::INVALID));
    }
}
