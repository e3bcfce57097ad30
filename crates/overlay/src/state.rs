//! Lifecycle state of an overlay surface.

use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Created, never shown. The window is unmapped.
    Created = 0,

    /// Mapped and visible. The only state where the GPU context may be bound.
    Shown = 1,

    /// Unmapped after being shown.
    Hidden = 2,

    /// Torn down. Terminal.
    Destroyed = 3,
}

impl LifecycleState {
    #[inline]
    pub const fn is_mapped(self) -> bool {
        matches!(self, Self::Shown)
    }

    #[inline]
    pub const fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Check if moving from `self` to `to` is allowed.
    pub const fn can_transition(self, to: Self) -> bool {
        match (self, to) {
            (Self::Destroyed, _) => false,
            (_, Self::Created) => false,
            _ => true,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Shown,
            2 => Self::Hidden,
            _ => Self::Destroyed,
        }
    }
}

/// Atomically updated [`LifecycleState`].
#[derive(Debug)]
pub struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Created as u8))
    }

    #[inline]
    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `to` if allowed from the current state.
    ///
    /// Returns the previous state, or the current state when the transition is rejected.
    pub fn transition(&self, to: LifecycleState) -> Result<LifecycleState, LifecycleState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                LifecycleState::from_u8(current)
                    .can_transition(to)
                    .then_some(to as u8)
            })
            .map(LifecycleState::from_u8)
            .map_err(LifecycleState::from_u8)
    }

    /// Mark destroyed. Returns `true` only for the single caller which performed the change.
    #[inline]
    pub fn destroy(&self) -> bool {
        self.0.swap(LifecycleState::Destroyed as u8, Ordering::AcqRel)
            != LifecycleState::Destroyed as u8
    }
}

impl Default for LifecycleCell {
    fn default() -> Self {
        Self::new()
    }
}
