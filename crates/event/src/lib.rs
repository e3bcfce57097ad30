//! The [`EventKind`] enum and assorted types describing native input seen by
//! the overlay surface.
//!
//! Backends translate their native events (X11 `XEvent`, Win32 `MSG`) into an
//! [`EventKind`] for classification, but keep the native payload around so an
//! event can be redelivered to the content window untouched apart from its
//! destination. See [`NativeEvent`].

pub mod input;

use core::num::NonZeroU64;

use input::{ButtonState, KeyInput, PointerButton};

/// Identifier of a native window (X11 `Window`, Win32 `HWND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(NonZeroU64);

impl WindowId {
    /// Create a new [`WindowId`]. Returns `None` for the null window.
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Raw native value of the window identifier.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

/// Platform neutral classification of a native event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A key is pressed or released.
    Key(KeyInput),

    /// Pointer moved inside the surface.
    PointerMotion {
        /// X position relative to the surface.
        x: i32,
        /// Y position relative to the surface.
        y: i32,
    },

    /// A pointer button is pressed or released.
    PointerButton {
        /// The button for this action.
        button: PointerButton,
        /// The state of the button.
        state: ButtonState,
    },

    /// Wheel is scrolled.
    ///
    /// Some platforms report scrolling as button presses instead, in which
    /// case backends classify it as [`EventKind::PointerButton`].
    Scroll {
        /// Scroll delta in platform units.
        delta: i16,
    },

    /// The surface lost keyboard focus.
    FocusLost,

    /// The surface gained keyboard focus.
    FocusGained,

    /// Expose, configure, visibility and other events the surface does not route.
    Other,
}

impl EventKind {
    /// Whether this event carries user input that may go to the content window.
    #[inline]
    pub const fn is_input(&self) -> bool {
        matches!(
            self,
            Self::Key(_)
                | Self::PointerMotion { .. }
                | Self::PointerButton { .. }
                | Self::Scroll { .. }
        )
    }
}

/// A native event that can be classified and redirected to another window.
pub trait NativeEvent {
    /// Classify this event.
    fn kind(&self) -> EventKind;

    /// Rewrite the addressed window of this event to `window`.
    ///
    /// Every other field (coordinates, modifier state, timestamps) must be left unchanged.
    fn retarget(&mut self, window: WindowId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_window_id_is_unset() {
        assert_eq!(WindowId::new(0), None);
        assert_eq!(WindowId::new(0x4200007).map(WindowId::get), Some(0x4200007));
    }

    #[test]
    fn focus_events_are_not_input() {
        assert!(!EventKind::FocusLost.is_input());
        assert!(!EventKind::FocusGained.is_input());
        assert!(!EventKind::Other.is_input());
        assert!(EventKind::PointerMotion { x: 1, y: 2 }.is_input());
    }
}
