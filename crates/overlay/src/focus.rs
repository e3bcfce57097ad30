//! Focus handoff with the host overlay.
//!
//! The host overlay takes keyboard focus when its hotkey is pressed and
//! restores the pointer to a saved position when it closes. That warp must not
//! reach the content window as a pointer jump, so motion is dropped for a short
//! window after focus comes back.

use core::time::Duration;
use std::time::Instant;

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPhase {
    /// Host overlay does not hold focus.
    Idle,

    /// Focus was lost, presumably to the host overlay.
    OverlayActive,

    /// Focus came back from the host overlay. Pointer motion before `until` is dropped.
    SuppressingMotion { until: Instant },
}

#[derive(Debug)]
pub struct FocusCoordinator {
    phase: FocusPhase,
    suppress_for: Duration,
}

impl FocusCoordinator {
    pub const fn new(suppress_for: Duration) -> Self {
        Self {
            phase: FocusPhase::Idle,
            suppress_for,
        }
    }

    /// Phase as seen at `now`. An elapsed suppression reads as [`FocusPhase::Idle`].
    #[inline]
    pub fn phase(&self, now: Instant) -> FocusPhase {
        match self.phase {
            FocusPhase::SuppressingMotion { until } if now >= until => FocusPhase::Idle,
            phase => phase,
        }
    }

    /// Deadline of the motion suppression still pending at `now`.
    #[inline]
    pub fn suppress_until(&self, now: Instant) -> Option<Instant> {
        match self.phase(now) {
            FocusPhase::SuppressingMotion { until } => Some(until),
            _ => None,
        }
    }

    /// Clear the suppression once its deadline is reached.
    pub fn expire(&mut self, now: Instant) {
        if let FocusPhase::SuppressingMotion { until } = self.phase {
            if now >= until {
                trace!("motion suppression elapsed");
                self.phase = FocusPhase::Idle;
            }
        }
    }

    #[inline]
    pub const fn overlay_claimed_focus(&self) -> bool {
        matches!(self.phase, FocusPhase::OverlayActive)
    }

    /// Surface lost focus. Any pending suppression is stale and discarded.
    pub fn focus_lost(&mut self) {
        if !matches!(self.phase, FocusPhase::OverlayActive) {
            debug!("focus lost, host overlay claimed focus");
        }

        self.phase = FocusPhase::OverlayActive;
    }

    /// Surface gained focus. Arms suppression if the host overlay held focus.
    pub fn focus_gained(&mut self, now: Instant) {
        if !matches!(self.phase, FocusPhase::OverlayActive) {
            return;
        }

        if self.suppress_for.is_zero() {
            self.phase = FocusPhase::Idle;
            return;
        }

        let until = now + self.suppress_for;
        debug!("focus returned from host overlay, suppressing motion for {:?}", self.suppress_for);
        self.phase = FocusPhase::SuppressingMotion { until };
    }

    /// A real button press ends suppression early.
    pub fn button_pressed(&mut self) {
        if let FocusPhase::SuppressingMotion { .. } = self.phase {
            debug!("button pressed, motion suppression cleared");
            self.phase = FocusPhase::Idle;
        }
    }

    /// Check if pointer motion at `now` may be forwarded.
    ///
    /// Clears the suppression once its deadline is reached.
    pub fn motion_allowed(&mut self, now: Instant) -> bool {
        self.expire(now);
        !matches!(self.phase, FocusPhase::SuppressingMotion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn lose_then_gain_arms_deadline() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        assert_eq!(focus.phase(now), FocusPhase::Idle);

        focus.focus_lost();
        assert_eq!(focus.phase(now), FocusPhase::OverlayActive);
        assert!(focus.overlay_claimed_focus());

        focus.focus_gained(now);
        assert_eq!(
            focus.phase(now),
            FocusPhase::SuppressingMotion { until: now + WINDOW }
        );
        assert!(!focus.overlay_claimed_focus());
    }

    #[test]
    fn gain_without_claim_does_nothing() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        focus.focus_gained(now);
        assert_eq!(focus.phase(now), FocusPhase::Idle);
        assert_eq!(focus.suppress_until(now), None);
    }

    #[test]
    fn motion_boundary() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        focus.focus_lost();
        focus.focus_gained(now);

        let deadline = now + WINDOW;
        assert!(!focus.motion_allowed(now));
        assert!(!focus.motion_allowed(deadline - Duration::from_millis(1)));
        assert!(focus.motion_allowed(deadline));
        assert_eq!(focus.phase(now), FocusPhase::Idle);
    }

    #[test]
    fn elapsed_deadline_reads_as_idle() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        focus.focus_lost();
        focus.focus_gained(now);

        let deadline = now + WINDOW;
        assert_eq!(focus.suppress_until(now), Some(deadline));
        assert_eq!(focus.suppress_until(deadline), None);
        assert_eq!(focus.phase(deadline), FocusPhase::Idle);

        // no motion needed to clear it
        focus.expire(deadline + Duration::from_millis(1));
        assert_eq!(focus.phase(now), FocusPhase::Idle);
        assert_eq!(focus.suppress_until(now), None);
    }

    #[test]
    fn expire_keeps_pending_deadline() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        focus.focus_lost();
        focus.focus_gained(now);

        focus.expire(now + Duration::from_millis(499));
        assert_eq!(focus.suppress_until(now), Some(now + WINDOW));
    }

    #[test]
    fn button_press_clears_suppression() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        focus.focus_lost();
        focus.focus_gained(now);

        focus.button_pressed();
        assert_eq!(focus.phase(now), FocusPhase::Idle);
        assert!(focus.motion_allowed(now));
    }

    #[test]
    fn second_activation_discards_stale_deadline() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let first = Instant::now();
        focus.focus_lost();
        focus.focus_gained(first);

        focus.focus_lost();
        assert_eq!(focus.phase(first), FocusPhase::OverlayActive);
        assert_eq!(focus.suppress_until(first), None);

        let second = first + Duration::from_millis(100);
        focus.focus_gained(second);
        assert_eq!(focus.suppress_until(second), Some(second + WINDOW));
    }

    #[test]
    fn motion_allowed_while_overlay_active() {
        let mut focus = FocusCoordinator::new(WINDOW);
        let now = Instant::now();
        focus.focus_lost();
        assert!(focus.motion_allowed(now));
        assert_eq!(focus.phase(now), FocusPhase::OverlayActive);
    }

    #[test]
    fn zero_window_never_suppresses() {
        let mut focus = FocusCoordinator::new(Duration::ZERO);
        let now = Instant::now();
        focus.focus_lost();
        focus.focus_gained(now);
        assert_eq!(focus.phase(now), FocusPhase::Idle);
    }
}
