//! Routing of native input drained from the overlay surface.

use core::time::Duration;
use std::time::Instant;

use proxy_overlay_event::{
    EventKind, WindowId,
    input::{ButtonState, Hotkey},
};
use tracing::trace;

use crate::focus::FocusCoordinator;

/// Where a drained event goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Redeliver to the content window.
    Forward(WindowId),

    /// Handled by the surface itself.
    Consume,

    /// Forwardable, but suppressed or without a routing target.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub route: Route,

    /// Ask for input focus again after handling the event.
    pub refocus: bool,
}

impl Decision {
    const CONSUME: Self = Self::new(Route::Consume);
    const DROP: Self = Self::new(Route::Drop);

    const fn new(route: Route) -> Self {
        Self {
            route,
            refocus: false,
        }
    }

    const fn refocus(mut self) -> Self {
        self.refocus = true;
        self
    }
}

#[derive(Debug)]
pub struct InputRouter {
    target: Option<WindowId>,
    hotkey: Hotkey,
    focus: FocusCoordinator,
}

impl InputRouter {
    pub const fn new(hotkey: Hotkey, suppress_motion_for: Duration) -> Self {
        Self {
            target: None,
            hotkey,
            focus: FocusCoordinator::new(suppress_motion_for),
        }
    }

    #[inline]
    pub const fn target(&self) -> Option<WindowId> {
        self.target
    }

    #[inline]
    pub fn set_target(&mut self, target: Option<WindowId>) {
        self.target = target;
    }

    #[inline]
    pub const fn hotkey(&self) -> Hotkey {
        self.hotkey
    }

    #[inline]
    pub const fn focus(&self) -> &FocusCoordinator {
        &self.focus
    }

    /// Decide what to do with an event drained at `now`.
    ///
    /// `mapped` tells if the surface is currently visible.
    pub fn route(&mut self, kind: EventKind, now: Instant, mapped: bool) -> Decision {
        self.focus.expire(now);

        match kind {
            EventKind::Key(input) if self.hotkey.matches(&input) => {
                trace!("hotkey {:?} consumed", input.state);
                Decision::CONSUME
            }

            EventKind::Key(_) => self.forward(),

            EventKind::PointerMotion { .. } => {
                if self.focus.motion_allowed(now) {
                    self.forward()
                } else {
                    trace!("pointer motion suppressed");
                    Decision::DROP
                }
            }

            EventKind::PointerButton {
                state: ButtonState::Pressed,
                ..
            } => {
                self.focus.button_pressed();
                self.forward().refocus()
            }

            EventKind::PointerButton {
                state: ButtonState::Released,
                ..
            }
            | EventKind::Scroll { .. } => self.forward(),

            EventKind::FocusLost if mapped => {
                self.focus.focus_lost();
                Decision::CONSUME.refocus()
            }

            EventKind::FocusLost => Decision::CONSUME,

            EventKind::FocusGained => {
                self.focus.focus_gained(now);
                Decision::CONSUME
            }

            EventKind::Other => Decision::CONSUME,
        }
    }

    #[inline]
    fn forward(&self) -> Decision {
        match self.target {
            Some(target) => Decision::new(Route::Forward(target)),
            None => Decision::DROP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusPhase;
    use proxy_overlay_event::input::{KeyInput, KeyInputState, Modifiers, PointerButton};

    const WINDOW: Duration = Duration::from_millis(500);
    const HOTKEY: Hotkey = Hotkey::new(23, Modifiers::SHIFT);

    fn target() -> WindowId {
        WindowId::new(0x3a00004).unwrap()
    }

    fn router() -> InputRouter {
        let mut router = InputRouter::new(HOTKEY, WINDOW);
        router.set_target(Some(target()));
        router
    }

    fn key(code: u32, modifiers: Modifiers, state: KeyInputState) -> EventKind {
        EventKind::Key(KeyInput {
            code,
            modifiers,
            state,
        })
    }

    const MOTION: EventKind = EventKind::PointerMotion { x: 10, y: 20 };
    const PRESS: EventKind = EventKind::PointerButton {
        button: PointerButton::Left,
        state: ButtonState::Pressed,
    };
    const RELEASE: EventKind = EventKind::PointerButton {
        button: PointerButton::Left,
        state: ButtonState::Released,
    };

    /// Put the router into the suppressing phase, returning the deadline.
    fn suppressing(router: &mut InputRouter, now: Instant) -> Instant {
        router.route(EventKind::FocusLost, now, true);
        router.route(EventKind::FocusGained, now, true);
        router.focus().suppress_until(now).unwrap()
    }

    #[test]
    fn keys_forward_to_target() {
        let mut router = router();
        let now = Instant::now();

        for state in [KeyInputState::Pressed, KeyInputState::Released] {
            let decision = router.route(key(38, Modifiers::empty(), state), now, true);
            assert_eq!(decision.route, Route::Forward(target()));
            assert!(!decision.refocus);
        }

        // Tab without shift is an ordinary key
        let decision = router.route(key(23, Modifiers::empty(), KeyInputState::Pressed), now, true);
        assert_eq!(decision.route, Route::Forward(target()));
    }

    #[test]
    fn hotkey_never_forwarded() {
        let mut router = router();
        let now = Instant::now();
        let hotkey = key(23, Modifiers::SHIFT, KeyInputState::Pressed);
        let hotkey_up = key(23, Modifiers::SHIFT, KeyInputState::Released);

        // Idle
        assert_eq!(router.route(hotkey, now, true).route, Route::Consume);
        assert_eq!(router.route(hotkey_up, now, true).route, Route::Consume);

        // OverlayActive
        router.route(EventKind::FocusLost, now, true);
        assert_eq!(router.route(hotkey, now, true).route, Route::Consume);

        // SuppressingMotion
        router.route(EventKind::FocusGained, now, true);
        assert!(matches!(
            router.focus().phase(now),
            FocusPhase::SuppressingMotion { .. }
        ));
        assert_eq!(router.route(hotkey, now, true).route, Route::Consume);

        // Unset target
        router.set_target(None);
        assert_eq!(router.route(hotkey, now, true).route, Route::Consume);
    }

    #[test]
    fn unset_target_drops_input() {
        let mut router = InputRouter::new(HOTKEY, WINDOW);
        let now = Instant::now();

        for kind in [
            key(38, Modifiers::empty(), KeyInputState::Pressed),
            MOTION,
            RELEASE,
            EventKind::Scroll { delta: 120 },
        ] {
            assert_eq!(router.route(kind, now, true).route, Route::Drop);
        }
    }

    #[test]
    fn motion_suppressed_until_deadline() {
        let mut router = router();
        let now = Instant::now();
        let deadline = suppressing(&mut router, now);
        assert_eq!(deadline, now + WINDOW);

        assert_eq!(router.route(MOTION, now, true).route, Route::Drop);
        assert_eq!(
            router
                .route(MOTION, deadline - Duration::from_micros(1), true)
                .route,
            Route::Drop
        );
        assert_eq!(
            router.route(MOTION, deadline, true).route,
            Route::Forward(target())
        );
        assert_eq!(router.focus().phase(now), FocusPhase::Idle);
    }

    #[test]
    fn button_press_clears_suppression_and_refocuses() {
        let mut router = router();
        let now = Instant::now();
        suppressing(&mut router, now);

        let decision = router.route(PRESS, now, true);
        assert_eq!(decision.route, Route::Forward(target()));
        assert!(decision.refocus);
        assert_eq!(router.focus().suppress_until(now), None);

        assert_eq!(
            router.route(MOTION, now, true).route,
            Route::Forward(target())
        );
    }

    #[test]
    fn button_press_clears_suppression_without_target() {
        let mut router = router();
        let now = Instant::now();
        suppressing(&mut router, now);
        router.set_target(None);

        let decision = router.route(PRESS, now, true);
        assert_eq!(decision.route, Route::Drop);
        assert_eq!(router.focus().suppress_until(now), None);
    }

    #[test]
    fn button_release_is_not_suppressed() {
        let mut router = router();
        let now = Instant::now();
        suppressing(&mut router, now);

        let decision = router.route(RELEASE, now, true);
        assert_eq!(decision.route, Route::Forward(target()));
        assert!(!decision.refocus);
        assert!(router.focus().suppress_until(now).is_some());
    }

    #[test]
    fn focus_lost_requests_focus_back() {
        let mut router = router();
        let decision = router.route(EventKind::FocusLost, Instant::now(), true);

        assert_eq!(decision, Decision::CONSUME.refocus());
        assert!(router.focus().overlay_claimed_focus());
    }

    #[test]
    fn focus_lost_while_unmapped_is_ignored() {
        let mut router = router();
        let now = Instant::now();
        let decision = router.route(EventKind::FocusLost, now, false);

        assert_eq!(decision, Decision::CONSUME);
        assert_eq!(router.focus().phase(now), FocusPhase::Idle);
    }

    #[test]
    fn other_events_consumed() {
        let mut router = router();
        let decision = router.route(EventKind::Other, Instant::now(), true);
        assert_eq!(decision, Decision::CONSUME);
    }

    #[test]
    fn any_event_clears_elapsed_suppression() {
        let mut router = router();
        let now = Instant::now();
        let deadline = suppressing(&mut router, now);

        router.route(key(38, Modifiers::empty(), KeyInputState::Pressed), deadline, true);
        assert_eq!(router.focus().suppress_until(now), None);
        assert_eq!(router.focus().phase(now), FocusPhase::Idle);
    }
}
