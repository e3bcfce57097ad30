//! Construction time configuration of an overlay surface.

use core::time::Duration;
use std::env;

use proxy_overlay_event::input::Hotkey;
use tracing::warn;

/// Environment variable holding the application id the injection mechanism expects.
pub const APP_ID_ENV: &str = "SteamAppId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Initial width of the surface
    pub width: u32,

    /// Initial height of the surface
    pub height: u32,

    /// Native window title
    pub title: String,

    /// Application id attached to the window as the injection marker attribute.
    pub app_id: Option<u32>,

    /// Hotkey reserved by the injection mechanism.
    ///
    /// `None` uses [`SurfaceBackend::DEFAULT_HOTKEY`](crate::SurfaceBackend::DEFAULT_HOTKEY).
    pub hotkey: Option<Hotkey>,

    /// How long pointer motion is dropped after the host overlay hands focus back.
    pub suppress_motion_for: Duration,
}

impl OverlayConfig {
    pub const DEFAULT_SUPPRESS_MOTION: Duration = Duration::from_millis(500);

    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            title: title.into(),
            app_id: None,
            hotkey: None,
            suppress_motion_for: Self::DEFAULT_SUPPRESS_MOTION,
        }
    }

    /// Fill `app_id` from [`APP_ID_ENV`] if it is set.
    pub fn with_env(mut self) -> Self {
        if let Ok(value) = env::var(APP_ID_ENV) {
            match parse_app_id(&value) {
                Some(app_id) => self.app_id = Some(app_id),
                None => warn!("ignoring non numeric {APP_ID_ENV}: {value:?}"),
            }
        }

        self
    }

    pub fn with_app_id(mut self, app_id: u32) -> Self {
        self.app_id = Some(app_id);
        self
    }

    pub fn with_hotkey(mut self, hotkey: Hotkey) -> Self {
        self.hotkey = Some(hotkey);
        self
    }

    pub fn with_suppress_motion_for(mut self, duration: Duration) -> Self {
        self.suppress_motion_for = duration;
        self
    }
}

fn parse_app_id(value: &str) -> Option<u32> {
    value.trim().parse().ok().filter(|&id| id != 0)
}
