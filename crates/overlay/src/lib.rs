//! Transparent, always-on-top proxy surface for overlay injection.
//!
//! An [`OverlaySurface`] presents frames produced by an external renderer and
//! holds input focus so the injection hook can observe its hotkey, while every
//! other input event is redirected to the real content window.

#[cfg(target_os = "linux")]
#[allow(unsafe_op_in_unsafe_fn, clippy::all)]
mod gl {
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

pub mod backend;
pub mod config;
pub mod error;
pub mod focus;
pub mod presenter;
pub mod registry;
pub mod router;
pub mod state;
pub mod surface;
pub mod util;

#[cfg(any(target_os = "linux", windows))]
mod renderer;

pub use proxy_overlay_event as event;

pub use backend::SurfaceBackend;
pub use config::OverlayConfig;
pub use error::OverlayError;
pub use presenter::Frame;
pub use registry::OverlayRegistry;
pub use surface::OverlaySurface;

#[cfg(any(target_os = "linux", windows))]
pub use backend::PlatformBackend;
