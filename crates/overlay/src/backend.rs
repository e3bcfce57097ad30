//! Native window and GPU presentation backends.
//!
//! A backend owns the native window, its GPU context and the native event
//! queue. The controller in [`crate::surface`] drives it and never touches
//! platform APIs itself.

#[cfg(windows)]
pub mod win32;
#[cfg(target_os = "linux")]
pub mod x11;

use proxy_overlay_event::{NativeEvent, WindowId, input::Hotkey};

#[cfg(windows)]
pub type PlatformBackend = win32::Win32Backend;
#[cfg(target_os = "linux")]
pub type PlatformBackend = x11::X11Backend;

/// Position and size of the surface in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FrameRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Presentation backend of an overlay surface.
///
/// Creation is each backend's own constructor. Teardown is [`SurfaceBackend::release_texture`]
/// for the cached frame texture followed by dropping the backend, which releases the GPU
/// context, then the window, then every remaining native allocation.
///
/// A backend is thread affine. It is created, driven and dropped on the owner thread of
/// its [`OverlaySurface`](crate::OverlaySurface) and never crosses threads, so native
/// window queues and GPU context bindings stay on the thread that owns them.
pub trait SurfaceBackend: 'static {
    /// GPU texture holding the last uploaded frame.
    type Texture;

    /// Native event drained from the window's queue.
    type Event: NativeEvent;

    /// Hotkey of the injection mechanism in this platform's key codes.
    const DEFAULT_HOTKEY: Hotkey;

    /// Map and raise the window, wait for the display system, then bind the GPU
    /// context and apply the viewport for `size`.
    ///
    /// Errors only when the context could not be bound; the window is mapped regardless.
    fn show(&mut self, size: (u32, u32)) -> anyhow::Result<()>;

    /// Release the GPU context binding, then unmap the window.
    fn hide(&mut self);

    /// Move and resize the native window. Viewport and projection are updated only if `gpu`.
    fn resize(&mut self, rect: FrameRect, gpu: bool);

    /// Bind the GPU context to the window for the calling thread.
    fn make_current(&mut self) -> anyhow::Result<()>;

    /// Allocate a frame texture of `size`.
    fn create_texture(&mut self, size: (u32, u32)) -> anyhow::Result<Self::Texture>;

    /// Free a frame texture.
    fn release_texture(&mut self, texture: Self::Texture);

    /// Replace the whole contents of `texture` with tightly packed BGRA `pixels`.
    fn upload(&mut self, texture: &mut Self::Texture, pixels: &[u8]) -> anyhow::Result<()>;

    /// Clear to fully transparent and draw `texture` as one full-surface quad.
    fn draw(&mut self, texture: &Self::Texture) -> anyhow::Result<()>;

    /// Swap the back buffer to front.
    fn present(&mut self) -> anyhow::Result<()>;

    /// Number of events currently queued. Never blocks.
    fn pending_events(&mut self) -> usize;

    /// Take the next queued event.
    fn next_event(&mut self) -> Option<Self::Event>;

    /// Drop every event already queued or in flight from the display system.
    fn discard_events(&mut self);

    /// Deliver an already retargeted event to `target`.
    fn send_event(&mut self, target: WindowId, event: &Self::Event);

    /// Ask for keyboard focus. Ignored while unmapped.
    fn request_focus(&mut self);
}

/// Tag a foreign native window with the injection marker for `app_id`.
///
/// `0` is not a valid application id and is rejected before any native call.
#[cfg(any(target_os = "linux", windows))]
pub fn tag_window(window: WindowId, app_id: u32) -> anyhow::Result<()> {
    if app_id == 0 {
        anyhow::bail!("invalid application id 0");
    }

    #[cfg(target_os = "linux")]
    return x11::tag_window(window, app_id);

    #[cfg(windows)]
    return win32::tag_window(window, app_id);
}

#[cfg(all(test, any(target_os = "linux", windows)))]
mod tests {
    use super::*;

    #[test]
    fn tag_window_rejects_zero_app_id() {
        let err = tag_window(WindowId::new(0x4200001).unwrap(), 0).unwrap_err();
        assert_eq!(err.to_string(), "invalid application id 0");
    }
}
