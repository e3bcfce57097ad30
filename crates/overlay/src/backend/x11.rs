//! X11 window with a GLX context.

use core::{
    ffi::{CStr, c_int, c_long, c_uchar, c_ulong, c_void},
    mem,
    ptr::{self, NonNull},
};

use std::ffi::CString;

use anyhow::{Context, bail};
use once_cell::sync::OnceCell;
use proxy_overlay_event::{
    EventKind, NativeEvent, WindowId,
    input::{ButtonState, Hotkey, KeyInput, KeyInputState, Modifiers, PointerButton},
};
use tracing::{debug, trace, warn};
use x11::{
    glx::{self, GLXContext, GLXFBConfig},
    xlib,
};

use crate::{
    OverlayConfig, OverlayError,
    backend::{FrameRect, SurfaceBackend},
    gl,
    renderer::opengl::{GlTexture, QuadRenderer},
    util,
};

const GLX_CONTEXT_MAJOR_VERSION_ARB: c_int = 0x2091;
const GLX_CONTEXT_MINOR_VERSION_ARB: c_int = 0x2092;
const GLX_CONTEXT_PROFILE_MASK_ARB: c_int = 0x9126;
const GLX_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB: c_int = 0x2;

type GlXCreateContextAttribsArb = unsafe extern "C" fn(
    *mut xlib::Display,
    GLXFBConfig,
    GLXContext,
    xlib::Bool,
    *const c_int,
) -> GLXContext;

type GlXSwapIntervalExt = unsafe extern "C" fn(*mut xlib::Display, glx::GLXDrawable, c_int);

const EVENT_MASK: c_long = xlib::ExposureMask
    | xlib::StructureNotifyMask
    | xlib::VisibilityChangeMask
    | xlib::KeyPressMask
    | xlib::KeyReleaseMask
    | xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::PointerMotionMask
    | xlib::FocusChangeMask;

struct DisplayHandle(NonNull<xlib::Display>);

impl DisplayHandle {
    fn open() -> anyhow::Result<Self> {
        static THREADS: OnceCell<()> = OnceCell::new();
        THREADS.get_or_try_init(|| {
            if unsafe { xlib::XInitThreads() } == 0 {
                bail!("XInitThreads failed");
            }

            // the default handler exits the process
            unsafe {
                xlib::XSetErrorHandler(Some(on_x_error));
            }
            Ok(())
        })?;

        NonNull::new(unsafe { xlib::XOpenDisplay(ptr::null()) })
            .map(Self)
            .context("cannot open X display")
    }

    #[inline]
    fn as_ptr(&self) -> *mut xlib::Display {
        self.0.as_ptr()
    }

    fn intern_atom(&self, name: &CStr) -> xlib::Atom {
        unsafe { xlib::XInternAtom(self.as_ptr(), name.as_ptr(), xlib::False) }
    }

    /// Replace a 32-bit format property on `window`.
    fn set_property32(
        &self,
        window: xlib::Window,
        property: xlib::Atom,
        ty: xlib::Atom,
        data: &[c_ulong],
    ) {
        unsafe {
            xlib::XChangeProperty(
                self.as_ptr(),
                window,
                property,
                ty,
                32,
                xlib::PropModeReplace,
                data.as_ptr().cast::<c_uchar>(),
                data.len() as c_int,
            );
        }
    }

    fn set_steam_game(&self, window: xlib::Window, app_id: u32) {
        let atom = self.intern_atom(c"STEAM_GAME");
        self.set_property32(window, atom, xlib::XA_CARDINAL, &[app_id as c_ulong]);
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        unsafe {
            xlib::XCloseDisplay(self.as_ptr());
        }
    }
}

struct VisualInfo(NonNull<xlib::XVisualInfo>);

impl VisualInfo {
    fn depth(&self) -> c_int {
        unsafe { self.0.as_ref().depth }
    }

    fn visual(&self) -> *mut xlib::Visual {
        unsafe { self.0.as_ref().visual }
    }
}

impl Drop for VisualInfo {
    fn drop(&mut self) {
        unsafe {
            xlib::XFree(self.0.as_ptr().cast::<c_void>());
        }
    }
}

struct ColormapHandle {
    display: *mut xlib::Display,
    id: xlib::Colormap,
}

impl Drop for ColormapHandle {
    fn drop(&mut self) {
        unsafe {
            xlib::XFreeColormap(self.display, self.id);
        }
    }
}

struct WindowHandle {
    display: *mut xlib::Display,
    id: xlib::Window,
}

impl Drop for WindowHandle {
    fn drop(&mut self) {
        unsafe {
            xlib::XDestroyWindow(self.display, self.id);
            xlib::XSync(self.display, xlib::False);
        }
    }
}

struct ContextHandle {
    display: *mut xlib::Display,
    ctx: GLXContext,
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        unsafe {
            glx::glXMakeCurrent(self.display, 0, ptr::null_mut());
            glx::glXDestroyContext(self.display, self.ctx);
        }
    }
}

/// Override-redirect ARGB window presenting through GLX.
pub struct X11Backend {
    // fields drop in declaration order
    renderer: Option<QuadRenderer>,
    context: ContextHandle,
    window: WindowHandle,
    _colormap: ColormapHandle,
    _visual: VisualInfo,
    display: DisplayHandle,

    mapped: bool,
}

impl X11Backend {
    /// Create the window and GL context. The window stays unmapped until shown.
    #[tracing::instrument(skip(config), fields(width = config.width, height = config.height))]
    pub fn create(config: &OverlayConfig) -> Result<Self, OverlayError> {
        let res = unsafe { Self::try_create(config) };
        res.map_err(OverlayError::BackendInit)
    }

    unsafe fn try_create(config: &OverlayConfig) -> anyhow::Result<Self> {
        let display = DisplayHandle::open()?;
        let dpy = display.as_ptr();

        unsafe {
            let (mut error_base, mut event_base) = (0, 0);
            if glx::glXQueryExtension(dpy, &mut error_base, &mut event_base) == 0 {
                bail!("GLX extension not available");
            }

            let screen = xlib::XDefaultScreen(dpy);
            let root = xlib::XRootWindow(dpy, screen);

            let (fb_config, visual) = choose_fb_config(dpy, screen)?;
            debug!("visual depth: {}", visual.depth());

            let colormap = ColormapHandle {
                display: dpy,
                id: xlib::XCreateColormap(dpy, root, visual.visual(), xlib::AllocNone),
            };

            let mut attrs: xlib::XSetWindowAttributes = mem::zeroed();
            attrs.colormap = colormap.id;
            attrs.background_pixmap = 0;
            attrs.background_pixel = 0;
            attrs.border_pixel = 0;
            attrs.event_mask = EVENT_MASK;
            attrs.override_redirect = xlib::True;

            let id = xlib::XCreateWindow(
                dpy,
                root,
                0,
                0,
                config.width.max(1),
                config.height.max(1),
                0,
                visual.depth(),
                xlib::InputOutput as _,
                visual.visual(),
                xlib::CWColormap
                    | xlib::CWBackPixmap
                    | xlib::CWBackPixel
                    | xlib::CWBorderPixel
                    | xlib::CWEventMask
                    | xlib::CWOverrideRedirect,
                &mut attrs,
            );
            if id == 0 {
                bail!("XCreateWindow failed");
            }
            let window = WindowHandle { display: dpy, id };

            let title = CString::new(config.title.replace('\0', "")).unwrap_or_default();
            xlib::XStoreName(dpy, id, title.as_ptr());

            set_window_hints(&display, id);
            match config.app_id.filter(|&app_id| app_id != 0) {
                Some(app_id) => {
                    display.set_steam_game(id, app_id);
                    debug!("STEAM_GAME set to {app_id}");
                }
                None => warn!("no application id configured, STEAM_GAME not set"),
            }

            util::log_injection_hook();

            let context = ContextHandle {
                display: dpy,
                ctx: create_context(dpy, fb_config, &visual)?,
            };

            if glx::glXMakeCurrent(dpy, id, context.ctx) == 0 {
                bail!("glXMakeCurrent failed");
            }

            gl::load_with(|name| match CString::new(name) {
                Ok(name) => glx::glXGetProcAddress(name.as_ptr().cast())
                    .map_or(ptr::null(), |f| f as *const c_void),
                Err(_) => ptr::null(),
            });

            if let Some(swap_interval) = proc_address::<GlXSwapIntervalExt>(c"glXSwapIntervalEXT") {
                swap_interval(dpy, id, 0);
                debug!("vsync disabled");
            }

            let renderer = QuadRenderer::new().context("cannot create quad renderer")?;
            renderer.set_viewport((config.width, config.height));

            // bound only while mapped
            glx::glXMakeCurrent(dpy, 0, ptr::null_mut());
            xlib::XSync(dpy, xlib::False);

            debug!("x11 overlay window created: {id:#x}");
            Ok(Self {
                renderer: Some(renderer),
                context,
                window,
                _colormap: colormap,
                _visual: visual,
                display,
                mapped: false,
            })
        }
    }

    fn dpy(&self) -> *mut xlib::Display {
        self.display.as_ptr()
    }

    fn bind(&self) -> anyhow::Result<()> {
        if unsafe { glx::glXMakeCurrent(self.dpy(), self.window.id, self.context.ctx) } == 0 {
            bail!("glXMakeCurrent failed on window {:#x}", self.window.id);
        }

        Ok(())
    }

    fn unbind(&self) {
        unsafe {
            glx::glXMakeCurrent(self.dpy(), 0, ptr::null_mut());
        }
    }

    fn renderer(&self) -> anyhow::Result<&QuadRenderer> {
        self.renderer.as_ref().context("renderer released")
    }
}

impl SurfaceBackend for X11Backend {
    type Texture = GlTexture;
    type Event = X11Event;

    // Shift+Tab
    const DEFAULT_HOTKEY: Hotkey = Hotkey::new(23, Modifiers::SHIFT);

    fn show(&mut self, size: (u32, u32)) -> anyhow::Result<()> {
        unsafe {
            xlib::XMapRaised(self.dpy(), self.window.id);
            // window must be viewable before the drawable is touched
            xlib::XSync(self.dpy(), xlib::False);
        }
        self.mapped = true;

        self.bind()?;
        unsafe {
            self.renderer()?.set_viewport(size);
        }
        Ok(())
    }

    fn hide(&mut self) {
        self.mapped = false;
        self.unbind();
        unsafe {
            xlib::XUnmapWindow(self.dpy(), self.window.id);
            xlib::XFlush(self.dpy());
        }
    }

    fn resize(&mut self, rect: FrameRect, gpu: bool) {
        unsafe {
            xlib::XMoveResizeWindow(
                self.dpy(),
                self.window.id,
                rect.x,
                rect.y,
                rect.width.max(1),
                rect.height.max(1),
            );
        }

        if gpu {
            match self.bind().and_then(|_| self.renderer()) {
                Ok(renderer) => unsafe { renderer.set_viewport(rect.size()) },
                Err(err) => warn!("cannot update viewport. err: {err:?}"),
            }
        }

        unsafe {
            xlib::XFlush(self.dpy());
        }
    }

    fn make_current(&mut self) -> anyhow::Result<()> {
        self.bind()
    }

    fn create_texture(&mut self, size: (u32, u32)) -> anyhow::Result<GlTexture> {
        Ok(unsafe { GlTexture::new(size) })
    }

    fn release_texture(&mut self, texture: GlTexture) {
        match self.bind() {
            Ok(_) => unsafe {
                texture.delete();
                if !self.mapped {
                    self.unbind();
                }
            },
            Err(err) => warn!("texture leaked. err: {err:?}"),
        }
    }

    fn upload(&mut self, texture: &mut GlTexture, pixels: &[u8]) -> anyhow::Result<()> {
        unsafe {
            texture.upload(pixels);
        }
        Ok(())
    }

    fn draw(&mut self, texture: &GlTexture) -> anyhow::Result<()> {
        unsafe {
            self.renderer()?.draw(texture);
        }
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        unsafe {
            glx::glXSwapBuffers(self.dpy(), self.window.id);
            gl::Flush();
        }
        Ok(())
    }

    fn pending_events(&mut self) -> usize {
        let pending = unsafe { xlib::XPending(self.dpy()) };
        pending.max(0) as usize
    }

    fn next_event(&mut self) -> Option<X11Event> {
        let mut event = unsafe { mem::zeroed::<xlib::XEvent>() };
        unsafe {
            xlib::XNextEvent(self.dpy(), &mut event);
        }
        Some(X11Event(event))
    }

    fn discard_events(&mut self) {
        unsafe {
            xlib::XSync(self.dpy(), xlib::True);
        }
    }

    fn send_event(&mut self, target: WindowId, event: &X11Event) {
        let mut event = event.0;
        unsafe {
            if xlib::XSendEvent(
                self.dpy(),
                target.get() as xlib::Window,
                xlib::True,
                xlib::NoEventMask,
                &mut event,
            ) == 0
            {
                trace!("XSendEvent to {:#x} failed", target.get());
            }
            xlib::XFlush(self.dpy());
        }
    }

    fn request_focus(&mut self) {
        // BadMatch on unmapped windows
        if !self.mapped {
            return;
        }

        unsafe {
            xlib::XSetInputFocus(
                self.dpy(),
                self.window.id,
                xlib::RevertToPointerRoot,
                xlib::CurrentTime,
            );
            xlib::XFlush(self.dpy());
        }
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            match self.bind() {
                Ok(_) => drop(renderer),
                Err(err) => {
                    warn!("GL resources leaked. err: {err:?}");
                    mem::forget(renderer);
                }
            }
        }
        debug!("x11 overlay window {:#x} released", self.window.id);
    }
}

/// Native X11 event drained from the surface's queue.
pub struct X11Event(pub xlib::XEvent);

impl NativeEvent for X11Event {
    fn kind(&self) -> EventKind {
        let ev = &self.0;
        unsafe {
            match ev.get_type() {
                ty @ (xlib::KeyPress | xlib::KeyRelease) => EventKind::Key(KeyInput {
                    code: ev.key.keycode,
                    modifiers: modifiers(ev.key.state),
                    state: if ty == xlib::KeyPress {
                        KeyInputState::Pressed
                    } else {
                        KeyInputState::Released
                    },
                }),

                xlib::MotionNotify => EventKind::PointerMotion {
                    x: ev.motion.x,
                    y: ev.motion.y,
                },

                ty @ (xlib::ButtonPress | xlib::ButtonRelease) => EventKind::PointerButton {
                    button: pointer_button(ev.button.button),
                    state: if ty == xlib::ButtonPress {
                        ButtonState::Pressed
                    } else {
                        ButtonState::Released
                    },
                },

                xlib::FocusOut => EventKind::FocusLost,
                xlib::FocusIn => EventKind::FocusGained,

                _ => EventKind::Other,
            }
        }
    }

    fn retarget(&mut self, window: WindowId) {
        let window = window.get() as xlib::Window;
        let ev = &mut self.0;
        unsafe {
            match ev.get_type() {
                xlib::KeyPress | xlib::KeyRelease => {
                    ev.key.window = window;
                    ev.key.subwindow = 0;
                }

                xlib::ButtonPress | xlib::ButtonRelease => {
                    ev.button.window = window;
                    ev.button.subwindow = 0;
                }

                xlib::MotionNotify => {
                    ev.motion.window = window;
                    ev.motion.subwindow = 0;
                }

                _ => ev.any.window = window,
            }
        }
    }
}

/// Log asynchronous protocol errors instead of exiting.
///
/// Errors come from requests against windows owned by other clients, such as
/// forwarding to a routing target that was destroyed.
unsafe extern "C" fn on_x_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if let Some(event) = unsafe { event.as_ref() } {
        warn!(
            "X error {} on request {}.{} for resource {:#x}",
            event.error_code, event.request_code, event.minor_code, event.resourceid
        );
    }

    0
}

fn modifiers(state: u32) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, state & xlib::ShiftMask != 0);
    modifiers.set(Modifiers::CONTROL, state & xlib::ControlMask != 0);
    modifiers.set(Modifiers::ALT, state & xlib::Mod1Mask != 0);
    modifiers.set(Modifiers::SUPER, state & xlib::Mod4Mask != 0);
    modifiers
}

fn pointer_button(button: u32) -> PointerButton {
    match button {
        1 => PointerButton::Left,
        2 => PointerButton::Middle,
        3 => PointerButton::Right,
        8 => PointerButton::Back,
        9 => PointerButton::Forward,
        other => PointerButton::Other(other as u8),
    }
}

unsafe fn proc_address<F: Copy>(name: &CStr) -> Option<F> {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<unsafe extern "C" fn()>());

    let f = unsafe { glx::glXGetProcAddress(name.as_ptr().cast()) }?;
    Some(unsafe { mem::transmute_copy::<unsafe extern "C" fn(), F>(&f) })
}

/// Pick a double buffered RGBA framebuffer config with alpha, preferring a 32-bit visual.
unsafe fn choose_fb_config(
    dpy: *mut xlib::Display,
    screen: c_int,
) -> anyhow::Result<(GLXFBConfig, VisualInfo)> {
    let attribs = [
        glx::GLX_X_RENDERABLE,
        xlib::True,
        glx::GLX_DRAWABLE_TYPE,
        glx::GLX_WINDOW_BIT,
        glx::GLX_RENDER_TYPE,
        glx::GLX_RGBA_BIT,
        glx::GLX_X_VISUAL_TYPE,
        glx::GLX_TRUE_COLOR,
        glx::GLX_RED_SIZE,
        8,
        glx::GLX_GREEN_SIZE,
        8,
        glx::GLX_BLUE_SIZE,
        8,
        glx::GLX_ALPHA_SIZE,
        8,
        glx::GLX_DEPTH_SIZE,
        24,
        glx::GLX_STENCIL_SIZE,
        8,
        glx::GLX_DOUBLEBUFFER,
        xlib::True,
        0,
    ];

    unsafe {
        let mut count = 0;
        let configs = glx::glXChooseFBConfig(dpy, screen, attribs.as_ptr(), &mut count);
        if configs.is_null() || count <= 0 {
            if !configs.is_null() {
                xlib::XFree(configs.cast());
            }
            bail!("no matching GLX framebuffer config");
        }
        let _configs_guard = scopeguard::guard(configs, |configs| {
            xlib::XFree(configs.cast());
        });

        let configs = core::slice::from_raw_parts(configs, count as usize);
        let mut fallback = None;
        for &config in configs {
            let Some(visual) = NonNull::new(glx::glXGetVisualFromFBConfig(dpy, config)) else {
                continue;
            };
            let visual = VisualInfo(visual);

            if visual.depth() == 32 {
                return Ok((config, visual));
            }

            if fallback.is_none() {
                fallback = Some((config, visual));
            }
        }

        match fallback {
            Some(fallback) => {
                warn!("no 32-bit visual, transparency may not work");
                Ok(fallback)
            }
            None => bail!("no visual for any GLX framebuffer config"),
        }
    }
}

unsafe fn create_context(
    dpy: *mut xlib::Display,
    fb_config: GLXFBConfig,
    visual: &VisualInfo,
) -> anyhow::Result<GLXContext> {
    unsafe {
        let mut ctx: GLXContext = ptr::null_mut();

        if let Some(create_attribs) =
            proc_address::<GlXCreateContextAttribsArb>(c"glXCreateContextAttribsARB")
        {
            let attribs = [
                GLX_CONTEXT_MAJOR_VERSION_ARB,
                3,
                GLX_CONTEXT_MINOR_VERSION_ARB,
                3,
                GLX_CONTEXT_PROFILE_MASK_ARB,
                GLX_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB,
                0,
            ];
            ctx = create_attribs(dpy, fb_config, ptr::null_mut(), xlib::True, attribs.as_ptr());
            if ctx.is_null() {
                debug!("GL 3.3 context unavailable, falling back to legacy context");
            }
        }

        if ctx.is_null() {
            ctx = glx::glXCreateContext(dpy, visual.0.as_ptr(), ptr::null_mut(), xlib::True);
        }

        if ctx.is_null() {
            bail!("cannot create GLX context");
        }

        Ok(ctx)
    }
}

fn set_window_hints(display: &DisplayHandle, window: xlib::Window) {
    let pid = display.intern_atom(c"_NET_WM_PID");
    display.set_property32(
        window,
        pid,
        xlib::XA_CARDINAL,
        &[std::process::id() as c_ulong],
    );

    let window_type = display.intern_atom(c"_NET_WM_WINDOW_TYPE");
    display.set_property32(
        window,
        window_type,
        xlib::XA_ATOM,
        &[
            display.intern_atom(c"_NET_WM_WINDOW_TYPE_UTILITY"),
            display.intern_atom(c"_NET_WM_WINDOW_TYPE_DIALOG"),
        ],
    );

    let wm_state = display.intern_atom(c"_NET_WM_STATE");
    display.set_property32(
        window,
        wm_state,
        xlib::XA_ATOM,
        &[
            display.intern_atom(c"_NET_WM_STATE_ABOVE"),
            display.intern_atom(c"_NET_WM_STATE_SKIP_TASKBAR"),
            display.intern_atom(c"_NET_WM_STATE_SKIP_PAGER"),
        ],
    );

    // flags, functions, decorations, input mode, status
    let motif = display.intern_atom(c"_MOTIF_WM_HINTS");
    display.set_property32(window, motif, motif, &[2, 0, 0, 0, 0]);

    let protocols = display.intern_atom(c"WM_PROTOCOLS");
    display.set_property32(
        window,
        protocols,
        xlib::XA_ATOM,
        &[display.intern_atom(c"WM_TAKE_FOCUS")],
    );
}

/// Set the `STEAM_GAME` marker on a foreign window.
pub fn tag_window(window: WindowId, app_id: u32) -> anyhow::Result<()> {
    let display = DisplayHandle::open()?;
    display.set_steam_game(window.get() as xlib::Window, app_id);
    unsafe {
        xlib::XSync(display.as_ptr(), xlib::False);
    }

    debug!("STEAM_GAME={app_id} set on window {:#x}", window.get());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(ty: c_int, keycode: u32, state: u32) -> X11Event {
        let mut ev = unsafe { mem::zeroed::<xlib::XEvent>() };
        ev.key = xlib::XKeyEvent {
            type_: ty,
            keycode,
            state,
            window: 0x10,
            subwindow: 0x11,
            ..unsafe { mem::zeroed() }
        };
        X11Event(ev)
    }

    #[test]
    fn classifies_default_hotkey() {
        let ev = key_event(xlib::KeyPress, 23, xlib::ShiftMask);
        let EventKind::Key(input) = ev.kind() else {
            panic!("not a key event");
        };

        assert_eq!(input.state, KeyInputState::Pressed);
        assert!(X11Backend::DEFAULT_HOTKEY.matches(&input));
    }

    #[test]
    fn plain_tab_is_not_hotkey() {
        let ev = key_event(xlib::KeyRelease, 23, 0);
        let EventKind::Key(input) = ev.kind() else {
            panic!("not a key event");
        };

        assert_eq!(input.state, KeyInputState::Released);
        assert!(!X11Backend::DEFAULT_HOTKEY.matches(&input));
    }

    #[test]
    fn retarget_key_clears_subwindow() {
        let mut ev = key_event(xlib::KeyPress, 38, xlib::ControlMask | xlib::Mod1Mask);
        ev.retarget(WindowId::new(0x4200001).unwrap());

        let key = unsafe { ev.0.key };
        assert_eq!(key.window, 0x4200001);
        assert_eq!(key.subwindow, 0);
        assert_eq!(key.keycode, 38);
        assert_eq!(key.state, xlib::ControlMask | xlib::Mod1Mask);
    }

    #[test]
    fn classifies_buttons_and_focus() {
        let mut ev = unsafe { mem::zeroed::<xlib::XEvent>() };
        ev.button = xlib::XButtonEvent {
            type_: xlib::ButtonPress,
            button: 8,
            ..unsafe { mem::zeroed() }
        };
        assert_eq!(
            X11Event(ev).kind(),
            EventKind::PointerButton {
                button: PointerButton::Back,
                state: ButtonState::Pressed
            }
        );

        ev.button.button = 4;
        assert_eq!(
            X11Event(ev).kind(),
            EventKind::PointerButton {
                button: PointerButton::Other(4),
                state: ButtonState::Pressed
            }
        );

        ev.type_ = xlib::FocusOut;
        assert_eq!(X11Event(ev).kind(), EventKind::FocusLost);
        ev.type_ = xlib::FocusIn;
        assert_eq!(X11Event(ev).kind(), EventKind::FocusGained);
        ev.type_ = xlib::Expose;
        assert_eq!(X11Event(ev).kind(), EventKind::Other);
    }

    #[test]
    fn modifier_mapping() {
        assert_eq!(
            modifiers(xlib::ShiftMask | xlib::Mod4Mask),
            Modifiers::SHIFT | Modifiers::SUPER
        );
        assert_eq!(modifiers(xlib::LockMask), Modifiers::empty());
    }

    #[test]
    fn retarget_button_keeps_payload() {
        let mut ev = unsafe { mem::zeroed::<xlib::XEvent>() };
        ev.button = xlib::XButtonEvent {
            type_: xlib::ButtonPress,
            window: 0x10,
            subwindow: 0x11,
            x: 120,
            y: -4,
            x_root: 900,
            y_root: 300,
            state: xlib::ShiftMask,
            button: 3,
            ..unsafe { mem::zeroed() }
        };
        let mut ev = X11Event(ev);
        ev.retarget(WindowId::new(0x4200001).unwrap());

        let button = unsafe { ev.0.button };
        assert_eq!(button.window, 0x4200001);
        assert_eq!(button.subwindow, 0);
        assert_eq!((button.x, button.y), (120, -4));
        assert_eq!((button.x_root, button.y_root), (900, 300));
        assert_eq!(button.state, xlib::ShiftMask);
        assert_eq!(button.button, 3);
    }

    #[test]
    fn retarget_motion_keeps_payload() {
        let mut ev = unsafe { mem::zeroed::<xlib::XEvent>() };
        ev.motion = xlib::XMotionEvent {
            type_: xlib::MotionNotify,
            window: 0x10,
            subwindow: 0x11,
            x: 33,
            y: 44,
            x_root: 1033,
            y_root: 1044,
            state: xlib::Button1Mask,
            is_hint: 0,
            ..unsafe { mem::zeroed() }
        };
        let mut ev = X11Event(ev);
        ev.retarget(WindowId::new(0x4200001).unwrap());

        let motion = unsafe { ev.0.motion };
        assert_eq!(motion.window, 0x4200001);
        assert_eq!(motion.subwindow, 0);
        assert_eq!((motion.x, motion.y), (33, 44));
        assert_eq!((motion.x_root, motion.y_root), (1033, 1044));
        assert_eq!(motion.state, xlib::Button1Mask);
        assert_eq!(ev.kind(), EventKind::PointerMotion { x: 33, y: 44 });
    }

    #[test]
    fn protocol_errors_are_absorbed() {
        let mut event = xlib::XErrorEvent {
            type_: 0,
            display: ptr::null_mut(),
            serial: 7,
            error_code: 3,
            request_code: 25,
            minor_code: 0,
            resourceid: 0x5e00007,
        };

        assert_eq!(unsafe { on_x_error(ptr::null_mut(), &mut event) }, 0);
        assert_eq!(unsafe { on_x_error(ptr::null_mut(), ptr::null_mut()) }, 0);
    }
}
