//! Win32 popup window presenting through a D3D11 swap chain.
//!
//! Window messages can only be retrieved by the thread that created the window,
//! so a [`Win32Backend`] must be driven from its creating thread.

use std::collections::VecDeque;

use anyhow::{Context, bail};
use once_cell::sync::{Lazy, OnceCell};
use proxy_overlay_event::{
    EventKind, NativeEvent, WindowId,
    input::{ButtonState, Hotkey, KeyInput, KeyInputState, Modifiers, PointerButton},
};
use tracing::{debug, trace, warn};
use windows::{
    Win32::{
        Foundation::{HMODULE, HWND, LPARAM, LRESULT, WPARAM},
        Graphics::{
            Direct3D::D3D_DRIVER_TYPE_HARDWARE,
            Direct3D11::{
                D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION,
                D3D11CreateDeviceAndSwapChain, ID3D11Device, ID3D11DeviceContext,
                ID3D11RenderTargetView, ID3D11Texture2D,
            },
            Dwm::{DwmExtendFrameIntoClientArea, DwmFlush},
            Dxgi::{
                Common::{
                    DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_UNKNOWN, DXGI_MODE_DESC,
                    DXGI_SAMPLE_DESC,
                },
                DXGI_PRESENT, DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_CHAIN_FLAG, DXGI_SWAP_EFFECT_DISCARD,
                DXGI_USAGE_RENDER_TARGET_OUTPUT, IDXGISwapChain,
            },
        },
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            Controls::MARGINS,
            Input::KeyboardAndMouse::{
                GetKeyState, SetFocus, VIRTUAL_KEY, VK_CONTROL, VK_LWIN, VK_MENU, VK_RWIN,
                VK_SHIFT, VK_TAB,
            },
            WindowsAndMessaging::{
                self as msg, CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW,
                DestroyWindow, DispatchMessageW, HWND_TOPMOST, IDC_ARROW, LoadCursorW, MSG,
                PM_REMOVE, PeekMessageW, PostMessageW, RegisterClassExW, SW_HIDE, SW_SHOW,
                SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SetForegroundWindow, SetWindowPos,
                ShowWindow, WNDCLASSEXW, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP, XBUTTON1,
                XBUTTON2,
            },
        },
    },
    core::{BOOL, HSTRING, PCWSTR, w},
};

use crate::{
    OverlayConfig, OverlayError,
    backend::{FrameRect, SurfaceBackend},
    registry::IntDashMap,
    renderer::dx11::{Dx11Renderer, Dx11Texture},
    util,
};

const CLASS_NAME: PCWSTR = w!("ProxyOverlaySurface");

/// Upper bound of messages pulled from the queue per drain.
const MAX_PUMPED_MESSAGES: usize = 256;

/// Focus messages are sent, not posted, so they reach [`wnd_proc`] instead of
/// the message queue. Keyed by window handle.
static FOCUS_MESSAGES: Lazy<IntDashMap<usize, Vec<u32>>> = Lazy::new(IntDashMap::default);

struct WindowHandle(HWND);

impl WindowHandle {
    #[inline]
    fn key(&self) -> usize {
        self.0.0 as usize
    }
}

impl Drop for WindowHandle {
    fn drop(&mut self) {
        FOCUS_MESSAGES.remove(&self.key());
        if let Err(err) = unsafe { DestroyWindow(self.0) } {
            warn!("DestroyWindow failed. err: {err:?}");
        }
    }
}

/// Topmost popup window presenting through D3D11.
pub struct Win32Backend {
    // fields drop in declaration order
    renderer: Dx11Renderer,
    target: Option<ID3D11RenderTargetView>,
    swapchain: IDXGISwapChain,
    cx: ID3D11DeviceContext,
    device: ID3D11Device,
    window: WindowHandle,

    buffer_size: (u32, u32),
    viewport: (u32, u32),
    queue: VecDeque<Win32Event>,
    mapped: bool,
}

impl Win32Backend {
    /// Create the window, device and swap chain. The window stays hidden until shown.
    #[tracing::instrument(skip(config), fields(width = config.width, height = config.height))]
    pub fn create(config: &OverlayConfig) -> Result<Self, OverlayError> {
        Self::try_create(config).map_err(OverlayError::BackendInit)
    }

    fn try_create(config: &OverlayConfig) -> anyhow::Result<Self> {
        let size = (config.width.max(1), config.height.max(1));

        unsafe {
            let instance: HMODULE = GetModuleHandleW(None)?;
            register_class(instance)?;

            let hwnd = CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                CLASS_NAME,
                &HSTRING::from(config.title.as_str()),
                WS_POPUP,
                0,
                0,
                size.0 as _,
                size.1 as _,
                None,
                None,
                Some(instance.into()),
                None,
            )?;
            FOCUS_MESSAGES.insert(hwnd.0 as usize, Vec::new());
            let window = WindowHandle(hwnd);

            // per pixel alpha of the client area
            let margins = MARGINS {
                cxLeftWidth: -1,
                cxRightWidth: -1,
                cyTopHeight: -1,
                cyBottomHeight: -1,
            };
            if let Err(err) = DwmExtendFrameIntoClientArea(hwnd, &margins) {
                warn!("cannot extend frame into client area, transparency may not work. err: {err:?}");
            }

            let desc = DXGI_SWAP_CHAIN_DESC {
                BufferCount: 1,
                BufferDesc: DXGI_MODE_DESC {
                    Width: size.0,
                    Height: size.1,
                    Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                    ..Default::default()
                },
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    ..Default::default()
                },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                OutputWindow: hwnd,
                Windowed: BOOL(1),
                SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
                ..Default::default()
            };

            let mut swapchain = None;
            let mut device = None;
            let mut cx = None;
            D3D11CreateDeviceAndSwapChain(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                None,
                D3D11_SDK_VERSION,
                Some(&desc),
                Some(&mut swapchain),
                Some(&mut device),
                None,
                Some(&mut cx),
            )
            .context("D3D11CreateDeviceAndSwapChain failed")?;
            let swapchain = swapchain.context("swap chain creation failed")?;
            let device = device.context("device creation failed")?;
            let cx = cx.context("device context creation failed")?;

            let target = create_target(&device, &swapchain)?;
            let renderer = Dx11Renderer::new(&device)?;

            match config.app_id {
                Some(app_id) => debug!("application id: {app_id}"),
                None => warn!("no application id configured"),
            }
            util::log_injection_hook();

            debug!("win32 overlay window created: {:#x}", hwnd.0 as usize);
            Ok(Self {
                renderer,
                target: Some(target),
                swapchain,
                cx,
                device,
                window,
                buffer_size: size,
                viewport: size,
                queue: VecDeque::new(),
                mapped: false,
            })
        }
    }

    #[inline]
    fn hwnd(&self) -> HWND {
        self.window.0
    }

    fn resize_buffers(&mut self, size: (u32, u32)) -> anyhow::Result<()> {
        self.viewport = size;

        let size = (size.0.max(1), size.1.max(1));
        if self.buffer_size == size && self.target.is_some() {
            return Ok(());
        }

        self.target = None;
        unsafe {
            self.cx.OMSetRenderTargets(None, None);
            self.swapchain.ResizeBuffers(
                0,
                size.0,
                size.1,
                DXGI_FORMAT_UNKNOWN,
                DXGI_SWAP_CHAIN_FLAG(0),
            )?;
        }
        self.target = Some(create_target(&self.device, &self.swapchain)?);
        self.buffer_size = size;

        trace!("swap chain resized to {}x{}", size.0, size.1);
        Ok(())
    }

    fn take_focus_messages(&mut self) {
        let Some(mut messages) = FOCUS_MESSAGES.get_mut(&self.window.key()) else {
            return;
        };

        self.queue
            .extend(messages.drain(..).map(|msg| Win32Event::new(msg, WPARAM(0), LPARAM(0))));
    }
}

impl SurfaceBackend for Win32Backend {
    type Texture = Dx11Texture;
    type Event = Win32Event;

    // Shift+Tab
    const DEFAULT_HOTKEY: Hotkey = Hotkey::new(VK_TAB.0 as u32, Modifiers::SHIFT);

    fn show(&mut self, size: (u32, u32)) -> anyhow::Result<()> {
        unsafe {
            _ = ShowWindow(self.hwnd(), SW_SHOW);
            if let Err(err) = SetWindowPos(
                self.hwnd(),
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE,
            ) {
                debug!("SetWindowPos failed. err: {err:?}");
            }

            // wait for the compositor before presenting
            if let Err(err) = DwmFlush() {
                trace!("DwmFlush failed. err: {err:?}");
            }
        }
        self.mapped = true;

        self.make_current()?;
        self.resize_buffers(size)
    }

    fn hide(&mut self) {
        self.mapped = false;
        unsafe {
            self.cx.OMSetRenderTargets(None, None);
            self.cx.ClearState();
            _ = ShowWindow(self.hwnd(), SW_HIDE);
        }
    }

    fn resize(&mut self, rect: FrameRect, gpu: bool) {
        if let Err(err) = unsafe {
            SetWindowPos(
                self.hwnd(),
                Some(HWND_TOPMOST),
                rect.x,
                rect.y,
                rect.width.max(1) as _,
                rect.height.max(1) as _,
                SWP_NOACTIVATE,
            )
        } {
            warn!("SetWindowPos failed. err: {err:?}");
        }

        if gpu {
            if let Err(err) = self.resize_buffers(rect.size()) {
                warn!("cannot resize swap chain. err: {err:?}");
            }
        }
    }

    fn make_current(&mut self) -> anyhow::Result<()> {
        unsafe { self.device.GetDeviceRemovedReason() }.context("D3D11 device removed")
    }

    fn create_texture(&mut self, size: (u32, u32)) -> anyhow::Result<Dx11Texture> {
        Dx11Texture::new(&self.device, size)
    }

    fn release_texture(&mut self, texture: Dx11Texture) {
        drop(texture);
    }

    fn upload(&mut self, texture: &mut Dx11Texture, pixels: &[u8]) -> anyhow::Result<()> {
        texture.upload(&self.cx, pixels)
    }

    fn draw(&mut self, texture: &Dx11Texture) -> anyhow::Result<()> {
        let target = self.target.as_ref().context("no render target")?;
        self.renderer.draw(&self.cx, target, self.viewport, texture);
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        unsafe { self.swapchain.Present(0, DXGI_PRESENT(0)) }.ok()?;
        Ok(())
    }

    fn pending_events(&mut self) -> usize {
        let mut msg = MSG::default();
        for _ in 0..MAX_PUMPED_MESSAGES {
            if !unsafe { PeekMessageW(&mut msg, Some(self.hwnd()), 0, 0, PM_REMOVE) }.as_bool() {
                break;
            }

            if is_input_message(msg.message) {
                self.queue
                    .push_back(Win32Event::new(msg.message, msg.wParam, msg.lParam));
            } else {
                unsafe {
                    DispatchMessageW(&msg);
                }
                self.take_focus_messages();
            }
        }
        self.take_focus_messages();

        self.queue.len()
    }

    fn next_event(&mut self) -> Option<Win32Event> {
        self.queue.pop_front()
    }

    fn discard_events(&mut self) {
        let mut msg = MSG::default();
        for _ in 0..MAX_PUMPED_MESSAGES {
            if !unsafe { PeekMessageW(&mut msg, Some(self.hwnd()), 0, 0, PM_REMOVE) }.as_bool() {
                break;
            }

            if !is_input_message(msg.message) {
                unsafe {
                    DispatchMessageW(&msg);
                }
            }
        }

        self.queue.clear();
        if let Some(mut messages) = FOCUS_MESSAGES.get_mut(&self.window.key()) {
            messages.clear();
        }
    }

    fn send_event(&mut self, target: WindowId, event: &Win32Event) {
        if let Err(err) = unsafe {
            PostMessageW(
                Some(HWND(target.get() as _)),
                event.msg,
                event.wparam,
                event.lparam,
            )
        } {
            trace!("PostMessageW to {:#x} failed. err: {err:?}", target.get());
        }
    }

    fn request_focus(&mut self) {
        if !self.mapped {
            return;
        }

        unsafe {
            _ = SetForegroundWindow(self.hwnd());
            if let Err(err) = SetFocus(Some(self.hwnd())) {
                trace!("SetFocus failed. err: {err:?}");
            }
        }
    }
}

impl Drop for Win32Backend {
    fn drop(&mut self) {
        unsafe {
            self.cx.ClearState();
            self.cx.Flush();
        }
        debug!("win32 overlay window {:#x} released", self.window.key());
    }
}

/// Window message captured from the surface's queue.
#[derive(Debug, Clone, Copy)]
pub struct Win32Event {
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    modifiers: Modifiers,
    target: Option<WindowId>,
}

impl Win32Event {
    fn new(msg: u32, wparam: WPARAM, lparam: LPARAM) -> Self {
        Self {
            msg,
            wparam,
            lparam,
            modifiers: current_modifiers(),
            target: None,
        }
    }

    /// Window the event was retargeted to.
    pub fn target(&self) -> Option<WindowId> {
        self.target
    }
}

impl NativeEvent for Win32Event {
    fn kind(&self) -> EventKind {
        match self.msg {
            msg::WM_KEYDOWN | msg::WM_SYSKEYDOWN => self.key(KeyInputState::Pressed),
            msg::WM_KEYUP | msg::WM_SYSKEYUP => self.key(KeyInputState::Released),

            msg::WM_MOUSEMOVE => {
                let [x, y] = bytemuck::cast::<_, [i16; 2]>(self.lparam.0 as u32);
                EventKind::PointerMotion {
                    x: x as i32,
                    y: y as i32,
                }
            }

            msg::WM_LBUTTONDOWN => button(PointerButton::Left, ButtonState::Pressed),
            msg::WM_LBUTTONUP => button(PointerButton::Left, ButtonState::Released),
            msg::WM_RBUTTONDOWN => button(PointerButton::Right, ButtonState::Pressed),
            msg::WM_RBUTTONUP => button(PointerButton::Right, ButtonState::Released),
            msg::WM_MBUTTONDOWN => button(PointerButton::Middle, ButtonState::Pressed),
            msg::WM_MBUTTONUP => button(PointerButton::Middle, ButtonState::Released),
            msg::WM_XBUTTONDOWN | msg::WM_XBUTTONUP => {
                let [_, xbutton] = bytemuck::cast::<_, [u16; 2]>(self.wparam.0 as u32);
                let state = if self.msg == msg::WM_XBUTTONDOWN {
                    ButtonState::Pressed
                } else {
                    ButtonState::Released
                };

                match xbutton {
                    XBUTTON1 => button(PointerButton::Back, state),
                    XBUTTON2 => button(PointerButton::Forward, state),
                    other => button(PointerButton::Other(other as u8), state),
                }
            }

            msg::WM_MOUSEWHEEL | msg::WM_MOUSEHWHEEL => {
                let [_, delta] = bytemuck::cast::<_, [i16; 2]>(self.wparam.0 as u32);
                EventKind::Scroll { delta }
            }

            msg::WM_KILLFOCUS => EventKind::FocusLost,
            msg::WM_SETFOCUS => EventKind::FocusGained,

            _ => EventKind::Other,
        }
    }

    fn retarget(&mut self, window: WindowId) {
        self.target = Some(window);
    }
}

impl Win32Event {
    fn key(&self, state: KeyInputState) -> EventKind {
        EventKind::Key(KeyInput {
            code: self.wparam.0 as u32,
            modifiers: self.modifiers,
            state,
        })
    }
}

#[inline]
fn button(button: PointerButton, state: ButtonState) -> EventKind {
    EventKind::PointerButton { button, state }
}

fn is_input_message(msg: u32) -> bool {
    matches!(
        msg,
        msg::WM_KEYDOWN
            | msg::WM_KEYUP
            | msg::WM_SYSKEYDOWN
            | msg::WM_SYSKEYUP
            | msg::WM_MOUSEMOVE
            | msg::WM_LBUTTONDOWN
            | msg::WM_LBUTTONUP
            | msg::WM_RBUTTONDOWN
            | msg::WM_RBUTTONUP
            | msg::WM_MBUTTONDOWN
            | msg::WM_MBUTTONUP
            | msg::WM_XBUTTONDOWN
            | msg::WM_XBUTTONUP
            | msg::WM_MOUSEWHEEL
            | msg::WM_MOUSEHWHEEL
    )
}

fn current_modifiers() -> Modifiers {
    fn down(key: VIRTUAL_KEY) -> bool {
        unsafe { GetKeyState(key.0 as i32) < 0 }
    }

    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, down(VK_SHIFT));
    modifiers.set(Modifiers::CONTROL, down(VK_CONTROL));
    modifiers.set(Modifiers::ALT, down(VK_MENU));
    modifiers.set(Modifiers::SUPER, down(VK_LWIN) || down(VK_RWIN));
    modifiers
}

fn register_class(instance: HMODULE) -> anyhow::Result<()> {
    static CLASS: OnceCell<u16> = OnceCell::new();

    CLASS.get_or_try_init(|| {
        let atom = unsafe {
            RegisterClassExW(&WNDCLASSEXW {
                cbSize: size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(wnd_proc),
                hInstance: instance.into(),
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                lpszClassName: CLASS_NAME,
                ..Default::default()
            })
        };
        if atom == 0 {
            bail!("failed to register window class");
        }

        Ok(atom)
    })?;

    Ok(())
}

fn create_target(
    device: &ID3D11Device,
    swapchain: &IDXGISwapChain,
) -> anyhow::Result<ID3D11RenderTargetView> {
    unsafe {
        let back_buffer = swapchain.GetBuffer::<ID3D11Texture2D>(0)?;

        let mut target = None;
        device.CreateRenderTargetView(&back_buffer, None, Some(&mut target))?;
        target.context("cannot create render target")
    }
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        // host owns the lifecycle
        msg::WM_CLOSE => return LRESULT(0),

        msg::WM_SETFOCUS | msg::WM_KILLFOCUS => {
            if let Some(mut messages) = FOCUS_MESSAGES.get_mut(&(hwnd.0 as usize)) {
                messages.push(msg);
            }
        }

        _ => {}
    }

    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// Windows has no window property the injection mechanism looks for.
pub fn tag_window(_window: WindowId, _app_id: u32) -> anyhow::Result<()> {
    bail!("window tagging is not supported on this platform")
}
