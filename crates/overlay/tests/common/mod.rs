#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::Arc,
    thread::{self, ThreadId},
};

use anyhow::bail;
use parking_lot::{Mutex, MutexGuard};
use proxy_overlay::{
    OverlayConfig, OverlayError, SurfaceBackend,
    backend::FrameRect,
    event::{
        EventKind, NativeEvent, WindowId,
        input::{Hotkey, Modifiers},
    },
};

pub const HOTKEY: Hotkey = Hotkey::new(23, Modifiers::SHIFT);

/// Everything the backend was asked to do.
#[derive(Debug, Default)]
pub struct Log {
    pub mapped: bool,
    pub bound: bool,
    pub viewport: Option<(u32, u32)>,
    pub window: Option<FrameRect>,
    pub viewport_updates: usize,

    pub textures_created: usize,
    pub textures_released: usize,
    pub live_textures: usize,
    pub uploads: usize,
    pub draws: usize,
    pub presents: usize,

    pub queue: VecDeque<MockEvent>,
    pub discarded: usize,
    pub sent: Vec<(WindowId, MockEvent)>,
    pub focus_requests: usize,

    pub fail_bind: bool,
    pub dropped: bool,

    /// Thread the backend was created on.
    pub owner: Option<ThreadId>,
    /// Backend calls made from any other thread.
    pub foreign_calls: usize,
}

pub type SharedLog = Arc<Mutex<Log>>;

/// Receives the log of a backend created on a surface's owner thread.
pub type LogSlot = Arc<Mutex<Option<SharedLog>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockEvent {
    pub kind: EventKind,
    pub window: Option<WindowId>,
    pub serial: u32,
}

impl MockEvent {
    pub fn new(kind: EventKind, serial: u32) -> Self {
        Self {
            kind,
            window: None,
            serial,
        }
    }
}

impl NativeEvent for MockEvent {
    fn kind(&self) -> EventKind {
        self.kind
    }

    fn retarget(&mut self, window: WindowId) {
        self.window = Some(window);
    }
}

#[derive(Debug)]
pub struct MockTexture {
    size: (u32, u32),
}

/// In-memory backend recording every call into a shared [`Log`].
pub struct MockBackend {
    log: SharedLog,
}

impl MockBackend {
    pub fn new() -> (Self, SharedLog) {
        let log = SharedLog::default();
        log.lock().owner = Some(thread::current().id());
        (Self { log: log.clone() }, log)
    }

    /// Lock the log, counting calls made off the creating thread.
    fn enter(&self) -> MutexGuard<'_, Log> {
        let mut log = self.log.lock();
        if log.owner != Some(thread::current().id()) {
            log.foreign_calls += 1;
        }
        log
    }
}

/// Backend factory handing the created backend's log out through `slot`.
pub fn factory(
    slot: &LogSlot,
) -> impl FnOnce(&OverlayConfig) -> Result<MockBackend, OverlayError> + Send + 'static {
    let slot = slot.clone();
    move |_| {
        let (backend, log) = MockBackend::new();
        *slot.lock() = Some(log);
        Ok(backend)
    }
}

impl SurfaceBackend for MockBackend {
    type Texture = MockTexture;
    type Event = MockEvent;

    const DEFAULT_HOTKEY: Hotkey = HOTKEY;

    fn show(&mut self, size: (u32, u32)) -> anyhow::Result<()> {
        let mut log = self.enter();
        log.mapped = true;
        if log.fail_bind {
            bail!("stale drawable");
        }

        log.bound = true;
        log.viewport = Some(size);
        log.viewport_updates += 1;
        Ok(())
    }

    fn hide(&mut self) {
        let mut log = self.enter();
        log.bound = false;
        log.mapped = false;
    }

    fn resize(&mut self, rect: FrameRect, gpu: bool) {
        let mut log = self.enter();
        log.window = Some(rect);
        if gpu {
            log.viewport = Some(rect.size());
            log.viewport_updates += 1;
        }
    }

    fn make_current(&mut self) -> anyhow::Result<()> {
        let mut log = self.enter();
        if log.fail_bind {
            bail!("stale drawable");
        }

        assert!(log.mapped, "context bound while unmapped");
        log.bound = true;
        Ok(())
    }

    fn create_texture(&mut self, size: (u32, u32)) -> anyhow::Result<MockTexture> {
        let mut log = self.enter();
        log.textures_created += 1;
        log.live_textures += 1;
        Ok(MockTexture { size })
    }

    fn release_texture(&mut self, _texture: MockTexture) {
        let mut log = self.enter();
        log.textures_released += 1;
        log.live_textures -= 1;
    }

    fn upload(&mut self, texture: &mut MockTexture, pixels: &[u8]) -> anyhow::Result<()> {
        assert_eq!(
            pixels.len(),
            texture.size.0 as usize * texture.size.1 as usize * 4
        );
        self.enter().uploads += 1;
        Ok(())
    }

    fn draw(&mut self, _texture: &MockTexture) -> anyhow::Result<()> {
        let mut log = self.enter();
        assert!(log.bound, "draw without bound context");
        log.draws += 1;
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        let mut log = self.enter();
        assert!(log.mapped && log.bound, "present on unmapped surface");
        log.presents += 1;
        Ok(())
    }

    fn pending_events(&mut self) -> usize {
        self.enter().queue.len()
    }

    fn next_event(&mut self) -> Option<MockEvent> {
        self.enter().queue.pop_front()
    }

    fn discard_events(&mut self) {
        let mut log = self.enter();
        let queued = log.queue.len();
        log.discarded += queued;
        log.queue.clear();
    }

    fn send_event(&mut self, target: WindowId, event: &MockEvent) {
        self.enter().sent.push((target, *event));
    }

    fn request_focus(&mut self) {
        let mut log = self.enter();
        if log.mapped {
            log.focus_requests += 1;
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        let mut log = self.enter();
        log.bound = false;
        log.dropped = true;
    }
}

pub fn config() -> OverlayConfig {
    OverlayConfig::new(640, 480, "proxy overlay test")
}

pub fn pixels(width: u32, height: u32) -> Vec<u8> {
    vec![0x7f; width as usize * height as usize * 4]
}
