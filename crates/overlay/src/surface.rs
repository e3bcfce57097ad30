//! The overlay window controller.

use core::mem;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use anyhow::{Context, anyhow};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use proxy_overlay_event::{NativeEvent, WindowId};
use tracing::{debug, trace, warn};

use crate::{
    OverlayConfig, OverlayError,
    backend::{FrameRect, SurfaceBackend},
    presenter::{self, Frame, FrameTexture},
    router::{InputRouter, Route},
    state::{LifecycleCell, LifecycleState},
};

type Job<B> = Box<dyn FnOnce(&mut RenderState<B>) + Send>;

/// A transparent, always-on-top surface presenting external frames.
///
/// Each surface owns a thread that creates the backend, runs every window, GPU and
/// event queue call, and finally tears the backend down. Operations may be called
/// from any thread; they are forwarded to the owner thread and return once it has
/// run them.
///
/// Every operation takes the render-path lock, so `render_frame`, `set_frame`,
/// `show`, `hide` and `destroy` never run concurrently for the same surface.
/// Once destroyed, every operation is a no-op.
pub struct OverlaySurface<B: SurfaceBackend> {
    state: Arc<LifecycleCell>,
    worker: Mutex<Option<Worker<B>>>,
}

struct Worker<B: SurfaceBackend> {
    jobs: Sender<Job<B>>,
    thread: JoinHandle<()>,

    // reused frame copy handed to the owner thread
    scratch: Vec<u8>,
}

impl<B: SurfaceBackend> Worker<B> {
    /// Run `f` on the owner thread and wait for its result.
    fn call<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut RenderState<B>) -> R + Send + 'static,
    ) -> Option<R> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.jobs
            .send(Box::new(move |render: &mut RenderState<B>| {
                _ = tx.send(f(render));
            }))
            .ok()?;

        rx.recv().ok()
    }
}

impl<B: SurfaceBackend> OverlaySurface<B> {
    /// Spawn the owner thread and create the backend on it with `create`.
    #[tracing::instrument(skip_all)]
    pub fn create<F>(config: &OverlayConfig, create: F) -> Result<Self, OverlayError>
    where
        F: FnOnce(&OverlayConfig) -> Result<B, OverlayError> + Send + 'static,
    {
        let state = Arc::new(LifecycleCell::new());
        let (jobs, rx) = crossbeam_channel::unbounded::<Job<B>>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new()
            .name("proxy-overlay".to_string())
            .spawn({
                let config = config.clone();
                let state = state.clone();

                move || {
                    let backend = match create(&config) {
                        Ok(backend) => backend,
                        Err(err) => {
                            _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                    _ = ready_tx.send(Ok(()));

                    RenderState::new(backend, &config, state).run(rx);
                }
            })
            .context("cannot spawn overlay thread")
            .map_err(OverlayError::BackendInit)?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(OverlayError::BackendInit(anyhow!(
                "overlay thread exited during creation"
            )))
        });
        if let Err(err) = ready {
            _ = thread.join();
            return Err(err);
        }

        debug!("overlay owner thread started");
        Ok(Self {
            state,
            worker: Mutex::new(Some(Worker {
                jobs,
                thread,
                scratch: Vec::new(),
            })),
        })
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state.get().is_destroyed()
    }

    fn call<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut RenderState<B>) -> R + Send + 'static,
    ) -> Option<R> {
        self.worker.lock().as_ref()?.call(f)
    }

    /// Current position and size of the surface.
    pub fn frame(&self) -> Option<FrameRect> {
        self.call(|render| render.rect)
    }

    pub fn routing_target(&self) -> Option<WindowId> {
        self.call(|render| render.router.target()).flatten()
    }

    #[tracing::instrument(skip(self))]
    pub fn show(&self) {
        self.call(RenderState::show);
    }

    #[tracing::instrument(skip(self))]
    pub fn hide(&self) {
        self.call(RenderState::hide);
    }

    /// Reposition and resize. Allowed while hidden, in which case only the native
    /// window changes and the viewport follows on the next show.
    #[tracing::instrument(skip(self))]
    pub fn set_frame(&self, rect: FrameRect) {
        self.call(move |render| render.set_frame(rect));
    }

    /// Update the content window input is forwarded to. `None` drops forwardable input.
    pub fn set_routing_target(&self, target: Option<WindowId>) {
        self.call(move |render| {
            debug!("routing target: {:?}", target.map(WindowId::get));
            render.router.set_target(target);
        });
    }

    /// Present `frame`, then drain currently queued input.
    ///
    /// No-op unless the surface is shown.
    pub fn render_frame(&self, frame: Frame) {
        if !self.state.get().is_mapped() {
            return;
        }

        let mut worker = self.worker.lock();
        let Some(worker) = worker.as_mut() else {
            return;
        };

        let (width, height) = frame.size();
        let len = frame.pixels.len().min(frame.required_len());
        let mut pixels = mem::take(&mut worker.scratch);
        pixels.clear();
        pixels.extend_from_slice(&frame.pixels[..len]);

        let returned = worker.call(move |render| {
            render.render_frame(Frame::new(&pixels, width, height));
            pixels
        });
        if let Some(pixels) = returned {
            worker.scratch = pixels;
        }
    }

    /// Tear down texture, GPU context, window and remaining allocations on the
    /// owner thread, then join it.
    ///
    /// Idempotent and safe to call concurrently with any other operation.
    #[tracing::instrument(skip(self))]
    pub fn destroy(&self) {
        if !self.state.destroy() {
            return;
        }

        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        debug!("destroying overlay surface");
        drop(worker.jobs);
        if worker.thread.join().is_err() {
            warn!("overlay owner thread panicked");
        }
        debug!("overlay surface destroyed");
    }

    /// Size of the cached frame texture, if any.
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.call(|render| render.texture.size()).flatten()
    }
}

impl<B: SurfaceBackend> Drop for OverlaySurface<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Everything living on the owner thread.
struct RenderState<B: SurfaceBackend> {
    state: Arc<LifecycleCell>,
    backend: B,
    texture: FrameTexture<B::Texture>,
    router: InputRouter,
    rect: FrameRect,
}

impl<B: SurfaceBackend> RenderState<B> {
    fn new(backend: B, config: &OverlayConfig, state: Arc<LifecycleCell>) -> Self {
        let hotkey = config.hotkey.unwrap_or(B::DEFAULT_HOTKEY);

        Self {
            state,
            backend,
            texture: FrameTexture::new(),
            router: InputRouter::new(hotkey, config.suppress_motion_for),
            rect: FrameRect::new(0, 0, config.width, config.height),
        }
    }

    /// Serve jobs until every sender is gone, then tear down.
    fn run(mut self, jobs: Receiver<Job<B>>) {
        for job in jobs.iter() {
            job(&mut self);
        }

        if let Some(texture) = self.texture.take() {
            self.backend.release_texture(texture);
        }
        drop(self);
    }

    fn show(&mut self) {
        if self.state.transition(LifecycleState::Shown).is_err() {
            return;
        }

        debug!("showing overlay surface");
        // focus changes from the previous hide are not routed
        self.backend.discard_events();
        if let Err(err) = self.backend.show(self.rect.size()) {
            warn!("{}", OverlayError::ContextBind(err));
        }
        self.backend.request_focus();
    }

    fn hide(&mut self) {
        match self.state.transition(LifecycleState::Hidden) {
            Ok(LifecycleState::Shown) => {
                debug!("hiding overlay surface");
                self.backend.hide();
                self.backend.discard_events();
            }

            // already unmapped or destroyed
            _ => {}
        }
    }

    fn set_frame(&mut self, rect: FrameRect) {
        let state = self.state.get();
        if state.is_destroyed() {
            return;
        }

        self.rect = rect;
        self.backend.resize(rect, state.is_mapped());
    }

    fn render_frame(&mut self, frame: Frame) {
        // hidden or destroyed while the job was queued
        if !self.state.get().is_mapped() {
            return;
        }

        if let Err(err) = self.backend.make_current() {
            warn!("{}", OverlayError::ContextBind(err));
            return;
        }

        if let Err(err) = presenter::present_frame(&mut self.backend, &mut self.texture, frame) {
            warn!("failed to present frame. err: {err:?}");
        }

        self.drain_events();
    }

    fn drain_events(&mut self) {
        let pending = self.backend.pending_events();
        for _ in 0..pending {
            let Some(mut event) = self.backend.next_event() else {
                break;
            };

            let kind = event.kind();
            let decision = self
                .router
                .route(kind, Instant::now(), self.state.get().is_mapped());
            trace!("event: {kind:?} decision: {decision:?}");

            if let Route::Forward(target) = decision.route {
                event.retarget(target);
                self.backend.send_event(target, &event);
            }

            if decision.refocus {
                self.backend.request_focus();
            }
        }
    }
}
