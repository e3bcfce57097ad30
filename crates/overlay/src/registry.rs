//! Handle table behind the flat call surface.
//!
//! The host refers to overlays by integer handles. Unknown and destroyed
//! handles are silently ignored so the host can sequence teardown freely.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use nohash_hasher::BuildNoHashHasher;
use proxy_overlay_event::WindowId;
use tracing::{debug, trace};

use crate::{
    OverlayConfig, OverlayError,
    backend::{FrameRect, SurfaceBackend},
    presenter::Frame,
    surface::OverlaySurface,
};

pub(crate) type IntDashMap<K, V> = DashMap<K, V, BuildNoHashHasher<K>>;

pub struct OverlayRegistry<B: SurfaceBackend> {
    next_id: AtomicU32,
    map: IntDashMap<u32, Arc<OverlaySurface<B>>>,
}

impl<B: SurfaceBackend> OverlayRegistry<B> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            map: IntDashMap::default(),
        }
    }

    /// Create an overlay with `create` and return its handle. Handles are never `0`.
    pub fn create(
        &self,
        config: &OverlayConfig,
        create: impl FnOnce(&OverlayConfig) -> Result<B, OverlayError> + Send + 'static,
    ) -> Result<u32, OverlayError> {
        let surface = OverlaySurface::create(config, create)?;
        Ok(self.insert(surface))
    }

    pub fn insert(&self, surface: OverlaySurface<B>) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        self.map.insert(id, Arc::new(surface));
        debug!("overlay {id} registered");
        id
    }

    /// Live overlay for `id`.
    pub fn get(&self, id: u32) -> Result<Arc<OverlaySurface<B>>, OverlayError> {
        self.map
            .get(&id)
            .map(|surface| surface.value().clone())
            .ok_or(OverlayError::InvalidHandle(id))
    }

    /// Run `f` on the overlay for `id`. Invalid handles are a no-op.
    pub fn with<R>(&self, id: u32, f: impl FnOnce(&OverlaySurface<B>) -> R) -> Option<R> {
        // clone out so a slow call never holds the map shard
        match self.get(id) {
            Ok(surface) => Some(f(&surface)),
            Err(err) => {
                trace!("{err}");
                None
            }
        }
    }

    pub fn show(&self, id: u32) {
        self.with(id, |surface| surface.show());
    }

    pub fn hide(&self, id: u32) {
        self.with(id, |surface| surface.hide());
    }

    pub fn set_frame(&self, id: u32, rect: FrameRect) {
        self.with(id, |surface| surface.set_frame(rect));
    }

    pub fn render_frame(&self, id: u32, frame: Frame) {
        self.with(id, |surface| surface.render_frame(frame));
    }

    /// `0` unsets the routing target.
    pub fn set_routing_target(&self, id: u32, window: u64) {
        self.with(id, |surface| surface.set_routing_target(WindowId::new(window)));
    }

    /// Destroy and forget the overlay for `id`. Idempotent.
    pub fn destroy(&self, id: u32) -> bool {
        match self.map.remove(&id) {
            Some((_, surface)) => {
                surface.destroy();
                debug!("overlay {id} unregistered");
                true
            }
            None => false,
        }
    }

    /// Destroy every registered overlay.
    pub fn destroy_all(&self) {
        let ids = self.map.iter().map(|entry| *entry.key()).collect::<Vec<_>>();
        for id in ids {
            self.destroy(id);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<B: SurfaceBackend> Default for OverlayRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}
