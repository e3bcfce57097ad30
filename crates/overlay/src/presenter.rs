//! Upload of externally produced frames and their presentation.

use anyhow::bail;
use tracing::{debug, trace};

use crate::backend::SurfaceBackend;

/// Bytes per pixel of a frame. Pixels are BGRA, tightly packed.
pub const BYTES_PER_PIXEL: usize = 4;

/// A frame produced by the external renderer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> Frame<'a> {
    pub const fn new(pixels: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes covered by `width * height` pixels.
    #[inline]
    pub const fn required_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// Cached frame texture, reallocated only when the frame size changes.
pub struct FrameTexture<T> {
    inner: Option<(u32, u32, T)>,
}

impl<T> FrameTexture<T> {
    pub const fn new() -> Self {
        Self { inner: None }
    }

    #[inline]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.inner.as_ref().map(|(width, height, _)| (*width, *height))
    }

    /// Take the cached texture out for release.
    #[inline]
    pub fn take(&mut self) -> Option<T> {
        self.inner.take().map(|(_, _, texture)| texture)
    }

    /// Get the texture for `size`, replacing the cached one if its size differs.
    pub fn get_or_realloc<B: SurfaceBackend<Texture = T>>(
        &mut self,
        backend: &mut B,
        size: (u32, u32),
    ) -> anyhow::Result<&mut T> {
        let texture = match self.inner.take() {
            Some((width, height, texture)) if (width, height) == size => texture,
            old => {
                if let Some((_, _, old)) = old {
                    backend.release_texture(old);
                }

                let texture = backend.create_texture(size)?;
                debug!("frame texture allocated: {}x{}", size.0, size.1);
                texture
            }
        };

        Ok(&mut self.inner.insert((size.0, size.1, texture)).2)
    }
}

impl<T> Default for FrameTexture<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Upload `frame`, draw it over a transparent clear and present.
///
/// The GPU context must be current.
pub fn present_frame<B: SurfaceBackend>(
    backend: &mut B,
    texture: &mut FrameTexture<B::Texture>,
    frame: Frame,
) -> anyhow::Result<()> {
    if frame.width == 0 || frame.height == 0 {
        trace!("empty frame skipped");
        return Ok(());
    }

    if frame.pixels.len() < frame.required_len() {
        bail!(
            "frame buffer too small. expected {} bytes for {}x{}, got {}",
            frame.required_len(),
            frame.width,
            frame.height,
            frame.pixels.len()
        );
    }

    let tex = texture.get_or_realloc(backend, frame.size())?;
    backend.upload(tex, &frame.pixels[..frame.required_len()])?;
    backend.draw(tex)?;
    backend.present()?;
    Ok(())
}
