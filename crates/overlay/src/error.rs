//! Error taxonomy of the overlay surface.
//!
//! Only [`OverlayError::BackendInit`] is meant to reach the host. The other
//! variants are logged and absorbed by the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// Native window or GPU context/device creation failed.
    ///
    /// Every resource acquired before the failure is already released.
    #[error("failed to initialize overlay backend: {0:#}")]
    BackendInit(anyhow::Error),

    /// The GPU context could not be made current.
    ///
    /// Expected to recur transiently, e.g. on a stale drawable. The frame is skipped.
    #[error("failed to bind rendering context: {0:#}")]
    ContextBind(anyhow::Error),

    /// The handle does not refer to a live overlay.
    #[error("invalid overlay handle: {0}")]
    InvalidHandle(u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn backend_init_reports_whole_chain() {
        let err = Err::<(), _>(anyhow!("glXChooseFBConfig returned no config"))
            .context("failed to choose framebuffer config")
            .unwrap_err();

        let message = OverlayError::BackendInit(err).to_string();
        assert!(message.contains("failed to choose framebuffer config"));
        assert!(message.contains("glXChooseFBConfig returned no config"));
    }

    #[test]
    fn invalid_handle_names_handle() {
        assert_eq!(
            OverlayError::InvalidHandle(7).to_string(),
            "invalid overlay handle: 7"
        );
    }
}
