//! Full-surface textured quad renderers used by the platform backends.

#[cfg(windows)]
pub mod dx11;
#[cfg(target_os = "linux")]
pub mod opengl;
