//! Per-frame GL error polling and window resize handling.

use super::gpu::Gpu;
use crate::camera::Camera;
use std::fmt;

/// Upper bound on polls per drain. A lost context can report
/// `CONTEXT_LOST` forever.
pub const MAX_ERROR_POLLS: usize = 32;

/// A GL error code as returned by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlErrorCode(pub u32);

impl GlErrorCode {
    pub const INVALID_ENUM: Self = Self(0x0500);
    pub const INVALID_VALUE: Self = Self(0x0501);
    pub const INVALID_OPERATION: Self = Self(0x0502);
    pub const STACK_OVERFLOW: Self = Self(0x0503);
    pub const STACK_UNDERFLOW: Self = Self(0x0504);
    pub const OUT_OF_MEMORY: Self = Self(0x0505);
    pub const INVALID_FRAMEBUFFER_OPERATION: Self = Self(0x0506);
    pub const CONTEXT_LOST: Self = Self(0x0507);

    /// Symbolic name of a standard code, `"UNKNOWN"` otherwise.
    pub fn name(self) -> &'static str {
        match self {
            Self::INVALID_ENUM => "GL_INVALID_ENUM",
            Self::INVALID_VALUE => "GL_INVALID_VALUE",
            Self::INVALID_OPERATION => "GL_INVALID_OPERATION",
            Self::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
            Self::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
            Self::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
            Self::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
            Self::CONTEXT_LOST => "GL_CONTEXT_LOST",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for GlErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.name(), self.0)
    }
}

/// Collects every pending error, oldest first, stopping after
/// [`MAX_ERROR_POLLS`].
pub fn drain_errors<G: Gpu>(gpu: &G) -> Vec<GlErrorCode> {
    std::iter::from_fn(|| gpu.poll_error())
        .take(MAX_ERROR_POLLS)
        .map(GlErrorCode)
        .collect()
}

/// Drains pending errors, logging each at `warn`. Returns how many there
/// were.
pub fn log_errors<G: Gpu>(gpu: &G) -> usize {
    let errors = drain_errors(gpu);
    for error in &errors {
        log::warn!("GL error: {error}");
    }
    errors.len()
}

/// Applies a framebuffer resize to both the viewport and the camera.
pub fn resize_viewport<G: Gpu>(gpu: &G, camera: &mut Camera, width: u32, height: u32) {
    log::debug!("viewport resized to {width}x{height}");
    gpu.viewport(width, height);
    camera.resize(width, height);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{GpuCall, RecordingGpu};
    use glam::Vec3;

    #[test]
    fn drain_returns_errors_in_order_and_empties_the_queue() {
        let gpu = RecordingGpu::new();
        gpu.push_error(0x0502);
        gpu.push_error(0x0501);
        assert_eq!(
            drain_errors(&gpu),
            vec![GlErrorCode::INVALID_OPERATION, GlErrorCode::INVALID_VALUE]
        );
        assert!(drain_errors(&gpu).is_empty());
    }

    #[test]
    fn drain_is_bounded() {
        let gpu = RecordingGpu::new();
        for _ in 0..100 {
            gpu.push_error(0x0507);
        }
        assert_eq!(drain_errors(&gpu).len(), MAX_ERROR_POLLS);
    }

    #[test]
    fn log_errors_counts() {
        let gpu = RecordingGpu::new();
        assert_eq!(log_errors(&gpu), 0);
        gpu.push_error(0x0505);
        assert_eq!(log_errors(&gpu), 1);
    }

    #[test]
    fn names_and_display() {
        assert_eq!(GlErrorCode(0x0500).name(), "GL_INVALID_ENUM");
        assert_eq!(GlErrorCode(0x1234).name(), "UNKNOWN");
        assert_eq!(
            GlErrorCode::OUT_OF_MEMORY.to_string(),
            "GL_OUT_OF_MEMORY (0x0505)"
        );
    }

    #[test]
    fn resize_updates_viewport_and_camera() {
        let gpu = RecordingGpu::new();
        let mut cam = Camera::new(800, 800, Vec3::ZERO).unwrap();
        resize_viewport(&gpu, &mut cam, 1024, 512);
        assert_eq!(
            gpu.calls(),
            vec![GpuCall::Viewport {
                width: 1024,
                height: 512
            }]
        );
        assert_eq!(cam.aspect(), 2.0);
    }
}
