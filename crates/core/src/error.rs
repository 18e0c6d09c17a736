//! Error types for the gl-sandbox core.

use crate::render::layout::LayoutError;
use crate::render::shader::ShaderError;
use crate::render::texture::TextureError;
use thiserror::Error;

/// Errors produced by core operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The backend refused to create an object.
    #[error("backend error: {0}")]
    Backend(String),

    /// A buffer was constructed from an empty slice.
    #[error("cannot create a {0} buffer from an empty slice")]
    EmptyBuffer(&'static str),

    /// A vertex layout's stride did not match the vertex record it describes.
    #[error("layout stride {layout} does not match vertex size {vertex}")]
    StrideMismatch { layout: usize, vertex: usize },

    /// Width or height was zero.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// A camera or render setting was outside its valid range.
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let msg = format!("{}", SandboxError::InvalidDimensions);
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
    }

    #[test]
    fn stride_mismatch_includes_both_sizes() {
        let err = SandboxError::StrideMismatch {
            layout: 20,
            vertex: 32,
        };
        let msg = format!("{err}");
        assert!(msg.contains("20"), "missing layout stride in: {msg}");
        assert!(msg.contains("32"), "missing vertex size in: {msg}");
    }

    #[test]
    fn invalid_setting_includes_name_and_reason() {
        let err = SandboxError::InvalidSetting {
            name: "fov".into(),
            reason: "must be below 180".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("fov"), "missing name in: {msg}");
        assert!(msg.contains("below 180"), "missing reason in: {msg}");
    }

    #[test]
    fn shader_error_converts_transparently() {
        let err: SandboxError = ShaderError::LinkError("varying mismatch".into()).into();
        assert!(err.to_string().contains("varying mismatch"));
    }

    #[test]
    fn sandbox_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SandboxError>();
    }

    #[test]
    fn sandbox_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<SandboxError>();
    }
}
