//! OpenGL resource wrappers.
//!
//! Every wrapper is written against the [`Gpu`] trait and owns exactly one
//! GPU object, releasing it on drop. The `glow` backend in [`context`] is
//! only compiled with the `render` feature; [`RecordingGpu`] is always
//! available for headless use.
//!
//! # Module overview
//!
//! - [`gpu`] -- The graphics seam and the value types it speaks.
//! - [`buffer`] -- Typed vertex and index buffers.
//! - [`layout`] -- Vertex attribute layouts and the built-in vertex records.
//! - [`vertex_array`] -- Drawable vertex arrays with borrowed textures.
//! - [`shader`] -- Shader compilation, linking, and uniform upload.
//! - [`texture`] -- Image decoding and 2D textures.
//! - [`diagnostics`] -- GL error polling and viewport resize.
//! - [`recording`] -- In-memory `Gpu` that records every call.
//! - [`context`] -- `glow` implementation of `Gpu`.

pub mod buffer;
#[cfg(feature = "render")]
pub mod context;
pub mod diagnostics;
pub mod gpu;
pub mod layout;
pub mod recording;
pub mod shader;
pub mod texture;
pub mod vertex_array;

pub use buffer::{GpuBuffer, IndexBuffer, IndexElement, VertexBuffer};
#[cfg(feature = "render")]
pub use context::GpuContext;
pub use diagnostics::{drain_errors, log_errors, resize_viewport, GlErrorCode};
pub use gpu::{
    BufferTarget, ComponentType, Gpu, IndexType, ShaderStage, TextureFilter, TextureWrap,
    Topology, UniformValue,
};
pub use layout::{
    ColorVertex, LayoutError, LayoutMismatch, LitVertex, PositionVertex, TexturedVertex, Vertex,
    VertexAttribute, VertexLayout,
};
pub use recording::{GpuCall, ObjectKind, RecordingGpu};
pub use shader::{compile_shader, format_shader_error, link_program, ShaderError, ShaderProgram};
pub use texture::{
    decode_image, DecodedImage, PixelFormat, Texture, TextureConfig, TextureError, TextureKind,
};
pub use vertex_array::{sampler_bindings, SamplerBinding, VertexArray, CAMERA_UNIFORM};
