#![deny(unsafe_code)]
//! Core of the OpenGL sandbox.
//!
//! Provides RAII wrappers for buffers, vertex arrays, shader programs and
//! textures over the [`Gpu`](render::Gpu) seam, the fly-through [`Camera`],
//! and its [`CameraSettings`].

pub mod camera;
pub mod error;
pub mod render;
pub mod settings;

pub use camera::{Camera, CameraKey, InputSource, LookState};
pub use error::SandboxError;
pub use settings::CameraSettings;
