//! Drawable vertex arrays.
//!
//! A [`VertexArray`] owns one vertex buffer and one index buffer, records
//! how the vertex records map onto shader inputs, and borrows the textures
//! its draws sample from. The borrow means textures always outlive every
//! vertex array that uses them, and one texture can be shared by many.
//!
//! Each [`draw`](VertexArray::draw) binds the textures to consecutive units
//! starting at 0, names their samplers `diff_N` / `spec_N` with counters that
//! restart on every draw, pushes the camera matrix, and issues a single
//! indexed draw.

use super::buffer::{IndexBuffer, IndexElement, VertexBuffer};
use super::gpu::{BufferTarget, Gpu};
use super::layout::VertexLayout;
use super::shader::ShaderProgram;
use super::texture::{Texture, TextureKind};
use crate::camera::Camera;
use crate::error::SandboxError;
use bytemuck::Pod;

/// Uniform the camera matrix is written to by [`VertexArray::draw`].
pub const CAMERA_UNIFORM: &str = "camera";

/// The sampler uniform and texture unit assigned to one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerBinding {
    pub name: String,
    pub unit: u32,
}

/// Assigns texture units and sampler names to textures of the given kinds,
/// in order.
///
/// Units count up from 0 across all textures; the numeric suffix of each
/// name counts up from 0 separately for each kind.
pub fn sampler_bindings(kinds: impl IntoIterator<Item = TextureKind>) -> Vec<SamplerBinding> {
    let mut diffuse = 0u32;
    let mut specular = 0u32;
    kinds
        .into_iter()
        .zip(0u32..)
        .map(|(kind, unit)| {
            let counter = match kind {
                TextureKind::Diffuse => &mut diffuse,
                TextureKind::Specular => &mut specular,
            };
            let name = format!("{}_{}", kind.uniform_prefix(), *counter);
            *counter += 1;
            SamplerBinding { name, unit }
        })
        .collect()
}

/// Index count for one draw call. GL takes the count as a signed int.
fn draw_count(count: usize) -> Result<u32, SandboxError> {
    i32::try_from(count)
        .map(i32::unsigned_abs)
        .map_err(|_| SandboxError::Backend(format!("{count} indices exceed a single draw")))
}

/// A vertex array object with its buffers and borrowed textures.
pub struct VertexArray<'gl, 'tex, G: Gpu, V: Pod, I: IndexElement> {
    gpu: &'gl G,
    handle: G::VertexArray,
    vertices: VertexBuffer<'gl, G, V>,
    indices: IndexBuffer<'gl, G, I>,
    index_count: u32,
    textures: &'tex [Texture<'gl, G>],
}

impl<'gl, 'tex, G: Gpu, V: Pod, I: IndexElement> VertexArray<'gl, 'tex, G, V, I> {
    /// Creates a vertex array reading `vertices` through `layout` and
    /// drawing with `indices`.
    ///
    /// Leaves no vertex array or vertex buffer bound afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::StrideMismatch` if the layout's stride is not
    /// the size of `V`, or `SandboxError::Backend` if the vertex array
    /// cannot be created or the index count does not fit a draw call.
    pub fn new(
        gpu: &'gl G,
        vertices: VertexBuffer<'gl, G, V>,
        indices: IndexBuffer<'gl, G, I>,
        layout: &VertexLayout,
    ) -> Result<Self, SandboxError> {
        if layout.stride() != vertices.stride() {
            return Err(SandboxError::StrideMismatch {
                layout: layout.stride(),
                vertex: vertices.stride(),
            });
        }
        let index_count = draw_count(indices.count())?;

        let handle = gpu.create_vertex_array().map_err(SandboxError::Backend)?;

        gpu.bind_vertex_array(Some(handle));
        gpu.bind_buffer(BufferTarget::Vertex, Some(vertices.handle()));
        layout.apply(gpu);
        gpu.bind_buffer(BufferTarget::Index, Some(indices.handle()));
        gpu.bind_vertex_array(None);
        gpu.bind_buffer(BufferTarget::Vertex, None);

        log::debug!(
            "created vertex array {handle:?}: {} vertices, {} indices, {} attributes",
            vertices.len(),
            index_count,
            layout.attributes().len()
        );

        Ok(Self {
            gpu,
            handle,
            vertices,
            indices,
            index_count,
            textures: &[],
        })
    }

    /// Sets the textures sampled by every draw, in unit order.
    pub fn with_textures(mut self, textures: &'tex [Texture<'gl, G>]) -> Self {
        self.textures = textures;
        self
    }

    pub fn handle(&self) -> G::VertexArray {
        self.handle
    }

    pub fn vertices(&self) -> &VertexBuffer<'gl, G, V> {
        &self.vertices
    }

    pub fn indices(&self) -> &IndexBuffer<'gl, G, I> {
        &self.indices
    }

    pub fn textures(&self) -> &'tex [Texture<'gl, G>] {
        self.textures
    }

    /// Sampler names and units the next draw will use.
    pub fn sampler_bindings(&self) -> Vec<SamplerBinding> {
        sampler_bindings(self.textures.iter().map(Texture::kind))
    }

    /// Draws with the camera matrix written to [`CAMERA_UNIFORM`].
    ///
    /// `program` must already be the active program.
    pub fn draw(&self, program: &ShaderProgram<'gl, G>, camera: &Camera) {
        self.draw_with(program, camera, CAMERA_UNIFORM);
    }

    /// Draws with the camera matrix written to `camera_uniform`.
    ///
    /// With no textures, no unit is touched and whatever a previous draw
    /// left bound stays bound.
    pub fn draw_with(
        &self,
        program: &ShaderProgram<'gl, G>,
        camera: &Camera,
        camera_uniform: &str,
    ) {
        for (texture, binding) in self.textures.iter().zip(self.sampler_bindings()) {
            texture.bind(binding.unit);
            // Units are bounded by the texture count, far below i32::MAX.
            program.set_int(&binding.name, binding.unit as i32);
        }

        camera.upload(program, camera_uniform);

        self.gpu.bind_vertex_array(Some(self.handle));
        self.gpu.draw_elements(
            self.indices.topology(),
            self.index_count,
            self.indices.index_type(),
        );
    }
}

impl<G: Gpu, V: Pod, I: IndexElement> Drop for VertexArray<'_, '_, G, V, I> {
    fn drop(&mut self) {
        log::trace!("deleting vertex array {:?}", self.handle);
        self.gpu.delete_vertex_array(self.handle);
    }
}
