//! The graphics seam every resource wrapper is written against.
//!
//! `Gpu` is the narrow slice of the OpenGL API that buffers, vertex arrays,
//! shader programs and textures need. [`GpuContext`](super::GpuContext)
//! implements it over `glow` when the `render` feature is enabled, and
//! [`RecordingGpu`](super::RecordingGpu) implements it in memory so that
//! ownership and draw behavior can be tested without a live context.
//!
//! All methods take `&self`: a GL context is a single-threaded state machine
//! and the wrappers only ever hold shared references to it.

use glam::{Mat4, Vec2, Vec3, Vec4};
use std::fmt;

/// Which binding point a buffer is uploaded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data (`ARRAY_BUFFER`).
    Vertex,
    /// Element indices (`ELEMENT_ARRAY_BUFFER`).
    Index,
}

/// Scalar type of one vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    F32,
    I32,
    U32,
    I16,
    U16,
    I8,
    U8,
}

impl ComponentType {
    /// Size of a single component in bytes.
    pub fn size(self) -> usize {
        match self {
            ComponentType::F32 | ComponentType::I32 | ComponentType::U32 => 4,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::I8 | ComponentType::U8 => 1,
        }
    }

    /// Whether the attribute is read as floating point by the shader.
    pub fn is_float(self) -> bool {
        matches!(self, ComponentType::F32)
    }
}

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Lowercase stage name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primitive assembly mode for indexed draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Integer width of the elements stored in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

/// A value that can be written into a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Upload description for a 2D texture's base level.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    /// Number of interleaved 8-bit channels in `pixels` (3 or 4).
    pub channels: u8,
    pub pixels: &'a [u8],
}

/// Minification/magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Texture coordinate wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
}

/// Operations on a graphics context used by the resource wrappers.
///
/// Creation methods return `Err(String)` with the backend's message when
/// the driver refuses to hand out a new object name.
pub trait Gpu {
    type Buffer: Copy + fmt::Debug + PartialEq;
    type VertexArray: Copy + fmt::Debug + PartialEq;
    type Shader: Copy + fmt::Debug + PartialEq;
    type Program: Copy + fmt::Debug + PartialEq;
    type Texture: Copy + fmt::Debug + PartialEq;
    type UniformLocation: fmt::Debug;

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Binds `buffer` to `target` and fills it with `bytes` using a static
    /// usage hint.
    fn upload_static(&self, target: BufferTarget, buffer: Self::Buffer, bytes: &[u8]);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    /// Enables `slot` on the bound vertex array and points it at
    /// `components` values of `component_type` at `offset` within each
    /// `stride`-sized record of the bound vertex buffer.
    fn vertex_attribute(
        &self,
        slot: u32,
        components: u8,
        component_type: ComponentType,
        stride: usize,
        offset: usize,
    );
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    /// Sets the source and compiles. Returns the compile status.
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Links the program. Returns the link status.
    fn link_program(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);
    fn delete_program(&self, program: Self::Program);
    /// Name and location of every active vertex input of a linked program.
    fn active_inputs(&self, program: Self::Program) -> Vec<(String, u32)>;

    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    /// Writes `value` into the uniform at `location` of the program in use.
    fn set_uniform(&self, location: &Self::UniformLocation, value: UniformValue);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Uploads the base level of a 2D texture and sets its sampling
    /// parameters. Storage is RGB8 for 3 channels and RGBA8 for 4. Leaves
    /// the texture bound to the active unit.
    fn upload_texture_2d(
        &self,
        texture: Self::Texture,
        upload: TextureUpload<'_>,
        filter: TextureFilter,
        wrap: TextureWrap,
    );
    fn generate_mipmaps(&self, texture: Self::Texture);
    /// Binds `texture` to texture unit `unit` without touching other units.
    fn bind_texture_unit(&self, unit: u32, texture: Self::Texture);
    fn delete_texture(&self, texture: Self::Texture);

    fn draw_elements(&self, topology: Topology, count: u32, index_type: IndexType);
    fn viewport(&self, width: u32, height: u32);
    /// Pops the next pending error code, or `None` when the queue is empty.
    fn poll_error(&self) -> Option<u32>;
}
