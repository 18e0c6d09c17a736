//! The `glow` implementation of [`Gpu`].
//!
//! `GpuContext` wraps a `glow::Context` created by whatever windowing layer
//! owns the GL surface. It targets desktop GL 3.3 core and GLES 3.0 and uses
//! bind-to-edit calls only.

use super::gpu::{
    BufferTarget, ComponentType, Gpu, IndexType, ShaderStage, TextureFilter, TextureUpload,
    TextureWrap, Topology, UniformValue,
};
use glow::HasContext;

/// Wraps a `glow::Context` and implements [`Gpu`] over it.
///
/// Created once at initialization. Every resource wrapper borrows it, so
/// it must outlive all of them.
pub struct GpuContext {
    gl: glow::Context,
    version: String,
}

impl GpuContext {
    /// Wraps an already current GL context and logs its version string.
    #[allow(unsafe_code)]
    pub fn new(gl: glow::Context) -> Self {
        // SAFETY: glow wraps raw GL calls as unsafe. VERSION is a valid
        // string query on every GL and GLES version.
        let version = unsafe { gl.get_parameter_string(glow::VERSION) };
        log::info!("GL context: {version}");
        Self { gl, version }
    }

    /// Returns a reference to the underlying `glow::Context`.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Consumes this wrapper and returns the underlying `glow::Context`.
    pub fn into_gl(self) -> glow::Context {
        self.gl
    }

    /// The driver's `GL_VERSION` string as reported at creation.
    pub fn version(&self) -> &str {
        &self.version
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn component_type(ty: ComponentType) -> u32 {
    match ty {
        ComponentType::F32 => glow::FLOAT,
        ComponentType::I32 => glow::INT,
        ComponentType::U32 => glow::UNSIGNED_INT,
        ComponentType::I16 => glow::SHORT,
        ComponentType::U16 => glow::UNSIGNED_SHORT,
        ComponentType::I8 => glow::BYTE,
        ComponentType::U8 => glow::UNSIGNED_BYTE,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn topology(topology: Topology) -> u32 {
    match topology {
        Topology::Triangles => glow::TRIANGLES,
        Topology::Lines => glow::LINES,
        Topology::Points => glow::POINTS,
    }
}

fn index_type(ty: IndexType) -> u32 {
    match ty {
        IndexType::U8 => glow::UNSIGNED_BYTE,
        IndexType::U16 => glow::UNSIGNED_SHORT,
        IndexType::U32 => glow::UNSIGNED_INT,
    }
}

fn filter_mode(filter: TextureFilter) -> i32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST as i32,
        TextureFilter::Linear => glow::LINEAR as i32,
    }
}

/// Internal format, pixel format and unpack alignment for `channels`.
///
/// The internal format follows the channel count: GLES 3.0 rejects RGBA8
/// storage fed from RGB data.
fn pixel_formats(channels: u8) -> (i32, u32, i32) {
    match channels {
        // RGB rows are not 4-byte aligned for most widths.
        3 => (glow::RGB8 as i32, glow::RGB, 1),
        _ => (glow::RGBA8 as i32, glow::RGBA, 4),
    }
}

fn wrap_mode(wrap: TextureWrap) -> i32 {
    match wrap {
        TextureWrap::Repeat => glow::REPEAT as i32,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
    }
}

// Every unsafe block below forwards to the glow call of the same name with
// handles that were produced by this context and have not been deleted:
// the resource wrappers own each handle exactly once and only release it
// on drop.
#[allow(unsafe_code)]
impl Gpu for GpuContext {
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        // SAFETY: object creation takes no handles.
        unsafe { self.gl.create_buffer() }
    }

    fn upload_static(&self, target: BufferTarget, buffer: glow::Buffer, bytes: &[u8]) {
        let target = buffer_target(target);
        // SAFETY: `buffer` is live. The vertex array is unbound first so an
        // index upload cannot rebind the element buffer of whatever vertex
        // array happens to be current.
        unsafe {
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, bytes, glow::STATIC_DRAW);
        }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<glow::Buffer>) {
        // SAFETY: `buffer` is live or None.
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer) }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        // SAFETY: called once per handle by the owning wrapper.
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_vertex_array(&self) -> Result<glow::VertexArray, String> {
        // SAFETY: object creation takes no handles.
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vertex_array: Option<glow::VertexArray>) {
        // SAFETY: `vertex_array` is live or None.
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn vertex_attribute(
        &self,
        slot: u32,
        components: u8,
        ty: ComponentType,
        stride: usize,
        offset: usize,
    ) {
        // Layout validation keeps stride and offset far below i32::MAX.
        let size = i32::from(components);
        let stride = stride as i32;
        let offset = offset as i32;
        let gl_type = component_type(ty);
        // SAFETY: a vertex array and a vertex buffer are bound by the caller.
        unsafe {
            if ty.is_float() {
                self.gl.vertex_attrib_pointer_f32(slot, size, gl_type, false, stride, offset);
            } else {
                self.gl.vertex_attrib_pointer_i32(slot, size, gl_type, stride, offset);
            }
            self.gl.enable_vertex_attrib_array(slot);
        }
    }

    fn delete_vertex_array(&self, vertex_array: glow::VertexArray) {
        // SAFETY: called once per handle by the owning wrapper.
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<glow::Shader, String> {
        // SAFETY: object creation takes no handles.
        unsafe { self.gl.create_shader(shader_stage(stage)) }
    }

    fn compile_shader(&self, shader: glow::Shader, source: &str) -> bool {
        // SAFETY: `shader` is live.
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, shader: glow::Shader) -> String {
        // SAFETY: `shader` is live.
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        // SAFETY: called once per handle.
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<glow::Program, String> {
        // SAFETY: object creation takes no handles.
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: glow::Program, shader: glow::Shader) {
        // SAFETY: both handles are live.
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: glow::Program, shader: glow::Shader) {
        // SAFETY: both handles are live and `shader` is attached.
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&self, program: glow::Program) -> bool {
        // SAFETY: `program` is live.
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn program_info_log(&self, program: glow::Program) -> String {
        // SAFETY: `program` is live.
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        // SAFETY: `program` is live and linked, or None.
        unsafe { self.gl.use_program(program) }
    }

    fn delete_program(&self, program: glow::Program) {
        // SAFETY: called once per handle by the owning wrapper.
        unsafe { self.gl.delete_program(program) }
    }

    fn active_inputs(&self, program: glow::Program) -> Vec<(String, u32)> {
        // SAFETY: `program` is live and linked; indices stay below the
        // reported attribute count.
        unsafe {
            let count = self.gl.get_active_attributes(program);
            (0..count)
                .filter_map(|index| self.gl.get_active_attribute(program, index))
                .filter_map(|attribute| {
                    let location = self.gl.get_attrib_location(program, &attribute.name)?;
                    Some((attribute.name, location))
                })
                .collect()
        }
    }

    fn uniform_location(
        &self,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        // SAFETY: `program` is live and linked.
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn set_uniform(&self, location: &glow::UniformLocation, value: UniformValue) {
        let location = Some(location);
        // SAFETY: `location` came from the program currently in use.
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(location, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(location, v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat4(m) => {
                    self.gl.uniform_matrix_4_f32_slice(location, false, &m.to_cols_array())
                }
            }
        }
    }

    fn create_texture(&self) -> Result<glow::Texture, String> {
        // SAFETY: object creation takes no handles.
        unsafe { self.gl.create_texture() }
    }

    fn upload_texture_2d(
        &self,
        texture: glow::Texture,
        upload: TextureUpload<'_>,
        filter: TextureFilter,
        wrap: TextureWrap,
    ) {
        let (internal_format, format, alignment) = pixel_formats(upload.channels);
        // SAFETY: `texture` is live. DecodedImage guarantees the extent fits
        // i32 and that `pixels` holds exactly width * height * channels bytes.
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format,
                upload.width as i32,
                upload.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(upload.pixels)),
            );
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);

            let filter = filter_mode(filter);
            let wrap = wrap_mode(wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
        }
    }

    fn generate_mipmaps(&self, texture: glow::Texture) {
        // SAFETY: `texture` is live and has a complete base level. The
        // minification filter set at upload is left as is.
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn bind_texture_unit(&self, unit: u32, texture: glow::Texture) {
        // SAFETY: `texture` is live; units above the driver's limit raise
        // GL_INVALID_ENUM which the per-frame error poll reports.
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        // SAFETY: called once per handle by the owning wrapper.
        unsafe { self.gl.delete_texture(texture) }
    }

    fn draw_elements(&self, mode: Topology, count: u32, ty: IndexType) {
        // VertexArray::new rejects index counts above i32::MAX.
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        // SAFETY: a vertex array with an element buffer is bound by the caller.
        unsafe { self.gl.draw_elements(topology(mode), count, index_type(ty), 0) }
    }

    fn viewport(&self, width: u32, height: u32) {
        // SAFETY: plain state call.
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) }
    }

    fn poll_error(&self) -> Option<u32> {
        // SAFETY: plain state query.
        let code = unsafe { self.gl.get_error() };
        (code != glow::NO_ERROR).then_some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // GpuContext requires a live GL context, so integration tests are ignored.

    #[test]
    fn enum_mappings_match_gl_constants() {
        assert_eq!(buffer_target(BufferTarget::Index), glow::ELEMENT_ARRAY_BUFFER);
        assert_eq!(component_type(ComponentType::F32), glow::FLOAT);
        assert_eq!(shader_stage(ShaderStage::Fragment), glow::FRAGMENT_SHADER);
        assert_eq!(topology(Topology::Triangles), glow::TRIANGLES);
        assert_eq!(index_type(IndexType::U16), glow::UNSIGNED_SHORT);
        assert_eq!(wrap_mode(TextureWrap::Repeat), glow::REPEAT as i32);
    }

    #[test]
    fn filters_map_to_non_mipmapped_modes() {
        assert_eq!(filter_mode(TextureFilter::Nearest), glow::NEAREST as i32);
        assert_eq!(filter_mode(TextureFilter::Linear), glow::LINEAR as i32);
    }

    #[test]
    fn storage_format_follows_channel_count() {
        assert_eq!(pixel_formats(3), (glow::RGB8 as i32, glow::RGB, 1));
        assert_eq!(pixel_formats(4), (glow::RGBA8 as i32, glow::RGBA, 4));
    }

    #[test]
    fn gpu_context_implements_gpu() {
        fn _assert_api(ctx: &GpuContext) -> &impl Gpu {
            let _gl: &glow::Context = ctx.gl();
            let _version: &str = ctx.version();
            ctx
        }
    }

    #[test]
    #[ignore = "requires GL context"]
    fn quad_draws_without_gl_errors() {
        // Would test: a VertexArray of 4 vertices and 6 indices draws with
        // an empty error queue afterwards.
    }
}
