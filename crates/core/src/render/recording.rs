//! In-memory [`Gpu`] backend that records calls and counts live objects.
//!
//! `RecordingGpu` hands out sequential object names, keeps the bytes of
//! every uploaded buffer, and tracks which names are alive so that leaks
//! and double frees show up as counts. Compile and link failures, the
//! program's active inputs, the set of resolvable uniforms and the error
//! queue can all be scripted.

use super::gpu::{
    BufferTarget, ComponentType, Gpu, IndexType, ShaderStage, TextureFilter, TextureUpload,
    TextureWrap, Topology, UniformValue,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

/// Category of GPU object tracked by [`RecordingGpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    VertexArray,
    Shader,
    Program,
    Texture,
}

/// A uniform location handed out by [`RecordingGpu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLocation {
    pub program: u32,
    pub name: String,
}

/// One recorded call on the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer(u32),
    UploadStatic {
        target: BufferTarget,
        buffer: u32,
        len: usize,
    },
    BindBuffer {
        target: BufferTarget,
        buffer: Option<u32>,
    },
    DeleteBuffer(u32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    VertexAttribute {
        slot: u32,
        components: u8,
        component_type: ComponentType,
        stride: usize,
        offset: usize,
    },
    DeleteVertexArray(u32),
    CreateShader {
        shader: u32,
        stage: ShaderStage,
    },
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader {
        program: u32,
        shader: u32,
    },
    DetachShader {
        program: u32,
        shader: u32,
    },
    LinkProgram(u32),
    UseProgram(Option<u32>),
    DeleteProgram(u32),
    SetUniform {
        name: String,
        value: UniformValue,
    },
    CreateTexture(u32),
    UploadTexture {
        texture: u32,
        width: u32,
        height: u32,
        channels: u8,
        filter: TextureFilter,
        wrap: TextureWrap,
    },
    GenerateMipmaps(u32),
    BindTextureUnit {
        unit: u32,
        texture: u32,
    },
    DeleteTexture(u32),
    DrawElements {
        topology: Topology,
        count: u32,
        index_type: IndexType,
    },
    Viewport {
        width: u32,
        height: u32,
    },
}

#[derive(Default)]
struct State {
    next_name: u32,
    calls: Vec<GpuCall>,
    live: HashMap<ObjectKind, HashSet<u32>>,
    created: HashMap<ObjectKind, usize>,
    deleted: HashMap<ObjectKind, usize>,
    invalid_deletes: usize,
    buffer_contents: HashMap<u32, Vec<u8>>,
    shader_stages: HashMap<u32, ShaderStage>,
    compile_failures: HashMap<ShaderStage, String>,
    link_failure: Option<String>,
    active_inputs: Vec<(String, u32)>,
    known_uniforms: Option<HashSet<String>>,
    errors: VecDeque<u32>,
}

impl State {
    fn allocate(&mut self, kind: ObjectKind) -> u32 {
        self.next_name += 1;
        let name = self.next_name;
        self.live.entry(kind).or_default().insert(name);
        *self.created.entry(kind).or_default() += 1;
        name
    }

    fn release(&mut self, kind: ObjectKind, name: u32) {
        let was_live = self
            .live
            .get_mut(&kind)
            .is_some_and(|names| names.remove(&name));
        if was_live {
            *self.deleted.entry(kind).or_default() += 1;
        } else {
            self.invalid_deletes += 1;
        }
    }
}

/// A [`Gpu`] that records every call instead of talking to a driver.
#[derive(Default)]
pub struct RecordingGpu {
    state: RefCell<State>,
}

impl RecordingGpu {
    /// Creates a backend where every compile and link succeeds and every
    /// uniform name resolves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent compile of `stage` fail with `log` as its
    /// info log.
    pub fn fail_compile(&self, stage: ShaderStage, log: &str) {
        self.state
            .borrow_mut()
            .compile_failures
            .insert(stage, log.to_string());
    }

    /// Makes every subsequent link fail with `log` as its info log.
    pub fn fail_link(&self, log: &str) {
        self.state.borrow_mut().link_failure = Some(log.to_string());
    }

    /// Sets the active vertex inputs reported for every program.
    pub fn set_active_inputs(&self, inputs: &[(&str, u32)]) {
        self.state.borrow_mut().active_inputs = inputs
            .iter()
            .map(|(name, location)| (name.to_string(), *location))
            .collect();
    }

    /// Restricts uniform lookup to `names`; any other name is a miss.
    pub fn declare_uniforms(&self, names: &[&str]) {
        self.state.borrow_mut().known_uniforms =
            Some(names.iter().map(|n| n.to_string()).collect());
    }

    /// Queues an error code to be returned by [`Gpu::poll_error`].
    pub fn push_error(&self, code: u32) {
        self.state.borrow_mut().errors.push_back(code);
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<GpuCall> {
        self.state.borrow().calls.clone()
    }

    /// Forgets the recorded calls, keeping object bookkeeping intact.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of objects of `kind` currently alive.
    pub fn live(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.get(&kind).map_or(0, HashSet::len)
    }

    /// Number of objects of `kind` ever created.
    pub fn created(&self, kind: ObjectKind) -> usize {
        self.state.borrow().created.get(&kind).copied().unwrap_or(0)
    }

    /// Number of objects of `kind` deleted while alive.
    pub fn deleted(&self, kind: ObjectKind) -> usize {
        self.state.borrow().deleted.get(&kind).copied().unwrap_or(0)
    }

    /// Deletes of names that were not alive: double frees or foreign names.
    pub fn invalid_deletes(&self) -> usize {
        self.state.borrow().invalid_deletes
    }

    /// Bytes last uploaded into `buffer`.
    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffer_contents.get(&buffer).cloned()
    }

    fn record(&self, call: GpuCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn allocate(&self, kind: ObjectKind) -> u32 {
        self.state.borrow_mut().allocate(kind)
    }

    fn release(&self, kind: ObjectKind, name: u32) {
        self.state.borrow_mut().release(kind, name);
    }
}

impl Gpu for RecordingGpu {
    type Buffer = u32;
    type VertexArray = u32;
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type UniformLocation = RecordedLocation;

    fn create_buffer(&self) -> Result<u32, String> {
        let name = self.allocate(ObjectKind::Buffer);
        self.record(GpuCall::CreateBuffer(name));
        Ok(name)
    }

    fn upload_static(&self, target: BufferTarget, buffer: u32, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .buffer_contents
            .insert(buffer, bytes.to_vec());
        self.record(GpuCall::UploadStatic {
            target,
            buffer,
            len: bytes.len(),
        });
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<u32>) {
        self.record(GpuCall::BindBuffer { target, buffer });
    }

    fn delete_buffer(&self, buffer: u32) {
        self.release(ObjectKind::Buffer, buffer);
        self.state.borrow_mut().buffer_contents.remove(&buffer);
        self.record(GpuCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let name = self.allocate(ObjectKind::VertexArray);
        self.record(GpuCall::CreateVertexArray(name));
        Ok(name)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(GpuCall::BindVertexArray(vertex_array));
    }

    fn vertex_attribute(
        &self,
        slot: u32,
        components: u8,
        component_type: ComponentType,
        stride: usize,
        offset: usize,
    ) {
        self.record(GpuCall::VertexAttribute {
            slot,
            components,
            component_type,
            stride,
            offset,
        });
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.release(ObjectKind::VertexArray, vertex_array);
        self.record(GpuCall::DeleteVertexArray(vertex_array));
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let name = self.allocate(ObjectKind::Shader);
        self.state.borrow_mut().shader_stages.insert(name, stage);
        self.record(GpuCall::CreateShader {
            shader: name,
            stage,
        });
        Ok(name)
    }

    fn compile_shader(&self, shader: u32, _source: &str) -> bool {
        self.record(GpuCall::CompileShader(shader));
        let state = self.state.borrow();
        state
            .shader_stages
            .get(&shader)
            .is_none_or(|stage| !state.compile_failures.contains_key(stage))
    }

    fn shader_info_log(&self, shader: u32) -> String {
        let state = self.state.borrow();
        state
            .shader_stages
            .get(&shader)
            .and_then(|stage| state.compile_failures.get(stage))
            .cloned()
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        self.release(ObjectKind::Shader, shader);
        self.record(GpuCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        let name = self.allocate(ObjectKind::Program);
        self.record(GpuCall::CreateProgram(name));
        Ok(name)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(GpuCall::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.record(GpuCall::DetachShader { program, shader });
    }

    fn link_program(&self, program: u32) -> bool {
        self.record(GpuCall::LinkProgram(program));
        self.state.borrow().link_failure.is_none()
    }

    fn program_info_log(&self, _program: u32) -> String {
        self.state.borrow().link_failure.clone().unwrap_or_default()
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(GpuCall::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        self.release(ObjectKind::Program, program);
        self.record(GpuCall::DeleteProgram(program));
    }

    fn active_inputs(&self, _program: u32) -> Vec<(String, u32)> {
        self.state.borrow().active_inputs.clone()
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<RecordedLocation> {
        let known = match &self.state.borrow().known_uniforms {
            Some(names) => names.contains(name),
            None => true,
        };
        known.then(|| RecordedLocation {
            program,
            name: name.to_string(),
        })
    }

    fn set_uniform(&self, location: &RecordedLocation, value: UniformValue) {
        self.record(GpuCall::SetUniform {
            name: location.name.clone(),
            value,
        });
    }

    fn create_texture(&self) -> Result<u32, String> {
        let name = self.allocate(ObjectKind::Texture);
        self.record(GpuCall::CreateTexture(name));
        Ok(name)
    }

    fn upload_texture_2d(
        &self,
        texture: u32,
        upload: TextureUpload<'_>,
        filter: TextureFilter,
        wrap: TextureWrap,
    ) {
        self.record(GpuCall::UploadTexture {
            texture,
            width: upload.width,
            height: upload.height,
            channels: upload.channels,
            filter,
            wrap,
        });
    }

    fn generate_mipmaps(&self, texture: u32) {
        self.record(GpuCall::GenerateMipmaps(texture));
    }

    fn bind_texture_unit(&self, unit: u32, texture: u32) {
        self.record(GpuCall::BindTextureUnit { unit, texture });
    }

    fn delete_texture(&self, texture: u32) {
        self.release(ObjectKind::Texture, texture);
        self.record(GpuCall::DeleteTexture(texture));
    }

    fn draw_elements(&self, topology: Topology, count: u32, index_type: IndexType) {
        self.record(GpuCall::DrawElements {
            topology,
            count,
            index_type,
        });
    }

    fn viewport(&self, width: u32, height: u32) {
        self.record(GpuCall::Viewport { width, height });
    }

    fn poll_error(&self) -> Option<u32> {
        self.state.borrow_mut().errors.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_across_kinds() {
        let gpu = RecordingGpu::new();
        let buffer = gpu.create_buffer().unwrap();
        let texture = gpu.create_texture().unwrap();
        assert_ne!(buffer, texture);
    }

    #[test]
    fn live_counts_follow_create_and_delete() {
        let gpu = RecordingGpu::new();
        let a = gpu.create_buffer().unwrap();
        let _b = gpu.create_buffer().unwrap();
        assert_eq!(gpu.live(ObjectKind::Buffer), 2);
        gpu.delete_buffer(a);
        assert_eq!(gpu.live(ObjectKind::Buffer), 1);
        assert_eq!(gpu.created(ObjectKind::Buffer), 2);
        assert_eq!(gpu.deleted(ObjectKind::Buffer), 1);
    }

    #[test]
    fn double_delete_is_counted_as_invalid() {
        let gpu = RecordingGpu::new();
        let texture = gpu.create_texture().unwrap();
        gpu.delete_texture(texture);
        gpu.delete_texture(texture);
        assert_eq!(gpu.deleted(ObjectKind::Texture), 1);
        assert_eq!(gpu.invalid_deletes(), 1);
    }

    #[test]
    fn deleting_with_the_wrong_kind_is_invalid() {
        let gpu = RecordingGpu::new();
        let buffer = gpu.create_buffer().unwrap();
        gpu.delete_texture(buffer);
        assert_eq!(gpu.invalid_deletes(), 1);
        assert_eq!(gpu.live(ObjectKind::Buffer), 1);
    }

    #[test]
    fn scripted_compile_failure_only_hits_that_stage() {
        let gpu = RecordingGpu::new();
        gpu.fail_compile(ShaderStage::Fragment, "syntax error");
        let vs = gpu.create_shader(ShaderStage::Vertex).unwrap();
        let fs = gpu.create_shader(ShaderStage::Fragment).unwrap();
        assert!(gpu.compile_shader(vs, ""));
        assert!(!gpu.compile_shader(fs, ""));
        assert_eq!(gpu.shader_info_log(fs), "syntax error");
        assert!(gpu.shader_info_log(vs).is_empty());
    }

    #[test]
    fn scripted_compile_failure_persists_across_compiles() {
        let gpu = RecordingGpu::new();
        gpu.fail_compile(ShaderStage::Vertex, "bad");
        let first = gpu.create_shader(ShaderStage::Vertex).unwrap();
        let second = gpu.create_shader(ShaderStage::Vertex).unwrap();
        assert!(!gpu.compile_shader(first, ""));
        assert!(!gpu.compile_shader(first, ""));
        assert!(!gpu.compile_shader(second, ""));
        assert_eq!(gpu.shader_info_log(second), "bad");
    }

    #[test]
    fn declared_uniforms_restrict_lookup() {
        let gpu = RecordingGpu::new();
        let program = gpu.create_program().unwrap();
        assert!(gpu.uniform_location(program, "anything").is_some());
        gpu.declare_uniforms(&["camera"]);
        assert!(gpu.uniform_location(program, "camera").is_some());
        assert!(gpu.uniform_location(program, "missing").is_none());
    }

    #[test]
    fn error_queue_drains_in_order() {
        let gpu = RecordingGpu::new();
        gpu.push_error(0x0500);
        gpu.push_error(0x0502);
        assert_eq!(gpu.poll_error(), Some(0x0500));
        assert_eq!(gpu.poll_error(), Some(0x0502));
        assert_eq!(gpu.poll_error(), None);
    }

    #[test]
    fn buffer_contents_are_kept_until_delete() {
        let gpu = RecordingGpu::new();
        let buffer = gpu.create_buffer().unwrap();
        gpu.upload_static(BufferTarget::Vertex, buffer, &[1, 2, 3]);
        assert_eq!(gpu.buffer_contents(buffer), Some(vec![1, 2, 3]));
        gpu.delete_buffer(buffer);
        assert_eq!(gpu.buffer_contents(buffer), None);
    }
}
