//! Shader compilation, program linking and uniform access.
//!
//! Provides error types, source formatting for debugging, the free
//! functions that compile a single stage and link two stages, and
//! [`ShaderProgram`], which owns a linked program object and writes
//! uniforms by name.
//!
//! Driver info logs are cut to [`DIAGNOSTIC_LOG_CAPACITY`] bytes before
//! they are logged or returned, so a runaway log never floods the console.

use super::gpu::{Gpu, ShaderStage, UniformValue};
use glam::{Mat4, Vec3, Vec4};
use thiserror::Error;

/// Maximum number of bytes kept from a driver info log.
pub const DIAGNOSTIC_LOG_CAPACITY: usize = 512;

/// Errors that can occur during shader compilation or program linking.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The shader stage that failed.
        stage: ShaderStage,
        /// The driver's info log, truncated to the diagnostic capacity.
        log: String,
    },
    /// A program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
    /// The context refused to create a shader or program object.
    #[error("shader backend error: {0}")]
    Backend(String),
}

/// Formats a shader compilation error for human-readable debugging.
///
/// Prepends right-aligned line numbers to each line of `source`, then
/// appends the driver's error `log`. This makes it easy to correlate
/// error messages (which reference line numbers) with the actual GLSL.
///
/// Both `source` and `log` may be empty; the function handles all
/// combinations gracefully.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let source_lines: Vec<&str> = source.lines().collect();
    let width = source_lines.len().max(1).to_string().len();

    let numbered: String = source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

/// Cuts `log` to at most [`DIAGNOSTIC_LOG_CAPACITY`] bytes on a character
/// boundary and trims trailing whitespace and NULs.
pub fn truncate_log(log: &str) -> String {
    let mut end = log.len().min(DIAGNOSTIC_LOG_CAPACITY);
    while !log.is_char_boundary(end) {
        end -= 1;
    }
    log[..end]
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Compiles a single shader stage.
///
/// On failure the stage object is deleted, the truncated driver log is
/// reported through `log::error!` (with the numbered source at debug
/// level), and returned in a `ShaderError::CompileError`.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if the GLSL source fails to compile,
/// or `ShaderError::Backend` if no shader object could be created.
pub fn compile_shader<G: Gpu>(
    gpu: &G,
    stage: ShaderStage,
    source: &str,
) -> Result<G::Shader, ShaderError> {
    let shader = gpu.create_shader(stage).map_err(ShaderError::Backend)?;

    if gpu.compile_shader(shader, source) {
        return Ok(shader);
    }

    let log = truncate_log(&gpu.shader_info_log(shader));
    gpu.delete_shader(shader);

    log::error!("{stage} shader failed to compile:\n{log}");
    log::debug!("{stage} shader source:\n{}", format_shader_error(source, ""));

    Err(ShaderError::CompileError { stage, log })
}

/// Links a vertex and fragment shader into a program.
///
/// Attaches both shaders, links, and detaches them afterward whether or
/// not linking succeeded. The stage objects still belong to the caller.
///
/// # Errors
///
/// Returns `ShaderError::LinkError` if linking fails, or
/// `ShaderError::Backend` if no program object could be created.
pub fn link_program<G: Gpu>(
    gpu: &G,
    vertex: G::Shader,
    fragment: G::Shader,
) -> Result<G::Program, ShaderError> {
    let program = gpu.create_program().map_err(ShaderError::Backend)?;

    gpu.attach_shader(program, vertex);
    gpu.attach_shader(program, fragment);
    let linked = gpu.link_program(program);
    gpu.detach_shader(program, vertex);
    gpu.detach_shader(program, fragment);

    if linked {
        Ok(program)
    } else {
        let log = truncate_log(&gpu.program_info_log(program));
        gpu.delete_program(program);
        log::error!("shader program failed to link:\n{log}");
        Err(ShaderError::LinkError(log))
    }
}

/// A linked vertex + fragment program.
///
/// Owns the program object and deletes it on drop. The intermediate stage
/// objects are deleted as soon as linking finishes.
pub struct ShaderProgram<'gl, G: Gpu> {
    gpu: &'gl G,
    handle: G::Program,
}

impl<'gl, G: Gpu> ShaderProgram<'gl, G> {
    /// Compiles both stages and links them.
    ///
    /// Both stage objects are deleted before this returns, on success and
    /// on every failure path.
    ///
    /// # Errors
    ///
    /// Returns the first [`ShaderError`] encountered.
    pub fn new(gpu: &'gl G, vertex_src: &str, fragment_src: &str) -> Result<Self, ShaderError> {
        let vertex = compile_shader(gpu, ShaderStage::Vertex, vertex_src)?;
        let fragment = match compile_shader(gpu, ShaderStage::Fragment, fragment_src) {
            Ok(f) => f,
            Err(e) => {
                gpu.delete_shader(vertex);
                return Err(e);
            }
        };

        let result = link_program(gpu, vertex, fragment);

        gpu.delete_shader(vertex);
        gpu.delete_shader(fragment);

        let handle = result?;
        log::debug!("linked shader program {handle:?}");
        Ok(Self { gpu, handle })
    }

    /// The backend handle of the linked program.
    pub fn handle(&self) -> G::Program {
        self.handle
    }

    /// Makes this the active program. Uniform writes go to the active
    /// program, so call this before any `set_*`.
    pub fn use_program(&self) {
        self.gpu.use_program(Some(self.handle));
    }

    /// Writes `value` into the uniform called `name`.
    ///
    /// The location is looked up on every call. A name the program does
    /// not declare (or that the compiler optimized away) is a no-op and
    /// returns `false`.
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) -> bool {
        match self.gpu.uniform_location(self.handle, name) {
            Some(location) => {
                self.gpu.set_uniform(&location, value.into());
                true
            }
            None => {
                log::trace!("uniform '{name}' not found in program {:?}", self.handle);
                false
            }
        }
    }

    pub fn set_int(&self, name: &str, value: i32) -> bool {
        self.set_uniform(name, value)
    }

    pub fn set_float(&self, name: &str, value: f32) -> bool {
        self.set_uniform(name, value)
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) -> bool {
        self.set_uniform(name, value)
    }

    pub fn set_vec4(&self, name: &str, value: Vec4) -> bool {
        self.set_uniform(name, value)
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) -> bool {
        self.set_uniform(name, value)
    }

    /// Name and location of every active vertex input.
    pub fn input_locations(&self) -> Vec<(String, u32)> {
        self.gpu.active_inputs(self.handle)
    }
}

impl<G: Gpu> Drop for ShaderProgram<'_, G> {
    fn drop(&mut self) {
        log::trace!("deleting shader program {:?}", self.handle);
        self.gpu.delete_program(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::layout::{LayoutMismatch, TexturedVertex, Vertex};
    use crate::render::recording::{GpuCall, ObjectKind, RecordingGpu};

    const VS: &str = "#version 330 core\nvoid main() {}\n";
    const FS: &str = "#version 330 core\nout vec4 c;\nvoid main() { c = vec4(1.0); }\n";

    // --- format_shader_error tests ---

    #[test]
    fn format_shader_error_prepends_line_numbers() {
        let source = "#version 330 core\nvoid main() {\n}\n";
        let log = "ERROR: 0:2: syntax error";
        let formatted = format_shader_error(source, log);

        assert!(
            formatted.contains("1: #version 330 core"),
            "expected line 1 with content, got:\n{formatted}"
        );
        assert!(
            formatted.contains("2: void main() {"),
            "expected line 2 with content, got:\n{formatted}"
        );
        assert!(
            formatted.contains("3: }"),
            "expected line 3 with content, got:\n{formatted}"
        );
        assert!(
            formatted.contains(log),
            "expected original log in output, got:\n{formatted}"
        );
    }

    #[test]
    fn format_shader_error_handles_empty_inputs() {
        assert_eq!(format_shader_error("", "some error"), "some error");
        assert_eq!(format_shader_error("void main() {}", ""), "1: void main() {}");
        assert!(format_shader_error("", "").is_empty());
    }

    #[test]
    fn format_shader_error_right_aligns_line_numbers() {
        let source = (1..=12)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let formatted = format_shader_error(&source, "err");
        let lines: Vec<&str> = formatted.lines().collect();

        assert!(
            lines[0].starts_with(" 1: "),
            "expected right-aligned single digit, got: '{}'",
            lines[0]
        );
        assert!(
            lines[9].starts_with("10: "),
            "expected no padding for double digit, got: '{}'",
            lines[9]
        );
    }

    // --- truncate_log tests ---

    #[test]
    fn truncate_log_caps_at_capacity() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_log(&long).len(), DIAGNOSTIC_LOG_CAPACITY);
    }

    #[test]
    fn truncate_log_respects_char_boundaries() {
        let long = "é".repeat(400);
        let cut = truncate_log(&long);
        assert!(cut.len() <= DIAGNOSTIC_LOG_CAPACITY);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn truncate_log_strips_trailing_nuls() {
        assert_eq!(truncate_log("bad token\n\0\0"), "bad token");
    }

    // --- ShaderError Display tests ---

    #[test]
    fn shader_compile_error_display_includes_stage_and_log() {
        let err = ShaderError::CompileError {
            stage: ShaderStage::Fragment,
            log: "undeclared identifier".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("fragment"), "missing stage in: {msg}");
        assert!(msg.contains("undeclared identifier"), "missing log in: {msg}");
    }

    #[test]
    fn shader_error_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ShaderError>();
    }

    // --- ShaderProgram tests ---

    #[test]
    fn new_links_and_deletes_both_stages() {
        let gpu = RecordingGpu::new();
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        assert_eq!(gpu.live(ObjectKind::Program), 1);
        assert_eq!(gpu.created(ObjectKind::Shader), 2);
        assert_eq!(gpu.live(ObjectKind::Shader), 0);
        drop(program);
        assert_eq!(gpu.live(ObjectKind::Program), 0);
        assert_eq!(gpu.invalid_deletes(), 0);
    }

    #[test]
    fn stages_are_detached_after_linking() {
        let gpu = RecordingGpu::new();
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        let handle = program.handle();
        let detaches = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::DetachShader { program, .. } if *program == handle))
            .count();
        assert_eq!(detaches, 2);
    }

    #[test]
    fn vertex_compile_failure_reports_stage_and_leaks_nothing() {
        let gpu = RecordingGpu::new();
        gpu.fail_compile(ShaderStage::Vertex, "0:1: unexpected token");
        let err = ShaderProgram::new(&gpu, VS, FS).err().unwrap();
        match err {
            ShaderError::CompileError { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(log.contains("unexpected token"));
            }
            other => panic!("expected compile error, got {other:?}"),
        }
        assert_eq!(gpu.live(ObjectKind::Shader), 0);
        assert_eq!(gpu.created(ObjectKind::Program), 0);
    }

    #[test]
    fn fragment_compile_failure_deletes_the_vertex_stage() {
        let gpu = RecordingGpu::new();
        gpu.fail_compile(ShaderStage::Fragment, "missing semicolon");
        let result = ShaderProgram::new(&gpu, VS, FS);
        assert!(matches!(
            result,
            Err(ShaderError::CompileError {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
        assert_eq!(gpu.created(ObjectKind::Shader), 2);
        assert_eq!(gpu.live(ObjectKind::Shader), 0);
        assert_eq!(gpu.invalid_deletes(), 0);
    }

    #[test]
    fn link_failure_deletes_program_and_stages() {
        let gpu = RecordingGpu::new();
        gpu.fail_link("varying mismatch");
        let result = ShaderProgram::new(&gpu, VS, FS);
        let err = result.err().unwrap();
        assert!(matches!(err, ShaderError::LinkError(ref log) if log == "varying mismatch"));
        assert_eq!(gpu.live(ObjectKind::Program), 0);
        assert_eq!(gpu.live(ObjectKind::Shader), 0);
        assert_eq!(gpu.invalid_deletes(), 0);
    }

    #[test]
    fn compile_error_log_is_bounded() {
        let gpu = RecordingGpu::new();
        gpu.fail_compile(ShaderStage::Vertex, &"e".repeat(4096));
        let err = compile_shader(&gpu, ShaderStage::Vertex, VS).unwrap_err();
        match err {
            ShaderError::CompileError { log, .. } => {
                assert_eq!(log.len(), DIAGNOSTIC_LOG_CAPACITY)
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn set_uniform_writes_known_names() {
        let gpu = RecordingGpu::new();
        gpu.declare_uniforms(&["lightColor"]);
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        gpu.clear_calls();

        assert!(program.set_vec4("lightColor", Vec4::ONE));
        assert_eq!(
            gpu.calls(),
            vec![GpuCall::SetUniform {
                name: "lightColor".into(),
                value: UniformValue::Vec4(Vec4::ONE),
            }]
        );
    }

    #[test]
    fn set_uniform_on_unknown_name_is_a_no_op() {
        let gpu = RecordingGpu::new();
        gpu.declare_uniforms(&["camera"]);
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        gpu.clear_calls();

        assert!(!program.set_float("scale", 2.0));
        assert!(gpu.calls().is_empty());
    }

    #[test]
    fn use_program_activates_the_handle() {
        let gpu = RecordingGpu::new();
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        gpu.clear_calls();
        program.use_program();
        assert_eq!(gpu.calls(), vec![GpuCall::UseProgram(Some(program.handle()))]);
    }

    #[test]
    fn input_locations_report_the_linked_inputs() {
        let gpu = RecordingGpu::new();
        gpu.set_active_inputs(&[("aPos", 0), ("aColor", 1), ("aTex", 2)]);
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        let locations = program.input_locations();
        assert_eq!(
            locations,
            vec![
                ("aPos".to_string(), 0),
                ("aColor".to_string(), 1),
                ("aTex".to_string(), 2),
            ]
        );
        assert!(TexturedVertex::layout().check_against(&locations).is_empty());
    }

    #[test]
    fn layout_check_against_a_linked_program_finds_both_mismatches() {
        let gpu = RecordingGpu::new();
        gpu.set_active_inputs(&[("aPos", 0), ("aColor", 1), ("aNormal", 3)]);
        let program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        let mismatches = TexturedVertex::layout().check_against(&program.input_locations());
        assert_eq!(
            mismatches,
            vec![
                LayoutMismatch::UnusedSlot(2),
                LayoutMismatch::MissingInput {
                    name: "aNormal".into(),
                    location: 3
                },
            ]
        );
    }

    #[test]
    fn thousand_programs_neither_leak_nor_double_free() {
        let gpu = RecordingGpu::new();
        for _ in 0..1000 {
            let _program = ShaderProgram::new(&gpu, VS, FS).unwrap();
        }
        assert_eq!(gpu.created(ObjectKind::Program), 1000);
        assert_eq!(gpu.live(ObjectKind::Program), 0);
        assert_eq!(gpu.live(ObjectKind::Shader), 0);
        assert_eq!(gpu.invalid_deletes(), 0);
    }
}
