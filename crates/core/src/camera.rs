//! Free-fly perspective camera.
//!
//! The camera holds a position, a unit view direction and a fixed up
//! vector. Two independent per-frame updates mutate it:
//!
//! - [`Camera::translate`] moves along the view, strafe and up axes for
//!   every held movement key, four times faster while sprint is held.
//! - [`Camera::look`] turns the view while the look button is held, using
//!   the cursor's offset from the window centre and recentring it every
//!   frame. Pitch is refused when it would bring the view within
//!   `pitch_limit_degrees` of straight up or down.
//!
//! [`Camera::update_matrix`] turns the current state into a combined
//! `projection * view` matrix for an OpenGL clip space (NDC z in [-1, 1]).

use crate::error::SandboxError;
use crate::render::gpu::Gpu;
use crate::render::shader::ShaderProgram;
use crate::settings::CameraSettings;
use glam::{Mat4, Quat, Vec3};

/// Keys the camera reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraKey {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    Sprint,
}

/// Per-frame input sampled from the window system.
pub trait InputSource {
    fn is_pressed(&self, key: CameraKey) -> bool;
    /// Whether the mouse button that drives mouse-look is held.
    fn is_look_held(&self) -> bool;
    /// Cursor position in window pixels.
    fn cursor_position(&self) -> (f64, f64);
    fn set_cursor_position(&mut self, x: f64, y: f64);
    fn set_cursor_visible(&mut self, visible: bool);
}

/// Mouse-look state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookState {
    /// Look button up; the next press recentres before reading any offset.
    #[default]
    Idle,
    /// Look button held; the cursor is hidden and recentred every frame.
    Dragging,
}

/// A perspective camera driven by keyboard and mouse input.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    orientation: Vec3,
    up: Vec3,
    width: u32,
    height: u32,
    settings: CameraSettings,
    speed: f32,
    look: LookState,
    matrix: Mat4,
}

impl Camera {
    /// Creates a camera at `position` looking down -Z with +Y up, for a
    /// `width` x `height` pixel viewport.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::InvalidDimensions` if either extent is zero.
    pub fn new(width: u32, height: u32, position: Vec3) -> Result<Self, SandboxError> {
        if width == 0 || height == 0 {
            return Err(SandboxError::InvalidDimensions);
        }
        let settings = CameraSettings::default();
        Ok(Self {
            position,
            orientation: Vec3::NEG_Z,
            up: Vec3::Y,
            width,
            height,
            settings,
            speed: settings.speed,
            look: LookState::Idle,
            matrix: Mat4::IDENTITY,
        })
    }

    /// Replaces the camera's tunables and resets the current speed.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::InvalidSetting` if `settings` fails validation
    /// or the current orientation lies outside its pitch limit.
    pub fn with_settings(mut self, settings: CameraSettings) -> Result<Self, SandboxError> {
        settings.validate()?;
        self.settings = settings;
        if !self.within_pitch_limit(self.orientation) {
            return Err(SandboxError::InvalidSetting {
                name: "pitch_limit_degrees".into(),
                reason: format!(
                    "current orientation is within {}° of up",
                    settings.pitch_limit_degrees
                ),
            });
        }
        self.speed = settings.speed;
        Ok(self)
    }

    /// Points the camera along `direction`.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::InvalidSetting` if `direction` is zero or
    /// within the pitch limit of the up vector.
    pub fn set_orientation(&mut self, direction: Vec3) -> Result<(), SandboxError> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || !self.within_pitch_limit(direction) {
            return Err(SandboxError::InvalidSetting {
                name: "orientation".into(),
                reason: format!(
                    "must be non-zero and at least {}° away from up",
                    self.settings.pitch_limit_degrees
                ),
            });
        }
        self.orientation = direction;
        Ok(())
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction.
    pub fn orientation(&self) -> Vec3 {
        self.orientation
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Current movement speed, including any sprint boost.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn look_state(&self) -> LookState {
        self.look
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// The matrix computed by the last [`update_matrix`](Self::update_matrix).
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Applies a framebuffer resize. Zero extents (a minimized window)
    /// are clamped to 1 so the aspect ratio stays finite.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Unit vector pointing to the camera's right.
    pub fn right(&self) -> Vec3 {
        self.orientation.cross(self.up).normalize_or_zero()
    }

    /// Moves the camera for one frame of keyboard input.
    ///
    /// The sprint key is sampled first, so the speed used for this frame's
    /// movement already reflects it.
    pub fn translate(&mut self, input: &impl InputSource) {
        self.speed = if input.is_pressed(CameraKey::Sprint) {
            self.settings.sprint_speed()
        } else {
            self.settings.speed
        };

        let right = self.right();
        let moves = [
            (CameraKey::Forward, self.orientation),
            (CameraKey::Back, -self.orientation),
            (CameraKey::Left, -right),
            (CameraKey::Right, right),
            (CameraKey::Up, self.up),
            (CameraKey::Down, -self.up),
        ];
        for (key, direction) in moves {
            if input.is_pressed(key) {
                self.position += self.speed * direction;
            }
        }
    }

    /// Turns the camera for one frame of mouse input.
    ///
    /// On the frame the look button goes down the cursor is hidden and
    /// moved to the window centre without rotating. While held, the offset
    /// from the centre is scaled by `sensitivity / extent` into degrees of
    /// pitch (vertical) and yaw (horizontal), then the cursor is recentred.
    /// Releasing the button shows the cursor again.
    pub fn look(&mut self, input: &mut impl InputSource) {
        if !input.is_look_held() {
            if self.look == LookState::Dragging {
                input.set_cursor_visible(true);
                self.look = LookState::Idle;
            }
            return;
        }

        let (cx, cy) = self.center();
        match self.look {
            LookState::Idle => {
                input.set_cursor_visible(false);
                self.look = LookState::Dragging;
            }
            LookState::Dragging => {
                let (x, y) = input.cursor_position();
                let sensitivity = f64::from(self.settings.sensitivity);
                let pitch = sensitivity * (y - cy) / f64::from(self.height);
                let yaw = sensitivity * (x - cx) / f64::from(self.width);
                self.rotate_pitch(-pitch as f32);
                self.rotate_yaw(-yaw as f32);
            }
        }
        input.set_cursor_position(cx, cy);
    }

    /// Runs [`translate`](Self::translate) then [`look`](Self::look).
    pub fn inputs(&mut self, input: &mut impl InputSource) {
        self.translate(input);
        self.look(input);
    }

    /// Rotates the view up (positive) or down (negative) around the right
    /// axis. Returns `false` and leaves the view unchanged if the result
    /// would be within the pitch limit of straight up or down, or would
    /// swing the view over the pole.
    pub fn rotate_pitch(&mut self, degrees: f32) -> bool {
        let axis = self.right();
        if axis == Vec3::ZERO {
            return false;
        }
        // Judged on elevation: a step may not carry the view over the pole.
        let target = self.elevation_degrees() + degrees;
        if target.abs() >= 90.0 - self.settings.pitch_limit_degrees {
            return false;
        }
        let candidate = (Quat::from_axis_angle(axis, degrees.to_radians()) * self.orientation)
            .normalize_or_zero();
        if candidate == Vec3::ZERO || !self.within_pitch_limit(candidate) {
            return false;
        }
        self.orientation = candidate;
        true
    }

    /// Rotates the view left (positive) or right (negative) around up.
    pub fn rotate_yaw(&mut self, degrees: f32) {
        let rotated = Quat::from_axis_angle(self.up, degrees.to_radians()) * self.orientation;
        self.orientation = rotated.normalize_or_zero();
    }

    /// Recomputes `projection * view` for a vertical field of view of
    /// `fov_radians` and the given clip planes, stores it and returns it.
    pub fn update_matrix(&mut self, fov_radians: f32, z_near: f32, z_far: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, self.position + self.orientation, self.up);
        let projection = Mat4::perspective_rh_gl(fov_radians, self.aspect(), z_near, z_far);
        self.matrix = projection * view;
        self.matrix
    }

    /// [`update_matrix`](Self::update_matrix) with the field of view and
    /// clip planes from the camera's settings.
    pub fn update_matrix_from_settings(&mut self) -> Mat4 {
        let s = self.settings;
        self.update_matrix(s.fov_radians(), s.near, s.far)
    }

    /// Writes the stored matrix into `uniform` of the active `program`.
    /// Returns `false` if the program has no such uniform.
    pub fn upload<G: Gpu>(&self, program: &ShaderProgram<'_, G>, uniform: &str) -> bool {
        program.set_mat4(uniform, self.matrix)
    }

    fn center(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    /// Signed angle between the view and the horizon, positive looking up.
    fn elevation_degrees(&self) -> f32 {
        self.orientation
            .dot(self.up)
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees()
    }

    fn within_pitch_limit(&self, direction: Vec3) -> bool {
        let limit = self.settings.pitch_limit_degrees.to_radians();
        let angle = direction.angle_between(self.up);
        angle > limit && angle < std::f32::consts::PI - limit
    }
}
