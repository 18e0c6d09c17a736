//! Camera settings and the forgiving JSON reader that fills them.
//!
//! Each setting is read from a JSON object by key. If the key is missing
//! or the value is not a number, the default is kept; the assembled
//! settings are then range-checked by [`CameraSettings::validate`].

use crate::error::SandboxError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speed multiplier applied while the sprint key is held.
pub const SPRINT_MULTIPLIER: f32 = 4.0;

/// Tunables for a free-fly [`Camera`](crate::camera::Camera).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// World units moved per frame per held key.
    pub speed: f32,
    /// Factor applied to `speed` while sprinting.
    pub sprint_multiplier: f32,
    /// Degrees of rotation for a cursor offset of one full window extent.
    pub sensitivity: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Closest the view direction may get to straight up or down, in degrees.
    pub pitch_limit_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            speed: 0.1,
            sprint_multiplier: SPRINT_MULTIPLIER,
            sensitivity: 100.0,
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            pitch_limit_degrees: 5.0,
        }
    }
}

/// Extracts an `f32` from `params[name]`, returning `default` if missing or wrong type.
///
/// Accepts both JSON numbers and integers.
fn param_f32(params: &Value, name: &str, default: f32) -> f32 {
    params
        .get(name)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(default)
}

fn invalid(name: &str, reason: &str) -> SandboxError {
    SandboxError::InvalidSetting {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl CameraSettings {
    /// Reads settings from a JSON object, falling back to the defaults for
    /// absent or non-numeric keys, then validates them.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::InvalidSetting` if a value is out of range.
    pub fn from_json(params: &Value) -> Result<Self, SandboxError> {
        let d = Self::default();
        let settings = Self {
            speed: param_f32(params, "speed", d.speed),
            sprint_multiplier: param_f32(params, "sprint_multiplier", d.sprint_multiplier),
            sensitivity: param_f32(params, "sensitivity", d.sensitivity),
            fov_degrees: param_f32(params, "fov_degrees", d.fov_degrees),
            near: param_f32(params, "near", d.near),
            far: param_f32(params, "far", d.far),
            pitch_limit_degrees: param_f32(params, "pitch_limit_degrees", d.pitch_limit_degrees),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every setting is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::InvalidSetting` naming the first bad setting.
    pub fn validate(&self) -> Result<(), SandboxError> {
        let fields = [
            ("speed", self.speed),
            ("sprint_multiplier", self.sprint_multiplier),
            ("sensitivity", self.sensitivity),
            ("fov_degrees", self.fov_degrees),
            ("near", self.near),
            ("far", self.far),
            ("pitch_limit_degrees", self.pitch_limit_degrees),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(name, "must be finite"));
        }
        if self.speed <= 0.0 {
            return Err(invalid("speed", "must be positive"));
        }
        if self.sprint_multiplier < 1.0 {
            return Err(invalid("sprint_multiplier", "must be at least 1"));
        }
        if self.sensitivity <= 0.0 {
            return Err(invalid("sensitivity", "must be positive"));
        }
        if self.fov_degrees <= 0.0 || self.fov_degrees >= 180.0 {
            return Err(invalid("fov_degrees", "must be between 0 and 180 exclusive"));
        }
        if self.near <= 0.0 {
            return Err(invalid("near", "must be positive"));
        }
        if self.far <= self.near {
            return Err(invalid("far", "must be greater than near"));
        }
        if self.pitch_limit_degrees <= 0.0 || self.pitch_limit_degrees >= 90.0 {
            return Err(invalid(
                "pitch_limit_degrees",
                "must be between 0 and 90 exclusive",
            ));
        }
        Ok(())
    }

    /// Field of view in radians.
    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    /// Speed while the sprint key is held.
    pub fn sprint_speed(&self) -> f32 {
        self.speed * self.sprint_multiplier
    }
}
