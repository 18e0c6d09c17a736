//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: sandbox error (bad dimensions, bad settings, backend failure)
//! - 11: I/O error (unreadable or undecodable image)
//! - 12: input error (bad JSON params, unknown format or kind)
//! - 13: serialization error

use gl_sandbox_core::render::TextureError;
use gl_sandbox_core::SandboxError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
pub enum CliError {
    /// A core error other than a failed image read.
    Sandbox(SandboxError),
    /// An image could not be read or decoded.
    Io(String),
    /// A user input error (bad JSON params, unknown name).
    Input(String),
    /// A serialization error (JSON output failure).
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Sandbox(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Sandbox(e) => write!(f, "{e}"),
            CliError::Io(msg) | CliError::Input(msg) | CliError::Serialization(msg) => {
                write!(f, "{msg}")
            }
        }
    }
}

impl From<SandboxError> for CliError {
    fn from(e: SandboxError) -> Self {
        match e {
            SandboxError::Texture(decode @ TextureError::Decode { .. }) => {
                CliError::Io(decode.to_string())
            }
            SandboxError::InvalidSetting { .. } => CliError::Input(e.to_string()),
            other => CliError::Sandbox(other),
        }
    }
}

impl From<TextureError> for CliError {
    fn from(e: TextureError) -> Self {
        CliError::from(SandboxError::from(e))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_error_exit_code_is_10() {
        let err = CliError::Sandbox(SandboxError::InvalidDimensions);
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn io_error_exit_code_is_11() {
        let err = CliError::Io("unreadable".into());
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn input_error_exit_code_is_12() {
        let err = CliError::Input("bad kind".into());
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn serialization_error_exit_code_is_13() {
        let err = CliError::Serialization("json fail".into());
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn decode_failure_routes_to_cli_io() {
        let texture_err = TextureError::Decode {
            path: "missing.png".into(),
            reason: "No such file".into(),
        };
        let cli_err = CliError::from(texture_err);
        assert_eq!(cli_err.exit_code(), 11);
        assert!(cli_err.to_string().contains("missing.png"));
    }

    #[test]
    fn invalid_setting_routes_to_cli_input() {
        let err = SandboxError::InvalidSetting {
            name: "near".into(),
            reason: "must be positive".into(),
        };
        let cli_err = CliError::from(err);
        assert_eq!(cli_err.exit_code(), 12);
        assert!(cli_err.to_string().contains("near"));
    }

    #[test]
    fn other_sandbox_errors_route_to_cli_sandbox() {
        let cli_err = CliError::from(SandboxError::InvalidDimensions);
        assert_eq!(cli_err.exit_code(), 10);
    }

    #[test]
    fn from_serde_json_error_routes_to_serialization() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{invalid");
        let cli_err = CliError::from(bad_json.unwrap_err());
        assert_eq!(cli_err.exit_code(), 13);
    }
}
