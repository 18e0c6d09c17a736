#![deny(unsafe_code)]
//! CLI binary for the gl-sandbox core.
//!
//! Runs without a GL context. Subcommands:
//! - `camera`: build a camera and print its view-projection matrix
//! - `texture <path>`: decode an image the way a texture load would
//! - `layouts`: list the built-in vertex records

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use gl_sandbox_core::render::{
    decode_image, sampler_bindings, ColorVertex, LitVertex, PixelFormat, PositionVertex,
    TextureKind, TexturedVertex, Vertex, VertexLayout,
};
use gl_sandbox_core::{Camera, CameraSettings};
use glam::{Vec3, Vec4};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "gl-sandbox", about = "OpenGL sandbox inspection CLI")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a camera and print its view-projection matrix.
    Camera {
        /// Eye position as x,y,z.
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,2")]
        position: Vec3,

        /// Viewing direction as x,y,z.
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,-1")]
        orientation: Vec3,

        /// Viewport width in pixels.
        #[arg(short = 'W', long, default_value_t = 800)]
        width: u32,

        /// Viewport height in pixels.
        #[arg(short = 'H', long, default_value_t = 800)]
        height: u32,

        /// Camera settings as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,

        /// World-space point x,y,z to project through the matrix.
        #[arg(long, value_parser = parse_vec3)]
        point: Option<Vec3>,
    },
    /// Decode an image and report what a texture load would upload.
    Texture {
        /// Image file path (PNG or JPEG).
        path: PathBuf,

        /// Channel layout to decode to (rgb, rgba).
        #[arg(short, long, default_value = "rgba")]
        format: String,

        /// Texture role (diffuse, specular).
        #[arg(short, long, default_value = "diffuse")]
        kind: String,
    },
    /// List the built-in vertex records and their layouts.
    Layouts,
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{s}': {e}"))?;
    match parts[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got '{s}'")),
    }
}

/// Clip-space and normalized device coordinates of `point`.
fn project(camera: &Camera, point: Vec3) -> (Vec4, Vec3) {
    let clip = camera.matrix() * point.extend(1.0);
    (clip, clip.truncate() / clip.w)
}

fn builtin_layouts() -> [(&'static str, VertexLayout); 4] {
    [
        ("position", PositionVertex::layout()),
        ("color", ColorVertex::layout()),
        ("textured", TexturedVertex::layout()),
        ("lit", LitVertex::layout()),
    ]
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Layouts => {
            let layouts = builtin_layouts();
            if cli.json {
                let info: Vec<_> = layouts
                    .iter()
                    .map(|(name, layout)| {
                        let attributes: Vec<_> = layout
                            .attributes()
                            .iter()
                            .map(|a| {
                                serde_json::json!({
                                    "slot": a.slot,
                                    "offset": a.offset,
                                    "components": a.components,
                                    "type": format!("{:?}", a.component_type).to_lowercase(),
                                })
                            })
                            .collect();
                        serde_json::json!({
                            "name": name,
                            "stride": layout.stride(),
                            "attributes": attributes,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                for (name, layout) in &layouts {
                    println!("{name} (stride {})", layout.stride());
                    for a in layout.attributes() {
                        println!(
                            "  slot {}: {} x {:?} at offset {}",
                            a.slot, a.components, a.component_type, a.offset
                        );
                    }
                }
            }
        }
        Command::Texture { path, format, kind } => {
            let format = PixelFormat::from_name(&format)
                .ok_or_else(|| CliError::Input(format!("unknown format '{format}'")))?;
            let kind = TextureKind::from_name(&kind)
                .ok_or_else(|| CliError::Input(format!("unknown texture kind '{kind}'")))?;

            let image = decode_image(&path, format)?;
            let sampler = sampler_bindings([kind])
                .into_iter()
                .next()
                .map(|b| b.name)
                .unwrap_or_default();

            if cli.json {
                let info = serde_json::json!({
                    "path": path.display().to_string(),
                    "width": image.width(),
                    "height": image.height(),
                    "channels": format.channels(),
                    "bytes": image.pixels().len(),
                    "kind": kind.to_string(),
                    "sampler": sampler,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!(
                    "{}: {}x{}, {} channels, {} bytes, {kind} -> {sampler} (unit 0)",
                    path.display(),
                    image.width(),
                    image.height(),
                    format.channels(),
                    image.pixels().len()
                );
            }
        }
        Command::Camera {
            position,
            orientation,
            width,
            height,
            params,
            point,
        } => {
            let params: serde_json::Value = serde_json::from_str(&params)
                .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
            let settings = CameraSettings::from_json(&params)?;

            let mut camera = Camera::new(width, height, position)?.with_settings(settings)?;
            camera.set_orientation(orientation)?;
            let matrix = camera.update_matrix_from_settings();
            let projected = point.map(|p| (p, project(&camera, p)));

            if cli.json {
                let mut info = serde_json::json!({
                    "position": position.to_array(),
                    "orientation": camera.orientation().to_array(),
                    "width": width,
                    "height": height,
                    "settings": settings,
                    "matrix": matrix.to_cols_array_2d(),
                });
                if let Some((p, (clip, ndc))) = projected {
                    info["point"] = serde_json::json!({
                        "world": p.to_array(),
                        "clip": clip.to_array(),
                        "ndc": ndc.to_array(),
                    });
                }
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("view-projection (column-major):");
                for column in matrix.to_cols_array_2d() {
                    println!(
                        "  [{:>10.5} {:>10.5} {:>10.5} {:>10.5}]",
                        column[0], column[1], column[2], column[3]
                    );
                }
                if let Some((p, (clip, ndc))) = projected {
                    println!("point {p} -> clip {clip}, ndc {ndc}");
                }
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        log::debug!("exiting with code {}", e.exit_code());
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
