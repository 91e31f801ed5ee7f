use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

use crate::uniforms::UNIFORM_NAMES;

/// Built-in vertex stage: gently lifts the plane around the pointer while pressed.
pub const DEFAULT_VERTEX_SHADER: &str = include_str!("../shaders/plane.vert");
/// Built-in fragment stage: cover-fitted image with speed-driven RGB split and ripples.
pub const DEFAULT_FRAGMENT_SHADER: &str = include_str!("../shaders/plane.frag");

const MATRIX_UNIFORMS: [&str; 2] = ["projectionMatrix", "modelViewMatrix"];

const BUILTIN_ATTRIBUTES: [&str; 2] = ["position", "uv"];

/// Uniforms supplied by the uniform block; user declarations of these are dropped.
fn is_block_uniform(name: &str) -> bool {
    MATRIX_UNIFORMS.contains(&name) || UNIFORM_NAMES.contains(&name)
}

pub(crate) fn compile_vertex_shader(device: &wgpu::Device, source: &str) -> Result<wgpu::ShaderModule> {
    create_module(device, "texwarp plane vertex", wrap_vertex(source), ShaderStage::Vertex)
}

pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    create_module(device, "texwarp plane fragment", wrap_fragment(source), ShaderStage::Fragment)
}

/// Validation failures come back as errors instead of hitting the device's
/// uncaptured-error handler.
fn create_module(
    device: &wgpu::Device,
    label: &str,
    wrapped: String,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    tracing::trace!(label, lines = wrapped.lines().count(), "compiling wrapped shader");
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        anyhow::bail!("{label} shader rejected: {err}");
    }
    Ok(module)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Vertex,
    Fragment,
}

/// Turns WebGL-style vertex GLSL into Vulkan GLSL 450 against [`VERTEX_HEADER`].
pub fn wrap_vertex(source: &str) -> String {
    format!("{VERTEX_HEADER}{UNIFORM_BLOCK}\n#line 1\n{}", sanitize(source, Stage::Vertex))
}

/// Turns WebGL-style fragment GLSL into Vulkan GLSL 450 against [`FRAGMENT_HEADER`].
pub fn wrap_fragment(source: &str) -> String {
    format!(
        "{FRAGMENT_HEADER}{UNIFORM_BLOCK}{TEXTURE_BINDINGS}\n#line 1\n{}",
        sanitize(source, Stage::Fragment)
    )
}

/// Drops declarations the headers already provide and gives extra varyings
/// explicit locations, assigned in declaration order starting after `vUv`.
fn sanitize(source: &str, stage: Stage) -> String {
    let mut sanitized = String::with_capacity(source.len());
    let mut next_location = 1;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version")
            || trimmed.starts_with("#extension")
            || trimmed.starts_with("precision ")
        {
            sanitized.push('\n');
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("uniform ") {
            if declared_name(rest).is_some_and(is_block_uniform) {
                sanitized.push('\n');
                continue;
            }
        }

        if let Some(rest) = trimmed.strip_prefix("attribute ") {
            if declared_name(rest).is_some_and(|name| BUILTIN_ATTRIBUTES.contains(&name)) {
                sanitized.push('\n');
                continue;
            }
        }

        if let Some(rest) = trimmed.strip_prefix("varying ") {
            if declared_name(rest) != Some("vUv") {
                let qualifier = match stage {
                    Stage::Vertex => "out",
                    Stage::Fragment => "in",
                };
                sanitized.push_str(&format!("layout(location = {next_location}) {qualifier} {rest}"));
                next_location += 1;
            }
            sanitized.push('\n');
            continue;
        }

        sanitized.push_str(&rename_texture_uniform(line));
        sanitized.push('\n');
    }

    sanitized
}

/// Identifier declared by `"<type> <name>;"`.
fn declared_name(declaration: &str) -> Option<&str> {
    let statement = declaration.split(';').next()?;
    let name = statement.split_whitespace().last()?;
    Some(name.split('[').next().unwrap_or(name))
}

/// `texture` is a builtin function in GLSL 450, so the image uniform goes by
/// `planeTexture`. Calls such as `texture(...)` are left alone.
fn rename_texture_uniform(line: &str) -> Cow<'_, str> {
    const NAME: &str = "texture";
    if !line.contains(NAME) {
        return Cow::Borrowed(line);
    }

    let bytes = line.as_bytes();
    let is_ident = |byte: u8| byte.is_ascii_alphanumeric() || byte == b'_';
    let mut out = String::with_capacity(line.len() + 8);
    let mut cursor = 0;
    while let Some(found) = line[cursor..].find(NAME) {
        let start = cursor + found;
        let end = start + NAME.len();
        let bounded_left = start == 0 || !is_ident(bytes[start - 1]);
        let bounded_right = end == bytes.len() || !is_ident(bytes[end]);
        let is_call = line[end..].trim_start().starts_with('(');
        out.push_str(&line[cursor..start]);
        if bounded_left && bounded_right && !is_call {
            out.push_str("planeTexture");
        } else {
            out.push_str(NAME);
        }
        cursor = end;
    }
    out.push_str(&line[cursor..]);
    Cow::Owned(out)
}

const VERTEX_HEADER: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(location = 0) out vec2 vUv;
";

const FRAGMENT_HEADER: &str = r"#version 450
layout(location = 0) in vec2 vUv;
layout(location = 0) out vec4 texwarp_FragColor;
#define gl_FragColor texwarp_FragColor
";

/// Must match `PlaneUniforms` in `gpu/uniforms.rs` byte for byte.
const UNIFORM_BLOCK: &str = r"
layout(std140, set = 0, binding = 0) uniform PlaneParams {
    mat4 _projectionMatrix;
    mat4 _modelViewMatrix;
    vec4 _resolution;
    vec2 _mouse;
    float _time;
    float _progress;
    float _direction;
    float _mouseSpeed;
    vec2 _padding0;
} ubo;

#define projectionMatrix ubo._projectionMatrix
#define modelViewMatrix ubo._modelViewMatrix
#define resolution ubo._resolution
#define mouse ubo._mouse
#define time ubo._time
#define progress ubo._progress
#define direction ubo._direction
#define mouseSpeed ubo._mouseSpeed
";

const TEXTURE_BINDINGS: &str = r"
layout(set = 1, binding = 0) uniform texture2D texwarp_texture;
layout(set = 1, binding = 1) uniform sampler texwarp_sampler;
#define planeTexture sampler2D(texwarp_texture, texwarp_sampler)
#define texture2D texture
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_webgl_declarations() {
        let source = r#"
            #version 100
            precision mediump float;
            uniform float time;
            uniform vec2 mouse;
            uniform sampler2D texture;
            varying vec2 vUv;
            void main() {
                gl_FragColor = texture2D(texture, vUv) * time;
            }
        "#;

        let wrapped = wrap_fragment(source);
        assert!(!wrapped.contains("uniform float time"));
        assert!(!wrapped.contains("uniform vec2 mouse"));
        assert!(!wrapped.contains("uniform sampler2D texture"));
        assert!(!wrapped.contains("precision mediump"));
        assert!(!wrapped.contains("#version 100"));
        assert!(wrapped.contains("texture2D(planeTexture, vUv)"));
        assert!(wrapped.starts_with("#version 450"));
    }

    #[test]
    fn every_block_uniform_declaration_is_dropped() {
        let mut source: String = ["projectionMatrix", "modelViewMatrix"]
            .iter()
            .map(|name| format!("uniform mat4 {name};\n"))
            .collect();
        for name in UNIFORM_NAMES {
            source.push_str(&format!("uniform float {name};\n"));
        }
        source.push_str("uniform float custom;\n");

        let wrapped = wrap_vertex(&source);
        let user = wrapped.split("#line 1\n").nth(1).unwrap();
        assert_eq!(user.matches("uniform").count(), 1, "{user}");
        assert!(user.contains("uniform float custom;"));
    }

    #[test]
    fn vertex_attributes_come_from_header() {
        let source = "attribute vec3 position;\nattribute vec2 uv;\nvarying vec2 vUv;\nvoid main() { vUv = uv; }\n";
        let wrapped = wrap_vertex(source);
        assert_eq!(wrapped.matches("in vec3 position").count(), 1);
        assert!(!wrapped.contains("attribute"));
        assert!(!wrapped.contains("texwarp_texture"));
    }

    #[test]
    fn extra_varyings_get_matching_locations() {
        let vertex = wrap_vertex("varying vec2 vUv;\nvarying float vWave;\nvarying vec3 vNormal;\n");
        let fragment = wrap_fragment("varying vec2 vUv;\nvarying float vWave;\nvarying vec3 vNormal;\n");
        assert!(vertex.contains("layout(location = 1) out float vWave;"));
        assert!(vertex.contains("layout(location = 2) out vec3 vNormal;"));
        assert!(fragment.contains("layout(location = 1) in float vWave;"));
        assert!(fragment.contains("layout(location = 2) in vec3 vNormal;"));
    }

    #[test]
    fn texture_calls_are_not_renamed() {
        assert_eq!(
            rename_texture_uniform("vec4 c = texture(texture, vUv);"),
            "vec4 c = texture(planeTexture, vUv);"
        );
        assert_eq!(rename_texture_uniform("float textured = 1.0;"), "float textured = 1.0;");
        assert_eq!(rename_texture_uniform("texture2D(texture,uv)"), "texture2D(planeTexture,uv)");
    }

    #[test]
    fn wrapped_line_numbers_track_user_source() {
        let source = "#version 100\nvoid main() {}\n";
        let wrapped = wrap_fragment(source);
        let user = wrapped.split("#line 1\n").nth(1).unwrap();
        assert_eq!(user.lines().nth(1), Some("void main() {}"));
    }

    #[test]
    fn default_shaders_wrap_cleanly() {
        let vertex = wrap_vertex(DEFAULT_VERTEX_SHADER);
        let fragment = wrap_fragment(DEFAULT_FRAGMENT_SHADER);
        for wrapped in [&vertex, &fragment] {
            assert_eq!(wrapped.matches("#version").count(), 1);
            assert!(!wrapped.contains("precision "));
            assert!(!wrapped.contains("uniform float time;"));
        }
        assert!(fragment.contains("planeTexture"));
    }
}
