//! WGSL generation for the GPU composite program.
//!
//! The blend branches are spliced in from [`BlendMode::wgsl_color_expr`] and
//! [`BlendMode::wgsl_alpha_expr`], the same expressions the host loop runs,
//! so both compositing modes share one definition of every formula.
//!
//! Layer `l` of `layer_textures` holds the texture of binding `l`; see
//! [`sl_common::GpuBackend::dispatch_composite`] for how a backend assembles
//! the array from per-layer textures.

use std::fmt::Write;

use sl_common::{BlendMode, LayerBinding, LayerUniforms, ShaderSource};

/// Entry point of the generated compute program.
pub const ENTRY_POINT: &str = "composite";

/// Threads per workgroup; one thread per vertex.
pub const WORKGROUP_SIZE: u32 = 64;

const PRELUDE: &str = "\
struct LayerUniforms {
    opacity: f32,
    blend_code: u32,
    order: i32,
    texture_width: u32,
};

struct Params {
    layer_count: u32,
    vertex_count: u32,
};

@group(0) @binding(0) var layer_textures: texture_2d_array<f32>;
@group(0) @binding(1) var<storage, read> layers: array<LayerUniforms>;
@group(0) @binding(2) var<uniform> params: Params;
@group(0) @binding(3) var<storage, read_write> out_colors: array<vec4<f32>>;
";

/// Build `fn <name>(code: u32, <args>) -> f32` dispatching on blend code.
fn blend_fn(
    out: &mut String,
    name: &str,
    args: &str,
    expr: fn(BlendMode) -> &'static str,
    fallback: &str,
) {
    let _ = writeln!(out, "fn {name}(code: u32, {args}) -> f32 {{");
    for &mode in BlendMode::all() {
        let _ = writeln!(
            out,
            "    if (code == {}u) {{ return {}; }} // {}",
            mode.code(),
            expr(mode),
            mode.display_name()
        );
    }
    let _ = writeln!(out, "    return {fallback};");
    let _ = writeln!(out, "}}");
}

/// Generate the full WGSL source of the composite program.
pub fn composite_wgsl() -> String {
    let mut src = String::from(PRELUDE);
    src.push('\n');
    blend_fn(
        &mut src,
        "blend_color",
        "s: f32, d: f32, a: f32",
        BlendMode::wgsl_color_expr,
        "d",
    );
    src.push('\n');
    blend_fn(
        &mut src,
        "blend_alpha",
        "a: f32, da: f32",
        BlendMode::wgsl_alpha_expr,
        "da",
    );
    src.push('\n');
    let _ = write!(
        src,
        "\
@compute @workgroup_size({WORKGROUP_SIZE})
fn {ENTRY_POINT}(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let i = gid.x;
    if (i >= params.vertex_count) {{
        return;
    }}
    var acc = vec4<f32>(0.0, 0.0, 0.0, 0.0);
    for (var l = 0u; l < params.layer_count; l = l + 1u) {{
        let u = layers[l];
        let texel = vec2<i32>(i32(i % u.texture_width), i32(i / u.texture_width));
        let src = textureLoad(layer_textures, texel, i32(l), 0);
        let a = src.a * u.opacity;
        acc = vec4<f32>(
            blend_color(u.blend_code, src.r, acc.r, a),
            blend_color(u.blend_code, src.g, acc.g, a),
            blend_color(u.blend_code, src.b, acc.b, a),
            blend_alpha(u.blend_code, a, acc.a),
        );
    }}
    out_colors[i] = acc;
}}
"
    );
    src
}

/// The composite program ready for [`sl_common::GpuBackend::compile_program`].
pub fn composite_shader() -> ShaderSource {
    ShaderSource {
        label: "surface-layer-composite".to_string(),
        wgsl: composite_wgsl(),
        entry_point: ENTRY_POINT.to_string(),
    }
}

/// Bytes of the `layers` storage buffer for one dispatch, in binding order.
pub fn pack_layer_uniforms(bindings: &[LayerBinding]) -> Vec<u8> {
    let uniforms: Vec<LayerUniforms> = bindings.iter().map(|b| b.uniforms).collect();
    bytemuck::cast_slice(&uniforms).to_vec()
}
