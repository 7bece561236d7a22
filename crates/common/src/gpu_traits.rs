//! GPU backend abstraction traits.
//!
//! The compositing bridge programs against [`GpuBackend`], never against a
//! concrete graphics API. A backend stores per-layer RGBA textures, compiles
//! the generated composite program, and runs it over a set of
//! [`LayerBinding`]s.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::GpuError;

/// Core GPU backend abstraction.
pub trait GpuBackend: Send + Sync {
    // -- Device info --

    /// Human-readable GPU device name.
    fn device_name(&self) -> &str;

    /// Feature limits relevant to layer compositing.
    fn capabilities(&self) -> GpuCapabilities;

    // -- Textures --

    /// Allocate an uninitialized 2D texture.
    fn alloc_texture(&self, desc: &TextureDesc) -> Result<GpuTexture, GpuError>;

    /// Replace the full contents of a texture with interleaved RGBA floats.
    fn upload_texture(&self, texture: &GpuTexture, data: &[f32]) -> Result<(), GpuError>;

    /// Free a texture. The handle must not be used afterwards.
    fn release_texture(&self, texture: GpuTexture) -> Result<(), GpuError>;

    // -- Programs --

    /// Compile a composite program from generated shader source.
    fn compile_program(&self, source: &ShaderSource) -> Result<GpuProgram, GpuError>;

    /// Free a compiled program.
    fn release_program(&self, program: GpuProgram);

    // -- Execution --

    /// Run the composite program over `bindings` (already in composite order)
    /// and read back `4 * vertex_count` floats.
    ///
    /// The program samples one `texture_2d_array`. Binding `i` maps to array
    /// layer `i` and uniform entry `i`; a backend copies each binding's layer
    /// texture into that array layer before dispatching. All layer textures
    /// of one dispatch share width, height and format.
    fn dispatch_composite(
        &self,
        program: &GpuProgram,
        bindings: &[LayerBinding],
        vertex_count: usize,
    ) -> Result<Vec<f32>, GpuError>;
}

/// Texel storage format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 4 channels, 32-bit float.
    Rgba32Float,
}

impl TextureFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Rgba32Float => 16,
        }
    }
}

/// Texture sampling filter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// Parameters for [`GpuBackend::alloc_texture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

/// Backend limits and optional features.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GpuCapabilities {
    /// Whether `Rgba32Float` textures support linear filtering.
    pub float32_filterable: bool,
    /// Maximum number of layer textures bound in one dispatch.
    pub max_texture_layers: u32,
    /// Maximum texture width or height.
    pub max_texture_dimension: u32,
}

impl Default for GpuCapabilities {
    fn default() -> Self {
        Self {
            float32_filterable: true,
            max_texture_layers: 256,
            max_texture_dimension: 8192,
        }
    }
}

/// Opaque GPU texture handle.
#[derive(Debug, PartialEq, Eq)]
pub struct GpuTexture {
    /// Backend-specific handle.
    pub handle: u64,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

impl GpuTexture {
    /// Number of floats a full upload must supply.
    pub fn float_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Generated shader source handed to [`GpuBackend::compile_program`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: String,
    pub wgsl: String,
    pub entry_point: String,
}

/// Opaque compiled program handle.
#[derive(Debug, PartialEq, Eq)]
pub struct GpuProgram {
    pub handle: u64,
    pub entry_point: String,
}

/// Per-layer uniform block, laid out to match the WGSL `LayerUniforms` struct.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LayerUniforms {
    pub opacity: f32,
    pub blend_code: u32,
    pub order: i32,
    pub texture_width: u32,
}

/// A layer texture together with its uniforms, as bound for one dispatch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayerBinding {
    pub texture: u64,
    pub uniforms: LayerUniforms,
}
