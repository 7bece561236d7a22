//! `sl-common` — Shared types, blend math, and GPU traits for surface layer compositing.
//!
//! This crate is the foundation that all other workspace crates depend on.
//! It defines:
//!
//! - **Types**: `LayerId`, `Range`, `Threshold`, `Rgba` (hide-band and range normalization)
//! - **Blend**: `BlendMode` with the single-source blend formulas used by host and shader
//! - **GPU Traits**: `GpuBackend`, `GpuTexture`, `LayerUniforms` (backend abstraction)
//! - **Config**: `CompositorConfig`, `StackConfig`, `CompositingMode`
//! - **Errors**: `GpuError` (thiserror-based)

pub mod blend;
pub mod color;
pub mod config;
pub mod error;
pub mod float_serde;
pub mod gpu_traits;
pub mod types;

// Re-export commonly used items at crate root
pub use blend::BlendMode;
pub use config::{CompositingMode, CompositorConfig, StackConfig};
pub use error::GpuError;
pub use gpu_traits::{
    FilterMode, GpuBackend, GpuCapabilities, GpuProgram, GpuTexture, LayerBinding, LayerUniforms,
    ShaderSource, TextureDesc, TextureFormat,
};
pub use types::{LayerId, Range, Rgba, Threshold, RANGE_EPSILON, THRESHOLD_EPSILON};
