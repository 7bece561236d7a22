//! `sl-compositor` — Layer stack compositing for neuroimaging surfaces.
//!
//! A [`LayerStack`] holds the layers of one surface and composites them into
//! a per-vertex RGBA buffer. [`SurfaceCompositor`] presents the same stack
//! either as that host-computed buffer or as per-layer textures and uniforms
//! for the generated WGSL program (see [`shader`]), through the
//! backend-agnostic [`GpuBackend`] trait.
//!
//! Composite per vertex, bottom to top:
//! 1. **Order**: Base layers, then ascending `order`, ties by insertion
//! 2. **Source**: the layer's cached RGBA, regenerated only on revision change
//! 3. **Blend**: `a = src.a * opacity`, then the layer's [`BlendMode`] formula
//!
//! [`GpuBackend`]: sl_common::GpuBackend
//! [`BlendMode`]: sl_common::BlendMode

pub mod bridge;
pub mod shader;
pub mod stack;

mod error;

// Re-export primary API
pub use bridge::{Frame, GpuSyncStats, SurfaceCompositor};
pub use error::CompositorError;
pub use stack::{CompositeStats, LayerStack, LayerVersion};
