//! Compositing-mode bridge — one stack, two interchangeable outputs.
//!
//! In CPU mode the bridge hands out the stack's composited vertex-color
//! buffer. In GPU mode every visible layer's RGBA buffer lives in an
//! `Rgba32Float` texture (vertex `i` at texel `(i % width, i / width)`) and
//! the bridge hands out one [`LayerBinding`] per layer, in composite order,
//! for the generated composite program; [`shader::pack_layer_uniforms`]
//! turns those into the uniform storage buffer.
//!
//! The bridge does not replay history when switching modes: it reads the
//! current stack state into the target representation and recomputes once.

use std::collections::HashMap;

use sl_common::{
    CompositingMode, CompositorConfig, FilterMode, GpuBackend, GpuProgram, GpuTexture,
    LayerBinding, LayerId, LayerUniforms, TextureDesc, TextureFormat,
};
use sl_layers::Layer;
use tracing::{debug, info, warn};

use crate::shader;
use crate::stack::{LayerStack, LayerVersion};
use crate::CompositorError;

/// What the renderer consumes for the current frame.
#[derive(Debug, PartialEq)]
pub enum Frame<'a> {
    /// Interleaved RGBA, `4 * vertex_count` floats.
    VertexColors(&'a [f32]),
    /// Layer textures and uniforms in composite order.
    Gpu(&'a [LayerBinding]),
}

/// GPU-side work counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GpuSyncStats {
    /// Binding rebuilds (one per stack generation consumed).
    pub syncs: u64,
    /// Layer textures uploaded.
    pub uploads: u64,
    /// Layer textures released.
    pub releases: u64,
}

struct LayerTexture {
    texture: GpuTexture,
    version: LayerVersion,
}

struct GpuState {
    program: GpuProgram,
    filter: FilterMode,
    width: u32,
    height: u32,
    textures: HashMap<LayerId, LayerTexture>,
    bindings: Vec<LayerBinding>,
    synced_generation: Option<u64>,
}

/// Owns a [`LayerStack`] and presents it in the active compositing mode.
pub struct SurfaceCompositor {
    stack: LayerStack,
    config: CompositorConfig,
    mode: CompositingMode,
    backend: Option<Box<dyn GpuBackend>>,
    gpu: Option<GpuState>,
    gpu_stats: GpuSyncStats,
}

impl SurfaceCompositor {
    /// Create a bridge starting in `config.mode`. GPU mode needs a backend.
    pub fn new(
        stack: LayerStack,
        config: CompositorConfig,
        backend: Option<Box<dyn GpuBackend>>,
    ) -> Result<Self, CompositorError> {
        let start = config.mode;
        let mut compositor = Self {
            stack,
            config,
            mode: CompositingMode::Cpu,
            backend,
            gpu: None,
            gpu_stats: GpuSyncStats::default(),
        };
        if start == CompositingMode::Gpu {
            compositor.set_compositing_mode(true)?;
        }
        Ok(compositor)
    }

    /// Host-only bridge with default configuration.
    pub fn cpu(stack: LayerStack) -> Self {
        Self {
            stack,
            config: CompositorConfig::default(),
            mode: CompositingMode::Cpu,
            backend: None,
            gpu: None,
            gpu_stats: GpuSyncStats::default(),
        }
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// Mutable stack access. Changes are picked up by the next [`frame`].
    ///
    /// [`frame`]: SurfaceCompositor::frame
    pub fn stack_mut(&mut self) -> &mut LayerStack {
        &mut self.stack
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn compositing_mode(&self) -> CompositingMode {
        self.mode
    }

    pub fn gpu_stats(&self) -> GpuSyncStats {
        self.gpu_stats
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Sampling filter of the layer textures, `None` outside GPU mode.
    pub fn texture_filter(&self) -> Option<FilterMode> {
        self.gpu.as_ref().map(|g| g.filter)
    }

    /// Live layer textures.
    pub fn texture_count(&self) -> usize {
        self.gpu.as_ref().map_or(0, |g| g.textures.len())
    }

    /// Switch between host and GPU compositing.
    ///
    /// The target representation is rebuilt from the current stack state and
    /// recomputed exactly once. If the GPU path cannot be set up the bridge
    /// releases what it allocated, stays in CPU mode, and returns the error.
    pub fn set_compositing_mode(&mut self, use_gpu: bool) -> Result<(), CompositorError> {
        let target = CompositingMode::from_use_gpu(use_gpu);
        match target {
            CompositingMode::Cpu => {
                self.release_gpu();
                self.mode = CompositingMode::Cpu;
                self.stack.mark_needs_composite();
                self.stack.composite();
            }
            CompositingMode::Gpu => {
                self.release_gpu();
                if let Err(e) = self.enter_gpu().and_then(|()| self.sync_gpu()) {
                    warn!(error = %e, "GPU compositing unavailable, staying on CPU");
                    self.release_gpu();
                    self.mode = CompositingMode::Cpu;
                    return Err(e);
                }
                self.mode = CompositingMode::Gpu;
            }
        }

        info!(
            mode = target.as_str(),
            layers = self.stack.len(),
            "Compositing mode set"
        );
        Ok(())
    }

    /// Output for the current frame, recomputed only if the stack changed.
    pub fn frame(&mut self) -> Result<Frame<'_>, CompositorError> {
        match self.mode {
            CompositingMode::Cpu => Ok(Frame::VertexColors(self.stack.composite())),
            CompositingMode::Gpu => {
                self.sync_gpu()?;
                let gpu = self.gpu.as_ref().ok_or(CompositorError::GpuUnavailable)?;
                Ok(Frame::Gpu(&gpu.bindings))
            }
        }
    }

    /// Per-vertex RGBA as the active mode computes it. In GPU mode the
    /// composite program runs on the backend and its output is read back.
    pub fn read_back(&mut self) -> Result<Vec<f32>, CompositorError> {
        match self.mode {
            CompositingMode::Cpu => Ok(self.stack.composite().to_vec()),
            CompositingMode::Gpu => {
                self.sync_gpu()?;
                let backend = self
                    .backend
                    .as_deref()
                    .ok_or(CompositorError::GpuUnavailable)?;
                let gpu = self.gpu.as_ref().ok_or(CompositorError::GpuUnavailable)?;
                let out = backend.dispatch_composite(
                    &gpu.program,
                    &gpu.bindings,
                    self.stack.vertex_count(),
                )?;
                Ok(out)
            }
        }
    }

    /// Remove a layer and free its texture right away.
    pub fn remove_layer(&mut self, id: &LayerId) -> Result<Layer, CompositorError> {
        let layer = self.stack.remove_layer(id)?;
        if let (Some(gpu), Some(backend)) = (self.gpu.as_mut(), self.backend.as_deref()) {
            if let Some(slot) = gpu.textures.remove(id) {
                backend.release_texture(slot.texture)?;
                self.gpu_stats.releases += 1;
            }
        }
        Ok(layer)
    }

    /// Release every GPU resource and fall back to CPU mode. The backend is
    /// kept, so GPU mode can be entered again.
    pub fn dispose(&mut self) {
        self.release_gpu();
        self.mode = CompositingMode::Cpu;
    }

    fn enter_gpu(&mut self) -> Result<(), CompositorError> {
        let backend = self
            .backend
            .as_deref()
            .ok_or(CompositorError::GpuUnavailable)?;
        let caps = backend.capabilities();

        let filter = if caps.float32_filterable {
            FilterMode::Linear
        } else {
            warn!(
                device = backend.device_name(),
                "Float32 textures are not filterable, using nearest sampling"
            );
            FilterMode::Nearest
        };

        let max_dimension = caps.max_texture_dimension.max(1);
        let sizing = CompositorConfig {
            texture_width: self.config.texture_width.clamp(1, max_dimension),
            ..self.config.clone()
        };
        let vertex_count = self.stack.vertex_count();
        let height = vertex_count.div_ceil(sizing.texture_width as usize).max(1);
        if height > max_dimension as usize {
            return Err(CompositorError::GpuLimit {
                what: "texture height",
                requested: height,
                limit: max_dimension as usize,
            });
        }

        let program = backend.compile_program(&shader::composite_shader())?;
        debug!(
            device = backend.device_name(),
            width = sizing.texture_width,
            height,
            ?filter,
            "Entered GPU compositing"
        );

        self.gpu = Some(GpuState {
            program,
            filter,
            width: sizing.texture_width,
            height: sizing.texture_height(vertex_count),
            textures: HashMap::new(),
            bindings: Vec::new(),
            synced_generation: None,
        });
        Ok(())
    }

    fn layer_limit(&self, backend: &dyn GpuBackend) -> usize {
        let device = backend.capabilities().max_texture_layers as usize;
        match self.config.max_gpu_layers {
            0 => device,
            configured => device.min(configured as usize),
        }
    }

    /// Bring textures and bindings up to the stack's current generation.
    fn sync_gpu(&mut self) -> Result<(), CompositorError> {
        let backend = self
            .backend
            .as_deref()
            .ok_or(CompositorError::GpuUnavailable)?;
        let limit = self.layer_limit(backend);
        let gpu = self.gpu.as_mut().ok_or(CompositorError::GpuUnavailable)?;
        let generation = self.stack.generation();
        if gpu.synced_generation == Some(generation) {
            return Ok(());
        }

        let visible = self.stack.visible_ids();
        if visible.len() > limit {
            return Err(CompositorError::GpuLimit {
                what: "layer textures",
                requested: visible.len(),
                limit,
            });
        }

        let removed: Vec<LayerId> = gpu
            .textures
            .keys()
            .filter(|id| !self.stack.contains(id))
            .cloned()
            .collect();
        for id in removed {
            if let Some(slot) = gpu.textures.remove(&id) {
                backend.release_texture(slot.texture)?;
                self.gpu_stats.releases += 1;
            }
        }

        let mut bindings = Vec::with_capacity(visible.len());
        let mut uploaded = 0usize;
        for id in &visible {
            let (Some(layer), Some(version)) = (self.stack.get(id), self.stack.layer_version(id))
            else {
                continue;
            };
            let uniforms = LayerUniforms {
                opacity: layer.opacity(),
                blend_code: layer.blend_mode().code(),
                order: layer.order(),
                texture_width: gpu.width,
            };

            let current = gpu.textures.get(id).map(|slot| slot.version);
            if current != Some(version) {
                let texture = match gpu.textures.remove(id) {
                    Some(slot) => slot.texture,
                    None => backend.alloc_texture(&TextureDesc {
                        label: format!("layer:{id}"),
                        width: gpu.width,
                        height: gpu.height,
                        format: TextureFormat::Rgba32Float,
                        filter: gpu.filter,
                    })?,
                };
                let mut texels = vec![0.0f32; texture.float_len()];
                if let Some(rgba) = self.stack.layer_rgba(id) {
                    let n = rgba.len().min(texels.len());
                    texels[..n].copy_from_slice(&rgba[..n]);
                }
                if let Err(e) = backend.upload_texture(&texture, &texels) {
                    match backend.release_texture(texture) {
                        Ok(()) => self.gpu_stats.releases += 1,
                        Err(release) => {
                            warn!(id = %id, error = %release, "Failed to release layer texture")
                        }
                    }
                    return Err(e.into());
                }
                if current.is_some() {
                    debug!(id = %id, handle = texture.handle, "Re-uploaded layer texture");
                }
                gpu.textures
                    .insert(id.clone(), LayerTexture { texture, version });
                uploaded += 1;
            }

            if let Some(slot) = gpu.textures.get(id) {
                bindings.push(LayerBinding {
                    texture: slot.texture.handle,
                    uniforms,
                });
            }
        }

        gpu.bindings = bindings;
        gpu.synced_generation = Some(generation);
        self.gpu_stats.syncs += 1;
        self.gpu_stats.uploads += uploaded as u64;
        debug!(
            layers = visible.len(),
            uploaded,
            generation,
            "Synchronized GPU layer bindings"
        );
        Ok(())
    }

    fn release_gpu(&mut self) {
        let Some(gpu) = self.gpu.take() else {
            return;
        };
        let Some(backend) = self.backend.as_deref() else {
            return;
        };
        for (id, slot) in gpu.textures {
            match backend.release_texture(slot.texture) {
                Ok(()) => self.gpu_stats.releases += 1,
                Err(e) => warn!(id = %id, error = %e, "Failed to release layer texture"),
            }
        }
        backend.release_program(gpu.program);
        debug!("Released GPU compositing resources");
    }
}

impl Drop for SurfaceCompositor {
    fn drop(&mut self) {
        self.release_gpu();
    }
}
