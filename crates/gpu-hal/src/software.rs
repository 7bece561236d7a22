//! Host-side implementation of the GPU composite path.
//!
//! Textures live in a handle table guarded by a `parking_lot::Mutex`; handles
//! come from an atomic counter. `dispatch_composite` walks the bindings in
//! order and blends each layer's texels into a transparent accumulator,
//! reading texel `(i % texture_width, i / texture_width)` for vertex `i`,
//! exactly like the generated shader. Binding `l` is read straight from its
//! own texture where a device backend would read array layer `l`.
//!
//! The blend itself runs through [`BlendMode::blend_pixel`], so this backend
//! checks the bridge's upload and binding bookkeeping, not the WGSL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sl_common::{
    BlendMode, GpuBackend, GpuCapabilities, GpuError, GpuProgram, GpuTexture, LayerBinding,
    ShaderSource, TextureDesc,
};
use tracing::debug;

/// Texel storage for one allocated texture.
struct TextureSlot {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

/// Reference [`GpuBackend`] that executes on the CPU.
pub struct SoftwareBackend {
    name: String,
    capabilities: GpuCapabilities,
    next_handle: AtomicU64,
    textures: Mutex<HashMap<u64, TextureSlot>>,
    programs: Mutex<HashMap<u64, String>>,
    uploads: AtomicU64,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::with_capabilities(GpuCapabilities::default())
    }

    /// Backend reporting custom limits, for exercising degraded devices.
    pub fn with_capabilities(capabilities: GpuCapabilities) -> Self {
        Self {
            name: "Software compositor".to_string(),
            capabilities,
            next_handle: AtomicU64::new(1),
            textures: Mutex::new(HashMap::new()),
            programs: Mutex::new(HashMap::new()),
            uploads: AtomicU64::new(0),
        }
    }

    /// Live texture count.
    pub fn texture_count(&self) -> usize {
        self.textures.lock().len()
    }

    /// Live program count.
    pub fn program_count(&self) -> usize {
        self.programs.lock().len()
    }

    /// Total texture uploads since creation.
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    fn allocate_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for SoftwareBackend {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> GpuCapabilities {
        self.capabilities
    }

    fn alloc_texture(&self, desc: &TextureDesc) -> Result<GpuTexture, GpuError> {
        let max = self.capabilities.max_texture_dimension;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(GpuError::AllocFailed {
                width: desc.width,
                height: desc.height,
            });
        }
        let handle = self.allocate_handle();
        let len = desc.width as usize * desc.height as usize * 4;
        self.textures.lock().insert(
            handle,
            TextureSlot {
                width: desc.width,
                height: desc.height,
                data: vec![0.0; len],
            },
        );
        debug!(
            handle,
            label = %desc.label,
            width = desc.width,
            height = desc.height,
            "Allocated texture"
        );
        Ok(GpuTexture {
            handle,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            filter: desc.filter,
        })
    }

    fn upload_texture(&self, texture: &GpuTexture, data: &[f32]) -> Result<(), GpuError> {
        let mut textures = self.textures.lock();
        let slot = textures
            .get_mut(&texture.handle)
            .ok_or(GpuError::InvalidHandle(texture.handle))?;
        if data.len() != slot.data.len() {
            return Err(GpuError::UploadSizeMismatch {
                expected: slot.data.len(),
                got: data.len(),
            });
        }
        slot.data.copy_from_slice(data);
        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn release_texture(&self, texture: GpuTexture) -> Result<(), GpuError> {
        self.textures
            .lock()
            .remove(&texture.handle)
            .map(|_| ())
            .ok_or(GpuError::InvalidHandle(texture.handle))
    }

    fn compile_program(&self, source: &ShaderSource) -> Result<GpuProgram, GpuError> {
        let signature = format!("fn {}(", source.entry_point);
        if !source.wgsl.contains(&signature) {
            return Err(GpuError::ShaderCompile(format!(
                "{}: entry point '{}' not found",
                source.label, source.entry_point
            )));
        }
        let handle = self.allocate_handle();
        self.programs
            .lock()
            .insert(handle, source.entry_point.clone());
        debug!(handle, label = %source.label, "Compiled composite program");
        Ok(GpuProgram {
            handle,
            entry_point: source.entry_point.clone(),
        })
    }

    fn release_program(&self, program: GpuProgram) {
        self.programs.lock().remove(&program.handle);
    }

    fn dispatch_composite(
        &self,
        program: &GpuProgram,
        bindings: &[LayerBinding],
        vertex_count: usize,
    ) -> Result<Vec<f32>, GpuError> {
        if !self.programs.lock().contains_key(&program.handle) {
            return Err(GpuError::InvalidHandle(program.handle));
        }
        if bindings.len() > self.capabilities.max_texture_layers as usize {
            return Err(GpuError::DispatchFailed(format!(
                "{} layers bound, device supports {}",
                bindings.len(),
                self.capabilities.max_texture_layers
            )));
        }

        let textures = self.textures.lock();
        let mut acc = vec![0.0f32; vertex_count * 4];

        for binding in bindings {
            let slot = textures
                .get(&binding.texture)
                .ok_or(GpuError::InvalidHandle(binding.texture))?;
            let u = binding.uniforms;
            let mode = BlendMode::from_code(u.blend_code).ok_or_else(|| {
                GpuError::DispatchFailed(format!("unknown blend code {}", u.blend_code))
            })?;
            let columns = u.texture_width.max(1) as usize;

            for (i, dst) in acc.chunks_exact_mut(4).enumerate() {
                let (x, y) = (i % columns, i / columns);
                if x >= slot.width as usize || y >= slot.height as usize {
                    continue;
                }
                let texel = (y * slot.width as usize + x) * 4;
                mode.blend_pixel(dst, &slot.data[texel..texel + 4], u.opacity);
            }
        }

        debug!(
            layers = bindings.len(),
            vertices = vertex_count,
            "Dispatched composite"
        );
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_common::{FilterMode, LayerUniforms, TextureFormat};

    fn desc(width: u32, height: u32) -> TextureDesc {
        TextureDesc {
            label: "layer".into(),
            width,
            height,
            format: TextureFormat::Rgba32Float,
            filter: FilterMode::Nearest,
        }
    }

    fn program(backend: &SoftwareBackend) -> GpuProgram {
        backend
            .compile_program(&ShaderSource {
                label: "test".into(),
                wgsl: "fn composite(i: u32) {}".into(),
                entry_point: "composite".into(),
            })
            .unwrap()
    }

    #[test]
    fn alloc_upload_release() {
        let backend = SoftwareBackend::new();
        let tex = backend.alloc_texture(&desc(2, 2)).unwrap();
        assert_eq!(backend.texture_count(), 1);
        backend.upload_texture(&tex, &[0.5; 16]).unwrap();
        assert_eq!(backend.upload_count(), 1);

        let err = backend.upload_texture(&tex, &[0.5; 4]).unwrap_err();
        assert_eq!(
            err,
            GpuError::UploadSizeMismatch {
                expected: 16,
                got: 4
            }
        );

        backend.release_texture(tex).unwrap();
        assert_eq!(backend.texture_count(), 0);
    }

    #[test]
    fn oversized_texture_rejected() {
        let backend = SoftwareBackend::new();
        assert!(matches!(
            backend.alloc_texture(&desc(100_000, 1)),
            Err(GpuError::AllocFailed { .. })
        ));
    }

    #[test]
    fn compile_requires_entry_point() {
        let backend = SoftwareBackend::new();
        let err = backend
            .compile_program(&ShaderSource {
                label: "broken".into(),
                wgsl: "fn other() {}".into(),
                entry_point: "composite".into(),
            })
            .unwrap_err();
        assert!(matches!(err, GpuError::ShaderCompile(_)));
        assert_eq!(backend.program_count(), 0);
    }

    #[test]
    fn dispatch_blends_in_binding_order() {
        let backend = SoftwareBackend::new();
        let prog = program(&backend);

        // 3 vertices in a 2-wide texture: rows (v0, v1), (v2, pad).
        let red = backend.alloc_texture(&desc(2, 2)).unwrap();
        let mut texels = vec![0.0; 16];
        for v in 0..3 {
            texels[v * 4..v * 4 + 4].copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        }
        backend.upload_texture(&red, &texels).unwrap();

        let blue = backend.alloc_texture(&desc(2, 2)).unwrap();
        let mut texels = vec![0.0; 16];
        texels[4..8].copy_from_slice(&[0.0, 0.0, 1.0, 1.0]);
        backend.upload_texture(&blue, &texels).unwrap();

        let uniforms = |opacity: f32| LayerUniforms {
            opacity,
            blend_code: BlendMode::Normal.code(),
            order: 0,
            texture_width: 2,
        };
        let bindings = [
            LayerBinding {
                texture: red.handle,
                uniforms: uniforms(1.0),
            },
            LayerBinding {
                texture: blue.handle,
                uniforms: uniforms(0.5),
            },
        ];
        let out = backend.dispatch_composite(&prog, &bindings, 3).unwrap();
        assert_eq!(&out[0..4], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(&out[4..8], &[0.5, 0.0, 0.5, 1.0]);
        assert_eq!(&out[8..12], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn dispatch_rejects_stale_handles() {
        let backend = SoftwareBackend::new();
        let prog = program(&backend);
        let binding = LayerBinding {
            texture: 999,
            uniforms: LayerUniforms::default(),
        };
        assert_eq!(
            backend.dispatch_composite(&prog, &[binding], 1),
            Err(GpuError::InvalidHandle(999))
        );
    }

    #[test]
    fn layer_limit_enforced() {
        let backend = SoftwareBackend::with_capabilities(GpuCapabilities {
            max_texture_layers: 1,
            ..GpuCapabilities::default()
        });
        let prog = program(&backend);
        let tex = backend.alloc_texture(&desc(1, 1)).unwrap();
        let binding = LayerBinding {
            texture: tex.handle,
            uniforms: LayerUniforms::default(),
        };
        assert!(matches!(
            backend.dispatch_composite(&prog, &[binding, binding], 1),
            Err(GpuError::DispatchFailed(_))
        ));
    }
}
