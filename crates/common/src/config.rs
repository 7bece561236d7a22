//! Configuration structs for layer stacks and the compositing bridge.

use serde::{Deserialize, Serialize};

/// Where the final per-vertex color is computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositingMode {
    /// Host loop writes a vertex-color buffer.
    #[default]
    #[serde(rename = "CPU")]
    Cpu,
    /// Per-layer textures + uniforms blended by a fragment routine.
    #[serde(rename = "GPU")]
    Gpu,
}

impl CompositingMode {
    pub fn from_use_gpu(use_gpu: bool) -> Self {
        if use_gpu {
            Self::Gpu
        } else {
            Self::Cpu
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
        }
    }
}

/// Layer stack configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    /// Vertex count of the surface every layer must match.
    pub vertex_count: usize,
}

impl StackConfig {
    pub fn new(vertex_count: usize) -> Self {
        Self { vertex_count }
    }
}

/// Compositing bridge configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositorConfig {
    /// Mode the bridge starts in.
    pub mode: CompositingMode,
    /// Texel columns per layer texture; vertices are laid out row-major.
    pub texture_width: u32,
    /// Upper bound on simultaneously bound layer textures (0 = backend limit).
    pub max_gpu_layers: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            mode: CompositingMode::Cpu,
            texture_width: 2048,
            max_gpu_layers: 0,
        }
    }
}

impl CompositorConfig {
    /// Texture height needed to hold `vertex_count` texels.
    pub fn texture_height(&self, vertex_count: usize) -> u32 {
        let width = self.texture_width.max(1) as usize;
        vertex_count.div_ceil(width).max(1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_cpu() {
        let cfg = CompositorConfig::default();
        assert_eq!(cfg.mode, CompositingMode::Cpu);
        assert_eq!(cfg.texture_width, 2048);
    }

    #[test]
    fn texture_height_rounds_up() {
        let cfg = CompositorConfig {
            texture_width: 4,
            ..Default::default()
        };
        assert_eq!(cfg.texture_height(8), 2);
        assert_eq!(cfg.texture_height(9), 3);
        assert_eq!(cfg.texture_height(0), 1);
    }

    #[test]
    fn mode_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&CompositingMode::Gpu).unwrap(),
            "\"GPU\""
        );
        assert_eq!(CompositingMode::from_use_gpu(false).as_str(), "CPU");
    }

    #[test]
    fn config_roundtrip() {
        let cfg = CompositorConfig {
            mode: CompositingMode::Gpu,
            texture_width: 1024,
            max_gpu_layers: 8,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("textureWidth"));
        let back: CompositorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
