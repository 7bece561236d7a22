//! Runtime GPU backend selection.

use sl_common::{CompositingMode, GpuBackend};
use tracing::info;

use crate::software::SoftwareBackend;

/// Human-readable description of a compositing mode.
pub fn describe_mode(mode: CompositingMode) -> &'static str {
    match mode {
        CompositingMode::Cpu => "CPU (host-side blending into vertex colors)",
        CompositingMode::Gpu => "GPU (per-layer textures blended by the composite shader)",
    }
}

/// Create the backend a compositing mode needs. Host mode needs none.
pub fn create_backend(mode: CompositingMode) -> Option<Box<dyn GpuBackend>> {
    match mode {
        CompositingMode::Cpu => None,
        CompositingMode::Gpu => {
            let backend = SoftwareBackend::new();
            info!(device = backend.device_name(), "Selected GPU backend");
            Some(Box::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_mode_has_no_backend() {
        assert!(create_backend(CompositingMode::Cpu).is_none());
    }

    #[test]
    fn gpu_mode_gets_a_backend() {
        let backend = create_backend(CompositingMode::Gpu).unwrap();
        assert!(!backend.device_name().is_empty());
        assert!(backend.capabilities().max_texture_layers > 0);
    }

    #[test]
    fn descriptions_differ() {
        assert_ne!(
            describe_mode(CompositingMode::Cpu),
            describe_mode(CompositingMode::Gpu)
        );
    }
}
