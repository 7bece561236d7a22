//! Compositor error types.

use sl_common::{GpuError, LayerId};
use sl_layers::LayerError;
use thiserror::Error;

/// Errors from stack management and the compositing bridge.
#[derive(Debug, Error)]
pub enum CompositorError {
    /// A layer with this id is already in the stack.
    #[error("Layer already exists: {0}")]
    DuplicateLayer(LayerId),

    /// No layer with this id is in the stack.
    #[error("Unknown layer: {0}")]
    UnknownLayer(LayerId),

    /// An id appears more than once in a reorder request.
    #[error("Layer listed twice in order: {0}")]
    DuplicateInOrder(LayerId),

    /// The layer was built for a different surface.
    #[error("Layer {id} has {got} vertices but the surface has {expected}")]
    VertexCountMismatch {
        id: LayerId,
        expected: usize,
        got: usize,
    },

    /// GPU compositing was requested without a backend.
    #[error("GPU compositing requested but no GPU backend is available")]
    GpuUnavailable,

    /// The backend cannot hold the requested resources.
    #[error("GPU limit exceeded for {what}: {requested} > {limit}")]
    GpuLimit {
        what: &'static str,
        requested: usize,
        limit: usize,
    },

    /// A layer rejected an update or operation.
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    /// A GPU backend operation failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_layer_displays_id() {
        let err = CompositorError::UnknownLayer(LayerId::new("overlay_3"));
        assert!(err.to_string().contains("overlay_3"));
    }

    #[test]
    fn gpu_limit_displays_numbers() {
        let err = CompositorError::GpuLimit {
            what: "layer textures",
            requested: 9,
            limit: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("layer textures") && msg.contains('9') && msg.contains('8'));
    }

    #[test]
    fn gpu_error_converts() {
        let err: CompositorError = GpuError::InvalidHandle(7).into();
        assert!(matches!(err, CompositorError::Gpu(GpuError::InvalidHandle(7))));
    }

    #[test]
    fn layer_error_converts() {
        let err: CompositorError = LayerError::MissingPValues.into();
        assert!(matches!(err, CompositorError::Layer(_)));
    }
}
