//! Layer error types.

use sl_colormap::ColorMapError;
use sl_stats::StatsError;
use thiserror::Error;

use crate::layer::LayerType;

/// Errors from layer construction, updates and statistical operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    /// A per-vertex array disagrees with the layer's vertex count.
    #[error("{field} has {got} entries, expected {expected}")]
    VertexCountMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// A required array is empty.
    #[error("{field} must not be empty")]
    EmptyArray { field: &'static str },

    /// A scalar or array holds a value outside its domain.
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// An index refers past the end of the array it addresses.
    #[error("{field} index {index} out of range (length {len})")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },

    /// A variant update was sent to a layer of another type.
    #[error("Cannot apply a {got} update to a {expected} layer")]
    UpdateTypeMismatch { expected: LayerType, got: LayerType },

    /// Bonferroni and FDR need per-vertex p-values.
    #[error("Correction requires p-values, but the layer has none")]
    MissingPValues,

    /// Cluster thresholding needs the mesh adjacency graph.
    #[error("Cluster correction requires mesh adjacency, but none has been set")]
    MissingAdjacency,

    /// A statistical operation was requested on another layer type.
    #[error("Layer '{id}' is a {layer_type} layer, not a statistical layer")]
    NotStatistical { id: String, layer_type: LayerType },

    #[error("Colormap error: {0}")]
    ColorMap(#[from] ColorMapError),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
}
