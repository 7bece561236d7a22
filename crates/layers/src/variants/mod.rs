//! Layer variants.
//!
//! Each variant owns its per-vertex inputs and turns them into RGBA through
//! [`VertexSource`]. Output is a pure function of the variant's own state.

mod base;
mod curvature;
mod data;
mod label;
mod parcel;
mod rgba;
mod statistical;
mod temporal;
mod two_data;

pub use base::BaseLayer;
pub use curvature::CurvatureLayer;
pub use data::DataLayer;
pub use label::{LabelEntry, LabelLayer};
pub use parcel::{Parcel, ParcelValueLayer};
pub use rgba::RgbaLayer;
pub use statistical::{
    CorrectionMethod, CorrectionOutcome, CorrectionSummary, DualThreshold, StatType,
    StatisticalLayer, VertexStatInfo,
};
pub use temporal::{FrameBlend, TemporalLayer};
pub use two_data::TwoDataLayer;

use sl_common::Rgba;

use crate::error::LayerError;

/// Per-vertex color producer implemented by every layer variant.
pub trait VertexSource {
    /// Number of vertices the layer carries data for. `None` for layers that
    /// fit any mesh (a uniform fill).
    fn vertex_count(&self) -> Option<usize>;

    /// Check internal consistency (parallel array lengths, index bounds).
    fn validate(&self) -> Result<(), LayerError>;

    /// Write RGBA for every vertex into `out` (length `4 * V`).
    ///
    /// `out` arrives fully transparent; vertices the layer has no data for
    /// stay that way.
    fn write_rgba(&self, out: &mut [f32]);
}

/// Write one color at vertex `i`, ignoring vertices past the end of `out`.
#[inline]
pub(crate) fn put(out: &mut [f32], i: usize, color: Rgba) {
    if let Some(px) = out.get_mut(i * 4..i * 4 + 4) {
        px.copy_from_slice(&color);
    }
}

pub(crate) fn check_len(field: &'static str, expected: usize, got: usize) -> Result<(), LayerError> {
    if expected == got {
        Ok(())
    } else {
        Err(LayerError::VertexCountMismatch {
            field,
            expected,
            got,
        })
    }
}

pub(crate) fn check_not_empty(field: &'static str, len: usize) -> Result<(), LayerError> {
    if len == 0 {
        Err(LayerError::EmptyArray { field })
    } else {
        Ok(())
    }
}

pub(crate) fn check_finite(field: &'static str, value: f32) -> Result<(), LayerError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayerError::InvalidValue {
            field,
            reason: format!("{value} is not finite"),
        })
    }
}
