use serde::{Deserialize, Serialize};
use sl_common::float_serde;

use super::{check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Caller-computed colors, passed through unchanged.
///
/// A vertex with any non-finite channel is written transparent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RgbaLayer {
    /// Interleaved RGBA, `4 * V` floats.
    #[serde(with = "float_serde::vec")]
    pub data: Vec<f32>,
}

impl RgbaLayer {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }
}

impl VertexSource for RgbaLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.data.len() / 4)
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("data", self.data.len())?;
        if self.data.len() % 4 != 0 {
            return Err(LayerError::InvalidValue {
                field: "data",
                reason: format!("length {} is not a multiple of 4", self.data.len()),
            });
        }
        Ok(())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        for (i, px) in self.data.chunks_exact(4).enumerate() {
            if px.iter().all(|c| c.is_finite()) {
                put(out, i, [px[0], px[1], px[2], px[3]]);
            }
        }
    }
}
