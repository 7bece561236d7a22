use serde::{Deserialize, Serialize};
use sl_common::Rgba;

use super::{put, VertexSource};
use crate::error::LayerError;

/// Uniform fill painted under every other layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseLayer {
    pub color: Rgba,
}

impl BaseLayer {
    pub const DEFAULT_COLOR: Rgba = [0.8, 0.8, 0.8, 1.0];

    pub fn new(color: Rgba) -> Self {
        Self { color }
    }
}

impl Default for BaseLayer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COLOR)
    }
}

impl VertexSource for BaseLayer {
    fn vertex_count(&self) -> Option<usize> {
        None
    }

    fn validate(&self) -> Result<(), LayerError> {
        if self.color.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(LayerError::InvalidValue {
                field: "color",
                reason: "non-finite component".into(),
            })
        }
    }

    fn write_rgba(&self, out: &mut [f32]) {
        for i in 0..out.len() / 4 {
            put(out, i, self.color);
        }
    }
}
