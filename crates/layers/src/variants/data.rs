use serde::{Deserialize, Serialize};
use sl_colormap::ColorMap;
use sl_common::float_serde;

use super::{check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Scalar field mapped through a [`ColorMap`].
///
/// With `indices` set, only the listed vertices are drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLayer {
    #[serde(with = "float_serde::vec")]
    pub data: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    pub color_map: ColorMap,
}

impl DataLayer {
    pub fn new(data: Vec<f32>, color_map: ColorMap) -> Self {
        Self {
            data,
            indices: None,
            color_map,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }
}

impl VertexSource for DataLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.data.len())
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("data", self.data.len())?;
        self.color_map.validate()?;
        if let Some(indices) = &self.indices {
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= self.data.len()) {
                return Err(LayerError::IndexOutOfRange {
                    field: "indices",
                    index: bad as usize,
                    len: self.data.len(),
                });
            }
        }
        Ok(())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        match &self.indices {
            Some(indices) => {
                for &i in indices {
                    let i = i as usize;
                    if let Some(&v) = self.data.get(i) {
                        put(out, i, self.color_map.get_color(v));
                    }
                }
            }
            None => {
                for (i, &v) in self.data.iter().enumerate() {
                    put(out, i, self.color_map.get_color(v));
                }
            }
        }
    }
}
