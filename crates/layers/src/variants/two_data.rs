use serde::{Deserialize, Serialize};
use sl_colormap::ColorMap2D;
use sl_common::float_serde;

use super::{check_len, check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Two scalar fields mapped jointly through a 2D palette.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoDataLayer {
    #[serde(with = "float_serde::vec")]
    pub data_x: Vec<f32>,
    #[serde(with = "float_serde::vec")]
    pub data_y: Vec<f32>,
    pub color_map: ColorMap2D,
}

impl TwoDataLayer {
    pub fn new(data_x: Vec<f32>, data_y: Vec<f32>, color_map: ColorMap2D) -> Self {
        Self {
            data_x,
            data_y,
            color_map,
        }
    }
}

impl VertexSource for TwoDataLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.data_x.len())
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("dataX", self.data_x.len())?;
        check_len("dataY", self.data_x.len(), self.data_y.len())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        for (i, (&x, &y)) in self.data_x.iter().zip(&self.data_y).enumerate() {
            put(out, i, self.color_map.get_color(x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_colormap::Palette2D;
    use sl_common::{Range, Threshold};

    #[test]
    fn hidden_on_either_axis() {
        let mut map = ColorMap2D::new(Palette2D::Confidence);
        map.set_range(Range::new(0.0, 1.0), Range::new(0.0, 1.0)).unwrap();
        map.set_threshold(Threshold::new(0.0, 0.2), Threshold::NONE).unwrap();
        let layer = TwoDataLayer::new(vec![0.1, 0.9], vec![0.9, 0.9], map);
        let mut out = vec![0.0; 8];
        layer.write_rgba(&mut out);
        assert_eq!(out[3], 0.0);
        assert!(out[7] > 0.0);
    }

    #[test]
    fn mismatched_axes_rejected() {
        let layer = TwoDataLayer::new(vec![0.0; 3], vec![0.0; 2], ColorMap2D::new(Palette2D::HotCold));
        assert_eq!(
            layer.validate(),
            Err(LayerError::VertexCountMismatch {
                field: "dataY",
                expected: 3,
                got: 2
            })
        );
    }
}
