use serde::{Deserialize, Serialize};
use sl_common::{float_serde, RANGE_EPSILON};

use super::{check_finite, check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Grayscale shading from surface curvature, drawn as an underlay.
///
/// `gray = clamp(curv / smoothness, -0.5, 0.5) * contrast + brightness`,
/// clamped to `[0, 1]`, alpha 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvatureLayer {
    #[serde(with = "float_serde::vec")]
    pub curvature: Vec<f32>,
    #[serde(default = "default_brightness")]
    pub brightness: f32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
    #[serde(default = "default_smoothness")]
    pub smoothness: f32,
}

fn default_brightness() -> f32 {
    0.5
}

fn default_contrast() -> f32 {
    0.5
}

fn default_smoothness() -> f32 {
    1.0
}

impl CurvatureLayer {
    pub fn new(curvature: Vec<f32>) -> Self {
        Self {
            curvature,
            brightness: default_brightness(),
            contrast: default_contrast(),
            smoothness: default_smoothness(),
        }
    }

    /// Gray level for one curvature sample. Non-positive smoothness acts as
    /// the smallest positive smoothness.
    pub fn gray(&self, curv: f32) -> f32 {
        let smoothness = self.smoothness.max(RANGE_EPSILON);
        let g = (curv / smoothness).clamp(-0.5, 0.5) * self.contrast + self.brightness;
        g.clamp(0.0, 1.0)
    }
}

impl VertexSource for CurvatureLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.curvature.len())
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("curvature", self.curvature.len())?;
        check_finite("brightness", self.brightness)?;
        check_finite("contrast", self.contrast)?;
        check_finite("smoothness", self.smoothness)
    }

    fn write_rgba(&self, out: &mut [f32]) {
        for (i, &c) in self.curvature.iter().enumerate() {
            if c.is_finite() {
                let g = self.gray(c);
                put(out, i, [g, g, g, 1.0]);
            }
        }
    }
}
