use serde::{Deserialize, Serialize};
use sl_colormap::ColorMap;
use sl_common::float_serde;

use super::{check_len, check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Which two frames are mixed and by how much.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameBlend {
    pub a: usize,
    pub b: usize,
    /// Weight of frame `b`, in `[0, 1]`.
    pub alpha: f32,
}

impl FrameBlend {
    pub fn new(a: usize, b: usize, alpha: f32) -> Self {
        Self { a, b, alpha }
    }

    /// Single frame, no mixing.
    pub fn hold(frame: usize) -> Self {
        Self::new(frame, frame, 0.0)
    }
}

/// Time series of scalar fields with the displayed value interpolated
/// between two frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalLayer {
    /// `frames[t][v]`.
    #[serde(with = "float_serde::nested_vec")]
    pub frames: Vec<Vec<f32>>,
    /// Timestamp of each frame, non-decreasing. May be empty when frames are
    /// only addressed by index.
    #[serde(default)]
    pub times: Vec<f64>,
    pub color_map: ColorMap,
    #[serde(default)]
    pub frame_blend: FrameBlend,
}

impl TemporalLayer {
    pub fn new(frames: Vec<Vec<f32>>, times: Vec<f64>, color_map: ColorMap) -> Self {
        Self {
            frames,
            times,
            color_map,
            frame_blend: FrameBlend::default(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Mix frames `a` and `b` with weight `alpha` (clamped to `[0, 1]`).
    pub fn set_frame_blend(&mut self, a: usize, b: usize, alpha: f32) -> Result<(), LayerError> {
        let blend = self.checked_blend(FrameBlend::new(a, b, alpha))?;
        self.frame_blend = blend;
        Ok(())
    }

    /// Resolve the frame pair for time `t` from `times` and apply it.
    ///
    /// Times before the first frame hold the first frame, times after the
    /// last frame hold the last.
    pub fn set_time(&mut self, t: f64) -> Result<FrameBlend, LayerError> {
        let blend = resolve_time(&self.times, t)?;
        self.frame_blend = blend;
        Ok(blend)
    }

    fn checked_blend(&self, blend: FrameBlend) -> Result<FrameBlend, LayerError> {
        let len = self.frames.len();
        for index in [blend.a, blend.b] {
            if index >= len {
                return Err(LayerError::IndexOutOfRange {
                    field: "frameBlend",
                    index,
                    len,
                });
            }
        }
        if blend.alpha.is_nan() {
            return Err(LayerError::InvalidValue {
                field: "frameBlend.alpha",
                reason: "NaN".into(),
            });
        }
        Ok(FrameBlend {
            alpha: blend.alpha.clamp(0.0, 1.0),
            ..blend
        })
    }

    /// Interpolated value at vertex `i` for the current frame blend.
    pub fn current_value(&self, i: usize) -> f32 {
        let FrameBlend { a, b, alpha } = self.frame_blend;
        let va = self.frames.get(a).and_then(|f| f.get(i)).copied();
        let vb = self.frames.get(b).and_then(|f| f.get(i)).copied();
        match (va, vb) {
            (Some(va), Some(vb)) => va + (vb - va) * alpha,
            _ => f32::NAN,
        }
    }
}

/// Find the bracketing frames for `t`. Mirrors keyframe evaluation: clamp
/// outside the timeline, linear weight inside a segment.
fn resolve_time(times: &[f64], t: f64) -> Result<FrameBlend, LayerError> {
    check_not_empty("times", times.len())?;
    if t.is_nan() {
        return Err(LayerError::InvalidValue {
            field: "time",
            reason: "NaN".into(),
        });
    }

    let last = times.len() - 1;
    if last == 0 || t <= times[0] {
        return Ok(FrameBlend::hold(0));
    }
    if t >= times[last] {
        return Ok(FrameBlend::hold(last));
    }

    // First frame strictly after t; the one before is at or before t.
    let b = times.partition_point(|&x| x <= t);
    let a = b - 1;
    let dt = times[b] - times[a];
    if dt <= 0.0 {
        return Ok(FrameBlend::hold(a));
    }
    Ok(FrameBlend::new(a, b, ((t - times[a]) / dt) as f32))
}

impl VertexSource for TemporalLayer {
    fn vertex_count(&self) -> Option<usize> {
        self.frames.first().map(Vec::len)
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("frames", self.frames.len())?;
        let v = self.frames[0].len();
        check_not_empty("frames[0]", v)?;
        self.color_map.validate()?;
        for frame in &self.frames[1..] {
            check_len("frames", v, frame.len())?;
        }
        if !self.times.is_empty() {
            check_len("times", self.frames.len(), self.times.len())?;
            if self.times.iter().any(|t| !t.is_finite()) {
                return Err(LayerError::InvalidValue {
                    field: "times",
                    reason: "non-finite timestamp".into(),
                });
            }
            if self.times.windows(2).any(|w| w[1] < w[0]) {
                return Err(LayerError::InvalidValue {
                    field: "times",
                    reason: "timestamps must be non-decreasing".into(),
                });
            }
        }
        self.checked_blend(self.frame_blend).map(|_| ())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        let v = self.vertex_count().unwrap_or(0);
        for i in 0..v {
            put(out, i, self.color_map.get_color(self.current_value(i)));
        }
    }
}
