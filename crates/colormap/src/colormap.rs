//! Scalar → RGBA mapping with range normalization and hide-band thresholding.

use serde::{Deserialize, Serialize};
use sl_common::color::lerp_rgba;
use sl_common::{Range, Rgba, Threshold};

use crate::error::ColorMapError;
use crate::presets::ColorMapRegistry;

/// A single colormap stop at `position ∈ [0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f32,
    pub color: Rgba,
}

impl ColorStop {
    pub fn new(position: f32, color: Rgba) -> Self {
        Self { position, color }
    }
}

/// Replacement for the alpha stored in the stop table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlphaOverride {
    /// One alpha for every stop.
    Scalar(f32),
    /// One alpha per stop, interpolated together with the colors.
    PerStop(Vec<f32>),
}

/// Piecewise-linear colormap.
///
/// `get_color` normalizes a value against [`Range`], interpolates the stop
/// table, and then zeroes alpha for values inside the [`Threshold`] band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorMapDef", into = "ColorMapDef")]
pub struct ColorMap {
    name: Option<String>,
    stops: Vec<ColorStop>,
    range: Range,
    threshold: Threshold,
    alpha: Option<AlphaOverride>,
}

/// Serialized form of [`ColorMap`]; validated on the way in.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorMapDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    stops: Vec<ColorStop>,
    #[serde(default)]
    range: Range,
    #[serde(default)]
    threshold: Threshold,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alpha: Option<AlphaOverride>,
}

impl TryFrom<ColorMapDef> for ColorMap {
    type Error = ColorMapError;

    fn try_from(def: ColorMapDef) -> Result<Self, Self::Error> {
        let mut map = ColorMap::new(def.stops)?;
        map.name = def.name;
        map.set_range(def.range)?;
        map.set_threshold(def.threshold)?;
        map.set_alpha(def.alpha)?;
        Ok(map)
    }
}

impl From<ColorMap> for ColorMapDef {
    fn from(map: ColorMap) -> Self {
        Self {
            name: map.name,
            stops: map.stops,
            range: map.range,
            threshold: map.threshold,
            alpha: map.alpha,
        }
    }
}

impl ColorMap {
    /// Build a colormap from stops. Stops are sorted by position and clamped
    /// into `[0, 1]`.
    pub fn new(mut stops: Vec<ColorStop>) -> Result<Self, ColorMapError> {
        if stops.is_empty() {
            return Err(ColorMapError::EmptyStops);
        }
        for (index, stop) in stops.iter_mut().enumerate() {
            if !stop.position.is_finite() {
                return Err(ColorMapError::InvalidStop {
                    index,
                    reason: format!("position {} is not finite", stop.position),
                });
            }
            if stop.color.iter().any(|c| !c.is_finite()) {
                return Err(ColorMapError::InvalidStop {
                    index,
                    reason: "color has a non-finite component".into(),
                });
            }
            stop.position = stop.position.clamp(0.0, 1.0);
        }
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));

        Ok(Self {
            name: None,
            stops,
            range: Range::UNIT,
            threshold: Threshold::NONE,
            alpha: None,
        })
    }

    /// Build a colormap from a registry preset.
    pub fn from_preset(registry: &ColorMapRegistry, name: &str) -> Result<Self, ColorMapError> {
        let stops = registry
            .get(name)
            .ok_or_else(|| ColorMapError::UnknownPreset {
                name: name.to_string(),
            })?;
        let mut map = Self::new(stops.to_vec())?;
        map.name = Some(name.to_string());
        Ok(map)
    }

    /// Builder-style range setter.
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    /// Builder-style threshold setter.
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn alpha(&self) -> Option<&AlphaOverride> {
        self.alpha.as_ref()
    }

    pub fn set_range(&mut self, range: Range) -> Result<(), ColorMapError> {
        check_range("range", range)?;
        self.range = range;
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: Threshold) -> Result<(), ColorMapError> {
        check_threshold("threshold", threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    /// Set or clear the alpha override. Values must lie in `[0, 1]` and a
    /// per-stop array must match the stop count.
    pub fn set_alpha(&mut self, alpha: Option<AlphaOverride>) -> Result<(), ColorMapError> {
        check_alpha_override(alpha.as_ref(), self.stops.len())?;
        self.alpha = alpha;
        Ok(())
    }

    /// Re-check range, threshold and alpha. The builder setters do not
    /// validate, so layers call this before accepting a colormap.
    pub fn validate(&self) -> Result<(), ColorMapError> {
        check_range("range", self.range)?;
        check_threshold("threshold", self.threshold)?;
        check_alpha_override(self.alpha.as_ref(), self.stops.len())
    }

    /// Map `v` to a color, applying the hide band.
    ///
    /// Values inside the threshold band, and non-finite values, keep their
    /// interpolated RGB but get alpha 0.
    #[inline]
    pub fn get_color(&self, v: f32) -> Rgba {
        let mut c = self.color_unmasked(v);
        if !v.is_finite() || self.threshold.hides(v) {
            c[3] = 0.0;
        }
        c
    }

    /// Map `v` to a color ignoring the hide band.
    #[inline]
    pub fn color_unmasked(&self, v: f32) -> Rgba {
        let t = if v.is_finite() {
            self.range.normalize(v)
        } else {
            0.0
        };
        self.sample(t)
    }

    /// Whether `v` is suppressed by the hide band.
    pub fn hides(&self, v: f32) -> bool {
        self.threshold.hides(v)
    }

    /// Sample the stop table at normalized position `t ∈ [0, 1]`.
    pub fn sample(&self, t: f32) -> Rgba {
        let last = self.stops.len() - 1;
        let (i, j, frac) = if t <= self.stops[0].position {
            (0, 0, 0.0)
        } else if t >= self.stops[last].position {
            (last, last, 0.0)
        } else {
            // First stop strictly after t; the previous one is at or before t.
            let j = self.stops.partition_point(|s| s.position <= t);
            let i = j - 1;
            let span = self.stops[j].position - self.stops[i].position;
            (i, j, (t - self.stops[i].position) / span)
        };

        let mut c = lerp_rgba(self.stops[i].color, self.stops[j].color, frac);
        match &self.alpha {
            None => {}
            Some(AlphaOverride::Scalar(a)) => c[3] = *a,
            Some(AlphaOverride::PerStop(alphas)) => {
                c[3] = alphas[i] + (alphas[j] - alphas[i]) * frac;
            }
        }
        c
    }

    /// Finite min/max of `data`, or `None` when nothing is finite.
    pub fn auto_range(data: &[f32]) -> Option<Range> {
        let mut iter = data.iter().copied().filter(|v| v.is_finite());
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Range::new(min, max))
    }
}

fn check_alpha_override(alpha: Option<&AlphaOverride>, stops: usize) -> Result<(), ColorMapError> {
    match alpha {
        None => Ok(()),
        Some(AlphaOverride::Scalar(a)) => check_alpha(None, *a),
        Some(AlphaOverride::PerStop(values)) => {
            if values.len() != stops {
                return Err(ColorMapError::AlphaLengthMismatch {
                    expected: stops,
                    got: values.len(),
                });
            }
            values
                .iter()
                .enumerate()
                .try_for_each(|(index, &a)| check_alpha(Some(index), a))
        }
    }
}

pub(crate) fn check_range(field: &'static str, range: Range) -> Result<(), ColorMapError> {
    if range.is_finite() {
        return Ok(());
    }
    let value = if range.min.is_finite() { range.max } else { range.min };
    Err(ColorMapError::NonFiniteBound { field, value })
}

pub(crate) fn check_threshold(
    field: &'static str,
    threshold: Threshold,
) -> Result<(), ColorMapError> {
    if threshold.is_finite() {
        return Ok(());
    }
    let value = if threshold.low.is_finite() {
        threshold.high
    } else {
        threshold.low
    };
    Err(ColorMapError::NonFiniteBound { field, value })
}

fn check_alpha(index: Option<usize>, a: f32) -> Result<(), ColorMapError> {
    if (0.0..=1.0).contains(&a) {
        return Ok(());
    }
    let reason = match index {
        Some(i) => format!("stop {i} alpha {a} is outside [0, 1]"),
        None => format!("alpha {a} is outside [0, 1]"),
    };
    Err(ColorMapError::InvalidAlpha { reason })
}
