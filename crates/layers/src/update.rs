//! Typed partial updates.
//!
//! A [`LayerUpdate`] names only the fields to change. Variant fields travel
//! in a [`VariantUpdate`] tagged with the layer type; sending it to a layer
//! of another type is an error. Unknown fields are rejected when
//! deserializing.

use serde::{Deserialize, Serialize};
use sl_colormap::{ColorMap, Palette2D};
use sl_common::{float_serde, BlendMode, Range, Rgba, Threshold};

use crate::error::LayerError;
use crate::layer::{LayerKind, LayerType};
use crate::variants::{FrameBlend, LabelEntry, Parcel, StatType};

/// Partial update of a layer's shared properties and payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LayerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<BlendMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<VariantUpdate>,
}

impl LayerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = Some(blend_mode);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_config(mut self, config: impl Into<VariantUpdate>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Payload changes for one layer type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VariantUpdate {
    Base(BaseUpdate),
    Rgba(RgbaUpdate),
    Data(DataUpdate),
    TwoData(TwoDataUpdate),
    Label(LabelUpdate),
    Curvature(CurvatureUpdate),
    Temporal(TemporalUpdate),
    ParcelValue(ParcelValueUpdate),
    Statistical(StatisticalUpdate),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BaseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RgbaUpdate {
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataUpdate {
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    /// Drop the vertex subset and draw every vertex again.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_indices: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<ColorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TwoDataUpdate {
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_x: Option<Vec<f32>>,
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_y: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette2D>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_x: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_y: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_x: Option<Threshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_y: Option<Threshold>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LabelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<LabelEntry>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CurvatureUpdate {
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub curvature: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothness: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemporalUpdate {
    #[serde(
        default,
        with = "float_serde::opt_nested_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub frames: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<ColorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_blend: Option<FrameBlend>,
    /// Resolve the frame pair from `times`; applied after `frameBlend`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParcelValueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcels: Option<Vec<Parcel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_labels: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<ColorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatisticalUpdate {
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub values: Option<Vec<f32>>,
    #[serde(
        default,
        with = "float_serde::opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub p_values: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_type: Option<StatType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<ColorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
}

macro_rules! impl_into_variant {
    ($($update:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$update> for VariantUpdate {
                fn from(update: $update) -> Self {
                    VariantUpdate::$variant(update)
                }
            }
        )*
    };
}

impl_into_variant! {
    BaseUpdate => Base,
    RgbaUpdate => Rgba,
    DataUpdate => Data,
    TwoDataUpdate => TwoData,
    LabelUpdate => Label,
    CurvatureUpdate => Curvature,
    TemporalUpdate => Temporal,
    ParcelValueUpdate => ParcelValue,
    StatisticalUpdate => Statistical,
}

fn assign<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

/// Replace the colormap, then apply range and threshold on top of it.
fn update_color_map(
    map: &mut ColorMap,
    replacement: &Option<ColorMap>,
    range: Option<Range>,
    threshold: Option<Threshold>,
) -> Result<(), LayerError> {
    assign(map, replacement);
    if let Some(range) = range {
        map.set_range(range)?;
    }
    if let Some(threshold) = threshold {
        map.set_threshold(threshold)?;
    }
    Ok(())
}

impl VariantUpdate {
    pub fn layer_type(&self) -> LayerType {
        match self {
            Self::Base(_) => LayerType::Base,
            Self::Rgba(_) => LayerType::Rgba,
            Self::Data(_) => LayerType::Data,
            Self::TwoData(_) => LayerType::TwoData,
            Self::Label(_) => LayerType::Label,
            Self::Curvature(_) => LayerType::Curvature,
            Self::Temporal(_) => LayerType::Temporal,
            Self::ParcelValue(_) => LayerType::ParcelValue,
            Self::Statistical(_) => LayerType::Statistical,
        }
    }

    /// Write the named fields into `kind`. The caller validates afterwards.
    pub(crate) fn apply(&self, kind: &mut LayerKind) -> Result<(), LayerError> {
        match (kind, self) {
            (LayerKind::Base(l), Self::Base(u)) => {
                assign(&mut l.color, &u.color);
            }
            (LayerKind::Rgba(l), Self::Rgba(u)) => {
                assign(&mut l.data, &u.data);
            }
            (LayerKind::Data(l), Self::Data(u)) => {
                assign(&mut l.data, &u.data);
                if u.clear_indices {
                    l.indices = None;
                }
                if u.indices.is_some() {
                    l.indices = u.indices.clone();
                }
                update_color_map(&mut l.color_map, &u.color_map, u.range, u.threshold)?;
            }
            (LayerKind::TwoData(l), Self::TwoData(u)) => {
                assign(&mut l.data_x, &u.data_x);
                assign(&mut l.data_y, &u.data_y);
                let map = &mut l.color_map;
                if let Some(palette) = u.palette {
                    map.set_palette(palette);
                }
                if u.range_x.is_some() || u.range_y.is_some() {
                    let x = u.range_x.unwrap_or(map.range_x());
                    let y = u.range_y.unwrap_or(map.range_y());
                    map.set_range(x, y)?;
                }
                if u.threshold_x.is_some() || u.threshold_y.is_some() {
                    let x = u.threshold_x.unwrap_or(map.threshold_x());
                    let y = u.threshold_y.unwrap_or(map.threshold_y());
                    map.set_threshold(x, y)?;
                }
            }
            (LayerKind::Label(l), Self::Label(u)) => {
                assign(&mut l.labels, &u.labels);
                assign(&mut l.table, &u.table);
            }
            (LayerKind::Curvature(l), Self::Curvature(u)) => {
                assign(&mut l.curvature, &u.curvature);
                assign(&mut l.brightness, &u.brightness);
                assign(&mut l.contrast, &u.contrast);
                assign(&mut l.smoothness, &u.smoothness);
            }
            (LayerKind::Temporal(l), Self::Temporal(u)) => {
                if u.frames.is_some() || u.times.is_some() {
                    assign(&mut l.frames, &u.frames);
                    assign(&mut l.times, &u.times);
                    l.frame_blend = FrameBlend::default();
                }
                update_color_map(&mut l.color_map, &u.color_map, u.range, u.threshold)?;
                if let Some(blend) = u.frame_blend {
                    l.set_frame_blend(blend.a, blend.b, blend.alpha)?;
                }
                if let Some(t) = u.time {
                    l.set_time(t)?;
                }
            }
            (LayerKind::ParcelValue(l), Self::ParcelValue(u)) => {
                assign(&mut l.parcels, &u.parcels);
                assign(&mut l.vertex_labels, &u.vertex_labels);
                assign(&mut l.value_column, &u.value_column);
                update_color_map(&mut l.color_map, &u.color_map, u.range, u.threshold)?;
            }
            (LayerKind::Statistical(l), Self::Statistical(u)) => {
                assign(&mut l.values, &u.values);
                if u.p_values.is_some() {
                    l.p_values = u.p_values.clone();
                }
                if u.degrees_of_freedom.is_some() {
                    l.degrees_of_freedom = u.degrees_of_freedom;
                }
                assign(&mut l.stat_type, &u.stat_type);
                update_color_map(&mut l.color_map, &u.color_map, u.range, u.threshold)?;
            }
            (kind, update) => {
                return Err(LayerError::UpdateTypeMismatch {
                    expected: kind.layer_type(),
                    got: update.layer_type(),
                });
            }
        }
        Ok(())
    }
}
