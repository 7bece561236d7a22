//! The layer contract: shared properties plus one variant payload.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sl_common::{BlendMode, LayerId};
use sl_stats::MeshAdjacency;

use crate::error::LayerError;
use crate::state::LayerState;
use crate::update::LayerUpdate;
use crate::variants::{
    BaseLayer, CurvatureLayer, DataLayer, FrameBlend, LabelLayer, ParcelValueLayer, RgbaLayer,
    StatisticalLayer, TemporalLayer, TwoDataLayer, VertexSource,
};

/// Default `order` of curvature layers, so they sit just above the base.
pub const UNDERLAY_ORDER: i32 = -1000;

/// Discriminant of [`LayerKind`], used in errors and the persisted `type` tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerType {
    Base,
    Rgba,
    Data,
    TwoData,
    Label,
    Curvature,
    Temporal,
    ParcelValue,
    Statistical,
}

impl LayerType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Rgba => "rgba",
            Self::Data => "data",
            Self::TwoData => "twoData",
            Self::Label => "label",
            Self::Curvature => "curvature",
            Self::Temporal => "temporal",
            Self::ParcelValue => "parcelValue",
            Self::Statistical => "statistical",
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Variant payload of a layer. Closed set; matches are exhaustive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerKind {
    Base(BaseLayer),
    Rgba(RgbaLayer),
    Data(DataLayer),
    TwoData(TwoDataLayer),
    Label(LabelLayer),
    Curvature(CurvatureLayer),
    Temporal(TemporalLayer),
    ParcelValue(ParcelValueLayer),
    Statistical(StatisticalLayer),
}

macro_rules! each_variant {
    ($kind:expr, $inner:ident => $body:expr) => {
        match $kind {
            LayerKind::Base($inner) => $body,
            LayerKind::Rgba($inner) => $body,
            LayerKind::Data($inner) => $body,
            LayerKind::TwoData($inner) => $body,
            LayerKind::Label($inner) => $body,
            LayerKind::Curvature($inner) => $body,
            LayerKind::Temporal($inner) => $body,
            LayerKind::ParcelValue($inner) => $body,
            LayerKind::Statistical($inner) => $body,
        }
    };
}

impl LayerKind {
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

    /// Re-derive cached state after the payload changed.
    pub(crate) fn refresh(&mut self) -> Result<(), LayerError> {
        match self {
            Self::Statistical(s) => s.recompute(),
            _ => Ok(()),
        }
    }
}

impl VertexSource for LayerKind {
    fn vertex_count(&self) -> Option<usize> {
        each_variant!(self, v => v.vertex_count())
    }

    fn validate(&self) -> Result<(), LayerError> {
        each_variant!(self, v => v.validate())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        each_variant!(self, v => v.write_rgba(out))
    }
}

/// One named layer in a stack.
///
/// Property setters (visibility, opacity, blend mode, order) mark the layer
/// dirty. Payload changes also bump `revision`, which tracks whether the
/// layer's RGBA buffer needs regenerating or re-uploading.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    id: LayerId,
    visible: bool,
    opacity: f32,
    blend_mode: BlendMode,
    order: i32,
    dirty: bool,
    revision: u64,
    kind: LayerKind,
}

impl Layer {
    /// Create a visible, opaque, normal-blended layer. Curvature layers start
    /// at [`UNDERLAY_ORDER`], everything else at 0.
    pub fn new(id: impl Into<LayerId>, kind: LayerKind) -> Result<Self, LayerError> {
        kind.validate()?;
        let order = match kind {
            LayerKind::Curvature(_) => UNDERLAY_ORDER,
            _ => 0,
        };
        Ok(Self {
            id: id.into(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::default(),
            order,
            dirty: true,
            revision: 0,
            kind,
        })
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    pub fn is_base(&self) -> bool {
        matches!(self.kind, LayerKind::Base(_))
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.dirty = true;
    }

    /// Set opacity, clamped to `[0, 1]`. NaN becomes 0.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        self.dirty = true;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
        self.dirty = true;
    }

    pub fn set_order(&mut self, order: i32) {
        self.order = order;
        self.dirty = true;
    }

    /// Clear the dirty flag once the owner has consumed the change.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    /// Vertices the payload carries data for, `None` for uniform fills.
    pub fn vertex_count(&self) -> Option<usize> {
        self.kind.vertex_count()
    }

    /// Per-vertex RGBA (`4 * vertex_count` floats). Opacity and blend mode
    /// are not applied here.
    pub fn rgba_data(&self, vertex_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; vertex_count * 4];
        self.kind.write_rgba(&mut out);
        out
    }

    /// The layer as it would be after `update`. `self` is untouched, so a
    /// failed update leaves no trace.
    pub fn with_update(&self, update: &LayerUpdate) -> Result<Layer, LayerError> {
        let mut next = self.clone();
        if let Some(opacity) = update.opacity {
            if !opacity.is_finite() {
                return Err(LayerError::InvalidValue {
                    field: "opacity",
                    reason: format!("{opacity} is not finite"),
                });
            }
            next.set_opacity(opacity);
        }
        if let Some(visible) = update.visible {
            next.visible = visible;
        }
        if let Some(blend_mode) = update.blend_mode {
            next.blend_mode = blend_mode;
        }
        if let Some(order) = update.order {
            next.order = order;
        }
        if let Some(config) = &update.config {
            config.apply(&mut next.kind)?;
            next.kind.validate()?;
            next.kind.refresh()?;
            next.revision += 1;
        }
        next.dirty = true;
        Ok(next)
    }

    /// Apply a typed partial update atomically.
    pub fn apply_update(&mut self, update: &LayerUpdate) -> Result<(), LayerError> {
        *self = self.with_update(update)?;
        Ok(())
    }

    pub fn statistical(&self) -> Option<&StatisticalLayer> {
        match &self.kind {
            LayerKind::Statistical(s) => Some(s),
            _ => None,
        }
    }

    /// Run a statistical operation. The layer is marked changed only when
    /// `op` succeeds.
    pub fn modify_statistical<R>(
        &mut self,
        op: impl FnOnce(&mut StatisticalLayer) -> Result<R, LayerError>,
    ) -> Result<R, LayerError> {
        let layer_type = self.kind.layer_type();
        let LayerKind::Statistical(stat) = &mut self.kind else {
            return Err(LayerError::NotStatistical {
                id: self.id.to_string(),
                layer_type,
            });
        };
        let result = op(stat)?;
        self.touch();
        Ok(result)
    }

    /// Hand the mesh graph to a statistical layer. Returns whether the layer
    /// took it; other variants ignore adjacency.
    pub fn set_adjacency(&mut self, adjacency: &Arc<MeshAdjacency>) -> Result<bool, LayerError> {
        if let LayerKind::Statistical(stat) = &mut self.kind {
            stat.set_adjacency(Arc::clone(adjacency))?;
            self.touch();
            return Ok(true);
        }
        Ok(false)
    }

    fn temporal_mut(&mut self) -> Result<&mut TemporalLayer, LayerError> {
        match &mut self.kind {
            LayerKind::Temporal(t) => Ok(t),
            other => Err(LayerError::UpdateTypeMismatch {
                expected: other.layer_type(),
                got: LayerType::Temporal,
            }),
        }
    }

    /// Select the displayed frame pair of a temporal layer directly.
    pub fn set_frame_blend(&mut self, a: usize, b: usize, alpha: f32) -> Result<(), LayerError> {
        self.temporal_mut()?.set_frame_blend(a, b, alpha)?;
        self.touch();
        Ok(())
    }

    /// Move a temporal layer to time `t`.
    pub fn set_time(&mut self, t: f64) -> Result<FrameBlend, LayerError> {
        let blend = self.temporal_mut()?.set_time(t)?;
        self.touch();
        Ok(blend)
    }

    /// Snapshot for persistence.
    pub fn to_state(&self) -> LayerState {
        LayerState {
            id: self.id.clone(),
            visible: self.visible,
            opacity: self.opacity,
            blend_mode: self.blend_mode,
            order: self.order,
            kind: self.kind.clone(),
        }
    }

    /// Rebuild a layer from a snapshot, validating everything.
    pub fn from_state(state: LayerState) -> Result<Self, LayerError> {
        if !state.opacity.is_finite() {
            return Err(LayerError::InvalidValue {
                field: "opacity",
                reason: format!("{} is not finite", state.opacity),
            });
        }
        let mut layer = Self::new(state.id, state.kind)?
            .with_opacity(state.opacity)
            .with_blend_mode(state.blend_mode)
            .with_order(state.order)
            .with_visible(state.visible);
        layer.kind.refresh()?;
        Ok(layer)
    }
}
