//! `sl-layers` — Layer model for surface compositing.
//!
//! - **Layer**: shared properties (visibility, opacity, blend mode, order,
//!   dirty/revision tracking) around a closed [`LayerKind`] payload
//! - **Variants**: base, RGBA, data, two-data, label, curvature, temporal,
//!   parcel-value and statistical layers, each producing per-vertex RGBA
//! - **Updates**: typed partial updates ([`LayerUpdate`]), validated before
//!   they are applied
//! - **State**: JSON snapshots ([`LayerState`]) with a lossless round trip

pub mod error;
pub mod layer;
pub mod state;
pub mod update;
pub mod variants;

pub use error::LayerError;
pub use layer::{Layer, LayerKind, LayerType, UNDERLAY_ORDER};
pub use state::LayerState;
pub use update::{
    BaseUpdate, CurvatureUpdate, DataUpdate, LabelUpdate, LayerUpdate, ParcelValueUpdate,
    RgbaUpdate, StatisticalUpdate, TemporalUpdate, TwoDataUpdate, VariantUpdate,
};
pub use variants::{
    BaseLayer, CorrectionMethod, CorrectionOutcome, CorrectionSummary, CurvatureLayer, DataLayer,
    DualThreshold, FrameBlend, LabelEntry, LabelLayer, Parcel, ParcelValueLayer, RgbaLayer,
    StatType, StatisticalLayer, TemporalLayer, TwoDataLayer, VertexSource, VertexStatInfo,
};
