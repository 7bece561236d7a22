//! Persisted layer snapshot.
//!
//! JSON shape: `{id, type, visible, opacity, blendMode, order, ...variant
//! fields}` in camelCase. Non-finite floats in per-vertex arrays are written
//! as `null` and read back as NaN.

use serde::{Deserialize, Serialize};
use sl_common::{BlendMode, LayerId};

use crate::layer::LayerKind;

/// Serializable snapshot produced by [`Layer::to_state`](crate::Layer::to_state).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerState {
    pub id: LayerId,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub order: i32,
    #[serde(flatten)]
    pub kind: LayerKind,
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}
