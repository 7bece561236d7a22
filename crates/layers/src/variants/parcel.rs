use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sl_colormap::ColorMap;

use super::{check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Column names every parcel carries.
pub const VALUE_COLUMN: &str = "value";
pub const CONFIDENCE_COLUMN: &str = "confidence";

/// One region of a parcellation and its scalar columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Additional named columns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f32>,
}

impl Parcel {
    pub fn new(id: u32, name: impl Into<String>, value: f32) -> Self {
        Self {
            id,
            name: name.into(),
            value: Some(value),
            confidence: None,
            extra: BTreeMap::new(),
        }
    }

    /// Read a column by name.
    pub fn column(&self, column: &str) -> Option<f32> {
        match column {
            VALUE_COLUMN => self.value,
            CONFIDENCE_COLUMN => self.confidence,
            other => self.extra.get(other).copied(),
        }
    }
}

/// One scalar per parcel, broadcast to the parcel's vertices and mapped
/// through a [`ColorMap`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelValueLayer {
    pub parcels: Vec<Parcel>,
    /// Parcel id of each vertex.
    pub vertex_labels: Vec<u32>,
    #[serde(default = "default_column")]
    pub value_column: String,
    pub color_map: ColorMap,
}

fn default_column() -> String {
    VALUE_COLUMN.to_string()
}

impl ParcelValueLayer {
    pub fn new(parcels: Vec<Parcel>, vertex_labels: Vec<u32>, color_map: ColorMap) -> Self {
        Self {
            parcels,
            vertex_labels,
            value_column: default_column(),
            color_map,
        }
    }

    /// Finite values of the selected column, keyed by parcel id.
    pub fn column_values(&self) -> HashMap<u32, f32> {
        self.parcels
            .iter()
            .filter_map(|p| {
                p.column(&self.value_column)
                    .filter(|v| v.is_finite())
                    .map(|v| (p.id, v))
            })
            .collect()
    }
}

impl VertexSource for ParcelValueLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.vertex_labels.len())
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("vertexLabels", self.vertex_labels.len())?;
        self.color_map.validate()?;

        let mut ids = HashSet::with_capacity(self.parcels.len());
        for parcel in &self.parcels {
            if !ids.insert(parcel.id) {
                return Err(LayerError::InvalidValue {
                    field: "parcels",
                    reason: format!("parcel {} listed twice", parcel.id),
                });
            }
            let stored = [parcel.value, parcel.confidence]
                .into_iter()
                .flatten()
                .chain(parcel.extra.values().copied());
            for v in stored {
                if !v.is_finite() {
                    return Err(LayerError::InvalidValue {
                        field: "parcels",
                        reason: format!("parcel {} has a non-finite column value", parcel.id),
                    });
                }
            }
        }

        let known = matches!(self.value_column.as_str(), VALUE_COLUMN | CONFIDENCE_COLUMN)
            || self
                .parcels
                .iter()
                .any(|p| p.extra.contains_key(&self.value_column));
        if !known {
            return Err(LayerError::InvalidValue {
                field: "valueColumn",
                reason: format!("no parcel has a '{}' column", self.value_column),
            });
        }
        Ok(())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        let values = self.column_values();
        for (i, label) in self.vertex_labels.iter().enumerate() {
            if let Some(&v) = values.get(label) {
                put(out, i, self.color_map.get_color(v));
            }
        }
    }
}
