use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sl_common::Rgba;

use super::{check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// One row of a label color table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelEntry {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub color: Rgba,
}

impl LabelEntry {
    pub fn new(id: u32, name: impl Into<String>, color: Rgba) -> Self {
        Self {
            id,
            name: name.into(),
            color,
        }
    }
}

/// Categorical labels colored by table lookup. No interpolation.
///
/// Labels missing from the table are transparent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelLayer {
    pub labels: Vec<u32>,
    pub table: Vec<LabelEntry>,
}

impl LabelLayer {
    pub fn new(labels: Vec<u32>, table: Vec<LabelEntry>) -> Self {
        Self { labels, table }
    }

    /// Table entry for a label id.
    pub fn entry(&self, id: u32) -> Option<&LabelEntry> {
        self.table.iter().find(|e| e.id == id)
    }
}

impl VertexSource for LabelLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.labels.len())
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("labels", self.labels.len())?;
        let mut seen = HashSet::with_capacity(self.table.len());
        for entry in &self.table {
            if !seen.insert(entry.id) {
                return Err(LayerError::InvalidValue {
                    field: "table",
                    reason: format!("label {} listed twice", entry.id),
                });
            }
            if entry.color.iter().any(|c| !c.is_finite()) {
                return Err(LayerError::InvalidValue {
                    field: "table",
                    reason: format!("label {} has a non-finite color", entry.id),
                });
            }
        }
        Ok(())
    }

    fn write_rgba(&self, out: &mut [f32]) {
        let lookup: HashMap<u32, Rgba> = self.table.iter().map(|e| (e.id, e.color)).collect();
        for (i, label) in self.labels.iter().enumerate() {
            if let Some(&color) = lookup.get(label) {
                put(out, i, color);
            }
        }
    }
}
