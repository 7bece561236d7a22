//! Statistical maps with multiple-comparisons correction.
//!
//! The layer keeps the raw statistic and optional p-values. The active
//! [`CorrectionMethod`] produces a vertex mask that decides what is drawn;
//! without a correction the colormap's hide band decides.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sl_colormap::ColorMap;
use sl_common::float_serde;
use sl_stats::dist;
use sl_stats::{
    bonferroni, cluster_threshold, fdr_bh, ClusterOptions, ClusterResult, CorrectionResult,
    MeshAdjacency, StatsError,
};
use tracing::{debug, warn};

use super::{check_len, check_not_empty, put, VertexSource};
use crate::error::LayerError;

/// Distribution of the per-vertex statistic.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatType {
    #[default]
    #[serde(rename = "tstat")]
    TStat,
    #[serde(rename = "zstat")]
    ZStat,
}

/// Correction applied to decide which vertices are shown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum CorrectionMethod {
    #[default]
    None,
    Bonferroni {
        alpha: f64,
    },
    Fdr {
        q: f64,
    },
    #[serde(rename_all = "camelCase")]
    Cluster {
        threshold: f32,
        min_cluster_size: usize,
        #[serde(default)]
        split_by_sign: bool,
    },
}

impl CorrectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bonferroni { .. } => "bonferroni",
            Self::Fdr { .. } => "fdr",
            Self::Cluster { .. } => "cluster",
        }
    }

    /// Check parameters without touching any data.
    pub fn validate(&self) -> Result<(), LayerError> {
        let level = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(StatsError::InvalidParameter {
                    name,
                    value,
                    reason: "must be in (0, 1]",
                })
            }
        };
        match *self {
            Self::None => Ok(()),
            Self::Bonferroni { alpha } => level("alpha", alpha).map_err(Into::into),
            Self::Fdr { q } => level("q", q).map_err(Into::into),
            Self::Cluster { threshold, .. } => {
                if threshold.is_finite() && threshold >= 0.0 {
                    Ok(())
                } else {
                    Err(StatsError::InvalidParameter {
                        name: "threshold",
                        value: f64::from(threshold),
                        reason: "must be finite and non-negative",
                    }
                    .into())
                }
            }
        }
    }
}

/// Derived state of an active correction.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectionOutcome {
    pub mask: Vec<bool>,
    /// Per-vertex cluster index (`-1` for none). Empty for p-value methods.
    pub cluster_index: Vec<i32>,
    pub cluster_sizes: Vec<usize>,
    /// p-value cutoff for Bonferroni/FDR.
    pub critical_value: Option<f64>,
    pub significant: usize,
}

impl From<CorrectionResult> for CorrectionOutcome {
    fn from(r: CorrectionResult) -> Self {
        Self {
            mask: r.mask,
            cluster_index: Vec::new(),
            cluster_sizes: Vec::new(),
            critical_value: Some(r.critical_value),
            significant: r.significant,
        }
    }
}

impl From<ClusterResult> for CorrectionOutcome {
    fn from(r: ClusterResult) -> Self {
        let significant = r.cluster_sizes.iter().sum();
        Self {
            mask: r.mask,
            cluster_index: r.cluster_index,
            cluster_sizes: r.cluster_sizes,
            critical_value: None,
            significant,
        }
    }
}

/// Short report returned by the `apply_*` operations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionSummary {
    pub significant: usize,
    pub critical_value: Option<f64>,
    pub cluster_count: usize,
}

/// Everything known about one vertex of a statistical map.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexStatInfo {
    pub value: f32,
    pub z_score: f64,
    pub p_value: f64,
    pub cluster_index: Option<usize>,
    pub cluster_size: Option<usize>,
    /// Whether the vertex is shown under the current correction or threshold.
    pub significant: bool,
}

/// Separate colormaps for positive (≥ 0) and negative values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualThreshold {
    pub positive: ColorMap,
    pub negative: ColorMap,
}

/// Statistical map layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StatisticalDef", into = "StatisticalDef")]
pub struct StatisticalLayer {
    pub(crate) values: Vec<f32>,
    pub(crate) p_values: Option<Vec<f32>>,
    pub(crate) degrees_of_freedom: Option<f64>,
    pub(crate) stat_type: StatType,
    pub(crate) color_map: ColorMap,
    pub(crate) dual: Option<DualThreshold>,
    correction: CorrectionMethod,
    adjacency: Option<Arc<MeshAdjacency>>,
    outcome: Option<CorrectionOutcome>,
}

/// Persisted form. Correction results and adjacency are rebuilt on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticalDef {
    #[serde(with = "float_serde::vec")]
    values: Vec<f32>,
    #[serde(
        with = "float_serde::opt_vec",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    p_values: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    degrees_of_freedom: Option<f64>,
    #[serde(default)]
    stat_type: StatType,
    color_map: ColorMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dual_threshold: Option<DualThreshold>,
    #[serde(default)]
    correction: CorrectionMethod,
}

impl TryFrom<StatisticalDef> for StatisticalLayer {
    type Error = LayerError;

    fn try_from(def: StatisticalDef) -> Result<Self, Self::Error> {
        let mut layer = StatisticalLayer {
            values: def.values,
            p_values: def.p_values,
            degrees_of_freedom: def.degrees_of_freedom,
            stat_type: def.stat_type,
            color_map: def.color_map,
            dual: def.dual_threshold,
            correction: def.correction,
            adjacency: None,
            outcome: None,
        };
        layer.validate()?;
        layer.recompute()?;
        Ok(layer)
    }
}

impl From<StatisticalLayer> for StatisticalDef {
    fn from(layer: StatisticalLayer) -> Self {
        Self {
            values: layer.values,
            p_values: layer.p_values,
            degrees_of_freedom: layer.degrees_of_freedom,
            stat_type: layer.stat_type,
            color_map: layer.color_map,
            dual_threshold: layer.dual,
            correction: layer.correction,
        }
    }
}

impl StatisticalLayer {
    pub fn new(values: Vec<f32>, color_map: ColorMap) -> Self {
        Self {
            values,
            p_values: None,
            degrees_of_freedom: None,
            stat_type: StatType::default(),
            color_map,
            dual: None,
            correction: CorrectionMethod::None,
            adjacency: None,
            outcome: None,
        }
    }

    pub fn with_p_values(mut self, p_values: Vec<f32>) -> Self {
        self.p_values = Some(p_values);
        self
    }

    pub fn with_degrees_of_freedom(mut self, dof: f64) -> Self {
        self.degrees_of_freedom = Some(dof);
        self
    }

    pub fn with_stat_type(mut self, stat_type: StatType) -> Self {
        self.stat_type = stat_type;
        self
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn p_values(&self) -> Option<&[f32]> {
        self.p_values.as_deref()
    }

    pub fn degrees_of_freedom(&self) -> Option<f64> {
        self.degrees_of_freedom
    }

    pub fn stat_type(&self) -> StatType {
        self.stat_type
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    pub fn dual_threshold(&self) -> Option<&DualThreshold> {
        self.dual.as_ref()
    }

    pub fn correction(&self) -> &CorrectionMethod {
        &self.correction
    }

    pub fn outcome(&self) -> Option<&CorrectionOutcome> {
        self.outcome.as_ref()
    }

    pub fn adjacency(&self) -> Option<&Arc<MeshAdjacency>> {
        self.adjacency.as_ref()
    }

    /// A cluster correction is selected but cannot run until adjacency
    /// arrives. Nothing is drawn meanwhile.
    pub fn is_correction_pending(&self) -> bool {
        matches!(self.correction, CorrectionMethod::Cluster { .. }) && self.outcome.is_none()
    }

    pub fn apply_bonferroni(&mut self, alpha: f64) -> Result<CorrectionSummary, LayerError> {
        self.commit(CorrectionMethod::Bonferroni { alpha })
    }

    pub fn apply_fdr(&mut self, q: f64) -> Result<CorrectionSummary, LayerError> {
        self.commit(CorrectionMethod::Fdr { q })
    }

    pub fn apply_cluster_threshold(
        &mut self,
        threshold: f32,
        options: ClusterOptions,
    ) -> Result<CorrectionSummary, LayerError> {
        self.commit(CorrectionMethod::Cluster {
            threshold,
            min_cluster_size: options.min_cluster_size,
            split_by_sign: options.split_by_sign,
        })
    }

    pub fn clear_correction(&mut self) {
        self.correction = CorrectionMethod::None;
        self.outcome = None;
    }

    pub fn set_dual_threshold(
        &mut self,
        positive: ColorMap,
        negative: ColorMap,
    ) -> Result<(), LayerError> {
        positive.validate()?;
        negative.validate()?;
        self.dual = Some(DualThreshold { positive, negative });
        Ok(())
    }

    pub fn clear_dual_threshold(&mut self) {
        self.dual = None;
    }

    /// Attach the mesh graph. A pending cluster correction runs now.
    pub fn set_adjacency(&mut self, adjacency: Arc<MeshAdjacency>) -> Result<(), LayerError> {
        if adjacency.vertex_count() != self.values.len() {
            return Err(StatsError::AdjacencyMismatch {
                expected: adjacency.vertex_count(),
                got: self.values.len(),
            }
            .into());
        }
        let previous = self.adjacency.replace(adjacency);
        if matches!(self.correction, CorrectionMethod::Cluster { .. }) {
            match self.evaluate(&self.correction) {
                Ok(outcome) => self.outcome = outcome,
                Err(e) => {
                    self.adjacency = previous;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Counts for the active correction.
    pub fn summary(&self) -> CorrectionSummary {
        self.outcome
            .as_ref()
            .map(|o| CorrectionSummary {
                significant: o.significant,
                critical_value: o.critical_value,
                cluster_count: o.cluster_sizes.len(),
            })
            .unwrap_or_default()
    }

    pub fn vertex_stat_info(&self, vertex: usize) -> Option<VertexStatInfo> {
        let value = *self.values.get(vertex)?;
        let z_score = self.z_score(value);
        let p_value = self
            .p_values
            .as_ref()
            .and_then(|p| p.get(vertex))
            .filter(|p| p.is_finite())
            .map(|&p| f64::from(p))
            .unwrap_or_else(|| self.p_from_statistic(value, z_score));

        let cluster_index = self
            .outcome
            .as_ref()
            .and_then(|o| o.cluster_index.get(vertex))
            .and_then(|&c| usize::try_from(c).ok());
        let cluster_size = cluster_index.and_then(|c| {
            self.outcome
                .as_ref()
                .and_then(|o| o.cluster_sizes.get(c).copied())
        });

        Some(VertexStatInfo {
            value,
            z_score,
            p_value,
            cluster_index,
            cluster_size,
            significant: self.shows(vertex, value),
        })
    }

    fn z_score(&self, value: f32) -> f64 {
        let v = f64::from(value);
        match (self.stat_type, self.degrees_of_freedom) {
            (StatType::TStat, Some(dof)) => dist::t_to_z(v, dof),
            _ => v,
        }
    }

    fn p_from_statistic(&self, value: f32, z_score: f64) -> f64 {
        match (self.stat_type, self.degrees_of_freedom) {
            (StatType::TStat, Some(dof)) => dist::t_two_tailed_p(f64::from(value), dof),
            _ => dist::z_two_tailed_p(z_score),
        }
    }

    fn commit(&mut self, method: CorrectionMethod) -> Result<CorrectionSummary, LayerError> {
        let outcome = self.evaluate(&method)?;
        debug!(
            method = method.name(),
            significant = outcome.as_ref().map_or(0, |o| o.significant),
            "Applied correction"
        );
        self.correction = method;
        self.outcome = outcome;
        Ok(self.summary())
    }

    fn evaluate(&self, method: &CorrectionMethod) -> Result<Option<CorrectionOutcome>, LayerError> {
        method.validate()?;
        match *method {
            CorrectionMethod::None => Ok(None),
            CorrectionMethod::Bonferroni { alpha } => {
                let p = self.p_values.as_deref().ok_or(LayerError::MissingPValues)?;
                Ok(Some(bonferroni(p, alpha)?.into()))
            }
            CorrectionMethod::Fdr { q } => {
                let p = self.p_values.as_deref().ok_or(LayerError::MissingPValues)?;
                Ok(Some(fdr_bh(p, q)?.into()))
            }
            CorrectionMethod::Cluster {
                threshold,
                min_cluster_size,
                split_by_sign,
            } => {
                let adjacency = self.adjacency.as_deref().ok_or(LayerError::MissingAdjacency)?;
                let options = ClusterOptions {
                    min_cluster_size,
                    split_by_sign,
                };
                Ok(Some(
                    cluster_threshold(&self.values, adjacency, threshold, &options)?.into(),
                ))
            }
        }
    }

    /// Re-derive the correction after the statistic or p-values changed.
    ///
    /// A cluster correction without adjacency stays pending instead of
    /// failing.
    pub(crate) fn recompute(&mut self) -> Result<(), LayerError> {
        match self.evaluate(&self.correction) {
            Ok(outcome) => {
                self.outcome = outcome;
                Ok(())
            }
            Err(LayerError::MissingAdjacency) => {
                warn!(
                    vertices = self.values.len(),
                    "Cluster correction pending until mesh adjacency is set"
                );
                self.outcome = None;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn map_for(&self, value: f32) -> &ColorMap {
        match &self.dual {
            Some(dual) if value >= 0.0 => &dual.positive,
            Some(dual) => &dual.negative,
            None => &self.color_map,
        }
    }

    fn shows(&self, vertex: usize, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match &self.outcome {
            Some(outcome) => outcome.mask.get(vertex).copied().unwrap_or(false),
            None if self.is_correction_pending() => false,
            None => !self.map_for(value).hides(value),
        }
    }
}

impl VertexSource for StatisticalLayer {
    fn vertex_count(&self) -> Option<usize> {
        Some(self.values.len())
    }

    fn validate(&self) -> Result<(), LayerError> {
        check_not_empty("values", self.values.len())?;
        self.color_map.validate()?;
        if let Some(dual) = &self.dual {
            dual.positive.validate()?;
            dual.negative.validate()?;
        }
        if let Some(p) = &self.p_values {
            check_len("pValues", self.values.len(), p.len())?;
        }
        if let Some(dof) = self.degrees_of_freedom {
            if !(dof.is_finite() && dof > 0.0) {
                return Err(LayerError::InvalidValue {
                    field: "degreesOfFreedom",
                    reason: format!("{dof} is not a positive number"),
                });
            }
        }
        self.correction.validate()
    }

    fn write_rgba(&self, out: &mut [f32]) {
        for (i, &v) in self.values.iter().enumerate() {
            let mut color = self.map_for(v).color_unmasked(v);
            if !self.shows(i, v) {
                color[3] = 0.0;
            }
            put(out, i, color);
        }
    }
}
