//! Layer stack — ordering, per-layer RGBA cache, and the host composite.
//!
//! Layers are kept in a map keyed by id. Composite order is derived on
//! demand: Base layers first, then ascending `order`, ties broken by the
//! sequence in which layers were added. Every mutation sets
//! `needs_composite`; [`LayerStack::composite`] recomputes at most once per
//! batch of mutations and otherwise returns the cached buffer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sl_colormap::ColorMap;
use sl_common::{BlendMode, LayerId, StackConfig};
use sl_layers::{
    CorrectionSummary, FrameBlend, Layer, LayerError, LayerUpdate, StatisticalLayer,
    VertexStatInfo,
};
use sl_stats::{ClusterOptions, MeshAdjacency, StatsError};
use tracing::debug;

use crate::CompositorError;

/// Counters describing how much work the stack has done.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Full composite recomputations.
    pub composites: u64,
    /// Layer RGBA buffers regenerated.
    pub layer_refreshes: u64,
}

/// Identity of a layer's RGBA content: which insertion, which revision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayerVersion {
    pub seq: u64,
    pub revision: u64,
}

struct Entry {
    layer: Layer,
    seq: u64,
    rgba: Vec<f32>,
    cached_revision: Option<u64>,
}

impl Entry {
    fn sort_key(&self) -> (u8, i32, u64) {
        (u8::from(!self.layer.is_base()), self.layer.order(), self.seq)
    }

    /// Regenerate the RGBA cache if the layer changed since the last fill.
    /// Returns whether a refresh happened.
    fn refresh(&mut self, vertex_count: usize) -> bool {
        let revision = self.layer.revision();
        if self.cached_revision == Some(revision) {
            return false;
        }
        self.rgba = self.layer.rgba_data(vertex_count);
        self.cached_revision = Some(revision);
        true
    }
}

/// Ordered collection of layers for one surface plus the cached composite.
pub struct LayerStack {
    vertex_count: usize,
    entries: HashMap<LayerId, Entry>,
    next_seq: u64,
    adjacency: Option<Arc<MeshAdjacency>>,
    needs_composite: bool,
    generation: u64,
    composite: Vec<f32>,
    stats: CompositeStats,
}

impl LayerStack {
    /// Empty stack for a surface with `vertex_count` vertices.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            entries: HashMap::new(),
            next_seq: 0,
            adjacency: None,
            needs_composite: true,
            generation: 0,
            composite: vec![0.0; vertex_count * 4],
            stats: CompositeStats::default(),
        }
    }

    pub fn from_config(config: &StackConfig) -> Self {
        Self::new(config.vertex_count)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.entries.get(id).map(|e| &e.layer)
    }

    pub fn layer_version(&self, id: &LayerId) -> Option<LayerVersion> {
        self.entries.get(id).map(|e| LayerVersion {
            seq: e.seq,
            revision: e.layer.revision(),
        })
    }

    pub fn needs_composite(&self) -> bool {
        self.needs_composite
    }

    /// Incremented on every mutation. Consumers that mirror the stack
    /// elsewhere compare it against the generation they last synced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> CompositeStats {
        self.stats
    }

    pub fn adjacency(&self) -> Option<&Arc<MeshAdjacency>> {
        self.adjacency.as_ref()
    }

    fn invalidate(&mut self) {
        self.needs_composite = true;
        self.generation += 1;
    }

    /// Force the next composite to recompute even without a mutation.
    pub fn mark_needs_composite(&mut self) {
        self.invalidate();
    }

    fn check_vertex_count(&self, layer: &Layer) -> Result<(), CompositorError> {
        match layer.vertex_count() {
            Some(got) if got != self.vertex_count => Err(CompositorError::VertexCountMismatch {
                id: layer.id().clone(),
                expected: self.vertex_count,
                got,
            }),
            _ => Ok(()),
        }
    }

    fn entry_mut(&mut self, id: &LayerId) -> Result<&mut Entry, CompositorError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| CompositorError::UnknownLayer(id.clone()))
    }

    /// Add a layer. Its vertex count must match the surface, and its id must
    /// be new. Statistical layers receive the stack's adjacency, if any.
    pub fn add_layer(&mut self, mut layer: Layer) -> Result<(), CompositorError> {
        if self.entries.contains_key(layer.id()) {
            return Err(CompositorError::DuplicateLayer(layer.id().clone()));
        }
        self.check_vertex_count(&layer)?;
        if let Some(adjacency) = &self.adjacency {
            layer.set_adjacency(adjacency)?;
        }

        debug!(
            id = %layer.id(),
            layer_type = %layer.layer_type(),
            order = layer.order(),
            "Adding layer"
        );

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            layer.id().clone(),
            Entry {
                layer,
                seq,
                rgba: Vec::new(),
                cached_revision: None,
            },
        );
        self.invalidate();
        Ok(())
    }

    /// Remove a layer and return it.
    pub fn remove_layer(&mut self, id: &LayerId) -> Result<Layer, CompositorError> {
        let entry = self
            .entries
            .remove(id)
            .ok_or_else(|| CompositorError::UnknownLayer(id.clone()))?;
        debug!(id = %id, "Removed layer");
        self.invalidate();
        Ok(entry.layer)
    }

    /// Apply a typed partial update. The layer is replaced only if the whole
    /// update validates.
    pub fn update_layer(
        &mut self,
        id: &LayerId,
        update: &LayerUpdate,
    ) -> Result<(), CompositorError> {
        let vertex_count = self.vertex_count;
        let entry = self.entry_mut(id)?;
        let next = entry.layer.with_update(update)?;
        if let Some(got) = next.vertex_count() {
            if got != vertex_count {
                return Err(CompositorError::VertexCountMismatch {
                    id: id.clone(),
                    expected: vertex_count,
                    got,
                });
            }
        }
        entry.layer = next;
        self.invalidate();
        Ok(())
    }

    /// Assign `order = position` to each listed layer. Layers not listed
    /// keep their order. Unknown or repeated ids fail the whole call.
    pub fn set_layer_order(&mut self, ids: &[LayerId]) -> Result<(), CompositorError> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !self.entries.contains_key(id) {
                return Err(CompositorError::UnknownLayer(id.clone()));
            }
            if !seen.insert(id) {
                return Err(CompositorError::DuplicateInOrder(id.clone()));
            }
        }
        for (position, id) in ids.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.layer.set_order(position as i32);
            }
        }
        self.invalidate();
        Ok(())
    }

    pub fn set_visibility(&mut self, id: &LayerId, visible: bool) -> Result<(), CompositorError> {
        self.entry_mut(id)?.layer.set_visible(visible);
        self.invalidate();
        Ok(())
    }

    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<(), CompositorError> {
        self.entry_mut(id)?.layer.set_opacity(opacity);
        self.invalidate();
        Ok(())
    }

    pub fn set_blend_mode(
        &mut self,
        id: &LayerId,
        blend_mode: BlendMode,
    ) -> Result<(), CompositorError> {
        self.entry_mut(id)?.layer.set_blend_mode(blend_mode);
        self.invalidate();
        Ok(())
    }

    pub fn set_order(&mut self, id: &LayerId, order: i32) -> Result<(), CompositorError> {
        self.entry_mut(id)?.layer.set_order(order);
        self.invalidate();
        Ok(())
    }

    // -- Statistical layers --

    fn with_statistical<R>(
        &mut self,
        id: &LayerId,
        op: impl FnOnce(&mut StatisticalLayer) -> Result<R, LayerError>,
    ) -> Result<R, CompositorError> {
        let result = self.entry_mut(id)?.layer.modify_statistical(op)?;
        self.invalidate();
        Ok(result)
    }

    pub fn apply_bonferroni(
        &mut self,
        id: &LayerId,
        alpha: f64,
    ) -> Result<CorrectionSummary, CompositorError> {
        self.with_statistical(id, |s| s.apply_bonferroni(alpha))
    }

    pub fn apply_fdr(&mut self, id: &LayerId, q: f64) -> Result<CorrectionSummary, CompositorError> {
        self.with_statistical(id, |s| s.apply_fdr(q))
    }

    pub fn apply_cluster_threshold(
        &mut self,
        id: &LayerId,
        threshold: f32,
        options: ClusterOptions,
    ) -> Result<CorrectionSummary, CompositorError> {
        self.with_statistical(id, |s| s.apply_cluster_threshold(threshold, options))
    }

    pub fn clear_correction(&mut self, id: &LayerId) -> Result<(), CompositorError> {
        self.with_statistical(id, |s| {
            s.clear_correction();
            Ok(())
        })
    }

    pub fn set_dual_threshold(
        &mut self,
        id: &LayerId,
        positive: ColorMap,
        negative: ColorMap,
    ) -> Result<(), CompositorError> {
        self.with_statistical(id, |s| s.set_dual_threshold(positive, negative))
    }

    pub fn clear_dual_threshold(&mut self, id: &LayerId) -> Result<(), CompositorError> {
        self.with_statistical(id, |s| {
            s.clear_dual_threshold();
            Ok(())
        })
    }

    /// Per-vertex statistics of a statistical layer. `Ok(None)` when the
    /// vertex is out of range.
    pub fn vertex_stat_info(
        &self,
        id: &LayerId,
        vertex: usize,
    ) -> Result<Option<VertexStatInfo>, CompositorError> {
        let layer = self
            .get(id)
            .ok_or_else(|| CompositorError::UnknownLayer(id.clone()))?;
        let stat = layer.statistical().ok_or_else(|| LayerError::NotStatistical {
            id: id.to_string(),
            layer_type: layer.layer_type(),
        })?;
        Ok(stat.vertex_stat_info(vertex))
    }

    /// Share the mesh graph with every statistical layer, current and future.
    /// Pending cluster corrections run now. Either every layer accepts the
    /// graph or nothing changes.
    pub fn set_adjacency(&mut self, adjacency: Arc<MeshAdjacency>) -> Result<(), CompositorError> {
        if adjacency.vertex_count() != self.vertex_count {
            let err = StatsError::AdjacencyMismatch {
                expected: self.vertex_count,
                got: adjacency.vertex_count(),
            };
            return Err(LayerError::from(err).into());
        }

        let mut staged = Vec::new();
        for (id, entry) in &self.entries {
            if entry.layer.statistical().is_none() {
                continue;
            }
            let mut next = entry.layer.clone();
            next.set_adjacency(&adjacency)?;
            staged.push((id.clone(), next));
        }

        debug!(
            vertices = adjacency.vertex_count(),
            edges = adjacency.edge_count(),
            statistical_layers = staged.len(),
            "Propagating mesh adjacency"
        );

        for (id, layer) in staged {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.layer = layer;
            }
        }
        self.adjacency = Some(adjacency);
        self.invalidate();
        Ok(())
    }

    // -- Temporal layers --

    pub fn set_frame_blend(
        &mut self,
        id: &LayerId,
        a: usize,
        b: usize,
        alpha: f32,
    ) -> Result<(), CompositorError> {
        self.entry_mut(id)?.layer.set_frame_blend(a, b, alpha)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_time(&mut self, id: &LayerId, t: f64) -> Result<FrameBlend, CompositorError> {
        let blend = self.entry_mut(id)?.layer.set_time(t)?;
        self.invalidate();
        Ok(blend)
    }

    // -- Ordering and output --

    fn sorted_entries(&self) -> Vec<(&LayerId, &Entry)> {
        let mut sorted: Vec<(&LayerId, &Entry)> = self.entries.iter().collect();
        sorted.sort_by_key(|(_, e)| e.sort_key());
        sorted
    }

    /// All layer ids in composite order, hidden layers included.
    pub fn ordered_ids(&self) -> Vec<LayerId> {
        self.sorted_entries()
            .into_iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Visible layer ids in composite order.
    pub fn visible_ids(&self) -> Vec<LayerId> {
        self.sorted_entries()
            .into_iter()
            .filter(|(_, e)| e.layer.is_visible())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// A layer's RGBA buffer (opacity and blend not applied), regenerated
    /// first if the layer changed.
    pub fn layer_rgba(&mut self, id: &LayerId) -> Option<&[f32]> {
        let vertex_count = self.vertex_count;
        let entry = self.entries.get_mut(id)?;
        if entry.refresh(vertex_count) {
            self.stats.layer_refreshes += 1;
        }
        Some(&entry.rgba)
    }

    /// The composited per-vertex RGBA buffer (`4 * vertex_count` floats).
    pub fn composite(&mut self) -> &[f32] {
        if !self.needs_composite {
            return &self.composite;
        }

        let order = self.visible_ids();
        let vertex_count = self.vertex_count;
        let mut acc = vec![0.0f32; vertex_count * 4];
        let mut refreshed = 0u64;

        for id in &order {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            if entry.refresh(vertex_count) {
                refreshed += 1;
            }
            let layer = &entry.layer;
            layer
                .blend_mode()
                .blend_buffer(&mut acc, &entry.rgba, layer.opacity());
        }

        for entry in self.entries.values_mut() {
            entry.layer.mark_clean();
        }

        self.stats.composites += 1;
        self.stats.layer_refreshes += refreshed;
        debug!(
            layers = order.len(),
            refreshed,
            vertices = vertex_count,
            "Composited layer stack"
        );

        self.composite = acc;
        self.needs_composite = false;
        &self.composite
    }
}
