//! End-to-end compositing tests.
//!
//! These build realistic stacks from every layer variant and check the
//! composite against hand-computed values, then run the same fixtures through
//! the GPU path on the software backend and compare the read-back buffers.
//!
//! ```bash
//! cargo test -p sl-compositor --test compositing
//! ```

use std::sync::Arc;

use sl_colormap::{ColorMap, ColorMap2D, ColorMapRegistry, Palette2D};
use sl_common::{
    BlendMode, CompositingMode, CompositorConfig, FilterMode, GpuCapabilities, LayerId, Range,
    Threshold,
};
use sl_compositor::{CompositorError, Frame, LayerStack, SurfaceCompositor};
use sl_gpu_hal::SoftwareBackend;
use sl_layers::{
    BaseLayer, CurvatureLayer, DataLayer, DataUpdate, LabelEntry, LabelLayer, Layer, LayerKind,
    LayerState, LayerUpdate, Parcel, ParcelValueLayer, RgbaLayer, StatisticalLayer,
    TemporalLayer, TwoDataLayer,
};
use sl_stats::{ClusterOptions, MeshAdjacency};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const V: usize = 10;

fn registry() -> ColorMapRegistry {
    ColorMapRegistry::with_builtins()
}

fn preset(name: &str, min: f32, max: f32) -> ColorMap {
    ColorMap::from_preset(&registry(), name)
        .unwrap()
        .with_range(Range::new(min, max))
}

fn id(s: &str) -> LayerId {
    LayerId::from(s)
}

fn solid(name: &str, color: [f32; 4], vertices: usize) -> Layer {
    let data = color.iter().copied().cycle().take(vertices * 4).collect();
    Layer::new(name, LayerKind::Rgba(RgbaLayer::new(data))).unwrap()
}

/// A strip of triangles over `V` vertices: (0,1,2), (1,2,3), ...
fn strip_adjacency(vertices: usize) -> Arc<MeshAdjacency> {
    let faces: Vec<[u32; 3]> = (0..vertices as u32 - 2).map(|i| [i, i + 1, i + 2]).collect();
    Arc::new(MeshAdjacency::from_faces(vertices, &faces).unwrap())
}

/// One layer of every variant, with mixed blend modes and opacities.
fn full_stack() -> LayerStack {
    let mut stack = LayerStack::new(V);
    let ramp: Vec<f32> = (0..V).map(|i| i as f32).collect();

    stack
        .add_layer(Layer::new("base", LayerKind::Base(BaseLayer::default())).unwrap())
        .unwrap();

    let curv: Vec<f32> = (0..V).map(|i| (i as f32 - 4.5) * 0.1).collect();
    stack
        .add_layer(Layer::new("curv", LayerKind::Curvature(CurvatureLayer::new(curv))).unwrap())
        .unwrap();

    let data = DataLayer::new(
        ramp.clone(),
        preset("jet", 0.0, 9.0).with_threshold(Threshold::new(3.0, 5.0)),
    );
    stack
        .add_layer(
            Layer::new("data", LayerKind::Data(data))
                .unwrap()
                .with_order(1)
                .with_opacity(0.7),
        )
        .unwrap();

    let labels = LabelLayer::new(
        (0..V as u32).map(|i| i % 3).collect(),
        vec![
            LabelEntry::new(0, "frontal", [1.0, 0.0, 0.0, 1.0]),
            LabelEntry::new(1, "parietal", [0.0, 1.0, 0.0, 1.0]),
        ],
    );
    stack
        .add_layer(
            Layer::new("labels", LayerKind::Label(labels))
                .unwrap()
                .with_order(2)
                .with_opacity(0.4)
                .with_blend_mode(BlendMode::Multiply),
        )
        .unwrap();

    let mut two = ColorMap2D::new(Palette2D::Diverging);
    two.set_range(Range::new(0.0, 9.0), Range::new(0.0, 1.0)).unwrap();
    let ys: Vec<f32> = (0..V).map(|i| (i % 2) as f32).collect();
    stack
        .add_layer(
            Layer::new("two", LayerKind::TwoData(TwoDataLayer::new(ramp.clone(), ys, two)))
                .unwrap()
                .with_order(3)
                .with_opacity(0.3),
        )
        .unwrap();

    let frames = vec![ramp.clone(), ramp.iter().rev().copied().collect()];
    let temporal = TemporalLayer::new(frames, vec![0.0, 1.0], preset("hot", 0.0, 9.0));
    stack
        .add_layer(
            Layer::new("temporal", LayerKind::Temporal(temporal))
                .unwrap()
                .with_order(4)
                .with_opacity(0.25)
                .with_blend_mode(BlendMode::Additive),
        )
        .unwrap();
    stack.set_time(&id("temporal"), 0.4).unwrap();

    let parcels = ParcelValueLayer::new(
        vec![Parcel::new(1, "V1", -2.0), Parcel::new(2, "MT", 2.0)],
        (0..V as u32).map(|i| 1 + i % 2).collect(),
        preset("rdbu", -2.0, 2.0),
    );
    stack
        .add_layer(
            Layer::new("parcels", LayerKind::ParcelValue(parcels))
                .unwrap()
                .with_order(5)
                .with_opacity(0.5),
        )
        .unwrap();

    let t_values: Vec<f32> = (0..V).map(|i| if i < 4 { 4.0 } else { 0.5 }).collect();
    let p_values: Vec<f32> = (0..V).map(|i| if i < 4 { 0.001 } else { 0.6 }).collect();
    let stat = StatisticalLayer::new(t_values, preset("red_yellow", 2.0, 6.0))
        .with_p_values(p_values)
        .with_degrees_of_freedom(20.0);
    stack
        .add_layer(Layer::new("stat", LayerKind::Statistical(stat)).unwrap().with_order(6))
        .unwrap();
    stack.apply_fdr(&id("stat"), 0.05).unwrap();

    stack
}

fn gpu_bridge(stack: LayerStack, texture_width: u32) -> SurfaceCompositor {
    let config = CompositorConfig {
        mode: CompositingMode::Gpu,
        texture_width,
        max_gpu_layers: 0,
    };
    SurfaceCompositor::new(stack, config, Some(Box::new(SoftwareBackend::new()))).unwrap()
}

fn assert_close(a: &[f32], b: &[f32]) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() < 1e-6, "component {i}: {x} vs {y}");
    }
}

// ---------------------------------------------------------------------------
// Host composite
// ---------------------------------------------------------------------------

#[test]
fn jet_triangle_inactive_threshold_shows_everything() {
    let mut stack = LayerStack::new(3);
    let layer = Layer::new(
        "d",
        LayerKind::Data(DataLayer::new(
            vec![0.0, 5.0, 10.0],
            preset("jet", 0.0, 10.0).with_threshold(Threshold::new(0.0, 0.0)),
        )),
    )
    .unwrap()
    .with_opacity(0.6);
    stack.add_layer(layer).unwrap();

    let out = stack.composite();
    for v in 0..3 {
        assert!((out[v * 4 + 3] - 0.6).abs() < 1e-6, "vertex {v}");
    }
}

#[test]
fn jet_triangle_hide_band_hides_middle_vertex() {
    let mut stack = LayerStack::new(3);
    let layer = Layer::new(
        "d",
        LayerKind::Data(DataLayer::new(
            vec![0.0, 5.0, 10.0],
            preset("jet", 0.0, 10.0).with_threshold(Threshold::new(4.0, 6.0)),
        )),
    )
    .unwrap();
    stack.add_layer(layer).unwrap();

    let out = stack.composite().to_vec();
    assert_eq!(out[3], 1.0);
    assert_eq!(out[7], 0.0);
    assert_eq!(out[11], 1.0);
    // Jet endpoints: blue at 0, red at 10.
    assert!(out[2] > out[0]);
    assert!(out[8] > out[10]);
}

#[test]
fn composite_is_idempotent() {
    let mut stack = full_stack();
    let first = stack.composite().to_vec();
    let stats = stack.stats();
    let second = stack.composite().to_vec();
    assert_eq!(first, second);
    assert_eq!(stack.stats(), stats);
}

#[test]
fn order_is_independent_of_insertion() {
    let layers = [
        solid("a", [1.0, 0.0, 0.0, 0.5], 2).with_order(3),
        solid("b", [0.0, 1.0, 0.0, 0.5], 2).with_order(1),
        solid("c", [0.0, 0.0, 1.0, 0.5], 2).with_order(2),
    ];

    let mut forward = LayerStack::new(2);
    for layer in layers.iter().cloned() {
        forward.add_layer(layer).unwrap();
    }
    let mut backward = LayerStack::new(2);
    for layer in layers.iter().rev().cloned() {
        backward.add_layer(layer).unwrap();
    }

    assert_eq!(forward.ordered_ids(), vec![id("b"), id("c"), id("a")]);
    assert_eq!(forward.ordered_ids(), backward.ordered_ids());
    assert_eq!(forward.composite(), backward.composite());
}

#[test]
fn normal_opaque_top_replaces() {
    let mut stack = LayerStack::new(2);
    stack.add_layer(solid("under", [0.3, 0.6, 0.9, 1.0], 2)).unwrap();
    stack
        .add_layer(solid("top", [0.1, 0.2, 0.3, 1.0], 2).with_order(1))
        .unwrap();
    assert_close(stack.composite(), &[0.1, 0.2, 0.3, 1.0, 0.1, 0.2, 0.3, 1.0]);
}

#[test]
fn additive_at_zero_opacity_leaves_accumulator_bit_for_bit() {
    let mut stack = LayerStack::new(2);
    stack.add_layer(solid("under", [0.3, 0.6, 0.9, 0.7], 2)).unwrap();
    let before = stack.composite().to_vec();

    stack
        .add_layer(
            solid("glow", [0.9, 0.9, 0.9, 1.0], 2)
                .with_order(1)
                .with_opacity(0.0)
                .with_blend_mode(BlendMode::Additive),
        )
        .unwrap();
    let after = stack.composite().to_vec();
    for (x, y) in before.iter().zip(&after) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

#[test]
fn multiply_by_opaque_white_is_identity() {
    let mut stack = LayerStack::new(2);
    stack.add_layer(solid("under", [0.3, 0.6, 0.9, 0.8], 2)).unwrap();
    let before = stack.composite().to_vec();

    stack
        .add_layer(
            solid("white", [1.0, 1.0, 1.0, 1.0], 2)
                .with_order(1)
                .with_blend_mode(BlendMode::Multiply),
        )
        .unwrap();
    assert_close(stack.composite(), &before);
}

#[test]
fn mutations_coalesce_into_one_recompute() {
    let mut stack = full_stack();
    stack.composite();
    let before = stack.stats().composites;

    stack.set_opacity(&id("data"), 0.2).unwrap();
    stack.set_visibility(&id("labels"), false).unwrap();
    stack.set_blend_mode(&id("two"), BlendMode::Additive).unwrap();
    stack
        .set_layer_order(&[id("stat"), id("parcels"), id("data")])
        .unwrap();
    stack.composite();
    stack.composite();

    assert_eq!(stack.stats().composites, before + 1);
}

#[test]
fn only_changed_layers_are_regenerated() {
    let mut stack = full_stack();
    stack.composite();
    let refreshed = stack.stats().layer_refreshes;

    let update = LayerUpdate::default().with_config(DataUpdate {
        threshold: Some(Threshold::NONE),
        ..Default::default()
    });
    stack.update_layer(&id("data"), &update).unwrap();
    stack.set_opacity(&id("parcels"), 0.9).unwrap();
    stack.composite();

    assert_eq!(stack.stats().layer_refreshes, refreshed + 1);
}

#[test]
fn fdr_gates_statistical_visibility() {
    let mut stack = full_stack();
    let info = stack.vertex_stat_info(&id("stat"), 0).unwrap().unwrap();
    assert!(info.significant);
    let info = stack.vertex_stat_info(&id("stat"), 8).unwrap().unwrap();
    assert!(!info.significant);
    assert!(stack.vertex_stat_info(&id("stat"), V).unwrap().is_none());

    let summary = stack.apply_bonferroni(&id("stat"), 0.05).unwrap();
    assert_eq!(summary.significant, 4);
}

#[test]
fn cluster_correction_waits_for_adjacency() {
    let mut stack = LayerStack::new(V);
    let values: Vec<f32> = (0..V).map(|i| if i < 6 { 3.0 } else { 0.0 }).collect();
    let stat = StatisticalLayer::new(values, preset("hot", 2.0, 4.0));
    stack
        .add_layer(Layer::new("stat", LayerKind::Statistical(stat)).unwrap())
        .unwrap();

    let err = stack
        .apply_cluster_threshold(&id("stat"), 2.0, ClusterOptions::new(4))
        .unwrap_err();
    assert!(matches!(err, CompositorError::Layer(_)));

    stack.set_adjacency(strip_adjacency(V)).unwrap();
    let summary = stack
        .apply_cluster_threshold(&id("stat"), 2.0, ClusterOptions::new(4))
        .unwrap();
    assert_eq!(summary.cluster_count, 1);
    assert_eq!(summary.significant, 6);

    let out = stack.composite();
    assert!(out[3] > 0.0);
    assert_eq!(out[6 * 4 + 3], 0.0);

    stack.clear_correction(&id("stat")).unwrap();
    let info = stack.vertex_stat_info(&id("stat"), 0).unwrap().unwrap();
    assert_eq!(info.cluster_index, None);
}

#[test]
fn stack_survives_json_round_trip() {
    let mut original = full_stack();
    let expected = original.composite().to_vec();

    let mut restored = LayerStack::new(V);
    for layer_id in original.ordered_ids() {
        let layer = original.get(&layer_id).unwrap();
        let json = serde_json::to_string(&layer.to_state()).unwrap();
        let state: LayerState = serde_json::from_str(&json).unwrap();
        restored.add_layer(Layer::from_state(state).unwrap()).unwrap();
    }

    assert_eq!(restored.ordered_ids(), original.ordered_ids());
    assert_close(restored.composite(), &expected);
}

// ---------------------------------------------------------------------------
// Compositing-mode bridge
// ---------------------------------------------------------------------------

#[test]
fn cpu_and_gpu_agree_on_every_variant() {
    let mut cpu = SurfaceCompositor::cpu(full_stack());
    let expected = cpu.read_back().unwrap();

    let mut gpu = gpu_bridge(full_stack(), 4);
    assert_eq!(gpu.compositing_mode(), CompositingMode::Gpu);
    let got = gpu.read_back().unwrap();

    assert_close(&got, &expected);
}

#[test]
fn gpu_frame_lists_bindings_in_composite_order() {
    let mut bridge = gpu_bridge(full_stack(), 4);
    let ids = bridge.stack().visible_ids();
    let orders: Vec<i32> = ids
        .iter()
        .map(|i| bridge.stack().get(i).unwrap().order())
        .collect();

    let Frame::Gpu(bindings) = bridge.frame().unwrap() else {
        panic!("expected GPU bindings");
    };
    assert_eq!(bindings.len(), ids.len());
    for (binding, order) in bindings.iter().zip(&orders) {
        assert_eq!(binding.uniforms.order, *order);
        assert_eq!(binding.uniforms.texture_width, 4);
    }
}

#[test]
fn mode_switch_resyncs_once_and_round_trips() {
    let mut bridge = SurfaceCompositor::new(
        full_stack(),
        CompositorConfig {
            texture_width: 3,
            ..Default::default()
        },
        Some(Box::new(SoftwareBackend::new())),
    )
    .unwrap();
    let cpu_colors = bridge.read_back().unwrap();

    bridge.set_compositing_mode(true).unwrap();
    assert_eq!(bridge.compositing_mode().as_str(), "GPU");
    assert_eq!(bridge.gpu_stats().syncs, 1);
    bridge.frame().unwrap();
    bridge.frame().unwrap();
    assert_eq!(bridge.gpu_stats().syncs, 1);
    assert_close(&bridge.read_back().unwrap(), &cpu_colors);

    let composites = bridge.stack().stats().composites;
    bridge.set_compositing_mode(false).unwrap();
    assert_eq!(bridge.stack().stats().composites, composites + 1);
    assert_eq!(bridge.texture_count(), 0);
    assert_close(&bridge.read_back().unwrap(), &cpu_colors);
}

#[test]
fn gpu_reuploads_only_changed_layers() {
    let mut bridge = gpu_bridge(full_stack(), 4);
    let layers = bridge.stack().visible_ids().len() as u64;
    assert_eq!(bridge.gpu_stats().uploads, layers);

    bridge.stack_mut().set_opacity(&id("data"), 0.1).unwrap();
    bridge.frame().unwrap();
    assert_eq!(bridge.gpu_stats().uploads, layers);
    assert_eq!(bridge.gpu_stats().syncs, 2);

    bridge.stack_mut().set_time(&id("temporal"), 0.9).unwrap();
    bridge.frame().unwrap();
    assert_eq!(bridge.gpu_stats().uploads, layers + 1);

    let mut cpu = SurfaceCompositor::cpu(full_stack());
    cpu.stack_mut().set_opacity(&id("data"), 0.1).unwrap();
    cpu.stack_mut().set_time(&id("temporal"), 0.9).unwrap();
    assert_close(&bridge.read_back().unwrap(), &cpu.read_back().unwrap());
}

#[test]
fn removed_layers_release_their_textures() {
    let mut bridge = gpu_bridge(full_stack(), 4);
    let textures = bridge.texture_count();

    bridge.remove_layer(&id("labels")).unwrap();
    assert_eq!(bridge.texture_count(), textures - 1);
    assert_eq!(bridge.gpu_stats().releases, 1);

    bridge.stack_mut().remove_layer(&id("two")).unwrap();
    bridge.frame().unwrap();
    assert_eq!(bridge.texture_count(), textures - 2);

    bridge.dispose();
    assert_eq!(bridge.texture_count(), 0);
    assert_eq!(bridge.compositing_mode(), CompositingMode::Cpu);
    assert_eq!(bridge.gpu_stats().releases, textures as u64);
}

#[test]
fn readded_layer_is_uploaded_again() {
    let mut bridge = gpu_bridge(LayerStack::new(2), 2);
    bridge
        .stack_mut()
        .add_layer(solid("a", [1.0, 0.0, 0.0, 1.0], 2))
        .unwrap();
    bridge.frame().unwrap();

    bridge.stack_mut().remove_layer(&id("a")).unwrap();
    bridge
        .stack_mut()
        .add_layer(solid("a", [0.0, 0.0, 1.0, 1.0], 2))
        .unwrap();
    let out = bridge.read_back().unwrap();
    assert_close(&out, &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn unfilterable_float_textures_fall_back_to_nearest() {
    let backend = SoftwareBackend::with_capabilities(GpuCapabilities {
        float32_filterable: false,
        ..Default::default()
    });
    let config = CompositorConfig {
        mode: CompositingMode::Gpu,
        ..Default::default()
    };
    let mut bridge = SurfaceCompositor::new(full_stack(), config, Some(Box::new(backend))).unwrap();
    assert_eq!(bridge.texture_filter(), Some(FilterMode::Nearest));

    let mut cpu = SurfaceCompositor::cpu(full_stack());
    assert_close(&bridge.read_back().unwrap(), &cpu.read_back().unwrap());
}

#[test]
fn too_many_layers_for_the_gpu() {
    let config = CompositorConfig {
        max_gpu_layers: 2,
        ..Default::default()
    };
    let mut bridge =
        SurfaceCompositor::new(full_stack(), config, Some(Box::new(SoftwareBackend::new())))
            .unwrap();
    let err = bridge.set_compositing_mode(true).unwrap_err();
    assert!(matches!(
        err,
        CompositorError::GpuLimit {
            what: "layer textures",
            limit: 2,
            ..
        }
    ));
    assert_eq!(bridge.compositing_mode(), CompositingMode::Cpu);
    assert_eq!(bridge.texture_count(), 0);
}

#[test]
fn hiding_layers_brings_a_stack_under_the_gpu_limit() {
    let config = CompositorConfig {
        max_gpu_layers: 1,
        ..Default::default()
    };
    let mut stack = LayerStack::new(2);
    stack.add_layer(solid("a", [1.0; 4], 2)).unwrap();
    stack.add_layer(solid("b", [0.5; 4], 2)).unwrap();
    stack.set_visibility(&id("b"), false).unwrap();

    let mut bridge =
        SurfaceCompositor::new(stack, config, Some(Box::new(SoftwareBackend::new()))).unwrap();
    bridge.set_compositing_mode(true).unwrap();
    assert_eq!(bridge.texture_count(), 1);
}
