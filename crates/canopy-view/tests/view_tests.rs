//! Tests for view materialization, normalization and lifecycle.

use std::collections::HashSet;
use std::sync::Arc;

use canopy_common::Diagnostics;
use canopy_model::{Model, ModelBuilder, NodeId};
use canopy_view::{Normalization, VIEW_TAG, View};

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

/// root
///   panel x3 (panel), each with metadata `index`
///     strip x3 (strip)
///       2 points at x = panel * 10 + strip * 3 + k, y = strip, z = 0
fn panels() -> Arc<Model> {
    let mut builder = ModelBuilder::new(["model"]);
    for p in 0..3_u8 {
        let panel = builder.alloc(["panel"]);
        builder.append_child(NodeId::ROOT, panel);
        builder.set_metadata(panel, "index", p.to_string());
        for s in 0..3_u8 {
            let strip = builder.alloc(["strip"]);
            builder.append_child(panel, strip);
            for k in 0..2_u8 {
                let slot = builder.add_point(f32::from(p * 10 + s * 3 + k), f32::from(s), 0.0);
                builder.add_point_to(strip, slot);
            }
        }
    }
    Arc::new(builder.build())
}

fn group_indices(view: &View, group: usize) -> HashSet<usize> {
    view.group_points(group).map(|p| p.index).collect()
}

fn axis_range(view: &View, group: usize, axis: usize) -> (f32, f32) {
    view.group_points(group)
        .map(|p| p.normalized()[axis])
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[test]
fn test_empty_view() {
    let model = panels();
    let view = View::create(&model, "nothing", Normalization::Relative).unwrap();
    assert!(view.points().is_empty());
    assert!(view.groups().is_empty());
    assert!(view.model().children(NodeId::ROOT).is_empty());
    assert!(view.model().has_tag(NodeId::ROOT, VIEW_TAG));
    assert_eq!(view.cloned_point_count(), 0);
}

#[test]
fn test_single_group_is_the_view() {
    let model = panels();
    let view = View::create(&model, "panel[1]", Normalization::Relative).unwrap();
    assert!(!view.is_container());
    assert_eq!(view.groups(), &[NodeId::ROOT]);
    assert_eq!(view.normalization(), Normalization::Relative);
    assert_eq!(view.points().len(), 6);
    assert_eq!(view.cloned_point_count(), 6);

    // root(view) -> panel -> 3 strips
    let copies = view.model().children(NodeId::ROOT);
    assert_eq!(copies.len(), 1);
    let panel = copies[0];
    assert!(view.model().has_tag(panel, "panel"));
    assert_eq!(view.model().children_tagged(panel, "strip").len(), 3);
    assert_eq!(
        view.model().metadata(panel).unwrap().get("index").map(String::as_str),
        Some("1")
    );
    assert_eq!(view.model().points_of(panel).count(), 6);
}

#[test]
fn test_clone_keeps_identity() {
    let model = panels();
    let view = View::create(&model, "panel[2] strip[0]", Normalization::Absolute).unwrap();
    let indices: Vec<usize> = view.points().iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![12, 13]);
    for index in indices {
        let copy = view.cloned_point(index).unwrap();
        let source = model.point_by_index(index).unwrap();
        assert_eq!(copy.coords(), source.coords());
    }
    assert!(view.cloned_point(0).is_none());
}

#[test]
fn test_container_for_multiple_groups() {
    let model = panels();
    let view = View::create(&model, "panel[0]; panel[2]", Normalization::Relative).unwrap();
    assert!(view.is_container());
    assert_eq!(view.normalization(), Normalization::Absolute);
    assert_eq!(view.group_normalization(), Normalization::Relative);
    assert_eq!(view.groups().len(), 2);
    assert_eq!(view.points().len(), 12);
    assert_eq!(view.model().bounds(NodeId::ROOT), model.bounds(NodeId::ROOT));

    for &group in view.groups() {
        assert_eq!(view.model().parent(group), Some(NodeId::ROOT));
        assert!(view.model().has_tag(group, VIEW_TAG));
    }
    assert_eq!(
        view.model().children(NodeId::ROOT),
        view.groups()
    );
}

#[test]
fn test_partition_property() {
    let model = panels();
    for selector in [
        "panel[0]; panel[0] strip; strip",
        "strip[even]; panel; strip[odd]",
        "panel * strip; strip, panel[1]",
        "panel *; strip",
    ] {
        let view = View::create(&model, selector, Normalization::Relative).unwrap();
        let mut seen = HashSet::new();
        for group in 0..view.groups().len() {
            for index in group_indices(&view, group) {
                assert!(seen.insert(index), "point {index} twice in '{selector}'");
            }
        }
        assert_eq!(seen.len(), view.cloned_point_count(), "selector '{selector}'");
    }
}

#[test]
fn test_ancestor_precedence_in_view() {
    let model = panels();
    let first = View::create(&model, "panel[0]; panel[0] strip", Normalization::Relative).unwrap();
    assert_eq!(first.groups().len(), 1);
    assert_eq!(first.points().len(), 6);

    let later = View::create(&model, "panel[0] strip; panel[0]", Normalization::Relative).unwrap();
    assert_eq!(later.groups().len(), 1);
    let copies = later.model().children(NodeId::ROOT);
    assert_eq!(copies.len(), 1);
    assert!(later.model().has_tag(copies[0], "panel"));
}

#[test]
fn test_relative_normalization() {
    let model = panels();
    let view = View::create(&model, "panel[1]", Normalization::Relative).unwrap();

    let (lo, hi) = axis_range(&view, 0, 0);
    assert!(close(lo, 0.0) && close(hi, 1.0));
    let (lo, hi) = axis_range(&view, 0, 1);
    assert!(close(lo, 0.0) && close(hi, 1.0));
    // No extent along z.
    let (lo, hi) = axis_range(&view, 0, 2);
    assert!(close(lo, 0.5) && close(hi, 0.5));

    let bounds = view.model().bounds(NodeId::ROOT).unwrap();
    assert_eq!(bounds.min, [10.0, 0.0, 0.0]);
    assert_eq!(bounds.max, [17.0, 2.0, 0.0]);
}

#[test]
fn test_relative_normalization_per_group() {
    let model = panels();
    let view = View::create(&model, "panel[0]; panel[2] strip[0]", Normalization::Relative).unwrap();
    for group in 0..2 {
        let (lo, hi) = axis_range(&view, group, 0);
        assert!(close(lo, 0.0) && close(hi, 1.0), "group {group}");
    }
}

/// Two sibling strips that both list point 1.
fn shared_point_strips() -> Arc<Model> {
    let mut builder = ModelBuilder::new(["model"]);
    let first = builder.alloc(["strip"]);
    let second = builder.alloc(["strip"]);
    builder.append_child(NodeId::ROOT, first);
    builder.append_child(NodeId::ROOT, second);
    let a = builder.add_point(0.0, 0.0, 0.0);
    let shared = builder.add_point(1.0, 0.0, 0.0);
    let c = builder.add_point(5.0, 0.0, 0.0);
    builder.add_point_to(first, a);
    builder.add_point_to(first, shared);
    builder.add_point_to(second, c);
    builder.add_point_to(second, shared);
    Arc::new(builder.build())
}

#[test]
fn test_shared_point_stays_with_first_group() {
    let model = shared_point_strips();
    let view = View::create(&model, "strip[0]; strip[1]", Normalization::Relative).unwrap();
    assert_eq!(view.groups().len(), 2);
    assert_eq!(group_indices(&view, 0), HashSet::from([0, 1]));
    assert_eq!(group_indices(&view, 1), HashSet::from([2]));
    assert_eq!(view.cloned_point_count(), 3);

    // The copied strip under the second group view does not pick up point 1.
    let second_copy = view.model().children(view.groups()[1])[0];
    let copied: Vec<usize> = view.model().points_of(second_copy).map(|p| p.index).collect();
    assert_eq!(copied, vec![2]);

    let (lo, hi) = axis_range(&view, 0, 0);
    assert!(close(lo, 0.0) && close(hi, 1.0));
    let (lo, hi) = axis_range(&view, 1, 0);
    assert!(close(lo, 0.5) && close(hi, 0.5));
}

#[test]
fn test_absolute_normalization() {
    let model = panels();
    let view = View::create(&model, "panel[1]; panel[2]", Normalization::Absolute).unwrap();
    assert_eq!(view.points().len(), 12);
    for copy in view.points() {
        let source = model.point_by_index(copy.index).unwrap();
        assert_eq!(copy, source);
    }
    for &group in view.groups() {
        assert_eq!(view.model().bounds(group), model.bounds(NodeId::ROOT));
    }
}

#[test]
fn test_cloned_subtree_keeps_source_bounds() {
    let model = panels();
    let view = View::create(&model, "panel[2]", Normalization::Relative).unwrap();
    let panel = view.model().children(NodeId::ROOT)[0];
    let source_panel = model.children(NodeId::ROOT)[2];
    assert_eq!(view.model().bounds(panel), model.bounds(source_panel));
}

#[test]
fn test_clone_independence() {
    let model = panels();
    let mut view = View::create(&model, "panel[0]", Normalization::Absolute).unwrap();
    let index = view.points()[0].index;
    let original = *model.point_by_index(index).unwrap();

    view.points_mut()[0].xn = 42.0;
    view.points_mut()[0].x = -1.0;

    assert_eq!(*model.point_by_index(index).unwrap(), original);
    assert!(close(view.cloned_point(index).unwrap().xn, 42.0));
}

#[test]
fn test_source_back_reference() {
    let model = panels();
    let view = View::create(&model, "panel", Normalization::Relative).unwrap();
    assert!(Arc::ptr_eq(view.source_model(), &model));
}

#[test]
fn test_registration_and_dispose() {
    let model = panels();
    let view = View::create(&model, "panel", Normalization::Relative).unwrap();
    let id = view.id();
    assert_eq!(model.derived_views(), vec![id]);

    view.dispose();
    assert!(model.derived_views().is_empty());
}

#[test]
fn test_no_leaks_over_many_views() {
    let model = panels();
    let keep = View::create(&model, "panel[0]", Normalization::Relative).unwrap();
    for i in 0..25 {
        let selector = format!("strip[{}]", i % 9);
        let view = View::create(&model, &selector, Normalization::Absolute).unwrap();
        assert_eq!(model.derived_view_count(), 2);
        view.dispose();
    }
    assert_eq!(model.derived_views(), vec![keep.id()]);
    drop(keep);
    assert_eq!(model.derived_view_count(), 0);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "was not registered")]
fn test_dropping_unregistered_view_is_reported() {
    let model = panels();
    let view = View::create(&model, "panel[0]", Normalization::Relative).unwrap();
    model.unregister_view(view.id()).unwrap();
    drop(view);
}

#[test]
fn test_warnings_collected() {
    let model = panels();
    let view = View::create(&model, "strip[x]; panel[0-", Normalization::Relative).unwrap();
    assert_eq!(view.warnings().len(), 2);
    // Both fragments fall back to selecting everything they name.
    assert_eq!(view.cloned_point_count(), 18);
}

#[test]
fn test_warnings_to_sink() {
    let model = panels();
    let mut diagnostics = Diagnostics::new();
    let view =
        View::create_with_sink(&model, "strip[9-2]", Normalization::Relative, &mut diagnostics)
            .unwrap();
    assert!(view.warnings().is_empty());
    assert_eq!(diagnostics.warnings().len(), 1);
    assert_eq!(view.points().len(), 18);
}

#[test]
fn test_normalization_names() {
    assert_eq!(Normalization::Relative.to_string(), "Normalize to View");
    assert_eq!(Normalization::Absolute.to_string(), "Preserve Absolute");
    assert_eq!("absolute".parse::<Normalization>(), Ok(Normalization::Absolute));
    assert_eq!("Relative".parse::<Normalization>(), Ok(Normalization::Relative));
    assert!("sideways".parse::<Normalization>().is_err());
    assert_eq!(Normalization::default(), Normalization::Relative);
}

/// root > strip x40 > led x50, one point per led.
fn dense() -> Arc<Model> {
    let mut builder = ModelBuilder::new(["model"]);
    for s in 0..40_u16 {
        let strip = builder.alloc(["strip"]);
        builder.append_child(NodeId::ROOT, strip);
        for l in 0..50_u16 {
            let led = builder.alloc(["led"]);
            builder.append_child(strip, led);
            let slot = builder.add_point(f32::from(l), f32::from(s), 0.0);
            builder.add_point_to(led, slot);
        }
    }
    Arc::new(builder.build())
}

#[test]
fn test_dense_model_groups() {
    let model = dense();

    let per_led = View::create(&model, "led *", Normalization::Relative).unwrap();
    assert_eq!(per_led.groups().len(), 2000);
    assert_eq!(per_led.cloned_point_count(), 2000);
    assert!(per_led.group_points(1999).all(|p| close(p.xn, 0.5)));

    let displaced = View::create(&model, "led; strip[0]", Normalization::Relative).unwrap();
    assert_eq!(displaced.groups().len(), 2);
    assert_eq!(displaced.model().children(displaced.groups()[0]).len(), 1950);
    assert_eq!(displaced.model().children(displaced.groups()[1]).len(), 1);
    assert_eq!(displaced.cloned_point_count(), 2000);
}
