//! Views: independent copies of the parts of a model a selector picks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use canopy_common::{DiagnosticSink, Diagnostics, Warning};
use canopy_model::{Bounds, Model, ModelBuilder, ModelError, NodeId, Point, ViewId};
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::resolve::{Group, parse_groups};

/// Tag carried by every view node and group-view node.
pub const VIEW_TAG: &str = "view";

/// How a view's points are normalized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter, Serialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Recompute bounds from the view's own points and renormalize them.
    #[default]
    #[strum(serialize = "relative", to_string = "Normalize to View")]
    Relative,
    /// Keep the source model's bounds and normalized values.
    #[strum(serialize = "absolute", to_string = "Preserve Absolute")]
    Absolute,
}

/// Errors raised while building a view.
///
/// Malformed selector text is never an error; it is reported as a
/// [`Warning`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The source model's view registry rejected the view.
    #[error(transparent)]
    Registry(#[from] ModelError),
}

/// A materialized selection of a source model.
///
/// The view owns a private [`Model`] holding copies of the selected points.
/// With one group, its root is the group view. With several, its root is a
/// container tagged [`VIEW_TAG`] whose children are the group views; the
/// container never renormalizes. Dropping the view removes it from the
/// source model's registry.
#[derive(Debug)]
pub struct View {
    id: ViewId,
    source: Arc<Model>,
    normalization: Normalization,
    group_normalization: Normalization,
    model: Model,
    groups: Vec<NodeId>,
    cloned_points: HashMap<usize, usize>,
    warnings: Vec<Warning>,
}

impl View {
    /// Build the view of `model` selected by `selector`.
    ///
    /// Problems in the selector text are kept and available from
    /// [`View::warnings`].
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Registry`] if the view cannot be registered with
    /// `model`.
    pub fn create(
        model: &Arc<Model>,
        selector: &str,
        normalization: Normalization,
    ) -> Result<Self, ViewError> {
        let mut diagnostics = Diagnostics::new();
        let mut view = Self::create_with_sink(model, selector, normalization, &mut diagnostics)?;
        view.warnings = diagnostics.into_warnings();
        Ok(view)
    }

    /// Build the view of `model` selected by `selector`, reporting selector
    /// problems to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Registry`] if the view cannot be registered with
    /// `model`.
    pub fn create_with_sink(
        model: &Arc<Model>,
        selector: &str,
        normalization: Normalization,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Self, ViewError> {
        let groups = parse_groups(model, selector, sink);
        let materialized = Materializer::new(model).run(&groups, normalization);

        let id = model.view_registry().allocate_id();
        model.register_view(id)?;

        Ok(Self {
            id,
            source: Arc::clone(model),
            normalization: if groups.len() > 1 {
                Normalization::Absolute
            } else {
                normalization
            },
            group_normalization: normalization,
            model: materialized.model,
            groups: materialized.groups,
            cloned_points: materialized.cloned_points,
            warnings: Vec::new(),
        })
    }

    /// Id of this view in its source model's registry.
    #[must_use]
    pub const fn id(&self) -> ViewId {
        self.id
    }

    /// The model this view was derived from.
    #[must_use]
    pub const fn source_model(&self) -> &Arc<Model> {
        &self.source
    }

    /// Normalization of the returned view. Always
    /// [`Normalization::Absolute`] for a multi-group container.
    #[must_use]
    pub const fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Normalization applied to each group view.
    #[must_use]
    pub const fn group_normalization(&self) -> Normalization {
        self.group_normalization
    }

    /// The view's own model.
    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// The view's copied points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        self.model.points()
    }

    /// Mutable access to the view's copied points. The source model is not
    /// affected.
    pub fn points_mut(&mut self) -> &mut [Point] {
        self.model.points_mut()
    }

    /// Group-view nodes within [`View::model`], in selector order. Empty for
    /// a view that selected nothing, `[NodeId::ROOT]` for a single group.
    #[must_use]
    pub fn groups(&self) -> &[NodeId] {
        &self.groups
    }

    /// Whether the root is a container of several group views.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.groups.len() > 1
    }

    /// Points of the `group`th group view.
    pub fn group_points(&self, group: usize) -> impl Iterator<Item = &Point> + '_ {
        let node = self.groups.get(group).copied();
        node.into_iter()
            .flat_map(move |node| self.model.points_of(node))
    }

    /// The copy of the source point with identity `index`.
    #[must_use]
    pub fn cloned_point(&self, index: usize) -> Option<&Point> {
        self.cloned_points
            .get(&index)
            .and_then(|&slot| self.model.points().get(slot))
    }

    /// Number of source points copied into this view.
    #[must_use]
    pub fn cloned_point_count(&self) -> usize {
        self.cloned_points.len()
    }

    /// Selector problems collected by [`View::create`].
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Tear the view down, removing it from its source model's registry.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for View {
    fn drop(&mut self) {
        let unregistered = self.source.unregister_view(self.id);
        debug_assert!(
            unregistered.is_ok(),
            "view {} was not registered with its source model",
            self.id
        );
    }
}

struct Materialized {
    model: Model,
    groups: Vec<NodeId>,
    cloned_points: HashMap<usize, usize>,
}

/// Copies selected subtrees of a source model into a fresh model.
struct Materializer<'a> {
    source: &'a Model,
    builder: ModelBuilder,
    cloned_points: HashMap<usize, usize>,
}

impl<'a> Materializer<'a> {
    fn new(source: &'a Model) -> Self {
        Self {
            source,
            builder: ModelBuilder::new([VIEW_TAG]).preserve_normalization(),
            cloned_points: HashMap::new(),
        }
    }

    fn run(mut self, groups: &[Group], normalization: Normalization) -> Materialized {
        let source_bounds = self.source.bounds(self.source.root()).unwrap_or_default();
        let absolute = normalization == Normalization::Absolute;

        let group_nodes = match groups {
            [] => {
                if absolute {
                    self.builder.set_bounds(NodeId::ROOT, source_bounds);
                }
                Vec::new()
            }
            [group] => {
                self.fill_group(NodeId::ROOT, group, absolute.then_some(source_bounds));
                vec![NodeId::ROOT]
            }
            _ => {
                self.builder.set_bounds(NodeId::ROOT, source_bounds);
                let mut nodes = Vec::with_capacity(groups.len());
                for group in groups {
                    let node = self.builder.alloc([VIEW_TAG]);
                    self.builder.append_child(NodeId::ROOT, node);
                    self.fill_group(node, group, absolute.then_some(source_bounds));
                    nodes.push(node);
                }
                nodes
            }
        };

        let mut model = self.builder.build();
        if !absolute {
            for &node in &group_nodes {
                model.normalize_points(node);
            }
        }

        Materialized {
            model,
            groups: group_nodes,
            cloned_points: self.cloned_points,
        }
    }

    /// Copy the points of every member of `group` into `view`, then clone
    /// each member's subtree under it.
    ///
    /// A point already cloned for an earlier group stays with that group.
    fn fill_group(&mut self, view: NodeId, group: &[NodeId], bounds: Option<Bounds>) {
        if let Some(bounds) = bounds {
            self.builder.set_bounds(view, bounds);
        }
        let source = self.source;
        let mut slots = HashSet::new();
        for &member in group {
            for point in source.points_of(member) {
                if !self.cloned_points.contains_key(&point.index) {
                    let slot = self.builder.push_point(*point);
                    let _ = self.cloned_points.insert(point.index, slot);
                    let _ = slots.insert(slot);
                    self.builder.add_point_to(view, slot);
                }
            }
        }
        for &member in group {
            let copy = self.clone_node(member, &slots);
            self.builder.append_child(view, copy);
        }
    }

    /// Copy `node` and its subtree, attaching only points in `slots`.
    fn clone_node(&mut self, node: NodeId, slots: &HashSet<usize>) -> NodeId {
        let source = self.source;
        let copy = self.builder.alloc(source.tags(node));
        if let Some(metadata) = source.metadata(node) {
            for (key, value) in metadata {
                self.builder.set_metadata(copy, key.as_str(), value.as_str());
            }
        }
        if let Some(bounds) = source.bounds(node) {
            self.builder.set_bounds(copy, bounds);
        }
        for point in source.points_of(node) {
            if let Some(&slot) = self.cloned_points.get(&point.index)
                && slots.contains(&slot)
            {
                self.builder.add_point_to(copy, slot);
            }
        }
        for &child in source.children(node) {
            let child_copy = self.clone_node(child, slots);
            self.builder.append_child(copy, child_copy);
        }
        copy
    }
}
