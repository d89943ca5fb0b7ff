//! Arena tree of model nodes and the builder that produces it.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::point::{Bounds, Point};
use crate::registry::{ModelError, ViewId, ViewRegistry};

/// A type-safe index into a model tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// One node of a built [`Model`].
///
/// Holds its relationships, its tags and metadata, the slots of every point
/// in its subtree, and the tag index used by [`Model::children_tagged`] and
/// [`Model::sub`].
#[derive(Debug, Clone)]
pub struct ModelNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tags: Vec<String>,
    metadata: BTreeMap<String, String>,
    points: Vec<usize>,
    bounds: Bounds,
    children_by_tag: HashMap<String, Vec<NodeId>>,
    sub_by_tag: HashMap<String, Vec<NodeId>>,
}

impl ModelNode {
    /// Parent node, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in tree order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Tags of this node, without duplicates.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether this node carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Free-form key/value metadata.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Slots (into [`Model::points`]) of every point in this subtree. The
    /// node's own points come first, then each child's in order.
    #[must_use]
    pub fn point_slots(&self) -> &[usize] {
        &self.points
    }

    /// Normalization bounds of this node.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// An immutable tree of tagged nodes over a set of points.
///
/// Node structure, tags and metadata are fixed once [`ModelBuilder::build`]
/// returns; only point coordinates may still be edited. The model also keeps
/// the registry of views derived from it.
#[derive(Debug)]
pub struct Model {
    nodes: Vec<ModelNode>,
    points: Vec<Point>,
    slots_by_index: HashMap<usize, usize>,
    views: ViewRegistry,
}

impl Model {
    /// Get the root node ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ModelNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (a built model always has its root).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every point of the model, in slot order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mutable access to point coordinates. The tree structure is not
    /// affected.
    pub fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }

    /// Points in the subtree of `id`, own points first.
    pub fn points_of(&self, id: NodeId) -> impl Iterator<Item = &Point> + '_ {
        self.point_slots(id).iter().map(|&slot| &self.points[slot])
    }

    /// Slots of the points in the subtree of `id`.
    #[must_use]
    pub fn point_slots(&self, id: NodeId) -> &[usize] {
        self.node(id).map(ModelNode::point_slots).unwrap_or_default()
    }

    /// Look up a point by its identity.
    #[must_use]
    pub fn point_by_index(&self, index: usize) -> Option<&Point> {
        self.slots_by_index
            .get(&index)
            .map(|&slot| &self.points[slot])
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(ModelNode::parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(ModelNode::children).unwrap_or_default()
    }

    /// Direct children of `id` carrying `tag`, in tree order.
    #[must_use]
    pub fn children_tagged(&self, id: NodeId, tag: &str) -> &[NodeId] {
        self.node(id)
            .and_then(|n| n.children_by_tag.get(tag))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Descendants of `id` at any depth carrying `tag`, in tree order
    /// (a node comes before its own descendants).
    #[must_use]
    pub fn sub(&self, id: NodeId, tag: &str) -> &[NodeId] {
        self.node(id)
            .and_then(|n| n.sub_by_tag.get(tag))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Tags of `id`.
    #[must_use]
    pub fn tags(&self, id: NodeId) -> &[String] {
        self.node(id).map(ModelNode::tags).unwrap_or_default()
    }

    /// Whether `id` carries `tag`.
    #[must_use]
    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.node(id).is_some_and(|n| n.has_tag(tag))
    }

    /// Metadata of `id`.
    #[must_use]
    pub fn metadata(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        self.node(id).map(ModelNode::metadata)
    }

    /// Normalization bounds of `id`.
    #[must_use]
    pub fn bounds(&self, id: NodeId) -> Option<Bounds> {
        self.node(id).map(ModelNode::bounds)
    }

    /// Whether `node` is `ancestor` itself or one of its descendants.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|id| id == ancestor)
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            model: self,
            current: self.parent(id),
        }
    }

    /// Rewrite the normalized values of every point under `id` against the
    /// bounds of `id`.
    pub fn normalize_points(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let mut selected: Vec<(usize, Point)> = node
            .points
            .iter()
            .filter_map(|&slot| self.points.get(slot).map(|point| (slot, *point)))
            .collect();
        node.bounds.normalize(selected.iter_mut().map(|(_, point)| point));
        for (slot, point) in selected {
            if let Some(target) = self.points.get_mut(slot) {
                *target = point;
            }
        }
    }

    /// The registry of views derived from this model.
    #[must_use]
    pub const fn view_registry(&self) -> &ViewRegistry {
        &self.views
    }

    /// Record a derived view.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateView`] if `id` is already registered.
    pub fn register_view(&self, id: ViewId) -> Result<(), ModelError> {
        self.views.register(id)
    }

    /// Forget a derived view.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownView`] if `id` is not registered.
    pub fn unregister_view(&self, id: ViewId) -> Result<(), ModelError> {
        self.views.unregister(id)
    }

    /// Ids of the live views derived from this model.
    #[must_use]
    pub fn derived_views(&self) -> Vec<ViewId> {
        self.views.snapshot()
    }

    /// Number of live views derived from this model.
    #[must_use]
    pub fn derived_view_count(&self) -> usize {
        self.views.len()
    }
}

/// Iterator over ancestors of a node.
#[derive(Debug)]
pub struct AncestorIterator<'a> {
    model: &'a Model,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.model.parent(id);
        Some(id)
    }
}

#[derive(Debug, Clone, Default)]
struct PendingNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tags: Vec<String>,
    metadata: BTreeMap<String, String>,
    own_points: Vec<usize>,
    bounds: Option<Bounds>,
}

/// Incremental construction of a [`Model`].
///
/// The root node exists from the start at [`NodeId::ROOT`]. Nodes are
/// allocated detached and attached with [`ModelBuilder::append_child`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    nodes: Vec<PendingNode>,
    points: Vec<Point>,
    normalize: bool,
}

impl ModelBuilder {
    /// Create a builder whose root carries `root_tags`.
    pub fn new<I, S>(root_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Self {
            nodes: Vec::new(),
            points: Vec::new(),
            normalize: true,
        };
        let _ = builder.alloc(root_tags);
        builder
    }

    /// Keep the normalized values already stored in the points instead of
    /// normalizing them against the root bounds in [`ModelBuilder::build`].
    #[must_use]
    pub const fn preserve_normalization(mut self) -> Self {
        self.normalize = false;
        self
    }

    /// Add a new point whose identity is its insertion order. Returns its
    /// slot.
    pub fn add_point(&mut self, x: f32, y: f32, z: f32) -> usize {
        let slot = self.points.len();
        self.points.push(Point::new(slot, x, y, z));
        slot
    }

    /// Add an existing point, keeping its identity. Returns its slot.
    pub fn push_point(&mut self, point: Point) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc<I, S>(&mut self, tags: I) -> NodeId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = PendingNode::default();
        for tag in tags {
            let tag = tag.as_ref();
            if !node.tags.iter().any(|t| t == tag) {
                node.tags.push(tag.to_owned());
            }
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either id was not allocated by this builder, or if `child`
    /// already has a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.nodes[child.0].parent.is_none() && child != NodeId::ROOT,
            "node {child:?} is already attached"
        );
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Give the point at `slot` to `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not allocated by this builder.
    pub fn add_point_to(&mut self, node: NodeId, slot: usize) {
        self.nodes[node.0].own_points.push(slot);
    }

    /// Set a metadata entry on `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not allocated by this builder.
    pub fn set_metadata(&mut self, node: NodeId, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.nodes[node.0]
            .metadata
            .insert(key.into(), value.into());
    }

    /// Use `bounds` for `node` instead of computing them from its points.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not allocated by this builder.
    pub fn set_bounds(&mut self, node: NodeId, bounds: Bounds) {
        self.nodes[node.0].bounds = Some(bounds);
    }

    /// Freeze the tree, compute per-node point lists, bounds and tag
    /// indexes, and normalize the points against the root bounds unless
    /// [`ModelBuilder::preserve_normalization`] was requested.
    #[must_use]
    pub fn build(self) -> Model {
        let Self {
            nodes: pending,
            mut points,
            normalize,
        } = self;

        let mut own_points = Vec::with_capacity(pending.len());
        let mut explicit_bounds = Vec::with_capacity(pending.len());
        let mut nodes: Vec<ModelNode> = Vec::with_capacity(pending.len());
        for node in pending {
            own_points.push(node.own_points);
            explicit_bounds.push(node.bounds);
            nodes.push(ModelNode {
                parent: node.parent,
                children: node.children,
                tags: node.tags,
                metadata: node.metadata,
                points: Vec::new(),
                bounds: Bounds::default(),
                children_by_tag: HashMap::new(),
                sub_by_tag: HashMap::new(),
            });
        }

        let detached: Vec<NodeId> = (0..nodes.len())
            .map(NodeId)
            .filter(|&id| nodes[id.0].parent.is_none())
            .collect();
        let indexer = Indexer {
            own_points: &own_points,
            explicit_bounds: &explicit_bounds,
            points: &points,
        };
        for id in detached {
            indexer.index_subtree(&mut nodes, id);
        }

        if let Some(root) = nodes.first().filter(|_| normalize) {
            root.bounds.normalize(points.iter_mut());
        }

        let slots_by_index = points
            .iter()
            .enumerate()
            .map(|(slot, point)| (point.index, slot))
            .collect();

        Model {
            nodes,
            points,
            slots_by_index,
            views: ViewRegistry::new(),
        }
    }
}

struct Indexer<'a> {
    own_points: &'a [Vec<usize>],
    explicit_bounds: &'a [Option<Bounds>],
    points: &'a [Point],
}

impl Indexer<'_> {
    /// Fill in point slots, bounds and tag indexes bottom-up.
    fn index_subtree(&self, nodes: &mut [ModelNode], id: NodeId) {
        let children = nodes[id.0].children.clone();
        for &child in &children {
            self.index_subtree(nodes, child);
        }

        let mut seen = HashSet::new();
        let mut slots = Vec::new();
        for &slot in &self.own_points[id.0] {
            if seen.insert(slot) {
                slots.push(slot);
            }
        }

        let mut children_by_tag: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut sub_by_tag: HashMap<String, Vec<NodeId>> = HashMap::new();
        for &child in &children {
            let node = &nodes[child.0];
            for &slot in &node.points {
                if seen.insert(slot) {
                    slots.push(slot);
                }
            }
            for tag in &node.tags {
                children_by_tag.entry(tag.clone()).or_default().push(child);
            }
            // Pre-order: the child itself, then its own matches.
            let mut tags: HashSet<&String> = node.tags.iter().collect();
            tags.extend(node.sub_by_tag.keys());
            for tag in tags {
                let entry = sub_by_tag.entry(tag.clone()).or_default();
                if node.has_tag(tag) {
                    entry.push(child);
                }
                if let Some(below) = node.sub_by_tag.get(tag) {
                    entry.extend_from_slice(below);
                }
            }
        }

        let bounds = self.explicit_bounds[id.0]
            .unwrap_or_else(|| Bounds::from_points(slots.iter().map(|&slot| &self.points[slot])));

        let node = &mut nodes[id.0];
        node.points = slots;
        node.bounds = bounds;
        node.children_by_tag = children_by_tag;
        node.sub_by_tag = sub_by_tag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tags_collapse() {
        let mut builder = ModelBuilder::new(["model"]);
        let node = builder.alloc(["strip", "strip", "led"]);
        builder.append_child(NodeId::ROOT, node);
        let model = builder.build();
        assert_eq!(model.tags(node), &["strip".to_string(), "led".to_string()]);
    }

    #[test]
    fn shared_points_are_listed_once() {
        let mut builder = ModelBuilder::new(["model"]);
        let p = builder.add_point(1.0, 2.0, 3.0);
        let child = builder.alloc(["strip"]);
        builder.append_child(NodeId::ROOT, child);
        builder.add_point_to(NodeId::ROOT, p);
        builder.add_point_to(child, p);
        let model = builder.build();
        assert_eq!(model.point_slots(NodeId::ROOT), &[p]);
        assert_eq!(model.point_slots(child), &[p]);
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn attaching_twice_panics() {
        let mut builder = ModelBuilder::new(["model"]);
        let a = builder.alloc(["a"]);
        let b = builder.alloc(["b"]);
        builder.append_child(NodeId::ROOT, a);
        builder.append_child(b, a);
    }
}
