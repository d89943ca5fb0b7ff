//! Point model tree for the Canopy view engine.
//!
//! A model is a tree of nodes. Every node carries a set of string tags,
//! optional metadata, normalization bounds, and the points of its subtree.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! the same way the points are addressed by slot. A [`Model`] is produced by a
//! [`ModelBuilder`] and its structure is frozen from then on, which lets
//! `build` precompute a tag index for each node so that tag lookups never
//! rescan the tree.

mod point;
mod registry;
mod tree;

pub use point::{Bounds, Point};
pub use registry::{ModelError, ViewId, ViewRegistry};
pub use tree::{AncestorIterator, Model, ModelBuilder, ModelNode, NodeId};
