//! JSON description of a model.
//!
//! ```json
//! {
//!   "tags": ["model"],
//!   "children": [
//!     { "tags": ["strip"], "metadata": { "name": "a" }, "points": [[0, 0, 0], [1, 0, 0]] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use canopy_model::{Model, ModelBuilder, NodeId};
use serde::Deserialize;

/// Tag given to the root when the description names none.
const DEFAULT_ROOT_TAG: &str = "model";

/// One node of a model description. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDescription {
    /// Tags of the node.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form key/value pairs.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Points owned directly by the node.
    #[serde(default)]
    pub points: Vec<[f32; 3]>,
    /// Child nodes, in order.
    #[serde(default)]
    pub children: Vec<Self>,
}

impl NodeDescription {
    /// Parse a description from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Build the described model. Points are numbered in document order.
    #[must_use]
    pub fn build(&self) -> Model {
        let mut builder = if self.tags.is_empty() {
            ModelBuilder::new([DEFAULT_ROOT_TAG])
        } else {
            ModelBuilder::new(&self.tags)
        };
        self.fill(&mut builder, NodeId::ROOT);
        builder.build()
    }

    fn fill(&self, builder: &mut ModelBuilder, node: NodeId) {
        for (key, value) in &self.metadata {
            builder.set_metadata(node, key.as_str(), value.as_str());
        }
        for &[x, y, z] in &self.points {
            let slot = builder.add_point(x, y, z);
            builder.add_point_to(node, slot);
        }
        for child in &self.children {
            let child_node = builder.alloc(&child.tags);
            builder.append_child(node, child_node);
            child.fill(builder, child_node);
        }
    }
}
