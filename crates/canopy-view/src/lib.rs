//! Selector-driven views over Canopy models.
//!
//! # Scope
//!
//! This crate implements:
//! - **Selector grammar** ([`selector`])
//!   - `;` groups, `*` subgroups, `,` unions
//!   - descendant steps, `>` child steps, `&` intersections
//!   - `[n]`, `[n-m]`, `[n:i]`, `[n-m:i]`, `[even]`, `[odd]` index ranges
//!
//! - **Resolution** ([`resolve`])
//!   - step-by-step search from a root node
//!   - partitioning into disjoint groups, ancestors taking precedence
//!
//! - **Materialization** ([`view`])
//!   - copied points and cloned subtrees in a private model
//!   - relative or absolute normalization
//!   - registration with the source model
//!
//! - **Lifecycle** ([`binding`])
//!   - rebuilding a view whenever its settings change
//!
//! # Example
//!
//! ```ignore
//! let view = View::create(&model, "strip[even]; panel * >strip", Normalization::Relative)?;
//! for point in view.points() { /* ... */ }
//! view.dispose();
//! ```

/// Owner of a reconfigurable view.
pub mod binding;
/// Selector text into disjoint groups of nodes.
pub mod resolve;
/// Selector grammar.
pub mod selector;
/// View materialization and normalization.
pub mod view;

pub use binding::ViewBinding;
pub use resolve::{Group, parse_groups};
pub use view::{Normalization, VIEW_TAG, View, ViewError};
