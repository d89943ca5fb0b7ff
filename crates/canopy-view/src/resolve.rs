//! Turning selector text into disjoint groups of model nodes.
//!
//! Resolution walks each term step by step from a root node, then hands the
//! final candidates to the partitioning pass, which keeps the set of claimed
//! nodes free of ancestor/descendant pairs across every group.

use std::collections::HashSet;
use std::mem;

use canopy_common::DiagnosticSink;
use canopy_model::{Model, NodeId};

use crate::selector::{GroupSelector, Term, split_groups, split_terms};

/// An ordered list of disjoint nodes that make up one group view.
pub type Group = Vec<NodeId>;

/// Whether the matches of a selector go into the view or only serve as
/// roots for a further search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Terminal,
    NonTerminal,
}

/// Resolve `selector` against `model` into its groups.
///
/// Every node in the result belongs to exactly one group, no node is an
/// ancestor of another, and groups left empty by subsumption are dropped.
#[must_use]
pub fn parse_groups(model: &Model, selector: &str, sink: &mut dyn DiagnosticSink) -> Vec<Group> {
    let mut state = ParseState::new(model, sink);
    for group in split_groups(selector) {
        state.parse_group(&group);
    }
    state.finish()
}

struct ParseState<'a> {
    model: &'a Model,
    sink: &'a mut dyn DiagnosticSink,
    groups: Vec<Group>,
    claimed: HashSet<NodeId>,
}

impl<'a> ParseState<'a> {
    fn new(model: &'a Model, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            model,
            sink,
            groups: Vec::new(),
            claimed: HashSet::new(),
        }
    }

    fn finish(self) -> Vec<Group> {
        self.groups
            .into_iter()
            .filter(|group| !group.is_empty())
            .collect()
    }

    fn parse_group(&mut self, selector: &GroupSelector) {
        let root = self.model.root();
        match selector {
            GroupSelector::Single(text) => {
                let mut group = Group::new();
                self.resolve(root, &mut group, text, Resolution::Terminal);
                self.push_group(group);
            }
            GroupSelector::PerRoot(text) => {
                let mut roots = Group::new();
                self.resolve(root, &mut roots, text, Resolution::Terminal);
                for group_root in roots {
                    self.push_group(vec![group_root]);
                }
            }
            GroupSelector::Nested { root: text, sub } => {
                let mut roots = Group::new();
                self.resolve(root, &mut roots, text, Resolution::NonTerminal);
                for group_root in roots {
                    let mut group = Group::new();
                    self.resolve(group_root, &mut group, sub, Resolution::Terminal);
                    self.push_group(group);
                }
            }
        }
    }

    fn push_group(&mut self, group: Group) {
        if !group.is_empty() {
            self.groups.push(group);
        }
    }

    /// Resolve every union term of `text` from `root` into `group`.
    fn resolve(&mut self, root: NodeId, group: &mut Group, text: &str, resolution: Resolution) {
        for term in split_terms(text) {
            let term = Term::parse(term, self.sink);
            let candidates = self.evaluate(root, &term);
            match resolution {
                Resolution::Terminal => self.claim(group, candidates),
                Resolution::NonTerminal => {
                    let mut seen: HashSet<NodeId> = group.iter().copied().collect();
                    group.extend(candidates.into_iter().filter(|&node| seen.insert(node)));
                }
            }
        }
    }

    /// Walk the steps of `term` from `root`.
    ///
    /// Claimed nodes are never returned: whatever they lead to is already
    /// covered by their claim.
    fn evaluate(&mut self, root: NodeId, term: &Term) -> Vec<NodeId> {
        if term.steps.is_empty() {
            return Vec::new();
        }

        let model = self.model;
        let mut candidates = vec![root];
        let mut search_space = Vec::new();

        for step in &term.steps {
            // An intersection re-queries the previous search space and keeps
            // what the previous step also matched.
            let intersect_with: Option<HashSet<NodeId>> = if step.intersect {
                Some(candidates.drain(..).collect())
            } else {
                search_space = mem::take(&mut candidates);
                None
            };

            let mut seen = HashSet::new();
            for &node in &search_space {
                let matches = if step.direct_children {
                    model.children_tagged(node, &step.tag)
                } else {
                    model.sub(node, &step.tag)
                };
                for index in step.range.indices(matches.len(), self.sink) {
                    let found = matches[index];
                    if !self.claimed.contains(&found) && seen.insert(found) {
                        candidates.push(found);
                    }
                }
            }

            if let Some(previous) = intersect_with {
                candidates.retain(|node| previous.contains(node));
            }
        }
        candidates
    }

    /// Add terminal candidates to `group`, keeping the claimed set free of
    /// ancestor/descendant pairs.
    ///
    /// A candidate inside an existing claim is dropped. A candidate that
    /// encloses existing claims takes their place, wherever they were.
    fn claim(&mut self, group: &mut Group, candidates: Vec<NodeId>) {
        let model = self.model;
        for candidate in candidates {
            if self.claimed.contains(&candidate)
                || model
                    .ancestors(candidate)
                    .any(|ancestor| self.claimed.contains(&ancestor))
            {
                continue;
            }

            let subsumed = self.claimed_below(candidate);
            if !subsumed.is_empty() {
                self.claimed.retain(|node| !subsumed.contains(node));
                for existing in &mut self.groups {
                    existing.retain(|node| !subsumed.contains(node));
                }
                group.retain(|node| !subsumed.contains(node));
            }

            let _ = self.claimed.insert(candidate);
            group.push(candidate);
        }
    }

    /// Claimed nodes strictly inside the subtree of `node`. The walk does
    /// not descend into claimed nodes.
    fn claimed_below(&self, node: NodeId) -> HashSet<NodeId> {
        let mut found = HashSet::new();
        let mut stack: Vec<NodeId> = self.model.children(node).to_vec();
        while let Some(id) = stack.pop() {
            if self.claimed.contains(&id) {
                let _ = found.insert(id);
            } else {
                stack.extend_from_slice(self.model.children(id));
            }
        }
        found
    }
}
