//! View selector grammar.
//!
//! ```text
//! selector := group (";" group)*
//! group    := [root "*"] terms          root may itself contain "*"
//! terms    := term ("," term)*
//! term     := step (ws step)*
//! step     := [">" | "&"] tag ["[" range "]"]
//! range    := "even" | "odd" | [n] ["-" m] [":" i]
//! ```
//!
//! Nothing in here fails. Text that cannot be understood is reported to the
//! [`DiagnosticSink`] and replaced by the most permissive reading.

use canopy_common::{DiagnosticSink, Warning};

/// Separates independent groups.
pub const GROUP_SEPARATOR: char = ';';
/// Separates the alternatives of a union.
pub const TERM_SEPARATOR: char = ',';
/// Splits a group into a root selector and a sub-selector.
pub const SUBGROUP_OPERATOR: char = '*';
/// Restricts the next step to direct children.
pub const CHILD_OPERATOR: &str = ">";
/// Intersects the next step with the current candidates.
pub const INTERSECT_OPERATOR: &str = "&";

const COMPONENT: &str = "Selector";

/// One `;`-separated segment of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    /// `a b` - every match joins a single group.
    Single(String),
    /// `a *` - every match of the root selector becomes its own group.
    PerRoot(String),
    /// `a * b` - for each match of `root`, the matches of `sub` below it
    /// form a group.
    Nested {
        /// Selector for the group roots.
        root: String,
        /// Selector evaluated under each root.
        sub: String,
    },
}

/// Split selector text into its groups, skipping blank segments.
#[must_use]
pub fn split_groups(text: &str) -> Vec<GroupSelector> {
    text.split(GROUP_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.rfind(SUBGROUP_OPERATOR) {
            None => GroupSelector::Single(segment.to_owned()),
            Some(at) => {
                let root = segment[..at]
                    .replace(SUBGROUP_OPERATOR, " ")
                    .trim()
                    .to_owned();
                let sub = segment[at + 1..].trim();
                if sub.is_empty() {
                    GroupSelector::PerRoot(root)
                } else {
                    GroupSelector::Nested {
                        root,
                        sub: sub.to_owned(),
                    }
                }
            }
        })
        .collect()
}

/// Split a (sub)selector into its union terms, skipping blank ones.
pub fn split_terms(text: &str) -> impl Iterator<Item = &str> {
    text.split(TERM_SEPARATOR)
        .map(str::trim)
        .filter(|term| !term.is_empty())
}

/// Which elements of a tag's match list a step keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// First index, `None` for the beginning.
    pub start: Option<usize>,
    /// Last index (inclusive), `None` for the end.
    pub end: Option<usize>,
    /// Distance between kept indices, at least 1.
    pub increment: usize,
}

impl Default for IndexRange {
    fn default() -> Self {
        Self::ALL
    }
}

impl IndexRange {
    /// Every match, in order.
    pub const ALL: Self = Self {
        start: None,
        end: None,
        increment: 1,
    };

    /// Parse the text between `[` and `]`.
    ///
    /// Accepts `even`, `odd`, `n`, `n-m`, `n:i`, `n-m:i` and `:i`. Any part
    /// that is not a valid number is reported and falls back to its
    /// default: start 0, end last, increment 1. A reversed `n-m` is reported
    /// and selects the whole list.
    #[must_use]
    pub fn parse(text: &str, sink: &mut dyn DiagnosticSink) -> Self {
        let text = text.trim();
        match text {
            "even" => {
                return Self {
                    increment: 2,
                    ..Self::ALL
                };
            }
            "odd" => {
                return Self {
                    start: Some(1),
                    end: None,
                    increment: 2,
                };
            }
            "" => {
                sink.warn(Warning::new(COMPONENT, "empty index range []"));
                return Self::ALL;
            }
            _ => {}
        }

        let mut range = Self::ALL;
        let (bounds, increment) = match text.split_once(':') {
            Some((bounds, increment)) => (bounds.trim(), Some(increment.trim())),
            None => (text, None),
        };

        if let Some(increment) = increment {
            match increment.parse::<usize>() {
                Ok(step) if step >= 1 => range.increment = step,
                _ => bad_number(sink, text, increment),
            }
        }

        if let Some((start, end)) = bounds.split_once('-') {
            range.start = parse_index(sink, text, start.trim());
            range.end = parse_index(sink, text, end.trim());
            if let (Some(start), Some(end)) = (range.start, range.end)
                && start > end
            {
                sink.warn(Warning::new(
                    COMPONENT,
                    format!("reversed index range [{text}], selecting all"),
                ));
                range.start = None;
                range.end = None;
            }
        } else if !bounds.is_empty() {
            range.start = parse_index(sink, text, bounds);
            if increment.is_none() {
                range.end = range.start;
            }
        }
        range
    }

    /// Indices to keep out of a match list of length `len`.
    ///
    /// A start past the end of the list is reported and treated as 0; an
    /// end past the end is clamped to the last index.
    #[must_use]
    pub fn indices(&self, len: usize, sink: &mut dyn DiagnosticSink) -> Vec<usize> {
        if len == 0 {
            return Vec::new();
        }
        let last = len - 1;
        let mut start = self.start.unwrap_or(0);
        if start > last {
            sink.warn(Warning::new(
                COMPONENT,
                format!("index {start} out of range for {len} matches, selecting all"),
            ));
            start = 0;
        }
        let end = self.end.map_or(last, |end| end.min(last));
        if start > end {
            return Vec::new();
        }
        (start..=end).step_by(self.increment.max(1)).collect()
    }
}

fn parse_index(sink: &mut dyn DiagnosticSink, range: &str, number: &str) -> Option<usize> {
    number.parse::<usize>().map_or_else(
        |_| {
            bad_number(sink, range, number);
            None
        },
        Some,
    )
}

fn bad_number(sink: &mut dyn DiagnosticSink, range: &str, number: &str) {
    sink.warn(Warning::new(
        COMPONENT,
        format!("bad number '{number}' in index range [{range}]"),
    ));
}

/// One tag step of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Tag to look up.
    pub tag: String,
    /// Only look at direct children instead of all descendants.
    pub direct_children: bool,
    /// Keep only matches that were already candidates.
    pub intersect: bool,
    /// Which matches per search node to keep.
    pub range: IndexRange,
}

impl Step {
    /// Parse `tag` or `tag[range]`.
    ///
    /// A `[` without a closing `]` is reported; the tag is the text before
    /// the `[` and every match is kept.
    #[must_use]
    pub fn parse(text: &str, sink: &mut dyn DiagnosticSink) -> Self {
        let Some(open) = text.find('[') else {
            return Self::plain(text, IndexRange::ALL);
        };
        let tag = &text[..open];
        let range = match text[open + 1..].find(']') {
            Some(close) => IndexRange::parse(&text[open + 1..open + 1 + close], sink),
            None => {
                sink.warn(Warning::new(
                    COMPONENT,
                    format!("unterminated index range in '{text}', selecting all"),
                ));
                IndexRange::ALL
            }
        };
        Self::plain(tag, range)
    }

    fn plain(tag: &str, range: IndexRange) -> Self {
        Self {
            tag: tag.to_owned(),
            direct_children: false,
            intersect: false,
            range,
        }
    }
}

/// A whitespace-separated chain of steps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Term {
    /// Steps in evaluation order.
    pub steps: Vec<Step>,
}

impl Term {
    /// Parse a term.
    ///
    /// `>` and `&` may stand alone or be glued to the following tag, and
    /// apply to that one step only. An operator with no tag after it is
    /// reported and ignored.
    #[must_use]
    pub fn parse(text: &str, sink: &mut dyn DiagnosticSink) -> Self {
        let mut steps = Vec::new();
        let mut direct_children = false;
        let mut intersect = false;

        for token in text.split_whitespace() {
            let mut rest = token;
            loop {
                if let Some(after) = rest.strip_prefix(CHILD_OPERATOR) {
                    direct_children = true;
                    rest = after;
                } else if let Some(after) = rest.strip_prefix(INTERSECT_OPERATOR) {
                    intersect = true;
                    rest = after;
                } else {
                    break;
                }
            }
            if rest.is_empty() {
                continue;
            }

            let mut step = Step::parse(rest, sink);
            step.direct_children = direct_children;
            step.intersect = intersect;
            steps.push(step);
            direct_children = false;
            intersect = false;
        }

        if direct_children || intersect {
            sink.warn(Warning::new(
                COMPONENT,
                format!("operator without a following tag in '{text}'"),
            ));
        }
        Self { steps }
    }
}

#[cfg(test)]
mod tests {
    use canopy_common::Diagnostics;

    use super::*;

    #[test]
    fn operators_glued_to_tags() {
        let mut diagnostics = Diagnostics::new();
        let term = Term::parse(">strip &led[odd]", &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(term.steps.len(), 2);
        assert!(term.steps[0].direct_children);
        assert!(!term.steps[0].intersect);
        assert!(term.steps[1].intersect);
        assert_eq!(term.steps[1].tag, "led");
        assert_eq!(term.steps[1].range.start, Some(1));
    }

    #[test]
    fn dangling_operator_warns() {
        let mut diagnostics = Diagnostics::new();
        let term = Term::parse("strip >", &mut diagnostics);
        assert_eq!(term.steps.len(), 1);
        assert!(!term.steps[0].direct_children);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn increment_only() {
        let mut diagnostics = Diagnostics::new();
        let range = IndexRange::parse(":3", &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(range.indices(7, &mut diagnostics), vec![0, 3, 6]);
    }
}
