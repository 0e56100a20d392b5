use kuchiki::NodeRef;
use std::collections::BTreeMap;
use tracing::debug;

use crate::reducer::document::{Document, attr, element_children, facts, tag_name};
use crate::reducer::rules::{Removal, RuleTables};

/// Upper bound on fixed-point passes. Real pages settle in two.
pub const MAX_PASSES: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub passes: usize,
    pub removed: usize,
    pub stripped_attributes: usize,
    pub by_rule: BTreeMap<Removal, usize>,
    pub collapsed_empty: usize,
}

impl PruneReport {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.stripped_attributes == 0
    }
}

#[derive(Debug)]
struct PassDelta {
    removed: usize,
    stripped: usize,
    collapsed: usize,
}

impl PassDelta {
    fn changed(&self) -> bool {
        self.removed + self.stripped + self.collapsed > 0
    }
}

pub fn prune(doc: &Document) -> PruneReport {
    prune_with(doc, &RuleTables::default())
}

/// Remove noise subtrees and presentational attributes until a full pass
/// changes nothing, or [`MAX_PASSES`] is hit.
pub fn prune_with(doc: &Document, rules: &RuleTables) -> PruneReport {
    let mut report = PruneReport::default();

    for _ in 0..MAX_PASSES {
        report.passes += 1;

        let delta = PassDelta {
            removed: remove_noise(doc.root(), rules, &mut report.by_rule),
            stripped: strip_attributes(doc.root(), rules),
            collapsed: collapse_empty(doc.root(), rules),
        };

        report.removed += delta.removed + delta.collapsed;
        report.stripped_attributes += delta.stripped;
        report.collapsed_empty += delta.collapsed;

        if !delta.changed() {
            break;
        }
    }

    debug!(
        passes = report.passes,
        removed = report.removed,
        stripped = report.stripped_attributes,
        collapsed = report.collapsed_empty,
        "pruned document"
    );
    report
}

/// Rules 1-5. Walks top-down and never descends into a removed subtree.
fn remove_noise(
    root: &NodeRef,
    rules: &RuleTables,
    by_rule: &mut BTreeMap<Removal, usize>,
) -> usize {
    let mut removed = 0;
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        for child in element_children(&node) {
            let verdict = facts(&child).and_then(|f| rules.classify(&f));
            match verdict {
                Some(rule) => {
                    child.detach();
                    *by_rule.entry(rule).or_default() += 1;
                    removed += 1;
                }
                None => stack.push(child),
            }
        }
    }
    removed
}

/// Rule 6, applied to survivors only.
fn strip_attributes(root: &NodeRef, rules: &RuleTables) -> usize {
    let mut stripped = 0;

    for node in root.descendants() {
        let Some(element) = node.as_element() else {
            continue;
        };
        let tag = element.name.local.to_lowercase();
        let mut attributes = element.attributes.borrow_mut();

        let doomed: Vec<_> = attributes
            .map
            .keys()
            .filter(|name| rules.should_strip_attribute(&tag, &name.local))
            .cloned()
            .collect();

        for name in doomed {
            attributes.map.remove(&name);
            stripped += 1;
        }
    }
    stripped
}

/// Rule 7. Drops the largest empty subtree first.
fn collapse_empty(root: &NodeRef, rules: &RuleTables) -> usize {
    let mut collapsed = 0;
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        for child in element_children(&node) {
            if is_empty_subtree(&child, rules) {
                child.detach();
                collapsed += 1;
            } else {
                stack.push(child);
            }
        }
    }
    collapsed
}

fn is_empty_subtree(node: &NodeRef, rules: &RuleTables) -> bool {
    let Some(tag) = tag_name(node) else {
        return false;
    };
    if rules.is_void_content(&tag) {
        return false;
    }
    if !node.text_contents().trim().is_empty() {
        return false;
    }
    !node.descendants().any(|n| bears_content(&n))
}

/// An `<input>` carrying a visible value, e.g. a "Book" submit button.
fn bears_content(node: &NodeRef) -> bool {
    tag_name(node).as_deref() == Some("input")
        && attr(node, "value").is_some_and(|v| !v.trim().is_empty())
}
