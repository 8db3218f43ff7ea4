//! Depth-first tree queries
//!
//! Every query walks the descendants of a starting node in document order
//! (pre-order: a node is visited before its children). The starting node itself
//! is never a match.

use crate::document::{Document, NodeId};

/// Pre-order iterator over the descendants of a node
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}

/// Iterate over every descendant of `from` in document order
#[must_use]
pub fn descendants(doc: &Document, from: NodeId) -> Descendants<'_> {
    Descendants {
        doc,
        stack: doc.children(from).iter().rev().copied().collect(),
    }
}

/// First descendant element with the given tag
#[must_use]
pub fn find_first_by_tag(doc: &Document, from: NodeId, tag: &str) -> Option<NodeId> {
    descendants(doc, from).find(|id| doc.has_tag(*id, tag))
}

/// First descendant element with the given tag whose attribute equals `value`
#[must_use]
pub fn find_first_by_tag_and_attribute(
    doc: &Document,
    from: NodeId,
    tag: &str,
    attribute: &str,
    value: &str,
) -> Option<NodeId> {
    descendants(doc, from)
        .find(|id| doc.has_tag(*id, tag) && doc.attribute(*id, attribute) == Some(value))
}

/// First descendant element with the given tag whose attribute contains `needle`
#[must_use]
pub fn find_first_by_tag_and_attribute_containing(
    doc: &Document,
    from: NodeId,
    tag: &str,
    attribute: &str,
    needle: &str,
) -> Option<NodeId> {
    descendants(doc, from).find(|id| {
        doc.has_tag(*id, tag)
            && doc
                .attribute(*id, attribute)
                .is_some_and(|value| value.contains(needle))
    })
}

/// Every descendant element with the given tag, in document order
#[must_use]
pub fn collect_by_tag(doc: &Document, from: NodeId, tag: &str) -> Vec<NodeId> {
    descendants(doc, from)
        .filter(|id| doc.has_tag(*id, tag))
        .collect()
}

/// Every descendant element with the given tag that carries `attribute`
#[must_use]
pub fn collect_by_tag_with_attribute(
    doc: &Document,
    from: NodeId,
    tag: &str,
    attribute: &str,
) -> Vec<NodeId> {
    descendants(doc, from)
        .filter(|id| doc.has_tag(*id, tag) && doc.attribute(*id, attribute).is_some())
        .collect()
}
