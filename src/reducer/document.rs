use kuchiki::{NodeData, NodeRef};
use std::fmt;
use url::Url;

use crate::reducer::rules::NodeFacts;

/// Parsed page tree plus the `<base href>` seen before `head` was dropped.
#[derive(Clone)]
pub struct Document {
    root: NodeRef,
    base_href: Option<String>,
}

impl Document {
    pub(crate) fn new(root: NodeRef, base_href: Option<String>) -> Self {
        Self { root, base_href }
    }

    pub fn empty() -> Self {
        Self::new(NodeRef::new_document(), None)
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn base_href(&self) -> Option<&str> {
        self.base_href.as_deref()
    }

    /// URL that relative links resolve against.
    pub fn base_url(&self, page_url: &Url) -> Url {
        self.base_href
            .as_deref()
            .and_then(|href| page_url.join(href).ok())
            .unwrap_or_else(|| page_url.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.root.first_child().is_none()
    }

    pub fn element_count(&self) -> usize {
        self.root
            .descendants()
            .filter(|node| node.as_element().is_some())
            .count()
    }

    pub fn text(&self) -> String {
        self.root.text_contents()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.element_count())
            .field("base_href", &self.base_href)
            .finish()
    }
}

pub(crate) fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.to_lowercase())
}

pub(crate) fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub(crate) fn facts(node: &NodeRef) -> Option<NodeFacts> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    let attrs = attributes
        .map
        .iter()
        .map(|(name, attribute)| (name.local.to_lowercase(), attribute.value.clone()))
        .collect();
    Some(NodeFacts::new(element.name.local.to_lowercase(), attrs))
}

pub(crate) fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children()
        .filter(|child| matches!(child.data(), NodeData::Element(_)))
        .collect()
}
