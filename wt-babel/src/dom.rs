//! DOM utilities over `markup5ever_rcdom` and the metadata side table.
//!
//! The serializer never parses `data-parsoid` from an attribute string at
//! access time; ingestion lifts the JSON into [`MetaDb`] once, keyed by node
//! identity, and everything downstream reads the typed records.

use crate::meta::{DataMw, DataParsoid, DiffMark};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::HashMap;
use std::rc::Rc;

/// Stable identity of a DOM node for the lifetime of its tree.
pub type NodeId = usize;

pub fn node_id(node: &Handle) -> NodeId {
    Rc::as_ptr(node) as NodeId
}

/// Side table of round-trip metadata, keyed by node identity.
#[derive(Debug, Default)]
pub struct MetaDb {
    parsoid: HashMap<NodeId, DataParsoid>,
    mw: HashMap<NodeId, DataMw>,
    diff: HashMap<NodeId, DiffMark>,
}

impl MetaDb {
    pub fn new() -> Self {
        MetaDb::default()
    }

    pub fn dp(&self, node: &Handle) -> Option<&DataParsoid> {
        self.parsoid.get(&node_id(node))
    }

    pub fn dp_mut(&mut self, node: &Handle) -> &mut DataParsoid {
        self.parsoid.entry(node_id(node)).or_default()
    }

    pub fn set_dp(&mut self, node: &Handle, dp: DataParsoid) {
        self.parsoid.insert(node_id(node), dp);
    }

    pub fn mw(&self, node: &Handle) -> Option<&DataMw> {
        self.mw.get(&node_id(node))
    }

    pub fn set_mw(&mut self, node: &Handle, mw: DataMw) {
        self.mw.insert(node_id(node), mw);
    }

    /// Attach a diff mark; callers are the diff pre-pass and tests.
    pub fn mark(&mut self, node: &Handle, mark: DiffMark) {
        self.diff.insert(node_id(node), mark);
    }

    pub fn diff_mark(&self, node: &Handle) -> Option<DiffMark> {
        self.diff.get(&node_id(node)).copied()
    }

    pub fn is_marked(&self, node: &Handle) -> bool {
        self.diff.contains_key(&node_id(node))
    }

    /// Syntax hint helper: true when the element came from literal HTML.
    pub fn has_html_syntax(&self, node: &Handle) -> bool {
        self.dp(node)
            .map(|dp| dp.stx == Some(crate::meta::Syntax::Html))
            .unwrap_or(false)
    }
}

// Navigation.

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

pub fn children_of(node: &Handle) -> Vec<Handle> {
    node.children.borrow().iter().cloned().collect()
}

fn child_index(parent: &Handle, node: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, node))
}

pub fn prev_sibling(node: &Handle) -> Option<Handle> {
    let parent = parent_of(node)?;
    let idx = child_index(&parent, node)?;
    if idx == 0 {
        None
    } else {
        parent.children.borrow().get(idx - 1).cloned()
    }
}

pub fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = parent_of(node)?;
    let idx = child_index(&parent, node)?;
    let sibling = parent.children.borrow().get(idx + 1).cloned();
    sibling
}

/// Previous sibling that is not a separator node.
pub fn prev_non_sep_sibling(node: &Handle) -> Option<Handle> {
    let mut current = prev_sibling(node);
    while let Some(n) = current {
        if !is_separator_node(&n) {
            return Some(n);
        }
        current = prev_sibling(&n);
    }
    None
}

/// Next sibling that is not a separator node.
pub fn next_non_sep_sibling(node: &Handle) -> Option<Handle> {
    let mut current = next_sibling(node);
    while let Some(n) = current {
        if !is_separator_node(&n) {
            return Some(n);
        }
        current = next_sibling(&n);
    }
    None
}

/// Remove `node` from its parent's child list.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        let mut children = parent.children.borrow_mut();
        if let Some(idx) = children.iter().position(|c| Rc::ptr_eq(c, node)) {
            children.remove(idx);
        }
    }
    node.parent.set(None);
}

// Node classification and access.

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

pub fn is_comment(node: &Handle) -> bool {
    matches!(node.data, NodeData::Comment { .. })
}

/// Lowercase element name, or `None` for non-elements.
pub fn element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&name.local),
        _ => None,
    }
}

pub fn is_element_named(node: &Handle, tag: &str) -> bool {
    element_name(node) == Some(tag)
}

/// Display name for diagnostics: element name, `#text`, or `#comment`.
pub fn node_name(node: &Handle) -> String {
    match &node.data {
        NodeData::Element { name, .. } => name.local.to_string(),
        NodeData::Text { .. } => "#text".to_string(),
        NodeData::Comment { .. } => "#comment".to_string(),
        NodeData::Document => "#document".to_string(),
        _ => "#other".to_string(),
    }
}

pub fn get_attr(node: &Handle, attr: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_attr(node: &Handle, attr: &str) -> bool {
    get_attr(node, attr).is_some()
}

/// All attributes as (name, value) pairs, in document order.
pub fn attributes_of(node: &Handle) -> Vec<(String, String)> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub fn comment_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Comment { contents } => Some(contents.to_string()),
        _ => None,
    }
}

/// Concatenated text of the node's subtree.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// True if every child is a text node.
pub fn all_children_are_text(node: &Handle) -> bool {
    let children = node.children.borrow();
    !children.is_empty() && children.iter().all(is_text)
}

pub fn is_whitespace_text(node: &Handle) -> bool {
    match text_of(node) {
        Some(text) => text.chars().all(char::is_whitespace),
        None => false,
    }
}

/// Separator nodes are whitespace-only text and comments; they carry no
/// content of their own.
pub fn is_separator_node(node: &Handle) -> bool {
    is_comment(node) || is_whitespace_text(node)
}

pub fn first_non_sep_child(node: &Handle) -> Option<Handle> {
    node.children
        .borrow()
        .iter()
        .find(|c| !is_separator_node(c))
        .cloned()
}

pub fn last_non_sep_child(node: &Handle) -> Option<Handle> {
    node.children
        .borrow()
        .iter()
        .rev()
        .find(|c| !is_separator_node(c))
        .cloned()
}

/// Deepest last child reachable by following `lastChild` links.
pub fn deepest_last_descendant(node: &Handle) -> Handle {
    let mut current = node.clone();
    loop {
        let last = current.children.borrow().last().cloned();
        match last {
            Some(child) => current = child,
            None => return current,
        }
    }
}

// Element category tables.

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Tags the legacy parser treats as block scope openers.
pub const BLOCK_SCOPE_ELEMENTS: &[&str] = &[
    "blockquote", "center", "dd", "div", "dl", "dt", "li", "ol", "p", "pre", "table", "td",
    "th", "tr", "ul",
];

/// Right-hand neighbours whose separator may keep trailing indentation
/// without triggering an indent-pre.
pub const PRE_SAFE_ELEMENTS: &[&str] = &["br", "table", "tbody", "caption", "tr", "td", "th"];

pub const LIST_ELEMENTS: &[&str] = &["ul", "ol", "dl"];
pub const LIST_ITEM_ELEMENTS: &[&str] = &["li", "dt", "dd"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_block_scope_element(name: &str) -> bool {
    BLOCK_SCOPE_ELEMENTS.contains(&name)
}

pub fn is_pre_safe(node: &Handle) -> bool {
    element_name(node).is_some_and(|n| PRE_SAFE_ELEMENTS.contains(&n))
}

pub fn is_list(node: &Handle) -> bool {
    element_name(node).is_some_and(|n| LIST_ELEMENTS.contains(&n))
}

pub fn is_list_item(node: &Handle) -> bool {
    element_name(node).is_some_and(|n| LIST_ITEM_ELEMENTS.contains(&n))
}

pub fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// The `<body>` of a parsed document.
pub fn body_of(dom: &RcDom) -> Option<Handle> {
    let html = dom
        .document
        .children
        .borrow()
        .iter()
        .find(|c| is_element_named(c, "html"))
        .cloned()?;
    let body = html
        .children
        .borrow()
        .iter()
        .find(|c| is_element_named(c, "body"))
        .cloned();
    body
}
