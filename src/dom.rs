//! DOM access and the selector/scope matcher.
//!
//! The engine never touches a concrete DOM. It talks to [`DomView`], a small
//! capability trait covering what delegated matching and field extraction
//! need. Every capability that a node may lack (`checkValidity` on a `div`,
//! `checked` on a link) returns `Option`, and `None` is read as "capability
//! absent": the node does not match, or contributes no data.
//!
//! [`Document`] is an arena-backed implementation used by the [`Page`](crate::Page)
//! harness, the CLI and tests.
//!
//! ## Matcher contract
//!
//! - [`matches`]: `true` iff the node exists and satisfies the selector.
//! - [`has_ancestor`]: walks the inclusive ancestor chain and returns `true`
//!   on the first node satisfying the selector.
//!
//! Both are read-only and never fail; malformed selectors simply do not match.

#[path = "dom/document.rs"]
mod document;
#[path = "dom/selector.rs"]
mod selector;

pub use document::Document;
pub use selector::SelectorList;

/// Handle to a node in a [`DomView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Read-only DOM capabilities used by matching and field extraction.
pub trait DomView {
    /// `element.matches(selector)`. Non-elements and malformed selectors
    /// never match.
    fn matches(&self, node: NodeId, selector: &str) -> bool;

    /// [`matches`](DomView::matches) with a selector parsed ahead of time.
    /// The default hands the source text back to `matches`.
    fn matches_parsed(&self, node: NodeId, selector: &SelectorList) -> bool {
        self.matches(node, selector.as_str())
    }

    /// `node.parentElement`.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// First descendant of `scope` (document order) matching `selector`.
    fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId>;

    fn text_content(&self, node: NodeId) -> Option<String>;

    /// `value` of form controls; `None` for nodes without one.
    fn value(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// `element.href`: the `href` attribute resolved against the document
    /// URL. The default returns the attribute as written.
    fn link_href(&self, node: NodeId) -> Option<String> {
        self.attribute(node, "href")
    }

    /// `checked` of checkboxes and radios.
    fn checked(&self, node: NodeId) -> Option<bool>;

    /// `checkValidity()` of form-associated elements.
    fn check_validity(&self, node: NodeId) -> Option<bool>;

    fn validation_message(&self, node: NodeId) -> Option<String>;

    /// Text of the currently selected `<option>` of a `<select>`.
    fn selected_option_text(&self, node: NodeId) -> Option<String>;

    /// `document.activeElement`.
    fn active_element(&self) -> Option<NodeId>;

    /// `element.closest(selector)`: inclusive ancestor walk.
    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if self.matches(candidate, selector) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }
}

/// True iff `node` is present and matches `selector`.
pub fn matches(dom: &dyn DomView, node: Option<NodeId>, selector: &str) -> bool {
    node.is_some_and(|node| dom.matches(node, selector))
}

/// True iff `node` or one of its ancestors matches `selector`.
pub fn has_ancestor(dom: &dyn DomView, node: Option<NodeId>, selector: &str) -> bool {
    node.is_some_and(|node| dom.closest(node, selector).is_some())
}

/// [`has_ancestor`] for a pre-parsed selector.
pub(crate) fn has_ancestor_parsed(dom: &dyn DomView, node: NodeId, selector: &SelectorList) -> bool {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if dom.matches_parsed(candidate, selector) {
            return true;
        }
        current = dom.parent(candidate);
    }
    false
}
