//! An arena-backed DOM model.
//!
//! Nodes live in a flat `Vec` and are addressed by [`NodeId`]; ids are never
//! reused, so a stored id behaves like a weak reference that can go stale but
//! never points at the wrong node.
//!
//! The model tracks just enough live state for tracking rules: form control
//! values, checked-ness, `<select>` selection, custom validity, and the
//! active (focused) element. Constraint validation follows the browser for
//! the common cases (`required`, `type="email"`, custom validity, disabled
//! controls are barred).

use super::NodeId;
use super::selector::{Combinator, Compound, Part, SelectorList};
use crate::{DomView, Error, Result};
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    value: String,
    checked: bool,
    custom_validity: String,
    selected_index: Option<usize>,
}

impl Element {
    fn input_type(&self) -> &str {
        if self.tag == "input" { self.attrs.get("type").map(String::as_str).unwrap_or("text") } else { "" }
    }

    fn is_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "select" | "textarea" | "button")
    }

    fn has_class(&self, class: &str) -> bool {
        self.attrs.get("class").is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    active: Option<NodeId>,
    url: Option<Url>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = Node { parent: None, children: Vec::new(), kind: NodeKind::Root };
        Document { nodes: vec![root], active: None, url: None }
    }

    /// Set `document.URL`, the base relative links resolve against.
    pub fn set_url(&mut self, url: &str) -> Result<()> {
        self.url = Some(Url::parse(url)?);
        Ok(())
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(Url::as_str)
    }

    /// The document node. It is not an element and matches no selector.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append `<tag attrs..>` under `parent`.
    ///
    /// `value` and `checked` attributes seed the live control state.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs: BTreeMap<String, String> =
            attrs.iter().map(|(k, v)| (k.to_ascii_lowercase(), (*v).to_string())).collect();
        let element = Element {
            tag: tag.to_ascii_lowercase(),
            value: attrs.get("value").cloned().unwrap_or_default(),
            checked: attrs.contains_key("checked"),
            attrs,
            ..Element::default()
        };
        self.push(parent, NodeKind::Element(element))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: Some(parent), children: Vec::new(), kind });
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        id
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    /// First element in the document matching `selector`.
    pub fn find(&self, selector: &str) -> Result<NodeId> {
        let list = SelectorList::parse(selector)?;
        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.matches_list(n, &list))
            .ok_or_else(|| Error::NodeNotFound(selector.to_string()))
    }

    /// Every element under `scope` matching `selector`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.descendants(scope).into_iter().filter(|&n| self.matches_list(n, &list)).collect())
    }

    /// `node` followed by its ancestors up to and including the document node.
    pub fn path_to_root(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut current = self.nodes.get(node.0).and_then(|n| n.parent);
        while let Some(parent) = current {
            path.push(parent);
            current = self.nodes[parent.0].parent;
        }
        path
    }

    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(scope.0) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    // --- live state ----------------------------------------------------------

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.value = value.to_string();
        }
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(element) = self.element_mut(node) {
            element.checked = checked;
        }
    }

    /// Select the `index`-th `<option>` of a `<select>`. Returns `false` when
    /// `node` is not a select or the index is out of range.
    pub fn set_selected_index(&mut self, node: NodeId, index: usize) -> bool {
        if self.tag_name(node) != Some("select") || index >= self.options(node).len() {
            return false;
        }
        if let Some(element) = self.element_mut(node) {
            element.selected_index = Some(index);
        }
        true
    }

    /// `setCustomValidity`: a non-empty message makes the control invalid.
    pub fn set_custom_validity(&mut self, node: NodeId, message: &str) {
        if let Some(element) = self.element_mut(node) {
            element.custom_validity = message.to_string();
        }
    }

    pub fn set_active_element(&mut self, node: Option<NodeId>) {
        self.active = node;
    }

    fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select).into_iter().filter(|&n| self.tag_name(n) == Some("option")).collect()
    }

    fn selected_option(&self, select: NodeId) -> Option<NodeId> {
        let options = self.options(select);
        let explicit = self.element(select)?.selected_index;
        let index = explicit.unwrap_or_else(|| {
            options
                .iter()
                .position(|&o| self.element(o).is_some_and(|e| e.attrs.contains_key("selected")))
                .unwrap_or(0)
        });
        options.get(index).copied()
    }

    fn option_value(&self, option: NodeId) -> String {
        match self.element(option).and_then(|e| e.attrs.get("value")) {
            Some(value) => value.clone(),
            None => self.collect_text(option),
        }
    }

    fn collect_text(&self, node: NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => text.clone(),
            _ => self.nodes[node.0].children.iter().map(|&c| self.collect_text(c)).collect(),
        }
    }

    fn control_value(&self, node: NodeId, element: &Element) -> String {
        if element.tag == "select" {
            self.selected_option(node).map(|o| self.option_value(o)).unwrap_or_default()
        } else {
            element.value.clone()
        }
    }

    /// The message a browser would report for an invalid control, `None` when
    /// the control satisfies its constraints.
    fn validation_error(&self, node: NodeId, element: &Element) -> Option<String> {
        if element.attrs.contains_key("disabled") || element.input_type() == "hidden" {
            return None;
        }
        if !element.custom_validity.is_empty() {
            return Some(element.custom_validity.clone());
        }
        if element.tag == "button" {
            return None;
        }

        let required = element.attrs.contains_key("required");
        let value = self.control_value(node, element);
        match (element.tag.as_str(), element.input_type()) {
            ("input", "checkbox" | "radio") if required && !element.checked => {
                Some("Please check this box if you want to proceed.".to_string())
            }
            ("input", "checkbox" | "radio") => None,
            ("select", _) if required && value.is_empty() => Some("Please select an item in the list.".to_string()),
            _ if required && value.is_empty() => Some("Please fill out this field.".to_string()),
            ("input", "email") if !value.is_empty() && !value.contains('@') => {
                Some(format!("Please include an '@' in the email address. '{value}' is missing an '@'."))
            }
            _ => None,
        }
    }

    // --- selector matching ---------------------------------------------------

    fn matches_list(&self, node: NodeId, list: &SelectorList) -> bool {
        list.groups.iter().any(|parts| !parts.is_empty() && self.matches_from(node, parts, parts.len() - 1))
    }

    /// Right-to-left match of `parts[..=idx]` with `node` as the subject of
    /// `parts[idx]`. Descendant steps backtrack over every ancestor.
    fn matches_from(&self, node: NodeId, parts: &[Part], idx: usize) -> bool {
        if !self.matches_compound(node, &parts[idx].compound) {
            return false;
        }
        if idx == 0 {
            return true;
        }

        match parts[idx].combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => self.parent_of(node).is_some_and(|p| self.matches_from(p, parts, idx - 1)),
            Combinator::Descendant => {
                let mut current = self.parent_of(node);
                while let Some(ancestor) = current {
                    if self.matches_from(ancestor, parts, idx - 1) {
                        return true;
                    }
                    current = self.parent_of(ancestor);
                }
                false
            }
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };

        if compound.tag.as_ref().is_some_and(|tag| *tag != element.tag) {
            return false;
        }
        if compound.id.as_ref().is_some_and(|id| element.attrs.get("id") != Some(id)) {
            return false;
        }
        if !compound.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        compound.attrs.iter().all(|cond| cond.holds(element.attrs.get(cond.key()).map(String::as_str)))
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }
}

impl DomView for Document {
    fn matches(&self, node: NodeId, selector: &str) -> bool {
        if self.element(node).is_none() {
            return false;
        }
        match SelectorList::parse(selector) {
            Ok(list) => self.matches_parsed(node, &list),
            Err(err) => {
                log::warn!("treating selector as non-matching: {err}");
                false
            }
        }
    }

    fn matches_parsed(&self, node: NodeId, selector: &SelectorList) -> bool {
        self.element(node).is_some() && self.matches_list(node, selector)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent_of(node).filter(|&p| self.element(p).is_some())
    }

    fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        self.query_selector_all(scope, selector).ok()?.into_iter().next()
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node.0).map(|_| self.collect_text(node))
    }

    fn value(&self, node: NodeId) -> Option<String> {
        let element = self.element(node)?;
        match element.tag.as_str() {
            "option" => Some(self.option_value(node)),
            _ if element.is_control() => Some(self.control_value(node, element)),
            _ => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.attrs.get(&name.to_ascii_lowercase()).cloned()
    }

    fn link_href(&self, node: NodeId) -> Option<String> {
        let href = self.attribute(node, "href")?;
        let resolved = match &self.url {
            Some(base) => base.join(&href),
            None => Url::parse(&href),
        };
        Some(resolved.map(String::from).unwrap_or(href))
    }

    fn checked(&self, node: NodeId) -> Option<bool> {
        let element = self.element(node)?;
        (element.tag == "input").then_some(element.checked)
    }

    fn check_validity(&self, node: NodeId) -> Option<bool> {
        let element = self.element(node)?;
        if element.tag == "form" {
            let all_valid = self.descendants(node).into_iter().all(|n| match self.element(n) {
                Some(control) if control.is_control() => self.validation_error(n, control).is_none(),
                _ => true,
            });
            return Some(all_valid);
        }
        element.is_control().then(|| self.validation_error(node, element).is_none())
    }

    fn validation_message(&self, node: NodeId) -> Option<String> {
        let element = self.element(node)?;
        element.is_control().then(|| self.validation_error(node, element).unwrap_or_default())
    }

    fn selected_option_text(&self, node: NodeId) -> Option<String> {
        if self.tag_name(node) != Some("select") {
            return None;
        }
        self.selected_option(node).map(|o| self.collect_text(o))
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{has_ancestor, matches};

    struct Fixture {
        doc: Document,
        container: NodeId,
        group: NodeId,
        email: NodeId,
        country: NodeId,
        consent: NodeId,
        outside: NodeId,
    }

    fn fixture() -> Fixture {
        let mut doc = Document::new();
        let body = doc.append_element(doc.root(), "body", &[]);
        let container = doc.append_element(body, "div", &[("id", "form-container")]);
        let form = doc.append_element(container, "form", &[("id", "form224")]);
        let group = doc.append_element(form, "div", &[("class", "form-group")]);
        let label = doc.append_element(group, "label", &[("class", "elqLabel")]);
        doc.append_text(label, "Email");
        let email = doc.append_element(group, "input", &[("class", "elqField"), ("type", "email"), ("required", "")]);
        let country = doc.append_element(form, "select", &[("id", "countryone"), ("required", "")]);
        let placeholder = doc.append_element(country, "option", &[("value", "")]);
        doc.append_text(placeholder, "-- Select --");
        let germany = doc.append_element(country, "option", &[("value", "DE")]);
        doc.append_text(germany, " Germany ");
        let consent = doc.append_element(form, "input", &[("type", "checkbox"), ("id", "consentcheckbox")]);
        let outside = doc.append_element(body, "input", &[("class", "elqField")]);
        Fixture { doc, container, group, email, country, consent, outside }
    }

    #[test]
    fn matches_compound_and_list_selectors() {
        let f = fixture();
        assert!(f.doc.matches(f.email, "input.elqField, input#company"));
        assert!(f.doc.matches(f.country, "select#countryone"));
        assert!(!f.doc.matches(f.email, "input#company"));
        assert!(f.doc.matches(f.email, "#form-container .form-group > input[type=email]"));
        assert!(!f.doc.matches(f.email, "#form-container > input"));
    }

    #[test]
    fn descendant_combinator_backtracks_over_ancestors() {
        let f = fixture();
        // The nearest `div` ancestor (.form-group) is not a child of `body`;
        // the container further up is.
        assert!(f.doc.matches(f.email, "body > div input"));
        assert!(!f.doc.matches(f.email, "body > form input"));
    }

    #[test]
    fn malformed_selector_is_a_non_match() {
        let f = fixture();
        assert!(!f.doc.matches(f.email, "input:focus"));
        assert!(!f.doc.matches(f.email, "input["));
    }

    #[test]
    fn non_elements_never_match() {
        let f = fixture();
        assert!(!f.doc.matches(f.doc.root(), "*"));
        assert!(!matches(&f.doc, None, "*"));
    }

    #[test]
    fn scope_walks_inclusive_ancestors() {
        let f = fixture();
        assert!(has_ancestor(&f.doc, Some(f.email), "#form-container, form#form224"));
        assert!(has_ancestor(&f.doc, Some(f.container), "#form-container"));
        assert!(!has_ancestor(&f.doc, Some(f.outside), "#form-container, form#form224"));
        assert!(!has_ancestor(&f.doc, None, "#form-container"));
    }

    #[test]
    fn closest_and_query_selector() {
        let f = fixture();
        assert_eq!(f.doc.closest(f.email, ".form-group"), Some(f.group));
        let label = f.doc.query_selector(f.group, ".elqLabel").unwrap();
        assert_eq!(f.doc.text_content(label).as_deref(), Some("Email"));
        assert_eq!(f.doc.query_selector(f.group, ".require-block"), None);
    }

    #[test]
    fn required_and_email_validation() {
        let mut f = fixture();
        assert_eq!(f.doc.check_validity(f.email), Some(false));
        assert_eq!(f.doc.validation_message(f.email).as_deref(), Some("Please fill out this field."));

        f.doc.set_value(f.email, "nobody");
        assert_eq!(f.doc.check_validity(f.email), Some(false));
        assert!(f.doc.validation_message(f.email).unwrap().contains("'@'"));

        f.doc.set_value(f.email, "a@b.example");
        assert_eq!(f.doc.check_validity(f.email), Some(true));
        assert_eq!(f.doc.validation_message(f.email).as_deref(), Some(""));

        f.doc.set_custom_validity(f.email, "Use your work address");
        assert_eq!(f.doc.check_validity(f.email), Some(false));
    }

    #[test]
    fn form_validity_aggregates_controls() {
        let mut f = fixture();
        let form = f.doc.find("form#form224").unwrap();
        assert_eq!(f.doc.check_validity(form), Some(false));

        f.doc.set_value(f.email, "a@b.example");
        assert!(f.doc.set_selected_index(f.country, 1));
        assert_eq!(f.doc.check_validity(form), Some(true));
    }

    #[test]
    fn capability_absent_on_plain_elements() {
        let f = fixture();
        assert_eq!(f.doc.check_validity(f.group), None);
        assert_eq!(f.doc.checked(f.group), None);
        assert_eq!(f.doc.value(f.group), None);
        assert_eq!(f.doc.selected_option_text(f.email), None);
    }

    #[test]
    fn select_tracks_selected_option() {
        let mut f = fixture();
        assert_eq!(f.doc.value(f.country).as_deref(), Some(""));
        assert_eq!(f.doc.selected_option_text(f.country).as_deref(), Some("-- Select --"));

        assert!(f.doc.set_selected_index(f.country, 1));
        assert_eq!(f.doc.value(f.country).as_deref(), Some("DE"));
        assert_eq!(f.doc.selected_option_text(f.country).as_deref(), Some(" Germany "));
        assert!(!f.doc.set_selected_index(f.country, 5));
    }

    #[test]
    fn checkbox_state() {
        let mut f = fixture();
        assert_eq!(f.doc.checked(f.consent), Some(false));
        f.doc.set_checked(f.consent, true);
        assert_eq!(f.doc.checked(f.consent), Some(true));
    }

    #[test]
    fn find_reports_missing_elements() {
        let f = fixture();
        assert!(matches!(f.doc.find("#nope"), Err(Error::NodeNotFound(_))));
        assert!(matches!(f.doc.find("a:hover"), Err(Error::Selector(_))));
        assert_eq!(f.doc.path_to_root(f.email).last(), Some(&f.doc.root()));
    }

    #[test]
    fn link_href_resolves_against_the_document_url() {
        let mut doc = Document::new();
        let root = doc.root();
        let relative = doc.append_element(root, "a", &[("href", "../imprint?lang=en")]);
        let absolute = doc.append_element(root, "a", &[("href", "https://cdn.example.org/terms")]);
        let bare = doc.append_element(root, "a", &[]);

        assert_eq!(doc.link_href(relative).as_deref(), Some("../imprint?lang=en"));
        assert_eq!(doc.link_href(absolute).as_deref(), Some("https://cdn.example.org/terms"));

        doc.set_url("https://www.example.com/forms/contact").unwrap();
        assert_eq!(doc.url(), Some("https://www.example.com/forms/contact"));
        assert_eq!(doc.link_href(relative).as_deref(), Some("https://www.example.com/imprint?lang=en"));
        assert_eq!(doc.link_href(absolute).as_deref(), Some("https://cdn.example.org/terms"));
        assert_eq!(doc.link_href(bare), None);
        assert_eq!(doc.attribute(relative, "href").as_deref(), Some("../imprint?lang=en"));

        assert!(matches!(doc.set_url("not a url"), Err(Error::Url(_))));
    }
}
