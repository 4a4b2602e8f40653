//! Rule resolution.
//!
//! Given an event target and a trigger, pick the first rule of a catalog that
//! applies:
//!
//! ```text
//! for entry in catalog (declaration order, sub-rules inline):
//!     entry.trigger != trigger                 -> skip   (pre-filtered by the index)
//!     !matches(target, effective selector)     -> skip
//!     scope set && !has_ancestor(target, scope) -> skip
//!     otherwise                                -> Match, stop
//! ```
//!
//! A missing target never matches. Nothing here mutates state; resolution
//! can be retried freely.

use super::compiled::CatalogIndex;
use crate::catalog::{Catalog, EventSpec};
use crate::dom::{DomView, has_ancestor_parsed};
use crate::{NodeId, Trigger};

/// A resolved `(rule, spec, node)` triple.
#[derive(Debug, Clone)]
pub struct Match<'c> {
    /// Name of the catalog the rule came from.
    pub catalog: &'c str,
    /// `key` of a single rule or `key.sub` of a sub-rule.
    pub rule_key: String,
    pub spec: &'c EventSpec,
    /// The event target the selector matched.
    pub node: NodeId,
}

/// Resolve against one catalog.
///
/// Builds a throwaway [`CatalogIndex`]; the dispatcher keeps its indexes
/// around instead.
pub fn resolve<'c>(
    dom: &dyn DomView,
    node: Option<NodeId>,
    trigger: Trigger,
    catalog: &'c Catalog,
) -> Option<Match<'c>> {
    let index = CatalogIndex::new(catalog);
    resolve_indexed(dom, node, trigger, catalog, &index)
}

pub(crate) fn resolve_indexed<'c>(
    dom: &dyn DomView,
    node: Option<NodeId>,
    trigger: Trigger,
    catalog: &'c Catalog,
    index: &CatalogIndex,
) -> Option<Match<'c>> {
    let node = node?;
    if !index.mask().contains(trigger.into()) {
        return None;
    }

    for (entry, spec) in index.candidates(catalog, trigger) {
        if !dom.matches_parsed(node, &entry.selector) {
            continue;
        }
        if let Some(scope) = index.scope() {
            if !has_ancestor_parsed(dom, node, scope) {
                log::trace!(
                    "[resolve] {} matched `{}` outside scope `{}`",
                    entry.key,
                    entry.selector.as_str(),
                    scope.as_str()
                );
                continue;
            }
        }

        log::debug!("[resolve] {trigger} on {node:?} -> {}/{}", catalog.name(), entry.key);
        return Some(Match { catalog: catalog.name(), rule_key: entry.key.clone(), spec, node });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Rule};

    fn doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.root();
        let container = doc.append_element(body, "div", &[("id", "form-container")]);
        let inside = doc.append_element(container, "input", &[("class", "elqField"), ("type", "text")]);
        let outside = doc.append_element(body, "input", &[("class", "elqField"), ("type", "text")]);
        (doc, inside, outside)
    }

    fn catalog() -> Catalog {
        Catalog::builder("form")
            .scope("#form-container")
            .rule(Rule::single("first", "input.elqField", EventSpec::new(Trigger::FocusIn).field("n", "1")))
            .rule(Rule::single("second", "input", EventSpec::new(Trigger::FocusIn).field("n", "2")))
            .rule(Rule::single("blurred", "input", EventSpec::new(Trigger::Blur)))
            .build()
    }

    #[test]
    fn first_declared_rule_wins() {
        let (doc, inside, _) = doc();
        let catalog = catalog();
        let m = resolve(&doc, Some(inside), Trigger::FocusIn, &catalog).unwrap();
        assert_eq!(m.rule_key, "first");
        assert_eq!(m.catalog, "form");
        assert_eq!(m.node, inside);
        assert_eq!(m.spec.static_fields().get("n").map(String::as_str), Some("1"));
    }

    #[test]
    fn trigger_must_agree() {
        let (doc, inside, _) = doc();
        let catalog = catalog();
        assert_eq!(resolve(&doc, Some(inside), Trigger::Blur, &catalog).unwrap().rule_key, "blurred");
        assert!(resolve(&doc, Some(inside), Trigger::Click, &catalog).is_none());
    }

    #[test]
    fn targets_outside_the_scope_never_match() {
        let (doc, _, outside) = doc();
        assert!(resolve(&doc, Some(outside), Trigger::FocusIn, &catalog()).is_none());
    }

    #[test]
    fn unscoped_catalogs_match_anywhere() {
        let (doc, _, outside) = doc();
        let catalog =
            Catalog::builder("global").rule(Rule::single("any", "input", EventSpec::new(Trigger::FocusIn))).build();
        assert!(resolve(&doc, Some(outside), Trigger::FocusIn, &catalog).is_some());
    }

    #[test]
    fn missing_target_never_matches() {
        let (doc, _, _) = doc();
        assert!(resolve(&doc, None, Trigger::FocusIn, &catalog()).is_none());
    }

    #[test]
    fn sub_rules_resolve_with_dotted_keys() {
        let mut doc = Document::new();
        let body = doc.root();
        let checkbox = doc.append_element(body, "input", &[("type", "checkbox"), ("id", "consent")]);
        let catalog = Catalog::builder("c")
            .rule(Rule::composite(
                "consent",
                "#consent",
                vec![
                    ("other", EventSpec::new(Trigger::Change).selector("#nope")),
                    ("on", EventSpec::new(Trigger::Change)),
                ],
            ))
            .build();
        assert_eq!(resolve(&doc, Some(checkbox), Trigger::Change, &catalog).unwrap().rule_key, "consent.on");
    }
}
