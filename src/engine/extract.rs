//! Field extraction for a resolved match.
//!
//! Static fields are copied out of the spec so nothing downstream can mutate
//! the catalog. The dynamic function, when present, runs right here against
//! the live DOM and may veto the emission.

use super::resolve::Match;
use crate::{DomView, Extraction, Fields, RawEvent};

/// Fields contributed by a matched spec, kept apart until assembly decides
/// precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Payload {
    pub static_fields: Fields,
    pub dynamic_fields: Fields,
}

/// `None` means the dynamic function vetoed this occurrence.
pub(crate) fn extract(m: &Match<'_>, dom: &dyn DomView, event: &RawEvent) -> Option<Payload> {
    let static_fields = m.spec.static_fields().clone();

    let dynamic_fields = match m.spec.dynamic_fn() {
        Some(f) => match f(dom, m.node, event) {
            Extraction::Fields(fields) => fields,
            Extraction::Veto => {
                log::debug!("[extract] {} vetoed on {:?}", m.rule_key, m.node);
                return None;
            }
        },
        None => Fields::new(),
    };

    Some(Payload { static_fields, dynamic_fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, EventSpec, EventType, NodeId, Trigger};

    fn input() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let node = doc.append_element(root, "input", &[("value", "hello")]);
        (doc, node)
    }

    fn run(spec: &EventSpec, doc: &Document, node: NodeId) -> Option<Payload> {
        let m = Match { catalog: "c", rule_key: "k".to_string(), spec, node };
        let event = RawEvent::new(EventType::Dom(spec.trigger()), Some(node), 0);
        extract(&m, doc, &event)
    }

    #[test]
    fn static_only() {
        let (doc, node) = input();
        let spec = EventSpec::new(Trigger::Input).field("event", "product");
        let payload = run(&spec, &doc, node).unwrap();
        assert_eq!(payload.static_fields, fields! { "event" => "product" });
        assert!(payload.dynamic_fields.is_empty());
    }

    #[test]
    fn dynamic_reads_live_state() {
        let (mut doc, node) = input();
        let spec = EventSpec::new(Trigger::Input)
            .dynamic(|dom, el, _| Extraction::from(fields! { "actionValue" => dom.value(el).unwrap_or_default() }));
        doc.set_value(node, "changed");
        let payload = run(&spec, &doc, node).unwrap();
        assert_eq!(payload.dynamic_fields.get("actionValue").map(String::as_str), Some("changed"));
    }

    #[test]
    fn veto_is_not_an_empty_contribution() {
        let (doc, node) = input();
        let vetoing = EventSpec::new(Trigger::Input).field("event", "product").dynamic(|_, _, _| Extraction::Veto);
        let empty = EventSpec::new(Trigger::Input).field("event", "product").dynamic(|_, _, _| Extraction::empty());
        assert!(run(&vetoing, &doc, node).is_none());
        assert!(run(&empty, &doc, node).is_some());
    }

    #[test]
    fn dynamic_sees_the_raw_event() {
        let (doc, node) = input();
        let spec = EventSpec::new(Trigger::Click)
            .dynamic(|_, _, event| Extraction::from(fields! { "type" => event.kind.as_str() }));
        let payload = run(&spec, &doc, node).unwrap();
        assert_eq!(payload.dynamic_fields, fields! { "type" => "click" });
    }
}
