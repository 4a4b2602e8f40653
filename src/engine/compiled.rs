//! Catalog compilation and indexing.
//!
//! A catalog is authored as nested data (rules, some of them composites). For
//! dispatch it is flattened once into entries, one per emittable spec, in
//! declaration order with sub-rules inlined where their parent sits:
//!
//! ```text
//! rules:   [textFieldFocus, consentCheckbox{on, off}, ctaClick]
//! entries: [0 textFieldFocus, 1 consentCheckbox.on, 2 consentCheckbox.off, 3 ctaClick]
//! by_trigger[focusin] = [0]   by_trigger[change] = [1, 2]   by_trigger[click] = [3]
//! ```
//!
//! ## Invariants
//!
//! - Each `by_trigger` list is ascending, so walking it visits entries in
//!   declaration order. Resolving from the list is therefore the same as
//!   walking every rule and checking the trigger first.
//! - `EntryId` indexes `CatalogIndex::entries`; an index is only valid for the
//!   catalog it was built from.
//! - Selectors (each entry's effective selector and the catalog scope) are
//!   parsed here, once. An entry whose selector does not parse is left out;
//!   a scope that does not parse leaves the mask empty. Either way nothing
//!   could have matched at dispatch time.

use crate::catalog::{Catalog, EventSpec, RuleKind};
use crate::{SelectorList, Trigger};

pub(crate) type EntryId = usize;

const TRIGGER_COUNT: usize = Trigger::ALL.len();

bitflags::bitflags! {
    /// Set of triggers a catalog has at least one rule for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TriggerMask: u8 {
        const CLICK   = 1 << 0;
        const FOCUSIN = 1 << 1;
        const BLUR    = 1 << 2;
        const CHANGE  = 1 << 3;
        const INPUT   = 1 << 4;
        const SUBMIT  = 1 << 5;
    }
}

impl From<Trigger> for TriggerMask {
    fn from(trigger: Trigger) -> Self {
        TriggerMask::from_bits_truncate(1 << trigger.index())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// `key` for single rules, `key.sub` for sub-rules.
    pub key: String,
    pub rule: usize,
    pub sub: Option<usize>,
    /// The sub-rule's own selector, else the rule's.
    pub selector: SelectorList,
}

/// Per-trigger view of one catalog.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    entries: Vec<Entry>,
    by_trigger: [Vec<EntryId>; TRIGGER_COUNT],
    mask: TriggerMask,
    scope: Option<SelectorList>,
}

impl CatalogIndex {
    pub fn new(catalog: &Catalog) -> Self {
        let mut index = CatalogIndex::default();

        for (rule_idx, rule) in catalog.rules().iter().enumerate() {
            match rule.kind() {
                RuleKind::Single(spec) => {
                    index.push(rule.key().to_string(), rule_idx, None, spec, rule.effective_selector(spec))
                }
                RuleKind::Composite(subs) => {
                    for (sub_idx, sub) in subs.iter().enumerate() {
                        let key = format!("{}.{}", rule.key(), sub.key);
                        index.push(key, rule_idx, Some(sub_idx), &sub.spec, rule.effective_selector(&sub.spec));
                    }
                }
            }
        }

        if let Some(scope) = catalog.scope_selector() {
            match SelectorList::parse(scope) {
                Ok(list) => index.scope = Some(list),
                Err(err) => {
                    log::warn!("catalog `{}` scope never matches: {err}", catalog.name());
                    index.mask = TriggerMask::empty();
                }
            }
        }

        log::trace!("indexed catalog `{}`: {} entries, triggers {:?}", catalog.name(), index.entries.len(), index.mask);
        index
    }

    fn push(&mut self, key: String, rule: usize, sub: Option<usize>, spec: &EventSpec, selector: &str) {
        let selector = match SelectorList::parse(selector) {
            Ok(list) => list,
            Err(err) => {
                log::warn!("rule `{key}` never matches: {err}");
                return;
            }
        };
        let id = self.entries.len();
        let trigger = spec.trigger();
        self.entries.push(Entry { key, rule, sub, selector });
        self.by_trigger[trigger.index()].push(id);
        self.mask |= TriggerMask::from(trigger);
    }

    pub fn mask(&self) -> TriggerMask {
        self.mask
    }

    /// Number of emittable specs (sub-rules counted individually).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The parsed catalog scope, if the catalog has one.
    pub fn scope(&self) -> Option<&SelectorList> {
        self.scope.as_ref()
    }

    /// Entry keys bound to `trigger`, in declaration order.
    pub fn keys_for(&self, trigger: Trigger) -> Vec<&str> {
        self.by_trigger[trigger.index()].iter().map(|&id| self.entries[id].key.as_str()).collect()
    }

    /// Entries bound to `trigger` with their spec.
    pub(crate) fn candidates<'i, 'c>(
        &'i self,
        catalog: &'c Catalog,
        trigger: Trigger,
    ) -> impl Iterator<Item = (&'i Entry, &'c EventSpec)> {
        self.by_trigger[trigger.index()].iter().filter_map(move |&id| {
            let entry = &self.entries[id];
            let rule = catalog.rules().get(entry.rule)?;
            let spec = match (rule.kind(), entry.sub) {
                (RuleKind::Single(spec), None) => spec,
                (RuleKind::Composite(subs), Some(sub)) => &subs.get(sub)?.spec,
                _ => return None,
            };
            Some((entry, spec))
        })
    }
}
