//! Declarative tracking catalogs.
//!
//! A [`Catalog`] is an ordered list of [`Rule`]s plus an optional scope
//! selector every match must sit inside. Order is priority: the first rule
//! (and, inside a composite, the first sub-rule) that fits an event wins.
//!
//! Rules are data with one embedded capability, the dynamic field function.
//! Everything else (selector, trigger, static fields) is plain declarative
//! configuration:
//!
//! ```text
//! Rule "consentCheckbox" (selector "#consentcheckbox")
//!  └─ Composite
//!      ├─ "on"  : change, {event, action: "on", ..},  dynamic: veto unless checked
//!      └─ "off" : change, {event, action: "off", ..}, dynamic: veto if checked
//! ```

use crate::dom::SelectorList;
use crate::{CatalogDefect, DomView, DynamicFn, Error, Extraction, Fields, NodeId, RawEvent, Result, Trigger};
use std::collections::HashSet;
use std::fmt;

/// What gets emitted for one trigger: static fields plus an optional dynamic
/// field function.
pub struct EventSpec {
    trigger: Trigger,
    selector: Option<String>,
    static_fields: Fields,
    dynamic: Option<DynamicFn>,
}

impl EventSpec {
    pub fn new(trigger: Trigger) -> Self {
        EventSpec { trigger, selector: None, static_fields: Fields::new(), dynamic: None }
    }

    /// Override the owning rule's selector (sub-rules only).
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Replace the static fields.
    pub fn fields(mut self, fields: Fields) -> Self {
        self.static_fields = fields;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_fields.insert(key.into(), value.into());
        self
    }

    pub fn dynamic<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn DomView, NodeId, &RawEvent) -> Extraction + 'static,
    {
        self.dynamic = Some(Box::new(f));
        self
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn own_selector(&self) -> Option<&str> {
        self.selector.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn static_fields(&self) -> &Fields {
        &self.static_fields
    }

    pub fn has_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    pub(crate) fn dynamic_fn(&self) -> Option<&DynamicFn> {
        self.dynamic.as_ref()
    }
}

impl fmt::Debug for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSpec")
            .field("trigger", &self.trigger)
            .field("selector", &self.selector)
            .field("static_fields", &self.static_fields)
            .field("dynamic", &self.dynamic.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// A named member of a composite rule, addressed as `parent.key`.
#[derive(Debug)]
pub struct SubRule {
    pub key: String,
    pub spec: EventSpec,
}

#[derive(Debug)]
pub enum RuleKind {
    Single(EventSpec),
    Composite(Vec<SubRule>),
}

#[derive(Debug)]
pub struct Rule {
    key: String,
    selector: String,
    kind: RuleKind,
}

impl Rule {
    pub fn single(key: impl Into<String>, selector: impl Into<String>, spec: EventSpec) -> Self {
        Rule { key: key.into(), selector: selector.into(), kind: RuleKind::Single(spec) }
    }

    pub fn composite<K, I>(key: impl Into<String>, selector: impl Into<String>, subs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, EventSpec)>,
    {
        let subs = subs.into_iter().map(|(key, spec)| SubRule { key: key.into(), spec }).collect();
        Rule { key: key.into(), selector: selector.into(), kind: RuleKind::Composite(subs) }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Addressable keys in declaration order (`key`, or `key.sub` per sub-rule).
    pub fn entry_keys(&self) -> Vec<String> {
        match &self.kind {
            RuleKind::Single(_) => vec![self.key.clone()],
            RuleKind::Composite(subs) => subs.iter().map(|s| format!("{}.{}", self.key, s.key)).collect(),
        }
    }

    /// The selector a spec is matched with: its own, else the rule's.
    pub(crate) fn effective_selector<'a>(&'a self, spec: &'a EventSpec) -> &'a str {
        spec.own_selector().unwrap_or(&self.selector)
    }
}

/// An ordered rule set with an optional ancestor scope.
#[derive(Debug)]
pub struct Catalog {
    name: String,
    scope_selector: Option<String>,
    rules: Vec<Rule>,
}

impl Catalog {
    pub fn builder(name: impl Into<String>) -> CatalogBuilder {
        CatalogBuilder { name: name.into(), scope_selector: None, rules: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope_selector(&self) -> Option<&str> {
        self.scope_selector.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule or sub-rule spec by its dotted key.
    pub fn spec(&self, key: &str) -> Option<&EventSpec> {
        let (rule_key, sub_key) = match key.split_once('.') {
            Some((rule, sub)) => (rule, Some(sub)),
            None => (key, None),
        };
        let rule = self.rules.iter().find(|r| r.key == rule_key)?;
        match (&rule.kind, sub_key) {
            (RuleKind::Single(spec), None) => Some(spec),
            (RuleKind::Composite(subs), Some(sub)) => subs.iter().find(|s| s.key == sub).map(|s| &s.spec),
            _ => None,
        }
    }

    /// Structural checks: unique keys, usable selectors, non-empty composites.
    ///
    /// The dispatcher never requires this; a catalog that fails validation
    /// still dispatches, its broken rules just never match.
    pub fn validate(&self) -> Result<()> {
        let mut defects = Vec::new();
        let mut seen = HashSet::new();

        if let Some(scope) = &self.scope_selector {
            if let Err(err) = SelectorList::parse(scope) {
                defects.push(CatalogDefect::BadScope(err));
            }
        }

        for rule in &self.rules {
            if let RuleKind::Composite(subs) = &rule.kind {
                if subs.is_empty() {
                    defects.push(CatalogDefect::EmptyComposite(rule.key.clone()));
                }
            }

            let specs: Vec<(String, &EventSpec)> = match &rule.kind {
                RuleKind::Single(spec) => vec![(rule.key.clone(), spec)],
                RuleKind::Composite(subs) => {
                    subs.iter().map(|s| (format!("{}.{}", rule.key, s.key), &s.spec)).collect()
                }
            };

            if !seen.insert(rule.key.clone()) {
                defects.push(CatalogDefect::DuplicateKey(rule.key.clone()));
            }

            for (key, spec) in specs {
                if matches!(rule.kind, RuleKind::Composite(_)) && !seen.insert(key.clone()) {
                    defects.push(CatalogDefect::DuplicateKey(key.clone()));
                }
                let selector = rule.effective_selector(spec);
                if selector.trim().is_empty() {
                    defects.push(CatalogDefect::EmptySelector(key));
                    continue;
                }
                if let Err(error) = SelectorList::parse(selector) {
                    defects.push(CatalogDefect::BadSelector { key, error });
                }
            }
        }

        if defects.is_empty() {
            Ok(())
        } else {
            for defect in &defects {
                log::warn!("catalog `{}`: {defect}", self.name);
            }
            Err(Error::Catalog { catalog: self.name.clone(), defects })
        }
    }
}

pub struct CatalogBuilder {
    name: String,
    scope_selector: Option<String>,
    rules: Vec<Rule>,
}

impl CatalogBuilder {
    /// Restrict every rule to targets inside an element matching `selector`.
    pub fn scope(mut self, selector: impl Into<String>) -> Self {
        self.scope_selector = Some(selector.into());
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn build(self) -> Catalog {
        Catalog { name: self.name, scope_selector: self.scope_selector, rules: self.rules }
    }
}
