//! Delegated dataLayer event dispatch.
//!
//! `datalayer` observes DOM interactions through one delegated listener per
//! physical event type, matches the event target against declarative
//! [`Catalog`]s of tracked interactions, and appends flat [`EventRecord`]s to an
//! append-only [`Sink`] (a `dataLayer`-style array consumed by a tag manager).
//!
//! ```text
//! RawEvent ─▶ Dispatcher (timing policy) ─▶ resolve (selector + scope)
//!          ─▶ extract (static + dynamic, veto) ─▶ assemble (defaults + timestamp) ─▶ Sink
//! ```
//!
//! The DOM is reached only through the [`DomView`] trait, so the engine runs the
//! same against the in-crate [`Document`] model as against a real browser
//! binding.
//!
//! # Example
//! ```
//! use datalayer::{Catalog, DataLayer, Dispatcher, Document, EventSpec, Extraction, Page, Rule, Trigger, fields};
//!
//! let mut doc = Document::new();
//! let body = doc.root();
//! let button = doc.append_element(body, "button", &[("id", "submit")]);
//! doc.append_text(button, " Send ");
//!
//! let catalog = Catalog::builder("demo")
//!     .rule(Rule::single(
//!         "ctaClick",
//!         "#submit",
//!         EventSpec::new(Trigger::Click)
//!             .fields(fields! { "event" => "product", "action" => "click" })
//!             .dynamic(|dom, el, _event| {
//!                 let text = dom.text_content(el).unwrap_or_default();
//!                 Extraction::from(fields! { "actionValue" => text.trim() })
//!             }),
//!     ))
//!     .build();
//!
//! let sink = DataLayer::new();
//! let mut page = Page::new(doc);
//! let dispatcher = Dispatcher::new(vec![catalog], sink.clone()).with_clock(page.clock());
//! page.install(dispatcher);
//!
//! page.click("#submit").unwrap();
//! let records = sink.records();
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].get("actionValue"), Some("Send"));
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[macro_use]
mod macros;
mod api;
pub mod catalog;
pub mod catalogs;
pub mod clock;
pub mod dom;
mod engine;
pub mod error;
pub mod host;
pub mod scenario;
pub mod sink;

pub use api::{DELEGATED_LISTENERS, Options, default_dispatcher, initialize_delegated_events};
pub use catalog::{Catalog, CatalogBuilder, EventSpec, Rule, RuleKind, SubRule};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dom::{Document, DomView, NodeId, SelectorList, has_ancestor, matches};
pub use engine::{CatalogIndex, DispatchStats, Dispatcher, Match, Outcome, TriggerMask, resolve};
pub use error::{CatalogDefect, Error, Result, SelectorError};
pub use host::{ListenerHost, ListenerRoot, ListenerSpec, Page, SharedDispatcher};
pub use sink::{DataLayer, Sink};

// --- Triggers and physical events ------------------------------------------

/// A physical DOM event kind a rule can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    Click,
    FocusIn,
    Blur,
    Change,
    Input,
    Submit,
}

impl Trigger {
    /// All triggers, in listener installation order.
    pub const ALL: [Trigger; 6] =
        [Trigger::Click, Trigger::FocusIn, Trigger::Blur, Trigger::Change, Trigger::Input, Trigger::Submit];

    /// DOM event name, e.g. `"focusin"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Click => "click",
            Trigger::FocusIn => "focusin",
            Trigger::Blur => "blur",
            Trigger::Change => "change",
            Trigger::Input => "input",
            Trigger::Submit => "submit",
        }
    }

    /// Position of this trigger in [`Trigger::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Trigger::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| Error::UnknownTrigger(s.to_string()))
    }
}

/// Window-level events used only for focus bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEvent {
    Blur,
    Focus,
}

/// Everything a listener can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Dom(Trigger),
    Window(WindowEvent),
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Dom(trigger) => trigger.as_str(),
            EventType::Window(WindowEvent::Blur) => "blur",
            EventType::Window(WindowEvent::Focus) => "focus",
        }
    }
}

/// A physical event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventType,
    /// Naive `event.target`; `None` for window events or detached targets.
    pub target: Option<NodeId>,
    /// `event.composedPath()` when the host supports it (innermost node first).
    pub composed_path: Option<Vec<NodeId>>,
    /// Host timestamp in milliseconds since the Unix epoch.
    pub time_stamp_ms: i64,
}

impl RawEvent {
    pub fn new(kind: EventType, target: Option<NodeId>, time_stamp_ms: i64) -> Self {
        Self { kind, target, composed_path: None, time_stamp_ms }
    }

    pub fn with_composed_path(mut self, path: Vec<NodeId>) -> Self {
        self.composed_path = Some(path);
        self
    }

    /// The innermost node of the propagation path, falling back to `target`.
    ///
    /// Needed so that clicks inside encapsulated custom elements resolve to
    /// the element that was actually hit rather than the shadow host.
    pub fn composed_target(&self) -> Option<NodeId> {
        match &self.composed_path {
            Some(path) if !path.is_empty() => path.first().copied(),
            _ => self.target,
        }
    }
}

// --- Payloads ----------------------------------------------------------------

/// A flat string-to-string field mapping.
pub type Fields = BTreeMap<String, String>;

/// Result of a rule's dynamic field function.
///
/// `Fields` with an empty map means "no dynamic contribution"; `Veto` means
/// "do not emit anything for this occurrence". The two never alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fields(Fields),
    Veto,
}

impl Extraction {
    pub fn empty() -> Self {
        Extraction::Fields(Fields::new())
    }

    pub fn is_veto(&self) -> bool {
        matches!(self, Extraction::Veto)
    }
}

impl From<Fields> for Extraction {
    fn from(fields: Fields) -> Self {
        Extraction::Fields(fields)
    }
}

/// Per-occurrence field computation: `(dom, node, raw event) -> fields | veto`.
///
/// Invoked synchronously in the turn that resolves the event, so it observes
/// live DOM state (value, validity, checked-ness).
pub type DynamicFn = Box<dyn Fn(&dyn DomView, NodeId, &RawEvent) -> Extraction>;

/// An emitted analytics record.
///
/// Always carries a non-empty `event` and a `timestamp`. Records are immutable
/// once assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventRecord(Fields);

impl EventRecord {
    pub(crate) fn from_fields(fields: Fields) -> Self {
        EventRecord(fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn event(&self) -> &str {
        self.get("event").unwrap_or_default()
    }

    pub fn timestamp(&self) -> &str {
        self.get("timestamp").unwrap_or_default()
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }
}
