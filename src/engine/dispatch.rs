//! The dispatch controller.
//!
//! One [`Dispatcher`] serves every delegated listener. It owns the catalogs
//! (read-only after construction), their indexes, the sink, the clock and the
//! only mutable timing state: two debounce slots and the window focus
//! bookkeeping.
//!
//! ```text
//! click         resolve(composed target) ─ first catalog with a match ─▶ process
//! blur, change  resolve(target)          ─ first catalog with a match ─▶ process
//! submit        resolve(target) in every catalog ─▶ process each match
//! focusin       cancel pending; refocus? drop : schedule(+focus_delay)
//! input         schedule(+input_debounce), replacing any pending input
//! window blur   remember document.activeElement
//! window focus  remember now
//!
//! timer fires   resolve(stored target) ─ first catalog with a match ─▶ process
//! ```
//!
//! Processing a match never touches other catalogs: if the first match vetoes
//! or comes out incomplete, nothing else is tried.

use super::assemble::assemble;
use super::compiled::CatalogIndex;
use super::extract::extract;
use super::metrics::DispatchStats;
use super::resolve::{Match, resolve_indexed};
use super::timing::{Debouncer, Pending, WindowFocus};
use crate::{Catalog, Clock, DomView, EventType, NodeId, Options, RawEvent, Sink, SystemClock, Trigger, WindowEvent};
use std::fmt;
use std::time::Duration;

/// What one resolution pass (or window bookkeeping step) ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A record was appended to the sink.
    Emitted { catalog: String, rule_key: String },
    /// No rule applied.
    NoMatch { trigger: Trigger },
    /// The matched rule's dynamic function vetoed.
    Vetoed { rule_key: String },
    /// The matched rule assembled a record without `event`.
    Incomplete { rule_key: String },
    /// A `focusin` caused by the window regaining focus.
    SuppressedRefocus,
    /// Evaluation deferred to a timer.
    Deferred { trigger: Trigger, due_at_ms: i64 },
    /// Window focus state updated.
    WindowRecorded(WindowEvent),
}

impl Outcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, Outcome::Emitted { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Emitted { catalog, rule_key } => write!(f, "emitted {catalog}/{rule_key}"),
            Outcome::NoMatch { trigger } => write!(f, "no match for {trigger}"),
            Outcome::Vetoed { rule_key } => write!(f, "vetoed by {rule_key}"),
            Outcome::Incomplete { rule_key } => write!(f, "discarded {rule_key} (no event)"),
            Outcome::SuppressedRefocus => f.write_str("suppressed refocus"),
            Outcome::Deferred { trigger, due_at_ms } => write!(f, "{trigger} deferred to {due_at_ms}"),
            Outcome::WindowRecorded(WindowEvent::Blur) => f.write_str("window blur recorded"),
            Outcome::WindowRecorded(WindowEvent::Focus) => f.write_str("window focus recorded"),
        }
    }
}

pub struct Dispatcher {
    catalogs: Vec<Catalog>,
    indexes: Vec<CatalogIndex>,
    sink: Box<dyn Sink>,
    clock: Box<dyn Clock>,
    options: Options,
    focusin: Debouncer,
    input: Debouncer,
    window: WindowFocus,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Catalogs are consulted in the given order.
    pub fn new(catalogs: Vec<Catalog>, sink: impl Sink + 'static) -> Self {
        let indexes = catalogs.iter().map(CatalogIndex::new).collect();
        let options = Options::default();
        Dispatcher {
            catalogs,
            indexes,
            sink: Box::new(sink),
            clock: Box::new(SystemClock),
            focusin: Debouncer::new(millis(options.focus_delay)),
            input: Debouncer::new(millis(options.input_debounce)),
            options,
            window: WindowFocus::default(),
            stats: DispatchStats::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the timing options. Drops anything pending.
    pub fn with_options(mut self, options: Options) -> Self {
        self.focusin = Debouncer::new(millis(options.focus_delay));
        self.input = Debouncer::new(millis(options.input_debounce));
        self.options = options;
        self
    }

    pub fn catalogs(&self) -> &[Catalog] {
        &self.catalogs
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Handle one physical event.
    ///
    /// Immediate triggers are resolved and emitted before this returns;
    /// `focusin` and `input` only schedule work (see [`run_due_timers`]).
    ///
    /// [`run_due_timers`]: Dispatcher::run_due_timers
    pub fn handle_event(&mut self, dom: &dyn DomView, event: &RawEvent) -> Vec<Outcome> {
        self.stats.events += 1;
        let now = self.clock.now_ms();

        match event.kind {
            EventType::Dom(Trigger::Click) => {
                vec![self.first_match(dom, event.composed_target(), Trigger::Click, event)]
            }
            EventType::Dom(trigger @ (Trigger::Blur | Trigger::Change)) => {
                vec![self.first_match(dom, event.target, trigger, event)]
            }
            EventType::Dom(Trigger::Submit) => self.every_catalog(dom, event.target, Trigger::Submit, event),
            EventType::Dom(Trigger::FocusIn) => vec![self.on_focusin(event, now)],
            EventType::Dom(Trigger::Input) => {
                let (due_at_ms, replaced) = self.input.schedule(now, event.clone());
                if replaced {
                    self.stats.debounced += 1;
                }
                log::trace!("[timer] input on {:?} due at {due_at_ms}", event.target);
                vec![Outcome::Deferred { trigger: Trigger::Input, due_at_ms }]
            }
            EventType::Window(WindowEvent::Blur) => {
                self.window.on_blur(dom.active_element());
                vec![Outcome::WindowRecorded(WindowEvent::Blur)]
            }
            EventType::Window(WindowEvent::Focus) => {
                self.window.on_focus(now);
                vec![Outcome::WindowRecorded(WindowEvent::Focus)]
            }
        }
    }

    fn on_focusin(&mut self, event: &RawEvent, now: i64) -> Outcome {
        if self.focusin.cancel().is_some() {
            self.stats.debounced += 1;
        }

        if self.window.is_synthetic_refocus(event.target, now, millis(self.options.refocus_guard)) {
            log::debug!("[dispatch] suppressed refocus on {:?}", event.target);
            self.stats.suppressed_refocus += 1;
            return Outcome::SuppressedRefocus;
        }

        let (due_at_ms, _) = self.focusin.schedule(now, event.clone());
        log::trace!("[timer] focusin on {:?} due at {due_at_ms}", event.target);
        Outcome::Deferred { trigger: Trigger::FocusIn, due_at_ms }
    }

    /// Fire every pending evaluation that is due, earliest first.
    pub fn run_due_timers(&mut self, dom: &dyn DomView) -> Vec<Outcome> {
        let now = self.clock.now_ms();
        let mut due: Vec<(Trigger, Pending)> = [
            self.focusin.take_due(now).map(|p| (Trigger::FocusIn, p)),
            self.input.take_due(now).map(|p| (Trigger::Input, p)),
        ]
        .into_iter()
        .flatten()
        .collect();
        due.sort_by_key(|(_, p)| p.due_at_ms);

        due.into_iter().map(|(trigger, p)| self.first_match(dom, p.event.target, trigger, &p.event)).collect()
    }

    /// Earliest pending due time, if any.
    pub fn next_due_ms(&self) -> Option<i64> {
        [self.focusin.due_at(), self.input.due_at()].into_iter().flatten().min()
    }

    pub fn pending_timers(&self) -> usize {
        [self.focusin.due_at(), self.input.due_at()].into_iter().flatten().count()
    }

    fn first_match(&mut self, dom: &dyn DomView, node: Option<NodeId>, trigger: Trigger, event: &RawEvent) -> Outcome {
        self.stats.resolutions += 1;

        let found = self
            .catalogs
            .iter()
            .zip(&self.indexes)
            .find_map(|(catalog, index)| resolve_indexed(dom, node, trigger, catalog, index));

        match found {
            Some(m) => process(m, dom, event, self.sink.as_ref(), self.clock.as_ref(), &mut self.stats),
            None => {
                self.stats.no_matches += 1;
                Outcome::NoMatch { trigger }
            }
        }
    }

    fn every_catalog(
        &mut self,
        dom: &dyn DomView,
        node: Option<NodeId>,
        trigger: Trigger,
        event: &RawEvent,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for (catalog, index) in self.catalogs.iter().zip(&self.indexes) {
            self.stats.resolutions += 1;
            if let Some(m) = resolve_indexed(dom, node, trigger, catalog, index) {
                outcomes.push(process(m, dom, event, self.sink.as_ref(), self.clock.as_ref(), &mut self.stats));
            }
        }

        if outcomes.is_empty() {
            self.stats.no_matches += 1;
            outcomes.push(Outcome::NoMatch { trigger });
        }
        outcomes
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("catalogs", &self.catalogs.iter().map(Catalog::name).collect::<Vec<_>>())
            .field("options", &self.options)
            .field("pending_timers", &self.pending_timers())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// extract -> assemble -> sink for one match.
fn process(
    m: Match<'_>,
    dom: &dyn DomView,
    event: &RawEvent,
    sink: &dyn Sink,
    clock: &dyn Clock,
    stats: &mut DispatchStats,
) -> Outcome {
    stats.matches += 1;

    let Some(payload) = extract(&m, dom, event) else {
        stats.vetoes += 1;
        return Outcome::Vetoed { rule_key: m.rule_key };
    };

    let Some(record) = assemble(payload, || clock.now_iso()) else {
        log::debug!("[dispatch] {} produced no `event`, discarded", m.rule_key);
        stats.incomplete += 1;
        return Outcome::Incomplete { rule_key: m.rule_key };
    };

    log::debug!("[dispatch] emit {}/{}: {:?}", m.catalog, m.rule_key, record.fields());
    sink.push(record);
    stats.emitted += 1;
    Outcome::Emitted { catalog: m.catalog.to_string(), rule_key: m.rule_key }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataLayer, Document, EventSpec, Extraction, ManualClock, Rule};

    struct Setup {
        doc: Document,
        clock: ManualClock,
        sink: DataLayer,
        field: NodeId,
        other: NodeId,
        button: NodeId,
    }

    fn setup() -> Setup {
        let mut doc = Document::new();
        let root = doc.root();
        let form = doc.append_element(root, "form", &[("id", "f")]);
        let field = doc.append_element(form, "input", &[("id", "a")]);
        let other = doc.append_element(form, "input", &[("id", "b")]);
        let button = doc.append_element(form, "button", &[("id", "go")]);
        Setup { doc, clock: ManualClock::default(), sink: DataLayer::new(), field, other, button }
    }

    fn catalog(name: &str) -> Catalog {
        let spec = |trigger: Trigger| EventSpec::new(trigger).field("event", name).field("action", trigger.as_str());
        Catalog::builder(name)
            .rule(Rule::single("focus", "input", spec(Trigger::FocusIn)))
            .rule(Rule::single(
                "input",
                "input",
                spec(Trigger::Input)
                    .dynamic(|dom, el, _| Extraction::from(fields! { "v" => dom.value(el).unwrap_or_default() })),
            ))
            .rule(Rule::single("click", "#go", spec(Trigger::Click)))
            .rule(Rule::single("submit", "form", spec(Trigger::Submit)))
            .rule(Rule::single("veto", "#b", spec(Trigger::Blur).dynamic(|_, _, _| Extraction::Veto)))
            .build()
    }

    fn dispatcher(s: &Setup, catalogs: Vec<Catalog>) -> Dispatcher {
        Dispatcher::new(catalogs, s.sink.clone()).with_clock(s.clock.clone())
    }

    fn raw(s: &Setup, trigger: Trigger, target: NodeId) -> RawEvent {
        RawEvent::new(EventType::Dom(trigger), Some(target), s.clock.now_ms())
    }

    #[test]
    fn click_stops_at_first_catalog() {
        let s = setup();
        let mut d = dispatcher(&s, vec![catalog("one"), catalog("two")]);
        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::Click, s.button));
        assert_eq!(outcomes, vec![Outcome::Emitted { catalog: "one".into(), rule_key: "click".into() }]);
        assert_eq!(s.sink.len(), 1);
    }

    #[test]
    fn submit_visits_every_catalog() {
        let s = setup();
        let form = s.doc.find("#f").unwrap();
        let mut d = dispatcher(&s, vec![catalog("one"), catalog("two")]);
        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::Submit, form));
        assert_eq!(outcomes.len(), 2);
        let events: Vec<_> = s.sink.records().iter().map(|r| r.event().to_string()).collect();
        assert_eq!(events, vec!["one", "two"]);
    }

    #[test]
    fn veto_does_not_fall_through_to_later_catalogs() {
        let s = setup();
        let mut d = dispatcher(&s, vec![catalog("one"), catalog("two")]);
        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::Blur, s.other));
        assert_eq!(outcomes, vec![Outcome::Vetoed { rule_key: "veto".into() }]);
        assert!(s.sink.is_empty());
        assert_eq!(d.stats().vetoes, 1);
    }

    #[test]
    fn records_without_event_never_reach_the_sink() {
        let s = setup();
        let incomplete = Catalog::builder("incomplete")
            .rule(Rule::single("cta", "#go", EventSpec::new(Trigger::Click).field("action", "click")))
            .build();
        let mut d = dispatcher(&s, vec![incomplete, catalog("two")]);

        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::Click, s.button));
        assert_eq!(outcomes, vec![Outcome::Incomplete { rule_key: "cta".into() }]);
        assert!(s.sink.is_empty());
        assert_eq!(d.stats().incomplete, 1);
        assert_eq!(d.stats().emitted, 0);
        assert_eq!(d.stats().dropped(), 1);
    }

    #[test]
    fn unmatched_events_are_counted() {
        let s = setup();
        let mut d = dispatcher(&s, vec![catalog("one")]);
        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::Change, s.field));
        assert_eq!(outcomes, vec![Outcome::NoMatch { trigger: Trigger::Change }]);
        assert_eq!(d.stats().no_matches, 1);
    }

    #[test]
    fn focusin_is_delayed_and_restarted() {
        let s = setup();
        let mut d = dispatcher(&s, vec![catalog("one")]);
        let start = s.clock.now_ms();

        d.handle_event(&s.doc, &raw(&s, Trigger::FocusIn, s.field));
        s.clock.advance_ms(30);
        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::FocusIn, s.other));
        assert_eq!(outcomes, vec![Outcome::Deferred { trigger: Trigger::FocusIn, due_at_ms: start + 90 }]);

        s.clock.advance_ms(59);
        assert!(d.run_due_timers(&s.doc).is_empty());
        s.clock.advance_ms(1);
        assert_eq!(d.run_due_timers(&s.doc).len(), 1);
        assert_eq!(s.sink.len(), 1);
        assert_eq!(d.stats().debounced, 1);
    }

    #[test]
    fn input_debounce_reads_value_when_it_fires() {
        let mut s = setup();
        let mut d = dispatcher(&s, vec![catalog("one")]);

        for (i, text) in ["h", "he", "hel"].into_iter().enumerate() {
            if i > 0 {
                s.clock.advance_ms(100);
            }
            s.doc.set_value(s.field, text);
            d.handle_event(&s.doc, &raw(&s, Trigger::Input, s.field));
        }
        s.doc.set_value(s.field, "hello");
        assert_eq!(d.next_due_ms(), Some(s.clock.now_ms() + 500));

        s.clock.advance_ms(500);
        d.run_due_timers(&s.doc);
        let records = s.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("v"), Some("hello"));
        assert_eq!(d.pending_timers(), 0);
    }

    #[test]
    fn window_refocus_on_the_same_node_is_suppressed() {
        let mut s = setup();
        let mut d = dispatcher(&s, vec![catalog("one")]);
        s.doc.set_active_element(Some(s.field));

        d.handle_event(&s.doc, &RawEvent::new(EventType::Window(WindowEvent::Blur), None, 0));
        s.clock.advance_ms(10_000);
        d.handle_event(&s.doc, &RawEvent::new(EventType::Window(WindowEvent::Focus), None, 0));
        s.clock.advance_ms(50);

        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::FocusIn, s.field));
        assert_eq!(outcomes, vec![Outcome::SuppressedRefocus]);
        assert_eq!(d.pending_timers(), 0);

        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::FocusIn, s.other));
        assert!(matches!(outcomes[..], [Outcome::Deferred { .. }]));
    }

    #[test]
    fn suppressed_refocus_still_cancels_pending_focus() {
        let mut s = setup();
        let mut d = dispatcher(&s, vec![catalog("one")]);
        s.doc.set_active_element(Some(s.field));

        d.handle_event(&s.doc, &raw(&s, Trigger::FocusIn, s.other));
        d.handle_event(&s.doc, &RawEvent::new(EventType::Window(WindowEvent::Blur), None, 0));
        d.handle_event(&s.doc, &RawEvent::new(EventType::Window(WindowEvent::Focus), None, 0));
        d.handle_event(&s.doc, &raw(&s, Trigger::FocusIn, s.field));

        s.clock.advance_ms(1_000);
        assert!(d.run_due_timers(&s.doc).is_empty());
        assert!(s.sink.is_empty());
    }

    #[test]
    fn timestamps_come_from_the_clock() {
        let s = setup();
        let mut d = dispatcher(&s, vec![catalog("one")]);
        d.handle_event(&s.doc, &raw(&s, Trigger::Click, s.button));
        assert_eq!(s.sink.records()[0].timestamp(), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn options_change_the_windows() {
        let s = setup();
        let options = Options::default().input_debounce(Duration::from_millis(50));
        let mut d = dispatcher(&s, vec![catalog("one")]).with_options(options);
        let outcomes = d.handle_event(&s.doc, &raw(&s, Trigger::Input, s.field));
        assert_eq!(outcomes, vec![Outcome::Deferred { trigger: Trigger::Input, due_at_ms: s.clock.now_ms() + 50 }]);
    }
}
