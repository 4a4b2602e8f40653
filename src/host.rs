//! Listener hosts.
//!
//! A [`ListenerHost`] is whatever delivers physical events: a browser binding,
//! or the in-crate [`Page`], which couples a [`Document`] with a
//! [`ManualClock`] and plays user interactions the way a browser would fire
//! them.
//!
//! ```text
//! page.focus("#email")
//!   ├─ blur     (capture, on the previously active element)
//!   └─ focusin  (on #email)            -> Deferred, fires after 60 ms
//! page.advance_time(100)
//!   └─ run due timers at t+60          -> Emitted textFieldFocus
//! ```

use crate::{
    Clock, Dispatcher, Document, DomView, Error, EventType, ManualClock, NodeId, Outcome, RawEvent, Result, Trigger,
    WindowEvent, initialize_delegated_events,
};
use std::cell::RefCell;
use std::rc::Rc;

/// A dispatcher shared by every listener it is installed on.
pub type SharedDispatcher = Rc<RefCell<Dispatcher>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRoot {
    Document,
    Window,
}

/// One `addEventListener` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerSpec {
    pub root: ListenerRoot,
    pub event: EventType,
    /// Registered for the capture phase.
    pub capture: bool,
}

pub trait ListenerHost {
    fn add_listener(&mut self, spec: ListenerSpec, listener: SharedDispatcher);
}

struct Registration {
    spec: ListenerSpec,
    dispatcher: SharedDispatcher,
}

/// A simulated page: document, clock and installed listeners.
///
/// Interaction helpers mutate the document first and then fire the events a
/// browser would, in the order it would. Events are stamped with the page
/// clock; time only passes through [`Page::advance_time`].
pub struct Page {
    document: Document,
    clock: ManualClock,
    listeners: Vec<Registration>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self::with_clock(document, ManualClock::default())
    }

    pub fn with_clock(document: Document, clock: ManualClock) -> Self {
        Page { document, clock, listeners: Vec::new() }
    }

    /// A handle to the page clock, to hand to dispatchers.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// [`initialize_delegated_events`] on this page.
    pub fn install(&mut self, dispatcher: Dispatcher) -> SharedDispatcher {
        initialize_delegated_events(self, dispatcher)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver `event` to every listener registered for it on `root`,
    /// capture-phase listeners first.
    pub fn dispatch(&mut self, root: ListenerRoot, event: RawEvent) -> Vec<Outcome> {
        let mut targets: Vec<&Registration> =
            self.listeners.iter().filter(|r| r.spec.root == root && r.spec.event == event.kind).collect();
        targets.sort_by_key(|r| !r.spec.capture);

        let mut outcomes = Vec::new();
        for registration in targets {
            outcomes.extend(registration.dispatcher.borrow_mut().handle_event(&self.document, &event));
        }
        outcomes
    }

    fn fire(&mut self, trigger: Trigger, node: NodeId) -> Vec<Outcome> {
        let event = RawEvent::new(EventType::Dom(trigger), Some(node), self.now_ms());
        self.dispatch(ListenerRoot::Document, event)
    }

    /// Click the first element matching `selector`. The event carries the
    /// full composed path.
    pub fn click(&mut self, selector: &str) -> Result<Vec<Outcome>> {
        let node = self.document.find(selector)?;
        let event = RawEvent::new(EventType::Dom(Trigger::Click), Some(node), self.now_ms())
            .with_composed_path(self.document.path_to_root(node));
        Ok(self.dispatch(ListenerRoot::Document, event))
    }

    /// Move focus: `blur` on the active element, then `focusin` on the new one.
    /// Focusing the already active element fires nothing.
    pub fn focus(&mut self, selector: &str) -> Result<Vec<Outcome>> {
        let node = self.document.find(selector)?;
        let previous = self.document.active_element();
        if previous == Some(node) {
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::new();
        self.document.set_active_element(Some(node));
        if let Some(previous) = previous {
            outcomes.extend(self.fire(Trigger::Blur, previous));
        }
        outcomes.extend(self.fire(Trigger::FocusIn, node));
        Ok(outcomes)
    }

    /// Blur the active element, if any.
    pub fn blur(&mut self) -> Vec<Outcome> {
        match self.document.active_element() {
            Some(active) => {
                self.document.set_active_element(None);
                self.fire(Trigger::Blur, active)
            }
            None => Vec::new(),
        }
    }

    /// Append `text` to a control's value one character at a time, firing an
    /// `input` per character. Does not move focus.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<Vec<Outcome>> {
        let node = self.document.find(selector)?;
        let mut value = self.document.value(node).unwrap_or_default();
        let mut outcomes = Vec::new();
        for ch in text.chars() {
            value.push(ch);
            self.document.set_value(node, &value);
            outcomes.extend(self.fire(Trigger::Input, node));
        }
        Ok(outcomes)
    }

    /// Set a checkbox or radio and fire `change`.
    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<Vec<Outcome>> {
        let node = self.document.find(selector)?;
        self.document.set_checked(node, checked);
        Ok(self.fire(Trigger::Change, node))
    }

    pub fn check(&mut self, selector: &str) -> Result<Vec<Outcome>> {
        self.set_checked(selector, true)
    }

    pub fn uncheck(&mut self, selector: &str) -> Result<Vec<Outcome>> {
        self.set_checked(selector, false)
    }

    /// Select the `index`-th option of a `<select>` and fire `change`.
    pub fn select_option(&mut self, selector: &str, index: usize) -> Result<Vec<Outcome>> {
        let node = self.document.find(selector)?;
        if !self.document.set_selected_index(node, index) {
            return Err(Error::NodeNotFound(format!("{selector} option #{index}")));
        }
        Ok(self.fire(Trigger::Change, node))
    }

    /// Fire `submit` on a form. No validation gate: like `requestSubmit`
    /// with `novalidate`, the event always fires.
    pub fn submit(&mut self, selector: &str) -> Result<Vec<Outcome>> {
        let node = self.document.find(selector)?;
        Ok(self.fire(Trigger::Submit, node))
    }

    /// The window loses focus. The active element receives `blur` but stays
    /// active.
    pub fn window_blur(&mut self) -> Vec<Outcome> {
        let mut outcomes = match self.document.active_element() {
            Some(active) => self.fire(Trigger::Blur, active),
            None => Vec::new(),
        };
        let event = RawEvent::new(EventType::Window(WindowEvent::Blur), None, self.now_ms());
        outcomes.extend(self.dispatch(ListenerRoot::Window, event));
        outcomes
    }

    /// The window regains focus; the browser then re-focuses the active
    /// element, firing `focusin` on it.
    pub fn window_focus(&mut self) -> Vec<Outcome> {
        let event = RawEvent::new(EventType::Window(WindowEvent::Focus), None, self.now_ms());
        let mut outcomes = self.dispatch(ListenerRoot::Window, event);
        if let Some(active) = self.document.active_element() {
            outcomes.extend(self.fire(Trigger::FocusIn, active));
        }
        outcomes
    }

    /// Let `ms` milliseconds pass, running timers at their due times.
    pub fn advance_time(&mut self, ms: i64) -> Vec<Outcome> {
        let target = self.now_ms().saturating_add(ms.max(0));
        let dispatchers = self.dispatchers();
        let mut outcomes = Vec::new();

        loop {
            let next = dispatchers.iter().filter_map(|d| d.borrow().next_due_ms()).min();
            match next {
                Some(due) if due <= target => {
                    self.clock.set_ms(due);
                    for dispatcher in &dispatchers {
                        outcomes.extend(dispatcher.borrow_mut().run_due_timers(&self.document));
                    }
                }
                _ => break,
            }
        }

        self.clock.set_ms(target);
        outcomes
    }

    /// Installed dispatchers, each once, in installation order.
    pub fn dispatchers(&self) -> Vec<SharedDispatcher> {
        let mut unique: Vec<SharedDispatcher> = Vec::new();
        for registration in &self.listeners {
            if !unique.iter().any(|d| Rc::ptr_eq(d, &registration.dispatcher)) {
                unique.push(Rc::clone(&registration.dispatcher));
            }
        }
        unique
    }
}

impl ListenerHost for Page {
    fn add_listener(&mut self, spec: ListenerSpec, listener: SharedDispatcher) {
        self.listeners.push(Registration { spec, dispatcher: listener });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Catalog, DataLayer, EventSpec, Rule};

    fn page() -> (Page, DataLayer) {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_element(root, "input", &[("id", "a")]);
        doc.append_element(root, "input", &[("id", "b")]);
        let catalog = Catalog::builder("c")
            .rule(Rule::single("focus", "input", EventSpec::new(Trigger::FocusIn).field("event", "focus")))
            .rule(Rule::single("blur", "input", EventSpec::new(Trigger::Blur).field("event", "blur")))
            .build();

        let sink = DataLayer::new();
        let mut page = Page::new(doc);
        let dispatcher = Dispatcher::new(vec![catalog], sink.clone()).with_clock(page.clock());
        page.install(dispatcher);
        (page, sink)
    }

    fn events(sink: &DataLayer) -> Vec<String> {
        sink.records().iter().map(|r| r.event().to_string()).collect()
    }

    #[test]
    fn focus_moves_blur_then_focusin() {
        let (mut page, sink) = page();
        page.focus("#a").unwrap();
        page.advance_time(100);
        page.focus("#b").unwrap();
        page.advance_time(100);
        assert_eq!(events(&sink), vec!["focus", "blur", "focus"]);
        assert!(page.focus("#b").unwrap().is_empty());
    }

    #[test]
    fn advance_time_stops_the_clock_at_due_times() {
        let (mut page, sink) = page();
        let start = page.now_ms();
        page.focus("#a").unwrap();
        let outcomes = page.advance_time(1_000);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(page.now_ms(), start + 1_000);
        assert_eq!(sink.records()[0].timestamp(), "2024-05-01T12:00:00.060Z");
    }

    #[test]
    fn window_round_trip_suppresses_the_refocus() {
        let (mut page, sink) = page();
        page.focus("#a").unwrap();
        page.advance_time(100);

        page.window_blur();
        page.advance_time(5_000);
        let outcomes = page.window_focus();
        assert!(outcomes.contains(&Outcome::SuppressedRefocus));
        page.advance_time(1_000);
        assert_eq!(events(&sink), vec!["focus", "blur"]);
    }

    #[test]
    fn advance_time_saturates_at_the_end_of_time() {
        let (mut page, sink) = page();
        page.focus("#a").unwrap();
        let outcomes = page.advance_time(i64::MAX);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(sink.len(), 1);

        let end = page.now_ms();
        assert!(page.advance_time(i64::MAX).is_empty());
        assert_eq!(page.now_ms(), end);
    }

    #[test]
    fn unknown_selector_is_an_error() {
        let (mut page, _) = page();
        assert!(matches!(page.click("#missing"), Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn dispatchers_are_listed_once() {
        let (page, _) = page();
        assert_eq!(page.listener_count(), 8);
        assert_eq!(page.dispatchers().len(), 1);
    }
}
