use crate::host::{ListenerHost, ListenerRoot, ListenerSpec, SharedDispatcher};
use crate::{Catalog, DataLayer, Dispatcher, EventType, SystemClock, Trigger, WindowEvent};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Timing options of a [`Dispatcher`].
///
/// The defaults are the values the tag manager integration has always shipped
/// with; tests usually keep them and drive a [`ManualClock`](crate::ManualClock).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Delay before a `focusin` is evaluated. A newer `focusin` restarts it.
    pub focus_delay: Duration,
    /// How long after the window regains focus a `focusin` on the previously
    /// focused element is treated as the browser's automatic refocus.
    pub refocus_guard: Duration,
    /// Trailing debounce for `input`.
    pub input_debounce: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            focus_delay: Duration::from_millis(60),
            refocus_guard: Duration::from_millis(200),
            input_debounce: Duration::from_millis(500),
        }
    }
}

impl Options {
    pub fn focus_delay(mut self, delay: Duration) -> Self {
        self.focus_delay = delay;
        self
    }

    pub fn refocus_guard(mut self, guard: Duration) -> Self {
        self.refocus_guard = guard;
        self
    }

    pub fn input_debounce(mut self, wait: Duration) -> Self {
        self.input_debounce = wait;
        self
    }
}

const fn document(trigger: Trigger, capture: bool) -> ListenerSpec {
    ListenerSpec { root: ListenerRoot::Document, event: EventType::Dom(trigger), capture }
}

const fn window(event: WindowEvent) -> ListenerSpec {
    ListenerSpec { root: ListenerRoot::Window, event: EventType::Window(event), capture: false }
}

/// Listener registrations made by [`initialize_delegated_events`].
///
/// `blur` does not bubble, so it is caught on the capture phase.
pub const DELEGATED_LISTENERS: [ListenerSpec; 8] = [
    window(WindowEvent::Blur),
    window(WindowEvent::Focus),
    document(Trigger::Click, false),
    document(Trigger::FocusIn, false),
    document(Trigger::Blur, true),
    document(Trigger::Change, false),
    document(Trigger::Input, false),
    document(Trigger::Submit, false),
];

/// Install one delegated listener per entry of [`DELEGATED_LISTENERS`], all
/// sharing `dispatcher`.
///
/// Not idempotent: calling this twice on the same host installs a second set
/// of listeners and every event is then handled twice.
///
/// # Example
/// ```
/// use datalayer::{DataLayer, Dispatcher, Page, catalogs, initialize_delegated_events};
///
/// let mut page = Page::new(catalogs::form_page());
/// let dispatcher = Dispatcher::new(catalogs::all(), DataLayer::new()).with_clock(page.clock());
/// let shared = initialize_delegated_events(&mut page, dispatcher);
/// assert_eq!(page.listener_count(), 8);
/// assert_eq!(shared.borrow().catalogs().len(), 2);
/// ```
pub fn initialize_delegated_events<H>(host: &mut H, dispatcher: Dispatcher) -> SharedDispatcher
where
    H: ListenerHost + ?Sized,
{
    let shared = Rc::new(RefCell::new(dispatcher));
    for spec in DELEGATED_LISTENERS {
        host.add_listener(spec, Rc::clone(&shared));
    }
    log::debug!("installed {} delegated listeners", DELEGATED_LISTENERS.len());
    shared
}

/// A dispatcher writing to the thread's global [`DataLayer`] with the system
/// clock and default options.
pub fn default_dispatcher(catalogs: Vec<Catalog>) -> Dispatcher {
    Dispatcher::new(catalogs, DataLayer::global()).with_clock(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<ListenerSpec>);

    impl ListenerHost for Recorder {
        fn add_listener(&mut self, spec: ListenerSpec, _listener: SharedDispatcher) {
            self.0.push(spec);
        }
    }

    #[test]
    fn installs_eight_listeners() {
        let mut host = Recorder::default();
        initialize_delegated_events(&mut host, Dispatcher::new(Vec::new(), DataLayer::new()));
        assert_eq!(host.0.len(), 8);
        let captured: Vec<_> = host.0.iter().filter(|s| s.capture).map(|s| s.event).collect();
        assert_eq!(captured, vec![EventType::Dom(Trigger::Blur)]);
    }

    #[test]
    fn second_install_duplicates_listeners() {
        let mut host = Recorder::default();
        let first = initialize_delegated_events(&mut host, Dispatcher::new(Vec::new(), DataLayer::new()));
        let second = initialize_delegated_events(&mut host, Dispatcher::new(Vec::new(), DataLayer::new()));
        assert_eq!(host.0.len(), 16);
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn default_timings() {
        let options = Options::default();
        assert_eq!(options.focus_delay, Duration::from_millis(60));
        assert_eq!(options.refocus_guard, Duration::from_millis(200));
        assert_eq!(options.input_debounce, Duration::from_millis(500));
    }
}
