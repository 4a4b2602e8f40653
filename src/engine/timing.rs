//! Deferred evaluation and window focus bookkeeping.
//!
//! Timers are virtual: a [`Debouncer`] only remembers which event is due and
//! when. The host decides when time passes and asks the dispatcher to run
//! whatever came due (see `Dispatcher::run_due_timers`). At most one event is
//! pending per debouncer; scheduling again replaces it and restarts the wait.

use crate::{NodeId, RawEvent};

#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub due_at_ms: i64,
    pub event: RawEvent,
}

/// Trailing-edge, single-slot timer.
#[derive(Debug, Clone)]
pub(crate) struct Debouncer {
    wait_ms: i64,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(wait_ms: i64) -> Self {
        Debouncer { wait_ms, pending: None }
    }

    /// Schedule `event` for `now + wait`. Returns the due time and whether an
    /// earlier pending event was dropped.
    pub fn schedule(&mut self, now_ms: i64, event: RawEvent) -> (i64, bool) {
        let due_at_ms = now_ms.saturating_add(self.wait_ms);
        let replaced = self.pending.replace(Pending { due_at_ms, event }).is_some();
        (due_at_ms, replaced)
    }

    pub fn cancel(&mut self) -> Option<Pending> {
        self.pending.take()
    }

    /// Take the pending event if it is due at `now_ms`.
    pub fn take_due(&mut self, now_ms: i64) -> Option<Pending> {
        match &self.pending {
            Some(p) if p.due_at_ms <= now_ms => self.pending.take(),
            _ => None,
        }
    }

    pub fn due_at(&self) -> Option<i64> {
        self.pending.as_ref().map(|p| p.due_at_ms)
    }
}

/// What the window blur/focus listeners remember.
///
/// After the window regains focus the browser re-focuses the element that had
/// focus before, firing a `focusin` nobody asked for. That event is recognized
/// by arriving on the same element within the guard window.
#[derive(Debug, Clone, Default)]
pub(crate) struct WindowFocus {
    last_focused: Option<NodeId>,
    refocused_at_ms: Option<i64>,
}

impl WindowFocus {
    pub fn on_blur(&mut self, active: Option<NodeId>) {
        self.last_focused = active;
    }

    pub fn on_focus(&mut self, now_ms: i64) {
        self.refocused_at_ms = Some(now_ms);
    }

    pub fn is_synthetic_refocus(&self, target: Option<NodeId>, now_ms: i64, guard_ms: i64) -> bool {
        let Some(refocused_at) = self.refocused_at_ms else {
            return false;
        };
        now_ms - refocused_at < guard_ms && target.is_some() && target == self.last_focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventType, Trigger};

    fn event(ts: i64) -> RawEvent {
        RawEvent::new(EventType::Dom(Trigger::Input), Some(NodeId(1)), ts)
    }

    #[test]
    fn rescheduling_restarts_the_wait() {
        let mut timer = Debouncer::new(500);
        assert_eq!(timer.schedule(0, event(0)), (500, false));
        assert_eq!(timer.schedule(300, event(300)), (800, true));
        assert!(timer.take_due(500).is_none());
        let fired = timer.take_due(800).unwrap();
        assert_eq!(fired.event.time_stamp_ms, 300);
        assert!(timer.due_at().is_none());
    }

    #[test]
    fn cancel_drops_the_pending_event() {
        let mut timer = Debouncer::new(60);
        timer.schedule(0, event(0));
        assert!(timer.cancel().is_some());
        assert!(timer.take_due(1_000).is_none());
    }

    #[test]
    fn refocus_needs_same_node_within_guard() {
        let mut window = WindowFocus::default();
        assert!(!window.is_synthetic_refocus(Some(NodeId(3)), 0, 200));

        window.on_blur(Some(NodeId(3)));
        window.on_focus(1_000);
        assert!(window.is_synthetic_refocus(Some(NodeId(3)), 1_000, 200));
        assert!(window.is_synthetic_refocus(Some(NodeId(3)), 1_199, 200));
        assert!(!window.is_synthetic_refocus(Some(NodeId(3)), 1_200, 200));
        assert!(!window.is_synthetic_refocus(Some(NodeId(4)), 1_050, 200));
        assert!(!window.is_synthetic_refocus(None, 1_050, 200));
    }

    #[test]
    fn blur_without_focused_element_suppresses_nothing() {
        let mut window = WindowFocus::default();
        window.on_blur(None);
        window.on_focus(0);
        assert!(!window.is_synthetic_refocus(None, 10, 200));
    }
}
