//! Record sinks.
//!
//! A sink is append-only: the engine's one write operation is "push one
//! record". [`DataLayer`] is the in-process equivalent of `window.dataLayer`.

use crate::{EventRecord, Result};
use std::cell::RefCell;
use std::rc::Rc;

pub trait Sink {
    fn push(&self, record: EventRecord);
}

impl<F> Sink for F
where
    F: Fn(EventRecord),
{
    fn push(&self, record: EventRecord) {
        self(record)
    }
}

/// A shared, ordered, append-only list of records.
///
/// Clones are handles to the same list.
#[derive(Debug, Clone, Default)]
pub struct DataLayer {
    entries: Rc<RefCell<Vec<EventRecord>>>,
}

thread_local! {
    static GLOBAL: DataLayer = DataLayer::new();
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The global layer of the current thread, created empty on first use.
    ///
    /// Only the top-level wiring should reach for this; everything else takes
    /// a sink by injection.
    pub fn global() -> Self {
        GLOBAL.with(Clone::clone)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Snapshot of every record pushed so far, oldest first.
    pub fn records(&self) -> Vec<EventRecord> {
        self.entries.borrow().clone()
    }

    pub fn last(&self) -> Option<EventRecord> {
        self.entries.borrow().last().cloned()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.entries.borrow())?)
    }
}

impl Sink for DataLayer {
    fn push(&self, record: EventRecord) {
        self.entries.borrow_mut().push(record);
    }
}
