//! Dispatch counters.
//!
//! Cheap, always-on counters kept by each [`Dispatcher`](crate::Dispatcher).
//! They exist for debugging catalogs ("why did nothing fire?") and for the
//! CLI report; nothing in the pipeline reads them back.

use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Physical events handed to the dispatcher, window events included.
    pub events: usize,
    /// Resolution passes (one per immediate trigger or fired timer; submit
    /// counts one per catalog).
    pub resolutions: usize,
    pub matches: usize,
    /// Passes where no rule applied.
    pub no_matches: usize,
    /// Matches dropped by a dynamic veto.
    pub vetoes: usize,
    /// Assembled records without an `event`, discarded.
    pub incomplete: usize,
    pub emitted: usize,
    /// `focusin` events recognized as a window refocus.
    pub suppressed_refocus: usize,
    /// Pending focusin/input evaluations replaced before they fired.
    pub debounced: usize,
}

impl DispatchStats {
    /// Matches that did not end in a record.
    pub fn dropped(&self) -> usize {
        self.vetoes + self.incomplete
    }
}
