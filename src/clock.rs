//! Wall-clock access.
//!
//! The dispatcher needs the current time for two things: stamping records with
//! an ISO-8601 `timestamp`, and measuring the debounce/refocus windows. Both go
//! through [`Clock`] so tests can drive time by hand with [`ManualClock`].

use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use std::cell::Cell;
use std::rc::Rc;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// `Date.prototype.toISOString` shape: `2024-05-01T12:00:00.000Z`.
    fn now_iso(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test harness and the dispatcher it
/// drives always agree on "now".
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Rc::new(Cell::new(start)) }
    }

    /// Start at the given epoch milliseconds.
    pub fn at_millis(ms: i64) -> Self {
        let start = Utc.timestamp_millis_opt(ms).single().unwrap_or_default();
        Self::new(start)
    }

    /// Move by `ms`, saturating at the ends of the representable range.
    pub fn advance_ms(&self, ms: i64) {
        let now = self.now.get();
        let next = TimeDelta::try_milliseconds(ms).and_then(|delta| now.checked_add_signed(delta));
        self.now.set(next.unwrap_or_else(|| {
            log::warn!("clock cannot move {ms} ms from {now}, clamping");
            if ms > 0 { DateTime::<Utc>::MAX_UTC } else { DateTime::<Utc>::MIN_UTC }
        }));
    }

    /// Jump to an absolute instant; moving backwards is ignored.
    pub fn set_ms(&self, ms: i64) {
        let now = self.now_ms();
        if ms > now {
            self.advance_ms(ms.saturating_sub(now));
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-05-01T12:00:00Z
        Self::at_millis(1_714_564_800_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_formats_like_to_iso_string() {
        let clock = ManualClock::default();
        assert_eq!(clock.now_iso(), "2024-05-01T12:00:00.000Z");

        clock.advance_ms(1_250);
        assert_eq!(clock.now_iso(), "2024-05-01T12:00:01.250Z");
    }

    #[test]
    fn clones_share_the_same_instant() {
        let clock = ManualClock::default();
        let shared = clock.clone();
        clock.advance_ms(60);
        assert_eq!(shared.now_ms(), clock.now_ms());

        shared.set_ms(clock.now_ms() - 10);
        assert_eq!(shared.now_ms(), clock.now_ms());
    }

    #[test]
    fn huge_advances_clamp_instead_of_overflowing() {
        let clock = ManualClock::default();
        clock.advance_ms(i64::MAX);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);

        clock.advance_ms(1);
        clock.set_ms(i64::MAX);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);

        let clock = ManualClock::default();
        clock.advance_ms(i64::MIN);
        assert_eq!(clock.now(), DateTime::<Utc>::MIN_UTC);
    }
}
