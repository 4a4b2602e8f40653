//! Record assembly.
//!
//! ```text
//! { event: "", action: "", timestamp: "" }   base defaults
//!   <- static fields                          spec wins over defaults
//!   <- dynamic fields                         dynamic wins over static
//! ```
//!
//! A record without a non-empty `event` is discarded. An empty `timestamp` is
//! back-filled with the current time as ISO-8601 UTC with milliseconds; a
//! timestamp supplied by the rule is kept as is.

use super::extract::Payload;
use crate::{EventRecord, Fields};

const BASE_FIELDS: [&str; 3] = ["event", "action", "timestamp"];

/// `now_iso` is only called when the timestamp needs back-filling.
pub(crate) fn assemble(payload: Payload, now_iso: impl FnOnce() -> String) -> Option<EventRecord> {
    let mut fields: Fields = BASE_FIELDS.iter().map(|key| (key.to_string(), String::new())).collect();
    fields.extend(payload.static_fields);
    fields.extend(payload.dynamic_fields);

    if fields.get("event").is_none_or(String::is_empty) {
        return None;
    }

    if let Some(timestamp) = fields.get_mut("timestamp") {
        if timestamp.is_empty() {
            *timestamp = now_iso();
        }
    }

    Some(EventRecord::from_fields(fields))
}
