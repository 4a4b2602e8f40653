//! Delegated matching and dispatch engine.
//!
//! ## How the parts work together
//!
//! ```text
//! catalogs ──┐
//!            │  CatalogIndex::new            (compiled.rs)
//!            └──────────────┬──────────────
//!                           │
//! RawEvent ── Dispatcher ───┼─ timing policy per trigger (dispatch.rs, timing.rs)
//!                           │    click/blur/change: now, first catalog match wins
//!                           │    submit:            now, every catalog gets a pass
//!                           │    focusin:           60 ms delay, refocus suppression
//!                           │    input:             500 ms trailing debounce
//!                           v
//!                 resolve (resolve.rs)
//!                   - trigger-indexed rules, declared order
//!                   - selector match, then catalog scope
//!                           │ Match
//!                           v
//!                 extract (extract.rs)
//!                   - static fields + dynamic fn, or veto
//!                           │ Payload
//!                           v
//!                 assemble (assemble.rs)
//!                   - base defaults, require `event`, back-fill `timestamp`
//!                           │ EventRecord
//!                           v
//!                         Sink
//! ```
//!
//! Every stage can end the pipeline without an error: no match, a veto, or
//! an incomplete record are all reported as an [`Outcome`] and counted in
//! [`DispatchStats`].
//!
//! ## Responsibilities by module
//!
//! - `compiled.rs`: flattens a catalog into per-trigger entry lists and a
//!   `TriggerMask` so resolution only walks rules that can fire.
//! - `resolve.rs`: the rule resolver (first declared match wins).
//! - `extract.rs`: static/dynamic payload computation and veto handling.
//! - `assemble.rs`: record normalization.
//! - `timing.rs`: debounce timers and window refocus bookkeeping.
//! - `dispatch.rs`: the controller tying it together.
//! - `metrics.rs`: per-dispatcher counters.
//!
//! ## Debugging
//!
//! Resolution, vetoes and suppressions are logged at `debug`, timer
//! scheduling at `trace` (`RUST_LOG=datalayer=trace`).

#[path = "engine/assemble.rs"]
mod assemble;
#[path = "engine/compiled.rs"]
mod compiled;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/timing.rs"]
mod timing;

pub use compiled::{CatalogIndex, TriggerMask};
pub use dispatch::{Dispatcher, Outcome};
pub use metrics::DispatchStats;
pub use resolve::{Match, resolve};
