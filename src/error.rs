//! Error types.
//!
//! Matching and dispatch never fail: no-match, veto, incomplete records and
//! missing DOM capabilities are ordinary [`Outcome`](crate::Outcome)s. The
//! errors here cover the edges around the engine: parsing selectors,
//! validating catalogs, driving a [`Page`](crate::Page) and replaying
//! scenarios.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("catalog `{catalog}` has {} defect(s): {}", .defects.len(), join_defects(.defects))]
    Catalog { catalog: String, defects: Vec<CatalogDefect> },

    #[error("unknown trigger `{0}`")]
    UnknownTrigger(String),

    #[error("no element matches `{0}`")]
    NodeNotFound(String),

    #[error("scenario line {line}: {message}")]
    Scenario { line: usize, message: String },

    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A selector string the matcher cannot interpret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("malformed selector `{selector}` at byte {position}")]
    Malformed { selector: String, position: usize },

    #[error("unsupported selector `{selector}`: {feature}")]
    Unsupported { selector: String, feature: &'static str },
}

/// One structural problem found by [`Catalog::validate`](crate::Catalog::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogDefect {
    #[error("duplicate rule key `{0}`")]
    DuplicateKey(String),

    #[error("rule `{0}` has an empty selector")]
    EmptySelector(String),

    #[error("rule `{key}` has an unusable selector: {error}")]
    BadSelector { key: String, error: SelectorError },

    #[error("scope selector is unusable: {0}")]
    BadScope(SelectorError),

    #[error("composite rule `{0}` declares no sub-rules")]
    EmptyComposite(String),
}

fn join_defects(defects: &[CatalogDefect]) -> String {
    defects.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
