//! Bundled catalogs.
//!
//! The demo contact form ("DemoContactRequest") catalog and a [`Document`]
//! shaped like the page it was written for. They double as the reference for
//! writing catalogs and as the fixture of the end-to-end tests.

use crate::{Catalog, Document};

#[path = "catalogs/form_events.rs"]
mod form_events;
#[path = "catalogs/form_page.rs"]
mod form_page;

/// The contact form catalog, scoped to `#form-container, form#form224`.
pub fn form_events() -> Catalog {
    form_events::catalog()
}

/// Site-wide link tracking, unscoped. Consulted after the form catalog.
pub fn site_links() -> Catalog {
    form_events::site_links()
}

/// Every bundled catalog in evaluation order.
pub fn all() -> Vec<Catalog> {
    vec![form_events(), site_links()]
}

/// The demo page: the contact form inside `#form-container`, plus a footer
/// outside it.
pub fn form_page() -> Document {
    form_page::document()
}
