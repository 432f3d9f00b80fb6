//! Driver layer for browser automation.
//!
//! The extraction crates only see the [`dom::PageDom`] seam; this crate
//! provides its WebDriver implementation and, behind the `stub` feature, an
//! HTML-fixture implementation for tests.
//!
//! - [`portal_browser::driver::PortalDriver`]: WebDriver client wrapper
//! - [`portal_browser::page::PortalPage`]: `PageDom` over a fantoccini client
//! - [`portal_browser::behavioral::BehavioralEngine`]: settle delays and human-like typing
//! - `stub::StubPage`: scripted fixture pages (feature `stub`)
pub mod dom;
pub mod portal_browser;
#[cfg(feature = "stub")]
pub mod stub;

pub use dom::{BrowserLifecycle, PageDom, Selector};
