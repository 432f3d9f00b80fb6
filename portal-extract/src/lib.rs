//! Structured extraction from the permit and case-management portals.
//!
//! Everything here drives an already-authenticated page through the
//! [`portal_drivers::PageDom`] seam:
//!
//! - [`locator`]: fallback-chain element lookup, dropdown and tab protocols
//! - [`sequencer`]: the per-module navigation state machine and signal waits
//! - [`table`] and [`workflow`]: results tables, labelled panels, timelines
//! - [`attachments`]: accordion walking and download confirmation
//! - [`session`]: the shared page and its one-run-at-a-time lock
//! - [`orchestrator`]: [`run_permit`] and [`run_case`]
//!
//! Orchestrators never return an error. Whatever was read before a failure
//! is kept, and the failure is reported in [`ExtractionResult::error`] and
//! [`ExtractionResult::error_kind`].
pub mod attachments;
pub mod locator;
pub mod orchestrator;
pub mod selectors;
pub mod sequencer;
pub mod session;
pub mod table;
pub mod types;
pub mod workflow;

pub use orchestrator::{run_case, run_permit, RunOptions};
pub use session::PortalSession;
pub use types::{
    ActionOutcome, ActionRequest, AttachmentRecord, CaseInformation, ExtractionResult, FieldMap, FilterSpec,
    SubmitMode, TableRecord, WorkflowEntry,
};
