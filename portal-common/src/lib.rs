//! Common types and utilities shared across the portal crates.
//!
//! This crate defines the error taxonomy, the portal module identifiers, and
//! observability helpers used throughout the workspace. It is intentionally
//! lightweight so that every crate can depend on it without dragging in the
//! browser stack.
//!
//! # Overview
//!
//! - [`PortalError`] and [`Result`]: shared error handling
//! - [`FailureKind`]: the tag attached to a run that ended early
//! - [`PortalModule`]: which of the two portal workflows a run targets
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use portal_common::{PortalError, FailureKind};
//!
//! let err = PortalError::NotFound("results table".into());
//! assert!(err.is_absence());
//! assert!(!err.is_fatal());
//!
//! let lost = PortalError::SessionLost("invalid session id".into());
//! assert!(lost.is_fatal());
//! assert_eq!(FailureKind::from(&lost), FailureKind::SessionLost);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// The two portal workflows the extractor knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalModule {
    /// Building-permit tracker.
    Permit,
    /// Court-case management system.
    CaseManagement,
}

impl PortalModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalModule::Permit => "permit",
            PortalModule::CaseManagement => "case_management",
        }
    }
}

impl std::fmt::Display for PortalModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types used across the portal system.
#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    /// Element, panel, tab or button absent after the full fallback chain.
    #[error("not found: {0}")]
    NotFound(String),

    /// An asynchronous page signal never stabilised.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// A handle was taken before a DOM mutation and no longer resolves.
    #[error("stale element reference: {0}")]
    StaleElement(String),

    /// The page handle is no longer usable; nothing further can succeed.
    #[error("browser session lost: {0}")]
    SessionLost(String),

    /// Another extraction run currently owns the session.
    #[error("an extraction run is already in progress on this session")]
    Busy,

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file download did not complete.
    #[error("download incomplete: {0}")]
    Download(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A driver (WebDriver, script execution, ...) reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

impl PortalError {
    /// Errors that must abort the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PortalError::SessionLost(_) | PortalError::Config(_))
    }

    /// Expected absence: callers turn these into empty/`None` results.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            PortalError::NotFound(_) | PortalError::Timeout(_) | PortalError::StaleElement(_)
        )
    }
}

/// Convenient alias for results that use [`PortalError`].
pub type Result<T> = std::result::Result<T, PortalError>;

/// Tag describing why a run ended early. Serialised into the run result next
/// to the human readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SessionLost,
    PrimarySignalMissing,
    StageFailed,
    Busy,
    Config,
}

impl From<&PortalError> for FailureKind {
    fn from(err: &PortalError) -> Self {
        match err {
            PortalError::SessionLost(_) => FailureKind::SessionLost,
            PortalError::Busy => FailureKind::Busy,
            PortalError::Config(_) => FailureKind::Config,
            _ => FailureKind::StageFailed,
        }
    }
}

/// Extension for turning expected-absence errors into `None` while letting
/// hard failures through.
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_absence() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
