//! Client-side sync core for a spreadsheet-backed listing page.
//!
//! The crate polls a remote sheet API, keeps the latest snapshot in memory,
//! pushes it to a rendering surface and appends new rows built from a form.

pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod submit;
pub mod surface;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use model::{CardMap, FieldMap, FormField, Row, Snapshot};
pub use submit::SubmissionHandler;
pub use surface::{InboundMessage, OutboundMessage, RenderingSurface};
pub use sync::{RefreshOutcome, SnapshotCache, SyncCoordinator};
