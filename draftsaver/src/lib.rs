//! Debounced draft auto-save for content editing forms.
//!
//! This crate provides a draft saver that:
//! - Coalesces bursts of edits into a single save after a quiet period
//! - Keeps at most one save request in flight per form
//! - Lets an explicit submit supersede any scheduled auto-save
//! - Reports every outcome without retrying
//!
//! # Example
//! ```ignore
//! use draftsaver::{DraftSaver, ReqwestSaveEndpoint, SaverConfig, SharedForm, Surface};
//!
//! let form = SharedForm::new();
//! let endpoint = Arc::new(ReqwestSaveEndpoint::new(url, Duration::from_secs(30), None)?);
//! let (saver, mut reports) =
//!     DraftSaver::spawn(form.clone(), endpoint, SaverConfig::for_surface(Surface::Editor), shutdown);
//!
//! form.set_text("title", "Hello");
//! saver.field_changed();
//!
//! while let Some(report) = reports.recv().await {
//!     println!("{}", report.status_line());
//! }
//! ```

pub mod config;
pub mod countdown;
pub mod endpoint;
pub mod error;
pub mod form;
pub mod request;
pub mod saver;
pub mod telemetry;
pub mod validate;
pub mod video;

// Re-export commonly used types
pub use config::{Args, Config};
pub use endpoint::{MockSaveEndpoint, ReqwestSaveEndpoint, SaveEndpoint};
pub use error::{Error, Result, SaveError};
pub use form::{Attachment, FieldValue, FormSnapshot, FormSource, SharedForm};
pub use request::{FormId, SaveAck, SaveKind, SaveOutcome, SaveReport, SaveRequest, SubmitIntent};
pub use saver::{DraftSaver, SaveReports, SaverConfig, SaverStats, Surface};
pub use video::VideoId;
